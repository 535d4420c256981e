//! Canonical overlay rectangles.
//!
//! Every coordinate here is measured on a 1280x720 reference frame.
//! [`super::geometry::FrameGeometry`] rescales them to the actual video.

use serde::{Deserialize, Serialize};

use crate::types::FrameClassification;

pub const BASE_WIDTH: f32 = 1280.0;
pub const BASE_HEIGHT: f32 = 720.0;

/// Overlay sub-regions are stored as offsets from this anchor: x from the
/// horizontal centre of the frame, y from the top of the label rectangle.
const ANCHOR_X: f32 = BASE_WIDTH / 2.0;
const ANCHOR_Y: f32 = 555.0;

/// An axis-aligned rectangle in pixel space, `x1 < x2` and `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    /// Builds a rectangle from two opposite corners in any order.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height() == 0.0 {
            return 0.0;
        }
        self.width() / self.height()
    }

    pub fn scaled(&self, x_scale: f32, y_scale: f32) -> Self {
        Self::new(
            self.x1 * x_scale,
            self.y1 * y_scale,
            self.x2 * x_scale,
            self.y2 * y_scale,
        )
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    pub fn approx_eq(&self, other: &Rect, tolerance: f32) -> bool {
        (self.x1 - other.x1).abs() <= tolerance
            && (self.y1 - other.y1).abs() <= tolerance
            && (self.x2 - other.x2).abs() <= tolerance
            && (self.y2 - other.y2).abs() <= tolerance
    }
}

/// What a catalog rectangle is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Match label inside the in-game overlay.
    InOverlay,
    /// Match label on the banner shown before and after a match.
    StandaloneBanner,
    /// Caption area saying "Match Preview" or "Match Results".
    BannerProbe,
}

impl RegionKind {
    /// Classification a label found in this region implies.
    pub fn classification(self) -> Option<FrameClassification> {
        match self {
            RegionKind::InOverlay => Some(FrameClassification::Game),
            RegionKind::StandaloneBanner => Some(FrameClassification::Outside),
            RegionKind::BannerProbe => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionDefinition {
    pub rect: Rect,
    pub kind: RegionKind,
}

/// Label candidates in probe order. The overlay position wins over the
/// banner position.
pub const LABEL_CANDIDATES: [RegionDefinition; 2] = [
    RegionDefinition {
        rect: Rect {
            x1: 160.0,
            y1: 560.0,
            x2: 625.0,
            y2: 610.0,
        },
        kind: RegionKind::InOverlay,
    },
    RegionDefinition {
        rect: Rect {
            x1: 75.0,
            y1: 53.0,
            x2: 625.0,
            y2: 110.0,
        },
        kind: RegionKind::StandaloneBanner,
    },
];

pub const BANNER_PROBE: RegionDefinition = RegionDefinition {
    rect: Rect {
        x1: 640.0,
        y1: 51.0,
        x2: 1201.0,
        y2: 110.0,
    },
    kind: RegionKind::BannerProbe,
};

/// Parts of the in-game overlay positioned relative to the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayField {
    MatchTime,
    LeftScore,
    RightScore,
    TimeoutIndicator,
    LeftColorSwatch,
    ModeSwatch,
}

impl OverlayField {
    /// Offset rectangle of this field relative to the overlay anchor.
    pub fn offset(self) -> Rect {
        let (x1, y1, x2, y2) = match self {
            OverlayField::MatchTime => (614.0, 606.0, 666.0, 633.0),
            OverlayField::LeftScore => (497.0, 643.0, 633.0, 707.0),
            OverlayField::RightScore => (647.0, 643.0, 783.0, 707.0),
            OverlayField::TimeoutIndicator => (543.0, 644.0, 586.0, 696.0),
            OverlayField::LeftColorSwatch => (623.0, 647.0, 635.0, 702.0),
            OverlayField::ModeSwatch => (580.0, 604.0, 601.0, 635.0),
        };
        Rect::new(
            x1 - ANCHOR_X,
            y1 - ANCHOR_Y,
            x2 - ANCHOR_X,
            y2 - ANCHOR_Y,
        )
    }
}

/// An RGB colour as channel means.
pub type Color = [f64; 3];

pub const TIMEOUT_COLOR: Color = [205.0, 204.0, 205.0];
pub const TIMEOUT_THRESHOLD: f64 = 10.0;

pub const RED_ALLIANCE_COLOR: Color = [184.0, 39.0, 2.0];
pub const BLUE_ALLIANCE_COLOR: Color = [59.0, 133.0, 220.0];

pub const FIRST_PORTION_COLOR: Color = [222.0, 188.0, 146.0];
pub const FIRST_PORTION_THRESHOLD: f64 = 10.0;

pub const MATCH_ENDED_COLOR: Color = [236.0, 54.0, 11.0];
pub const MATCH_ENDED_THRESHOLD: f64 = 100.0;

pub const MATCH_TIME_CONTRAST: f32 = 127.0;
pub const MATCH_TIME_THRESHOLD: u8 = 72;

/// Length of the autonomous period in seconds.
pub const AUTON_SECONDS: u64 = 15;

/// Fraction of the frame width searched for the logo.
pub const LOGO_SCAN_RATIO: f32 = 0.25;
pub const LOGO_MATCH_RATIO: f32 = 0.7;
pub const LOGO_MIN_MATCH_COUNT: usize = 10;

pub const LABEL_LEFT_PADDING: f32 = 15.0;
pub const LABEL_RIGHT_PADDING: f32 = 15.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_corners() {
        let rect = Rect::new(10.0, 40.0, 2.0, 4.0);
        assert_eq!(
            rect,
            Rect {
                x1: 2.0,
                y1: 4.0,
                x2: 10.0,
                y2: 40.0
            }
        );
        assert_eq!(rect.width(), 8.0);
        assert_eq!(rect.height(), 36.0);
    }

    #[test]
    fn test_negative_scale_stays_normalized() {
        let rect = Rect::new(1.0, 1.0, 3.0, 5.0).scaled(-1.0, 1.0);
        assert!(rect.x1 < rect.x2);
        assert_eq!(rect.x1, -3.0);
    }

    #[test]
    fn test_overlay_offsets_sit_around_centre() {
        let time = OverlayField::MatchTime.offset();
        assert_eq!(time, Rect::new(-26.0, 51.0, 26.0, 78.0));
        // The left score lies left of centre, the right score right of it.
        assert!(OverlayField::LeftScore.offset().x2 < 0.0);
        assert!(OverlayField::RightScore.offset().x1 > 0.0);
    }

    #[test]
    fn test_candidates_probe_overlay_first() {
        assert_eq!(LABEL_CANDIDATES[0].kind, RegionKind::InOverlay);
        assert_eq!(
            LABEL_CANDIDATES[0].kind.classification(),
            Some(FrameClassification::Game)
        );
        assert_eq!(
            LABEL_CANDIDATES[1].kind.classification(),
            Some(FrameClassification::Outside)
        );
        assert_eq!(BANNER_PROBE.kind.classification(), None);
    }
}
