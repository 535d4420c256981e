//! Scaling of catalog rectangles to the resolution of the video.

use super::regions::{
    BANNER_PROBE, BASE_HEIGHT, BASE_WIDTH, LABEL_CANDIDATES, LABEL_RIGHT_PADDING, LOGO_SCAN_RATIO,
    OverlayField, Rect, RegionDefinition,
};

/// Integer crop window inside a frame: `(x, y, width, height)`.
pub type PixelBounds = (u32, u32, u32, u32);

/// Catalog rectangles rescaled to one video's frame size.
///
/// Built once per session from the first frame; all frames of a video are
/// assumed to share its dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGeometry {
    width: u32,
    height: u32,
    x_scale: f32,
    y_scale: f32,
    label_candidates: Vec<RegionDefinition>,
    banner_probe: Rect,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        let x_scale = width as f32 / BASE_WIDTH;
        let y_scale = height as f32 / BASE_HEIGHT;

        let label_candidates = LABEL_CANDIDATES
            .iter()
            .map(|def| RegionDefinition {
                rect: def.rect.scaled(x_scale, y_scale),
                kind: def.kind,
            })
            .collect();

        Self {
            width,
            height,
            x_scale,
            y_scale,
            label_candidates,
            banner_probe: BANNER_PROBE.rect.scaled(x_scale, y_scale),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn x_scale(&self) -> f32 {
        self.x_scale
    }

    pub fn y_scale(&self) -> f32 {
        self.y_scale
    }

    /// Label candidates in probe order, already scaled.
    pub fn label_candidates(&self) -> &[RegionDefinition] {
        &self.label_candidates
    }

    pub fn banner_probe(&self) -> Rect {
        self.banner_probe
    }

    /// Reference-space rectangle to frame space.
    pub fn scale(&self, rect: &Rect) -> Rect {
        rect.scaled(self.x_scale, self.y_scale)
    }

    /// Frame-space rectangle back to reference space.
    pub fn unscale(&self, rect: &Rect) -> Rect {
        rect.scaled(1.0 / self.x_scale, 1.0 / self.y_scale)
    }

    /// Locates an overlay field relative to a discovered label rectangle.
    ///
    /// Horizontal offsets hang off the frame centre, vertical offsets off
    /// the label's top edge.
    pub fn relative(&self, label: &Rect, field: OverlayField) -> Rect {
        let offset = field.offset().scaled(self.x_scale, self.y_scale);
        offset.translated(self.width as f32 / 2.0, label.y1)
    }

    /// Right edge of a relocated label rectangle.
    pub fn label_right_edge(&self) -> f32 {
        self.width as f32 / 2.0 - LABEL_RIGHT_PADDING
    }

    /// Width of the left strip searched for the logo.
    pub fn logo_scan_width(&self) -> u32 {
        ((self.width as f32 * LOGO_SCAN_RATIO) as u32).max(1)
    }

    /// Clamps `rect` to the frame and rounds it to whole pixels. Returns
    /// `None` when nothing of it is left.
    pub fn pixel_bounds(&self, rect: &Rect) -> Option<PixelBounds> {
        let finite = [rect.x1, rect.y1, rect.x2, rect.y2]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return None;
        }

        let x0 = rect.x1.round().clamp(0.0, self.width as f32) as u32;
        let y0 = rect.y1.round().clamp(0.0, self.height as f32) as u32;
        let x1 = rect.x2.round().clamp(0.0, self.width as f32) as u32;
        let y1 = rect.y2.round().clamp(0.0, self.height as f32) as u32;

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_size_is_identity() {
        let geometry = FrameGeometry::new(1280, 720);
        assert_eq!(geometry.label_candidates()[0].rect, LABEL_CANDIDATES[0].rect);
        assert_eq!(geometry.banner_probe(), BANNER_PROBE.rect);
    }

    #[test]
    fn test_scale_then_unscale_round_trips() {
        let geometry = FrameGeometry::new(1920, 1080);
        for rect in [
            Rect::new(160.0, 560.0, 625.0, 610.0),
            Rect::new(0.5, 0.25, 1279.0, 719.0),
            Rect::new(-97.0, 89.0, -54.0, 141.0),
        ] {
            let back = geometry.unscale(&geometry.scale(&rect));
            assert!(back.approx_eq(&rect, 1e-3), "{back:?} != {rect:?}");
        }
    }

    #[test]
    fn test_scaled_candidates_follow_resolution() {
        let geometry = FrameGeometry::new(1920, 1080);
        let overlay = geometry.label_candidates()[0].rect;
        assert!(overlay.approx_eq(&Rect::new(240.0, 840.0, 937.5, 915.0), 1e-3));
    }

    #[test]
    fn test_relative_anchors_on_centre_and_label_top() {
        let geometry = FrameGeometry::new(1280, 720);
        let label = Rect::new(160.0, 560.0, 625.0, 610.0);
        let time = geometry.relative(&label, OverlayField::MatchTime);
        assert!(time.approx_eq(&Rect::new(614.0, 611.0, 666.0, 638.0), 1e-3));

        // Moving the label moves the field vertically only.
        let lower = geometry.relative(&label.translated(30.0, 10.0), OverlayField::MatchTime);
        assert!(lower.approx_eq(&time.translated(0.0, 10.0), 1e-3));
    }

    #[test]
    fn test_pixel_bounds_clamps_to_frame() {
        let geometry = FrameGeometry::new(100, 50);
        assert_eq!(
            geometry.pixel_bounds(&Rect::new(-10.0, 40.0, 20.0, 80.0)),
            Some((0, 40, 20, 10))
        );
        assert_eq!(geometry.pixel_bounds(&Rect::new(120.0, 0.0, 130.0, 10.0)), None);
        assert_eq!(
            geometry.pixel_bounds(&Rect {
                x1: f32::NAN,
                y1: 0.0,
                x2: 1.0,
                y2: 1.0
            }),
            None
        );
    }

    #[test]
    fn test_logo_strip_and_label_edge() {
        let geometry = FrameGeometry::new(1280, 720);
        assert_eq!(geometry.logo_scan_width(), 320);
        assert_eq!(geometry.label_right_edge(), 625.0);
    }
}
