//! Value objects produced per frame.
//!
//! Everything here is created fresh for each frame and never mutated
//! afterwards. The one piece of cross-frame state lives in
//! [`crate::vision::TrackingContext`].

use serde::Serialize;
use std::fmt;

use crate::vision::regions::Rect;

/// Tournament round named by the overlay's match-identifier text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MatchType {
    #[serde(rename = "Qualification Match")]
    Qualification,
    #[serde(rename = "Practice Match")]
    Practice,
    #[serde(rename = "Quarterfinal Match")]
    Quarterfinal,
    #[serde(rename = "Quarterfinal Tiebreaker")]
    QuarterfinalTiebreaker,
    #[serde(rename = "Semifinal Match")]
    Semifinal,
    #[serde(rename = "Semifinal Tiebreaker")]
    SemifinalTiebreaker,
    #[serde(rename = "Final Match")]
    Final,
    #[serde(rename = "Final Tiebreaker")]
    FinalTiebreaker,
    #[serde(rename = "Playoff Match")]
    Playoff,
    #[serde(rename = "Playoff Tiebreaker")]
    PlayoffTiebreaker,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Qualification => "Qualification Match",
            MatchType::Practice => "Practice Match",
            MatchType::Quarterfinal => "Quarterfinal Match",
            MatchType::QuarterfinalTiebreaker => "Quarterfinal Tiebreaker",
            MatchType::Semifinal => "Semifinal Match",
            MatchType::SemifinalTiebreaker => "Semifinal Tiebreaker",
            MatchType::Final => "Final Match",
            MatchType::FinalTiebreaker => "Final Tiebreaker",
            MatchType::Playoff => "Playoff Match",
            MatchType::PlayoffTiebreaker => "Playoff Tiebreaker",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognised match identifier.
///
/// Type and number only ever exist together. The number is kept as the
/// cleaned digit string so leading zeros survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLabel {
    pub match_type: MatchType,
    pub match_number: String,
}

impl MatchLabel {
    /// Returns `None` when `match_number` is empty, so a label can never
    /// exist without both halves.
    pub fn new(match_type: MatchType, match_number: impl Into<String>) -> Option<Self> {
        let match_number = match_number.into();
        if match_number.is_empty() {
            return None;
        }
        Some(Self {
            match_type,
            match_number,
        })
    }
}

impl fmt::Display for MatchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.match_type, self.match_number)
    }
}

/// Per-frame classification tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameClassification {
    Game,
    Outside,
    Preview,
    Results,
    Unknown,
}

/// Caption shown on a standalone banner between matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    Preview,
    Results,
}

/// Where a match label was found on the frame.
#[derive(Debug, Clone, PartialEq)]
pub enum LocatedLabel {
    /// Inside the in-game overlay, either at the catalog position or
    /// relocated through the logo. A relocated rectangle may carry no
    /// readable label.
    Game {
        rect: Rect,
        label: Option<MatchLabel>,
    },
    /// On the standalone banner shown before and after a match.
    Outside { rect: Rect, label: MatchLabel },
}

impl LocatedLabel {
    pub fn rect(&self) -> Rect {
        match self {
            LocatedLabel::Game { rect, .. } | LocatedLabel::Outside { rect, .. } => *rect,
        }
    }

    pub fn label(&self) -> Option<&MatchLabel> {
        match self {
            LocatedLabel::Game { label, .. } => label.as_ref(),
            LocatedLabel::Outside { label, .. } => Some(label),
        }
    }

    pub fn classification(&self) -> FrameClassification {
        match self {
            LocatedLabel::Game { .. } => FrameClassification::Game,
            LocatedLabel::Outside { .. } => FrameClassification::Outside,
        }
    }
}

/// Phase of a running match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPeriod {
    Auton,
    Teleop,
    Ended,
}

/// Alliance scores read from the overlay. Either side may fail OCR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllianceScores {
    pub red: Option<u64>,
    pub blue: Option<u64>,
}

/// What a game frame's overlay says besides its label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameReadout {
    /// Seconds shown on the match clock.
    pub match_time: Option<u64>,
    pub period: Option<MatchPeriod>,
    pub scores: Option<AllianceScores>,
    pub timeout: Option<bool>,
}

/// Everything learned from one frame.
///
/// Only game frames can carry a clock reading; banner frames always carry
/// the label that identified them.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameObservation {
    Game {
        label: Option<MatchLabel>,
        readout: GameReadout,
    },
    Outside {
        label: MatchLabel,
        banner: Option<BannerKind>,
    },
    Unknown,
}

impl FrameObservation {
    pub fn classification(&self) -> FrameClassification {
        match self {
            FrameObservation::Game { .. } => FrameClassification::Game,
            FrameObservation::Outside { banner: None, .. } => FrameClassification::Outside,
            FrameObservation::Outside {
                banner: Some(BannerKind::Preview),
                ..
            } => FrameClassification::Preview,
            FrameObservation::Outside {
                banner: Some(BannerKind::Results),
                ..
            } => FrameClassification::Results,
            FrameObservation::Unknown => FrameClassification::Unknown,
        }
    }

    pub fn label(&self) -> Option<&MatchLabel> {
        match self {
            FrameObservation::Game { label, .. } => label.as_ref(),
            FrameObservation::Outside { label, .. } => Some(label),
            FrameObservation::Unknown => None,
        }
    }

    pub fn match_time(&self) -> Option<u64> {
        match self {
            FrameObservation::Game { readout, .. } => readout.match_time,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_requires_number() {
        assert!(MatchLabel::new(MatchType::Qualification, "").is_none());
        let label = MatchLabel::new(MatchType::Qualification, "07").unwrap();
        assert_eq!(label.match_number, "07");
        assert_eq!(label.to_string(), "Qualification Match 07");
    }

    #[test]
    fn test_banner_refines_classification() {
        let label = MatchLabel::new(MatchType::Final, "2").unwrap();
        let preview = FrameObservation::Outside {
            label: label.clone(),
            banner: Some(BannerKind::Preview),
        };
        let plain = FrameObservation::Outside { label, banner: None };

        assert_eq!(preview.classification(), FrameClassification::Preview);
        assert_eq!(plain.classification(), FrameClassification::Outside);
        assert_eq!(plain.match_time(), None);
        assert_eq!(FrameObservation::Unknown.label(), None);
    }

    #[test]
    fn test_match_type_serializes_as_display_name() {
        let json = serde_json::to_string(&MatchType::SemifinalTiebreaker).unwrap();
        assert_eq!(json, "\"Semifinal Tiebreaker\"");
    }
}
