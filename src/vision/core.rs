//! Per-frame analysis on top of the locator and the text extractor.

use anyhow::Context;
use image::RgbImage;
use log::debug;

use super::crop_rect;
use super::error::VisionResult;
use super::geometry::FrameGeometry;
use super::locator::LabelLocator;
use super::regions::{
    AUTON_SECONDS, BLUE_ALLIANCE_COLOR, FIRST_PORTION_COLOR, FIRST_PORTION_THRESHOLD,
    MATCH_ENDED_COLOR, MATCH_ENDED_THRESHOLD, OverlayField, RED_ALLIANCE_COLOR, Rect,
    TIMEOUT_COLOR, TIMEOUT_THRESHOLD,
};
use crate::ocr::preprocess::{color_distance, mean_color};
use crate::ocr::{TextExtractor, TextRecognizer};
use crate::types::{
    AllianceScores, BannerKind, FrameObservation, GameReadout, LocatedLabel, MatchPeriod,
};

/// State carried from frame to frame within one video.
///
/// Holds the session geometry and the last label rectangle seen on a game
/// frame. Only game frames update the rectangle; other frames leave the
/// previous one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingContext {
    geometry: FrameGeometry,
    label_rect: Option<Rect>,
}

impl TrackingContext {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            geometry,
            label_rect: None,
        }
    }

    /// Context sized after `frame`.
    pub fn for_frame(frame: &RgbImage) -> Self {
        Self::new(FrameGeometry::new(frame.width(), frame.height()))
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    pub fn label_rect(&self) -> Option<Rect> {
        self.label_rect
    }

    fn remember(&mut self, rect: Rect) {
        self.label_rect = Some(rect);
    }

    fn field(&self, field: OverlayField) -> Option<Rect> {
        self.label_rect
            .map(|label| self.geometry.relative(&label, field))
    }
}

/// Frame analyser. Holds no per-video state, so one instance can serve any
/// number of [`TrackingContext`]s.
pub struct VisionCore<R> {
    extractor: TextExtractor<R>,
    locator: LabelLocator,
    advanced_scraping: bool,
}

impl<R: TextRecognizer> VisionCore<R> {
    pub fn new(ocr: R, locator: LabelLocator) -> anyhow::Result<Self> {
        let extractor = TextExtractor::new(ocr).context("Failed to compile match label patterns")?;
        Ok(Self {
            extractor,
            locator,
            advanced_scraping: false,
        })
    }

    /// Also read scores, timeout and match period on game frames.
    pub fn with_advanced_scraping(mut self, enabled: bool) -> Self {
        self.advanced_scraping = enabled;
        self
    }

    /// Finds and reads the match label. A game frame's rectangle becomes the
    /// anchor for later overlay reads.
    pub fn get_match_info(
        &self,
        frame: &RgbImage,
        context: &mut TrackingContext,
    ) -> VisionResult<Option<LocatedLabel>> {
        let located = self
            .locator
            .locate(frame, &context.geometry, &self.extractor)?;

        if let Some(LocatedLabel::Game { rect, .. }) = &located {
            context.remember(*rect);
        }
        Ok(located)
    }

    /// Reads the match clock. `None` until a game frame has been seen.
    pub fn get_match_time(
        &self,
        frame: &RgbImage,
        context: &TrackingContext,
    ) -> VisionResult<Option<u64>> {
        let Some(region) = context.field(OverlayField::MatchTime) else {
            debug!("No label rectangle yet, skipping match time");
            return Ok(None);
        };
        let crop = crop_rect(frame, &context.geometry, &region)?;
        Ok(self.extractor.read_match_time(&crop)?)
    }

    /// Reads the "Match Preview" / "Match Results" caption of a banner frame.
    pub fn get_frame_type(
        &self,
        frame: &RgbImage,
        context: &TrackingContext,
    ) -> VisionResult<Option<BannerKind>> {
        let probe = context.geometry.banner_probe();
        let crop = crop_rect(frame, &context.geometry, &probe)?;
        Ok(self.extractor.read_banner(&crop)?)
    }

    pub fn get_timeout_active(
        &self,
        frame: &RgbImage,
        context: &TrackingContext,
    ) -> VisionResult<Option<bool>> {
        let Some(region) = context.field(OverlayField::TimeoutIndicator) else {
            return Ok(None);
        };
        let color = mean_color(&crop_rect(frame, &context.geometry, &region)?);
        Ok(Some(color_distance(color, TIMEOUT_COLOR) < TIMEOUT_THRESHOLD))
    }

    /// Reads both alliance scores. The colour swatch next to the left score
    /// says which alliance sits on that side.
    pub fn get_scores(
        &self,
        frame: &RgbImage,
        context: &TrackingContext,
    ) -> VisionResult<Option<AllianceScores>> {
        let (Some(swatch), Some(left), Some(right)) = (
            context.field(OverlayField::LeftColorSwatch),
            context.field(OverlayField::LeftScore),
            context.field(OverlayField::RightScore),
        ) else {
            return Ok(None);
        };

        let swatch = mean_color(&crop_rect(frame, &context.geometry, &swatch)?);
        let red_on_left = color_distance(swatch, RED_ALLIANCE_COLOR)
            <= color_distance(swatch, BLUE_ALLIANCE_COLOR);

        let left = self
            .extractor
            .read_score(&crop_rect(frame, &context.geometry, &left)?)?;
        let right = self
            .extractor
            .read_score(&crop_rect(frame, &context.geometry, &right)?)?;

        let scores = if red_on_left {
            AllianceScores { red: left, blue: right }
        } else {
            AllianceScores { red: right, blue: left }
        };
        Ok(Some(scores))
    }

    /// Classifies the phase of the match from the mode swatch.
    ///
    /// The auton colour only counts while the clock is within the auton
    /// period; an unreadable clock trusts the swatch.
    pub fn get_match_period(
        &self,
        frame: &RgbImage,
        context: &TrackingContext,
        match_time: Option<u64>,
    ) -> VisionResult<Option<MatchPeriod>> {
        let Some(region) = context.field(OverlayField::ModeSwatch) else {
            return Ok(None);
        };
        let color = mean_color(&crop_rect(frame, &context.geometry, &region)?);

        let period = if color_distance(color, MATCH_ENDED_COLOR) < MATCH_ENDED_THRESHOLD {
            MatchPeriod::Ended
        } else if color_distance(color, FIRST_PORTION_COLOR) < FIRST_PORTION_THRESHOLD
            && match_time.is_none_or(|t| t <= AUTON_SECONDS)
        {
            MatchPeriod::Auton
        } else {
            MatchPeriod::Teleop
        };
        Ok(Some(period))
    }

    /// Runs the full per-frame pipeline.
    pub fn observe(
        &self,
        frame: &RgbImage,
        context: &mut TrackingContext,
    ) -> VisionResult<FrameObservation> {
        let observation = match self.get_match_info(frame, context)? {
            None => FrameObservation::Unknown,
            Some(LocatedLabel::Outside { label, .. }) => FrameObservation::Outside {
                label,
                banner: self.get_frame_type(frame, context)?,
            },
            Some(LocatedLabel::Game { label, .. }) => {
                let match_time = self.get_match_time(frame, context)?;
                let mut readout = GameReadout {
                    match_time,
                    ..GameReadout::default()
                };
                if self.advanced_scraping {
                    readout.timeout = self.get_timeout_active(frame, context)?;
                    readout.scores = self.get_scores(frame, context)?;
                    readout.period = self.get_match_period(frame, context, match_time)?;
                }
                FrameObservation::Game { label, readout }
            }
        };
        Ok(observation)
    }
}
