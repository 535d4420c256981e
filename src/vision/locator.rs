use image::{GrayImage, RgbImage, imageops};
use log::debug;
use std::path::{Path, PathBuf};

use super::crop_rect;
use super::error::{VisionError, VisionResult};
use super::features::{FeatureSet, detect_features, fit_similarity, match_features};
use super::geometry::FrameGeometry;
use super::regions::{LABEL_LEFT_PADDING, LOGO_MATCH_RATIO, LOGO_MIN_MATCH_COUNT, Rect, RegionKind};
use crate::ocr::{TextExtractor, TextRecognizer};
use crate::types::LocatedLabel;

/// The event logo printed at the left end of the in-game overlay, with its
/// features precomputed at reference scale.
#[derive(Debug, Clone)]
pub struct LogoTemplate {
    width: u32,
    height: u32,
    features: FeatureSet,
}

impl LogoTemplate {
    pub fn load(path: &Path) -> VisionResult<Self> {
        let image = image::open(path).map_err(|source| VisionError::TemplateLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_image(&image.to_luma8(), path)
    }

    /// `origin` only names the template in errors.
    pub fn from_image(image: &GrayImage, origin: &Path) -> VisionResult<Self> {
        let features = detect_features(image, None);
        if features.len() < LOGO_MIN_MATCH_COUNT {
            return Err(VisionError::TemplateFeatures {
                path: PathBuf::from(origin),
            });
        }
        debug!(
            "Logo template {} has {} keypoints",
            origin.display(),
            features.len()
        );
        Ok(Self {
            width: image.width(),
            height: image.height(),
            features,
        })
    }
}

/// Finds the match-label rectangle on a frame.
#[derive(Debug, Clone)]
pub struct LabelLocator {
    template: LogoTemplate,
}

impl LabelLocator {
    pub fn new(template: LogoTemplate) -> Self {
        Self { template }
    }

    /// Loads the logo template from disk and builds a locator around it.
    pub fn from_template_file(path: &Path) -> VisionResult<Self> {
        Ok(Self::new(LogoTemplate::load(path)?))
    }

    /// Probes the catalog rectangles in order and returns the first one whose
    /// text reads as a match identifier. Falls back to finding the overlay
    /// through the logo, which always counts as a game frame.
    pub fn locate<R: TextRecognizer>(
        &self,
        frame: &RgbImage,
        geometry: &FrameGeometry,
        extractor: &TextExtractor<R>,
    ) -> VisionResult<Option<LocatedLabel>> {
        for candidate in geometry.label_candidates() {
            let crop = crop_rect(frame, geometry, &candidate.rect)?;
            let Some(label) = extractor.read_match_id(&crop)? else {
                continue;
            };

            let rect = candidate.rect;
            let located = match candidate.kind {
                RegionKind::InOverlay => LocatedLabel::Game {
                    rect,
                    label: Some(label),
                },
                RegionKind::StandaloneBanner => LocatedLabel::Outside { rect, label },
                RegionKind::BannerProbe => continue,
            };
            return Ok(Some(located));
        }

        let Some(rect) = self.relocate(frame, geometry) else {
            return Ok(None);
        };

        let label = match crop_rect(frame, geometry, &rect) {
            Ok(crop) => extractor.read_match_id(&crop)?,
            Err(e) => {
                debug!("Relocated label cannot be read: {}", e);
                None
            }
        };
        Ok(Some(LocatedLabel::Game { rect, label }))
    }

    /// Finds the logo in the left part of the frame and derives the label
    /// rectangle to its right.
    pub fn relocate(&self, frame: &RgbImage, geometry: &FrameGeometry) -> Option<Rect> {
        let strip_width = geometry.logo_scan_width().min(frame.width());
        if strip_width == 0 || frame.height() == 0 {
            return None;
        }
        let strip = imageops::crop_imm(frame, 0, 0, strip_width, frame.height()).to_image();
        let strip = imageops::grayscale(&strip);

        // Bring the strip to reference scale so it matches the template.
        let ref_width = (strip_width as f32 / geometry.x_scale()).round() as u32;
        let ref_height = (frame.height() as f32 / geometry.y_scale()).round() as u32;
        let unchanged = (ref_width, ref_height) == strip.dimensions();
        let strip = if unchanged || ref_width == 0 || ref_height == 0 {
            strip
        } else {
            imageops::resize(&strip, ref_width, ref_height, imageops::FilterType::Triangle)
        };

        let template = &self.template.features;
        let scene = detect_features(&strip, Some(&template.test_pairs));
        let matches = match_features(template, &scene, LOGO_MATCH_RATIO);
        if matches.len() < LOGO_MIN_MATCH_COUNT {
            debug!(
                "Logo not found: {} good matches, {} needed",
                matches.len(),
                LOGO_MIN_MATCH_COUNT
            );
            return None;
        }

        let (from, to): (Vec<_>, Vec<_>) = matches
            .iter()
            .map(|m| (template.position(m.query), scene.position(m.train)))
            .unzip();
        let transform = fit_similarity(&from, &to)?;

        let (left, top) = transform.apply(0.0, 0.0);
        let (right, bottom) =
            transform.apply(self.template.width as f32, self.template.height as f32);
        let logo = geometry.scale(&Rect::new(left, top, right, bottom));
        debug!("Logo found at {:?} (scale {:.3})", logo, transform.scale);

        let x1 = logo.x2 + LABEL_LEFT_PADDING;
        let x2 = geometry.label_right_edge();
        if x1 >= x2 || logo.y2 <= logo.y1 {
            return None;
        }
        Some(Rect::new(x1, logo.y1, x2, logo.y2))
    }
}
