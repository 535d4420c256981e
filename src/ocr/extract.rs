use anyhow::Result;
use image::{DynamicImage, RgbImage, imageops};
use log::debug;
use regex::Regex;

use super::preprocess::{enhance_contrast, inverted_luma, threshold};
use super::{OcrMode, TextRecognizer};
use crate::types::{BannerKind, MatchLabel, MatchType};
use crate::vision::regions::{MATCH_TIME_CONTRAST, MATCH_TIME_THRESHOLD};

/// Character class for anything OCR might return in place of a digit.
const NUMBER_CLASS: &str = "0-9ZSO";

/// Match-identifier patterns, most specific first.
///
/// `@` stands for [`NUMBER_CLASS`]. Tiebreakers come before their plain
/// round, "of N" forms before bare terminal numbers, and the Einstein
/// variants are kept apart from the generic Final patterns so neither
/// shadows the other.
const MATCH_ID_FORMATS: &[(&str, MatchType)] = &[
    (r"^Qualif[^@]+([@\s]+)of", MatchType::Qualification),
    (r"^Quart[^T]+Tieb[^@]+([@\s]+)$", MatchType::QuarterfinalTiebreaker),
    (r"^Quart[^@]+([@\s]+)of", MatchType::Quarterfinal),
    (r"^Quart[^@]+([@\s]+)$", MatchType::Quarterfinal),
    (r"^Semi[^T]+Tieb[^@]+([@\s]+)", MatchType::SemifinalTiebreaker),
    (r"^Semi[^@]+([@\s]+)of", MatchType::Semifinal),
    (r"^Semi[^@]+([@\s]+)$", MatchType::Semifinal),
    (r"^Fin[^T]+Tieb[^@]+([@\s]+)", MatchType::FinalTiebreaker),
    (r"^Fin[^@]+([@\s]+)of", MatchType::Final),
    (r"^Fin[^@]+([@\s]+)$", MatchType::Final),
    (r"^Practice[^@]+([@\s]+)of", MatchType::Practice),
    (r"^Einst[^F]+Fin[^T]+Tieb[^@]+([@\s]+)", MatchType::FinalTiebreaker),
    (r"^Einst[^F]+Fin[^@]+([@\s]+)of", MatchType::Final),
    (r"^Einst[^F]+Fin[^@]+([@\s]+)$", MatchType::Final),
    (r"^Einst[^T]+Tieb[^@]+([@\s]+)", MatchType::PlayoffTiebreaker),
    (r"^Einst[^@]+([@\s]+)of", MatchType::Playoff),
    (r"^Einst[^@]+([@\s]+)$", MatchType::Playoff),
];

const RESULTS_CAPTION: &str = r"(?i)^Match[^R]+Res";
const PREVIEW_CAPTION: &str = r"(?i)^Match[^P]+Pre";

/// Removes whitespace and maps the letters Tesseract confuses with digits.
pub fn fix_digits(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            'Z' => '2',
            'S' => '5',
            'O' => '0',
            other => other,
        })
        .collect()
}

/// Parses OCR output that should be a number.
///
/// Returns `None` when no digit survives the clean-up. A digit run too long
/// for `u64` saturates.
pub fn interpret_as_number(text: &str) -> Option<u64> {
    let digits: String = fix_digits(text)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return None;
    }
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// Compiled match-identifier patterns.
#[derive(Debug, Clone)]
pub struct MatchIdTable {
    formats: Vec<(Regex, MatchType)>,
}

impl MatchIdTable {
    pub fn new() -> Result<Self, regex::Error> {
        let formats = MATCH_ID_FORMATS
            .iter()
            .map(|(pattern, match_type)| {
                let pattern = format!("(?m){}", pattern.replace('@', NUMBER_CLASS));
                Regex::new(&pattern).map(|regex| (regex, *match_type))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { formats })
    }

    /// Finds the first pattern whose captured number is non-empty after
    /// clean-up. A pattern that matches with an empty number is skipped.
    pub fn interpret(&self, text: &str) -> Option<MatchLabel> {
        let text = text.trim();
        for (regex, match_type) in &self.formats {
            let Some(captures) = regex.captures(text) else {
                continue;
            };
            let number = captures
                .get(1)
                .map(|m| fix_digits(m.as_str()))
                .unwrap_or_default();
            if let Some(label) = MatchLabel::new(*match_type, number) {
                return Some(label);
            }
        }
        None
    }
}

/// Recognises the banner captions "Match Preview" and "Match Results".
#[derive(Debug, Clone)]
pub struct BannerCaptions {
    results: Regex,
    preview: Regex,
}

impl BannerCaptions {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            results: Regex::new(RESULTS_CAPTION)?,
            preview: Regex::new(PREVIEW_CAPTION)?,
        })
    }

    pub fn interpret(&self, text: &str) -> Option<BannerKind> {
        let text = text.trim_start();
        if self.results.is_match(text) {
            Some(BannerKind::Results)
        } else if self.preview.is_match(text) {
            Some(BannerKind::Preview)
        } else {
            None
        }
    }
}

/// Reads numbers, match labels and banner captions from overlay crops.
pub struct TextExtractor<R> {
    ocr: R,
    match_ids: MatchIdTable,
    banners: BannerCaptions,
}

impl<R: TextRecognizer> TextExtractor<R> {
    pub fn new(ocr: R) -> Result<Self, regex::Error> {
        Ok(Self {
            ocr,
            match_ids: MatchIdTable::new()?,
            banners: BannerCaptions::new()?,
        })
    }

    /// Digit-biased OCR followed by [`interpret_as_number`].
    pub fn read_number(&self, img: &DynamicImage) -> Result<Option<u64>> {
        let text = self.ocr.recognize(img, OcrMode::Digits)?;
        Ok(interpret_as_number(&text))
    }

    /// Reads the match clock, trying progressively less processed crops.
    ///
    /// 1. contrast-stretched and thresholded to black and white
    /// 2. contrast-stretched grayscale
    /// 3. the raw crop
    pub fn read_match_time(&self, crop: &RgbImage) -> Result<Option<u64>> {
        let enhanced = imageops::grayscale(&enhance_contrast(crop, MATCH_TIME_CONTRAST));
        let thresholded = threshold(&enhanced, MATCH_TIME_THRESHOLD);

        let tiers = [
            DynamicImage::ImageLuma8(thresholded),
            DynamicImage::ImageLuma8(enhanced),
            DynamicImage::ImageRgb8(crop.clone()),
        ];
        for (tier, img) in tiers.iter().enumerate() {
            if let Some(seconds) = self.read_number(img)? {
                debug!("Match time {} read on tier {}", seconds, tier + 1);
                return Ok(Some(seconds));
            }
        }
        Ok(None)
    }

    /// Reads a light-on-dark score.
    pub fn read_score(&self, crop: &RgbImage) -> Result<Option<u64>> {
        self.read_number(&DynamicImage::ImageLuma8(inverted_luma(crop)))
    }

    pub fn read_match_id(&self, crop: &RgbImage) -> Result<Option<MatchLabel>> {
        let text = self
            .ocr
            .recognize(&DynamicImage::ImageRgb8(crop.clone()), OcrMode::Text)?;
        Ok(self.match_ids.interpret(&text))
    }

    pub fn read_banner(&self, crop: &RgbImage) -> Result<Option<BannerKind>> {
        let text = self
            .ocr
            .recognize(&DynamicImage::ImageRgb8(crop.clone()), OcrMode::Text)?;
        Ok(self.banners.interpret(&text))
    }
}
