//! Per-frame results and failures.

use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::{FrameClassification, FrameObservation, MatchPeriod, MatchType};
use crate::vision::VisionError;

/// Anything that can go wrong while processing one frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Failed to open frame {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error("Worker setup failed: {0}")]
    WorkerSetup(String),

    #[error("Frame processing panicked: {0}")]
    Panicked(String),
}

impl FrameError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FrameError::Open { .. } => FailureKind::Decode,
            FrameError::Vision(VisionError::Ocr(_)) => FailureKind::Ocr,
            FrameError::Vision(VisionError::CropOutOfBounds { .. }) => FailureKind::Crop,
            FrameError::Vision(VisionError::TemplateLoad { .. })
            | FrameError::Vision(VisionError::TemplateFeatures { .. })
            | FrameError::WorkerSetup(_) => FailureKind::Setup,
            FrameError::Panicked(_) => FailureKind::Panic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Decode,
    Ocr,
    Crop,
    Setup,
    Panic,
}

/// A caught per-frame failure, reduced to what the output needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&FrameError> for FrameFailure {
    fn from(err: &FrameError) -> Self {
        Self {
            kind: err.kind(),
            message: format!("{:#}", err),
        }
    }
}

/// Result of processing one frame, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub frame_index: u64,
    pub outcome: Result<FrameObservation, FrameFailure>,
    pub processing_duration: Duration,
}

impl FrameRecord {
    pub fn observation(&self) -> Option<&FrameObservation> {
        self.outcome.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&FrameFailure> {
        self.outcome.as_ref().err()
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    fn row(&self) -> FrameRow<'_> {
        let mut row = FrameRow {
            frame_index: self.frame_index,
            classification: None,
            match_type: None,
            match_number: None,
            time: None,
            period: None,
            red_score: None,
            blue_score: None,
            timeout: None,
            processing_duration: self.processing_duration.as_secs_f64(),
            failure: self.failure(),
        };

        if let Some(observation) = self.observation() {
            row.classification = Some(observation.classification());
            if let Some(label) = observation.label() {
                row.match_type = Some(label.match_type);
                row.match_number = Some(&label.match_number);
            }
            if let FrameObservation::Game { readout, .. } = observation {
                row.time = readout.match_time;
                row.period = readout.period;
                row.timeout = readout.timeout;
                if let Some(scores) = readout.scores {
                    row.red_score = scores.red;
                    row.blue_score = scores.blue;
                }
            }
        }
        row
    }
}

/// Flat output shape of a [`FrameRecord`]; absent values are omitted.
#[derive(Serialize)]
struct FrameRow<'a> {
    frame_index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    classification: Option<FrameClassification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    match_type: Option<MatchType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    match_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    period: Option<MatchPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    red_score: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blue_score: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<bool>,
    processing_duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<&'a FrameFailure>,
}

impl Serialize for FrameRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.row().serialize(serializer)
    }
}
