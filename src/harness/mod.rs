//! Batch driver: configuration, frame discovery and the worker pool.

pub mod config;
pub mod frames;
pub mod pool;
pub mod record;

pub use config::HarnessConfig;
pub use frames::{FrameEntry, extract_frame_index, list_frames, session_dimensions};
pub use pool::{ExecutionMode, FrameProcessor, FrameWorkerPool, VisionWorkerFactory, WorkerFactory};
pub use record::{FailureKind, FrameError, FrameFailure, FrameRecord};
