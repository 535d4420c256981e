//! Match metadata from FRC broadcast overlay frames.
//!
//! [`vision`] finds and reads the overlay, [`ocr`] wraps Tesseract and the
//! text interpretation, and [`harness`] runs a directory of numbered frames
//! through a pool of workers.

pub mod harness;
pub mod ocr;
pub mod paths;
pub mod types;
pub mod vision;
