//! Runs frames through workers, sequentially or on a pool of threads.
//!
//! Every frame is processed behind its own failure boundary: errors and
//! panics become failed [`FrameRecord`]s and never stop the batch.
//! Records always come back in input order.

use log::{debug, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;

use crate::harness::frames::FrameEntry;
use crate::harness::record::{FrameError, FrameFailure, FrameRecord};
use crate::ocr::TextRecognizer;
use crate::types::FrameObservation;
use crate::vision::{LabelLocator, TrackingContext, VisionCore};

/// Processes frames one at a time, carrying whatever state it needs.
pub trait FrameProcessor {
    fn process(&mut self, frame: &FrameEntry) -> Result<FrameObservation, FrameError>;
}

/// Builds one processor per worker, lazily, when the worker receives its
/// first frame.
pub trait WorkerFactory: Sync {
    type Worker: FrameProcessor;

    fn build(&self) -> Result<Self::Worker, FrameError>;

    /// Replaces a worker whose frame panicked. Starts from scratch unless
    /// overridden.
    fn rebuild(&self, _panicked: Self::Worker) -> Result<Self::Worker, FrameError> {
        self.build()
    }
}

/// A [`VisionCore`] with its own [`TrackingContext`], sized after the first
/// frame it sees.
pub struct VisionWorker<R> {
    core: VisionCore<R>,
    context: Option<TrackingContext>,
}

impl<R: TextRecognizer> FrameProcessor for VisionWorker<R> {
    fn process(&mut self, frame: &FrameEntry) -> Result<FrameObservation, FrameError> {
        let image = frame.load()?;
        let context = self.context.get_or_insert_with(|| {
            debug!(
                "Worker context sized {}x{} from frame {}",
                image.width(),
                image.height(),
                frame.index
            );
            TrackingContext::for_frame(&image)
        });
        Ok(self.core.observe(&image, context)?)
    }
}

/// Hands every worker a private copy of the OCR backend and logo locator.
pub struct VisionWorkerFactory<R> {
    ocr: R,
    locator: LabelLocator,
    advanced_scraping: bool,
}

impl<R> VisionWorkerFactory<R> {
    pub fn new(ocr: R, locator: LabelLocator, advanced_scraping: bool) -> Self {
        Self {
            ocr,
            locator,
            advanced_scraping,
        }
    }
}

impl<R: TextRecognizer + Clone> VisionWorkerFactory<R> {
    fn core(&self) -> Result<VisionCore<R>, FrameError> {
        Ok(VisionCore::new(self.ocr.clone(), self.locator.clone())
            .map_err(|e| FrameError::WorkerSetup(format!("{:#}", e)))?
            .with_advanced_scraping(self.advanced_scraping))
    }
}

impl<R> WorkerFactory for VisionWorkerFactory<R>
where
    R: TextRecognizer + Clone + Sync,
{
    type Worker = VisionWorker<R>;

    fn build(&self) -> Result<Self::Worker, FrameError> {
        Ok(VisionWorker {
            core: self.core()?,
            context: None,
        })
    }

    /// Keeps the tracking context, so the label rectangle survives the panic.
    fn rebuild(&self, panicked: Self::Worker) -> Result<Self::Worker, FrameError> {
        Ok(VisionWorker {
            core: self.core()?,
            context: panicked.context,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One worker walks the frames in order.
    Sequential,
    /// Frames are cut into chunks of `chunk_size` and dealt round-robin to
    /// `workers` threads.
    Parallel { workers: usize, chunk_size: usize },
}

pub struct FrameWorkerPool<F> {
    factory: F,
    mode: ExecutionMode,
}

impl<F: WorkerFactory> FrameWorkerPool<F> {
    pub fn new(factory: F, mode: ExecutionMode) -> Self {
        Self { factory, mode }
    }

    /// Processes `frames` and returns one record per frame, in input order.
    pub fn run(&self, frames: &[FrameEntry]) -> Vec<FrameRecord> {
        match self.mode {
            ExecutionMode::Sequential => {
                info!("Processing {} frames sequentially", frames.len());
                let mut slot = None;
                frames
                    .iter()
                    .map(|frame| process_one(&self.factory, &mut slot, frame))
                    .collect()
            }
            ExecutionMode::Parallel {
                workers,
                chunk_size,
            } => self.run_parallel(frames, workers.max(1), chunk_size.max(1)),
        }
    }

    fn run_parallel(
        &self,
        frames: &[FrameEntry],
        workers: usize,
        chunk_size: usize,
    ) -> Vec<FrameRecord> {
        let chunks: Vec<&[FrameEntry]> = frames.chunks(chunk_size).collect();
        if chunks.is_empty() {
            return Vec::new();
        }
        let workers = workers.min(chunks.len());
        info!(
            "Processing {} frames in {} chunks on {} workers",
            frames.len(),
            chunks.len(),
            workers
        );

        let (result_tx, result_rx) = mpsc::channel();
        let mut finished: Vec<Option<Vec<FrameRecord>>> = (0..chunks.len()).map(|_| None).collect();

        thread::scope(|scope| {
            let mut senders = Vec::with_capacity(workers);
            for worker_id in 0..workers {
                let (chunk_tx, chunk_rx) = mpsc::channel();
                senders.push(chunk_tx);
                let result_tx = result_tx.clone();
                let factory = &self.factory;
                scope.spawn(move || run_worker(worker_id, factory, chunk_rx, result_tx));
            }
            drop(result_tx);

            for (position, chunk) in chunks.iter().enumerate() {
                if senders[position % workers].send((position, *chunk)).is_err() {
                    warn!("Worker {} is gone, chunk {} not sent", position % workers, position);
                }
            }
            drop(senders);

            for (position, records) in result_rx {
                finished[position] = Some(records);
            }
        });

        chunks
            .iter()
            .zip(finished)
            .flat_map(|(chunk, records)| {
                records.unwrap_or_else(|| {
                    chunk
                        .iter()
                        .map(|frame| {
                            let err = FrameError::Panicked(
                                "worker exited before the chunk was done".into(),
                            );
                            failed_record(frame, err, Instant::now())
                        })
                        .collect()
                })
            })
            .collect()
    }
}

/// Worker loop: processes chunks until the sender side closes.
fn run_worker<F: WorkerFactory>(
    worker_id: usize,
    factory: &F,
    chunks: Receiver<(usize, &[FrameEntry])>,
    results: Sender<(usize, Vec<FrameRecord>)>,
) {
    debug!("Worker {} started", worker_id);
    let mut slot = None;

    for (position, chunk) in chunks {
        let records = chunk
            .iter()
            .map(|frame| process_one(factory, &mut slot, frame))
            .collect();
        if results.send((position, records)).is_err() {
            break;
        }
    }

    debug!("Worker {} finished", worker_id);
}

/// Processes one frame behind a failure boundary. A worker that panicked is
/// swapped for a rebuilt one.
fn process_one<F: WorkerFactory>(
    factory: &F,
    slot: &mut Option<F::Worker>,
    frame: &FrameEntry,
) -> FrameRecord {
    let started = Instant::now();

    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        let worker = match slot {
            Some(worker) => worker,
            None => slot.insert(factory.build()?),
        };
        worker.process(frame)
    }));

    let outcome = match attempt {
        Ok(outcome) => outcome,
        Err(payload) => {
            recover(factory, slot);
            Err(FrameError::Panicked(panic_message(payload.as_ref())))
        }
    };

    match outcome {
        Ok(observation) => FrameRecord {
            frame_index: frame.index,
            outcome: Ok(observation),
            processing_duration: started.elapsed(),
        },
        Err(e) => failed_record(frame, e, started),
    }
}

/// Without a replacement the next frame builds a worker from scratch.
fn recover<F: WorkerFactory>(factory: &F, slot: &mut Option<F::Worker>) {
    let Some(panicked) = slot.take() else {
        return;
    };
    match factory.rebuild(panicked) {
        Ok(worker) => *slot = Some(worker),
        Err(e) => warn!("Cannot rebuild worker after a panic: {}", e),
    }
}

fn failed_record(frame: &FrameEntry, err: FrameError, started: Instant) -> FrameRecord {
    warn!("Error processing frame {}: {}", frame.index, err);
    FrameRecord {
        frame_index: frame.index,
        outcome: Err(FrameFailure::from(&err)),
        processing_duration: started.elapsed(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::record::FailureKind;
    use crate::ocr::OcrMode;
    use crate::types::{FrameClassification, GameReadout};
    use crate::vision::VisionError;
    use crate::vision::locator::tests::test_locator;
    use anyhow::{Result, anyhow};
    use image::{DynamicImage, GenericImageView, RgbImage};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Reports each frame's index as its match time.
    struct ScriptedFactory {
        fail_on: Option<u64>,
        panic_on: Option<u64>,
        refuse_setup: bool,
        builds: AtomicUsize,
    }

    impl ScriptedFactory {
        fn new() -> Self {
            Self {
                fail_on: None,
                panic_on: None,
                refuse_setup: false,
                builds: AtomicUsize::new(0),
            }
        }
    }

    struct ScriptedWorker {
        fail_on: Option<u64>,
        panic_on: Option<u64>,
    }

    impl FrameProcessor for ScriptedWorker {
        fn process(&mut self, frame: &FrameEntry) -> Result<FrameObservation, FrameError> {
            if self.fail_on == Some(frame.index) {
                return Err(VisionError::Ocr(anyhow!("unreadable")).into());
            }
            if self.panic_on == Some(frame.index) {
                panic!("worker blew up on {}", frame.index);
            }
            Ok(FrameObservation::Game {
                label: None,
                readout: GameReadout {
                    match_time: Some(frame.index),
                    ..GameReadout::default()
                },
            })
        }
    }

    impl WorkerFactory for ScriptedFactory {
        type Worker = ScriptedWorker;

        fn build(&self) -> Result<Self::Worker, FrameError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if self.refuse_setup {
                return Err(FrameError::WorkerSetup("no OCR backend".into()));
            }
            Ok(ScriptedWorker {
                fail_on: self.fail_on,
                panic_on: self.panic_on,
            })
        }
    }

    fn frames(range: std::ops::Range<u64>) -> Vec<FrameEntry> {
        range
            .map(|index| FrameEntry {
                index,
                path: PathBuf::from(format!("frame{:04}.jpg", index)),
            })
            .collect()
    }

    fn assert_ordered_with_one_failure(records: &[FrameRecord], input: &[FrameEntry], failed: u64) {
        assert_eq!(records.len(), input.len());
        for (record, frame) in records.iter().zip(input) {
            assert_eq!(record.frame_index, frame.index);
            if frame.index == failed {
                assert_eq!(record.failure().unwrap().kind, FailureKind::Ocr);
            } else {
                assert_eq!(
                    record.observation().unwrap().match_time(),
                    Some(frame.index)
                );
            }
        }
    }

    #[test]
    fn test_sequential_isolates_failure() {
        let input = frames(100..125);
        let pool = FrameWorkerPool::new(
            ScriptedFactory {
                fail_on: Some(110),
                ..ScriptedFactory::new()
            },
            ExecutionMode::Sequential,
        );

        let records = pool.run(&input);
        assert_ordered_with_one_failure(&records, &input, 110);
        assert_eq!(pool.factory.builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parallel_keeps_input_order() {
        let input = frames(100..125);
        let pool = FrameWorkerPool::new(
            ScriptedFactory {
                fail_on: Some(117),
                ..ScriptedFactory::new()
            },
            ExecutionMode::Parallel {
                workers: 3,
                chunk_size: 4,
            },
        );

        let records = pool.run(&input);
        assert_ordered_with_one_failure(&records, &input, 117);
        // One lazily built worker per thread
        assert_eq!(pool.factory.builds.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_more_workers_than_chunks() {
        let input = frames(0..3);
        let pool = FrameWorkerPool::new(
            ScriptedFactory::new(),
            ExecutionMode::Parallel {
                workers: 8,
                chunk_size: 10,
            },
        );
        assert_eq!(pool.run(&input).len(), 3);
        assert_eq!(pool.factory.builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_input() {
        let pool = FrameWorkerPool::new(
            ScriptedFactory::new(),
            ExecutionMode::Parallel {
                workers: 2,
                chunk_size: 0,
            },
        );
        assert!(pool.run(&[]).is_empty());
    }

    #[test]
    fn test_panic_is_caught_and_worker_rebuilt() {
        let input = frames(0..6);
        // The panicking worker is built twice, any other worker once.
        for (mode, builds) in [
            (ExecutionMode::Sequential, 2),
            (
                ExecutionMode::Parallel {
                    workers: 2,
                    chunk_size: 3,
                },
                3,
            ),
        ] {
            let pool = FrameWorkerPool::new(
                ScriptedFactory {
                    panic_on: Some(1),
                    ..ScriptedFactory::new()
                },
                mode,
            );

            let records = pool.run(&input);
            assert_eq!(records.len(), 6);
            let failure = records[1].failure().unwrap();
            assert_eq!(failure.kind, FailureKind::Panic);
            assert!(failure.message.contains("worker blew up on 1"));
            assert!(records.iter().filter(|r| r.is_failure()).count() == 1);
            assert_eq!(records[2].observation().unwrap().match_time(), Some(2));
            assert_eq!(pool.factory.builds.load(Ordering::SeqCst), builds);
        }
    }

    #[test]
    fn test_setup_failure_fails_each_frame() {
        let input = frames(0..4);
        let pool = FrameWorkerPool::new(
            ScriptedFactory {
                refuse_setup: true,
                ..ScriptedFactory::new()
            },
            ExecutionMode::Sequential,
        );

        let records = pool.run(&input);
        assert!(records.iter().all(|r| r.failure().unwrap().kind == FailureKind::Setup));
        assert_eq!(pool.factory.builds.load(Ordering::SeqCst), 4);
    }

    fn overlay_ocr(img: &DynamicImage, _mode: OcrMode) -> Result<String> {
        Ok(match img.dimensions() {
            (465, 50) => "Qualification 4 of 20".to_string(),
            (52, 27) => "9".to_string(),
            _ => String::new(),
        })
    }

    #[test]
    fn test_vision_workers_on_disk_frames() {
        let dir = tempdir().unwrap();
        let mut input = Vec::new();
        for index in [10u64, 11, 12, 13] {
            let path = dir.path().join(format!("frame{:04}.png", index));
            if index == 12 {
                std::fs::write(&path, b"not a png").unwrap();
            } else {
                RgbImage::new(1280, 720).save(&path).unwrap();
            }
            input.push(FrameEntry { index, path });
        }

        for mode in [
            ExecutionMode::Sequential,
            ExecutionMode::Parallel {
                workers: 2,
                chunk_size: 1,
            },
        ] {
            let factory = VisionWorkerFactory::new(overlay_ocr, test_locator(), false);
            let records = FrameWorkerPool::new(factory, mode).run(&input);

            let indices: Vec<u64> = records.iter().map(|r| r.frame_index).collect();
            assert_eq!(indices, vec![10, 11, 12, 13]);
            assert_eq!(records[2].failure().unwrap().kind, FailureKind::Decode);
            for record in [&records[0], &records[1], &records[3]] {
                let observation = record.observation().unwrap();
                assert_eq!(observation.classification(), FrameClassification::Game);
                assert_eq!(observation.label().unwrap().match_number, "4");
                assert_eq!(observation.match_time(), Some(9));
            }
        }
    }
    #[test]
    fn test_worker_context_sized_from_first_frame_and_kept_on_rebuild() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame0001.png");
        RgbImage::new(1280, 720).save(&path).unwrap();
        let frame = FrameEntry { index: 1, path };

        let factory = VisionWorkerFactory::new(overlay_ocr, test_locator(), false);
        let mut worker = factory.build().unwrap();
        assert!(worker.context.is_none());

        worker.process(&frame).unwrap();
        let context = worker.context.clone().unwrap();
        assert_eq!(context.geometry().width(), 1280);
        assert!(context.label_rect().is_some());

        let rebuilt = factory.rebuild(worker).unwrap();
        assert_eq!(rebuilt.context, Some(context));
    }

    /// Needs Tesseract and a directory holding the sample broadcast frames
    /// plus `first-logo.bmp`.
    #[test]
    #[ignore]
    fn test_sample_broadcast() {
        use crate::harness::frames::list_frames;
        use crate::ocr::{TesseractEngine, locate_tesseract};
        use crate::types::BannerKind;

        let dir = PathBuf::from(std::env::var("MATCH_OBSERVER_SAMPLES").unwrap());
        let locator = LabelLocator::from_template_file(&dir.join("first-logo.bmp")).unwrap();
        let engine = TesseractEngine::new(locate_tesseract(None, None).unwrap());
        let frames = list_frames(&dir, 649, 845).unwrap();

        let pool = FrameWorkerPool::new(
            VisionWorkerFactory::new(engine, locator, false),
            ExecutionMode::Sequential,
        );
        let records = pool.run(&frames);
        let find = |index: u64| {
            records
                .iter()
                .find(|r| r.frame_index == index)
                .and_then(|r| r.observation())
                .unwrap()
        };

        assert!(matches!(
            find(649),
            FrameObservation::Outside {
                banner: Some(BannerKind::Preview),
                ..
            }
        ));
        let auton = find(653);
        assert_eq!(auton.classification(), FrameClassification::Game);
        assert!(auton.match_time().is_some_and(|t| t <= 15));
        assert!(matches!(
            find(845),
            FrameObservation::Outside {
                banner: Some(BannerKind::Results),
                ..
            }
        ));
    }
}
