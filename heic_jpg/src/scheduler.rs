//! Batch scheduler
//!
//! Runs the pipeline over a fixed job list on a dedicated rayon pool of `W` threads.
//! Every job yields exactly one outcome: panics become `Failed(Unexpected)`, jobs that
//! had not started when Ctrl-C arrived become `Skipped`.

use crate::config::WorkerCount;
use crate::errors::ScheduleError;
use crate::outcome::{ConversionOutcome, FailureKind, FileOutcome};
use crate::pipeline::ConversionPipeline;
use crate::resolver::ConversionJob;
use rayon::prelude::*;
use shared_utils::{BatchResult, UnifiedProgressBar};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Shared stop flag; once set, no further jobs are started.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct BatchReport {
    /// In job order.
    pub outcomes: Vec<FileOutcome>,
    pub result: BatchResult,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub duration: Duration,
}

pub struct BatchScheduler<'a> {
    pipeline: ConversionPipeline<'a>,
    workers: WorkerCount,
    show_progress: bool,
    cancel: CancelFlag,
}

impl<'a> BatchScheduler<'a> {
    pub fn new(pipeline: ConversionPipeline<'a>, workers: WorkerCount) -> Self {
        Self {
            pipeline,
            workers,
            show_progress: false,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&self, jobs: &[ConversionJob]) -> Result<BatchReport, ScheduleError> {
        let start = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.get())
            .thread_name(|i| format!("heic-to-jpg-{}", i))
            .build()?;

        let progress = UnifiedProgressBar::new(jobs.len() as u64, "Converting", self.show_progress);

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let outcome = self.run_one(job);
                    progress.inc();
                    FileOutcome {
                        source: job.source.path().to_path_buf(),
                        outcome,
                    }
                })
                .collect()
        });

        progress.finish_with_message("done");
        if self.cancel.is_cancelled() {
            warn!("Conversion cancelled; files not yet started were skipped.");
        }

        Ok(aggregate(outcomes, start.elapsed()))
    }

    fn run_one(&self, job: &ConversionJob) -> ConversionOutcome {
        if self.cancel.is_cancelled() {
            return ConversionOutcome::Skipped("cancelled".to_string());
        }
        info!(
            "Processing file {} of {}: {}",
            job.index,
            job.total,
            job.source.path().display()
        );

        match panic::catch_unwind(AssertUnwindSafe(|| self.pipeline.run(job))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    "Failed to convert {} to JPEG due to unexpected error: {}",
                    job.source.path().display(),
                    message
                );
                ConversionOutcome::failed(FailureKind::Unexpected, message)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn aggregate(outcomes: Vec<FileOutcome>, duration: Duration) -> BatchReport {
    let mut result = BatchResult::new();
    let mut input_bytes = 0;
    let mut output_bytes = 0;

    for file in &outcomes {
        match &file.outcome {
            ConversionOutcome::Success(success) => {
                result.success_with_warnings(success.warnings.len());
                input_bytes += success.input_bytes;
                output_bytes += success.output_bytes;
            }
            ConversionOutcome::Skipped(_) => result.skip(),
            ConversionOutcome::Failed { kind, message } => {
                result.fail(file.source.clone(), format!("{}: {}", kind, message));
            }
        }
    }

    BatchReport {
        outcomes,
        result,
        input_bytes,
        output_bytes,
        duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecAdapter, DecodedImage};
    use crate::config::JpegQuality;
    use crate::errors::CodecError;
    use crate::outcome::ConversionSuccess;
    use crate::pipeline::tests::{job_for, FakeCodec, FakeMetadata};
    use crate::pipeline::PipelineOptions;
    use image::RgbImage;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use tempfile::TempDir;

    /// Tracks how many decodes run at once.
    struct InFlightCodec {
        inner: FakeCodec,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CodecAdapter for InFlightCodec {
        fn decode(&self, path: &Path) -> Result<DecodedImage, CodecError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(40));
            let decoded = self.inner.decode(path);
            self.active.fetch_sub(1, Ordering::SeqCst);
            decoded
        }

        fn encode(
            &self,
            rgb: &RgbImage,
            quality: JpegQuality,
            icc_profile: Option<&[u8]>,
        ) -> Result<Vec<u8>, CodecError> {
            self.inner.encode(rgb, quality, icc_profile)
        }
    }

    fn jobs(temp: &TempDir, names: &[&str]) -> Vec<ConversionJob> {
        let total = names.len();
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut job = job_for(temp, name);
                job.index = i + 1;
                job.total = total;
                job
            })
            .collect()
    }

    #[test]
    fn test_one_outcome_per_job_despite_failures() {
        let temp = TempDir::new().unwrap();
        let names: Vec<String> = (0..12)
            .map(|i| {
                if i == 5 {
                    "corrupt_5.heic".to_string()
                } else {
                    format!("img_{}.heic", i)
                }
            })
            .collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let jobs = jobs(&temp, &name_refs);

        let codec = FakeCodec::new();
        let metadata = FakeMetadata::with_orientation(1);
        let pipeline = ConversionPipeline::new(&codec, &metadata, PipelineOptions::default());
        let report = BatchScheduler::new(pipeline, WorkerCount::new(3).unwrap())
            .run(&jobs)
            .unwrap();

        assert_eq!(report.outcomes.len(), 12);
        assert_eq!(report.result.total, 12);
        assert_eq!(report.result.succeeded, 11);
        assert_eq!(report.result.failed, 1);
        assert_eq!(report.result.skipped, 0);
        assert!(report.result.errors[0].0.ends_with("corrupt_5.heic"));
        assert!(report.result.errors[0].1.starts_with("decode:"));

        // job order preserved, each source exactly once
        let sources: Vec<PathBuf> = report.outcomes.iter().map(|o| o.source.clone()).collect();
        let expected: Vec<PathBuf> = jobs.iter().map(|j| j.source.path().to_path_buf()).collect();
        assert_eq!(sources, expected);
        let unique: HashSet<_> = sources.iter().collect();
        assert_eq!(unique.len(), 12);

        for (job, file) in jobs.iter().zip(&report.outcomes) {
            if job.source.path().ends_with("corrupt_5.heic") {
                assert!(file.outcome.is_failed());
            } else {
                assert!(job.output_path.exists());
            }
        }
        assert!(report.output_bytes > 0);
        assert_eq!(report.input_bytes, 11 * 10);
    }

    #[test]
    fn test_worker_count_caps_concurrency() {
        let temp = TempDir::new().unwrap();
        let names: Vec<String> = (0..8).map(|i| format!("shot_{}.heic", i)).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let jobs = jobs(&temp, &name_refs);

        let codec = InFlightCodec {
            inner: FakeCodec::new(),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let metadata = FakeMetadata::with_orientation(1);
        let pipeline = ConversionPipeline::new(&codec, &metadata, PipelineOptions::default());
        let report = BatchScheduler::new(pipeline, WorkerCount::new(2).unwrap())
            .run(&jobs)
            .unwrap();

        assert_eq!(report.result.succeeded, 8);
        let peak = codec.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency {} exceeds 2 workers", peak);
        assert!(peak > 1, "jobs never overlapped (peak {})", peak);
    }

    #[test]
    fn test_panic_is_isolated() {
        let temp = TempDir::new().unwrap();
        let jobs = jobs(&temp, &["a.heic", "panic.heic", "b.heic"]);

        let codec = FakeCodec::new();
        let metadata = FakeMetadata::with_orientation(1);
        let pipeline = ConversionPipeline::new(&codec, &metadata, PipelineOptions::default());
        let report = BatchScheduler::new(pipeline, WorkerCount::new(2).unwrap())
            .run(&jobs)
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].outcome.is_success());
        assert!(report.outcomes[2].outcome.is_success());
        match &report.outcomes[1].outcome {
            ConversionOutcome::Failed { kind, message } => {
                assert_eq!(*kind, FailureKind::Unexpected);
                assert!(message.contains("decoder blew up"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_single_worker_drains_everything() {
        let temp = TempDir::new().unwrap();
        let jobs = jobs(&temp, &["x.heic", "y.heic", "z.heic"]);

        let codec = FakeCodec::new();
        let metadata = FakeMetadata::with_orientation(6);
        let options = PipelineOptions {
            delete_original: true,
            ..Default::default()
        };
        let pipeline = ConversionPipeline::new(&codec, &metadata, options);
        let report = BatchScheduler::new(pipeline, WorkerCount::new(1).unwrap())
            .with_progress(false)
            .run(&jobs)
            .unwrap();

        assert_eq!(report.result.succeeded, 3);
        for job in &jobs {
            assert!(!job.source.path().exists());
            assert!(job.output_path.exists());
        }
    }

    #[test]
    fn test_cancelled_batch_skips_everything() {
        let temp = TempDir::new().unwrap();
        let jobs = jobs(&temp, &["a.heic", "b.heic"]);

        let codec = FakeCodec::new();
        let metadata = FakeMetadata::with_orientation(1);
        let pipeline = ConversionPipeline::new(&codec, &metadata, PipelineOptions::default());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let report = BatchScheduler::new(pipeline, WorkerCount::default())
            .with_cancel_flag(cancel)
            .run(&jobs)
            .unwrap();

        assert_eq!(report.result.skipped, 2);
        assert_eq!(report.result.total, 2);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.outcome == ConversionOutcome::Skipped("cancelled".into())));
        assert!(!jobs[0].output_path.exists());
    }

    #[test]
    fn test_empty_batch() {
        let codec = FakeCodec::new();
        let metadata = FakeMetadata::with_orientation(1);
        let pipeline = ConversionPipeline::new(&codec, &metadata, PipelineOptions::default());
        let report = BatchScheduler::new(pipeline, WorkerCount::default())
            .run(&[])
            .unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(report.result.total, 0);
    }

    #[test]
    fn test_aggregate_counts_warnings_and_bytes() {
        let outcomes = vec![
            FileOutcome {
                source: PathBuf::from("a.heic"),
                outcome: ConversionOutcome::Success(ConversionSuccess {
                    output: PathBuf::from("a.jpg"),
                    warnings: vec![crate::outcome::PipelineWarning::MissingIccProfile],
                    input_bytes: 100,
                    output_bytes: 40,
                    icc_embedded: false,
                    exif_written: true,
                    original_deleted: false,
                }),
            },
            FileOutcome {
                source: PathBuf::from("b.heic"),
                outcome: ConversionOutcome::failed(FailureKind::Encode, "bad"),
            },
            FileOutcome {
                source: PathBuf::from("c.heic"),
                outcome: ConversionOutcome::Skipped("cancelled".into()),
            },
        ];
        let report = aggregate(outcomes, Duration::from_secs(1));
        assert_eq!(report.result.succeeded, 1);
        assert_eq!(report.result.warnings, 1);
        assert_eq!(report.result.failed, 1);
        assert_eq!(report.result.skipped, 1);
        assert_eq!(report.result.errors[0].1, "encode: bad");
        assert_eq!(report.input_bytes, 100);
        assert_eq!(report.output_bytes, 40);
    }

    #[test]
    fn test_panic_message_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(s.as_ref()), "panic with non-string payload");
    }
}
