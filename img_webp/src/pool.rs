//! Worker pool and batch orchestration
//!
//! The orchestrator is the single producer: it feeds every job into a bounded
//! channel from the calling thread, closes it, and waits at the end of the
//! rayon scope until every worker has drained the channel and exited.
//!
//! Per job: `Pending -> Processing -> {Succeeded, Failed}`. No retries; a
//! failure is recorded, counted and the worker moves on.

use crate::aggregator::OutcomeAggregator;
use crate::codec::{encode_settings, ImageCodec};
use crate::fetch::Fetcher;
use crate::job::{ConversionOptions, Job};
use shared_utils::{JobError, ProgressHandle, SetupError};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Output file extension for every job.
pub const OUTPUT_EXTENSION: &str = "webp";

/// Upper bound on pool threads; larger requests would fail to spawn.
pub const MAX_WORKERS: usize = 512;

/// Clamp a requested worker count into `1..=MAX_WORKERS`.
pub fn effective_worker_count(requested: i64) -> usize {
    usize::try_from(requested).unwrap_or(0).clamp(1, MAX_WORKERS)
}

/// Final batch outcome, only produced after full drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub converted: usize,
    pub failed: usize,
    pub output_dir: PathBuf,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.converted + self.failed
    }
}

pub struct WorkerPool<'a> {
    codec: &'a dyn ImageCodec,
    fetcher: &'a dyn Fetcher,
    output_dir: &'a Path,
    options: ConversionOptions,
    workers: usize,
}

impl<'a> WorkerPool<'a> {
    pub fn new(
        codec: &'a dyn ImageCodec,
        fetcher: &'a dyn Fetcher,
        output_dir: &'a Path,
        options: ConversionOptions,
        requested_workers: i64,
    ) -> Self {
        Self {
            codec,
            fetcher,
            output_dir,
            options,
            workers: effective_worker_count(requested_workers),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job to completion and return the summary.
    ///
    /// `progress` is consumed: once this returns, every clone held by the
    /// workers has been dropped, so the reporter can be joined.
    pub fn run(
        &self,
        jobs: Vec<Job>,
        aggregator: &OutcomeAggregator,
        progress: ProgressHandle,
    ) -> Result<Summary, SetupError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("webp-worker-{}", i))
            .build()
            .map_err(|e| SetupError::WorkerPool(e.to_string()))?;

        let total = jobs.len();
        let start = Instant::now();
        info!(jobs = total, workers = self.workers, output = ?self.output_dir, "Batch started");

        let (tx, rx) = flume::bounded::<Job>(self.workers);

        pool.in_place_scope(|scope| {
            for worker_id in 0..self.workers {
                let rx = rx.clone();
                let progress = progress.clone();
                scope.spawn(move |_| self.worker_loop(worker_id, rx, aggregator, progress));
            }
            drop(rx);

            for job in jobs {
                // Only fails if every worker is gone, which worker_loop never allows.
                if let Err(flume::SendError(job)) = tx.send(job) {
                    warn!(job = %job, "No workers left to accept job");
                    break;
                }
            }
            // End of input: workers exit once the channel is empty.
            drop(tx);
        });
        drop(progress);

        let counters = aggregator.snapshot();
        info!(
            converted = counters.converted,
            failed = counters.failed,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Batch drained"
        );

        Ok(Summary {
            converted: counters.converted,
            failed: counters.failed,
            output_dir: self.output_dir.to_path_buf(),
        })
    }

    fn worker_loop(
        &self,
        worker_id: usize,
        rx: flume::Receiver<Job>,
        aggregator: &OutcomeAggregator,
        progress: ProgressHandle,
    ) {
        for job in rx.iter() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process(&job, aggregator)))
                .unwrap_or_else(|payload| {
                    Err(JobError::Panicked {
                        target: job.to_string(),
                        cause: panic_message(payload.as_ref()),
                    })
                });

            match outcome {
                Ok(output) => {
                    debug!(worker = worker_id, job = %job, output = ?output, "Converted");
                    aggregator.record_success();
                }
                Err(e) => {
                    warn!(
                        worker = worker_id,
                        job = %job,
                        remote = job.is_url(),
                        kind = ?e.kind(),
                        error = %e,
                        "Conversion failed"
                    );
                    aggregator.record_failure(&e);
                }
            }
            progress.advance();
        }
        debug!(worker = worker_id, "Worker drained");
    }

    /// Acquire bytes, decode, claim an output path, encode, write.
    fn process(&self, job: &Job, aggregator: &OutcomeAggregator) -> Result<PathBuf, JobError> {
        let bytes = match job {
            Job::LocalFile(path) => fs::read(path).map_err(|source| JobError::Open {
                path: path.clone(),
                source,
            })?,
            Job::RemoteUrl(url) => self.download(url)?,
        };

        let decoded = self.codec.decode(&bytes).map_err(|e| JobError::Decode {
            target: job.to_string(),
            cause: e.to_string(),
        })?;
        let settings = encode_settings(&self.options, decoded.format);

        let output = aggregator.claim_output_path(self.output_dir, &job.output_base_name(), OUTPUT_EXTENSION);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|source| JobError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let encoded = self.codec.encode(&decoded, settings).map_err(|e| JobError::Encode {
            path: output.clone(),
            cause: e.to_string(),
        })?;

        fs::write(&output, encoded).map_err(|source| JobError::Write {
            path: output.clone(),
            source,
        })?;

        Ok(output)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, JobError> {
        let response = self.fetcher.get(url).map_err(|e| JobError::Download {
            url: url.to_string(),
            cause: e.to_string(),
        })?;

        if !response.is_success() {
            return Err(JobError::HttpStatus {
                url: url.to_string(),
                status: response.status_text,
            });
        }
        Ok(response.body)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::ErrorLog;
    use crate::codec::{CodecError, DecodedImage, EncodeSettings};
    use crate::fetch::{FetchError, FetchResponse};
    use image::{DynamicImage, ImageFormat};
    use proptest::prelude::*;
    use shared_utils::{create_progress_bar, spawn_progress_reporter, ProgressReporter};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Bytes starting with `png` decode as PNG, `jpg` as JPEG, `boom` panics,
    /// anything else fails. Encode fails when the image is 3 pixels wide.
    #[derive(Default)]
    struct FakeCodec {
        encodes: Mutex<Vec<EncodeSettings>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ImageCodec for FakeCodec {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, CodecError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(2));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let (format, width) = if bytes.starts_with(b"png") {
                (ImageFormat::Png, 1)
            } else if bytes.starts_with(b"jpg3") {
                (ImageFormat::Jpeg, 3)
            } else if bytes.starts_with(b"jpg") {
                (ImageFormat::Jpeg, 1)
            } else if bytes.starts_with(b"boom") {
                panic!("decoder exploded");
            } else {
                return Err(CodecError::Decode("unrecognized image format".into()));
            };
            Ok(DecodedImage {
                image: DynamicImage::new_rgb8(width, 1),
                format,
            })
        }

        fn encode(&self, image: &DecodedImage, settings: EncodeSettings) -> Result<Vec<u8>, CodecError> {
            self.encodes.lock().unwrap().push(settings);
            if image.image.width() == 3 {
                return Err(CodecError::Encode("codec refused".into()));
            }
            Ok(b"RIFF....WEBP".to_vec())
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        responses: HashMap<String, (u16, Vec<u8>)>,
    }

    impl FakeFetcher {
        fn with(mut self, url: &str, status: u16, body: &[u8]) -> Self {
            self.responses.insert(url.to_string(), (status, body.to_vec()));
            self
        }
    }

    impl Fetcher for FakeFetcher {
        fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
            match self.responses.get(url) {
                Some((status, body)) => Ok(FetchResponse {
                    status: *status,
                    status_text: format!("{} Status", status),
                    body: body.clone(),
                }),
                None => Err(FetchError("connection refused".into())),
            }
        }
    }

    struct Harness {
        dir: TempDir,
        aggregator: OutcomeAggregator,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let log = ErrorLog::create(&dir.path().join("webp-errors.log")).unwrap();
            Self {
                dir,
                aggregator: OutcomeAggregator::new(log),
            }
        }

        fn out(&self) -> PathBuf {
            self.dir.path().join("out")
        }

        fn local(&self, name: &str, contents: &[u8]) -> Job {
            let path = self.dir.path().join("src").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            Job::LocalFile(path)
        }

        fn run(
            &self,
            codec: &FakeCodec,
            fetcher: &FakeFetcher,
            options: ConversionOptions,
            workers: i64,
            jobs: Vec<Job>,
        ) -> (Summary, u64) {
            let out = self.out();
            let pool = WorkerPool::new(codec, fetcher, &out, options, workers);
            let bar = create_progress_bar(jobs.len() as u64, "Test", true);
            let (reporter, handle): (ProgressReporter, _) = spawn_progress_reporter(bar, 4);
            let summary = pool.run(jobs, &self.aggregator, handle).unwrap();
            (summary, reporter.finish())
        }

        fn error_log(&self) -> String {
            fs::read_to_string(self.aggregator.error_log_path()).unwrap()
        }
    }

    #[test]
    fn test_effective_worker_count() {
        assert_eq!(effective_worker_count(-5), 1);
        assert_eq!(effective_worker_count(0), 1);
        assert_eq!(effective_worker_count(1), 1);
        assert_eq!(effective_worker_count(8), 8);
        assert_eq!(effective_worker_count(MAX_WORKERS as i64), MAX_WORKERS);
        assert_eq!(effective_worker_count(1_000_000), MAX_WORKERS);
        assert_eq!(effective_worker_count(i64::MAX), MAX_WORKERS);
    }

    #[test]
    fn test_mixed_batch_conserves_counts() {
        let h = Harness::new();
        let codec = FakeCodec::default();
        let fetcher = FakeFetcher::default()
            .with("http://x/ok.png", 200, b"png")
            .with("http://x/missing.png", 404, b"")
            .with("http://x/garbage.png", 200, b"html");

        let jobs = vec![
            h.local("a.png", b"png"),
            h.local("b.jpg", b"jpg"),
            h.local("corrupt.jpg", b"nope"),
            Job::LocalFile(h.dir.path().join("src/vanished.png")),
            Job::RemoteUrl("http://x/ok.png".into()),
            Job::RemoteUrl("http://x/missing.png".into()),
            Job::RemoteUrl("http://x/garbage.png".into()),
            Job::RemoteUrl("http://unreachable/z.png".into()),
        ];

        let (summary, ticks) = h.run(&codec, &fetcher, ConversionOptions::default(), 3, jobs);

        assert_eq!(summary.converted, 3);
        assert_eq!(summary.failed, 5);
        assert_eq!(summary.total(), 8);
        assert_eq!(ticks, 8);
        assert_eq!(summary.output_dir, h.out());

        let log = h.error_log();
        assert_eq!(log.lines().count(), 5);
        assert!(log.contains("decode ") && log.contains("corrupt.jpg"));
        assert!(log.contains("open file ") && log.contains("vanished.png"));
        assert!(log.contains("invalid response http://x/missing.png: 404 Status"));
        assert!(log.contains("decode http://x/garbage.png"));
        assert!(log.contains("download http://unreachable/z.png: connection refused"));

        assert!(h.out().join("a.webp").exists());
        assert!(h.out().join("b.webp").exists());
        assert!(h.out().join("ok.webp").exists());
    }

    #[test]
    fn test_empty_batch_terminates() {
        let h = Harness::new();
        let (summary, ticks) = h.run(
            &FakeCodec::default(),
            &FakeFetcher::default(),
            ConversionOptions::default(),
            4,
            Vec::new(),
        );
        assert_eq!(summary.total(), 0);
        assert_eq!(ticks, 0);
    }

    #[test]
    fn test_zero_workers_clamped_and_completes() {
        let h = Harness::new();
        let codec = FakeCodec::default();
        let jobs = (0..5).map(|i| h.local(&format!("{}.png", i), b"png")).collect();

        let (summary, _) = h.run(&codec, &FakeFetcher::default(), ConversionOptions::default(), 0, jobs);
        assert_eq!(summary.converted, 5);
        assert_eq!(codec.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_workers_run_in_parallel() {
        let h = Harness::new();
        let codec = FakeCodec::default();
        let jobs = (0..32).map(|i| h.local(&format!("{}.jpg", i), b"jpg")).collect();

        let (summary, _) = h.run(&codec, &FakeFetcher::default(), ConversionOptions::default(), 4, jobs);
        assert_eq!(summary.converted, 32);
        let max = codec.max_in_flight.load(Ordering::SeqCst);
        assert!((1..=4).contains(&max), "max in flight {}", max);
    }

    #[test]
    fn test_duplicate_urls_get_distinct_outputs() {
        let h = Harness::new();
        let fetcher = FakeFetcher::default().with("http://x/1.png", 200, b"png");
        let jobs = crate::job::parse_url_list("http://x/1.png, http://x/1.png");

        let (summary, _) = h.run(&FakeCodec::default(), &fetcher, ConversionOptions::default(), 2, jobs);
        assert_eq!(summary.converted, 2);
        assert!(h.out().join("1.webp").exists());
        assert!(h.out().join("1-1.webp").exists());
    }

    #[test]
    fn test_existing_output_is_not_overwritten() {
        let h = Harness::new();
        fs::create_dir_all(h.out()).unwrap();
        fs::write(h.out().join("a.webp"), b"keep me").unwrap();

        let jobs = vec![h.local("a.png", b"png")];
        h.run(&FakeCodec::default(), &FakeFetcher::default(), ConversionOptions::default(), 1, jobs);

        assert_eq!(fs::read(h.out().join("a.webp")).unwrap(), b"keep me");
        assert!(h.out().join("a-1.webp").exists());
    }

    #[test]
    fn test_lossless_override_reaches_encoder() {
        let h = Harness::new();
        let codec = FakeCodec::default();
        let options = ConversionOptions { quality: 55, lossless: false };
        let jobs = vec![h.local("a.png", b"png"), h.local("b.jpg", b"jpg")];

        h.run(&codec, &FakeFetcher::default(), options, 1, jobs);

        let encodes = codec.encodes.lock().unwrap();
        assert_eq!(encodes.len(), 2);
        assert!(encodes.contains(&EncodeSettings { quality: 55.0, lossless: true }));
        assert!(encodes.contains(&EncodeSettings { quality: 55.0, lossless: false }));
    }

    #[test]
    fn test_encode_failure_leaves_no_output() {
        let h = Harness::new();
        let jobs = vec![h.local("wide.jpg", b"jpg3")];
        let (summary, _) = h.run(
            &FakeCodec::default(),
            &FakeFetcher::default(),
            ConversionOptions::default(),
            1,
            jobs,
        );
        assert_eq!(summary.failed, 1);
        assert!(!h.out().join("wide.webp").exists());
        assert!(h.error_log().contains("encode "));
    }

    #[test]
    fn test_write_failure_is_isolated() {
        let h = Harness::new();
        // a plain file where the output directory should be
        fs::write(h.out(), b"not a dir").unwrap();

        let jobs = vec![h.local("a.png", b"png"), h.local("b.png", b"png")];
        let (summary, ticks) = h.run(
            &FakeCodec::default(),
            &FakeFetcher::default(),
            ConversionOptions::default(),
            2,
            jobs,
        );
        assert_eq!(summary.failed, 2);
        assert_eq!(ticks, 2);
        assert_eq!(h.error_log().lines().count(), 2);
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let h = Harness::new();
        let jobs = vec![h.local("boom.png", b"boom"), h.local("ok.png", b"png")];
        let (summary, ticks) = h.run(
            &FakeCodec::default(),
            &FakeFetcher::default(),
            ConversionOptions::default(),
            1,
            jobs,
        );
        assert_eq!(summary.converted, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(ticks, 2);
        assert!(h.error_log().contains("worker panicked on"));
        assert!(h.error_log().contains("decoder exploded"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn every_job_is_accounted_for(
            kinds in proptest::collection::vec(0u8..4, 0..40),
            workers in -2i64..7,
        ) {
            let h = Harness::new();
            let fetcher = FakeFetcher::default().with("http://x/good.jpg", 200, b"jpg");
            let jobs: Vec<Job> = kinds
                .iter()
                .enumerate()
                .map(|(i, k)| match k {
                    0 => h.local(&format!("{}.png", i), b"png"),
                    1 => h.local(&format!("{}.jpg", i), b"bad"),
                    2 => Job::RemoteUrl("http://x/good.jpg".into()),
                    _ => Job::RemoteUrl(format!("http://x/{}.png", i)),
                })
                .collect();
            let expected_ok = kinds.iter().filter(|k| **k == 0 || **k == 2).count();

            let (summary, ticks) = h.run(
                &FakeCodec::default(),
                &fetcher,
                ConversionOptions::default(),
                workers,
                jobs,
            );

            prop_assert_eq!(summary.total(), kinds.len());
            prop_assert_eq!(summary.converted, expected_ok);
            prop_assert_eq!(ticks as usize, kinds.len());
            prop_assert_eq!(h.error_log().lines().count(), summary.failed);
        }
    }
}
