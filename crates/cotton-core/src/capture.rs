//! Sequential capture loop: frame source → detection → transmission.
//!
//! Each item is one cycle. A bad frame or a failed inference aborts only that
//! cycle; an unreachable collector is logged and the record is dropped. The
//! loop ends when the source is exhausted or the cancellation token fires.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use crate::domain::{CapturedAt, FrameError, PipelineError};
use crate::obs::CycleSpan;
use crate::pipeline::DetectionPipeline;
use crate::preprocess::Frame;
use crate::transport::{RetryPolicy, SendOutcome, TransportClient};

/// One captured still.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub frame: Frame,
    pub captured_at: CapturedAt,
    /// Where the frame came from (file path, device name).
    pub origin: String,
}

/// Producer of frames for the capture loop.
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the source is exhausted. A frame that
    /// cannot be read is returned as an error and does not end the source.
    async fn next_frame(&mut self) -> Option<Result<CapturedFrame, FrameError>>;
}

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Failed reads of one still, in `follow` mode, before the error is yielded.
const MAX_READ_ATTEMPTS: u32 = 5;

/// Drop directory watched for new stills (e.g. written by a camera tool).
///
/// Every image file is yielded once, in file-name order. With `follow` the
/// source polls for new files forever; without it, it is exhausted once no
/// unseen files remain.
///
/// In `follow` mode a file that fails to decode is retried on later polls,
/// since the camera tool may still be writing it. Only after
/// `MAX_READ_ATTEMPTS` failed reads is the error yielded.
pub struct DirectorySource {
    dir: PathBuf,
    follow: bool,
    poll_interval: Duration,
    seen: HashSet<PathBuf>,
    pending: Vec<PathBuf>,
    /// Failed reads per path, for files awaiting a retry.
    attempts: HashMap<PathBuf, u32>,
    /// Paths to hand back to the next scan after a poll interval.
    deferred: Vec<PathBuf>,
    done: bool,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            follow: false,
            poll_interval: Duration::from_secs(1),
            seen: HashSet::new(),
            pending: Vec::new(),
            attempts: HashMap::new(),
            deferred: Vec::new(),
            done: false,
        }
    }

    pub fn follow(mut self, poll_interval: Duration) -> Self {
        self.follow = true;
        self.poll_interval = poll_interval;
        self
    }

    fn scan(&mut self) -> Result<(), FrameError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| FrameError::Decode(format!("{}: {e}", self.dir.display())))?;

        let mut fresh: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p) && !self.seen.contains(p))
            .collect();
        fresh.sort();
        for path in &fresh {
            self.seen.insert(path.clone());
        }
        // pending is popped from the back
        fresh.reverse();
        self.pending = fresh;
        Ok(())
    }

    /// Whether a failed read of `path` should be retried on a later poll.
    fn defer(&mut self, path: &Path) -> bool {
        if !self.follow {
            return false;
        }
        let failures = self.attempts.entry(path.to_path_buf()).or_insert(0);
        *failures += 1;
        if *failures >= MAX_READ_ATTEMPTS {
            self.attempts.remove(path);
            return false;
        }
        self.deferred.push(path.to_path_buf());
        true
    }

    fn release_deferred(&mut self) {
        for path in self.deferred.drain(..) {
            self.seen.remove(&path);
        }
    }
}

#[async_trait]
impl FrameSource for DirectorySource {
    async fn next_frame(&mut self) -> Option<Result<CapturedFrame, FrameError>> {
        loop {
            if let Some(path) = self.pending.pop() {
                let captured_at = CapturedAt::now();
                let read_path = path.clone();
                let read = tokio::task::spawn_blocking(move || Frame::open(&read_path)).await;
                let frame = match read {
                    Ok(frame) => frame,
                    Err(join) => Err(FrameError::Decode(join.to_string())),
                };
                match frame {
                    Ok(frame) => {
                        self.attempts.remove(&path);
                        return Some(Ok(CapturedFrame {
                            frame,
                            captured_at,
                            origin: path.display().to_string(),
                        }));
                    }
                    Err(err) if self.defer(&path) => {
                        debug!(path = %path.display(), error = %err, "still not readable yet; retrying on next poll");
                        continue;
                    }
                    Err(err) => return Some(Err(err)),
                }
            }

            if self.done {
                return None;
            }
            if let Err(err) = self.scan() {
                if !self.follow {
                    self.done = true;
                    return Some(Err(err));
                }
                warn!(error = %err, "drop directory scan failed");
            }
            if self.pending.is_empty() {
                if !self.follow {
                    return None;
                }
                tokio::time::sleep(self.poll_interval).await;
                self.release_deferred();
            }
        }
    }
}

/// Outcome of a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Sent,
    Unavailable,
    InvalidFrame,
    InferenceFailure,
}

/// Totals over one `CaptureLoop::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub cycles: u64,
    pub sent: u64,
    pub unavailable: u64,
    pub invalid_frames: u64,
    pub inference_failures: u64,
}

impl CaptureSummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Sent => self.sent += 1,
            CycleOutcome::Unavailable => self.unavailable += 1,
            CycleOutcome::InvalidFrame => self.invalid_frames += 1,
            CycleOutcome::InferenceFailure => self.inference_failures += 1,
        }
    }
}

/// Detection pipeline plus transport, driven one frame at a time.
pub struct CaptureLoop {
    pipeline: DetectionPipeline,
    transport: TransportClient,
    retry: RetryPolicy,
}

impl CaptureLoop {
    pub fn new(pipeline: DetectionPipeline, transport: TransportClient) -> Self {
        Self {
            pipeline,
            transport,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn run<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        cancel: CancellationToken,
    ) -> CaptureSummary {
        let mut summary = CaptureSummary::default();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("capture loop cancelled");
                    break;
                }
                next = source.next_frame() => next,
            };
            let Some(item) = next else {
                debug!("frame source exhausted");
                break;
            };

            let cycle = CycleSpan::new();
            let outcome = self.cycle(item).instrument(cycle.span()).await;
            summary.record(&outcome);
        }

        info!(
            cycles = summary.cycles,
            sent = summary.sent,
            unavailable = summary.unavailable,
            "capture loop finished"
        );
        summary
    }

    /// One detect → send cycle.
    pub async fn cycle(&self, item: Result<CapturedFrame, FrameError>) -> CycleOutcome {
        let captured = match item {
            Ok(captured) => captured,
            Err(err) => {
                warn!(error = %err, "frame could not be read");
                return CycleOutcome::InvalidFrame;
            }
        };
        debug!(origin = %captured.origin, "processing frame");

        let record = match self
            .pipeline
            .detect(&captured.frame, captured.captured_at)
            .await
        {
            Ok(record) => record,
            Err(PipelineError::InvalidFrame(_)) => return CycleOutcome::InvalidFrame,
            Err(PipelineError::InferenceFailure(_)) => return CycleOutcome::InferenceFailure,
        };

        match self.transport.send_with_retry(&record, &self.retry).await {
            SendOutcome::Ack => CycleOutcome::Sent,
            SendOutcome::Unavailable(_) => CycleOutcome::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_extensions() {
        assert!(is_image(Path::new("a/b.png")));
        assert!(is_image(Path::new("a/b.JPG")));
        assert!(is_image(Path::new("b.jpeg")));
        assert!(!is_image(Path::new("b.txt")));
        assert!(!is_image(Path::new("noext")));
    }

    #[tokio::test]
    async fn test_directory_source_yields_each_file_once_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([9, 9, 9]));
        for name in ["b.png", "a.png", "c.png"] {
            img.save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let mut source = DirectorySource::new(dir.path());
        let mut origins = Vec::new();
        while let Some(item) = source.next_frame().await {
            origins.push(item.unwrap().origin);
        }

        assert_eq!(origins.len(), 3);
        assert!(origins[0].ends_with("a.png"));
        assert!(origins[1].ends_with("b.png"));
        assert!(origins[2].ends_with("c.png"));
        assert!(source.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_directory_source_reports_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"garbage").unwrap();

        let mut source = DirectorySource::new(dir.path());
        assert!(matches!(
            source.next_frame().await,
            Some(Err(FrameError::Decode(_)))
        ));
        assert!(source.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_directory_source_missing_dir_is_error() {
        let mut source = DirectorySource::new("/definitely/not/here");
        assert!(matches!(source.next_frame().await, Some(Err(_))));
        assert!(source.next_frame().await.is_none());
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([20, 120, 40]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[tokio::test]
    async fn test_follow_retries_still_being_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        let full = png_bytes();
        std::fs::write(&path, &full[..full.len() / 2]).unwrap();

        let mut source = DirectorySource::new(dir.path()).follow(Duration::from_millis(20));

        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                std::fs::write(&path, &full).unwrap();
            })
        };

        let item = tokio::time::timeout(Duration::from_secs(5), source.next_frame())
            .await
            .expect("completed still is yielded")
            .expect("source still open");
        writer.await.unwrap();

        let captured = item.expect("completed still decodes");
        assert!(captured.origin.ends_with("leaf.png"));
        assert_eq!(captured.frame.width, 4);

        // yielded once only
        let again = tokio::time::timeout(Duration::from_millis(100), source.next_frame()).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_follow_reports_unreadable_file_once_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"garbage").unwrap();

        let mut source = DirectorySource::new(dir.path()).follow(Duration::from_millis(5));

        let item = tokio::time::timeout(Duration::from_secs(5), source.next_frame())
            .await
            .expect("error is eventually reported");
        assert!(matches!(item, Some(Err(FrameError::Decode(_)))));

        let again = tokio::time::timeout(Duration::from_millis(100), source.next_frame()).await;
        assert!(again.is_err());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = CaptureSummary::default();
        summary.record(&CycleOutcome::Sent);
        summary.record(&CycleOutcome::Unavailable);
        summary.record(&CycleOutcome::InvalidFrame);
        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.unavailable, 1);
        assert_eq!(summary.invalid_frames, 1);
    }
}
