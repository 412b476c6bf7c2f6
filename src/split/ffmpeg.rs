// src/split/ffmpeg.rs
// ffmpeg/ffprobe implementation of the split tool contract

use super::{SegmentSplitter, SplitError};
use crate::plan::SplitPlan;
use async_trait::async_trait;
use std::env;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;

const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";
const DEFAULT_FFPROBE_BIN: &str = "ffprobe";
const SEGMENT_SAMPLE_RATE: &str = "16000";
const STREAM_COPY_EXT: &str = "mka";

/// How segment files are produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitMode {
    /// Re-encode to 16 kHz mono FLAC, the uniform codec the recognizer
    /// expects.
    ReEncode,
    /// Remux without transcoding. Fast, but keeps the source codec.
    StreamCopy,
}

pub struct FfmpegSplitter {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    work_dir: PathBuf,
    mode: SplitMode,
}

impl FfmpegSplitter {
    pub fn new(work_dir: PathBuf, mode: SplitMode) -> Self {
        let ffmpeg = env::var("FFMPEG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_FFMPEG_BIN));
        let ffprobe = env::var("FFPROBE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_FFPROBE_BIN));

        tracing::info!(
            "ffmpeg splitter initialized: bin={}, work_dir={}",
            ffmpeg.display(),
            work_dir.display()
        );

        Self {
            ffmpeg,
            ffprobe,
            work_dir,
            mode,
        }
    }

    pub fn from_env() -> Self {
        let work_dir = env::var("SPLIT_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("longscribe"));
        Self::new(work_dir, SplitMode::ReEncode)
    }

    fn segment_ext(&self) -> &'static str {
        match self.mode {
            SplitMode::ReEncode => "flac",
            SplitMode::StreamCopy => STREAM_COPY_EXT,
        }
    }

    async fn run_ffmpeg(&self, args: Vec<String>) -> Result<(), SplitError> {
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-nostdin", "-y"])
            .args(&args)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplitError::ToolFailed(stderr.trim().to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl SegmentSplitter for FfmpegSplitter {
    async fn split(&self, source: &Path, plan: &SplitPlan) -> Result<Vec<PathBuf>, SplitError> {
        let job_dir = self.work_dir.join(format!("job-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&job_dir).await?;

        let ext = self.segment_ext();
        let mut args: Vec<String> = vec!["-i".into(), source.display().to_string()];

        match self.mode {
            SplitMode::ReEncode => {
                args.extend(
                    ["-vn", "-ar", SEGMENT_SAMPLE_RATE, "-ac", "1", "-c:a", "flac"]
                        .map(String::from),
                );
            }
            SplitMode::StreamCopy => {
                args.extend(["-c", "copy"].map(String::from));
            }
        }

        if plan.segment_count() == 1 {
            // Nothing to cut, just produce the single uniform segment.
            args.push(segment_path(&job_dir, 0, ext).display().to_string());
        } else {
            args.extend(["-f".into(), "segment".into()]);
            match plan.interval() {
                Some(interval) => {
                    args.extend(["-segment_time".into(), format!("{}", interval)]);
                }
                None => {
                    args.extend(["-segment_times".into(), explicit_cut_list(plan)]);
                }
            }
            args.push(
                job_dir
                    .join(format!("part_%03d.{}", ext))
                    .display()
                    .to_string(),
            );
        }

        if let Err(e) = self.run_ffmpeg(args).await {
            let _ = tokio::fs::remove_dir_all(&job_dir).await;
            return Err(e);
        }

        // All expected segments or nothing; a partial set would silently
        // shift every later offset.
        let mut paths = Vec::with_capacity(plan.segment_count());
        for index in 0..plan.segment_count() {
            let path = segment_path(&job_dir, index, ext);
            if !path.exists() {
                let _ = tokio::fs::remove_dir_all(&job_dir).await;
                return Err(SplitError::MissingSegment { index });
            }
            paths.push(path);
        }

        tracing::info!(
            "Split {} into {} segments",
            source.display(),
            paths.len()
        );

        Ok(paths)
    }

    async fn probe_duration(&self, source: &Path) -> Result<f64, SplitError> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(source)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplitError::Probe(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse()
            .map_err(|_| SplitError::Probe(format!("unexpected ffprobe output: {:?}", stdout.trim())))
    }
}

fn segment_path(job_dir: &Path, index: usize, ext: &str) -> PathBuf {
    job_dir.join(format!("part_{:03}.{}", index, ext))
}

fn explicit_cut_list(plan: &SplitPlan) -> String {
    plan.offsets()[1..]
        .iter()
        .map(|secs| format!("{}", secs))
        .collect::<Vec<_>>()
        .join(",")
}
