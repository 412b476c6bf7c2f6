// src/pipeline.rs
// End-to-end transcription pipeline: plan -> split -> dispatch -> assemble

use crate::assemble;
use crate::config::PipelineConfig;
use crate::dispatch::{BatchDispatcher, DispatchError};
use crate::plan::{self, PlanError};
use crate::recognize::{CloudSpeechClient, HttpBlobStore};
use crate::session::DispatchRequest;
use crate::split::{FfmpegSplitter, SegmentSplitter, SplitError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Deletes the wrapped file when dropped, so a temp file cannot outlive its
/// job no matter which path the job exits on.
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!("Temp file {} already gone: {}", self.path.display(), e);
        }
    }
}

/// Backstop for segment files: each dispatch job deletes its own file, but
/// an abort between splitting and dispatch would otherwise leak the set.
struct SegmentFiles {
    paths: Vec<PathBuf>,
}

impl SegmentFiles {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for SegmentFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!("Could not remove segment file {}: {}", path.display(), e);
                }
            }
        }
    }
}

pub struct TranscriptionPipeline {
    config: PipelineConfig,
    splitter: Arc<dyn SegmentSplitter>,
    dispatcher: BatchDispatcher,
}

impl TranscriptionPipeline {
    pub fn new(
        config: PipelineConfig,
        splitter: Arc<dyn SegmentSplitter>,
        dispatcher: BatchDispatcher,
    ) -> Self {
        Self {
            config,
            splitter,
            dispatcher,
        }
    }

    /// Wire the pipeline against the real services. `None` when the speech
    /// service or blob store is not configured in the environment.
    pub fn from_env() -> Option<Self> {
        let config = PipelineConfig::from_env();
        let store = Arc::new(HttpBlobStore::from_env()?);
        let recognizer = Arc::new(CloudSpeechClient::from_env()?);
        let dispatcher = BatchDispatcher::new(store, recognizer, &config);
        let splitter = Arc::new(FfmpegSplitter::from_env());

        Some(Self::new(config, splitter, dispatcher))
    }

    /// Run one transcription job to a finished transcript.
    ///
    /// Planning and splitting failures abort the job before any remote
    /// work; from dispatch on, per-segment failures only leave gap markers
    /// in the delivered text. The source temp file is gone by the time this
    /// returns, whichever way it returns.
    pub async fn run(&self, request: DispatchRequest) -> Result<String, PipelineError> {
        let source = TempFile::new(request.file_path);

        let plan = plan::plan(
            request.total_duration_secs,
            self.config.max_segment_secs,
            request.cutpoints.as_deref(),
        )?;

        tracing::info!(
            "Transcribing {:.0}s of audio in {} segments",
            request.total_duration_secs,
            plan.segment_count()
        );

        let segments = SegmentFiles::new(self.splitter.split(source.path(), &plan).await?);

        let results = self
            .dispatcher
            .transcribe_all(segments.paths().to_vec(), &plan, &request.language)
            .await?;

        let transcript = assemble::assemble(&results);

        tracing::info!("Transcript assembled: {} chars", transcript.len());

        Ok(transcript)
    }
}
