// src/dispatch/mod.rs
// Batch Dispatcher - concurrency-bounded segment transcription

mod retry;

pub use retry::{RetryDecision, RetryPolicy};

use crate::config::PipelineConfig;
use crate::plan::SplitPlan;
use crate::recognize::{
    BlobStore, RecognitionResponse, RecognizeError, SpeechRecognizer, WordToken,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::sleep;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Plan has {plan} segments but the splitter produced {files}")]
    PlanMismatch { plan: usize, files: usize },

    #[error("Segment task panicked: {0}")]
    Join(String),
}

/// Per-segment recognition outcome, tagged with the segment's offset so the
/// assembler can keep the timeline intact even for failures.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSegmentResult {
    Recognized {
        offset_secs: f64,
        words: Vec<WordToken>,
    },
    Failed {
        offset_secs: f64,
    },
}

impl RawSegmentResult {
    pub fn offset_secs(&self) -> f64 {
        match self {
            RawSegmentResult::Recognized { offset_secs, .. } => *offset_secs,
            RawSegmentResult::Failed { offset_secs } => *offset_secs,
        }
    }
}

struct SegmentJob {
    index: usize,
    file_path: PathBuf,
    language: String,
    offset_secs: f64,
}

#[derive(Clone)]
pub struct BatchDispatcher {
    store: Arc<dyn BlobStore>,
    recognizer: Arc<dyn SpeechRecognizer>,
    batch_size: usize,
    stagger: Duration,
    retry: RetryPolicy,
}

impl BatchDispatcher {
    pub fn new(
        store: Arc<dyn BlobStore>,
        recognizer: Arc<dyn SpeechRecognizer>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            recognizer,
            batch_size: config.batch_size.max(1),
            stagger: config.stagger,
            retry: RetryPolicy::new(
                config.max_attempts,
                config.backoff_base,
                config.backoff_jitter,
            ),
        }
    }

    /// Transcribe every segment, in fixed-size batches. Members of a batch
    /// run concurrently with staggered starts; the next batch begins only
    /// once every member resolved. Results come back in segment order no
    /// matter which member finished first.
    pub async fn transcribe_all(
        &self,
        segment_paths: Vec<PathBuf>,
        plan: &SplitPlan,
        language: &str,
    ) -> Result<Vec<RawSegmentResult>, DispatchError> {
        if segment_paths.len() != plan.segment_count() {
            return Err(DispatchError::PlanMismatch {
                plan: plan.segment_count(),
                files: segment_paths.len(),
            });
        }

        let total = segment_paths.len();
        let mut jobs = segment_paths
            .into_iter()
            .enumerate()
            .map(|(index, file_path)| SegmentJob {
                index,
                file_path,
                language: language.to_string(),
                offset_secs: plan.offset_of(index),
            });

        let mut results: Vec<(usize, RawSegmentResult)> = Vec::with_capacity(total);

        loop {
            let batch: Vec<SegmentJob> = jobs.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            tracing::info!("Dispatching batch of {} segments", batch.len());

            let mut set = JoinSet::new();
            for (position, job) in batch.into_iter().enumerate() {
                let dispatcher = self.clone();
                let delay = self.stagger * position as u32;
                set.spawn(async move {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    let index = job.index;
                    (index, dispatcher.run_segment(job).await)
                });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(entry) => results.push(entry),
                    Err(e) => return Err(DispatchError::Join(e.to_string())),
                }
            }
        }

        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }

    async fn run_segment(&self, job: SegmentJob) -> RawSegmentResult {
        let blob_id = Uuid::new_v4();
        let audio_key = format!("audio/{}", blob_id);
        let result_key = format!("results/{}", blob_id);

        let outcome = self.recognize_segment(&job, &audio_key, &result_key).await;

        // Both remote blobs and the local segment file go away no matter
        // how the job ended.
        self.discard_blob(&audio_key).await;
        self.discard_blob(&result_key).await;
        if let Err(e) = tokio::fs::remove_file(&job.file_path).await {
            tracing::warn!(
                "Could not remove segment file {}: {}",
                job.file_path.display(),
                e
            );
        }

        match outcome {
            Ok(words) => {
                tracing::info!("Segment {} transcribed: {} words", job.index, words.len());
                RawSegmentResult::Recognized {
                    offset_secs: job.offset_secs,
                    words,
                }
            }
            Err(e) => {
                tracing::error!("Segment {} failed: {}", job.index, e);
                RawSegmentResult::Failed {
                    offset_secs: job.offset_secs,
                }
            }
        }
    }

    async fn recognize_segment(
        &self,
        job: &SegmentJob,
        audio_key: &str,
        result_key: &str,
    ) -> Result<Vec<WordToken>, RecognizeError> {
        self.store.upload(&job.file_path, audio_key).await?;

        let mut attempt: u8 = 1;
        loop {
            match self
                .recognizer
                .recognize(audio_key, result_key, &job.language)
                .await
            {
                Ok(()) => break,
                Err(error) => match self.retry.decide(attempt, &error) {
                    RetryDecision::Retry(delay) => {
                        tracing::warn!(
                            "Segment {}: quota exhausted on attempt {}/{}, retrying in {}s",
                            job.index,
                            attempt,
                            self.retry.max_attempts(),
                            delay.as_secs()
                        );
                        sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::Terminal => return Err(error),
                },
            }
        }

        let payload = self.store.download(result_key).await?;
        let response: RecognitionResponse = serde_json::from_slice(&payload)
            .map_err(|e| RecognizeError::MalformedResult(e.to_string()))?;
        response.into_words().map_err(RecognizeError::MalformedResult)
    }

    async fn discard_blob(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!("Could not delete blob {}: {}", key, e);
        }
    }
}
