// src/recognize/mod.rs
// Recognition service and blob storage contracts

mod cloud;
mod types;

pub use cloud::{CloudSpeechClient, HttpBlobStore};
pub use types::{RecognitionResponse, WordToken};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed")]
    Authentication,

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Service(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Recognition error types with retry classification
#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("Recognition quota exhausted")]
    QuotaExhausted,

    #[error("Authentication failed")]
    Authentication,

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Recognition service error: {0}")]
    Service(String),

    #[error("Malformed recognition result: {0}")]
    MalformedResult(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RecognizeError {
    /// Quota exhaustion is transient by contract; everything else is
    /// terminal for the segment.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecognizeError::QuotaExhausted)
    }
}

/// Remote blob storage the recognition service reads from and writes to.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), StorageError>;

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Remote speech recognizer.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Submit a recognition request for the blob at `audio_key` and await
    /// its completion. The word-level result payload lands at `result_key`
    /// in the blob store.
    async fn recognize(
        &self,
        audio_key: &str,
        result_key: &str,
        language: &str,
    ) -> Result<(), RecognizeError>;
}
