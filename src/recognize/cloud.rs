// src/recognize/cloud.rs
// HTTP implementations of the recognition and blob storage contracts

use super::{BlobStore, RecognizeError, SpeechRecognizer, StorageError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const POLL_INTERVAL_SECS: u64 = 5;
const QUOTA_STATUS: &str = "RESOURCE_EXHAUSTED";

#[derive(Serialize)]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
    #[serde(rename = "outputConfig")]
    output_config: OutputConfig,
}

#[derive(Serialize)]
struct RecognitionConfig {
    #[serde(rename = "languageCode")]
    language_code: String,
    #[serde(rename = "enableAutomaticPunctuation")]
    enable_automatic_punctuation: bool,
    #[serde(rename = "enableWordTimeOffsets")]
    enable_word_time_offsets: bool,
}

#[derive(Serialize)]
struct RecognitionAudio {
    uri: String,
}

#[derive(Serialize)]
struct OutputConfig {
    uri: String,
}

#[derive(Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
}

#[derive(Deserialize)]
struct OperationError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
    status: Option<String>,
}

pub struct CloudSpeechClient {
    client: Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
}

impl CloudSpeechClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        tracing::info!("Cloud speech client initialized");

        Self {
            client,
            base_url,
            api_key,
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
        }
    }

    pub fn from_env() -> Option<Self> {
        let base_url = match env::var("SPEECH_API_URL") {
            Ok(url) => url,
            Err(_) => {
                tracing::warn!("Speech service not configured. Set SPEECH_API_URL.");
                return None;
            }
        };
        let api_key = match env::var("SPEECH_API_KEY") {
            Ok(key) => key,
            Err(_) => {
                tracing::warn!("Speech service not configured. Set SPEECH_API_KEY.");
                return None;
            }
        };

        Some(Self::new(base_url, api_key))
    }

    async fn submit(
        &self,
        audio_key: &str,
        result_key: &str,
        language: &str,
    ) -> Result<String, RecognizeError> {
        let request = RecognizeRequest {
            config: RecognitionConfig {
                language_code: language.to_string(),
                enable_automatic_punctuation: true,
                enable_word_time_offsets: true,
            },
            audio: RecognitionAudio {
                uri: audio_key.to_string(),
            },
            output_config: OutputConfig {
                uri: result_key.to_string(),
            },
        };

        let response = self
            .client
            .post(format!("{}/speech:longrunningrecognize", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        let operation: Operation = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RecognizeError::MalformedResult(e.to_string()))?;

        tracing::debug!("Recognition submitted: operation={}", operation.name);

        Ok(operation.name)
    }

    async fn await_completion(&self, operation_name: &str) -> Result<(), RecognizeError> {
        loop {
            sleep(self.poll_interval).await;

            let response = self
                .client
                .get(format!("{}/operations/{}", self.base_url, operation_name))
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(map_transport)?;

            let operation: Operation = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| RecognizeError::MalformedResult(e.to_string()))?;

            if let Some(error) = operation.error {
                if error.status.as_deref() == Some(QUOTA_STATUS) {
                    return Err(RecognizeError::QuotaExhausted);
                }
                return Err(RecognizeError::Service(format!(
                    "{} (code {})",
                    error.message, error.code
                )));
            }

            if operation.done {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl SpeechRecognizer for CloudSpeechClient {
    async fn recognize(
        &self,
        audio_key: &str,
        result_key: &str,
        language: &str,
    ) -> Result<(), RecognizeError> {
        let operation_name = self.submit(audio_key, result_key, language).await?;
        self.await_completion(&operation_name).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RecognizeError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        429 => Err(RecognizeError::QuotaExhausted),
        401 | 403 => Err(RecognizeError::Authentication),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(RecognizeError::Service(format!("HTTP {}: {}", status, body)))
        }
    }
}

fn map_transport(e: reqwest::Error) -> RecognizeError {
    if e.is_timeout() {
        RecognizeError::Timeout
    } else {
        RecognizeError::Network(e.to_string())
    }
}

pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpBlobStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub fn from_env() -> Option<Self> {
        let base_url = match env::var("BLOB_STORE_URL") {
            Ok(url) => url,
            Err(_) => {
                tracing::warn!("Blob store not configured. Set BLOB_STORE_URL.");
                return None;
            }
        };
        let api_key = match env::var("BLOB_STORE_KEY") {
            Ok(key) => key,
            Err(_) => {
                tracing::warn!("Blob store not configured. Set BLOB_STORE_KEY.");
                return None;
            }
        };

        Some(Self::new(base_url, api_key))
    }

    fn blob_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), StorageError> {
        let bytes = tokio::fs::read(local_path).await?;

        let response = self
            .client
            .put(self.blob_url(key))
            .bearer_auth(&self.api_key)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        map_storage_status(response, key).await.map(|_| ())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get(self.blob_url(key))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let response = map_storage_status(response, key).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .delete(self.blob_url(key))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        map_storage_status(response, key).await.map(|_| ())
    }
}

async fn map_storage_status(
    response: reqwest::Response,
    key: &str,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 | 403 => Err(StorageError::Authentication),
        404 => Err(StorageError::NotFound(key.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(StorageError::Service(format!("HTTP {}: {}", status, body)))
        }
    }
}
