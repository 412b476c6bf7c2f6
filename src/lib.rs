// src/lib.rs
// longscribe - segmented transcription for recordings longer than the
// recognizer's per-request duration ceiling

pub mod assemble;
pub mod config;
pub mod dispatch;
pub mod pipeline;
pub mod plan;
pub mod recognize;
pub mod session;
pub mod split;
pub mod timecode;

pub use assemble::{assemble, has_sentence_punctuation, segment_lines, TranscriptLine};
pub use config::PipelineConfig;
pub use dispatch::{BatchDispatcher, DispatchError, RawSegmentResult, RetryDecision, RetryPolicy};
pub use pipeline::{PipelineError, TempFile, TranscriptionPipeline};
pub use plan::{PlanError, SplitPlan};
pub use recognize::{
    BlobStore, CloudSpeechClient, HttpBlobStore, RecognizeError, SpeechRecognizer, StorageError,
    WordToken,
};
pub use session::{
    spawn_sweeper, ConversationId, DispatchRequest, ManualSplitSession, NegotiationStep,
    SessionError, SessionStore, Stage, ValidationError,
};
pub use split::{FfmpegSplitter, SegmentSplitter, SplitError, SplitMode};
