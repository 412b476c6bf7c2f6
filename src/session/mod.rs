// src/session/mod.rs
// Manual Split Negotiation - per-conversation session state machine

pub mod validate;

pub use validate::{validate_cutpoints, ValidationError};

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Chat conversation key. One open session per conversation at a time.
pub type ConversationId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingLanguageChoice,
    AwaitingTimecodes,
}

/// Pending negotiation state for one conversation, from the moment a media
/// file arrives until it is dispatched, cancelled or expired.
#[derive(Debug, Clone)]
pub struct ManualSplitSession {
    pub target_file: PathBuf,
    pub language: Option<String>,
    pub total_duration_secs: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub stage: Stage,
}

impl ManualSplitSession {
    /// Expiry depends only on the creation timestamp, not on a clock the
    /// session itself holds.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now.signed_duration_since(self.created_at).num_milliseconds() >= timeout.as_millis() as i64
    }
}

/// Hand-off from negotiation to the transcription pipeline.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub file_path: PathBuf,
    pub language: String,
    pub total_duration_secs: f64,
    pub cutpoints: Option<Vec<f64>>,
}

/// Outcome of measuring the real duration of a converted source.
#[derive(Debug)]
pub enum NegotiationStep {
    /// Fits in one recognizer request chain; go transcribe.
    Dispatch(DispatchRequest),
    /// Too long for automatic handling without asking; the next free-text
    /// message from this conversation is read as a cut point list.
    AwaitTimecodes {
        total_duration_secs: f64,
        max_segment_secs: f64,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No open session for conversation {0}")]
    NoSession(ConversationId),

    #[error("Session is not awaiting timecodes")]
    NotAwaitingTimecodes,

    #[error("No language chosen yet")]
    LanguageNotChosen,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Keyed store of open negotiation sessions.
///
/// Every mutation goes through one lock, and a new submission or expiry
/// removes the prior entry before anything else touches it, so each key has
/// a single writer at any moment.
pub struct SessionStore {
    sessions: Mutex<HashMap<ConversationId, ManualSplitSession>>,
    max_segment_secs: f64,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(max_segment_secs: f64, timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_segment_secs,
            timeout,
        }
    }

    /// A new media file arrived for this conversation. Any session already
    /// open there is discarded and returned so its owner can clean up.
    pub fn media_submitted(
        &self,
        conversation: ConversationId,
        target_file: PathBuf,
    ) -> Option<ManualSplitSession> {
        let session = ManualSplitSession {
            target_file,
            language: None,
            total_duration_secs: None,
            created_at: Utc::now(),
            stage: Stage::AwaitingLanguageChoice,
        };

        let discarded = self
            .sessions
            .lock()
            .expect("session lock poisoned")
            .insert(conversation, session);

        if discarded.is_some() {
            tracing::info!(
                "Conversation {}: new submission replaces the open session",
                conversation
            );
        }

        discarded
    }

    pub fn language_chosen(
        &self,
        conversation: ConversationId,
        language: &str,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let session = sessions
            .get_mut(&conversation)
            .ok_or(SessionError::NoSession(conversation))?;

        session.language = Some(language.to_string());
        Ok(())
    }

    /// The source has been downloaded and converted; decide whether its
    /// real duration fits a single request chain or the user must supply
    /// cut points.
    pub fn duration_measured(
        &self,
        conversation: ConversationId,
        total_duration_secs: f64,
    ) -> Result<NegotiationStep, SessionError> {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let session = sessions
            .get_mut(&conversation)
            .ok_or(SessionError::NoSession(conversation))?;

        let language = session
            .language
            .clone()
            .ok_or(SessionError::LanguageNotChosen)?;

        if total_duration_secs <= self.max_segment_secs {
            let session = sessions
                .remove(&conversation)
                .expect("session checked above");
            return Ok(NegotiationStep::Dispatch(DispatchRequest {
                file_path: session.target_file,
                language,
                total_duration_secs,
                cutpoints: None,
            }));
        }

        session.total_duration_secs = Some(total_duration_secs);
        session.stage = Stage::AwaitingTimecodes;

        tracing::info!(
            "Conversation {}: {:.0}s exceeds the {:.0}s ceiling, awaiting cut points",
            conversation,
            total_duration_secs,
            self.max_segment_secs
        );

        Ok(NegotiationStep::AwaitTimecodes {
            total_duration_secs,
            max_segment_secs: self.max_segment_secs,
        })
    }

    /// Free-text input for a conversation that is awaiting timecodes.
    ///
    /// A rejection leaves the session exactly as it was so the user can
    /// correct the list; acceptance closes the session and hands the
    /// validated cut points to the pipeline.
    pub fn timecodes_received(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<DispatchRequest, SessionError> {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let session = sessions
            .get(&conversation)
            .ok_or(SessionError::NoSession(conversation))?;

        if session.stage != Stage::AwaitingTimecodes {
            return Err(SessionError::NotAwaitingTimecodes);
        }

        let total_duration_secs = session
            .total_duration_secs
            .expect("awaiting-timecodes sessions always carry a duration");
        let language = session
            .language
            .clone()
            .ok_or(SessionError::LanguageNotChosen)?;

        let cutpoints = validate_cutpoints(text, total_duration_secs, self.max_segment_secs)?;

        let session = sessions
            .remove(&conversation)
            .expect("session checked above");

        Ok(DispatchRequest {
            file_path: session.target_file,
            language,
            total_duration_secs,
            cutpoints: Some(cutpoints),
        })
    }

    /// Remove and return the session so the caller can clean up its file.
    pub fn cancel(&self, conversation: ConversationId) -> Option<ManualSplitSession> {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .remove(&conversation)
    }

    pub fn open_session(&self, conversation: ConversationId) -> Option<ManualSplitSession> {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .get(&conversation)
            .cloned()
    }

    /// Drop every session older than the timeout, delete their temp files,
    /// and return them for user notification.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<(ConversationId, ManualSplitSession)> {
        let expired: Vec<(ConversationId, ManualSplitSession)> = {
            let mut sessions = self.sessions.lock().expect("session lock poisoned");
            let conversations: Vec<ConversationId> = sessions
                .iter()
                .filter(|(_, session)| session.is_expired(now, self.timeout))
                .map(|(conversation, _)| *conversation)
                .collect();

            conversations
                .into_iter()
                .filter_map(|conversation| {
                    sessions
                        .remove(&conversation)
                        .map(|session| (conversation, session))
                })
                .collect()
        };

        for (conversation, session) in &expired {
            tracing::info!("Conversation {}: session expired", conversation);
            if let Err(e) = std::fs::remove_file(&session.target_file) {
                tracing::warn!(
                    "Could not remove expired temp file {}: {}",
                    session.target_file.display(),
                    e
                );
            }
        }

        expired
    }
}

/// Periodic expiry check across all open sessions. Expired sessions are
/// forwarded to the front end for notification.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    every: Duration,
) -> (
    JoinHandle<()>,
    mpsc::UnboundedReceiver<(ConversationId, ManualSplitSession)>,
) {
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await; // first tick fires immediately

        loop {
            ticker.tick().await;
            for expired in store.sweep(Utc::now()) {
                if tx.send(expired).is_err() {
                    return;
                }
            }
        }
    });

    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const MAX_SEGMENT: f64 = 1140.0;
    const TIMEOUT: Duration = Duration::from_secs(900);

    fn store() -> SessionStore {
        SessionStore::new(MAX_SEGMENT, TIMEOUT)
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("session-test-{}.ogg", Uuid::new_v4()))
    }

    #[test]
    fn test_short_recording_dispatches_without_cutpoints() {
        let store = store();
        store.media_submitted(7, temp_path());
        store.language_chosen(7, "en-US").unwrap();

        match store.duration_measured(7, 600.0).unwrap() {
            NegotiationStep::Dispatch(request) => {
                assert_eq!(request.language, "en-US");
                assert_eq!(request.cutpoints, None);
            }
            NegotiationStep::AwaitTimecodes { .. } => panic!("600s fits the ceiling"),
        }

        assert!(store.open_session(7).is_none(), "dispatch closes the session");
    }

    #[test]
    fn test_long_recording_awaits_timecodes_then_dispatches() {
        let store = store();
        store.media_submitted(7, temp_path());
        store.language_chosen(7, "pt-BR").unwrap();

        match store.duration_measured(7, 2000.0).unwrap() {
            NegotiationStep::AwaitTimecodes {
                total_duration_secs,
                max_segment_secs,
            } => {
                assert_eq!(total_duration_secs, 2000.0);
                assert_eq!(max_segment_secs, MAX_SEGMENT);
            }
            NegotiationStep::Dispatch(_) => panic!("2000s exceeds the ceiling"),
        }

        let request = store.timecodes_received(7, "00:10:00\n00:25:00").unwrap();
        assert_eq!(request.cutpoints, Some(vec![600.0, 1500.0]));
        assert!(store.open_session(7).is_none());
    }

    #[test]
    fn test_rejected_timecodes_preserve_the_session() {
        let store = store();
        store.media_submitted(7, temp_path());
        store.language_chosen(7, "en-US").unwrap();
        store.duration_measured(7, 2000.0).unwrap();

        let err = store.timecodes_received(7, "00:10:00\n00:05:00").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::OutOfOrder { line_number: 2, .. })
        ));

        let session = store.open_session(7).expect("session must survive a rejection");
        assert_eq!(session.stage, Stage::AwaitingTimecodes);
        assert_eq!(session.total_duration_secs, Some(2000.0));
    }

    #[test]
    fn test_duration_requires_language_first() {
        let store = store();
        store.media_submitted(7, temp_path());

        assert!(matches!(
            store.duration_measured(7, 600.0),
            Err(SessionError::LanguageNotChosen)
        ));
    }

    #[test]
    fn test_text_without_session_is_an_error() {
        assert!(matches!(
            store().timecodes_received(7, "00:10:00"),
            Err(SessionError::NoSession(7))
        ));
    }

    #[test]
    fn test_new_submission_discards_prior_session() {
        let store = store();
        let first_file = temp_path();
        store.media_submitted(7, first_file.clone());

        let discarded = store
            .media_submitted(7, temp_path())
            .expect("prior session is handed back");
        assert_eq!(discarded.target_file, first_file);
        assert!(store.open_session(7).is_some(), "the new session replaces it");
    }

    #[test]
    fn test_expiry_is_a_pure_function_of_created_at() {
        let session = ManualSplitSession {
            target_file: temp_path(),
            language: None,
            total_duration_secs: None,
            created_at: Utc::now() - chrono::Duration::seconds(901),
            stage: Stage::AwaitingLanguageChoice,
        };

        assert!(session.is_expired(Utc::now(), TIMEOUT));
        assert!(
            !session.is_expired(session.created_at + chrono::Duration::seconds(10), TIMEOUT),
            "a fresh session is not expired"
        );
    }

    #[test]
    fn test_sweep_removes_expired_sessions_and_their_files() {
        let store = SessionStore::new(MAX_SEGMENT, Duration::ZERO);
        let file = temp_path();
        std::fs::write(&file, b"audio").unwrap();
        store.media_submitted(7, file.clone());

        let expired = store.sweep(Utc::now());

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, 7);
        assert!(!file.exists(), "expiry deletes the temp file");
        assert!(store.open_session(7).is_none());
    }

    #[test]
    fn test_sweep_keeps_live_sessions() {
        let store = store();
        store.media_submitted(7, temp_path());

        assert!(store.sweep(Utc::now()).is_empty());
        assert!(store.open_session(7).is_some());
    }

    #[tokio::test]
    async fn test_sweeper_forwards_expired_sessions() {
        let store = Arc::new(SessionStore::new(MAX_SEGMENT, Duration::ZERO));
        let file = temp_path();
        std::fs::write(&file, b"audio").unwrap();
        store.media_submitted(42, file);

        let (handle, mut rx) = spawn_sweeper(Arc::clone(&store), Duration::from_millis(10));

        let (conversation, session) = rx.recv().await.expect("sweeper reports the expiry");
        assert_eq!(conversation, 42);
        assert_eq!(session.stage, Stage::AwaitingLanguageChoice);

        handle.abort();
    }
}
