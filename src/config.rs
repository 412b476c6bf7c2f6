// src/config.rs
// Pipeline tunables, loaded from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MAX_SEGMENT_SECS: f64 = 1140.0; // recognizer hard limit: 19 min per request
const DEFAULT_BATCH_SIZE: usize = 4;
const DEFAULT_STAGGER_SECS: u64 = 2;
const DEFAULT_MAX_ATTEMPTS: u8 = 5;
const DEFAULT_BACKOFF_BASE_SECS: u64 = 60;
const DEFAULT_BACKOFF_JITTER_SECS: u64 = 5;
const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 900;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Longest segment the recognition service will accept, in seconds.
    pub max_segment_secs: f64,
    /// Segments launched concurrently per dispatch batch.
    pub batch_size: usize,
    /// Delay between member launches within one batch.
    pub stagger: Duration,
    /// Recognition attempts per segment before it fails terminally.
    pub max_attempts: u8,
    /// Base wait after a quota rejection.
    pub backoff_base: Duration,
    /// Upper bound of the random addition to the backoff base.
    pub backoff_jitter: Duration,
    /// How long a manual-split session may sit unanswered.
    pub session_timeout: Duration,
    /// Cadence of the expired-session sweep.
    pub sweep_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_segment_secs: DEFAULT_MAX_SEGMENT_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            stagger: Duration::from_secs(DEFAULT_STAGGER_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(DEFAULT_BACKOFF_BASE_SECS),
            backoff_jitter: Duration::from_secs(DEFAULT_BACKOFF_JITTER_SECS),
            session_timeout: Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl PipelineConfig {
    /// Build the configuration from the environment, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            max_segment_secs: env_or("MAX_SEGMENT_SECS", DEFAULT_MAX_SEGMENT_SECS),
            batch_size: env_or("DISPATCH_BATCH_SIZE", DEFAULT_BATCH_SIZE),
            stagger: Duration::from_secs(env_or("DISPATCH_STAGGER_SECS", DEFAULT_STAGGER_SECS)),
            max_attempts: env_or("RECOGNIZE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            backoff_base: Duration::from_secs(env_or(
                "QUOTA_BACKOFF_SECS",
                DEFAULT_BACKOFF_BASE_SECS,
            )),
            backoff_jitter: Duration::from_secs(env_or(
                "QUOTA_BACKOFF_JITTER_SECS",
                DEFAULT_BACKOFF_JITTER_SECS,
            )),
            session_timeout: Duration::from_secs(env_or(
                "SESSION_TIMEOUT_SECS",
                DEFAULT_SESSION_TIMEOUT_SECS,
            )),
            sweep_interval: Duration::from_secs(env_or(
                "SESSION_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
        }
    }
}

fn env_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}
