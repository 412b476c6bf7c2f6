// src/session/validate.rs
// User-supplied cut point validation

use crate::timecode::parse_hms;
use thiserror::Error;

/// Validation failures name the offending line so the user can correct it
/// and resend without starting over.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Line {line_number} is not an HH:MM:SS timecode: {input:?}")]
    Format { line_number: usize, input: String },

    #[error("Timecode {input:?} must be greater than the previous cut")]
    OutOfOrder { line_number: usize, input: String },

    #[error("Timecode {input:?} is at or past the end of the recording")]
    OutOfRange { line_number: usize, input: String },

    #[error("Segment ending at {input:?} is longer than {max_secs}s")]
    SegmentTooLong {
        line_number: usize,
        input: String,
        max_secs: u64,
    },

    #[error("Final segment after the last cut is longer than {max_secs}s")]
    FinalSegmentTooLong { max_secs: u64 },
}

/// Parse and validate a newline-separated list of `HH:MM:SS` cut points.
///
/// Cuts must be strictly increasing, inside the recording, and no segment
/// between consecutive cuts (or after the last one) may exceed
/// `max_segment_secs`. Blank lines are skipped so trailing newlines from
/// chat clients do not fail the whole list.
pub fn validate_cutpoints(
    text: &str,
    total_duration_secs: f64,
    max_segment_secs: f64,
) -> Result<Vec<f64>, ValidationError> {
    let max_secs = max_segment_secs as u64;
    let mut cutpoints = Vec::new();
    let mut previous_secs = 0.0f64;

    for (line_number, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let line_number = line_number + 1;

        let secs = match parse_hms(line) {
            Some(secs) => secs as f64,
            None => {
                return Err(ValidationError::Format {
                    line_number,
                    input: line.to_string(),
                })
            }
        };

        if secs <= previous_secs {
            return Err(ValidationError::OutOfOrder {
                line_number,
                input: line.to_string(),
            });
        }

        if secs >= total_duration_secs {
            return Err(ValidationError::OutOfRange {
                line_number,
                input: line.to_string(),
            });
        }

        if secs - previous_secs > max_segment_secs {
            return Err(ValidationError::SegmentTooLong {
                line_number,
                input: line.to_string(),
                max_secs,
            });
        }

        cutpoints.push(secs);
        previous_secs = secs;
    }

    if total_duration_secs - previous_secs > max_segment_secs {
        return Err(ValidationError::FinalSegmentTooLong { max_secs });
    }

    Ok(cutpoints)
}
