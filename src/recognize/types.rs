// src/recognize/types.rs
// Word-level recognition result payload

use serde::Deserialize;

/// One recognized word with timing relative to the start of its segment.
#[derive(Debug, Clone, PartialEq)]
pub struct WordToken {
    pub text: String,
    pub start_secs: f64,
    pub end_secs: f64,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    results: Vec<SpeechResult>,
}

#[derive(Debug, Deserialize)]
struct SpeechResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    words: Vec<WordInfo>,
}

#[derive(Debug, Deserialize)]
struct WordInfo {
    word: String,
    #[serde(rename = "startTime")]
    start_time: String,
    #[serde(rename = "endTime")]
    end_time: String,
}

impl RecognitionResponse {
    /// Flatten the payload into segment-relative word tokens, taking the
    /// top alternative of each result block.
    pub fn into_words(self) -> Result<Vec<WordToken>, String> {
        let mut words = Vec::new();

        for result in self.results {
            let Some(alternative) = result.alternatives.into_iter().next() else {
                continue;
            };
            for info in alternative.words {
                let start_secs = parse_duration_secs(&info.start_time)
                    .ok_or_else(|| format!("bad startTime {:?}", info.start_time))?;
                let end_secs = parse_duration_secs(&info.end_time)
                    .ok_or_else(|| format!("bad endTime {:?}", info.end_time))?;
                words.push(WordToken {
                    text: info.word,
                    start_secs,
                    end_secs,
                });
            }
        }

        Ok(words)
    }
}

/// Parse a duration string like `"1.500s"` into fractional seconds.
fn parse_duration_secs(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().strip_suffix('s').unwrap_or(raw.trim());
    trimmed.parse().ok().filter(|secs: &f64| *secs >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_strings() {
        assert_eq!(parse_duration_secs("1.500s"), Some(1.5));
        assert_eq!(parse_duration_secs("0s"), Some(0.0));
        assert_eq!(parse_duration_secs("75s"), Some(75.0));
        assert_eq!(parse_duration_secs("abc"), None);
        assert_eq!(parse_duration_secs("-1s"), None, "negative offsets are nonsense");
    }

    #[test]
    fn test_payload_flattens_to_word_tokens() {
        let payload = r#"{
            "results": [
                {
                    "alternatives": [
                        {
                            "transcript": "hello world.",
                            "words": [
                                {"word": "hello", "startTime": "0s", "endTime": "0.400s"},
                                {"word": "world.", "startTime": "0.500s", "endTime": "1.100s"}
                            ]
                        }
                    ]
                }
            ]
        }"#;

        let response: RecognitionResponse = serde_json::from_str(payload).unwrap();
        let words = response.into_words().unwrap();

        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "hello");
        assert_eq!(words[1].start_secs, 0.5);
        assert_eq!(words[1].end_secs, 1.1);
    }

    #[test]
    fn test_empty_payload_yields_no_words() {
        let response: RecognitionResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_words().unwrap().is_empty());
    }

    #[test]
    fn test_bad_timing_is_an_error() {
        let payload = r#"{
            "results": [
                {"alternatives": [{"words": [
                    {"word": "x", "startTime": "oops", "endTime": "1s"}
                ]}]}
            ]
        }"#;

        let response: RecognitionResponse = serde_json::from_str(payload).unwrap();
        assert!(response.into_words().is_err(), "unparseable timing must not be dropped silently");
    }
}
