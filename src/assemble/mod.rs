// src/assemble/mod.rs
// Result Assembler - timeline reconstruction and line segmentation

use crate::dispatch::RawSegmentResult;
use crate::recognize::WordToken;
use crate::timecode::format_mm_ss;

// Silence long enough to break a line, depending on whether the recognizer
// gave us punctuation to segment on.
const GAP_SECS_PUNCTUATED: f64 = 5.0;
const GAP_SECS_UNPUNCTUATED: f64 = 1.0;

// Line length limits, in characters.
const COMMA_BREAK_CHARS: usize = 100;
const HARD_BREAK_CHARS: usize = 150;

/// One transcript line with its absolute start time.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptLine {
    pub start_secs: f64,
    pub text: String,
}

/// Whether the recognizer produced visible sentence punctuation anywhere in
/// the segment. Decides which silence threshold applies.
pub fn has_sentence_punctuation(words: &[WordToken]) -> bool {
    words.iter().any(|w| w.text.contains(['.', '!', '?']))
}

/// Break one segment's words into lines.
///
/// A line flushes on sentence-ending punctuation, on a trailing comma once
/// the line is already long, past a hard length cap, on a silence gap, and
/// after the last word. Timestamps are segment-relative starts shifted by
/// `offset_secs`. Pure function: same words and offset, same lines.
pub fn segment_lines(
    words: &[WordToken],
    has_punctuation: bool,
    offset_secs: f64,
) -> Vec<TranscriptLine> {
    let gap_threshold = if has_punctuation {
        GAP_SECS_PUNCTUATED
    } else {
        GAP_SECS_UNPUNCTUATED
    };

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_start_secs = 0.0;
    let mut last_word_end = 0.0;

    for (i, word) in words.iter().enumerate() {
        let gap = word.start_secs - last_word_end;
        if !line.is_empty() && gap > gap_threshold {
            lines.push(TranscriptLine {
                start_secs: offset_secs + line_start_secs,
                text: std::mem::take(&mut line),
            });
        }

        if line.is_empty() {
            line_start_secs = word.start_secs;
        } else {
            line.push(' ');
        }
        line.push_str(&word.text);
        last_word_end = word.end_secs;

        let length = line.chars().count();
        let ends_sentence = word.text.ends_with(['.', '!', '?']);
        let comma_break = word.text.ends_with(',') && length > COMMA_BREAK_CHARS;
        let is_last = i + 1 == words.len();

        if ends_sentence || comma_break || length > HARD_BREAK_CHARS || is_last {
            lines.push(TranscriptLine {
                start_secs: offset_secs + line_start_secs,
                text: std::mem::take(&mut line),
            });
        }
    }

    lines
}

/// Merge per-segment results into the final transcript, in segment order.
/// A failed segment keeps its place on the timeline as a visible marker
/// instead of disappearing.
pub fn assemble(results: &[RawSegmentResult]) -> String {
    let mut transcript = String::new();

    for result in results {
        match result {
            RawSegmentResult::Recognized { offset_secs, words } => {
                let punctuated = has_sentence_punctuation(words);
                for line in segment_lines(words, punctuated, *offset_secs) {
                    transcript.push_str(&format!(
                        "[{}] {}\n",
                        format_mm_ss(line.start_secs),
                        line.text
                    ));
                }
            }
            RawSegmentResult::Failed { offset_secs } => {
                transcript.push_str(&format!("[Error part: {}]\n", format_mm_ss(*offset_secs)));
            }
        }
    }

    transcript
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start_secs: f64, end_secs: f64) -> WordToken {
        WordToken {
            text: text.to_string(),
            start_secs,
            end_secs,
        }
    }

    #[test]
    fn test_offset_shifts_line_timestamps() {
        let words = vec![word("hello", 5.0, 5.5), word("there.", 5.6, 6.0)];
        let lines = segment_lines(&words, true, 1140.0);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].start_secs, 1145.0, "1140s offset + 5s relative start");
        assert_eq!(lines[0].text, "hello there.");
    }

    #[test]
    fn test_second_segment_word_renders_at_19_05() {
        let results = vec![
            RawSegmentResult::Recognized {
                offset_secs: 0.0,
                words: vec![word("first.", 0.0, 1.0)],
            },
            RawSegmentResult::Recognized {
                offset_secs: 1140.0,
                words: vec![word("second.", 5.0, 6.0)],
            },
        ];

        let transcript = assemble(&results);
        assert_eq!(transcript, "[00:00] first.\n[19:05] second.\n");
    }

    #[test]
    fn test_sentence_punctuation_flushes_line() {
        let words = vec![
            word("one.", 0.0, 0.5),
            word("two", 0.6, 1.0),
            word("three!", 1.1, 1.5),
            word("four?", 1.6, 2.0),
        ];
        let lines = segment_lines(&words, true, 0.0);

        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one.", "two three!", "four?"]);
    }

    #[test]
    fn test_silence_threshold_depends_on_punctuation() {
        // 2s of silence between the two words.
        let words = vec![word("alpha", 0.0, 1.0), word("beta", 3.0, 4.0)];

        let punctuated = segment_lines(&words, true, 0.0);
        assert_eq!(punctuated.len(), 1, "2s gap is no paragraph boundary when punctuated");

        let unpunctuated = segment_lines(&words, false, 0.0);
        assert_eq!(unpunctuated.len(), 2, "2s gap breaks when silence is the only signal");
        assert_eq!(unpunctuated[1].start_secs, 3.0);
    }

    #[test]
    fn test_long_silence_breaks_even_with_punctuation() {
        let words = vec![word("alpha.", 0.0, 1.0), word("beta.", 7.0, 8.0)];
        let lines = segment_lines(&words, true, 0.0);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].start_secs, 7.0);
    }

    #[test]
    fn test_comma_breaks_only_past_length_limit() {
        // A short line ending in a comma keeps going.
        let words = vec![word("yes,", 0.0, 0.4), word("indeed", 0.5, 1.0)];
        let lines = segment_lines(&words, false, 0.0);
        assert_eq!(lines.len(), 1);

        // Past 100 characters the comma becomes a break point.
        let filler = "watermelon"; // 10 chars
        let mut long: Vec<WordToken> = (0..10)
            .map(|i| word(filler, i as f64 * 0.2, i as f64 * 0.2 + 0.1))
            .collect();
        long.push(word("so,", 2.0, 2.1));
        long.push(word("anyway", 2.2, 2.4));
        let lines = segment_lines(&long, false, 0.0);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].text.ends_with("so,"));
        assert_eq!(lines[1].text, "anyway");
    }

    #[test]
    fn test_hard_cap_bounds_unpunctuated_lines() {
        let words: Vec<WordToken> = (0..40)
            .map(|i| word("blabla", i as f64 * 0.3, i as f64 * 0.3 + 0.2))
            .collect();
        let lines = segment_lines(&words, false, 0.0);

        assert!(lines.len() > 1, "a 280-char stream cannot stay one line");
        for line in &lines {
            assert!(
                line.text.chars().count() <= HARD_BREAK_CHARS + 7,
                "no line grows past the cap plus one word"
            );
        }
    }

    #[test]
    fn test_last_word_always_flushes() {
        let words = vec![word("unfinished", 0.0, 0.5), word("thought", 0.6, 1.0)];
        let lines = segment_lines(&words, false, 0.0);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "unfinished thought");
    }

    #[test]
    fn test_empty_segment_has_no_lines() {
        assert!(segment_lines(&[], true, 0.0).is_empty());
    }

    #[test]
    fn test_heuristic_is_deterministic() {
        let words = vec![
            word("some", 0.0, 0.3),
            word("words.", 0.4, 0.9),
            word("more", 6.5, 7.0),
            word("words", 7.1, 7.4),
        ];

        let first = segment_lines(&words, true, 60.0);
        let second = segment_lines(&words, true, 60.0);
        assert_eq!(first, second, "same input, same lines");
    }

    #[test]
    fn test_failed_segment_renders_error_marker() {
        let results = vec![
            RawSegmentResult::Recognized {
                offset_secs: 0.0,
                words: vec![word("ok.", 0.0, 1.0)],
            },
            RawSegmentResult::Failed { offset_secs: 1140.0 },
            RawSegmentResult::Recognized {
                offset_secs: 2280.0,
                words: vec![word("resumed.", 2.0, 3.0)],
            },
        ];

        let transcript = assemble(&results);
        let lines: Vec<&str> = transcript.lines().collect();

        assert_eq!(lines[1], "[Error part: 19:00]");
        assert_eq!(lines[2], "[38:02] resumed.", "segments after a failure still assemble");
    }

    #[test]
    fn test_absolute_timestamps_never_decrease() {
        let results = vec![
            RawSegmentResult::Recognized {
                offset_secs: 0.0,
                words: vec![
                    word("a.", 0.0, 1.0),
                    word("b", 10.0, 11.0),
                    word("c.", 11.1, 12.0),
                ],
            },
            RawSegmentResult::Recognized {
                offset_secs: 1140.0,
                words: vec![word("d.", 0.5, 1.0), word("e.", 20.0, 21.0)],
            },
        ];

        let mut all_lines = Vec::new();
        for result in &results {
            if let RawSegmentResult::Recognized { offset_secs, words } = result {
                let punctuated = has_sentence_punctuation(words);
                all_lines.extend(segment_lines(words, punctuated, *offset_secs));
            }
        }

        for pair in all_lines.windows(2) {
            assert!(
                pair[0].start_secs <= pair[1].start_secs,
                "timeline must be non-decreasing across segments"
            );
        }
    }
}
