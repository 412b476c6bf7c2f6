// src/timecode.rs
// Timecode parsing and transcript timestamp formatting

use regex::Regex;
use std::sync::OnceLock;

/// Parse an `HH:MM:SS` timecode into whole seconds.
///
/// Accepts exactly three colon-separated integers; anything else is `None`.
pub fn parse_hms(input: &str) -> Option<u64> {
    static HMS_RE: OnceLock<Regex> = OnceLock::new();
    let re = HMS_RE.get_or_init(|| Regex::new(r"^(\d+):(\d+):(\d+)$").expect("valid timecode regex"));

    let caps = re.captures(input.trim())?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Format an absolute offset as `MM:SS`. Minutes keep counting past 59
/// instead of rolling over into hours.
pub fn format_mm_ss(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
