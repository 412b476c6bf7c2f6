use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("Recording duration must be positive, got {0}s")]
    InvalidDuration(f64),

    #[error("Segment ceiling must be positive, got {0}s")]
    InvalidCeiling(f64),

    #[error("Segment {0} would be empty")]
    EmptySegment(usize),
}

/// Ordered segment boundaries for one transcription job.
///
/// Offsets are strictly increasing absolute start times with `offsets[0] == 0`,
/// one per segment the splitter will produce. `interval` is set when the plan
/// came from automatic fixed-interval splitting; the splitter tool accepts
/// either a fixed duration or an explicit cut list.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlan {
    offsets: Vec<f64>,
    interval: Option<f64>,
}

impl SplitPlan {
    /// Split at a fixed interval of `max_segment_secs`.
    pub fn automatic(total_duration_secs: f64, max_segment_secs: f64) -> Result<Self, PlanError> {
        if total_duration_secs <= 0.0 {
            return Err(PlanError::InvalidDuration(total_duration_secs));
        }
        if max_segment_secs <= 0.0 {
            return Err(PlanError::InvalidCeiling(max_segment_secs));
        }

        if total_duration_secs <= max_segment_secs {
            return Ok(Self {
                offsets: vec![0.0],
                interval: None,
            });
        }

        let count = (total_duration_secs / max_segment_secs).ceil() as usize;
        let offsets = (0..count).map(|i| i as f64 * max_segment_secs).collect();

        Ok(Self {
            offsets,
            interval: Some(max_segment_secs),
        })
    }

    /// Split at caller-supplied cut points (validated upstream for segment
    /// length; zero-length segments are still rejected here).
    pub fn with_cutpoints(total_duration_secs: f64, cutpoints: &[f64]) -> Result<Self, PlanError> {
        if total_duration_secs <= 0.0 {
            return Err(PlanError::InvalidDuration(total_duration_secs));
        }

        let mut offsets = Vec::with_capacity(cutpoints.len() + 1);
        offsets.push(0.0);
        offsets.extend_from_slice(cutpoints);

        for i in 1..offsets.len() {
            if offsets[i] <= offsets[i - 1] {
                return Err(PlanError::EmptySegment(i - 1));
            }
        }
        if let Some(&last) = offsets.last() {
            if last >= total_duration_secs {
                return Err(PlanError::EmptySegment(offsets.len() - 1));
            }
        }

        Ok(Self {
            offsets,
            interval: None,
        })
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn segment_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn offset_of(&self, index: usize) -> f64 {
        self.offsets[index]
    }

    pub fn interval(&self) -> Option<f64> {
        self.interval
    }
}

/// Decide segment boundaries for a recording: explicit cut points when the
/// caller supplied them, fixed-interval splitting otherwise.
pub fn plan(
    total_duration_secs: f64,
    max_segment_secs: f64,
    explicit_cutpoints: Option<&[f64]>,
) -> Result<SplitPlan, PlanError> {
    match explicit_cutpoints {
        Some(cuts) => SplitPlan::with_cutpoints(total_duration_secs, cuts),
        None => SplitPlan::automatic(total_duration_secs, max_segment_secs),
    }
}
