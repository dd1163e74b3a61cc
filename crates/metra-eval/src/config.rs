//! Per-run limits.

use serde::{Deserialize, Serialize};

/// Limits applied to one interpreter run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Statements executed before the run is aborted.
    pub step_limit: u64,
    /// Displayed lines kept; later lines are counted but dropped.
    pub max_output_lines: usize,
}

impl RunConfig {
    pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;
    pub const DEFAULT_MAX_OUTPUT_LINES: usize = 10_000;

    pub fn with_step_limit(mut self, step_limit: u64) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn with_max_output_lines(mut self, max_output_lines: usize) -> Self {
        self.max_output_lines = max_output_lines;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            step_limit: Self::DEFAULT_STEP_LIMIT,
            max_output_lines: Self::DEFAULT_MAX_OUTPUT_LINES,
        }
    }
}
