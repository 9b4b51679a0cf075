use std::fmt;
use std::time::Duration;

use serde_json::Value as JsonValue;

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done(JsonValue),
    Stopped,
    /// Uncaught host error under the browser environment
    HostError(String),
}

/// Completion record of one run
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub outcome: Outcome,
    pub running_time: Duration,
    /// Stop checks performed
    pub yields: u64,
}

impl Report {
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, Outcome::Done(_))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.outcome, Outcome::Stopped)
    }
}

/// `<runningTimeMs>,<yields>`, or `NA` after a host error
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::HostError(_) => f.write_str("NA"),
            _ => write!(f, "{},{}", self.running_time.as_millis(), self.yields),
        }
    }
}
