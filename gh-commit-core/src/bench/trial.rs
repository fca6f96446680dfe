// one timed invocation of the model command

use std::fmt;

/// outcome of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialStatus {
    Ok,
    Fail,
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialStatus::Ok => write!(f, "OK"),
            TrialStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// measurements for one (model, run) pair, fixed once the command returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    pub model: String,
    /// 1-based
    pub run_index: u32,
    pub elapsed_ms: u64,
    pub status: TrialStatus,
    pub in_chars: usize,
    pub out_chars: usize,
}

impl Trial {
    pub fn is_ok(&self) -> bool {
        self.status == TrialStatus::Ok
    }
}
