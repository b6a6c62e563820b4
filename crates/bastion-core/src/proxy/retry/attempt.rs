use serde::Serialize;
use std::time::{Duration, Instant};

/// Classification of one connector invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Completed before the slow-call threshold
    Success,
    /// Completed successfully but past the threshold (measure mode only)
    SlowSuccess,
    /// Abandoned at the slow-call threshold (race mode)
    SlowCall,
    ConnectFailure,
    CallFailure,
}

impl AttemptOutcome {
    /// Every outcome except a fast success counts against the breaker.
    pub const fn is_breaker_failure(self) -> bool {
        !matches!(self, Self::Success)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SlowSuccess => "slow_success",
            Self::SlowCall => "slow_call",
            Self::ConnectFailure => "connect_failure",
            Self::CallFailure => "call_failure",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based position in the session
    pub number: u32,
    pub endpoint: String,
    pub started_at: Instant,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
}

/// Attempts of one request. Discarded once the response is assembled.
#[derive(Debug)]
pub struct RetrySession {
    attempts: Vec<Attempt>,
    remaining_retries: u32,
}

impl RetrySession {
    pub fn new(max_retries: u32) -> Self {
        Self { attempts: Vec::new(), remaining_retries: max_retries }
    }

    pub fn remaining_retries(&self) -> u32 {
        self.remaining_retries
    }

    /// Consume one retry. Returns `false` when the budget is exhausted.
    pub fn take_retry(&mut self) -> bool {
        if self.remaining_retries == 0 {
            return false;
        }
        self.remaining_retries -= 1;
        true
    }

    pub fn next_number(&self) -> u32 {
        self.attempts.len() as u32 + 1
    }

    pub fn push(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn into_attempts(self) -> Vec<Attempt> {
        self.attempts
    }

    pub fn tried_endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.attempts.len());
        for attempt in &self.attempts {
            if !names.contains(&attempt.endpoint) {
                names.push(attempt.endpoint.clone());
            }
        }
        names
    }
}
