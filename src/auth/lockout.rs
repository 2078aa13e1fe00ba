//! Failed-login lockout state machine
//!
//! Two states per account: unlocked, or locked until a timestamp. The timer
//! is the only way out of the locked state.

use crate::config::SecurityConfig;
use chrono::{DateTime, Duration, Utc};

/// Lockout thresholds
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_attempts: i32,
    pub lockout_duration: Duration,
}

/// Persisted per-account lockout state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutState {
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Result of checking an account before verifying its password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginGate {
    Open,
    Locked { until: DateTime<Utc> },
}

impl LockoutPolicy {
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            max_attempts: config.max_login_attempts as i32,
            lockout_duration: Duration::seconds(config.login_lockout_duration_secs as i64),
        }
    }

    pub fn gate(&self, state: &LockoutState, now: DateTime<Utc>) -> LoginGate {
        match state.locked_until {
            Some(until) if until > now => LoginGate::Locked { until },
            _ => LoginGate::Open,
        }
    }

    /// Wrong password. Reaching the threshold opens a new lock window; a
    /// lapsed window restarts the count.
    pub fn on_failure(&self, state: &LockoutState, now: DateTime<Utc>) -> LockoutState {
        let previous = match state.locked_until {
            Some(until) if until <= now => 0,
            _ => state.failed_attempts,
        };
        let failed_attempts = previous.saturating_add(1);

        let locked_until = if failed_attempts >= self.max_attempts {
            Some(now + self.lockout_duration)
        } else {
            None
        };

        LockoutState {
            failed_attempts,
            locked_until,
        }
    }
}

impl LockoutState {
    /// State after a successful login
    pub fn cleared() -> Self {
        Self {
            failed_attempts: 0,
            locked_until: None,
        }
    }
}

/// Whole minutes left on a lock, rounded up
pub fn remaining_minutes(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (until - now).num_seconds().max(0);
    (secs + 59) / 60
}
