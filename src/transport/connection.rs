//! Connection lifecycle and reconnect backoff
//!
//! ```text
//! Idle -> Connecting -> Connected -> Disconnected
//!                                        |
//!                    Reconnecting(n) <---+---> Failed
//!                          |
//!                          +--> Connecting
//! ```
//!
//! The machine only tracks state and computes delays. Timers and sockets
//! belong to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{TransportError, TransportResult};

/// Default delay before the first reconnect attempt
pub const RECONNECT_INTERVAL_MS: u64 = 3000;

/// Default number of reconnect attempts before giving up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default ceiling on the reconnect delay
pub const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

/// WebSocket close code for a normal closure
pub const CLOSE_NORMAL: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Reconnecting { attempt: u32 },
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnected => f.write_str("disconnected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting ({attempt})"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Exponential backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(RECONNECT_INTERVAL_MS),
            max_attempts: MAX_RECONNECT_ATTEMPTS,
            max_delay: Duration::from_millis(MAX_RECONNECT_DELAY_MS),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given 1-based attempt: `base * 2^(attempt-1)`,
    /// capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Result of the socket closing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Schedule a reconnect after `delay`
    Reconnect { attempt: u32, delay: Duration },
    /// Closed cleanly or by the user; no reconnect
    Closed,
    /// Attempts used up, manual retry needed
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    policy: ReconnectPolicy,
    attempts: u32,
    /// Cleared by an explicit disconnect
    auto_reconnect: bool,
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

impl ConnectionStateMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            policy,
            attempts: 0,
            auto_reconnect: true,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Reconnect attempts made since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Start connecting. Returns `false` when already connecting or connected,
    /// or when attempts are exhausted.
    pub fn connect(&mut self) -> bool {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Failed => {
                false
            }
            _ => {
                self.transition(ConnectionState::Connecting);
                true
            }
        }
    }

    /// The socket opened
    pub fn on_open(&mut self) {
        self.attempts = 0;
        self.transition(ConnectionState::Connected);
        tracing::info!("Connection established");
    }

    /// The socket closed with `code`
    pub fn on_close(&mut self, code: u16) -> CloseOutcome {
        let was_active = matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        );
        self.transition(ConnectionState::Disconnected);

        if !was_active || !self.auto_reconnect || code == CLOSE_NORMAL {
            return CloseOutcome::Closed;
        }

        if self.attempts >= self.policy.max_attempts {
            self.transition(ConnectionState::Failed);
            tracing::warn!(attempts = self.attempts, "Maximum reconnection attempts reached");
            return CloseOutcome::Exhausted {
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        let delay = self.policy.delay_for(self.attempts);
        self.transition(ConnectionState::Reconnecting {
            attempt: self.attempts,
        });
        tracing::debug!(
            attempt = self.attempts,
            max = self.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        CloseOutcome::Reconnect {
            attempt: self.attempts,
            delay,
        }
    }

    /// The backoff delay elapsed. Returns `true` when a new connection should
    /// be opened.
    pub fn on_retry_elapsed(&mut self) -> bool {
        if matches!(self.state, ConnectionState::Reconnecting { .. }) && self.auto_reconnect {
            self.transition(ConnectionState::Connecting);
            true
        } else {
            false
        }
    }

    /// User-triggered reconnect; resets the attempt counter
    pub fn retry(&mut self) {
        self.attempts = 0;
        self.auto_reconnect = true;
        self.transition(ConnectionState::Connecting);
    }

    /// User-triggered disconnect; no reconnect follows
    pub fn disconnect(&mut self) {
        self.auto_reconnect = false;
        self.transition(ConnectionState::Disconnected);
    }

    /// Fail fast unless connected
    pub fn ensure_connected(&self) -> TransportResult<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Failed => Err(TransportError::ReconnectExhausted {
                attempts: self.attempts,
            }),
            state => Err(TransportError::NotConnected { state }),
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "Connection state changed");
            self.state = next;
        }
    }
}
