use std::time::Duration;

/// Chooses how long to wait before reconnect attempt number `attempt`
/// (the first re-entry after the initial connect is attempt 0).
pub trait ReconnectPolicy: Send {
    fn delay(&self, attempt: u32) -> Duration;
}

/// Retry at once, every time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl ReconnectPolicy for Immediate {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// `base * 2^attempt`, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}
