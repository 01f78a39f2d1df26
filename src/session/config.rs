use std::time::Duration;

/// How the session waits between reconnect attempts
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt
    pub base_delay: Duration,
    /// Multiplier applied per consecutive failed attempt (1.0 = fixed delay)
    pub backoff: f64,
    /// Upper bound for the delay
    pub max_delay: Duration,
    /// Consecutive attempts allowed before giving up; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            backoff: 1.0,
            max_delay: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Fixed delay, unbounded attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            backoff: 1.0,
            max_delay: delay,
            max_attempts: None,
        }
    }

    /// Delay before the given attempt (1-indexed)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as i32;
        let factor = self.backoff.max(1.0).powi(exp);
        let delay = self.base_delay.mul_f64(factor);
        delay.min(self.max_delay.max(self.base_delay))
    }

    /// Whether the given attempt (1-indexed) is still allowed
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }
}

/// Configuration for a resumable streaming session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    pub reconnect: ReconnectPolicy,
}
