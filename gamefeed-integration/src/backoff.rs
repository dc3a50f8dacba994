use derive_more::Constructor;
use std::time::Duration;

/// Backoff policy for a reconnecting client: how long to wait before the next dial attempt
/// after a disconnection, scaling up on repeated failures and resetting on success.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Constructor)]
pub struct ReconnectionBackoffPolicy {
    /// Initial backoff millisecond duration after the first disconnection.
    ///
    /// This value then scales with `backoff_multiplier` on repeated failed reconnection
    /// attempts.
    pub backoff_ms_initial: u64,

    /// Scaling factor for the backoff duration on repeated reconnection attempts.
    pub backoff_multiplier: u8,

    /// Maximum possible backoff duration between reconnection attempts.
    pub backoff_ms_max: u64,
}

impl Default for ReconnectionBackoffPolicy {
    fn default() -> Self {
        Self {
            backoff_ms_initial: 1_000,
            backoff_multiplier: 2,
            backoff_ms_max: 30_000,
        }
    }
}

/// Tracks the current backoff duration for a single reconnecting client, advancing on every
/// failed attempt and resetting on every success.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReconnectionState {
    policy: ReconnectionBackoffPolicy,
    backoff_ms_current: u64,
}

impl From<ReconnectionBackoffPolicy> for ReconnectionState {
    fn from(policy: ReconnectionBackoffPolicy) -> Self {
        Self {
            backoff_ms_current: policy.backoff_ms_initial,
            policy,
        }
    }
}

impl ReconnectionState {
    pub fn new(policy: ReconnectionBackoffPolicy) -> Self {
        Self::from(policy)
    }

    pub fn reset_backoff(&mut self) {
        self.backoff_ms_current = self.policy.backoff_ms_initial;
    }

    pub fn multiply_backoff(&mut self) {
        let next = self.backoff_ms_current * self.policy.backoff_multiplier as u64;
        self.backoff_ms_current = std::cmp::min(next, self.policy.backoff_ms_max);
    }

    pub fn current(&self) -> Duration {
        Duration::from_millis(self.backoff_ms_current)
    }

    /// Sleep for the current backoff duration, then advance the backoff for next time.
    pub async fn wait_and_multiply(&mut self) {
        tokio::time::sleep(self.current()).await;
        self.multiply_backoff();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectionBackoffPolicy::new(1_000, 2, 5_000);
        let mut state = ReconnectionState::from(policy);
        assert_eq!(state.current(), Duration::from_millis(1_000));
        state.multiply_backoff();
        assert_eq!(state.current(), Duration::from_millis(2_000));
        state.multiply_backoff();
        assert_eq!(state.current(), Duration::from_millis(4_000));
        state.multiply_backoff();
        assert_eq!(state.current(), Duration::from_millis(5_000));
    }

    #[test]
    fn backoff_resets() {
        let mut state = ReconnectionState::from(ReconnectionBackoffPolicy::default());
        state.multiply_backoff();
        state.multiply_backoff();
        assert_ne!(state.current(), Duration::from_millis(1_000));
        state.reset_backoff();
        assert_eq!(state.current(), Duration::from_millis(1_000));
    }
}
