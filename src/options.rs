/// Bounded retry with exponential backoff and jitter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Base backoff in milliseconds, doubled on every retry.
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Creates a policy, clamping `max_attempts` to at least one attempt.
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
        }
    }

    /// Single attempt, no retry.
    pub fn no_retry() -> Self {
        Self::new(1, 0)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
        }
    }
}

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retry policy applied to every operation.
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientOptions, RetryPolicy};

    #[test]
    fn new_clamps_zero_attempts() {
        assert_eq!(RetryPolicy::new(0, 10).max_attempts, 1);
        assert_eq!(RetryPolicy::new(4, 10).max_attempts, 4);
    }

    #[test]
    fn defaults() {
        let opts = ClientOptions::default();
        assert_eq!(opts.timeout_ms, 10_000);
        assert_eq!(opts.retry, RetryPolicy::new(3, 1_000));
    }
}
