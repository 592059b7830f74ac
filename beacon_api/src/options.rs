use core::time::Duration;

#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Attempts per endpoint before moving on to the next one.
    pub retry_attempts: u32,
    pub retry_min_backoff: Duration,
    pub retry_max_backoff: Duration,
    pub request_timeout: Duration,
    /// How long the head or finalized slot may stay unchanged before the node is considered stale.
    pub stale_head_threshold: Duration,
    pub max_concurrent_requests: usize,
    /// Probe depth used by missed block searches.
    pub max_missed_slots: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_min_backoff: Duration::from_millis(200),
            retry_max_backoff: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            stale_head_threshold: Duration::from_secs(7 * 60),
            max_concurrent_requests: 16,
            max_missed_slots: 32,
        }
    }
}

impl Options {
    #[must_use]
    pub(crate) fn backoff(&self, retry: u32) -> Duration {
        self.retry_min_backoff
            .saturating_mul(2_u32.saturating_pow(retry))
            .min(self.retry_max_backoff)
    }
}
