//! Poller configuration.

use chrono::{FixedOffset, Offset, Utc};
use std::time::Duration;

/// The airport whose board is polled. Its clock is a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Airport {
    pub code: &'static str,
    pub utc_offset_secs: i32,
}

impl Airport {
    /// Hamad International, Doha. Asia/Qatar is UTC+03:00 all year.
    pub const HAMAD: Self = Self {
        code: "DOH",
        utc_offset_secs: 3 * 3600,
    };

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }
}

/// Which matches of an airline feed the busiest-hours histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SamplingPolicy {
    /// The first sighting of each airline in a batch is left out.
    #[default]
    SkipFirstMatch,
    AllMatches,
}

/// Settings shared by both direction loops.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Scheme and host of the FIDS web service.
    pub base_url: String,
    pub poll_interval: Duration,
    /// Upper bound on records the feed may return per request.
    pub record_limit: u32,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra attempts after a failed fetch, within the same cycle.
    pub fetch_retries: u32,
    pub retry_delay: Duration,
    pub sampling: SamplingPolicy,
    pub airport: Airport,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dohahamadairport.com".to_string(),
            poll_interval: Duration::from_secs(10),
            record_limit: 3500,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            fetch_retries: 0,
            retry_delay: Duration::from_secs(2),
            sampling: SamplingPolicy::default(),
            airport: Airport::HAMAD,
        }
    }
}

impl PollerConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_record_limit(mut self, limit: u32) -> Self {
        self.record_limit = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.fetch_retries = retries;
        self.retry_delay = delay;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.sampling = sampling;
        self
    }
}
