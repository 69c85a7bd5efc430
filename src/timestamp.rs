//! Timestamp tokens for generated resource titles
//!
//! Tokens have the form `YYYYMMDD-HHMMSS` (UTC). A [`TimestampSource`] never
//! hands out the same token twice: if the clock has not moved past the last
//! issued second, the next second is issued instead.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Format used for all timestamp tokens
pub const TOKEN_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Source of strictly increasing timestamp tokens
pub struct TimestampSource {
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl TimestampSource {
    /// Create a source backed by the system clock
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Create a source backed by a custom clock (useful for testing)
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last: Mutex::new(None),
        }
    }

    /// Issue the next fresh token
    pub fn next_token(&self) -> String {
        let now = truncate_to_second((self.clock)());
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        let issued = match *last {
            Some(prev) if now <= prev => prev + Duration::seconds(1),
            _ => now,
        };
        *last = Some(issued);

        issued.format(TOKEN_FORMAT).to_string()
    }
}

impl Default for TimestampSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimestampSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampSource")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

fn truncate_to_second(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}
