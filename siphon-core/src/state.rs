//! Per-caller rate state.
//!
//! Each caller identity owns three monotonically-reset window counters
//! (minute, hour, day) plus an optional ban-until timestamp. A counter's
//! window restarts whenever `now - started_at` exceeds the window length;
//! its count drops to zero at that moment.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single fixed-size window counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCounter {
    /// Requests observed in the current window.
    pub count: u32,
    /// When the current window started.
    pub started_at: DateTime<Utc>,
}

impl WindowCounter {
    /// Creates a zeroed counter whose window starts at `now`.
    pub fn started_at(now: DateTime<Utc>) -> Self {
        WindowCounter {
            count: 0,
            started_at: now,
        }
    }

    /// Records one request at `now`, resetting first if the window has
    /// elapsed. Returns the new count.
    pub fn observe(&mut self, now: DateTime<Utc>, window: Duration) -> u32 {
        let elapsed = (now - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if elapsed >= window {
            self.count = 0;
            self.started_at = now;
        }
        self.count = self.count.saturating_add(1);
        self.count
    }
}

/// The full rate state of one caller identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateState {
    /// Requests in the current minute window.
    pub minute: WindowCounter,
    /// Requests in the current hour window.
    pub hour: WindowCounter,
    /// Requests in the current day window.
    pub day: WindowCounter,
    /// Active ban expiry, if any.
    pub banned_until: Option<DateTime<Utc>>,
}

impl RateState {
    /// Fresh state with all windows starting at `now`.
    pub fn started_at(now: DateTime<Utc>) -> Self {
        RateState {
            minute: WindowCounter::started_at(now),
            hour: WindowCounter::started_at(now),
            day: WindowCounter::started_at(now),
            banned_until: None,
        }
    }

    /// Returns the unexpired ban expiry as of `now`, if a ban is active.
    pub fn active_ban(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.banned_until.filter(|until| *until > now)
    }
}
