//! Request-rate throttling.
//!
//! Each caller identity owns three sliding windows (minute, hour, day) and
//! an optional temporary ban, persisted through the storage backend so
//! state can outlive the process when the backend is durable. Updates run
//! through a bounded compare-and-swap loop; concurrent checks may each
//! count, and eventual monotonic counting is all the contract requires.
//!
//! Windows are evaluated minute, then hour, then day; the first exceeded
//! window names the rejection and triggers the ban. A caller is never
//! banned twice for the same violation instant.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use siphon_backend::{Backend, Raw};
use siphon_core::{RateState, StateKey};
use thiserror::Error;

use crate::config::RateLimitConfig;

/// Retries of the CAS loop before falling back to a plain write.
const CAS_ATTEMPTS: usize = 4;

/// Admission rejection, carrying the human-readable reason returned to the
/// caller.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{reason}")]
pub struct RateExceeded {
    /// Why the caller was rejected.
    pub reason: String,
}

impl RateExceeded {
    fn banned(until: DateTime<Utc>) -> Self {
        RateExceeded {
            reason: format!("banned until {}", until.to_rfc3339()),
        }
    }

    fn window(name: &str) -> Self {
        RateExceeded {
            reason: format!("{name} request limit exceeded"),
        }
    }
}

/// The configured window ceilings and ban duration.
#[derive(Clone, Copy, Debug)]
pub struct RateRules {
    /// Minute-window ceiling.
    pub per_minute: u32,
    /// Hour-window ceiling.
    pub per_hour: u32,
    /// Day-window ceiling.
    pub per_day: u32,
    /// How long a violating caller stays banned.
    pub ban_duration: Duration,
}

impl From<&RateLimitConfig> for RateRules {
    fn from(config: &RateLimitConfig) -> Self {
        RateRules {
            per_minute: config.per_minute,
            per_hour: config.per_hour,
            per_day: config.per_day,
            ban_duration: config.ban_duration,
        }
    }
}

/// Sliding-window rate limiter over a storage backend.
pub struct RateLimiter {
    backend: Arc<dyn Backend>,
    rules: RateRules,
}

impl RateLimiter {
    /// Creates a limiter with the given rules.
    pub fn new(backend: Arc<dyn Backend>, rules: RateRules) -> Self {
        RateLimiter { backend, rules }
    }

    /// Admission check for one request from `identity`.
    ///
    /// `Ok(())` admits; `Err` carries the rejection reason. Storage
    /// failures fail open: a broken backend admits with a warning instead
    /// of rejecting.
    pub async fn check(&self, identity: &str) -> Result<(), RateExceeded> {
        self.check_at(identity, Utc::now()).await
    }

    /// Clock-injected form of [`check`](Self::check), used directly by
    /// tests.
    pub async fn check_at(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RateExceeded> {
        let key = StateKey::rate(identity);
        for _ in 0..CAS_ATTEMPTS {
            let original = match self.backend.read(&key).await {
                Ok(raw) => raw,
                Err(error) => {
                    tracing::warn!(%key, %error, "rate state read failed, admitting");
                    return Ok(());
                }
            };
            let mut state = original
                .as_deref()
                .and_then(|raw| serde_json::from_slice::<RateState>(raw).ok())
                .unwrap_or_else(|| RateState::started_at(now));

            // An active ban rejects before any counting; no write needed.
            if let Some(until) = state.active_ban(now) {
                return Err(RateExceeded::banned(until));
            }
            state.banned_until = None;

            let decision = self.observe(&mut state, now);

            let raw = match serde_json::to_vec(&state) {
                Ok(raw) => Raw::from(raw),
                Err(error) => {
                    tracing::warn!(%key, %error, "rate state serialization failed, admitting");
                    return Ok(());
                }
            };
            match self.backend.compare_swap(&key, original.as_ref(), raw).await {
                Ok(true) => return decision,
                Ok(false) => continue,
                Err(error) => {
                    tracing::warn!(%key, %error, "rate state write failed, admitting");
                    return Ok(());
                }
            }
        }
        // Heavily contended identity: lose the CAS race gracefully with a
        // last-writer-wins update rather than spinning.
        tracing::debug!(%key, "rate cas contention, falling back to plain write");
        let original = self.backend.read(&key).await.ok().flatten();
        let mut state = original
            .as_deref()
            .and_then(|raw| serde_json::from_slice::<RateState>(raw).ok())
            .unwrap_or_else(|| RateState::started_at(now));
        if let Some(until) = state.active_ban(now) {
            return Err(RateExceeded::banned(until));
        }
        let decision = self.observe(&mut state, now);
        if let Ok(raw) = serde_json::to_vec(&state) {
            let _ = self.backend.write(&key, Raw::from(raw)).await;
        }
        decision
    }

    /// Rolls all three windows forward, increments them, and applies the
    /// first-exceeded-window-wins ban rule.
    fn observe(&self, state: &mut RateState, now: DateTime<Utc>) -> Result<(), RateExceeded> {
        let windows = [
            (&mut state.minute, Duration::from_secs(60), self.rules.per_minute, "per-minute"),
            (&mut state.hour, Duration::from_secs(3600), self.rules.per_hour, "per-hour"),
            (&mut state.day, Duration::from_secs(86_400), self.rules.per_day, "per-day"),
        ];
        let mut decision = Ok(());
        for (counter, window, ceiling, name) in windows {
            let count = counter.observe(now, window);
            if decision.is_ok() && count > ceiling {
                state.banned_until = Some(now + self.rules.ban_duration);
                decision = Err(RateExceeded::window(name));
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use siphon_backend::MemoryBackend;

    fn limiter(per_minute: u32, per_hour: u32, per_day: u32) -> RateLimiter {
        RateLimiter::new(
            Arc::new(MemoryBackend::new()),
            RateRules {
                per_minute,
                per_hour,
                per_day,
                ban_duration: Duration::from_secs(3600),
            },
        )
    }

    #[tokio::test]
    async fn admits_up_to_ceiling_then_bans() {
        let limiter = limiter(3, 100, 100);
        let now = Utc::now();

        for i in 0..3 {
            let at = now + TimeDelta::seconds(i);
            assert!(limiter.check_at("10.0.0.1", at).await.is_ok());
        }
        let rejection = limiter
            .check_at("10.0.0.1", now + TimeDelta::seconds(3))
            .await
            .unwrap_err();
        assert_eq!(rejection.reason, "per-minute request limit exceeded");
    }

    #[tokio::test]
    async fn ban_outlives_window_reset() {
        let limiter = limiter(1, 100, 100);
        let now = Utc::now();

        assert!(limiter.check_at("10.0.0.1", now).await.is_ok());
        // Second request in the minute trips the ceiling and the ban.
        assert!(limiter.check_at("10.0.0.1", now).await.is_err());

        // Two minutes later the minute window has long reset, but the
        // one-hour ban still rejects.
        let later = now + TimeDelta::seconds(120);
        let rejection = limiter.check_at("10.0.0.1", later).await.unwrap_err();
        assert!(rejection.reason.starts_with("banned until"));

        // Past the ban the caller is admitted again.
        let after_ban = now + TimeDelta::seconds(3700);
        assert!(limiter.check_at("10.0.0.1", after_ban).await.is_ok());
    }

    #[tokio::test]
    async fn first_exceeded_window_names_the_rejection() {
        let limiter = limiter(100, 2, 100);
        let now = Utc::now();

        assert!(limiter.check_at("10.0.0.2", now).await.is_ok());
        assert!(limiter.check_at("10.0.0.2", now).await.is_ok());
        let rejection = limiter.check_at("10.0.0.2", now).await.unwrap_err();
        assert_eq!(rejection.reason, "per-hour request limit exceeded");
    }

    #[tokio::test]
    async fn identities_are_independent() {
        let limiter = limiter(1, 100, 100);
        let now = Utc::now();

        assert!(limiter.check_at("10.0.0.1", now).await.is_ok());
        assert!(limiter.check_at("10.0.0.1", now).await.is_err());
        assert!(limiter.check_at("10.0.0.2", now).await.is_ok());
    }

    #[tokio::test]
    async fn state_survives_limiter_reconstruction() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let rules = RateRules {
            per_minute: 1,
            per_hour: 100,
            per_day: 100,
            ban_duration: Duration::from_secs(3600),
        };
        let now = Utc::now();

        let first = RateLimiter::new(backend.clone(), rules);
        assert!(first.check_at("10.0.0.1", now).await.is_ok());
        assert!(first.check_at("10.0.0.1", now).await.is_err());

        // A fresh limiter over the same storage still sees the ban.
        let second = RateLimiter::new(backend, rules);
        assert!(second.check_at("10.0.0.1", now).await.is_err());
    }
}
