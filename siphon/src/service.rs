//! The resolution pipeline.
//!
//! One inbound request flows through: rate limiter admission, cache lookup
//! (a hit short-circuits), engine run over the freshly loaded endpoint
//! list, cache write on success. [`Siphon`] owns that flow; the HTTP front
//! end only translates between the wire and [`Outcome`] / [`ResolveError`].

use std::sync::Arc;

use serde_json::Value;
use siphon_backend::Backend;
use siphon_core::{Attempt, TargetUrl};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::engine::{Engine, ExecutionMode};
use crate::error::ResolveError;
use crate::limiter::{RateLimiter, RateRules};
use crate::registry::Registry;
use crate::shaper::EvasionPolicy;

/// A completed resolution, ready for envelope formatting.
#[derive(Clone, Debug)]
pub struct Outcome {
    /// The upstream-resolved stream URL.
    pub raw_url: String,
    /// Template of the endpoint that produced the resolution.
    pub used_api: String,
    /// Full decoded upstream payload.
    pub payload: Value,
    /// Downloaded artifact file name, when media was cached locally.
    pub artifact: Option<String>,
    /// Whether this outcome was served from cache.
    pub cached: bool,
    /// Human-readable status line.
    pub msg: String,
    /// Rejected endpoint attempts from this run (empty on cache hits).
    pub trace: Vec<Attempt>,
    /// Total endpoints in the live list (zero on cache hits).
    pub total_endpoints: usize,
}

/// The assembled resolution service.
pub struct Siphon {
    registry: Registry,
    engine: Engine,
    cache: Option<CacheStore>,
    limiter: Option<RateLimiter>,
}

impl Siphon {
    /// Wires the pipeline from configuration, with cache entries and rate
    /// state living in `backend`.
    pub fn new(config: &Config, backend: Arc<dyn Backend>) -> Result<Self, ResolveError> {
        let policy = if config.evasion.enabled {
            EvasionPolicy {
                random_user_agent: config.evasion.random_user_agent,
                referer: config.evasion.referer,
                use_proxy: config.evasion.use_proxy,
                timeout: config.engine.request_timeout,
            }
        } else {
            EvasionPolicy::disabled(config.engine.request_timeout)
        };
        let mode = if config.engine.concurrent {
            ExecutionMode::Concurrent
        } else {
            ExecutionMode::Sequential
        };

        let cache = if config.cache.enabled {
            let store = CacheStore::new(backend.clone(), &config.cache, &policy)
                .map_err(|error| ResolveError::Config(format!("cache http client: {error}")))?;
            Some(store)
        } else {
            None
        };
        let limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::new(backend, RateRules::from(&config.rate_limit)));

        Ok(Siphon {
            registry: Registry::new(&config.endpoints_file, &config.proxies_file),
            engine: Engine::new(mode, policy),
            cache,
            limiter,
        })
    }

    /// Resolves one target URL on behalf of `identity`.
    pub async fn handle(
        &self,
        target: &TargetUrl,
        identity: &str,
    ) -> Result<Outcome, ResolveError> {
        if let Some(limiter) = &self.limiter {
            limiter.check(identity).await?;
        }

        if let Some(cache) = &self.cache
            && let Some(hit) = cache.lookup(target).await
        {
            tracing::debug!(target_url = %target, "cache hit");
            return Ok(Outcome {
                raw_url: hit.raw_url,
                used_api: hit.used_api,
                payload: hit.payload,
                artifact: hit.artifact,
                cached: true,
                msg: "cache hit".to_owned(),
                trace: Vec::new(),
                total_endpoints: 0,
            });
        }

        let endpoints = self.registry.load().await?;
        let proxies = self.registry.load_proxies().await?;
        let total_endpoints = endpoints.len();

        let resolution = self.engine.resolve(&endpoints, &proxies, target).await;
        let Some(result) = resolution.result else {
            return Err(ResolveError::Exhausted {
                tried: total_endpoints,
                trace: resolution.attempts,
            });
        };

        let (artifact, msg) = match &self.cache {
            Some(cache) => {
                let artifact = cache.store(target, &result).await;
                match &artifact {
                    Some(_) => (artifact, "resolved; media downloaded and cached".to_owned()),
                    None => (None, "resolved".to_owned()),
                }
            }
            None => (None, "resolved; cache disabled".to_owned()),
        };

        Ok(Outcome {
            raw_url: result.stream_url,
            used_api: result.endpoint.template().to_owned(),
            payload: result.payload,
            artifact,
            cached: false,
            msg,
            trace: resolution.attempts,
            total_endpoints,
        })
    }
}
