//! Service configuration.
//!
//! Deserialized from YAML; every field has a default so a missing file (or
//! an empty one) yields a working configuration. Durations use the
//! humantime format ("5s", "1h").

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ResolveError;

/// Top-level service configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Socket address the HTTP front end binds to.
    pub listen: String,
    /// Include per-endpoint debug traces in responses and logs.
    pub debug: bool,
    /// Expose the winning endpoint in the response envelope.
    pub show_api_source: bool,
    /// Append the resolved URL to the human-readable `msg` field.
    pub show_url_in_msg: bool,
    /// Flat file with one endpoint template per line.
    pub endpoints_file: PathBuf,
    /// Flat file with one proxy address per line.
    pub proxies_file: PathBuf,
    /// Resolution engine settings.
    pub engine: EngineConfig,
    /// Request-shaping (evasion) settings.
    pub evasion: EvasionConfig,
    /// Cache settings.
    pub cache: CacheConfig,
    /// Rate limiter settings.
    pub rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: "0.0.0.0:3000".to_owned(),
            debug: false,
            show_api_source: false,
            show_url_in_msg: true,
            endpoints_file: PathBuf::from("endpoints.txt"),
            proxies_file: PathBuf::from("proxies.txt"),
            engine: EngineConfig::default(),
            evasion: EvasionConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|error| ResolveError::Config(format!("{}: {error}", path.display())))?;
        serde_saphyr::from_str(&raw)
            .map_err(|error| ResolveError::Config(format!("{}: {error}", path.display())))
    }
}

/// Resolution engine settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Fan out to all endpoints in parallel instead of trying them one by
    /// one.
    pub concurrent: bool,
    /// Per-request timeout applied uniformly to every outbound call.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            concurrent: true,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Request-shaping settings. `enabled: false` switches every layer off at
/// once; the individual flags then have no effect.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvasionConfig {
    /// Master switch for all evasion layers.
    pub enabled: bool,
    /// Rotate the User-Agent header per request.
    pub random_user_agent: bool,
    /// Send a referer derived from the target URL's origin.
    pub referer: bool,
    /// Route requests through a randomly chosen proxy.
    pub use_proxy: bool,
}

impl Default for EvasionConfig {
    fn default() -> Self {
        EvasionConfig {
            enabled: true,
            random_user_agent: true,
            referer: true,
            use_proxy: false,
        }
    }
}

/// Cache settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Whether resolutions are cached at all.
    pub enabled: bool,
    /// Age past which an entry is treated as absent.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Download the resolved media one-shot and serve it locally.
    pub download: bool,
    /// Cache root. Downloaded artifacts live under `artifacts/`, durable
    /// state under `state/`; only the artifacts subdirectory is ever
    /// served.
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            ttl: Duration::from_secs(3600),
            download: false,
            dir: PathBuf::from("cache"),
        }
    }
}

/// Rate limiter settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Whether admission checks run at all.
    pub enabled: bool,
    /// Ceiling for the minute window.
    pub per_minute: u32,
    /// Ceiling for the hour window.
    pub per_hour: u32,
    /// Ceiling for the day window.
    pub per_day: u32,
    /// How long a violating caller stays banned.
    #[serde(with = "humantime_serde")]
    pub ban_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            enabled: true,
            per_minute: 60,
            per_hour: 1000,
            per_day: 5000,
            ban_duration: Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = serde_saphyr::from_str("{}").unwrap();
        assert!(config.engine.concurrent);
        assert_eq!(config.engine.request_timeout, Duration::from_secs(5));
        assert_eq!(config.cache.ttl, Duration::from_secs(3600));
        assert_eq!(config.rate_limit.per_minute, 60);
        assert!(!config.cache.download);
    }

    #[test]
    fn partial_override() {
        let config: Config = serde_saphyr::from_str(
            r#"
            debug: true
            engine:
              concurrent: false
              request_timeout: 2s
            rate_limit:
              per_minute: 5
            "#,
        )
        .unwrap();
        assert!(config.debug);
        assert!(!config.engine.concurrent);
        assert_eq!(config.engine.request_timeout, Duration::from_secs(2));
        assert_eq!(config.rate_limit.per_minute, 5);
        // Untouched sections keep their defaults.
        assert_eq!(config.rate_limit.per_hour, 1000);
        assert!(config.cache.enabled);
    }
}
