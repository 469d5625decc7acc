//! Resolution cache.
//!
//! Maps a target URL to its most recent successful resolution. Entries are
//! persisted through a [`Backend`] wrapped in a [`CacheValue`] so expiry is
//! evaluated logically at read time. Keys derive from the raw target URL
//! via a stable hash, so identical requests collide on the same entry
//! across process restarts.
//!
//! A caching problem never downgrades a successful resolution: every
//! failure path in here degrades to "no artifact" / "no hit" with a log
//! line instead of an error.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use siphon_backend::{Backend, BackendExt};
use siphon_core::{CacheValue, ResolvedResult, StateKey, TargetUrl, key};

use crate::config::CacheConfig;
use crate::shaper::EvasionPolicy;

/// The payload cached per target URL.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedResolution {
    /// The upstream-resolved stream URL.
    pub raw_url: String,
    /// Template of the endpoint that produced the resolution.
    pub used_api: String,
    /// Full decoded upstream payload.
    pub payload: Value,
    /// File name of the downloaded media artifact, when one exists.
    pub artifact: Option<String>,
}

/// TTL'd cache over a storage backend, with optional one-shot media
/// download.
pub struct CacheStore {
    backend: Arc<dyn Backend>,
    ttl: Duration,
    dir: PathBuf,
    download: bool,
    http: reqwest::Client,
}

impl CacheStore {
    /// Creates a cache store.
    ///
    /// The artifact downloader shares the engine's timeout and TLS policy
    /// but never uses a proxy.
    pub fn new(
        backend: Arc<dyn Backend>,
        config: &CacheConfig,
        policy: &EvasionPolicy,
    ) -> reqwest::Result<Self> {
        let http = EvasionPolicy {
            use_proxy: false,
            ..policy.clone()
        }
        .client(&[])?;
        Ok(CacheStore {
            backend,
            ttl: config.ttl,
            // Artifacts get their own subdirectory so the HTTP front end can
            // serve them without exposing sibling state files.
            dir: config.dir.join("artifacts"),
            download: config.download,
            http,
        })
    }

    /// Returns the cached resolution for `target`, treating entries older
    /// than the TTL as absent. Backend failures read as a miss.
    pub async fn lookup(&self, target: &TargetUrl) -> Option<CachedResolution> {
        let key = StateKey::cache(target);
        let entry: CacheValue<CachedResolution> = match self.backend.get_json(&key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(%key, %error, "cache read failed, treating as miss");
                return None;
            }
        };
        if !entry.is_fresh(self.ttl, Utc::now()) {
            tracing::debug!(%key, created = %entry.created(), "cache entry expired");
            return None;
        }
        Some(entry.into_inner())
    }

    /// Stores a fresh resolution for `target`, optionally downloading the
    /// resolved media as a local artifact first.
    ///
    /// Returns the artifact file name when one was persisted. Never fails:
    /// download or write problems degrade to returning no artifact so the
    /// caller can still hand out the upstream URL.
    pub async fn store(&self, target: &TargetUrl, result: &ResolvedResult) -> Option<String> {
        let artifact = if self.download {
            self.download_artifact(target, result).await
        } else {
            None
        };
        let entry = CacheValue::new(CachedResolution {
            raw_url: result.stream_url.clone(),
            used_api: result.endpoint.template().to_owned(),
            payload: result.payload.clone(),
            artifact: artifact.clone(),
        });
        let key = StateKey::cache(target);
        if let Err(error) = self.backend.put_json(&key, &entry).await {
            tracing::warn!(%key, %error, "cache write failed, returning upstream url directly");
        }
        artifact
    }

    /// One-shot download of the resolved media into the cache directory.
    async fn download_artifact(&self, target: &TargetUrl, result: &ResolvedResult) -> Option<String> {
        let name = artifact_name(target, &result.stream_url);
        let path = self.dir.join(&name);

        if let Err(error) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), %error, "cannot create cache directory");
            return None;
        }
        let response = match self.http.get(&result.stream_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(url = %result.stream_url, status = %response.status(), "media download refused");
                return None;
            }
            Err(error) => {
                tracing::warn!(url = %result.stream_url, %error, "media download failed");
                return None;
            }
        };
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(url = %result.stream_url, %error, "media download interrupted");
                return None;
            }
        };
        if let Err(error) = tokio::fs::write(&path, &body).await {
            tracing::warn!(path = %path.display(), %error, "artifact write failed");
            return None;
        }
        tracing::info!(path = %path.display(), bytes = body.len(), "media downloaded and cached");
        Some(name)
    }
}

/// Deterministic artifact file name: target digest plus the extension of
/// the resolved URL (falling back to `bin`).
fn artifact_name(target: &TargetUrl, stream_url: &str) -> String {
    let digest = key::digest(target.as_str());
    format!("{}.{}", &digest[..16], extension_of(stream_url))
}

fn extension_of(stream_url: &str) -> &str {
    let path = stream_url
        .split(['?', '#'])
        .next()
        .unwrap_or(stream_url);
    match path.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use siphon_backend::MemoryBackend;
    use siphon_core::Endpoint;

    fn store(ttl: Duration) -> CacheStore {
        let config = CacheConfig {
            enabled: true,
            ttl,
            download: false,
            dir: PathBuf::from("unused"),
        };
        CacheStore::new(
            Arc::new(MemoryBackend::new()),
            &config,
            &EvasionPolicy::disabled(Duration::from_secs(5)),
        )
        .unwrap()
    }

    fn result() -> ResolvedResult {
        ResolvedResult {
            endpoint: Endpoint::new("http://api/parse?url=", 0),
            stream_url: "http://a/index.m3u8".to_owned(),
            payload: json!({"m3u8": "http://a/index.m3u8"}),
        }
    }

    #[tokio::test]
    async fn lookup_returns_stored_entry() {
        let store = store(Duration::from_secs(60));
        let target = TargetUrl::new("https://v.example.com/1").unwrap();

        assert!(store.lookup(&target).await.is_none());
        store.store(&target, &result()).await;

        let hit = store.lookup(&target).await.unwrap();
        assert_eq!(hit.raw_url, "http://a/index.m3u8");
        assert_eq!(hit.used_api, "http://api/parse?url=");
        assert_eq!(hit.payload, result().payload);
        assert!(hit.artifact.is_none());
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let store = store(Duration::ZERO);
        let target = TargetUrl::new("https://v.example.com/1").unwrap();
        store.store(&target, &result()).await;
        // TTL of zero: physically present, logically expired.
        assert!(store.lookup(&target).await.is_none());
    }

    #[tokio::test]
    async fn later_store_overwrites() {
        let store = store(Duration::from_secs(60));
        let target = TargetUrl::new("https://v.example.com/1").unwrap();
        store.store(&target, &result()).await;

        let mut newer = result();
        newer.stream_url = "http://b/other.m3u8".to_owned();
        store.store(&target, &newer).await;

        assert_eq!(
            store.lookup(&target).await.unwrap().raw_url,
            "http://b/other.m3u8"
        );
    }

    #[test]
    fn artifact_names_are_deterministic() {
        let target = TargetUrl::new("https://v.example.com/1").unwrap();
        let a = artifact_name(&target, "http://a/index.m3u8?token=x");
        let b = artifact_name(&target, "http://a/index.m3u8?token=y");
        assert_eq!(a, b);
        assert!(a.ends_with(".m3u8"));
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(extension_of("http://a/stream"), "bin");
        assert_eq!(extension_of("http://a/video.mp4"), "mp4");
        assert_eq!(extension_of("http://a/weird.longextension"), "bin");
    }
}
