//! Endpoint and proxy list loading.
//!
//! Both lists are flat text files, one entry per line; blank lines and `#`
//! comments are skipped. Lists are loaded once per resolution request into
//! an immutable sequence; no shared mutable list exists across requests.
//! Health filtering happens externally: a scheduled probe rewrites the
//! endpoint file and the registry simply reads whatever subset it finds.

use std::path::{Path, PathBuf};

use siphon_core::{Endpoint, ProxyAddress};

use crate::error::ResolveError;

/// File-backed endpoint and proxy registry.
#[derive(Clone, Debug)]
pub struct Registry {
    endpoints_file: PathBuf,
    proxies_file: PathBuf,
}

impl Registry {
    /// Creates a registry over the given list files.
    pub fn new(endpoints_file: impl Into<PathBuf>, proxies_file: impl Into<PathBuf>) -> Self {
        Registry {
            endpoints_file: endpoints_file.into(),
            proxies_file: proxies_file.into(),
        }
    }

    /// Loads the ordered endpoint sequence.
    ///
    /// An unreadable or empty list is a configuration error: resolution
    /// cannot proceed with no endpoints available.
    pub async fn load(&self) -> Result<Vec<Endpoint>, ResolveError> {
        let lines = read_lines(&self.endpoints_file).await.map_err(|error| {
            ResolveError::Config(format!(
                "endpoint list {}: {error}",
                self.endpoints_file.display()
            ))
        })?;
        let endpoints: Vec<Endpoint> = lines
            .into_iter()
            .enumerate()
            .map(|(index, template)| Endpoint::new(template, index))
            .collect();
        if endpoints.is_empty() {
            return Err(ResolveError::Config(format!(
                "endpoint list {} is empty: no endpoints available",
                self.endpoints_file.display()
            )));
        }
        Ok(endpoints)
    }

    /// Loads the proxy address set. A missing or empty file is not an
    /// error; proxying simply has nothing to pick from.
    pub async fn load_proxies(&self) -> Result<Vec<ProxyAddress>, ResolveError> {
        match read_lines(&self.proxies_file).await {
            Ok(lines) => Ok(lines.into_iter().map(ProxyAddress::new).collect()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(ResolveError::Config(format!(
                "proxy list {}: {error}",
                self.proxies_file.display()
            ))),
        }
    }
}

async fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}
