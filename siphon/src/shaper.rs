//! Outbound request shaping.
//!
//! Builds the full outbound URL for an endpoint/target pair and applies the
//! evasion policy as independent, toggleable layers: identity rotation,
//! referer derivation, proxy selection. Layers are pure functions of the
//! policy flags; nothing here special-cases individual endpoints. A
//! bounded timeout and TLS-verification suppression apply uniformly so
//! self-signed upstream certs do not abort resolution.

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::header::{REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use siphon_core::{Endpoint, ProxyAddress, TargetUrl};

/// Identity header pool. One value is chosen pseudo-randomly per request,
/// not per process, so repeated calls do not expose a stable fingerprint.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:126.0) Gecko/20100101 Firefox/126.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36",
];

/// The evasion layers applied to every prepared request.
#[derive(Clone, Debug)]
pub struct EvasionPolicy {
    /// Rotate the User-Agent header per request.
    pub random_user_agent: bool,
    /// Send a referer derived from the target URL's origin.
    pub referer: bool,
    /// Route the request through a randomly chosen proxy.
    pub use_proxy: bool,
    /// Uniform per-request timeout.
    pub timeout: Duration,
}

impl EvasionPolicy {
    /// Policy with every evasion layer switched off.
    pub fn disabled(timeout: Duration) -> Self {
        EvasionPolicy {
            random_user_agent: false,
            referer: false,
            use_proxy: false,
            timeout,
        }
    }

    /// Builds a client for one outbound request, attaching a random proxy
    /// when proxying is enabled and the set is non-empty.
    pub fn client(&self, proxies: &[ProxyAddress]) -> reqwest::Result<Client> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(true);
        if self.use_proxy
            && let Some(proxy) = proxies.choose(&mut rand::thread_rng())
        {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }
        builder.build()
    }

    /// Applies the header layers to a prepared request.
    pub fn decorate(&self, mut request: RequestBuilder, target: &TargetUrl) -> RequestBuilder {
        if self.random_user_agent
            && let Some(agent) = USER_AGENTS.choose(&mut rand::thread_rng())
        {
            request = request.header(USER_AGENT, *agent);
        }
        if self.referer
            && let Some(origin) = origin_of(target)
        {
            request = request.header(REFERER, origin);
        }
        request
    }
}

/// Composes the full outbound URL: the endpoint template with the
/// percent-encoded target appended.
pub fn compose_url(endpoint: &Endpoint, target: &TargetUrl) -> String {
    format!(
        "{}{}",
        endpoint.template(),
        urlencoding::encode(target.as_str())
    )
}

/// Derives the target site's origin (`scheme://host[:port]/`) for the
/// referer layer, mimicking organic same-origin navigation. Targets that do
/// not parse as absolute URLs yield no referer.
pub fn origin_of(target: &TargetUrl) -> Option<String> {
    let parsed = url::Url::parse(target.as_str()).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{host}:{port}/", parsed.scheme()),
        None => format!("{}://{host}/", parsed.scheme()),
    })
}
