//! Resolver endpoint and outbound proxy types.
//!
//! An [`Endpoint`] is a URL template for a third-party resolver service: the
//! percent-encoded target URL is appended to the template to form the full
//! outbound request URL. Endpoints carry an implicit priority given by their
//! position in the backing list; the sequence is immutable once loaded for a
//! resolution request.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A third-party resolver endpoint template.
///
/// The `index` is the zero-based position in the registry list and doubles
/// as the endpoint's priority: lower index wins when several endpoints
/// return a valid payload.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    template: String,
    index: usize,
}

impl Endpoint {
    /// Creates an endpoint from its template and list position.
    pub fn new(template: impl Into<String>, index: usize) -> Self {
        Endpoint {
            template: template.into(),
            index,
        }
    }

    /// Returns the URL template the encoded target is appended to.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the zero-based registry position (priority; lower wins).
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// An outbound proxy address, e.g. `http://10.0.0.1:3128`.
///
/// Proxies are drawn uniformly at random per request when proxying is
/// enabled; an address has no ownership beyond the request it decorates.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProxyAddress(String);

impl ProxyAddress {
    /// Wraps a raw proxy address string.
    pub fn new(address: impl Into<String>) -> Self {
        ProxyAddress(address.into())
    }

    /// Returns the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
