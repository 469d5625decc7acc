//! Multi-endpoint resolution.
//!
//! The engine runs the shaped request against every endpoint until one
//! response passes validation or the list is exhausted. Two execution modes
//! share identical per-response validation:
//!
//! - **Sequential**: endpoints in registry order, one blocking request at a
//!   time, stop at the first valid response.
//! - **Concurrent**: all requests are spawned at once, but completed
//!   outcomes are scanned *in original endpoint order*, so endpoint
//!   precedence never depends on network timing. Remaining in-flight tasks
//!   are aborted once a winner is chosen.
//!
//! A single endpoint is never retried; cross-endpoint fallback is the only
//! retry mechanism.

use serde_json::Value;
use siphon_core::{
    Attempt, Endpoint, ProxyAddress, RejectReason, ResolvedResult, Resolution, TargetUrl,
    extract_stream_url, is_blocked,
};

use crate::shaper::{EvasionPolicy, compose_url};

/// How the engine walks the endpoint list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecutionMode {
    /// Ordered one-at-a-time fallback.
    Sequential,
    /// Fan out all requests, pick the first valid outcome by endpoint
    /// priority.
    Concurrent,
}

/// What one outbound call produced, before validation.
#[derive(Clone, Debug)]
enum Reply {
    Transport(String),
    Http { status: u16, body: String },
}

/// The resolution engine.
#[derive(Clone, Debug)]
pub struct Engine {
    mode: ExecutionMode,
    policy: EvasionPolicy,
}

impl Engine {
    /// Creates an engine with the given mode and request-shaping policy.
    pub fn new(mode: ExecutionMode, policy: EvasionPolicy) -> Self {
        Engine { mode, policy }
    }

    /// Resolves `target` against the live endpoint sequence.
    ///
    /// Produces at most one [`ResolvedResult`]; on exhaustion the returned
    /// [`Resolution`] carries one rejection per attempted endpoint.
    pub async fn resolve(
        &self,
        endpoints: &[Endpoint],
        proxies: &[ProxyAddress],
        target: &TargetUrl,
    ) -> Resolution {
        let resolution = match self.mode {
            ExecutionMode::Sequential => self.run_sequential(endpoints, proxies, target).await,
            ExecutionMode::Concurrent => self.run_concurrent(endpoints, proxies, target).await,
        };
        match &resolution.result {
            Some(result) => tracing::info!(
                target_url = %target,
                endpoint = %result.endpoint,
                stream_url = %result.stream_url,
                "resolution succeeded"
            ),
            None => tracing::warn!(
                target_url = %target,
                tried = resolution.attempts.len(),
                "all endpoints exhausted"
            ),
        }
        resolution
    }

    async fn run_sequential(
        &self,
        endpoints: &[Endpoint],
        proxies: &[ProxyAddress],
        target: &TargetUrl,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        for endpoint in endpoints {
            let reply = fetch(&self.policy, proxies, endpoint, target).await;
            match validate(endpoint, reply) {
                Ok(result) => {
                    resolution.result = Some(result);
                    break;
                }
                Err(reason) => reject(&mut resolution, endpoint, reason),
            }
        }
        resolution
    }

    async fn run_concurrent(
        &self,
        endpoints: &[Endpoint],
        proxies: &[ProxyAddress],
        target: &TargetUrl,
    ) -> Resolution {
        let handles: Vec<_> = endpoints
            .iter()
            .map(|endpoint| {
                let policy = self.policy.clone();
                let proxies = proxies.to_vec();
                let endpoint = endpoint.clone();
                let target = target.clone();
                tokio::spawn(
                    async move { fetch(&policy, &proxies, &endpoint, &target).await },
                )
            })
            .collect();

        let mut resolution = Resolution::default();
        let mut pending = endpoints.iter().zip(handles);
        for (endpoint, handle) in pending.by_ref() {
            let reply = match handle.await {
                Ok(reply) => reply,
                // A cancelled or panicked task counts as a failed attempt.
                Err(error) => Reply::Transport(error.to_string()),
            };
            match validate(endpoint, reply) {
                Ok(result) => {
                    resolution.result = Some(result);
                    break;
                }
                Err(reason) => reject(&mut resolution, endpoint, reason),
            }
        }
        // Winner found: abandon whatever is still in flight. Their results,
        // if they ever arrive, are discarded.
        for (_, handle) in pending {
            handle.abort();
        }
        resolution
    }
}

fn reject(resolution: &mut Resolution, endpoint: &Endpoint, reason: RejectReason) {
    tracing::debug!(endpoint = %endpoint, %reason, "endpoint rejected");
    resolution.attempts.push(Attempt {
        endpoint: endpoint.clone(),
        reason,
    });
}

async fn fetch(
    policy: &EvasionPolicy,
    proxies: &[ProxyAddress],
    endpoint: &Endpoint,
    target: &TargetUrl,
) -> Reply {
    let client = match policy.client(proxies) {
        Ok(client) => client,
        Err(error) => return Reply::Transport(error.to_string()),
    };
    let url = compose_url(endpoint, target);
    let request = policy.decorate(client.get(url), target);
    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            match response.text().await {
                Ok(body) => Reply::Http { status, body },
                Err(error) => Reply::Transport(error.to_string()),
            }
        }
        Err(error) => Reply::Transport(error.to_string()),
    }
}

/// The per-response validation pipeline, identical in both modes.
/// Short-circuits at the first failed step.
fn validate(endpoint: &Endpoint, reply: Reply) -> Result<ResolvedResult, RejectReason> {
    let (status, body) = match reply {
        Reply::Transport(error) => return Err(RejectReason::Transport(error)),
        Reply::Http { status, body } => (status, body),
    };
    if status != 200 {
        return Err(RejectReason::Status(status));
    }
    let payload: Value =
        serde_json::from_str(&body).map_err(|error| RejectReason::MalformedBody(error.to_string()))?;
    if is_blocked(&payload) {
        return Err(RejectReason::Blocked);
    }
    let stream_url = extract_stream_url(&payload)
        .ok_or(RejectReason::NoStreamField)?
        .to_owned();
    Ok(ResolvedResult {
        endpoint: endpoint.clone(),
        stream_url,
        payload,
    })
}
