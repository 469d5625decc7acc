//! Response envelope formatting.
//!
//! Pure data-to-JSON mapping: every response body carries at least `code`
//! and `msg`; successes add `url` (the final returned URL), `raw_url` (the
//! upstream resolution before any local substitution) and the optional
//! bookkeeping fields.

use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};
use siphon::{Config, Outcome, ResolveError};
use siphon_core::TargetUrl;

type Reply = (StatusCode, Json<Value>);

pub(crate) fn bad_request() -> Reply {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"code": 400, "msg": "missing url parameter"})),
    )
}

pub(crate) fn success(config: &Config, target: &TargetUrl, outcome: Outcome) -> Reply {
    // When a local artifact exists the caller gets it instead of the
    // upstream URL; `raw_url` always preserves the upstream resolution.
    let url = match &outcome.artifact {
        Some(file) => format!("/cache/{file}"),
        None => outcome.raw_url.clone(),
    };
    let msg = if config.show_url_in_msg {
        format!("{}: {url}", outcome.msg)
    } else {
        outcome.msg.clone()
    };

    let mut body = json!({
        "code": 200,
        "msg": msg,
        "url": url,
        "raw_url": outcome.raw_url,
        "target": target.as_str(),
        "cached": outcome.cached,
    });
    if config.show_api_source {
        body["used_api"] = Value::from(outcome.used_api.clone());
    }
    if let Some(file) = &outcome.artifact {
        body["cache_file"] = Value::from(file.clone());
    }
    if config.debug {
        body["debug"] = json!({
            "api_attempts": outcome.trace,
            "total_apis": outcome.total_endpoints,
            "apis_tried": outcome.trace.len() + usize::from(!outcome.cached),
        });
    }
    (StatusCode::OK, Json(body))
}

pub(crate) fn failure(config: &Config, error: ResolveError) -> Reply {
    match error {
        ResolveError::RateLimited(rejection) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"code": 429, "msg": format!("too many requests: {rejection}")})),
        ),
        ResolveError::Exhausted { tried, trace } => {
            let mut body = json!({
                "code": 500,
                "msg": "all endpoints failed to resolve",
                "apis_tried": tried,
            });
            if config.debug {
                body["debug"] = json!({"api_attempts": trace});
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
        }
        ResolveError::Config(message) => {
            tracing::error!(%message, "configuration error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"code": 500, "msg": message})),
            )
        }
        ResolveError::Backend(error) => {
            tracing::error!(%error, "storage backend error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"code": 500, "msg": "internal storage error"})),
            )
        }
    }
}
