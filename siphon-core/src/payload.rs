//! Upstream payload validation and stream-URL extraction.
//!
//! Resolver endpoints answer with loosely structured JSON documents. Two
//! pure checks apply to every decoded payload, in both execution modes:
//!
//! 1. [`is_blocked`] - does the payload carry a blocked/DMCA signature?
//! 2. [`extract_stream_url`] - does one of the known candidate fields hold
//!    a non-empty stream URL?
//!
//! Extraction walks a fixed ordered list of candidate field names instead of
//! inspecting the document dynamically; the first non-empty match wins.

use serde_json::Value;

/// Candidate payload fields that may carry the resolved stream URL, in
/// priority order. The first field present with a non-empty string value is
/// the resolution result.
pub const STREAM_FIELDS: &[&str] = &["url", "m3u8", "play_url", "src", "address"];

/// Substrings (lowercase) in payload message fields that mark a takedown
/// block rather than an ordinary failure.
const BLOCK_MARKERS: &[&str] = &["dmca", "copyright", "takedown"];

/// Payload fields scanned for block markers.
const MESSAGE_FIELDS: &[&str] = &["msg", "error", "message"];

/// Returns the resolved stream URL from `payload`, if any candidate field
/// holds a non-empty string.
///
/// ```
/// use serde_json::json;
/// use siphon_core::extract_stream_url;
///
/// let payload = json!({"src": "http://a/video.mp4", "m3u8": "http://a/index.m3u8"});
/// // `m3u8` precedes `src` in the fixed priority order.
/// assert_eq!(extract_stream_url(&payload), Some("http://a/index.m3u8"));
/// ```
pub fn extract_stream_url(payload: &Value) -> Option<&str> {
    STREAM_FIELDS
        .iter()
        .filter_map(|field| payload.get(field))
        .filter_map(Value::as_str)
        .find(|url| !url.is_empty())
}

/// Whether `payload` matches a known blocked/DMCA signature.
///
/// A payload is considered blocked when any of these hold:
/// - a `dmca` field is `true`;
/// - the `code` field is `451` (number or string);
/// - a `msg`/`error`/`message` string mentions a takedown marker.
pub fn is_blocked(payload: &Value) -> bool {
    if payload.get("dmca").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    match payload.get("code") {
        Some(Value::Number(code)) if code.as_i64() == Some(451) => return true,
        Some(Value::String(code)) if code == "451" => return true,
        _ => {}
    }
    MESSAGE_FIELDS
        .iter()
        .filter_map(|field| payload.get(field))
        .filter_map(Value::as_str)
        .any(|text| {
            let text = text.to_lowercase();
            BLOCK_MARKERS.iter().any(|marker| text.contains(marker))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_candidate_field_wins() {
        let payload = json!({"address": "http://d", "play_url": "http://c", "url": "http://a"});
        assert_eq!(extract_stream_url(&payload), Some("http://a"));
    }

    #[test]
    fn empty_values_are_skipped() {
        let payload = json!({"url": "", "m3u8": "http://b/index.m3u8"});
        assert_eq!(extract_stream_url(&payload), Some("http://b/index.m3u8"));
    }

    #[test]
    fn non_string_values_are_skipped() {
        let payload = json!({"url": 42, "src": "http://c"});
        assert_eq!(extract_stream_url(&payload), Some("http://c"));
    }

    #[test]
    fn no_candidate_field() {
        let payload = json!({"status": "ok"});
        assert_eq!(extract_stream_url(&payload), None);
    }

    #[test]
    fn dmca_flag_blocks() {
        assert!(is_blocked(&json!({"dmca": true, "url": "http://a"})));
        assert!(!is_blocked(&json!({"dmca": false, "url": "http://a"})));
    }

    #[test]
    fn code_451_blocks() {
        assert!(is_blocked(&json!({"code": 451})));
        assert!(is_blocked(&json!({"code": "451"})));
        assert!(!is_blocked(&json!({"code": 200})));
    }

    #[test]
    fn takedown_message_blocks() {
        assert!(is_blocked(&json!({"msg": "Removed due to DMCA request"})));
        assert!(is_blocked(&json!({"error": "copyright claim"})));
        assert!(!is_blocked(&json!({"msg": "ok"})));
    }
}
