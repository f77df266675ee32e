//! Response classification
//!
//! One closed mapping from HTTP status to crawl behavior, so the retry
//! and breaker policy in the client is written once over this enum
//! instead of being re-derived per endpoint.
//!
//! The 401/403 split is deliberate: the API conflates "bad key" and
//! "bad path" under 403, so only 401 ever opens the credential breaker.

use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use std::time::Duration;

/// Behavior class of a remote API response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx: parse and return the payload, close the breaker
    Success,

    /// 401: the key is missing or revoked; open the breaker
    AuthMissing,

    /// 403: ambiguous (bad key or bad path); log and treat as empty,
    /// never open the breaker
    Ambiguous,

    /// 429: wait the server-supplied duration and retry the same call
    RateLimited { retry_after: Option<Duration> },

    /// 404: no data for this request
    NotFound,

    /// Anything else: retry with backoff up to the attempt budget
    Transient(u16),
}

/// Classifies a status code, threading through a parsed Retry-After
pub fn classify_status(status: StatusCode, retry_after: Option<Duration>) -> ResponseClass {
    if status.is_success() {
        return ResponseClass::Success;
    }

    match status.as_u16() {
        401 => ResponseClass::AuthMissing,
        403 => ResponseClass::Ambiguous,
        404 => ResponseClass::NotFound,
        429 => ResponseClass::RateLimited { retry_after },
        other => ResponseClass::Transient(other),
    }
}

/// Parses the Retry-After header as whole seconds
///
/// The API only ever sends the delta-seconds form, never an HTTP date.
pub fn retry_after_header(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
