use std::time::Duration;

use http::StatusCode;

/// Delay used when neither the server nor the configuration supplies one.
pub(crate) const FALLBACK_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// How a connection attempt's response status is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StatusClass {
    /// `200 OK`: the body is the event stream.
    Success,
    /// Server-side trouble: back off and reconnect.
    Retryable,
    /// Anything else fails the connection.
    Fatal,
}

pub(crate) fn classify_status(status: StatusCode) -> StatusClass {
    match status {
        StatusCode::OK => StatusClass::Success,
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => StatusClass::Retryable,
        _ => StatusClass::Fatal,
    }
}

/// Constant reconnect delay: the server's latest `retry` directive wins over
/// the configured default, which wins over [`FALLBACK_RETRY_INTERVAL`].
/// Zero counts as unset.
pub(crate) fn retry_interval(server: Option<Duration>, configured: Option<Duration>) -> Duration {
    server
        .filter(|d| !d.is_zero())
        .or(configured.filter(|d| !d.is_zero()))
        .unwrap_or(FALLBACK_RETRY_INTERVAL)
}
