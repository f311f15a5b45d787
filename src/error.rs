use thiserror::Error;

/// Categorized failures from the stats provider. Every transport or HTTP
/// fault is folded into one of these before it leaves the fetch layer; the
/// dispatcher turns each category into a fixed user-facing message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("provider unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("no such record: {0}")]
    NotFound(String),
    #[error("provider error (http {status}): {detail}")]
    Upstream { status: u16, detail: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
