//! Typed error taxonomy for the embedding layer and request validation.
//!
//! Provider failures are classified so callers can react per category:
//! configuration problems surface at construction, auth rejections name the
//! credential that was refused, and rate limits are reported distinctly so
//! the caller can back off. None of these are retried inside this crate.

use thiserror::Error;

/// Errors raised by embedding providers and the provider resolver.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Missing or incomplete credentials, detected when the provider is
    /// constructed rather than on first use.
    #[error("[{provider}] missing or incomplete configuration: {detail}")]
    Configuration { provider: &'static str, detail: String },

    /// The backend could not be reached at all.
    #[error("[{provider}] failed to connect to {target}: {source}")]
    Connection {
        provider: &'static str,
        target: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend rejected the request with a non-success status.
    #[error("[{provider}] backend returned {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Credentials were rejected; names the specific credential so the
    /// operator knows which variable to fix.
    #[error("[{provider}] invalid {credential}; check your credentials")]
    Auth {
        provider: &'static str,
        credential: &'static str,
    },

    /// The backend is rate limiting. Retry after a short delay.
    #[error("[{provider}] rate limit exceeded; retry after a short delay")]
    RateLimited { provider: &'static str },

    /// The response was malformed or did not match the request shape.
    #[error("[{provider}] protocol error: {detail}")]
    Protocol { provider: &'static str, detail: String },

    /// No provider is configured and an embedding call was attempted.
    #[error("no embedding provider configured")]
    NotConfigured,
}

/// Request validation errors, rejected before the store or provider layers
/// are touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("content is required")]
    MissingContent,

    #[error("version is required")]
    MissingVersion,

    #[error("query is required")]
    EmptyQuery,

    #[error("limit must be a positive integer")]
    InvalidLimit,
}
