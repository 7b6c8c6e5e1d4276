//! Shared error type used across the orchestrator workspace.
//!
//! Variants map onto the error-kind/disposition table: each carries enough
//! structured detail to render a generic client-facing message while a
//! verbose line goes to the trace log.

/// Shared error type used across all orchestrator crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("validation: {0}")]
    ValidationError(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("backend {alias} unavailable: {message}")]
    BackendUnavailable { alias: String, message: String },

    #[error("backend {alias} timed out after {timeout_ms}ms")]
    BackendTimeout { alias: String, timeout_ms: u64 },

    #[error("backend {alias} returned {status}: {body_snippet}")]
    BackendError {
        alias: String,
        status: u16,
        body_snippet: String,
    },

    #[error("insufficient funds for agent {agent_id}: {reason}")]
    InsufficientFunds { agent_id: String, reason: String },

    #[error("agent {agent_id} is frozen")]
    Frozen { agent_id: String },

    #[error("agent {agent_id} not authorized for tool {tool_name}")]
    NotAuthorized { agent_id: String, tool_name: String },

    #[error("key-value store unavailable: {0}")]
    KvUnavailable(String),

    #[error("voice stage '{stage}' failed: {message}")]
    VoiceStageFailed { stage: String, message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("request timed out")]
    RequestTimeout,

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The generic, client-safe message for this error. Internal detail
    /// (pattern matches, backend bodies, stack-like context) stays in the
    /// trace log only.
    pub fn client_message(&self) -> &'static str {
        match self {
            Error::ValidationError(_) => "invalid input detected",
            Error::RateLimited { .. } => "rate limit exceeded",
            Error::BackendUnavailable { .. } => "backend unavailable",
            Error::BackendTimeout { .. } => "backend timed out",
            Error::BackendError { .. } => "backend error",
            Error::InsufficientFunds { .. } => "insufficient funds",
            Error::Frozen { .. } => "account frozen",
            Error::NotAuthorized { .. } => "not authorized",
            Error::KvUnavailable(_) => "temporarily unavailable",
            Error::VoiceStageFailed { stage, .. } if stage == "stt" => "stt_failed",
            Error::VoiceStageFailed { stage, .. } if stage == "tts" => "tts_failed",
            Error::VoiceStageFailed { .. } => "voice pipeline failed",
            Error::Cancelled => "cancelled",
            Error::RequestTimeout => "request timed out",
            Error::Config(_) => "internal configuration error",
            Error::Auth(_) => "unauthorized",
            Error::AlreadyExists(_) => "already exists",
            Error::Io(_) | Error::Json(_) | Error::Http(_) | Error::Other(_) => "internal error",
        }
    }

    /// HTTP status this error maps to at the surface layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ValidationError(_) => 400,
            Error::RateLimited { .. } => 429,
            Error::BackendUnavailable { .. } | Error::KvUnavailable(_) => 503,
            Error::BackendTimeout { .. } => 504,
            Error::InsufficientFunds { .. } | Error::Frozen { .. } | Error::NotAuthorized { .. } => {
                402
            }
            Error::Auth(_) => 401,
            Error::AlreadyExists(_) => 409,
            Error::Cancelled | Error::RequestTimeout => 408,
            _ => 500,
        }
    }
}
