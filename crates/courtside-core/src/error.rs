use thiserror::Error;

use crate::http_client::HttpErrorKind;
use crate::WarehouseError;

/// Longest upstream body excerpt carried in an error.
pub const BODY_EXCERPT_LIMIT: usize = 200;

/// Validation errors for configuration and domain values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("work unit cannot be empty")]
    EmptyWorkUnit,
    #[error("work unit contains control character at index {index}")]
    WorkUnitControlChar { index: usize },

    #[error("win/loss must be 'W' or 'L', got '{value}'")]
    InvalidWinLoss { value: String },

    #[error("at least one season must be configured")]
    NoSeasons,
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("retry.backoff_factor must be finite and positive, got {value}")]
    InvalidBackoffFactor { value: f64 },
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("request_timeout_ms must be greater than zero")]
    ZeroTimeout,
    #[error("upstream.base_url must start with http:// or https://: '{value}'")]
    InvalidBaseUrl { value: String },
}

/// Coarse category of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    TransientNetwork,
    RateLimited,
    UpstreamServer,
    UpstreamProtocol,
    UpstreamClient,
    RetriesExhausted,
    Cancelled,
}

impl FetchErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransientNetwork => "transient_network",
            Self::RateLimited => "rate_limited",
            Self::UpstreamServer => "upstream_server",
            Self::UpstreamProtocol => "upstream_protocol",
            Self::UpstreamClient => "upstream_client",
            Self::RetriesExhausted => "retries_exhausted",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Failure of one work-unit fetch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("transient network failure ({kind:?}): {message}")]
    TransientNetwork {
        kind: HttpErrorKind,
        message: String,
    },

    #[error("rate limited by upstream (HTTP {status}): {body}")]
    RateLimited { status: u16, body: String },

    #[error("upstream server error (HTTP {status}): {body}")]
    UpstreamServer { status: u16, body: String },

    #[error("malformed upstream response: {0}")]
    UpstreamProtocol(String),

    #[error("upstream rejected request (HTTP {status}): {body}")]
    UpstreamClient { status: u16, body: String },

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<FetchError> },

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub const fn kind(&self) -> FetchErrorKind {
        match self {
            Self::TransientNetwork { .. } => FetchErrorKind::TransientNetwork,
            Self::RateLimited { .. } => FetchErrorKind::RateLimited,
            Self::UpstreamServer { .. } => FetchErrorKind::UpstreamServer,
            Self::UpstreamProtocol(_) => FetchErrorKind::UpstreamProtocol,
            Self::UpstreamClient { .. } => FetchErrorKind::UpstreamClient,
            Self::RetriesExhausted { .. } => FetchErrorKind::RetriesExhausted,
            Self::Cancelled => FetchErrorKind::Cancelled,
        }
    }

    /// Whether another attempt may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork { .. } | Self::RateLimited { .. } | Self::UpstreamServer { .. }
        )
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { status, .. }
            | Self::UpstreamServer { status, .. }
            | Self::UpstreamClient { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

/// Truncate an upstream body to [`BODY_EXCERPT_LIMIT`] characters.
pub fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Raw records that do not fit the declared raw schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("required headers missing from upstream response: {}", .missing.join(", "))]
    MissingHeaders { missing: Vec<String> },

    #[error("row {row}: field '{field}' {reason}")]
    InvalidValue {
        row: usize,
        field: &'static str,
        reason: String,
    },
}

/// Failure of an ingestion run. Nothing has been written when this is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("fetching work unit '{unit}' failed: {source}")]
    Fetch {
        unit: String,
        #[source]
        source: FetchError,
    },

    #[error("work unit '{unit}' does not match the raw schema: {source}")]
    Schema {
        unit: String,
        #[source]
        source: SchemaError,
    },

    #[error("ingestion cancelled")]
    Cancelled,

    #[error("ingest worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

/// Failure of a full ingest-then-transform run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}
