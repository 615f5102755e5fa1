use thiserror::Error;

/// Classification of sync failures.
///
/// Every error recorded during a sync cycle is bucketed into one of these
/// categories. The category drives the retry decision: only [`ErrorKind::Network`]
/// failures are retried, everything else fails the attempt immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection failures, DNS errors, timeouts.
    Network,
    /// Upstream API rejected the request (auth, rate limit, bad endpoint).
    Api,
    /// Upstream payload failed validation or could not be parsed.
    Validation,
    /// Local persistence failed.
    Database,
    /// Anything that did not match a known category.
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Api => "api",
            ErrorKind::Validation => "validation",
            ErrorKind::Database => "database",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Classifies free-form error text into a category.
    ///
    /// Used as a fallback when the error did not arrive as a typed
    /// [`AppError`] variant, e.g. messages persisted by an earlier run.
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("enotfound")
            || lower.contains("econnrefused")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("network")
        {
            ErrorKind::Network
        } else if lower.contains("401")
            || lower.contains("403")
            || lower.contains("rate limit")
            || lower.contains("api")
        {
            ErrorKind::Api
        } else if lower.contains("validation") || lower.contains("invalid") {
            ErrorKind::Validation
        } else if lower.contains("database") || lower.contains("sqlx") || lower.contains("postgres")
        {
            ErrorKind::Database
        } else {
            ErrorKind::Unknown
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur inside the sync
/// engine. It uses the `thiserror` crate for ergonomic error handling and
/// automatic conversion from underlying library errors.
///
/// # Error Conversion
///
/// Most errors automatically convert from their source types using the
/// `#[from]` attribute:
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Wraps all errors from SQLx database operations, including connection
    /// failures, query errors, and constraint violations.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP request to an upstream sport API failed.
    #[error("API client error: {0}")]
    ClientError(String),

    /// Network or connection error.
    ///
    /// Occurs when a request fails due to connectivity issues, DNS
    /// resolution failures, or the remote server being unreachable.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded on an upstream API.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// JSON serialization or deserialization failed.
    ///
    /// Occurs when converting between Rust types and JSON, typically when
    /// parsing API responses or preparing cache payloads.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Upstream payload failed validation.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A sync source referenced by id does not exist.
    #[error("Unknown sport source: {0}")]
    SourceNotFound(String),

    /// Manual or scheduled trigger collided with a running sync.
    ///
    /// The distributed lock for this source is held by another sync cycle,
    /// possibly on another process.
    #[error("Sync already in progress for source {0}")]
    SyncInProgress(i32),

    /// The source was disabled after too many consecutive failures.
    #[error("Source {0} is disabled")]
    SourceDisabled(i32),

    /// Redis operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Cron expression could not be parsed.
    #[error("Invalid cron schedule '{0}': {1}")]
    InvalidSchedule(String, String),

    /// Configuration file error.
    ///
    /// Occurs when reading or parsing the sources configuration fails, such
    /// as when the sources.toml file is malformed or contains invalid values.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns the sync classification for this error.
    ///
    /// Typed variants map directly; string-carrying variants fall back to
    /// substring classification of the message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => ErrorKind::Network,
            AppError::RateLimitExceeded | AppError::SourceNotFound(_) => ErrorKind::Api,
            AppError::ClientError(msg) => ErrorKind::classify_message(msg),
            AppError::ValidationError(_) | AppError::SerializationError(_) => ErrorKind::Validation,
            AppError::DatabaseError(_) => ErrorKind::Database,
            AppError::CacheError(_) => ErrorKind::Network,
            AppError::Generic(msg) => ErrorKind::classify_message(msg),
            _ => ErrorKind::Unknown,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Only network-class failures are worth retrying: the upstream may be
    /// briefly unreachable and a later attempt can succeed. API rejections,
    /// validation failures, and database errors will fail the same way on
    /// every attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use matchday_core::error::AppError;
    ///
    /// let err = AppError::NetworkError("connection reset".to_string());
    /// assert!(err.is_retryable());
    ///
    /// let err = AppError::ValidationError("missing field".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}
