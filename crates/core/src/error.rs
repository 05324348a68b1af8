//! Unified error types for the dashboard.
//!
//! Error codes:
//! - VALID_001-002: Validation errors
//! - NOT_FOUND_001: Unknown campaign or no data
//! - CONFLICT_001: A sync is already running
//! - DB_001: Storage errors
//! - UPSTREAM_001-002: Meta Marketing API errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid input (bad date, negative amount, inverted window)
    InvalidInput,
    /// VALID_002: Requested window is longer than allowed
    WindowTooLarge,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "VALID_001",
            Self::WindowTooLarge => "VALID_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Database error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: Failed to read or write metrics
    StoreFailed,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreFailed => "DB_001",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        500
    }
}

/// Upstream (Meta Marketing API) error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorCode {
    /// UPSTREAM_001: Request failed or returned an error envelope
    RequestFailed,
    /// UPSTREAM_002: Access token expired or revoked
    TokenExpired,
}

impl UpstreamErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestFailed => "UPSTREAM_001",
            Self::TokenExpired => "UPSTREAM_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        502
    }
}

/// Unified error type for the dashboard.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error with code.
    #[error("[{code}] {message}")]
    ValidationWithCode {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Database error with code.
    #[error("[{code}] {message}")]
    Database {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Meta API error with code.
    #[error("[{code}] {message}")]
    Upstream {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("export error: {0}")]
    Export(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a database error.
    pub fn database(code: DbErrorCode, msg: impl Into<String>) -> Self {
        Self::Database {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create an upstream error.
    pub fn upstream(code: UpstreamErrorCode, msg: impl Into<String>) -> Self {
        Self::Upstream {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this is an expired/revoked access token from the Meta API.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::Upstream { code, .. } if *code == UpstreamErrorCode::TokenExpired.code())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationWithCode { http_status, .. } => *http_status,
            Self::Database { http_status, .. } => *http_status,
            Self::Upstream { http_status, .. } => *http_status,
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Serialization(_) => 400,
            Self::Export(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::ValidationWithCode { code, .. } => Some(code),
            Self::Database { code, .. } => Some(code),
            Self::Upstream { code, .. } => Some(code),
            _ => None,
        }
    }
}
