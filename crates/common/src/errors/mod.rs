//! Error types for LexForge services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,

    // Knowledge base errors (2xxx)
    KnowledgeBaseError,
    KnowledgeBaseSchema,

    // External capability errors (3xxx)
    EmbeddingError,
    EmbeddingTimeout,
    TaggerError,
    GenerationUnavailable,
    GenerationTimeout,
    MalformedGeneration,

    // Publication errors (4xxx)
    PublishError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,

            // Knowledge base (2xxx)
            ErrorCode::KnowledgeBaseError => 2001,
            ErrorCode::KnowledgeBaseSchema => 2002,

            // External capabilities (3xxx)
            ErrorCode::EmbeddingError => 3001,
            ErrorCode::EmbeddingTimeout => 3002,
            ErrorCode::TaggerError => 3003,
            ErrorCode::GenerationUnavailable => 3004,
            ErrorCode::GenerationTimeout => 3005,
            ErrorCode::MalformedGeneration => 3006,

            // Publication (4xxx)
            ErrorCode::PublishError => 4001,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }

    /// Stable reason string carried in published result documents
    pub fn reason(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation",
            ErrorCode::MissingField => "missing-field",
            ErrorCode::InvalidFormat => "invalid-format",
            ErrorCode::KnowledgeBaseError => "knowledge-base",
            ErrorCode::KnowledgeBaseSchema => "knowledge-base-schema",
            ErrorCode::EmbeddingError => "embedding",
            ErrorCode::EmbeddingTimeout => "embedding-timeout",
            ErrorCode::TaggerError => "tagger",
            ErrorCode::GenerationUnavailable => "backend-unavailable",
            ErrorCode::GenerationTimeout => "backend-timeout",
            ErrorCode::MalformedGeneration => "malformed generation output",
            ErrorCode::PublishError => "publish",
            ErrorCode::InternalError => "internal",
            ErrorCode::ConfigurationError => "configuration",
            ErrorCode::SerializationError => "serialization",
            ErrorCode::ServiceUnavailable => "service-unavailable",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Knowledge base errors (fatal at startup)
    #[error("Knowledge base load failed: {path}: {message}")]
    KnowledgeBase { path: String, message: String },

    #[error("Knowledge base schema violation in {path}: {message}")]
    KnowledgeBaseSchema { path: String, message: String },

    // External capability errors
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Embedding timeout after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    #[error("Entity tagger error: {message}")]
    TaggerError { message: String },

    #[error("Generation backend unavailable: {message}")]
    GenerationUnavailable { message: String },

    #[error("Generation timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    #[error("Malformed generation output: {message}")]
    MalformedGeneration { message: String },

    // Publication errors
    #[error("Result publish failed: {message}")]
    PublishError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::KnowledgeBase { .. } => ErrorCode::KnowledgeBaseError,
            AppError::KnowledgeBaseSchema { .. } => ErrorCode::KnowledgeBaseSchema,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::EmbeddingTimeout { .. } => ErrorCode::EmbeddingTimeout,
            AppError::TaggerError { .. } => ErrorCode::TaggerError,
            AppError::GenerationUnavailable { .. } => ErrorCode::GenerationUnavailable,
            AppError::GenerationTimeout { .. } => ErrorCode::GenerationTimeout,
            AppError::MalformedGeneration { .. } => ErrorCode::MalformedGeneration,
            AppError::PublishError { .. } => ErrorCode::PublishError,
            AppError::HttpClient(_) => ErrorCode::GenerationUnavailable,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            AppError::KnowledgeBase { .. }
            | AppError::KnowledgeBaseSchema { .. }
            | AppError::PublishError { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::EmbeddingError { .. }
            | AppError::EmbeddingTimeout { .. }
            | AppError::TaggerError { .. }
            | AppError::GenerationUnavailable { .. }
            | AppError::MalformedGeneration { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 504 Gateway Timeout
            AppError::GenerationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,

            // 503 Service Unavailable
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
                request_id: None, // Should be filled by middleware
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::GenerationTimeout { timeout_secs: 30 };
        assert_eq!(err.code(), ErrorCode::GenerationTimeout);
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.code().reason(), "backend-timeout");
    }

    #[test]
    fn test_malformed_generation_reason() {
        let err = AppError::MalformedGeneration {
            message: "not json".into(),
        };
        assert_eq!(err.code().reason(), "malformed generation output");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Empty query".into(),
            field: Some("query".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_knowledge_base_error_is_server_error() {
        let err = AppError::KnowledgeBaseSchema {
            path: "categories.json".into(),
            message: "expected object".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
