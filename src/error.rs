/// Error Handling Module
///
/// Unified error handling for the token service:
/// 1. Domain-specific error types (validation, persistence, token, auth, issuance)
/// 2. `AppError` for authentication failures raised by the middleware
/// 3. HTTP response mapping with structured logging
/// 4. Error context enrichment for correlation

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request input
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField(String),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Persistence errors raised by the registry and subject directory backends
#[derive(Debug, Clone)]
pub enum DatabaseError {
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionPool(err.to_string())
            }
            sqlx::Error::Database(e) => DatabaseError::QueryExecution(e.message().to_string()),
            other => DatabaseError::UnexpectedError(other.to_string()),
        }
    }
}

/// Token encoding and decoding errors
#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    /// Claims could not be turned into a signed token
    Encoding(String),
    /// Signature mismatch or malformed structure
    Invalid(String),
    /// Structurally valid and correctly signed, but past `exp`
    Expired,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Encoding(msg) => write!(f, "{}", msg),
            TokenError::Invalid(msg) => write!(f, "Invalid token: {}", msg),
            TokenError::Expired => write!(f, "Token has expired"),
        }
    }
}

impl StdError for TokenError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Errors raised while authenticating a presented token
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    TokenInvalid,
    TokenExpired,
    TokenRevoked,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenRevoked => write!(f, "Token has been revoked"),
        }
    }
}

impl StdError for AuthError {}

/// Failures of the issuance, registration, revocation and listing operations.
///
/// Every variant maps to a fixed public reason; internal detail is only logged.
#[derive(Debug)]
pub enum IssuanceError {
    /// Permission or privilege-level check failed
    Forbidden(String),
    UnknownSubject(i64),
    Validation(ValidationError),
    Encoding(TokenError),
    /// Token claims name a different subject than the one it is registered under
    SubjectMismatch,
    NotRefreshable,
    RegistrationFailed,
    RevocationFailed,
    Persistence(DatabaseError),
}

pub const REASON_MANAGE_DENIED: &str = "You are not allowed to manage JWT tokens";
pub const REASON_ISSUE_DENIED: &str = "You are not allowed to generate JWT for this user";
pub const REASON_TARGET_DENIED: &str = "You are not allowed to manage JWT tokens for this user";
pub const REASON_REGISTRATION_FAILED: &str = "Failed to register JWT token";
pub const REASON_REVOCATION_FAILED: &str = "Failed to revoke JWT token";
pub const REASON_TOKEN_INVALID: &str = "Token is no longer valid";
pub const REASON_TOKEN_REVOKED: &str = "Token has been revoked";

impl IssuanceError {
    /// Reason string safe to hand back to the caller
    pub fn public_reason(&self) -> String {
        match self {
            IssuanceError::Forbidden(reason) => reason.clone(),
            IssuanceError::UnknownSubject(_) => "Subject not found".to_string(),
            IssuanceError::Validation(e) => e.to_string(),
            IssuanceError::Encoding(TokenError::Encoding(msg)) => msg.clone(),
            IssuanceError::Encoding(_) => REASON_TOKEN_INVALID.to_string(),
            IssuanceError::SubjectMismatch => "Token does not belong to this subject".to_string(),
            IssuanceError::NotRefreshable => "Token is not refreshable".to_string(),
            IssuanceError::RegistrationFailed => REASON_REGISTRATION_FAILED.to_string(),
            IssuanceError::RevocationFailed => REASON_REVOCATION_FAILED.to_string(),
            IssuanceError::Persistence(_) => {
                "Token storage temporarily unavailable".to_string()
            }
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            IssuanceError::Forbidden(_) => StatusCode::FORBIDDEN,
            IssuanceError::UnknownSubject(_) => StatusCode::NOT_FOUND,
            IssuanceError::Encoding(TokenError::Invalid(_) | TokenError::Expired) => {
                StatusCode::UNAUTHORIZED
            }
            IssuanceError::Validation(_)
            | IssuanceError::Encoding(_)
            | IssuanceError::SubjectMismatch
            | IssuanceError::NotRefreshable => StatusCode::BAD_REQUEST,
            // soft failures keep the AJAX contract: 200 with a failure body
            IssuanceError::RegistrationFailed | IssuanceError::RevocationFailed => StatusCode::OK,
            IssuanceError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for IssuanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssuanceError::UnknownSubject(id) => write!(f, "Subject {} not found", id),
            IssuanceError::Persistence(e) => write!(f, "{}", e),
            other => write!(f, "{}", other.public_reason()),
        }
    }
}

impl StdError for IssuanceError {}

impl From<ValidationError> for IssuanceError {
    fn from(err: ValidationError) -> Self {
        IssuanceError::Validation(err)
    }
}

impl From<TokenError> for IssuanceError {
    fn from(err: TokenError) -> Self {
        IssuanceError::Encoding(err)
    }
}

impl From<DatabaseError> for IssuanceError {
    fn from(err: DatabaseError) -> Self {
        IssuanceError::Persistence(err)
    }
}

/// ============================================================================
/// 2. AUTHENTICATION FAILURE TYPE
/// ============================================================================

/// Error raised by `JwtMiddleware` before a request reaches a handler
#[derive(Debug)]
pub enum AppError {
    Database(DatabaseError),
    Auth(AuthError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
        }
    }
}

impl StdError for AppError {}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (code, message) = match self {
            AppError::Database(_) => (
                "SERVICE_UNAVAILABLE",
                "Token storage temporarily unavailable",
            ),
            AppError::Auth(AuthError::MissingToken) => {
                ("MISSING_TOKEN", "Missing authentication token")
            }
            AppError::Auth(AuthError::TokenRevoked) => ("TOKEN_REVOKED", "Token has been revoked"),
            AppError::Auth(AuthError::TokenExpired | AuthError::TokenInvalid) => {
                ("TOKEN_INVALID", "Invalid or expired token")
            }
        };

        let status = self.status_code();
        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message.to_string(),
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Error context for enhanced logging and debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub subject_id: Option<i64>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            subject_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_subject_id(mut self, subject_id: i64) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    /// Log an issuance failure with its internal detail; the caller only sees the public reason
    pub fn log_issuance_error(&self, error: &IssuanceError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "subject_id": self.subject_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            IssuanceError::Persistence(_) => {
                tracing::error!(error = %error, context = ?context, "Token storage error");
            }
            IssuanceError::RegistrationFailed | IssuanceError::RevocationFailed => {
                tracing::warn!(error = %error, context = ?context, "Registry write failed");
            }
            IssuanceError::Forbidden(_) => {
                tracing::warn!(error = %error, context = ?context, "Token operation denied");
            }
            _ => {
                tracing::info!(error = %error, context = ?context, "Token operation rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("token".to_string());
        assert_eq!(err.to_string(), "token is empty");
    }

    #[test]
    fn test_app_error_status_codes() {
        let app_err: AppError = DatabaseError::ConnectionPool("down".to_string()).into();
        assert_eq!(app_err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = ErrorHandler::error_response(&app_err, "req-1");
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.message.contains("down"));

        let app_err = AppError::Auth(AuthError::TokenRevoked);
        assert_eq!(app_err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorHandler::error_response(&app_err, "req-2").1.code,
            "TOKEN_REVOKED"
        );
    }

    #[test]
    fn test_issuance_error_status_codes() {
        assert_eq!(
            IssuanceError::Forbidden(REASON_ISSUE_DENIED.to_string()).http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(IssuanceError::UnknownSubject(7).http_status(), StatusCode::NOT_FOUND);
        assert_eq!(IssuanceError::RevocationFailed.http_status(), StatusCode::OK);
        assert_eq!(
            IssuanceError::Encoding(TokenError::Expired).http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            IssuanceError::Encoding(TokenError::Encoding("bad".to_string())).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IssuanceError::Persistence(DatabaseError::ConnectionPool("down".to_string()))
                .http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_persistence_reason_hides_detail() {
        let err = IssuanceError::Persistence(DatabaseError::QueryExecution(
            "relation \"jwt_registry\" does not exist".to_string(),
        ));

        assert!(!err.public_reason().contains("jwt_registry"));
        assert!(err.to_string().contains("jwt_registry"));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("generate_token");
        assert_eq!(ctx.operation, "generate_token");
        assert!(ctx.subject_id.is_none());

        let ctx = ctx.with_subject_id(42);
        assert_eq!(ctx.subject_id, Some(42));
    }
}
