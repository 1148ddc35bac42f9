use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Failure reported by a `CatalogStore` implementation.
///
/// `Unavailable` and `Schema` are the two classes the fallback policy reacts
/// to; everything else is returned to the caller as-is.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("schema mismatch: {0}")]
    Schema(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid data: {0}")]
    Validation(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("local data file error: {0}")]
    Io(String),
}

impl StoreError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Connectivity and schema-drift failures are served by the fallback store.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Schema(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream store error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Validation(ref message) => {
                tracing::debug!("Request validation failed: {}", message);
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
            }
            ApiError::Unauthorized(ref message) => {
                tracing::debug!("Unauthorized request: {}", message);
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message.clone())
            }
            ApiError::Forbidden(ref message) => {
                tracing::debug!("Forbidden request: {}", message);
                (StatusCode::FORBIDDEN, "FORBIDDEN", message.clone())
            }
            ApiError::NotFound(ref resource) => {
                tracing::debug!("Resource not found: {}", resource);
                (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{} not found", resource),
                )
            }
            ApiError::Conflict(ref message) => {
                tracing::debug!("Constraint conflict: {}", message);
                (StatusCode::CONFLICT, "CONFLICT", message.clone())
            }
            ApiError::Unavailable(ref err) => {
                tracing::error!("Catalog store unavailable: {}", err);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "Data store is temporarily unavailable".to_string(),
                )
            }
            ApiError::Upstream(ref err) => {
                tracing::error!("Hosted store error: {}", err);
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.clone())
            }
            ApiError::Internal(ref err) => {
                tracing::error!("Internal server error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(resource) => ApiError::NotFound(resource),
            StoreError::Conflict(message) => ApiError::Conflict(message),
            StoreError::Validation(message) => ApiError::Validation(message),
            StoreError::Unavailable(message) | StoreError::Schema(message) => {
                ApiError::Unavailable(message)
            }
            StoreError::Backend(message) => ApiError::Upstream(message),
            StoreError::Io(message) => {
                ApiError::Internal(anyhow::anyhow!("local data file error: {}", message))
            }
        }
    }
}

/// True when the error (or anything it wraps) is an I/O or TLS failure, or the
/// connection was already closed.
fn is_connectivity_failure(err: &tokio_postgres::Error) -> bool {
    if err.is_closed() {
        return true;
    }

    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if inner.is::<std::io::Error>() || inner.is::<native_tls::Error>() {
            return true;
        }
        source = inner.source();
    }
    false
}

// PostgreSQL error mapping
impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        let Some(code) = err.code() else {
            if is_connectivity_failure(&err) {
                tracing::warn!("PostgreSQL connectivity failure: {}", err);
                return StoreError::Unavailable(err.to_string());
            }
            tracing::error!("PostgreSQL client error: {}", err);
            return StoreError::Backend(err.to_string());
        };

        // Class 08: connection exception
        if code.code().starts_with("08") {
            tracing::warn!("PostgreSQL connection error: {}", err);
            return StoreError::Unavailable(err.to_string());
        }

        match code {
            &SqlState::ADMIN_SHUTDOWN
            | &SqlState::CANNOT_CONNECT_NOW
            | &SqlState::TOO_MANY_CONNECTIONS => {
                tracing::warn!("PostgreSQL refused the connection: {}", err);
                StoreError::Unavailable(err.to_string())
            }
            &SqlState::UNDEFINED_TABLE
            | &SqlState::UNDEFINED_COLUMN
            | &SqlState::UNDEFINED_FUNCTION
            | &SqlState::INVALID_SCHEMA_NAME => {
                tracing::warn!("Hosted schema does not match: {}", err);
                StoreError::Schema(err.to_string())
            }
            &SqlState::UNIQUE_VIOLATION => {
                let detail = err.to_string();
                let message = if detail.contains("slug") {
                    "Slug already exists".to_string()
                } else if detail.contains("email") {
                    "Email address already exists".to_string()
                } else if detail.contains("username") {
                    "Username already exists".to_string()
                } else {
                    "Resource already exists".to_string()
                };
                StoreError::Conflict(message)
            }
            &SqlState::FOREIGN_KEY_VIOLATION => {
                StoreError::Validation("Referenced resource does not exist".to_string())
            }
            &SqlState::NOT_NULL_VIOLATION => {
                StoreError::Validation("Required field is missing".to_string())
            }
            &SqlState::CHECK_VIOLATION => {
                StoreError::Validation("Data validation constraint violated".to_string())
            }
            &SqlState::INVALID_TEXT_REPRESENTATION => {
                StoreError::Validation("Invalid data format provided".to_string())
            }
            &SqlState::NUMERIC_VALUE_OUT_OF_RANGE => {
                StoreError::Validation("Numeric value is out of range".to_string())
            }
            &SqlState::STRING_DATA_RIGHT_TRUNCATION => {
                StoreError::Validation("Text data exceeds maximum length".to_string())
            }
            _ => {
                tracing::error!("Unhandled PostgreSQL error: {} (code: {:?})", err, err.code());
                StoreError::Backend(format!("Hosted store operation failed: {}", err))
            }
        }
    }
}

// Connection pool error mapping
impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Backend(inner) => StoreError::from(inner),
            deadpool_postgres::PoolError::Timeout(_) => {
                tracing::warn!("Database connection pool timeout: {}", err);
                StoreError::Unavailable("Database connection timeout".to_string())
            }
            deadpool_postgres::PoolError::Closed => {
                tracing::error!("Database connection pool is closed: {}", err);
                StoreError::Unavailable("Database connection pool closed".to_string())
            }
            deadpool_postgres::PoolError::NoRuntimeSpecified => {
                tracing::error!("Database pool runtime error: {}", err);
                StoreError::Backend("Database pool misconfigured".to_string())
            }
            _ => {
                tracing::error!("Database connection pool error: {}", err);
                StoreError::Unavailable("Database connection unavailable".to_string())
            }
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Io(format!("serialization failed: {}", err))
    }
}

// Result type alias for convenience
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_eligibility() {
        assert!(StoreError::Unavailable("down".into()).is_fallback_eligible());
        assert!(StoreError::Schema("no column".into()).is_fallback_eligible());
        assert!(!StoreError::not_found("Skill").is_fallback_eligible());
        assert!(!StoreError::conflict("slug").is_fallback_eligible());
        assert!(!StoreError::Backend("boom".into()).is_fallback_eligible());
        assert!(!StoreError::Io("disk".into()).is_fallback_eligible());
    }

    #[test]
    fn test_store_error_to_api_error() {
        assert!(matches!(
            ApiError::from(StoreError::not_found("Skill")),
            ApiError::NotFound(ref r) if r == "Skill"
        ));
        assert!(matches!(
            ApiError::from(StoreError::conflict("Slug already exists")),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Schema("x".into())),
            ApiError::Unavailable(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Backend("x".into())),
            ApiError::Upstream(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Io("x".into())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (ApiError::validation("bad"), StatusCode::BAD_REQUEST),
            (ApiError::unauthorized("no token"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("role"), StatusCode::FORBIDDEN),
            (ApiError::not_found("Skill"), StatusCode::NOT_FOUND),
            (ApiError::conflict("slug"), StatusCode::CONFLICT),
            (ApiError::Unavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::Upstream("boom".into()), StatusCode::BAD_GATEWAY),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let err = StoreError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(matches!(err, StoreError::Io(ref m) if m.contains("disk full")));
    }
}
