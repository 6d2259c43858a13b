//! Error types for the service container and the layered service chain.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Dependency injection errors
///
/// Raised while registering, overriding or resolving services, and while
/// loading the application configuration.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifespan::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// match provider.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// Service not registered and not overridden
    #[error("Service not found: {0}")]
    NotFound(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Invalid lifetime resolution (e.g., scoped from root)
    #[error("Lifetime error: {0}")]
    WrongLifetime(&'static str),
    /// Configuration could not be loaded or holds an invalid value
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;

/// Errors produced while running a service's processing chain.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A stage that reads request data ran without a request context.
    #[error("unbound context: stage `{stage}` needs the current request")]
    UnboundContext { stage: &'static str },

    #[error(transparent)]
    Di(#[from] DiError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl IntoResponse for DiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "service resolution failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Di(e) => e.into_response(),
            other => {
                tracing::error!(error = %other, "service chain failed");
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()).into_response()
            }
        }
    }
}
