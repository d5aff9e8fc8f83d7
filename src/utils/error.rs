use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Refresh of {resource} failed: {source}")]
    Refresh {
        resource: &'static str,
        source: Arc<AppError>,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Cannot build a combined product without constituents")]
    EmptyGroup,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the failure came from the data source rather than local state.
    pub fn is_transport(&self) -> bool {
        match self {
            AppError::Transport(_) => true,
            AppError::Refresh { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_refresh_error_message() {
        let err = AppError::Refresh {
            resource: "products",
            source: Arc::new(AppError::Transport("connection reset".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Refresh of products failed: Transport error: connection reset"
        );
        assert!(err.is_transport());
    }

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound {
            resource: "product 42".to_string(),
        };
        assert_eq!(err.to_string(), "Not found: product 42");
        assert!(!err.is_transport());
    }
}
