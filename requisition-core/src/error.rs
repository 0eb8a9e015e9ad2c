use thiserror::Error;

/// Error taxonomy shared by every dashboard crate.
///
/// Validation errors are blocking and never reach the network. API errors
/// carry the backend's normalized `message` field. Everything else is a
/// transport or infrastructure failure.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client-side validation failures, aggregated per form/session.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Validation error: {0}")]
    FieldValidation(#[from] validator::ValidationErrors),

    /// Server rejected the request; `message` is the backend's own message
    /// or a per-call fallback when the body carried none.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Client-side ownership guard tripped. The server remains the sole
    /// enforcement point; this only drives the access-denied page state.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A submit was attempted while another one was still in flight.
    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(anyhow::Error::new(err))
    }
}

impl AppError {
    /// Single-message validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::FieldValidation(_)
        )
    }

    /// Messages suitable for inline display next to a form.
    pub fn messages(&self) -> Vec<String> {
        match self {
            AppError::Validation(msgs) => msgs.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_aggregated() {
        let err = AppError::Validation(vec![
            "Item name is required".to_string(),
            "Quantity must be greater than zero".to_string(),
        ]);
        assert!(err.is_validation());
        assert_eq!(err.messages().len(), 2);
        assert_eq!(
            err.to_string(),
            "Validation failed: Item name is required; Quantity must be greater than zero"
        );
    }

    #[test]
    fn api_error_displays_server_message() {
        let err = AppError::Api {
            status: 409,
            message: "Requisition already reviewed".to_string(),
        };
        assert_eq!(err.to_string(), "Requisition already reviewed");
        assert!(!err.is_validation());
    }
}
