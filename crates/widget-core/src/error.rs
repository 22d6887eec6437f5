//! Error Types

use thiserror::Error;

/// Result type alias for widget operations
pub type Result<T> = std::result::Result<T, WidgetError>;

/// Result type alias for calls against the billing and weather APIs
pub type RequestResult<T> = std::result::Result<T, RequestError>;

/// Why an HTTP call against one of the integrations failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// The API answered, but not with the one status the call accepts
    #[error("unexpected status {0}")]
    Status(u16),

    /// Connection, TLS or timeout failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// The body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(String),
}

/// A failed call against the billing or weather API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{endpoint}: {failure}")]
pub struct RequestError {
    /// Method and path, e.g. `GET /v1/direct_charge`
    pub endpoint: String,
    pub failure: RequestFailure,
}

impl RequestError {
    pub fn status(endpoint: impl Into<String>, status: u16) -> Self {
        Self {
            endpoint: endpoint.into(),
            failure: RequestFailure::Status(status),
        }
    }

    pub fn transport(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            endpoint: endpoint.into(),
            failure: RequestFailure::Transport(reason.to_string()),
        }
    }

    pub fn decode(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            endpoint: endpoint.into(),
            failure: RequestFailure::Decode(reason.to_string()),
        }
    }
}

/// Identity provider rejection, as reported by the identity SDK callback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The operator is not signed in
    #[error("operator is not signed in")]
    Unauthorized,

    /// The operator signed in, but the app is installed on another account
    #[error("access denied")]
    AccessDenied,

    #[error("identity provider error: {0}")]
    Other(String),
}

/// Widget error types
#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("Request failed: {0}")]
    Request(#[from] RequestError),

    #[error("Authorization failed: {0}")]
    Auth(#[from] AuthError),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WidgetError {
    /// Convert to a message suitable for the operator
    pub fn user_message(&self) -> String {
        match self {
            WidgetError::Request(err) if err.endpoint.contains("direct_charge") => {
                "The billing service could not complete the request. Please try again.".into()
            }
            WidgetError::Request(_) => "The weather service is currently unavailable.".into(),
            WidgetError::Auth(AuthError::Unauthorized) => "Please sign in with your LiveChat account.".into(),
            WidgetError::Auth(AuthError::AccessDenied) => "Access denied.".into(),
            WidgetError::Config(_) => "The widget is not configured correctly.".into(),
            _ => "Something went wrong.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display() {
        let err = RequestError::status("POST /v1/direct_charge", 422);
        assert_eq!(err.to_string(), "POST /v1/direct_charge: unexpected status 422");
    }

    #[test]
    fn test_user_message_for_config_and_auth() {
        let config = WidgetError::Config("invalid billing API URL".into());
        assert_eq!(config.user_message(), "The widget is not configured correctly.");
        assert_eq!(WidgetError::from(AuthError::AccessDenied).user_message(), "Access denied.");
    }

    #[test]
    fn test_user_message_by_integration() {
        let billing = WidgetError::from(RequestError::status("GET /v1/direct_charge", 500));
        assert!(billing.user_message().contains("billing"));

        let weather = WidgetError::from(RequestError::status("GET /weather", 500));
        assert!(weather.user_message().contains("weather"));
    }
}
