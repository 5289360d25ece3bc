//! Gem Market API client
//!
//! This crate provides the HTTP client for the marketplace backend, the
//! persisted credential store, and the authentication transport used by the
//! session state machine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod credentials;
pub mod http;
pub mod types;
pub mod validation;

pub use auth::{AuthBackend, AuthService, RawRegisterResponse};
pub use credentials::{CredentialKeys, CredentialStore, PersistedSession};
pub use http::{ApiClient, ApiClientConfig, ApiError};
pub use types::{Credential, LoginCredentials, RegistrationData, Role, UserProfile};

use storage::KvError;

/// Result type for API client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown to users when the backend could not be reached
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// Error types for authentication and API operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input rejected before any request was made
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Backend unreachable or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Backend rejected the request
    #[error("Authentication error ({status}): {message}")]
    Auth {
        /// HTTP status code
        status: u16,
        /// Message from the backend payload, or a generic fallback
        message: String,
    },

    /// Local persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] KvError),

    /// Backend answered with a body we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Text suitable for an alert or inline error banner
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(message) => message.clone(),
            Error::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Error::Auth { message, .. } => message.clone(),
            Error::Storage(_) => "Could not save your session on this device.".to_string(),
            Error::InvalidResponse(_) => "Unexpected response from server.".to_string(),
        }
    }

    /// Whether the backend answered 401
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Auth { status: 401, .. })
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        if err.is_network_error() {
            Error::Network(err.message().to_string())
        } else if err.status() == 0 {
            Error::InvalidResponse(err.message().to_string())
        } else {
            Error::Auth {
                status: err.status(),
                message: err.message().to_string(),
            }
        }
    }
}
