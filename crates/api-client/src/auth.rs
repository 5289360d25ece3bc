//! Authentication transport
//!
//! [`AuthService`] issues the login, registration and password-reset calls,
//! persists the issued credential, and keeps the client's bearer token in sync
//! with it. The session state machine only sees it through [`AuthBackend`].
//!
//! # Example
//!
//! ```rust,no_run
//! use api_client::{ApiClientConfig, AuthService, CredentialStore, LoginCredentials};
//! use storage::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = CredentialStore::new(MemoryStore::new());
//!     let auth = AuthService::new(ApiClientConfig::new("https://api.gemmarket.app"), credentials)?;
//!
//!     let credential = auth.login(&LoginCredentials::new("a@b.com", "secret12")).await?;
//!     println!("Signed in as {}", credential.role);
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::credentials::CredentialStore;
use crate::http::{ApiClient, ApiClientConfig, ApiRequest, MultipartForm};
use crate::types::{
    Credential, ForgotPasswordResponse, LoginCredentials, MessageResponse, RegistrationData, Role,
};
use crate::{validation, Error, Result};

/// Backend endpoints
pub mod endpoints {
    /// Login
    pub const LOGIN: &str = "/auth/login";
    /// Registration
    pub const REGISTER: &str = "/auth/register";
    /// Request a password reset OTP
    pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
    /// Reset password with an OTP
    pub const RESET_PASSWORD: &str = "/auth/reset-password";
}

/// Operations the session state machine needs from the transport
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Sign in and persist the issued credential
    async fn login(&self, credentials: &LoginCredentials) -> Result<Credential>;

    /// Create an account and persist the issued credential
    async fn register(&self, data: &RegistrationData) -> Result<Credential>;

    /// Forget the credential locally
    ///
    /// The bearer header is always dropped. An error only reports that the
    /// persisted entries could not be removed.
    async fn logout(&self) -> Result<()>;

    /// Re-attach a credential loaded from storage
    fn restore(&self, credential: &Credential);
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    role: Role,
}

/// The shapes `/auth/register` has answered with over time
///
/// Variants are tried in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawRegisterResponse {
    /// `{message, token, role}`
    MessageTokenRole {
        /// Confirmation message
        message: String,
        /// Issued token
        token: String,
        /// Account role
        #[serde(default)]
        role: Option<Role>,
    },
    /// `{token, role}`
    TokenRole {
        /// Issued token
        token: String,
        /// Account role
        #[serde(default)]
        role: Option<Role>,
    },
    /// `{message}` alone, with an optional role
    MessageOnly {
        /// Confirmation message
        message: String,
        /// Account role
        #[serde(default)]
        role: Option<Role>,
    },
}

fn success_regex() -> &'static Regex {
    static SUCCESS_REGEX: OnceLock<Regex> = OnceLock::new();
    // "unsuccessful" has no word boundary before "success"
    SUCCESS_REGEX.get_or_init(|| Regex::new(r"(?i)\bsuccess").unwrap())
}

impl RawRegisterResponse {
    /// Produce the canonical credential
    ///
    /// A message-only answer that reports success yields a temporary token so
    /// the new user can continue into the app; any other message-only answer
    /// is a rejection.
    pub fn normalize(self) -> Result<Credential> {
        match self {
            RawRegisterResponse::MessageTokenRole { token, role, .. }
            | RawRegisterResponse::TokenRole { token, role } => {
                Ok(Credential {
                    token,
                    role: role.unwrap_or_default(),
                })
            }
            RawRegisterResponse::MessageOnly { message, role } => {
                if success_regex().is_match(&message) {
                    let token = format!("temp_token_{}", Utc::now().timestamp_millis());
                    Ok(Credential {
                        token,
                        role: role.unwrap_or_default(),
                    })
                } else {
                    Err(Error::Auth {
                        status: 200,
                        message,
                    })
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ForgotPasswordRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest<'a> {
    email: &'a str,
    otp: &'a str,
    new_password: &'a str,
}

/// Authentication transport over the marketplace API
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
    credentials: CredentialStore,
}

impl AuthService {
    /// Create the service and its API client
    ///
    /// The client is wired to clear `credentials` on any 401 answer.
    pub fn new(config: ApiClientConfig, credentials: CredentialStore) -> Result<Self> {
        let client = ApiClient::new(config)?.with_credential_store(credentials.clone());
        Ok(Self {
            client,
            credentials,
        })
    }

    /// The API client, for the rest of the app's requests
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The credential store this service persists into
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Sign in with email and password
    ///
    /// # Errors
    ///
    /// - `Error::Auth` - backend rejected the credentials
    /// - `Error::Network` - backend unreachable
    /// - `Error::Storage` - credential could not be persisted; the client
    ///   stays unauthenticated
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Credential> {
        let response = self
            .client
            .post_json::<_, LoginResponse>(endpoints::LOGIN, credentials)
            .await?;

        let credential = Credential {
            token: response.data.token,
            role: response.data.role,
        };
        self.establish(credential)
    }

    /// Create an account
    ///
    /// With identity images the request is sent as multipart form data under
    /// the upload timeout.
    pub async fn register(&self, data: &RegistrationData) -> Result<Credential> {
        let request = match &data.images {
            Some(images) => ApiRequest::post(endpoints::REGISTER).multipart(
                MultipartForm::new()
                    .text("name", &data.name)
                    .text("email", &data.email)
                    .text("password", &data.password)
                    .text("contactNumber", &data.contact_number)
                    .file(
                        "idFrontImage",
                        &images.id_front.file_name,
                        &images.id_front.mime_type,
                        images.id_front.bytes.clone(),
                    )
                    .file(
                        "idBackImage",
                        &images.id_back.file_name,
                        &images.id_back.mime_type,
                        images.id_back.bytes.clone(),
                    )
                    .file(
                        "selfieImage",
                        &images.selfie.file_name,
                        &images.selfie.mime_type,
                        images.selfie.bytes.clone(),
                    ),
            ),
            None => ApiRequest::post(endpoints::REGISTER)
                .json_body(data)
                .map_err(|e| Error::InvalidResponse(format!("Failed to encode body: {}", e)))?,
        };

        let response = self.client.send::<RawRegisterResponse>(request).await?;
        let credential = response.data.normalize()?;
        self.establish(credential)
    }

    /// Forget the credential locally
    pub async fn logout(&self) -> Result<()> {
        self.client.clear_auth_token();
        self.credentials.clear_all()?;
        tracing::debug!("signed out");
        Ok(())
    }

    /// Ask the backend to email a password reset code
    pub async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordResponse> {
        validation::validate_email(email)?;

        let response = self
            .client
            .post_json::<_, ForgotPasswordResponse>(
                endpoints::FORGOT_PASSWORD,
                &ForgotPasswordRequest { email: email.trim() },
            )
            .await?;
        Ok(response.data)
    }

    /// Set a new password using the emailed code
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<MessageResponse> {
        validation::validate_reset(email, otp, new_password)?;

        let body = ResetPasswordRequest {
            email: email.trim(),
            otp: otp.trim(),
            new_password,
        };
        let response = self
            .client
            .post_json::<_, MessageResponse>(endpoints::RESET_PASSWORD, &body)
            .await?;
        Ok(response.data)
    }

    /// Re-attach a credential loaded from storage
    pub fn restore(&self, credential: &Credential) {
        self.client.set_auth_token(&credential.token);
    }

    fn establish(&self, credential: Credential) -> Result<Credential> {
        self.credentials.store_credential(&credential)?;
        self.client.set_auth_token(&credential.token);
        tracing::debug!(role = %credential.role, "credential established");
        Ok(credential)
    }
}

#[async_trait]
impl AuthBackend for AuthService {
    async fn login(&self, credentials: &LoginCredentials) -> Result<Credential> {
        AuthService::login(self, credentials).await
    }

    async fn register(&self, data: &RegistrationData) -> Result<Credential> {
        AuthService::register(self, data).await
    }

    async fn logout(&self) -> Result<()> {
        AuthService::logout(self).await
    }

    fn restore(&self, credential: &Credential) {
        AuthService::restore(self, credential)
    }
}
