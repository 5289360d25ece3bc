//! HTTP client for the marketplace REST API
//!
//! This module provides request/response types, error classification, and the
//! shared client that attaches the bearer token to every outgoing request.
//! Any 401 answer clears the stored credential before the error is returned
//! to the caller.

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::credentials::CredentialStore;

// =============================================================================
// Error Types
// =============================================================================

/// HTTP error with status and message
///
/// Status `1` means no response was received (connection failure or timeout);
/// status `0` means the request could not be built or the body not decoded.
///
/// # Examples
/// ```
/// use api_client::http::ApiError;
///
/// let error = ApiError::new(404, "NotFound", "Listing not found");
/// assert_eq!(error.status(), 404);
/// assert!(!error.is_network_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code
    status: u16,
    /// Error code (e.g., "Unauthorized", "NetworkError")
    error: String,
    /// Human-readable error message
    message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
        }
    }

    /// No response was received
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(1, "NetworkError", message)
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the error code
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the backend could not be reached or a gateway gave up
    pub fn is_network_error(&self) -> bool {
        matches!(self.status, 1 | 408 | 502 | 503 | 504 | 522 | 524)
    }

    /// Whether the backend rejected the bearer token
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API error {}: {} - {}", self.status, self.error, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error body the backend sends with 4xx/5xx answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error message
    #[serde(default)]
    pub message: Option<String>,
    /// Error code, sent by some endpoints instead of a message
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
}

impl HttpMethod {
    /// Method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A file part of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name
    pub field: String,
    /// File name reported to the server
    pub file_name: String,
    /// MIME type
    pub mime_type: String,
    /// Contents
    pub bytes: Vec<u8>,
}

/// A multipart/form-data body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    /// Text fields in insertion order
    pub fields: Vec<(String, String)>,
    /// File fields in insertion order
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    /// Create an empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add a file field
    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.files.push(FilePart {
            field: field.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        });
        self
    }

    fn into_reqwest(self) -> Result<reqwest::multipart::Form, ApiError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for file in self.files {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime_type)
                .map_err(|e| {
                    ApiError::new(0, "InvalidRequest", format!("Invalid MIME type: {}", e))
                })?;
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Serialized JSON
    Json(Vec<u8>),
    /// Multipart form data, sent with the upload timeout
    Multipart(MultipartForm),
}

/// An API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the base URL (e.g., "/auth/login")
    pub path: String,
    /// Request body
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Create a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Set the request body from JSON
    pub fn json_body<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(RequestBody::Json(serde_json::to_vec(value)?));
        Ok(self)
    }

    /// Set a multipart body
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    /// Whether this request carries an upload
    pub fn is_upload(&self) -> bool {
        matches!(self.body, Some(RequestBody::Multipart(_)))
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// API response with decoded data
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Response data
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Create a new response
    pub fn new(status: u16, data: T) -> Self {
        Self { status, data }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the backend (e.g., "https://api.gemmarket.app")
    pub base_url: String,
    /// Timeout for JSON requests
    pub timeout: Duration,
    /// Timeout for multipart uploads
    pub upload_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.gemmarket.app".to_string(),
            timeout: Duration::from_secs(10),
            upload_timeout: Duration::from_secs(60),
            user_agent: format!("GemMarket/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }
}

impl ApiClientConfig {
    /// Create a new config with a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the JSON request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the upload timeout
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Client
// =============================================================================

/// Listener invoked after a 401 answer has been handled
pub type UnauthorizedCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// HTTP client shared by every API call
///
/// Clones share the HTTP connection pool, the bearer token, the credential
/// store and the unauthorized listeners.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: ApiClientConfig,
    auth_token: Arc<RwLock<Option<String>>>,
    credentials: Option<CredentialStore>,
    unauthorized_listeners: Arc<RwLock<Vec<UnauthorizedCallback>>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("has_token", &self.auth_token.read().is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new client
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ApiError::new(0, "InvalidRequest", format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            auth_token: Arc::new(RwLock::new(None)),
            credentials: None,
            unauthorized_listeners: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Clear this store whenever the backend answers 401
    pub fn with_credential_store(mut self, credentials: CredentialStore) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Attach `Authorization: Bearer <token>` to subsequent requests
    pub fn set_auth_token(&self, token: impl Into<String>) {
        *self.auth_token.write() = Some(token.into());
    }

    /// Stop sending the `Authorization` header
    pub fn clear_auth_token(&self) {
        *self.auth_token.write() = None;
    }

    /// Current bearer token
    pub fn auth_token(&self) -> Option<String> {
        self.auth_token.read().clone()
    }

    /// Register a listener for 401 answers
    pub fn on_unauthorized(&self, callback: UnauthorizedCallback) {
        self.unauthorized_listeners.write().push(callback);
    }

    /// Send a request and decode the JSON response
    pub async fn send<T>(&self, request: ApiRequest) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let method = request.method;
        let path = request.path.clone();

        let result = self.execute_request(request).await;

        match &result {
            Ok(response) => {
                tracing::debug!(method = method.as_str(), %path, status = response.status, "request completed");
            }
            Err(err) => {
                tracing::debug!(method = method.as_str(), %path, error = %err, "request failed");
                if err.is_unauthorized() {
                    self.handle_unauthorized(err);
                }
            }
        }

        result
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path).json_body(body).map_err(|e| {
            ApiError::new(0, "InvalidRequest", format!("Failed to encode body: {}", e))
        })?;
        self.send(request).await
    }

    async fn execute_request<T>(&self, request: ApiRequest) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), request.path);

        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        if let Some(token) = self.auth_token() {
            req = req.bearer_auth(token);
        }

        let timeout = if request.is_upload() {
            self.config.upload_timeout
        } else {
            self.config.timeout
        };
        req = req.timeout(timeout);

        req = match request.body {
            Some(RequestBody::Json(bytes)) => {
                req.header(reqwest::header::CONTENT_TYPE, "application/json").body(bytes)
            }
            Some(RequestBody::Multipart(form)) => req.multipart(form.into_reqwest()?),
            None => req,
        };

        let response = req
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {}", e)))?;

        self.parse_response(response).await
    }

    async fn parse_response<T>(&self, response: reqwest::Response) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let status = response.status().as_u16();

        if !response.status().is_success() {
            let reason = response.status().canonical_reason().unwrap_or("Error").to_string();
            let error_body = response.text().await.unwrap_or_default();

            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|body| body.message.or(body.error))
                .unwrap_or_else(|| format!("Request failed with status {}", status));

            return Err(ApiError::new(status, reason, message));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response: {}", e)))?;

        let data: T = serde_json::from_str(&body)
            .map_err(|e| ApiError::new(0, "ParseError", format!("Failed to parse JSON: {}", e)))?;

        Ok(ApiResponse::new(status, data))
    }

    fn handle_unauthorized(&self, error: &ApiError) {
        tracing::warn!(message = error.message(), "backend rejected credentials, clearing session");

        self.clear_auth_token();
        if let Some(credentials) = &self.credentials {
            credentials.clear_credential();
        }

        let listeners = self.unauthorized_listeners.read().clone();
        for listener in listeners {
            listener(error);
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}
