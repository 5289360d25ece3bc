//! Domain types shared by the transport and the session state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role as reported by the backend
///
/// The backend sends a bare string. Known values map to dedicated variants;
/// anything else is kept verbatim so a newer backend never breaks login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Regular marketplace user
    #[default]
    User,
    /// Administrator
    Admin,
    /// Any other role string
    Other(String),
}

impl Role {
    /// The wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Other(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "USER" => Role::User,
            "ADMIN" => Role::Admin,
            _ => Role::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bearer token and role issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Opaque bearer token
    pub token: String,
    /// Role of the authenticated account
    pub role: Role,
}

impl Credential {
    /// Create a credential
    pub fn new(token: impl Into<String>, role: impl Into<Role>) -> Self {
        Self {
            token: token.into(),
            role: role.into(),
        }
    }
}

/// Cached profile of the signed-in user
///
/// Built locally after login or registration. Server profile data
/// supersedes it whenever the profile screen fetches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name, unknown after a plain login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address
    pub email: String,
    /// Role of the account
    pub role: Role,
}

impl UserProfile {
    /// Profile stub after login: only the email and role are known
    pub fn from_login(email: impl Into<String>, role: Role) -> Self {
        Self {
            name: None,
            email: email.into(),
            role,
        }
    }

    /// Profile stub after registration
    pub fn from_registration(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
            role,
        }
    }
}

/// Login form input, sent as the `/auth/login` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

impl LoginCredentials {
    /// Create login credentials
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// A file picked by the user for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// File name reported to the backend
    pub file_name: String,
    /// MIME type (e.g., "image/jpeg")
    pub mime_type: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Create an upload with an explicit MIME type
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Create a JPEG upload
    pub fn jpeg(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, "image/jpeg", bytes)
    }
}

/// Identity documents attached to a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationImages {
    /// Front of the ID card
    pub id_front: ImageUpload,
    /// Back of the ID card
    pub id_back: ImageUpload,
    /// Selfie holding the ID
    pub selfie: ImageUpload,
}

/// Registration form input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
    /// Phone number
    pub contact_number: String,
    /// Optional identity documents; switches the request to multipart
    #[serde(skip)]
    pub images: Option<RegistrationImages>,
}

impl RegistrationData {
    /// Create registration input without identity documents
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        contact_number: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            contact_number: contact_number.into(),
            images: None,
        }
    }

    /// Attach identity documents
    pub fn with_images(mut self, images: RegistrationImages) -> Self {
        self.images = Some(images);
        self
    }
}

/// Generic `{message}` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message from the backend
    pub message: String,
}

/// Response to a forgot-password request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgotPasswordResponse {
    /// Message from the backend
    pub message: String,
    /// Email the OTP was sent to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_known_values() {
        assert_eq!(Role::from("USER"), Role::User);
        assert_eq!(Role::from("ADMIN"), Role::Admin);
        assert_eq!(Role::from("SELLER"), Role::Other("SELLER".to_string()));
        assert_eq!(Role::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn test_role_serializes_as_bare_string() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"USER\"");
        let role: Role = serde_json::from_str("\"MODERATOR\"").unwrap();
        assert_eq!(role.as_str(), "MODERATOR");
    }

    #[test]
    fn test_user_profile_round_trip() {
        let profile = UserProfile::from_registration("Ada", "ada@example.com", Role::User);
        let json = serde_json::to_string(&profile).unwrap();
        let parsed: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn test_login_profile_omits_name() {
        let profile = UserProfile::from_login("a@b.com", Role::User);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json, serde_json::json!({"email": "a@b.com", "role": "USER"}));
    }

    #[test]
    fn test_registration_body_uses_camel_case() {
        let data = RegistrationData::new("Ada", "ada@example.com", "secret12", "+15550100")
            .with_images(RegistrationImages {
                id_front: ImageUpload::jpeg("front.jpg", vec![1]),
                id_back: ImageUpload::jpeg("back.jpg", vec![2]),
                selfie: ImageUpload::jpeg("selfie.jpg", vec![3]),
            });

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["contactNumber"], "+15550100");
        assert!(json.get("images").is_none());
    }
}
