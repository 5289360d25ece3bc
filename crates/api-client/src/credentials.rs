//! Persisted credential store
//!
//! Wraps a [`SecureStore`] with the three keys the session core owns:
//! the bearer token, the role, and the cached user profile. Token and role
//! are independent entries that must be present together; a half-written
//! pair is treated as signed out and cleared on the next read.

use std::sync::Arc;

use storage::{KvError, SecureStore};

use crate::types::{Credential, Role, UserProfile};

/// Keys the credential store writes
pub struct CredentialKeys;

impl CredentialKeys {
    /// Bearer token
    pub const TOKEN: &'static str = "auth_token";
    /// Role string
    pub const ROLE: &'static str = "user_role";
    /// JSON-serialized [`UserProfile`]
    pub const USER: &'static str = "user_data";

    /// Every key, in removal order
    pub const ALL: [&'static str; 3] = [Self::TOKEN, Self::ROLE, Self::USER];
}

/// What a previous run left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    /// Token and role
    pub credential: Credential,
    /// Cached profile, if one was stored and still parses
    pub user: Option<UserProfile>,
}

/// Handle to the persisted credentials
///
/// Cheap to clone; all clones share the same backing store.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn SecureStore>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Wrap a backend
    pub fn new(store: impl SecureStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Wrap an already shared backend
    pub fn from_shared(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// Read a key, returning `None` on any storage error
    pub fn get(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read from credential store");
                None
            }
        }
    }

    /// Write several entries at once
    pub fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), KvError> {
        self.store.set_many(entries).inspect_err(|e| {
            tracing::warn!(error = %e, "failed to write to credential store");
        })
    }

    /// Remove several keys, logging instead of failing
    pub fn remove_many(&self, keys: &[&str]) {
        let _ = self.try_remove_many(keys);
    }

    fn try_remove_many(&self, keys: &[&str]) -> Result<(), KvError> {
        match self.store.remove_many(keys) {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(?keys, error = %e, "failed to remove from credential store");
                Err(e)
            }
        }
    }

    /// Stored bearer token
    pub fn get_token(&self) -> Option<String> {
        self.get(CredentialKeys::TOKEN)
    }

    /// Stored role
    pub fn get_role(&self) -> Option<Role> {
        self.get(CredentialKeys::ROLE).map(Role::from)
    }

    /// Cached user profile
    pub fn get_user(&self) -> Option<UserProfile> {
        let raw = self.get(CredentialKeys::USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable cached user");
                None
            }
        }
    }

    /// Persist token and role together
    pub fn store_credential(&self, credential: &Credential) -> Result<(), KvError> {
        self.set_many(&[
            (CredentialKeys::TOKEN, credential.token.as_str()),
            (CredentialKeys::ROLE, credential.role.as_str()),
        ])
    }

    /// Persist the cached user profile
    pub fn store_user(&self, user: &UserProfile) -> Result<(), KvError> {
        let json = serde_json::to_string(user)?;
        self.set_many(&[(CredentialKeys::USER, json.as_str())])
    }

    /// Drop token and role, ignoring errors
    ///
    /// Used when the backend reports the token as no longer valid.
    pub fn clear_credential(&self) {
        self.remove_many(&[CredentialKeys::TOKEN, CredentialKeys::ROLE]);
    }

    /// Drop token, role and cached user
    ///
    /// Every key is attempted; the error is returned so logout can report it.
    pub fn clear_all(&self) -> Result<(), KvError> {
        self.try_remove_many(&CredentialKeys::ALL)
    }

    /// Load what a previous run persisted
    ///
    /// Unlike the accessors above this propagates storage errors, so the
    /// caller can decide how to fall back. A token without a role (or the
    /// reverse) is cleared and reported as no session.
    pub fn load_session(&self) -> Result<Option<PersistedSession>, KvError> {
        let token = self.store.get(CredentialKeys::TOKEN)?;
        let role = self.store.get(CredentialKeys::ROLE)?;

        let credential = match (token, role) {
            (Some(token), Some(role)) => Credential::new(token, role),
            (None, None) => return Ok(None),
            (token, role) => {
                tracing::warn!(
                    has_token = token.is_some(),
                    has_role = role.is_some(),
                    "inconsistent stored credential, clearing"
                );
                self.store.remove_many(&CredentialKeys::ALL)?;
                return Ok(None);
            }
        };

        Ok(Some(PersistedSession {
            credential,
            user: self.get_user(),
        }))
    }
}
