//! Session state machine
//!
//! [`SessionStore`] is the single source of truth for whether the user is
//! signed in. It drives the [`AuthBackend`] and the [`CredentialStore`] and
//! publishes every transition through a `tokio::sync::watch` channel so the
//! UI and the router guard can react to it.
//!
//! ```text
//! Uninitialized -> Loading -> Authenticated | Unauthenticated
//! Authenticated --logout--> Unauthenticated
//! Unauthenticated --login/register--> Authenticated
//! ```
//!
//! Operations are not serialized against each other. If two run at once the
//! last one to finish decides the published state.

use api_client::validation;
use api_client::{
    AuthBackend, CredentialStore, Error, LoginCredentials, PersistedSession, RegistrationData,
    Result, Role, UserProfile,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::KvError;
use tokio::sync::watch;

/// Coarse session phase derived from [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Persisted credentials have not been read yet
    Uninitialized,
    /// An operation is in flight
    Loading,
    /// Signed in
    Authenticated,
    /// Signed out
    Unauthenticated,
}

/// Observable session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Whether a credential is active
    pub is_authenticated: bool,
    /// Whether an operation is in flight
    pub is_loading: bool,
    /// Cached profile of the signed-in user
    pub user: Option<UserProfile>,
    /// Role of the signed-in user
    pub role: Option<Role>,
    /// Last error, shown until cleared
    pub error: Option<String>,
    /// Whether `initialize` has completed
    pub is_initialized: bool,
    /// Number of times the session has become authenticated
    ///
    /// Observers that may miss intermediate states can compare epochs to
    /// tell that a sign-in happened in between.
    #[serde(default)]
    pub auth_epoch: u64,
}

impl SessionState {
    /// The state before persisted credentials have been read
    pub fn unknown() -> Self {
        Self {
            is_authenticated: false,
            is_loading: true,
            user: None,
            role: None,
            error: None,
            is_initialized: false,
            auth_epoch: 0,
        }
    }

    /// Current phase
    ///
    /// `Uninitialized` takes precedence: a login started before
    /// `initialize` reports `Uninitialized` until it completes.
    pub fn phase(&self) -> SessionPhase {
        if !self.is_initialized {
            SessionPhase::Uninitialized
        } else if self.is_loading {
            SessionPhase::Loading
        } else if self.is_authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }

    fn authenticate(&mut self, role: Role, user: Option<UserProfile>) {
        self.is_authenticated = true;
        self.auth_epoch += 1;
        self.role = Some(role);
        self.user = user;
        self.error = None;
    }

    fn sign_out(&mut self, error: Option<String>) {
        self.is_authenticated = false;
        self.user = None;
        self.role = None;
        self.error = error;
    }

    fn finish(&mut self) {
        self.is_loading = false;
        self.is_initialized = true;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Session state machine
///
/// Construct one per process and hand clones to whoever needs it; clones
/// share state and subscribers.
///
/// # Example
///
/// ```rust,no_run
/// use api_client::{ApiClientConfig, AuthService, CredentialStore, LoginCredentials};
/// use app_state::session::SessionStore;
/// use std::sync::Arc;
/// use storage::{KvConfig, KvStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let credentials = CredentialStore::new(KvStore::new(KvConfig::new("session.db"))?);
///     let auth = AuthService::new(ApiClientConfig::default(), credentials.clone())?;
///     let session = SessionStore::new(Arc::new(auth), credentials);
///
///     session.initialize();
///     if !session.snapshot().is_authenticated {
///         session.login(LoginCredentials::new("a@b.com", "secret12")).await?;
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    credentials: CredentialStore,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    /// Create a store in the unknown state
    pub fn new(backend: Arc<dyn AuthBackend>, credentials: CredentialStore) -> Self {
        let (state, _) = watch::channel(SessionState::unknown());
        Self {
            backend,
            credentials,
            state: Arc::new(state),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every future transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve the unknown state from persisted credentials
    ///
    /// Never fails: a storage error is logged and treated as signed out.
    pub fn initialize(&self) {
        self.state.send_modify(|state| state.is_loading = true);

        let restored = match self.load_persisted() {
            Ok(Some(session)) => {
                self.backend.restore(&session.credential);
                let role = session.credential.role;
                // The stored role is authoritative over the cached profile's copy.
                let user = session.user.map(|user| UserProfile {
                    role: role.clone(),
                    ..user
                });
                Some((role, user))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted session, starting signed out");
                None
            }
        };

        tracing::debug!(authenticated = restored.is_some(), "session initialized");
        self.state.send_modify(|state| {
            match restored {
                Some((role, user)) => state.authenticate(role, user),
                None => state.sign_out(None),
            }
            state.finish();
        });
    }

    /// Sign in
    ///
    /// On failure the store is left signed out with `error` set, and the
    /// error is returned so the caller can alert immediately.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<UserProfile> {
        let credentials = LoginCredentials::new(credentials.email.trim(), credentials.password);

        self.begin();
        let result = match validation::validate_login(&credentials) {
            Ok(()) => {
                self.authenticate_with(self.backend.login(&credentials).await, |role| {
                    UserProfile::from_login(credentials.email.clone(), role)
                })
                .await
            }
            Err(e) => Err(e),
        };
        self.complete(result)
    }

    /// Create an account and sign in
    pub async fn register(&self, data: RegistrationData) -> Result<UserProfile> {
        let data = RegistrationData {
            name: data.name.trim().to_string(),
            email: data.email.trim().to_string(),
            ..data
        };

        self.begin();
        let result = match validation::validate_registration(&data) {
            Ok(()) => {
                self.authenticate_with(self.backend.register(&data).await, |role| {
                    UserProfile::from_registration(data.name.clone(), data.email.clone(), role)
                })
                .await
            }
            Err(e) => Err(e),
        };
        self.complete(result)
    }

    /// Sign out
    ///
    /// Always ends signed out. A cleanup failure is recorded in `error` but
    /// not returned.
    pub async fn logout(&self) {
        self.begin();

        let error = match self.backend.logout().await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(error = %e, "logout cleanup failed");
                Some(e.user_message())
            }
        };

        tracing::debug!("session ended");
        self.state.send_modify(|state| {
            state.sign_out(error);
            state.finish();
        });
    }

    /// Dismiss the current error
    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    fn load_persisted(&self) -> std::result::Result<Option<PersistedSession>, KvError> {
        self.credentials.load_session()
    }

    fn begin(&self) {
        self.state.send_modify(|state| state.is_loading = true);
    }

    async fn authenticate_with(
        &self,
        issued: Result<api_client::Credential>,
        profile: impl FnOnce(Role) -> UserProfile,
    ) -> Result<UserProfile> {
        let credential = issued?;
        let user = profile(credential.role);

        if let Err(e) = self.credentials.store_user(&user) {
            // Do not leave a token behind for a session we are reporting as failed.
            if let Err(cleanup) = self.backend.logout().await {
                tracing::error!(error = %cleanup, "could not roll back credential");
            }
            return Err(Error::Storage(e));
        }

        Ok(user)
    }

    fn complete(&self, result: Result<UserProfile>) -> Result<UserProfile> {
        match &result {
            Ok(user) => {
                tracing::debug!(role = %user.role, "session authenticated");
                let user = user.clone();
                self.state.send_modify(|state| {
                    state.authenticate(user.role.clone(), Some(user));
                    state.finish();
                });
            }
            Err(e) => {
                tracing::debug!(error = %e, "authentication failed");
                let message = e.user_message();
                self.state.send_modify(|state| {
                    state.sign_out(Some(message));
                    state.finish();
                });
            }
        }
        result
    }
}
