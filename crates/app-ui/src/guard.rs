//! Auth-gated router guard
//!
//! Keeps signed-out users off protected screens and signed-in users out of
//! the sign-in flow. The session may publish the same signed-out state many
//! times (a 401 followed by a failed restore, for instance); the guard
//! redirects to [`Route::Login`] once per signed-out episode and stays quiet
//! until the session is authenticated again.
//!
//! Episodes are told apart by [`SessionState::auth_epoch`], so a sign-in the
//! guard never saw (a watch channel keeps only the latest value) still opens
//! a new episode.

use app_state::SessionState;
use tokio::sync::watch;

use crate::navigation::{NavigationStack, Route};

/// What the UI should do with the current route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session is still resolving; render nothing
    Suspend,
    /// Show the current route
    Render,
    /// Leave the current route for this one
    Redirect(Route),
}

/// Something that can be redirected by the guard
pub trait Navigator {
    /// Route currently on screen
    fn current_route(&self) -> &Route;

    /// Replace whatever is on screen with `route`
    fn redirect(&mut self, route: Route);
}

impl Navigator for NavigationStack {
    fn current_route(&self) -> &Route {
        self.current()
    }

    /// Redirects discard history so back cannot return to a guarded screen.
    fn redirect(&mut self, route: Route) {
        self.reset(route);
    }
}

/// Auth guard with a one-shot redirect latch
#[derive(Debug, Default)]
pub struct AuthGuard {
    /// Epoch of the signed-out episode the login redirect was issued in
    latched_at: Option<u64>,
}

impl AuthGuard {
    /// Create a guard that has not redirected yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a login redirect has been issued in the current episode
    pub fn is_latched(&self) -> bool {
        self.latched_at.is_some()
    }

    /// Decide what to do with `route` under `state`
    ///
    /// A protected route seen again after the login redirect has fired is
    /// suspended rather than redirected a second time.
    pub fn observe(&mut self, state: &SessionState, route: &Route) -> GuardDecision {
        let new_episode = self.latched_at.is_some_and(|epoch| epoch != state.auth_epoch);
        if state.is_authenticated || new_episode {
            self.latched_at = None;
        }

        if state.is_loading || !state.is_initialized {
            return GuardDecision::Suspend;
        }

        if state.is_authenticated {
            if route.is_auth_flow() {
                return GuardDecision::Redirect(Route::Home);
            }
            return GuardDecision::Render;
        }

        if !route.requires_auth() {
            return GuardDecision::Render;
        }

        if self.latched_at.is_some() {
            return GuardDecision::Suspend;
        }

        self.latched_at = Some(state.auth_epoch);
        tracing::debug!(from = %route.to_path(), "redirecting signed-out session to login");
        GuardDecision::Redirect(Route::Login)
    }

    /// Apply the guard to `navigator` once
    pub fn apply<N: Navigator>(
        &mut self,
        state: &SessionState,
        navigator: &mut N,
    ) -> GuardDecision {
        let decision = self.observe(state, navigator.current_route());
        if let GuardDecision::Redirect(target) = &decision {
            navigator.redirect(target.clone());
        }
        decision
    }

    /// Run the guard for every published session state
    ///
    /// Returns the navigator once the session store is dropped.
    pub async fn drive<N: Navigator>(
        mut self,
        mut session: watch::Receiver<SessionState>,
        mut navigator: N,
    ) -> N {
        loop {
            let state = session.borrow_and_update().clone();
            self.apply(&state, &mut navigator);

            if session.changed().await.is_err() {
                tracing::debug!("session closed, stopping auth guard");
                return navigator;
            }
        }
    }
}
