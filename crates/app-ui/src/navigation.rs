//! Navigation for Gem Market
//!
//! Route definitions and the navigation stack. The auth guard in
//! [`crate::guard`] decides which of these routes a session may see.

use serde::{Deserialize, Serialize};

// =============================================================================
// Route Definitions
// =============================================================================

/// All possible routes in the application
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "route", content = "params")]
pub enum Route {
    // Auth flow
    /// Sign in
    Login,
    /// Create an account
    Register,
    /// Request a password reset code
    ForgotPassword,
    /// Enter the reset code and a new password
    ResetPassword {
        /// Address the code was sent to
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },

    // Main tabs
    /// Landing screen after sign in
    #[default]
    Home,
    /// Browse listings
    Marketplace {
        /// Search query
        #[serde(skip_serializing_if = "Option::is_none")]
        q: Option<String>,
    },
    /// Single listing
    Listing {
        /// Listing id
        id: String,
    },
    /// Create a listing
    Sell,
    /// Bids placed by the user
    Bids,
    /// Conversation list
    Inbox,
    /// Single conversation
    Conversation {
        /// Conversation id
        id: String,
    },
    /// The signed-in user's profile
    Profile,

    // Public
    /// Help and contact
    Support,
    /// Unknown path
    NotFound,
}

impl Route {
    /// Convert route to URL path
    pub fn to_path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::ForgotPassword => "/forgot-password".to_string(),
            Route::ResetPassword { email } => match email {
                Some(email) => format!("/reset-password?email={}", urlencoding::encode(email)),
                None => "/reset-password".to_string(),
            },
            Route::Home => "/".to_string(),
            Route::Marketplace { q } => match q {
                Some(q) => format!("/marketplace?q={}", urlencoding::encode(q)),
                None => "/marketplace".to_string(),
            },
            Route::Listing { id } => format!("/listing/{}", urlencoding::encode(id)),
            Route::Sell => "/sell".to_string(),
            Route::Bids => "/bids".to_string(),
            Route::Inbox => "/inbox".to_string(),
            Route::Conversation { id } => format!("/inbox/{}", urlencoding::encode(id)),
            Route::Profile => "/profile".to_string(),
            Route::Support => "/support".to_string(),
            Route::NotFound => "/not-found".to_string(),
        }
    }

    /// Check if this route requires authentication
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::Home
                | Route::Marketplace { .. }
                | Route::Listing { .. }
                | Route::Sell
                | Route::Bids
                | Route::Inbox
                | Route::Conversation { .. }
                | Route::Profile
        )
    }

    /// Check if this route belongs to the sign-in flow
    ///
    /// Signed-in users are sent away from these.
    pub fn is_auth_flow(&self) -> bool {
        matches!(
            self,
            Route::Login | Route::Register | Route::ForgotPassword | Route::ResetPassword { .. }
        )
    }
}

// =============================================================================
// Navigation Stack
// =============================================================================

/// A navigation stack entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    /// The route
    pub route: Route,
    /// Unique key for this entry
    pub key: String,
}

impl StackEntry {
    /// Create a new stack entry
    pub fn new(route: Route) -> Self {
        Self {
            route,
            key: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Navigation stack
///
/// Never empty: the bottom entry is the root and cannot be popped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationStack {
    /// Entries above the root (bottom to top)
    entries: Vec<StackEntry>,
    /// Root entry
    root: StackEntry,
}

impl NavigationStack {
    /// Create a new navigation stack with a root route
    pub fn new(root: Route) -> Self {
        Self {
            entries: Vec::new(),
            root: StackEntry::new(root),
        }
    }

    /// Push a route onto the stack
    pub fn push(&mut self, route: Route) {
        self.entries.push(StackEntry::new(route));
    }

    /// Pop the top route (returns true if popped, false if at root)
    pub fn pop(&mut self) -> bool {
        self.entries.pop().is_some()
    }

    /// Get the current (top) route
    pub fn current(&self) -> &Route {
        &self.entries.last().unwrap_or(&self.root).route
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Get stack depth
    pub fn depth(&self) -> usize {
        self.entries.len() + 1
    }

    /// Reset to a new root, discarding history
    pub fn reset(&mut self, route: Route) {
        self.root = StackEntry::new(route);
        self.entries.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
