//! Screen routing for Gem Market
//!
//! - [`navigation`] - Routes and the navigation stack
//! - [`guard`] - Auth guard deciding which routes a session may see
//!
//! # Example
//!
//! ```rust
//! use app_ui::{AuthGuard, GuardDecision, Route};
//! use app_state::SessionState;
//!
//! let mut guard = AuthGuard::new();
//!
//! // Nothing is decided until the session has loaded
//! assert_eq!(guard.observe(&SessionState::unknown(), &Route::Bids), GuardDecision::Suspend);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod guard;
pub mod navigation;

pub use guard::{AuthGuard, GuardDecision, Navigator};
pub use navigation::{NavigationStack, Route, StackEntry};
