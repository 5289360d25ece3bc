//! Application state management for Gem Market
//!
//! This crate holds the session state machine the UI layer and the router
//! guard observe.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod session;

pub use session::{SessionPhase, SessionState, SessionStore};
