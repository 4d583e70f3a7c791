//! Data models shared by the session store, the provider adapters and the
//! view flows.
//!
//! - `User`, `Session`: identity records handed out by the provider
//! - `AuthEvent`: provider push notification kinds
//! - `SessionState`, `AuthSnapshot`: the store's authoritative login status

pub mod event;
pub mod state;
pub mod user;

pub use event::AuthEvent;
pub use state::{AuthSnapshot, SessionState};
pub use user::{Session, User};
