//! Session state synchronization and access gating.
//!
//! This module provides:
//! - `SessionStore`: single writer of the login state, fed by the initial
//!   session check and provider auth events, and facade for sign-up,
//!   sign-in and sign-out
//! - `AccessGate`: reactive pending / redirect / render decision for
//!   protected views
//! - `AuthContext`: lazily initialised, single-instance owner of the store

pub mod context;
pub mod gate;
pub mod store;

pub use context::AuthContext;
pub use gate::{decide, AccessGate, GateDecision};
pub use store::SessionStore;
