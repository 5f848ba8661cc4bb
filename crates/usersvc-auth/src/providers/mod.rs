//! Authentication provider implementations
//!
//! This module contains implementations of the `AuthProvider` trait:
//! - `remember_me`: long-lived cookie token that logs the user back in

pub mod remember_me;

pub use remember_me::{
    InMemoryRememberMeStore, RememberMeAuthProvider, RememberMeEntry, RememberMeStore,
};
