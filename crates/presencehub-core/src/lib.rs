//! # presencehub-core
//!
//! Core crate for PresenceHub. Contains the configuration schemas, typed
//! identifiers, the authenticated [`types::principal::Principal`], the
//! collaborator traits (cache, session store, authentication), and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other PresenceHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
