//! Credential verification.

pub mod directory;

pub use directory::UserDirectory;
