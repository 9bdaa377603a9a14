//! Application command handlers.

pub mod application;

pub use application::ApplicationHandler;
