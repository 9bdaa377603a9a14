//! In-memory provider.

pub mod store;

pub use store::MemoryCacheProvider;
