//! Destination-based authorization of inbound messages.

pub mod engine;
pub mod envelope;
pub mod matcher;
pub mod pattern;
pub mod rule;

pub use engine::{Decision, PolicyEngine, Verdict};
pub use envelope::MessageEnvelope;
pub use matcher::MessageMatcher;
pub use pattern::DestinationPattern;
pub use rule::PolicyRule;
