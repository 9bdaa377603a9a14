//! A single `{matcher, requirement}` rule.

use presencehub_core::config::policy::{AccessRequirement, RuleConfig};
use presencehub_core::result::AppResult;

use super::matcher::MessageMatcher;

/// One ordered policy rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    /// Applicability test.
    pub matcher: MessageMatcher,
    /// Requirement once matched.
    pub requirement: AccessRequirement,
}

impl PolicyRule {
    /// Creates a rule.
    pub fn new(matcher: MessageMatcher, requirement: AccessRequirement) -> Self {
        Self {
            matcher,
            requirement,
        }
    }

    /// Compiles a configured rule.
    pub fn from_config(config: &RuleConfig) -> AppResult<Self> {
        Ok(Self::new(
            MessageMatcher::from_config(&config.matcher)?,
            config.access,
        ))
    }
}
