//! Inbound message authorization rules.
//!
//! Rules are plain data loaded once at startup. Their order is significant:
//! the first rule whose matcher accepts a message decides the verdict.

use serde::{Deserialize, Serialize};

use crate::types::MessageType;

/// Ordered rule list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Rules evaluated strictly in declaration order.
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

/// One `{matcher, requirement}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Which messages this rule applies to.
    pub matcher: MatcherConfig,
    /// Verdict requirement once matched.
    pub access: AccessRequirement,
}

impl RuleConfig {
    /// Shorthand constructor.
    pub fn new(matcher: MatcherConfig, access: AccessRequirement) -> Self {
        Self { matcher, access }
    }
}

/// Message matcher definitions.
///
/// Destination patterns use `/`-separated segments: `*` matches exactly one
/// segment, `**` matches any number of trailing or inner segments, and any
/// other segment must match literally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatcherConfig {
    /// Messages that carry no destination at all (CONNECT, DISCONNECT, heartbeats).
    NullDestination,
    /// Messages whose destination matches any of `patterns`, optionally
    /// restricted to a single message type.
    Destination {
        /// Destination patterns.
        patterns: Vec<String>,
        /// Only match messages of this type.
        #[serde(default)]
        message_type: Option<MessageType>,
    },
    /// Messages of any of the given types, regardless of destination.
    Types {
        /// Accepted types.
        types: Vec<MessageType>,
    },
    /// Every message.
    Any,
}

/// Requirement applied by a matched rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRequirement {
    /// A principal must be present and its session registered as connected.
    Authenticated,
    /// Always allowed.
    PermitAll,
    /// Always denied.
    DenyAll,
}

/// The default closed-world rule set.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        // protocol frames: CONNECT, DISCONNECT, UNSUBSCRIBE, heartbeats
        RuleConfig::new(MatcherConfig::NullDestination, AccessRequirement::Authenticated),
        RuleConfig::new(
            MatcherConfig::Destination {
                patterns: vec!["/user/queue/errors".to_string()],
                message_type: None,
            },
            AccessRequirement::PermitAll,
        ),
        RuleConfig::new(
            MatcherConfig::Destination {
                patterns: vec!["/app/**".to_string()],
                message_type: None,
            },
            AccessRequirement::Authenticated,
        ),
        RuleConfig::new(
            MatcherConfig::Destination {
                patterns: vec!["/user/**".to_string(), "/topic/friends/*".to_string()],
                message_type: Some(MessageType::Subscribe),
            },
            AccessRequirement::Authenticated,
        ),
        // no direct publish/subscribe to broker destinations
        RuleConfig::new(
            MatcherConfig::Types {
                types: vec![MessageType::Message, MessageType::Subscribe],
            },
            AccessRequirement::DenyAll,
        ),
        RuleConfig::new(MatcherConfig::Any, AccessRequirement::DenyAll),
    ]
}
