//! Envelope matchers.

use presencehub_core::config::policy::MatcherConfig;
use presencehub_core::result::AppResult;
use presencehub_core::types::MessageType;

use super::envelope::MessageEnvelope;
use super::pattern::DestinationPattern;

/// Decides whether a rule applies to an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageMatcher {
    /// Envelopes without a destination.
    NullDestination,
    /// Envelopes whose destination matches any pattern, optionally of one type only.
    Destination {
        /// Compiled patterns.
        patterns: Vec<DestinationPattern>,
        /// Type restriction.
        message_type: Option<MessageType>,
    },
    /// Envelopes of any of the listed types.
    Types(Vec<MessageType>),
    /// Every envelope.
    Any,
}

impl MessageMatcher {
    /// Compiles a matcher from configuration.
    pub fn from_config(config: &MatcherConfig) -> AppResult<Self> {
        Ok(match config {
            MatcherConfig::NullDestination => Self::NullDestination,
            MatcherConfig::Destination {
                patterns,
                message_type,
            } => Self::Destination {
                patterns: patterns
                    .iter()
                    .map(|p| DestinationPattern::parse(p))
                    .collect::<AppResult<Vec<_>>>()?,
                message_type: *message_type,
            },
            MatcherConfig::Types { types } => Self::Types(types.clone()),
            MatcherConfig::Any => Self::Any,
        })
    }

    /// Exact destination match.
    pub fn exact(destination: &str) -> AppResult<Self> {
        Ok(Self::Destination {
            patterns: vec![DestinationPattern::parse(destination)?],
            message_type: None,
        })
    }

    /// Prefix match: the destination equals `prefix` or lies anywhere below it.
    pub fn prefix(prefix: &str) -> AppResult<Self> {
        let base = prefix.trim_end_matches('/');
        Ok(Self::Destination {
            patterns: vec![DestinationPattern::parse(&format!("{base}/**"))?],
            message_type: None,
        })
    }

    /// Type-only match.
    pub fn types(types: impl IntoIterator<Item = MessageType>) -> Self {
        Self::Types(types.into_iter().collect())
    }

    /// Restricts a destination matcher to one message type. Other matchers are returned unchanged.
    pub fn with_type(self, message_type: MessageType) -> Self {
        match self {
            Self::Destination { patterns, .. } => Self::Destination {
                patterns,
                message_type: Some(message_type),
            },
            other => other,
        }
    }

    /// Returns true if the matcher accepts the envelope.
    pub fn matches(&self, envelope: &MessageEnvelope<'_>) -> bool {
        match self {
            Self::NullDestination => envelope.destination.is_none(),
            Self::Destination {
                patterns,
                message_type,
            } => {
                if message_type.is_some_and(|t| t != envelope.message_type) {
                    return false;
                }
                envelope
                    .destination
                    .is_some_and(|d| patterns.iter().any(|p| p.matches(d)))
            }
            Self::Types(types) => types.contains(&envelope.message_type),
            Self::Any => true,
        }
    }
}
