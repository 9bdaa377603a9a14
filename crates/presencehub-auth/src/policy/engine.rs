//! First-match-wins policy evaluation.

use std::fmt;

use presencehub_core::config::policy::{AccessRequirement, PolicyConfig};
use presencehub_core::result::AppResult;
use presencehub_core::types::MessageType;

use super::envelope::MessageEnvelope;
use super::rule::PolicyRule;

/// Outcome of evaluating one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Message may proceed.
    Allow,
    /// Message is dropped.
    Deny,
}

impl Verdict {
    /// True for [`Verdict::Allow`].
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Deny => write!(f, "DENY"),
        }
    }
}

/// Verdict plus the index of the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Final verdict.
    pub verdict: Verdict,
    /// Index of the deciding rule, `None` when no rule matched.
    pub rule: Option<usize>,
}

/// Stateless evaluator over an immutable, ordered rule list.
///
/// Rules are consulted strictly in declaration order. The first rule whose
/// matcher accepts the envelope decides; later rules are never looked at.
/// An envelope that matches no rule is denied.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
}

impl PolicyEngine {
    /// Creates an engine over an already-compiled rule list.
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    /// Compiles the configured rule list.
    pub fn from_config(config: &PolicyConfig) -> AppResult<Self> {
        let rules = config
            .rules
            .iter()
            .map(PolicyRule::from_config)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// The compiled rules, in evaluation order.
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Evaluates an envelope to ALLOW or DENY.
    pub fn evaluate(&self, envelope: &MessageEnvelope<'_>) -> Verdict {
        self.decide(envelope).verdict
    }

    /// Evaluates an envelope and reports which rule decided.
    pub fn decide(&self, envelope: &MessageEnvelope<'_>) -> Decision {
        self.rules
            .iter()
            .position(|rule| rule.matcher.matches(envelope))
            .map(|index| Decision {
                verdict: apply(self.rules[index].requirement, envelope),
                rule: Some(index),
            })
            .unwrap_or(Decision {
                verdict: Verdict::Deny,
                rule: None,
            })
    }
}

fn apply(requirement: AccessRequirement, envelope: &MessageEnvelope<'_>) -> Verdict {
    match requirement {
        AccessRequirement::PermitAll => Verdict::Allow,
        AccessRequirement::DenyAll => Verdict::Deny,
        AccessRequirement::Authenticated => {
            // CONNECT is what makes the session live, so it only needs a principal
            let live = envelope.message_type == MessageType::Connect || envelope.session_connected;
            if envelope.principal.is_some() && live {
                Verdict::Allow
            } else {
                Verdict::Deny
            }
        }
    }
}
