use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::message::Message;

/// Attribute allowlist attached to a subscription.
///
/// A policy with no keys matches every message. A non-empty policy matches
/// when the message carries every policy key with at least one allowed
/// value: all keys must pass, and within a key any allowed value suffices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterPolicy {
    rules: HashMap<String, HashSet<String>>,
}

impl FilterPolicy {
    /// The empty policy. Matches unconditionally.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Adds an allowlist for one attribute key.
    pub fn allow<I, S>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .insert(key.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_match_all(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decides whether `message` satisfies this policy.
    ///
    /// Pure and deterministic; every fan-out path may call it concurrently.
    /// A missing attribute key is a non-match, not an error.
    pub fn matches(&self, message: &Message) -> bool {
        self.rules.iter().all(|(key, allowed)| {
            message
                .attribute(key)
                .is_some_and(|value| value.candidates().any(|candidate| allowed.contains(candidate)))
        })
    }
}

impl From<HashMap<String, Vec<String>>> for FilterPolicy {
    fn from(rules: HashMap<String, Vec<String>>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(key, values)| (key, values.into_iter().collect()))
                .collect(),
        }
    }
}
