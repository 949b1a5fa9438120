use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single attribute value carried by a message.
///
/// Attributes are either a plain string or a list of strings. The JSON
/// forms are `"Gold"` and `["Gold", "Platinum"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    StringList(Vec<String>),
}

impl AttributeValue {
    /// Iterates the value as candidate strings. A plain string yields
    /// itself once.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        let values = match self {
            AttributeValue::String(value) => std::slice::from_ref(value),
            AttributeValue::StringList(values) => values.as_slice(),
        };
        values.iter().map(String::as_str)
    }

    /// The plain string form, or the first entry of a list.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            AttributeValue::StringList(values) => values.first().map(String::as_str),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::StringList(values)
    }
}

/// Represents a published message flowing through the broker.
///
/// A message is assigned its id and timestamp when published and is
/// immutable afterwards. Fan-out hands every matching queue its own clone,
/// so queues never share message state.
///
/// # Fields
///
/// - `id` - Identifier assigned at publish time.
/// - `body` - The message content, usually a JSON-encoded string.
/// - `attributes` - User attributes the subscription filters match against.
/// - `timestamp` - Unix timestamp (in seconds) of the publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub body: String,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
    pub timestamp: i64,
}

impl Message {
    /// Creates a message with a fresh id and the current timestamp.
    pub fn new(body: impl Into<String>, attributes: HashMap<String, AttributeValue>) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: body.into(),
            attributes,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// Looks up an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}
