use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broker::message::AttributeValue;

/// Frames a producer may send over the publish endpoint.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "publish")]
    Publish {
        topic: String,
        body: String,
        #[serde(default)]
        attributes: HashMap<String, AttributeValue>,
    },
}

/// Frames the endpoint sends back, one per publish frame.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "published")]
    Published { id: Uuid },

    #[serde(rename = "error")]
    Error { reason: String },
}
