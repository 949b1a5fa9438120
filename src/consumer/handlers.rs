use std::sync::Arc;

use tracing::{debug, info};

use crate::broker::message::{AttributeValue, Message};
use crate::broker::worker::{Handler, HandlerError};

/// Attribute key the consumers classify on.
pub const CUSTOMER_TYPE: &str = "customer_type";

/// Consumer for the unfiltered queue.
///
/// Logs the customer type carried by the message. A missing or malformed
/// attribute falls back to the "All Customers" classification; the message
/// is still acknowledged, never failed.
#[derive(Debug, Default)]
pub struct AllCustomersHandler;

impl Handler for AllCustomersHandler {
    fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let tier = message
            .attribute(CUSTOMER_TYPE)
            .and_then(AttributeValue::as_str)
            .unwrap_or("All Customers");
        info!(customer_type = tier, body = %message.body, "customer request");
        Ok(())
    }
}

/// Consumer for the tier-filtered queues.
///
/// The subscription filter normally guarantees the attribute is present; a
/// message without it is acknowledged under the default classification all
/// the same.
#[derive(Debug, Default)]
pub struct TieredCustomersHandler;

impl Handler for TieredCustomersHandler {
    fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        match message
            .attribute(CUSTOMER_TYPE)
            .and_then(AttributeValue::as_str)
        {
            Some(tier) => {
                info!(customer_type = tier, body = %message.body, "tiered customer request");
            }
            None => {
                debug!(id = %message.id, "tiered queue message without customer_type");
            }
        }
        Ok(())
    }
}

/// Resolves a handler from its configuration name.
pub fn handler_for(name: &str) -> Option<Arc<dyn Handler>> {
    match name {
        "all_customers" => Some(Arc::new(AllCustomersHandler)),
        "tiered_customers" => Some(Arc::new(TieredCustomersHandler)),
        _ => None,
    }
}
