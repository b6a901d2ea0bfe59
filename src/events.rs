//! Outbound event records delivered to client sinks.
//!
//! One record per wire message: trades to each involved trader (with that
//! trader's own order id), execution reports for lifecycle changes, depth
//! deltas for changed price levels, and typed errors.

use crate::error::EngineError;
use crate::types::{OrderId, Price, Qty, Side};

/// Order lifecycle status carried by execution reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "CANCELED")]
    Canceled,
    #[serde(rename = "REJECTED")]
    Rejected,
}

/// A single outbound record. Serializes with a `message` tag, mirroring the
/// inbound request shape.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "message")]
pub enum Event {
    /// One side of a match. `order_id` is the receiving trader's own order.
    #[serde(rename = "trade")]
    Trade {
        #[serde(rename = "orderId")]
        order_id: OrderId,
        price: Price,
        quantity: Qty,
    },

    #[serde(rename = "executionReport")]
    ExecutionReport {
        #[serde(rename = "orderId")]
        order_id: OrderId,
        status: OrderStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Depth delta: the new aggregate at a price level. Zero means the level
    /// is gone.
    #[serde(rename = "orderBook")]
    OrderBook {
        price: Price,
        side: Side,
        quantity: Qty,
    },

    #[serde(rename = "error")]
    Error { code: String, text: String },
}

impl Event {
    pub fn new_order(order_id: OrderId) -> Event {
        Event::ExecutionReport {
            order_id,
            status: OrderStatus::New,
            reason: None,
        }
    }

    pub fn canceled(order_id: OrderId) -> Event {
        Event::ExecutionReport {
            order_id,
            status: OrderStatus::Canceled,
            reason: None,
        }
    }

    pub fn rejected(order_id: OrderId, reason: &str) -> Event {
        Event::ExecutionReport {
            order_id,
            status: OrderStatus::Rejected,
            reason: Some(reason.to_string()),
        }
    }

    pub fn error(err: &EngineError) -> Event {
        Event::Error {
            code: err.code().to_string(),
            text: err.to_string(),
        }
    }
}
