//! Order record and construction from decoded client messages.
//!
//! An [`Order`] is built from an already-decoded message record (a
//! [`serde_json::Value`] map). Extraction validates field by field and fails
//! with the typed taxonomy before any book state is touched. Market orders
//! skip `orderId` and `price` extraction; their price is the side sentinel.
//!
//! After construction no field mutates except `quantity`, which only the
//! book decrements while matching.

use std::time::Instant;

use serde_json::Value;

use crate::error::EngineError;
use crate::types::{OrderId, Price, Qty, Side, TraderId};

/// A single order. Limit orders rest in a container; market orders never do.
#[derive(Clone, Debug)]
pub struct Order {
    pub is_market: bool,
    pub side: Side,
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Qty,
    /// Construction instant; secondary priority. FIFO insertion order breaks ties.
    pub time: Instant,
    pub trader: TraderId,
}

impl Order {
    /// Build a limit order from a decoded `createOrder` record.
    pub fn limit_from_decoded(trader: TraderId, decoded: &Value) -> Result<Order, EngineError> {
        let side = extract_side(decoded)?;
        Ok(Order {
            is_market: false,
            side,
            order_id: extract_order_id(decoded)?,
            price: extract_price(decoded)?,
            quantity: extract_quantity(decoded)?,
            time: Instant::now(),
            trader,
        })
    }

    /// Build a market order from a decoded `createMarketOrder` record.
    /// Carries [`OrderId::MARKET`] and the side's price sentinel.
    pub fn market_from_decoded(trader: TraderId, decoded: &Value) -> Result<Order, EngineError> {
        let side = extract_side(decoded)?;
        Ok(Order {
            is_market: true,
            side,
            order_id: OrderId::MARKET,
            price: side.market_sentinel(),
            quantity: extract_quantity(decoded)?,
            time: Instant::now(),
            trader,
        })
    }

    /// Identity key within the book.
    pub fn key(&self) -> (TraderId, OrderId) {
        (self.trader, self.order_id)
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_market {
            write!(f, "{} {}", self.side, self.quantity)
        } else {
            write!(f, "{} {}@{}", self.side, self.quantity, self.price)
        }
    }
}

fn extract_side(decoded: &Value) -> Result<Side, EngineError> {
    decoded
        .get("side")
        .and_then(Value::as_str)
        .and_then(Side::from_wire)
        .ok_or(EngineError::WrongSide)
}

/// Extract a positive `orderId`; shared with `cancelOrder` handling.
pub(crate) fn extract_order_id(decoded: &Value) -> Result<OrderId, EngineError> {
    match decoded.get("orderId").and_then(Value::as_i64) {
        Some(id) if id > 0 => Ok(OrderId(id as u64)),
        _ => Err(EngineError::OrderId),
    }
}

fn extract_price(decoded: &Value) -> Result<Price, EngineError> {
    match decoded.get("price").and_then(Value::as_i64) {
        Some(price) if price > 0 => Ok(price),
        _ => Err(EngineError::Price),
    }
}

fn extract_quantity(decoded: &Value) -> Result<Qty, EngineError> {
    match decoded.get("quantity").and_then(Value::as_i64) {
        Some(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(EngineError::Quantity),
    }
}
