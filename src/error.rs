//! Engine error taxonomy.
//!
//! Every variant is recoverable and surfaced to the originating client as an
//! `error` event; none is fatal to the engine. [`EngineError::code`] gives the
//! wire code string carried in that event.

use thiserror::Error;

/// Typed errors for message validation, state violations, and protocol misuse.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("side field is missing or not one of BUY/SELL")]
    WrongSide,

    #[error("orderId field is missing, not an integer, or not positive")]
    OrderId,

    #[error("price field is missing, not an integer, or not positive")]
    Price,

    #[error("quantity field is missing, not an integer, or not positive")]
    Quantity,

    #[error("no such order")]
    NotFound,

    #[error("order id already in use by this trader")]
    DuplicateOrderId,

    #[error("unrecognized message type")]
    UnknownMessage,

    #[error("message is not a record or lacks a message field")]
    MalformedMessage,
}

impl EngineError {
    /// Wire code carried in outbound `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::WrongSide => "WrongSide",
            EngineError::OrderId => "OrderIdError",
            EngineError::Price => "PriceError",
            EngineError::Quantity => "QuantityError",
            EngineError::NotFound => "NotFound",
            EngineError::DuplicateOrderId => "DuplicateOrderId",
            EngineError::UnknownMessage => "UnknownMessage",
            EngineError::MalformedMessage => "MalformedMessage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_taxonomy() {
        assert_eq!(EngineError::WrongSide.code(), "WrongSide");
        assert_eq!(EngineError::OrderId.code(), "OrderIdError");
        assert_eq!(EngineError::Price.code(), "PriceError");
        assert_eq!(EngineError::Quantity.code(), "QuantityError");
        assert_eq!(EngineError::NotFound.code(), "NotFound");
        assert_eq!(EngineError::DuplicateOrderId.code(), "DuplicateOrderId");
        assert_eq!(EngineError::UnknownMessage.code(), "UnknownMessage");
        assert_eq!(EngineError::MalformedMessage.code(), "MalformedMessage");
    }
}
