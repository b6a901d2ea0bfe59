//! # tickmatch
//!
//! In-process continuous matching engine for a single instrument: a
//! price-time-priority order book, market orders with immediate-or-kill
//! semantics, and synchronous fan-out of depth updates to observer clients
//! with per-trader execution reports.
//!
//! The engine is single-threaded and cooperative: it consumes already
//! decoded message records and writes outbound records through host-supplied
//! sinks. Transport, framing, and sessions live in the host.
//!
//! ## Entry point
//!
//! Use [`Matcher`] as the single entry point: register traders and observer
//! clients, then feed decoded records to [`Matcher::handle_message`].
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use tickmatch::{BufferSink, Event, Matcher, TraderId};
//!
//! let mut matcher = Matcher::new();
//! let buyer = BufferSink::new();
//! let seller = BufferSink::new();
//! matcher.add_trader(TraderId(1), buyer.handle());
//! matcher.add_trader(TraderId(2), seller.handle());
//!
//! matcher.handle_message(TraderId(1), &json!({
//!     "message": "createOrder", "side": "BUY",
//!     "orderId": 1, "price": 100, "quantity": 10,
//! }))?;
//! matcher.handle_message(TraderId(2), &json!({
//!     "message": "createOrder", "side": "SELL",
//!     "orderId": 1, "price": 100, "quantity": 10,
//! }))?;
//!
//! assert!(seller
//!     .events()
//!     .iter()
//!     .any(|e| matches!(e, Event::Trade { .. })));
//! # Ok::<(), tickmatch::EngineError>(())
//! ```
//!
//! ## Lower-level API
//!
//! [`OrderBook`] can be driven directly when the host manages its own
//! registry; each mutating call returns the events to deliver.

pub mod client;
pub mod container;
pub mod error;
pub mod events;
pub mod matcher;
pub mod order;
pub mod order_book;
pub mod order_gen;
pub mod types;

pub use client::{BufferSink, Client, EventSink, Trader};
pub use error::EngineError;
pub use events::{Event, OrderStatus};
pub use matcher::Matcher;
pub use order::Order;
pub use order_book::{Emissions, OrderBook};
pub use types::{marketable, OrderId, Price, Qty, Side, TraderId};
