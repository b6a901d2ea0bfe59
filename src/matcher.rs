//! Message dispatch and client registry: one [`Matcher`] owns one book.
//!
//! Traders are held strongly until unregistered; observers are held weakly
//! and pruned at the next fan-out after the host drops them. Dispatch routes
//! decoded records by their `message` field; anything unknown or malformed
//! becomes a typed `error` event on the caller's sink and is never fatal.
//!
//! Delivery happens synchronously inside the mutating call, after the book
//! has committed: directed records first, then depth deltas to every
//! observer in registration order.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use log::debug;
use serde_json::Value;

use crate::client::{Client, EventSink, Trader};
use crate::error::EngineError;
use crate::events::Event;
use crate::order::{self, Order};
use crate::order_book::{Emissions, OrderBook};
use crate::types::{OrderId, Qty, TraderId};

/// Engine instance: registry of traders and observers plus the order book.
/// An owned value; multiple matchers may coexist in one process.
#[derive(Debug, Default)]
pub struct Matcher {
    book: OrderBook,
    traders: HashMap<TraderId, Trader>,
    observers: Vec<Weak<Client>>,
}

impl Matcher {
    pub fn new() -> Matcher {
        Matcher::default()
    }

    /// The book, for depth inspection in hosts and tests.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn has_trader(&self, id: TraderId) -> bool {
        self.traders.contains_key(&id)
    }

    /// Register an observer for depth broadcasts. Held weakly: dropping the
    /// last strong handle unsubscribes it at the next fan-out.
    pub fn add_client(&mut self, client: &Rc<Client>) {
        self.observers.push(Rc::downgrade(client));
    }

    /// Remove an observer immediately.
    pub fn remove_client(&mut self, client: &Rc<Client>) {
        self.observers
            .retain(|weak| weak.upgrade().is_some_and(|c| !Rc::ptr_eq(&c, client)));
    }

    /// Register a trader. A trader also observes depth by default. Re-using
    /// an id replaces the sink and keeps the identity (and resting orders).
    pub fn add_trader(&mut self, id: TraderId, sink: Box<dyn EventSink>) {
        if let Some(previous) = self.traders.remove(&id) {
            let client = previous.client().clone();
            self.remove_client(&client);
        }
        let client = Client::new(format!("trader-{}", id.0), sink);
        self.add_client(&client);
        self.traders.insert(id, Trader::new(id, client));
    }

    /// Unregister a trader: purge its resting orders (broadcasting the
    /// affected levels) and drop its sink. Returns false if unknown.
    pub fn remove_trader(&mut self, id: TraderId) -> bool {
        let Some(trader) = self.traders.remove(&id) else {
            return false;
        };
        self.remove_client(&trader.client().clone());
        let emissions = self.book.unregister_trader(id);
        self.deliver(emissions);
        true
    }

    /// Dispatch one decoded request on behalf of a registered trader.
    ///
    /// Validation and state errors are reported on the trader's sink as
    /// `error` events and yield `Ok(())`. Only an unregistered `trader_id`
    /// returns an error, since there is no sink to report to.
    pub fn handle_message(
        &mut self,
        trader_id: TraderId,
        decoded: &Value,
    ) -> Result<(), EngineError> {
        if !self.traders.contains_key(&trader_id) {
            return Err(EngineError::NotFound);
        }
        let outcome = match decoded.get("message").and_then(Value::as_str) {
            Some("createOrder") => Order::limit_from_decoded(trader_id, decoded)
                .and_then(|o| self.book.create_limit(o))
                .map(|emissions| self.deliver(emissions)),
            Some("createMarketOrder") => {
                Order::market_from_decoded(trader_id, decoded).map(|o| {
                    let emissions = self.book.create_market(o);
                    self.deliver(emissions);
                })
            }
            Some("cancelOrder") => order::extract_order_id(decoded)
                .and_then(|id| self.book.cancel(trader_id, id))
                .map(|emissions| self.deliver(emissions)),
            Some("getOrderBook") => {
                self.send_snapshot(trader_id);
                Ok(())
            }
            Some(other) => {
                debug!("trader {}: unknown message {:?}", trader_id.0, other);
                Err(EngineError::UnknownMessage)
            }
            None => Err(EngineError::MalformedMessage),
        };
        if let Err(err) = outcome {
            self.notify_trader(trader_id, &Event::error(&err));
        }
        Ok(())
    }

    /// Dispatch one decoded request from an observer-only client. Observers
    /// may request the depth snapshot; anything else is an error event.
    pub fn handle_client_message(&mut self, client: &Rc<Client>, decoded: &Value) {
        match decoded.get("message").and_then(Value::as_str) {
            Some("getOrderBook") => {
                for event in self.book.depth_snapshot() {
                    client.notify(&event);
                }
            }
            Some(_) => client.notify(&Event::error(&EngineError::UnknownMessage)),
            None => client.notify(&Event::error(&EngineError::MalformedMessage)),
        }
    }

    /// Amend a resting order's quantity on behalf of the host. Shrinking
    /// keeps time priority; growing re-queues (and may match). Errors are
    /// reported on the trader's sink like any other request.
    pub fn amend_order(
        &mut self,
        trader_id: TraderId,
        order_id: OrderId,
        new_quantity: Qty,
    ) -> Result<(), EngineError> {
        if !self.traders.contains_key(&trader_id) {
            return Err(EngineError::NotFound);
        }
        match self.book.amend(trader_id, order_id, new_quantity) {
            Ok(emissions) => self.deliver(emissions),
            Err(err) => self.notify_trader(trader_id, &Event::error(&err)),
        }
        Ok(())
    }

    fn send_snapshot(&self, trader_id: TraderId) {
        let Some(trader) = self.traders.get(&trader_id) else {
            return;
        };
        for event in self.book.depth_snapshot() {
            trader.notify(&event);
        }
    }

    fn notify_trader(&self, trader_id: TraderId, event: &Event) {
        match self.traders.get(&trader_id) {
            Some(trader) => trader.notify(event),
            None => debug!("trader {}: gone, dropped {:?}", trader_id.0, event),
        }
    }

    /// Deliver one operation's output: directed records to their traders,
    /// then depth deltas to all observers, pruning dead ones first.
    fn deliver(&mut self, emissions: Emissions) {
        for (trader_id, event) in &emissions.directed {
            self.notify_trader(*trader_id, event);
        }
        if emissions.depth.is_empty() {
            return;
        }
        self.observers.retain(|weak| weak.upgrade().is_some());
        for weak in &self.observers {
            if let Some(client) = weak.upgrade() {
                for event in &emissions.depth {
                    client.notify(event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BufferSink;
    use crate::events::OrderStatus;
    use crate::types::Side;
    use serde_json::json;

    fn matcher_with_traders(n: u64) -> (Matcher, Vec<BufferSink>) {
        let mut matcher = Matcher::new();
        let mut sinks = Vec::new();
        for id in 1..=n {
            let sink = BufferSink::new();
            matcher.add_trader(TraderId(id), sink.handle());
            sinks.push(sink);
        }
        (matcher, sinks)
    }

    #[test]
    fn create_order_reports_new_and_broadcasts_depth() {
        let (mut matcher, sinks) = matcher_with_traders(2);
        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createOrder", "side": "BUY", "orderId": 1, "price": 100, "quantity": 10}),
            )
            .unwrap();
        assert_eq!(
            sinks[0].events(),
            vec![
                Event::new_order(OrderId(1)),
                Event::OrderBook {
                    price: 100,
                    side: Side::Bid,
                    quantity: 10
                },
            ]
        );
        // The other trader observes depth only.
        assert_eq!(
            sinks[1].events(),
            vec![Event::OrderBook {
                price: 100,
                side: Side::Bid,
                quantity: 10
            }]
        );
    }

    #[test]
    fn crossing_order_routes_trades_to_each_owner() {
        let (mut matcher, sinks) = matcher_with_traders(2);
        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createOrder", "side": "BUY", "orderId": 1, "price": 100, "quantity": 10}),
            )
            .unwrap();
        sinks[0].clear();
        sinks[1].clear();
        matcher
            .handle_message(
                TraderId(2),
                &json!({"message": "createOrder", "side": "SELL", "orderId": 2, "price": 99, "quantity": 4}),
            )
            .unwrap();
        assert_eq!(
            sinks[1].events(),
            vec![
                Event::Trade {
                    order_id: OrderId(2),
                    price: 100,
                    quantity: 4
                },
                Event::OrderBook {
                    price: 100,
                    side: Side::Bid,
                    quantity: 6
                },
            ]
        );
        assert_eq!(
            sinks[0].events(),
            vec![
                Event::Trade {
                    order_id: OrderId(1),
                    price: 100,
                    quantity: 4
                },
                Event::OrderBook {
                    price: 100,
                    side: Side::Bid,
                    quantity: 6
                },
            ]
        );
    }

    #[test]
    fn unknown_and_malformed_messages_become_error_events() {
        let (mut matcher, sinks) = matcher_with_traders(1);
        matcher
            .handle_message(TraderId(1), &json!({"message": "haltMarket"}))
            .unwrap();
        matcher.handle_message(TraderId(1), &json!({"no": "tag"})).unwrap();
        let events = sinks[0].events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Event::Error { code, .. } if code == "UnknownMessage"));
        assert!(matches!(&events[1], Event::Error { code, .. } if code == "MalformedMessage"));
    }

    #[test]
    fn validation_errors_reach_only_the_sender() {
        let (mut matcher, sinks) = matcher_with_traders(2);
        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createOrder", "side": "BUY", "orderId": 0, "price": 100, "quantity": 10}),
            )
            .unwrap();
        assert!(matches!(
            &sinks[0].events()[..],
            [Event::Error { code, .. }] if code == "OrderIdError"
        ));
        assert!(sinks[1].events().is_empty());
    }

    #[test]
    fn unregistered_trader_is_an_error_for_the_host() {
        let mut matcher = Matcher::new();
        let err = matcher
            .handle_message(TraderId(9), &json!({"message": "getOrderBook"}))
            .unwrap_err();
        assert_eq!(err, EngineError::NotFound);
    }

    #[test]
    fn cancel_order_dispatch() {
        let (mut matcher, sinks) = matcher_with_traders(1);
        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createOrder", "side": "BUY", "orderId": 1, "price": 100, "quantity": 10}),
            )
            .unwrap();
        sinks[0].clear();
        matcher
            .handle_message(TraderId(1), &json!({"message": "cancelOrder", "orderId": 1}))
            .unwrap();
        assert_eq!(
            sinks[0].events(),
            vec![
                Event::canceled(OrderId(1)),
                Event::OrderBook {
                    price: 100,
                    side: Side::Bid,
                    quantity: 0
                },
            ]
        );
        // Cancelling again: NotFound as an error event.
        sinks[0].clear();
        matcher
            .handle_message(TraderId(1), &json!({"message": "cancelOrder", "orderId": 1}))
            .unwrap();
        assert!(matches!(
            &sinks[0].events()[..],
            [Event::Error { code, .. }] if code == "NotFound"
        ));
    }

    #[test]
    fn get_order_book_goes_to_requester_only() {
        let (mut matcher, sinks) = matcher_with_traders(2);
        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createOrder", "side": "SELL", "orderId": 1, "price": 101, "quantity": 7}),
            )
            .unwrap();
        sinks[0].clear();
        sinks[1].clear();
        matcher
            .handle_message(TraderId(2), &json!({"message": "getOrderBook"}))
            .unwrap();
        assert_eq!(
            sinks[1].events(),
            vec![Event::OrderBook {
                price: 101,
                side: Side::Ask,
                quantity: 7
            }]
        );
        assert!(sinks[0].events().is_empty());
    }

    #[test]
    fn observer_client_snapshot_and_pruning() {
        let (mut matcher, _sinks) = matcher_with_traders(1);
        let observer = BufferSink::new();
        let client = Client::new("md", observer.handle());
        matcher.add_client(&client);
        matcher.handle_client_message(&client, &json!({"message": "getOrderBook"}));
        assert!(observer.events().is_empty());

        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createOrder", "side": "BUY", "orderId": 1, "price": 100, "quantity": 5}),
            )
            .unwrap();
        assert_eq!(observer.events().len(), 1);

        // Dropped observer is pruned at the next fan-out, not notified.
        drop(client);
        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createOrder", "side": "BUY", "orderId": 2, "price": 99, "quantity": 5}),
            )
            .unwrap();
        assert_eq!(observer.events().len(), 1);
    }

    #[test]
    fn observer_client_rejects_other_messages() {
        let mut matcher = Matcher::new();
        let observer = BufferSink::new();
        let client = Client::new("md", observer.handle());
        matcher.add_client(&client);
        matcher.handle_client_message(
            &client,
            &json!({"message": "createOrder", "side": "BUY", "orderId": 1, "price": 1, "quantity": 1}),
        );
        assert!(matches!(
            &observer.events()[..],
            [Event::Error { code, .. }] if code == "UnknownMessage"
        ));
    }

    #[test]
    fn remove_trader_purges_orders_and_stops_depth() {
        let (mut matcher, sinks) = matcher_with_traders(2);
        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createOrder", "side": "BUY", "orderId": 1, "price": 100, "quantity": 10}),
            )
            .unwrap();
        sinks[0].clear();
        sinks[1].clear();
        assert!(matcher.remove_trader(TraderId(1)));
        assert!(!matcher.remove_trader(TraderId(1)));
        // Remaining observer saw the level vanish; the removed trader saw nothing.
        assert_eq!(
            sinks[1].events(),
            vec![Event::OrderBook {
                price: 100,
                side: Side::Bid,
                quantity: 0
            }]
        );
        assert!(sinks[0].events().is_empty());
        assert!(matcher.book().bids().is_empty());
    }

    #[test]
    fn amend_order_host_call() {
        let (mut matcher, sinks) = matcher_with_traders(1);
        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createOrder", "side": "SELL", "orderId": 1, "price": 100, "quantity": 10}),
            )
            .unwrap();
        sinks[0].clear();
        matcher.amend_order(TraderId(1), OrderId(1), 4).unwrap();
        assert_eq!(
            sinks[0].events(),
            vec![
                Event::ExecutionReport {
                    order_id: OrderId(1),
                    status: OrderStatus::New,
                    reason: None
                },
                Event::OrderBook {
                    price: 100,
                    side: Side::Ask,
                    quantity: 4
                },
            ]
        );
        sinks[0].clear();
        matcher.amend_order(TraderId(1), OrderId(9), 4).unwrap();
        assert!(matches!(
            &sinks[0].events()[..],
            [Event::Error { code, .. }] if code == "NotFound"
        ));
    }

    #[test]
    fn market_order_dispatch_no_liquidity() {
        let (mut matcher, sinks) = matcher_with_traders(1);
        matcher
            .handle_message(
                TraderId(1),
                &json!({"message": "createMarketOrder", "side": "BUY", "quantity": 3}),
            )
            .unwrap();
        assert_eq!(
            sinks[0].events(),
            vec![Event::ExecutionReport {
                order_id: OrderId::MARKET,
                status: OrderStatus::Rejected,
                reason: Some("no liquidity".to_string()),
            }]
        );
    }
}
