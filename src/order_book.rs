//! Single-instrument order book: two price-time containers, the matching
//! loop, and edge-triggered depth broadcasts.
//!
//! Every mutating operation returns [`Emissions`]: trader-directed events in
//! delivery order, then one depth delta per price level whose aggregate
//! changed since the last broadcast. The book commits its state before the
//! caller delivers anything, so sink failures never roll a mutation back.

use std::collections::HashMap;
use std::time::Instant;

use crate::container::OrderContainer;
use crate::error::EngineError;
use crate::events::Event;
use crate::order::Order;
use crate::types::{marketable, OrderId, Price, Qty, Side, TraderId};

/// Events produced by one book operation, in delivery order: directed
/// records first (aggressor's before each counterparty's, fills in
/// consumption order), then depth deltas for every observer.
#[derive(Debug, Default)]
pub struct Emissions {
    pub directed: Vec<(TraderId, Event)>,
    pub depth: Vec<Event>,
}

/// Two-sided limit order book with price-time priority.
#[derive(Debug)]
pub struct OrderBook {
    bids: OrderContainer,
    asks: OrderContainer,
    /// Last-broadcast aggregate per level; levels absent from the map were
    /// last seen (or never seen) at zero.
    broadcast: HashMap<(Side, Price), Qty>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: OrderContainer::new(Side::Bid),
            asks: OrderContainer::new(Side::Ask),
            broadcast: HashMap::new(),
        }
    }

    pub fn bids(&self) -> &OrderContainer {
        &self.bids
    }

    pub fn asks(&self) -> &OrderContainer {
        &self.asks
    }

    /// True if `(trader, order_id)` rests on either side.
    pub fn contains(&self, trader: TraderId, order_id: OrderId) -> bool {
        self.bids.contains(trader, order_id) || self.asks.contains(trader, order_id)
    }

    /// Insert a limit order: match against the opposite side while marketable,
    /// then rest any remainder. Fails with `DuplicateOrderId` before touching
    /// any state if the identity key already rests on either side.
    pub fn create_limit(&mut self, mut order: Order) -> Result<Emissions, EngineError> {
        if self.contains(order.trader, order.order_id) {
            return Err(EngineError::DuplicateOrderId);
        }
        let mut emissions = Emissions::default();
        let mut touched = Vec::new();
        self.match_incoming(&mut order, &mut emissions, &mut touched);
        if order.quantity > 0 {
            emissions
                .directed
                .push((order.trader, Event::new_order(order.order_id)));
            let side = order.side;
            let price = order.price;
            self.container_mut(side).insert(order)?;
            touched.push((side, price));
        }
        emissions.depth = self.depth_deltas(&touched);
        Ok(emissions)
    }

    /// Match a market order; the residual is discarded, never rested. With no
    /// match at all, the submitter gets an informational no-liquidity report.
    pub fn create_market(&mut self, mut order: Order) -> Emissions {
        let mut emissions = Emissions::default();
        let mut touched = Vec::new();
        self.match_incoming(&mut order, &mut emissions, &mut touched);
        if emissions.directed.is_empty() {
            emissions
                .directed
                .push((order.trader, Event::rejected(OrderId::MARKET, "no liquidity")));
        }
        emissions.depth = self.depth_deltas(&touched);
        emissions
    }

    /// Cancel a resting order. `NotFound` leaves the book untouched.
    pub fn cancel(
        &mut self,
        trader: TraderId,
        order_id: OrderId,
    ) -> Result<Emissions, EngineError> {
        let (side, order) = self.remove_either(trader, order_id)?;
        let mut emissions = Emissions::default();
        emissions.directed.push((trader, Event::canceled(order_id)));
        emissions.depth = self.depth_deltas(&[(side, order.price)]);
        Ok(emissions)
    }

    /// Amend a resting order's quantity. Shrinking (or keeping) the quantity
    /// preserves time priority; growing re-enters the order as a fresh limit
    /// at its price, which may match immediately. Price is not amendable.
    pub fn amend(
        &mut self,
        trader: TraderId,
        order_id: OrderId,
        new_quantity: Qty,
    ) -> Result<Emissions, EngineError> {
        if new_quantity <= 0 {
            return Err(EngineError::Quantity);
        }
        let (side, current) = self
            .bids
            .quantity_of(trader, order_id)
            .map(|q| (Side::Bid, q))
            .or_else(|| self.asks.quantity_of(trader, order_id).map(|q| (Side::Ask, q)))
            .ok_or(EngineError::NotFound)?;

        let mut emissions = Emissions::default();
        if new_quantity <= current {
            let price = self.container_mut(side).reduce(trader, order_id, new_quantity)?;
            emissions.directed.push((trader, Event::new_order(order_id)));
            emissions.depth = self.depth_deltas(&[(side, price)]);
            return Ok(emissions);
        }

        let (side, mut order) = self.remove_either(trader, order_id)?;
        let mut touched = vec![(side, order.price)];
        order.quantity = new_quantity;
        order.time = Instant::now();
        self.match_incoming(&mut order, &mut emissions, &mut touched);
        if order.quantity > 0 {
            emissions
                .directed
                .push((order.trader, Event::new_order(order.order_id)));
            let price = order.price;
            self.container_mut(side).insert(order)?;
            touched.push((side, price));
        }
        emissions.depth = self.depth_deltas(&touched);
        Ok(emissions)
    }

    /// Remove every resting order of `trader`, emitting depth deltas for the
    /// affected levels. Used when a trader unregisters.
    pub fn unregister_trader(&mut self, trader: TraderId) -> Emissions {
        let mut touched = Vec::new();
        for order in self.bids.remove_all(trader) {
            touched.push((Side::Bid, order.price));
        }
        for order in self.asks.remove_all(trader) {
            touched.push((Side::Ask, order.price));
        }
        let mut emissions = Emissions::default();
        emissions.depth = self.depth_deltas(&touched);
        emissions
    }

    /// Full depth snapshot: one record per populated level, bids then asks,
    /// best to worst. Sent to a single requesting sink, not broadcast.
    pub fn depth_snapshot(&self) -> Vec<Event> {
        let level = |side: Side| {
            move |(price, quantity): (Price, Qty)| Event::OrderBook {
                price,
                side,
                quantity,
            }
        };
        self.bids
            .depth_levels()
            .into_iter()
            .map(level(Side::Bid))
            .chain(self.asks.depth_levels().into_iter().map(level(Side::Ask)))
            .collect()
    }

    /// Consume opposite-side liquidity while the incoming order is marketable
    /// and has remaining quantity. Counterparties are taken strictly in
    /// price-time order; each fill trades at the resting order's price.
    fn match_incoming(
        &mut self,
        order: &mut Order,
        emissions: &mut Emissions,
        touched: &mut Vec<(Side, Price)>,
    ) {
        let opposite = order.side.opposite();
        while order.quantity > 0 {
            let (resting_trader, resting_id, resting_price, resting_qty) = {
                match self.container(opposite).top() {
                    Some(top) if marketable(order.side, order.price, top.price) => {
                        (top.trader, top.order_id, top.price, top.quantity)
                    }
                    _ => break,
                }
            };
            let fill = order.quantity.min(resting_qty);
            order.quantity -= fill;
            self.container_mut(opposite).consume_top(fill);
            emissions.directed.push((
                order.trader,
                Event::Trade {
                    order_id: order.order_id,
                    price: resting_price,
                    quantity: fill,
                },
            ));
            emissions.directed.push((
                resting_trader,
                Event::Trade {
                    order_id: resting_id,
                    price: resting_price,
                    quantity: fill,
                },
            ));
            touched.push((opposite, resting_price));
        }
    }

    /// Diff the touched levels against the last-broadcast snapshot; emit one
    /// record per level whose aggregate changed and update the snapshot.
    fn depth_deltas(&mut self, touched: &[(Side, Price)]) -> Vec<Event> {
        let mut deltas = Vec::new();
        let mut seen: Vec<(Side, Price)> = Vec::new();
        for &(side, price) in touched {
            if seen.contains(&(side, price)) {
                continue;
            }
            seen.push((side, price));
            let current = self.container(side).depth_at(price);
            let last = self.broadcast.get(&(side, price)).copied().unwrap_or(0);
            if current == last {
                continue;
            }
            if current == 0 {
                self.broadcast.remove(&(side, price));
            } else {
                self.broadcast.insert((side, price), current);
            }
            deltas.push(Event::OrderBook {
                price,
                side,
                quantity: current,
            });
        }
        deltas
    }

    fn container(&self, side: Side) -> &OrderContainer {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn container_mut(&mut self, side: Side) -> &mut OrderContainer {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn remove_either(
        &mut self,
        trader: TraderId,
        order_id: OrderId,
    ) -> Result<(Side, Order), EngineError> {
        match self.bids.remove(trader, order_id) {
            Ok(order) => Ok((Side::Bid, order)),
            Err(EngineError::NotFound) => {
                let order = self.asks.remove(trader, order_id)?;
                Ok((Side::Ask, order))
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
