//! Per-side container of resting orders: price-ordered levels, FIFO within a
//! level, plus a `(trader, orderId)` identity index.
//!
//! Each price level is a FIFO vector, so time priority within a level is the
//! insertion order and stays stable even if two orders carry an identical
//! construction instant. Every order appears in both the level map and the
//! identity index; removal by either key removes it from both. An empty price
//! level has no entry.

use std::collections::{BTreeMap, HashMap};

use crate::error::EngineError;
use crate::order::Order;
use crate::types::{OrderId, Price, Qty, Side, TraderId};

/// Price-time container for one side of the book.
#[derive(Debug)]
pub struct OrderContainer {
    side: Side,
    levels: BTreeMap<Price, Vec<Order>>,
    index: HashMap<(TraderId, OrderId), Price>,
}

impl OrderContainer {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn contains(&self, trader: TraderId, order_id: OrderId) -> bool {
        self.index.contains_key(&(trader, order_id))
    }

    /// Number of resting orders.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Insert at the back of the order's price level.
    pub fn insert(&mut self, order: Order) -> Result<(), EngineError> {
        if self.index.contains_key(&order.key()) {
            return Err(EngineError::DuplicateOrderId);
        }
        self.index.insert(order.key(), order.price);
        self.levels.entry(order.price).or_default().push(order);
        Ok(())
    }

    /// Remove by identity key, pruning the level if it empties.
    pub fn remove(&mut self, trader: TraderId, order_id: OrderId) -> Result<Order, EngineError> {
        let price = self
            .index
            .remove(&(trader, order_id))
            .ok_or(EngineError::NotFound)?;
        let queue = self.levels.get_mut(&price).ok_or(EngineError::NotFound)?;
        let pos = queue
            .iter()
            .position(|o| o.key() == (trader, order_id))
            .ok_or(EngineError::NotFound)?;
        let order = queue.remove(pos);
        if queue.is_empty() {
            self.levels.remove(&price);
        }
        Ok(order)
    }

    /// Remove every resting order belonging to `trader`. Returns them in
    /// priority order.
    pub fn remove_all(&mut self, trader: TraderId) -> Vec<Order> {
        let ids: Vec<OrderId> = self
            .iter()
            .filter(|o| o.trader == trader)
            .map(|o| o.order_id)
            .collect();
        let mut removed = Vec::with_capacity(ids.len());
        for order_id in ids {
            if let Ok(order) = self.remove(trader, order_id) {
                removed.push(order);
            }
        }
        removed
    }

    /// Highest-priority resting order, if any.
    pub fn top(&self) -> Option<&Order> {
        let queue = match self.side {
            Side::Bid => self.levels.values().next_back(),
            Side::Ask => self.levels.values().next(),
        };
        queue.and_then(|q| q.first())
    }

    /// Decrement the top order by `fill`; remove it when it reaches zero.
    /// Callers obtain `fill` from [`OrderContainer::top`], so `fill` never
    /// exceeds the top's remaining quantity.
    pub fn consume_top(&mut self, fill: Qty) {
        let entry = match self.side {
            Side::Bid => self.levels.iter_mut().next_back(),
            Side::Ask => self.levels.iter_mut().next(),
        };
        let Some((&price, queue)) = entry else {
            return;
        };
        let Some(top) = queue.first_mut() else {
            return;
        };
        if fill < top.quantity {
            top.quantity -= fill;
            return;
        }
        let key = top.key();
        queue.remove(0);
        self.index.remove(&key);
        if queue.is_empty() {
            self.levels.remove(&price);
        }
    }

    /// Shrink an order in place, keeping its position in the level queue.
    pub fn reduce(
        &mut self,
        trader: TraderId,
        order_id: OrderId,
        new_quantity: Qty,
    ) -> Result<Price, EngineError> {
        let price = *self
            .index
            .get(&(trader, order_id))
            .ok_or(EngineError::NotFound)?;
        let order = self
            .levels
            .get_mut(&price)
            .and_then(|q| q.iter_mut().find(|o| o.key() == (trader, order_id)))
            .ok_or(EngineError::NotFound)?;
        order.quantity = new_quantity;
        Ok(price)
    }

    /// Current quantity of a resting order.
    pub fn quantity_of(&self, trader: TraderId, order_id: OrderId) -> Option<Qty> {
        let price = self.index.get(&(trader, order_id))?;
        self.levels
            .get(price)?
            .iter()
            .find(|o| o.key() == (trader, order_id))
            .map(|o| o.quantity)
    }

    /// Aggregate resting quantity at `price`; zero if the level is absent.
    pub fn depth_at(&self, price: Price) -> Qty {
        self.levels
            .get(&price)
            .map(|q| q.iter().map(|o| o.quantity).sum())
            .unwrap_or(0)
    }

    /// `(price, aggregate quantity)` per level, best to worst.
    pub fn depth_levels(&self) -> Vec<(Price, Qty)> {
        let summed = |(price, queue): (&Price, &Vec<Order>)| {
            (*price, queue.iter().map(|o| o.quantity).sum())
        };
        match self.side {
            Side::Bid => self.levels.iter().rev().map(summed).collect(),
            Side::Ask => self.levels.iter().map(summed).collect(),
        }
    }

    /// Resting orders in priority order: best price first, FIFO within a level.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Order> + '_> {
        match self.side {
            Side::Bid => Box::new(self.levels.values().rev().flatten()),
            Side::Ask => Box::new(self.levels.values().flatten()),
        }
    }
}
