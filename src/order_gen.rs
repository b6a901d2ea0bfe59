//! Synthetic request stream generator.
//!
//! Deterministic, configurable stream of decoded request records for replay
//! tests, demos, and benchmarks. Same seed, same stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::matcher::Matcher;
use crate::types::TraderId;

/// Configuration for the synthetic stream. Ranges are inclusive.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// RNG seed. Same seed produces the same stream.
    pub seed: u64,
    /// Number of messages produced by [`Generator::all_messages`].
    pub num_messages: usize,
    /// Probability of BUY (otherwise SELL).
    pub buy_ratio: f64,
    /// Probability that an order message is a limit (otherwise market).
    pub limit_ratio: f64,
    /// Probability of cancelling a previously generated live order instead
    /// of submitting a new one. Cancels may race fills, so a stream can
    /// legitimately produce `NotFound` error events on replay.
    pub cancel_ratio: f64,
    pub price_min: i64,
    pub price_max: i64,
    pub quantity_min: i64,
    pub quantity_max: i64,
    /// Distinct trader ids used, `1..=num_traders`.
    pub num_traders: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_messages: 1000,
            buy_ratio: 0.5,
            limit_ratio: 0.85,
            cancel_ratio: 0.1,
            price_min: 95,
            price_max: 105,
            quantity_min: 1,
            quantity_max: 100,
            num_traders: 5,
        }
    }
}

/// Deterministic request stream. Each item is the submitting trader and the
/// decoded record, ready for [`Matcher::handle_message`].
pub struct Generator {
    rng: StdRng,
    config: GeneratorConfig,
    next_order_id: u64,
    live: Vec<(TraderId, u64)>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            next_order_id: 1,
            live: Vec::new(),
        }
    }

    /// Produce the next request. Advances the RNG and the live-order pool.
    pub fn next_message(&mut self) -> (TraderId, Value) {
        if !self.live.is_empty() && self.rng.gen::<f64>() < self.config.cancel_ratio {
            let at = self.rng.gen_range(0..self.live.len());
            let (trader, order_id) = self.live.swap_remove(at);
            return (trader, json!({"message": "cancelOrder", "orderId": order_id}));
        }

        let trader = TraderId(self.rng.gen_range(1..=self.config.num_traders.max(1)));
        let side = if self.rng.gen::<f64>() < self.config.buy_ratio {
            "BUY"
        } else {
            "SELL"
        };
        let quantity = self
            .rng
            .gen_range(self.config.quantity_min..=self.config.quantity_max);

        if self.rng.gen::<f64>() < self.config.limit_ratio {
            let order_id = self.next_order_id;
            self.next_order_id += 1;
            let price = self.rng.gen_range(self.config.price_min..=self.config.price_max);
            self.live.push((trader, order_id));
            (
                trader,
                json!({
                    "message": "createOrder",
                    "side": side,
                    "orderId": order_id,
                    "price": price,
                    "quantity": quantity,
                }),
            )
        } else {
            (
                trader,
                json!({"message": "createMarketOrder", "side": side, "quantity": quantity}),
            )
        }
    }

    pub fn take_messages(&mut self, n: usize) -> Vec<(TraderId, Value)> {
        (0..n).map(|_| self.next_message()).collect()
    }

    /// The full stream, `config.num_messages` long.
    pub fn all_messages(&mut self) -> Vec<(TraderId, Value)> {
        self.take_messages(self.config.num_messages)
    }
}

/// Replay a stream into `matcher`. Traders must already be registered.
/// Returns the number of messages dispatched.
pub fn replay(
    matcher: &mut Matcher,
    messages: impl IntoIterator<Item = (TraderId, Value)>,
) -> Result<usize, EngineError> {
    let mut dispatched = 0;
    for (trader, message) in messages {
        matcher.handle_message(trader, &message)?;
        dispatched += 1;
    }
    Ok(dispatched)
}
