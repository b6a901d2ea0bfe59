//! Core identifiers, price/quantity scalars, and side semantics.
//!
//! All identifiers are newtype wrappers. [`Side`] carries the bid/ask
//! semantics used throughout the book: comparison direction, market price
//! sentinels, and the marketability test.

/// Price in integer ticks. Tick size and currency are out-of-band.
pub type Price = i64;

/// Order quantity in whole units.
pub type Qty = i64;

/// Order identifier, unique per trader. Market orders carry [`OrderId::MARKET`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
    /// Sentinel id used by market orders, which never rest and are never indexed.
    pub const MARKET: OrderId = OrderId(0);
}

/// Trader identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TraderId(pub u64);

/// Book side. Bids prefer higher prices, asks lower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Side {
    #[serde(rename = "BID")]
    Bid,
    #[serde(rename = "ASK")]
    Ask,
}

impl Side {
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    pub fn is_ask(self) -> bool {
        matches!(self, Side::Ask)
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Price a market order carries so it crosses every resting level.
    pub fn market_sentinel(self) -> Price {
        match self {
            Side::Bid => Price::MAX,
            Side::Ask => Price::MIN,
        }
    }

    /// True when `a` is a strictly better price than `b` on this side.
    pub fn better(self, a: Price, b: Price) -> bool {
        match self {
            Side::Bid => a > b,
            Side::Ask => a < b,
        }
    }

    /// Parse the inbound wire label (`"BUY"` / `"SELL"`).
    pub fn from_wire(label: &str) -> Option<Side> {
        match label {
            "BUY" => Some(Side::Bid),
            "SELL" => Some(Side::Ask),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

/// True iff an order at `own_price` on `own_side` crosses a resting order at
/// `resting_price` on the opposite side. Market sentinels cross trivially.
pub fn marketable(own_side: Side, own_price: Price, resting_price: Price) -> bool {
    match own_side {
        Side::Bid => own_price >= resting_price,
        Side::Ask => own_price <= resting_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_flips_side() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
    }

    #[test]
    fn marketable_crossed_prices() {
        assert!(marketable(Side::Bid, 100, 99));
        assert!(marketable(Side::Bid, 100, 100));
        assert!(!marketable(Side::Bid, 100, 101));
        assert!(marketable(Side::Ask, 99, 100));
        assert!(marketable(Side::Ask, 100, 100));
        assert!(!marketable(Side::Ask, 101, 100));
    }

    #[test]
    fn market_sentinels_cross_everything() {
        assert!(marketable(Side::Bid, Side::Bid.market_sentinel(), Price::MAX - 1));
        assert!(marketable(Side::Ask, Side::Ask.market_sentinel(), Price::MIN + 1));
    }

    #[test]
    fn better_follows_side_direction() {
        assert!(Side::Bid.better(101, 100));
        assert!(!Side::Bid.better(100, 101));
        assert!(Side::Ask.better(100, 101));
        assert!(!Side::Ask.better(101, 100));
    }

    #[test]
    fn wire_labels_parse() {
        assert_eq!(Side::from_wire("BUY"), Some(Side::Bid));
        assert_eq!(Side::from_wire("SELL"), Some(Side::Ask));
        assert_eq!(Side::from_wire("buy"), None);
    }
}
