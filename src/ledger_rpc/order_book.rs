//! Order-book aggregation.
//!
//! Each raw offer becomes an `(offered, requested, price)` entry. The offer
//! list is truncated to `limit` entries *before* it is sorted, so the first
//! entry is the best price among the first `limit` raw offers only, not the
//! best price on the book.

use super::ledger_types::{Asset, LedgerAmount, RawOffer};
use log::warn;
use serde::{Deserialize, Serialize};

pub const DISPLAY_DECIMALS: i32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub offered: f64,
    pub requested: f64,
    pub price: f64,
}

/// Round half away from zero to `decimals` places.
pub fn round_to(n: f64, decimals: i32) -> f64 {
    let m = 10f64.powi(decimals);
    (n * m).round() / m
}

/// Converts one offer; `None` when a side is unparsable or the offered side
/// rounds to zero.
pub fn to_entry(offer: &RawOffer) -> Option<OrderBookEntry> {
    let offered = round_to(offer.taker_pays.human_value()?, DISPLAY_DECIMALS);
    let requested = round_to(offer.taker_gets.human_value()?, DISPLAY_DECIMALS);
    if offered == 0.0 {
        return None;
    }
    Some(OrderBookEntry {
        offered,
        requested,
        price: round_to(requested / offered, DISPLAY_DECIMALS),
    })
}

// Native sides must arrive as drops. A side without an issuer on either end
// matches on currency alone.
fn side_matches(amount: &LedgerAmount, asset: &Asset) -> bool {
    if amount.is_native() || asset.is_native() {
        return amount.is_native() && asset.is_native();
    }
    if amount.currency() != asset.currency {
        return false;
    }
    match (amount, asset.issuer.as_deref()) {
        (LedgerAmount::Issued(issued), Some(issuer)) => {
            issued.issuer.as_deref().is_none_or(|i| i == issuer)
        }
        _ => true,
    }
}

/// Aggregates `offers` for the pair (`offered`, `requested`). Offers for any
/// other pair are skipped; they still count against `limit`.
///
/// Ties in price keep their input order.
pub fn aggregate(
    offers: &[RawOffer],
    offered: &Asset,
    requested: &Asset,
    limit: usize,
) -> Vec<OrderBookEntry> {
    let mut entries: Vec<OrderBookEntry> = offers
        .iter()
        .take(limit)
        .filter_map(|offer| {
            if !side_matches(&offer.taker_pays, offered)
                || !side_matches(&offer.taker_gets, requested)
            {
                warn!(
                    "skipping offer {}/{} outside requested pair {}/{}",
                    offer.taker_pays.currency(),
                    offer.taker_gets.currency(),
                    offered,
                    requested
                );
                return None;
            }
            let entry = to_entry(offer);
            if entry.is_none() {
                warn!("skipping unusable offer {:?}", offer);
            }
            entry
        })
        .collect();
    entries.sort_by(|a, b| a.price.total_cmp(&b.price));
    entries
}
