//! Sizing & pricing engine — how much to trade this cycle and at what prices.
//!
//! Pure computation, no I/O. Each cycle the remaining distance to the target
//! is scaled by how much of the expected session volume has already printed
//! (the participation cap). That cycle size is then split between an *active*
//! leg priced to cross the spread and a *passive* leg priced to join the
//! same-side queue. The active share grows linearly with session progress, so
//! early cycles are mostly patient and late cycles mostly urgent.
//!
//! ```text
//! cap       = clamp(market_volume / expected_volume, 0, 1)
//! remaining = |target - position|
//! total     = remaining * cap
//! active    = round_half_even(total * progress)
//! passive   = total - active
//! ```
//!
//! The trade side comes from the sign of the target alone. It is never
//! re-derived from the remaining difference, so a run that overshoots keeps
//! trading in the original direction.

use rit_core::enums::{Side, Urgency};
use rit_core::market_data::{BookSnapshot, PositionSnapshot};
use rit_core::trading::{ExecutionTarget, OrderIntent};

/// Result of one sizing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    /// Position already equals the target; the run is complete.
    Done,
    /// Trade this cycle according to the plan.
    Trade(SizingPlan),
}

/// Per-cycle sizing decision. Quantities are fractional until submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingPlan {
    pub side: Side,
    /// Same-side best: bid when buying, ask when selling.
    pub passive_price: f64,
    /// Opposite best: ask when buying, bid when selling.
    pub active_price: f64,
    /// Fraction of expected volume printed so far, in `[0, 1]`.
    pub participation_cap: f64,
    /// `|target - position|`.
    pub remaining: f64,
    /// `remaining * participation_cap`.
    pub total_size: f64,
    pub active_qty: f64,
    /// `total_size - active_qty`, not rounded separately.
    pub passive_qty: f64,
}

/// Compute this cycle's sizing.
///
/// `progress` is clamped to `[0, 1]`.
pub fn size(
    target: &ExecutionTarget,
    position: &PositionSnapshot,
    book: &BookSnapshot,
    progress: f64,
) -> Sizing {
    let goal = target.target_position as f64;
    if position.position == goal {
        return Sizing::Done;
    }

    let side = Side::from_target(target.target_position);
    let (passive_price, active_price) = match side {
        Side::Buy => (book.bid_price, book.ask_price),
        Side::Sell => (book.ask_price, book.bid_price),
    };

    let participation_cap = participation_cap(position.market_volume, target.expected_volume);
    let remaining = (goal - position.position).abs();
    let total_size = remaining * participation_cap;
    let active_qty = (total_size * progress.clamp(0.0, 1.0)).round_ties_even();
    let passive_qty = total_size - active_qty;

    Sizing::Trade(SizingPlan {
        side,
        passive_price,
        active_price,
        participation_cap,
        remaining,
        total_size,
        active_qty,
        passive_qty,
    })
}

/// `market_volume / expected_volume`, clamped to `[0, 1]`.
///
/// A non-positive or non-finite ratio (e.g. zero expected volume) yields 0.
pub fn participation_cap(market_volume: f64, expected_volume: f64) -> f64 {
    let ratio = market_volume / expected_volume;
    if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 }
}

impl SizingPlan {
    /// Turn the plan into whole-share limit orders, active leg first.
    ///
    /// Each leg is truncated toward zero; a leg below one share is dropped.
    /// With `max_order_size`, a leg is split into orders of at most that size.
    pub fn intents(&self, ticker: &str, max_order_size: Option<u64>) -> Vec<OrderIntent> {
        let mut out = Vec::new();
        let legs = [
            (Urgency::Active, self.active_qty, self.active_price),
            (Urgency::Passive, self.passive_qty, self.passive_price),
        ];

        for (urgency, qty, price) in legs {
            let mut shares = whole_shares(qty);
            while shares > 0 {
                let chunk = max_order_size.map_or(shares, |cap| shares.min(cap));
                out.push(OrderIntent {
                    ticker: ticker.to_string(),
                    quantity: chunk,
                    side: self.side,
                    price,
                    urgency,
                });
                shares -= chunk;
            }
        }
        out
    }
}

/// Truncate a fractional quantity to whole shares; negatives and NaN become 0.
fn whole_shares(qty: f64) -> u64 {
    if qty.is_finite() && qty >= 1.0 { qty.trunc() as u64 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> BookSnapshot {
        BookSnapshot { bid_price: 9.99, bid_size: 500.0, ask_price: 10.01, ask_size: 500.0 }
    }

    fn target(target_position: i64, expected_volume: f64) -> ExecutionTarget {
        ExecutionTarget { target_position, expected_volume }
    }

    fn pos(position: f64, market_volume: f64) -> PositionSnapshot {
        PositionSnapshot { position, market_volume }
    }

    fn plan(s: Sizing) -> SizingPlan {
        match s {
            Sizing::Trade(p) => p,
            Sizing::Done => panic!("expected a trade plan"),
        }
    }

    #[test]
    fn reference_buy_scenario() {
        let p = plan(size(&target(100_000, 1_050_000.0), &pos(0.0, 500_000.0), &book(), 0.4));

        assert_eq!(p.side, Side::Buy);
        assert_eq!(p.active_price, 10.01);
        assert_eq!(p.passive_price, 9.99);
        assert!((p.participation_cap - 0.476_190).abs() < 1e-6);
        assert_eq!(p.remaining, 100_000.0);
        assert!((p.total_size - 47_619.047).abs() < 1e-3);
        assert_eq!(p.active_qty, 19_048.0);
        assert!((p.passive_qty - 28_571.047).abs() < 1e-3);
    }

    #[test]
    fn done_when_position_equals_target() {
        let s = size(&target(-50_000, 1_050_000.0), &pos(-50_000.0, 900_000.0), &book(), 0.7);
        assert_eq!(s, Sizing::Done);
    }

    #[test]
    fn sell_prices_mirror_buy_prices() {
        let p = plan(size(&target(-50_000, 1_000_000.0), &pos(0.0, 100_000.0), &book(), 0.5));
        assert_eq!(p.side, Side::Sell);
        assert_eq!(p.passive_price, 10.01);
        assert_eq!(p.active_price, 9.99);
    }

    #[test]
    fn overshoot_keeps_original_side() {
        // Bought past a long target: still BUY, sized on the absolute distance.
        let p = plan(size(&target(1_000, 1_000.0), &pos(1_200.0, 1_000.0), &book(), 0.5));
        assert_eq!(p.side, Side::Buy);
        assert_eq!(p.remaining, 200.0);
    }

    #[test]
    fn cap_saturates_at_one() {
        let p = plan(size(&target(10_000, 1_000.0), &pos(0.0, 50_000.0), &book(), 0.0));
        assert_eq!(p.participation_cap, 1.0);
        assert_eq!(p.total_size, 10_000.0);
        assert_eq!(p.active_qty, 0.0);
        assert_eq!(p.passive_qty, 10_000.0);
    }

    #[test]
    fn degenerate_expected_volume_gives_zero_cap() {
        assert_eq!(participation_cap(500.0, 0.0), 0.0);
        assert_eq!(participation_cap(0.0, 0.0), 0.0);
        assert_eq!(participation_cap(-5.0, 100.0), 0.0);
    }

    #[test]
    fn intents_truncate_and_order_active_first() {
        let p = plan(size(&target(100_000, 1_050_000.0), &pos(0.0, 500_000.0), &book(), 0.4));
        let intents = p.intents("MC", None);

        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].urgency, Urgency::Active);
        assert_eq!(intents[0].quantity, 19_048);
        assert_eq!(intents[0].price, 10.01);
        assert_eq!(intents[1].urgency, Urgency::Passive);
        assert_eq!(intents[1].quantity, 28_571);
        assert_eq!(intents[1].price, 9.99);
        assert!(intents.iter().all(|o| o.side == Side::Buy && o.ticker == "MC"));
    }

    #[test]
    fn intents_split_at_max_order_size() {
        let p = plan(size(&target(100_000, 1_050_000.0), &pos(0.0, 500_000.0), &book(), 0.4));
        let intents = p.intents("MC", Some(10_000));

        let active: Vec<u64> =
            intents.iter().filter(|o| o.urgency == Urgency::Active).map(|o| o.quantity).collect();
        let passive: Vec<u64> =
            intents.iter().filter(|o| o.urgency == Urgency::Passive).map(|o| o.quantity).collect();
        assert_eq!(active, vec![10_000, 9_048]);
        assert_eq!(passive, vec![10_000, 10_000, 8_571]);
    }

    #[test]
    fn active_leg_rounds_half_to_even() {
        // remaining 5 at full participation, half way through: 2.5 → 2.
        let p = plan(size(&target(5, 100.0), &pos(0.0, 100.0), &book(), 0.5));
        assert_eq!(p.active_qty, 2.0);
        assert_eq!(p.passive_qty, 3.0);

        // 3.5 → 4.
        let p = plan(size(&target(7, 100.0), &pos(0.0, 100.0), &book(), 0.5));
        assert_eq!(p.active_qty, 4.0);
        assert_eq!(p.passive_qty, 3.0);
    }

    #[test]
    fn sub_share_legs_are_dropped() {
        // remaining 1 share at 40% participation → 0.4 shares, nothing to send.
        let p = plan(size(&target(1, 100.0), &pos(0.0, 40.0), &book(), 0.2));
        assert!(p.intents("MC", None).is_empty());
    }
}
