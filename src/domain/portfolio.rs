//! Net per-symbol positions and realized P&L rollups.

use serde::Serialize;
use std::collections::BTreeMap;

use super::stats::round_to;
use super::trade::{Side, Trade};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolPosition {
    pub quantity: f64,
    pub total_value: f64,
    pub avg_price: f64,
}

impl SymbolPosition {
    fn apply(&mut self, trade: &Trade) {
        match trade.side {
            Side::Buy => {
                self.quantity += trade.quantity;
                self.total_value += trade.total_value();
            }
            Side::Sell => {
                self.quantity -= trade.quantity;
                self.total_value -= trade.total_value();
            }
        }
        self.avg_price = if self.quantity != 0.0 {
            self.total_value / self.quantity
        } else {
            0.0
        };
    }
}

/// Buys add to and sells subtract from a single running position per
/// symbol. No lot matching, so a net short shows up as negative quantity.
pub fn portfolio_summary(trades: &[Trade]) -> BTreeMap<String, SymbolPosition> {
    let mut positions: BTreeMap<String, SymbolPosition> = BTreeMap::new();
    for trade in trades {
        positions
            .entry(trade.symbol.clone())
            .or_default()
            .apply(trade);
    }
    positions
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolPnl {
    pub count: usize,
    pub pnl: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlBreakdown {
    pub total_profit: f64,
    pub total_loss: f64,
    pub by_symbol: BTreeMap<String, SymbolPnl>,
}

pub fn pnl_breakdown(trades: &[Trade]) -> PnlBreakdown {
    let mut breakdown = PnlBreakdown::default();
    for trade in trades {
        if trade.profit_loss > 0.0 {
            breakdown.total_profit += trade.profit_loss;
        } else {
            breakdown.total_loss += trade.profit_loss;
        }
        let entry = breakdown.by_symbol.entry(trade.symbol.clone()).or_default();
        entry.count += 1;
        entry.pnl += trade.profit_loss;
    }

    breakdown.total_profit = round_to(breakdown.total_profit, 2);
    breakdown.total_loss = round_to(breakdown.total_loss, 2);
    for entry in breakdown.by_symbol.values_mut() {
        entry.pnl = round_to(entry.pnl, 2);
    }
    breakdown
}
