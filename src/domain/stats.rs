//! Trade statistics recomputed from a user's full trade set on every call.

use chrono::{DateTime, Months, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::trade::{Trade, TradeId};

pub const NO_STRATEGY: &str = "No Strategy";
pub const MONTHLY_WINDOW: u32 = 6;

/// Round to `places` decimals with halves going toward positive infinity,
/// so `-0.125` becomes `-0.12`.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor + 0.5).floor() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicStats {
    pub total_trades: usize,
    pub closed_trades: usize,
    pub win_rate: f64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeHighlight {
    pub id: TradeId,
    pub symbol: String,
    pub profit_loss: f64,
    pub date: DateTime<Utc>,
}

impl TradeHighlight {
    fn from_trade(trade: &Trade) -> Self {
        Self {
            id: trade.id,
            symbol: trade.symbol.clone(),
            profit_loss: round_to(trade.profit_loss, 2),
            date: trade.date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyBreakdown {
    pub strategy: String,
    pub count: usize,
    pub pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBreakdown {
    pub month: String,
    pub count: usize,
    pub pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStats {
    pub total_trades: usize,
    pub open_trades: usize,
    pub closed_trades: usize,
    pub win_rate: f64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    #[serde(rename = "avgRR")]
    pub avg_rr: f64,
    pub best_trade: Option<TradeHighlight>,
    pub worst_trade: Option<TradeHighlight>,
    pub trades_by_strategy: IndexMap<String, StrategyBreakdown>,
    pub trades_by_month: Vec<MonthlyBreakdown>,
}

impl DetailedStats {
    pub fn empty() -> Self {
        Self {
            total_trades: 0,
            open_trades: 0,
            closed_trades: 0,
            win_rate: 0.0,
            total_pnl: 0.0,
            avg_rr: 0.0,
            best_trade: None,
            worst_trade: None,
            trades_by_strategy: IndexMap::new(),
            trades_by_month: Vec::new(),
        }
    }
}

fn win_rate(closed: &[&Trade]) -> f64 {
    if closed.is_empty() {
        return 0.0;
    }
    let winners = closed.iter().filter(|t| t.profit_loss > 0.0).count();
    winners as f64 / closed.len() as f64 * 100.0
}

fn total_pnl(trades: &[Trade]) -> f64 {
    trades.iter().map(|t| t.profit_loss).sum()
}

pub fn basic_stats(trades: &[Trade]) -> BasicStats {
    let closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
    BasicStats {
        total_trades: trades.len(),
        closed_trades: closed.len(),
        win_rate: round_to(win_rate(&closed), 2),
        total_pnl: round_to(total_pnl(trades), 2),
    }
}

/// Full statistics view. `trades` order matters: best/worst ties go to
/// the earliest trade in the slice.
pub fn detailed_stats(trades: &[Trade], now: DateTime<Utc>) -> DetailedStats {
    if trades.is_empty() {
        return DetailedStats::empty();
    }

    let closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
    let open_trades = trades.len() - closed.len();

    // Simplified reward proxy: winners contribute |pnl / entry|, others 0.
    let avg_rr = if closed.is_empty() {
        0.0
    } else {
        let sum: f64 = closed
            .iter()
            .map(|t| {
                if t.profit_loss > 0.0 {
                    (t.profit_loss / t.entry_price).abs()
                } else {
                    0.0
                }
            })
            .sum();
        sum / closed.len() as f64
    };

    let mut best: Option<&Trade> = None;
    let mut worst: Option<&Trade> = None;
    for trade in closed.iter().copied().filter(|t| t.profit_loss != 0.0) {
        if best.is_none_or(|b| trade.profit_loss > b.profit_loss) {
            best = Some(trade);
        }
        if worst.is_none_or(|w| trade.profit_loss < w.profit_loss) {
            worst = Some(trade);
        }
    }

    DetailedStats {
        total_trades: trades.len(),
        open_trades,
        closed_trades: closed.len(),
        win_rate: round_to(win_rate(&closed), 2),
        total_pnl: round_to(total_pnl(trades), 2),
        avg_rr: round_to(avg_rr, 4),
        best_trade: best.map(TradeHighlight::from_trade),
        worst_trade: worst.map(TradeHighlight::from_trade),
        trades_by_strategy: by_strategy(trades),
        trades_by_month: by_month(trades, now),
    }
}

pub fn by_strategy(trades: &[Trade]) -> IndexMap<String, StrategyBreakdown> {
    let mut groups: IndexMap<String, (usize, f64)> = IndexMap::new();
    for trade in trades {
        let key = trade.strategy_tag.as_deref().unwrap_or(NO_STRATEGY);
        let entry = groups.entry(key.to_string()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += trade.profit_loss;
    }
    groups
        .into_iter()
        .map(|(strategy, (count, pnl))| {
            let breakdown = StrategyBreakdown {
                strategy: strategy.clone(),
                count,
                pnl: round_to(pnl, 2),
            };
            (strategy, breakdown)
        })
        .collect()
}

/// Monthly rollup over the trailing window, ascending by `YYYY-MM`.
pub fn by_month(trades: &[Trade], now: DateTime<Utc>) -> Vec<MonthlyBreakdown> {
    let cutoff = now
        .checked_sub_months(Months::new(MONTHLY_WINDOW))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut groups: IndexMap<String, (usize, f64)> = IndexMap::new();
    for trade in trades.iter().filter(|t| t.date >= cutoff) {
        let entry = groups
            .entry(trade.date.format("%Y-%m").to_string())
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += trade.profit_loss;
    }

    let mut months: Vec<MonthlyBreakdown> = groups
        .into_iter()
        .map(|(month, (count, pnl))| MonthlyBreakdown {
            month,
            count,
            pnl: round_to(pnl, 2),
        })
        .collect();
    months.sort_by(|a, b| a.month.cmp(&b.month));
    months
}
