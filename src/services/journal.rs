//! Trade journal service: lifecycle writes and statistics reads over a
//! [`TradeStore`], always scoped to one owner.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::error::JournalError;
use crate::domain::portfolio::{self, PnlBreakdown, SymbolPosition};
use crate::domain::query::{Page, Pagination, TradeQuery};
use crate::domain::stats::{self, BasicStats, DetailedStats};
use crate::domain::trade::{CreateTrade, NewTrade, Trade, TradeId, UpdateTrade, UserId};
use crate::ports::trade_store::TradeStore;

use super::Clock;

#[derive(Clone)]
pub struct TradeJournal {
    store: Arc<dyn TradeStore + Send + Sync>,
    clock: Clock,
}

impl TradeJournal {
    pub fn new(store: Arc<dyn TradeStore + Send + Sync>) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn create_trade(&self, owner: UserId, input: CreateTrade) -> Result<Trade, JournalError> {
        let now = self.now();
        let new_trade = input.validate(now)?;
        let trade = self.store.insert_trade(owner, &new_trade, now)?;
        tracing::info!(
            user = owner,
            trade = trade.id,
            symbol = %trade.symbol,
            status = %trade.status,
            "trade created"
        );
        Ok(trade)
    }

    /// Validate every row before writing any. Rows are `(line, input)` so
    /// a rejection can point back at the source line.
    pub fn import_trades(
        &self,
        owner: UserId,
        rows: Vec<(u64, CreateTrade)>,
    ) -> Result<Vec<Trade>, JournalError> {
        let now = self.now();
        let validated: Vec<NewTrade> = rows
            .into_iter()
            .map(|(line, input)| {
                input.validate(now).map_err(|e| JournalError::Import {
                    line,
                    reason: e.to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
        let trades = self.store.insert_trades(owner, &validated, now)?;
        tracing::info!(user = owner, count = trades.len(), "trades imported");
        Ok(trades)
    }

    pub fn get_trade(&self, owner: UserId, id: TradeId) -> Result<Trade, JournalError> {
        self.store
            .find_trade(owner, id)?
            .ok_or(JournalError::NotFound { resource: "Trade" })
    }

    pub fn list_trades(
        &self,
        owner: UserId,
        query: &TradeQuery,
    ) -> Result<Page<Trade>, JournalError> {
        let (trades, total_count) = self.store.list_trades(owner, query)?;
        tracing::debug!(user = owner, total_count, page = query.page, "trades listed");
        Ok(Page {
            trades,
            pagination: Pagination::new(query.page, query.page_size, total_count),
        })
    }

    pub fn update_trade(
        &self,
        owner: UserId,
        id: TradeId,
        update: UpdateTrade,
    ) -> Result<Trade, JournalError> {
        let current = self.get_trade(owner, id)?;
        let updated = update.apply(&current)?;
        if !self.store.save_trade(&updated, self.now())? {
            return Err(JournalError::NotFound { resource: "Trade" });
        }
        // Re-read so the caller sees timestamps at storage precision.
        let stored = self.get_trade(owner, id)?;
        tracing::info!(user = owner, trade = id, status = %stored.status, "trade updated");
        Ok(stored)
    }

    pub fn delete_trade(&self, owner: UserId, id: TradeId) -> Result<(), JournalError> {
        if !self.store.delete_trade(owner, id)? {
            return Err(JournalError::NotFound { resource: "Trade" });
        }
        tracing::info!(user = owner, trade = id, "trade deleted");
        Ok(())
    }

    /// Recompute P&L for every trade that has both prices and force it
    /// closed. Returns how many trades qualified.
    pub fn recalculate_all(&self, owner: UserId) -> Result<usize, JournalError> {
        let mut trades = self.store.all_trades(owner)?;
        trades.retain_mut(Trade::recalculate);
        let now = self.now();
        self.store.save_trades(owner, &trades, now)?;
        tracing::info!(user = owner, updated = trades.len(), "trades recalculated");
        Ok(trades.len())
    }

    pub fn basic_stats(&self, owner: UserId) -> Result<BasicStats, JournalError> {
        Ok(stats::basic_stats(&self.store.all_trades(owner)?))
    }

    pub fn detailed_stats(&self, owner: UserId) -> Result<DetailedStats, JournalError> {
        let trades = self.store.all_trades(owner)?;
        Ok(stats::detailed_stats(&trades, self.now()))
    }

    pub fn portfolio_summary(
        &self,
        owner: UserId,
    ) -> Result<BTreeMap<String, SymbolPosition>, JournalError> {
        Ok(portfolio::portfolio_summary(&self.store.all_trades(owner)?))
    }

    pub fn pnl_breakdown(&self, owner: UserId) -> Result<PnlBreakdown, JournalError> {
        Ok(portfolio::pnl_breakdown(&self.store.all_trades(owner)?))
    }
}
