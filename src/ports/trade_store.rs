//! Trade persistence port.
//!
//! Every lookup is scoped by owner, so a trade belonging to someone else
//! is indistinguishable from one that does not exist.

use chrono::{DateTime, Utc};

use crate::domain::error::JournalError;
use crate::domain::query::TradeQuery;
use crate::domain::trade::{NewTrade, Trade, TradeId, UserId};

pub trait TradeStore {
    fn insert_trade(
        &self,
        owner: UserId,
        trade: &NewTrade,
        now: DateTime<Utc>,
    ) -> Result<Trade, JournalError>;

    /// Insert a batch atomically: either every trade lands or none does.
    fn insert_trades(
        &self,
        owner: UserId,
        trades: &[NewTrade],
        now: DateTime<Utc>,
    ) -> Result<Vec<Trade>, JournalError>;

    fn find_trade(&self, owner: UserId, id: TradeId) -> Result<Option<Trade>, JournalError>;

    /// Persist the mutable fields of `trade`. Returns false when no row
    /// matched `(trade.id, trade.user_id)`.
    fn save_trade(&self, trade: &Trade, now: DateTime<Utc>) -> Result<bool, JournalError>;

    /// Persist several trades of one owner in a single transaction.
    fn save_trades(
        &self,
        owner: UserId,
        trades: &[Trade],
        now: DateTime<Utc>,
    ) -> Result<usize, JournalError>;

    fn delete_trade(&self, owner: UserId, id: TradeId) -> Result<bool, JournalError>;

    /// One page of trades matching `query`, plus the total match count.
    fn list_trades(
        &self,
        owner: UserId,
        query: &TradeQuery,
    ) -> Result<(Vec<Trade>, u64), JournalError>;

    /// Every trade of `owner`, newest first.
    fn all_trades(&self, owner: UserId) -> Result<Vec<Trade>, JournalError>;
}
