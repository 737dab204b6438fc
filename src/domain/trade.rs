//! Trade records and their lifecycle.
//!
//! A trade is written through [`CreateTrade::validate`] or
//! [`UpdateTrade::apply`]; both end by re-deriving `profit_loss` and
//! `status` so the stored record can never carry a stale P&L.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::JournalError;

pub type TradeId = i64;
pub type UserId = i64;

/// Smallest value accepted for prices and quantities.
pub const MIN_POSITIVE: f64 = 1e-12;
pub const MAX_NOTES_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl FromStr for Side {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(JournalError::validation(
                "side",
                "Side must be either buy or sell",
            )),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::Closed => "closed",
        }
    }
}

impl FromStr for TradeStatus {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TradeStatus::Open),
            "closed" => Ok(TradeStatus::Closed),
            _ => Err(JournalError::validation(
                "status",
                "Status must be either open or closed",
            )),
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Realized P&L of a position. A sell is a short and profits when price falls.
pub fn profit_loss(side: Side, entry_price: f64, exit_price: f64, quantity: f64) -> f64 {
    match side {
        Side::Sell => (entry_price - exit_price) * quantity,
        Side::Buy => (exit_price - entry_price) * quantity,
    }
}

fn outcome(
    side: Side,
    entry_price: f64,
    exit_price: Option<f64>,
    quantity: f64,
) -> (f64, TradeStatus) {
    match exit_price {
        Some(exit) => (
            profit_loss(side, entry_price, exit, quantity),
            TradeStatus::Closed,
        ),
        None => (0.0, TradeStatus::Open),
    }
}

/// A persisted trade, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: TradeId,
    pub user_id: UserId,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub date: DateTime<Utc>,
    pub strategy_tag: Option<String>,
    pub notes: Option<String>,
    pub profit_loss: f64,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Notional value at entry, used by the portfolio summary.
    pub fn total_value(&self) -> f64 {
        self.entry_price * self.quantity
    }

    /// Recompute `profit_loss` and `status` from the price fields.
    pub fn derive_outcome(&mut self) {
        let (pnl, status) = outcome(self.side, self.entry_price, self.exit_price, self.quantity);
        self.profit_loss = pnl;
        self.status = status;
    }

    /// Explicit reopen: drops the exit price and any realized P&L.
    pub fn reopen(&mut self) {
        self.exit_price = None;
        self.profit_loss = 0.0;
        self.status = TradeStatus::Open;
    }

    /// Repair pass used by bulk recalculation. Trades without an exit
    /// price are left alone; returns whether the trade was recomputed.
    pub fn recalculate(&mut self) -> bool {
        match self.exit_price {
            Some(exit) => {
                self.profit_loss = profit_loss(self.side, self.entry_price, exit, self.quantity);
                self.status = TradeStatus::Closed;
                true
            }
            None => false,
        }
    }
}

/// A validated trade ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub date: DateTime<Utc>,
    pub strategy_tag: Option<String>,
    pub notes: Option<String>,
    pub profit_loss: f64,
    pub status: TradeStatus,
}

/// Request body for creating a trade. Everything is optional at the
/// type level so missing fields surface as field-level validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrade {
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub date: Option<String>,
    pub strategy_tag: Option<String>,
    pub notes: Option<String>,
}

impl CreateTrade {
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewTrade, JournalError> {
        let symbol = normalize_symbol(self.symbol.as_deref().unwrap_or(""))?;
        let side: Side = self
            .side
            .as_deref()
            .ok_or_else(|| JournalError::validation("side", "Please specify trade side"))?
            .parse()?;
        let entry_price = positive(
            "entryPrice",
            "Entry price",
            self.entry_price
                .ok_or_else(|| JournalError::validation("entryPrice", "Please add entry price"))?,
        )?;
        let quantity = positive(
            "quantity",
            "Quantity",
            self.quantity
                .ok_or_else(|| JournalError::validation("quantity", "Please add quantity"))?,
        )?;
        let exit_price = self
            .exit_price
            .map(|v| positive("exitPrice", "Exit price", v))
            .transpose()?;
        let date = match self.date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_trade_date("date", raw)?,
            _ => now,
        };
        let strategy_tag = normalize_tag(self.strategy_tag);
        let notes = normalize_notes(self.notes)?;

        let (profit_loss, status) = outcome(side, entry_price, exit_price, quantity);
        Ok(NewTrade {
            symbol,
            side,
            entry_price,
            exit_price,
            quantity,
            date,
            strategy_tag,
            notes,
            profit_loss,
            status,
        })
    }
}

/// One field of a partial update: not sent, sent as `null`, or sent with a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }
}

// Only reached when the key is present; `#[serde(default)]` covers absence.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

/// Request body for a partial trade update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTrade {
    pub symbol: Patch<String>,
    pub side: Patch<String>,
    pub entry_price: Patch<f64>,
    pub exit_price: Patch<f64>,
    pub quantity: Patch<f64>,
    pub date: Patch<String>,
    pub strategy_tag: Patch<String>,
    pub notes: Patch<String>,
    pub status: Patch<String>,
}

impl UpdateTrade {
    /// Apply the provided fields to a copy of `current`. Nothing is
    /// returned unless every field validates, so a rejected update never
    /// leaves a half-modified trade behind.
    pub fn apply(self, current: &Trade) -> Result<Trade, JournalError> {
        let mut trade = current.clone();

        if let Some(symbol) = required(self.symbol, "symbol")? {
            trade.symbol = normalize_symbol(&symbol)?;
        }
        if let Some(side) = required(self.side, "side")? {
            trade.side = side.parse()?;
        }
        if let Some(v) = required(self.entry_price, "entryPrice")? {
            trade.entry_price = positive("entryPrice", "Entry price", v)?;
        }
        match self.exit_price {
            Patch::Absent => {}
            Patch::Null => trade.exit_price = None,
            Patch::Value(v) => trade.exit_price = Some(positive("exitPrice", "Exit price", v)?),
        }
        if let Some(v) = required(self.quantity, "quantity")? {
            trade.quantity = positive("quantity", "Quantity", v)?;
        }
        if let Some(raw) = required(self.date, "date")? {
            trade.date = parse_trade_date("date", raw.trim())?;
        }
        match self.strategy_tag {
            Patch::Absent => {}
            Patch::Null => trade.strategy_tag = None,
            Patch::Value(tag) => trade.strategy_tag = normalize_tag(Some(tag)),
        }
        match self.notes {
            Patch::Absent => {}
            Patch::Null => trade.notes = None,
            Patch::Value(notes) => trade.notes = normalize_notes(Some(notes))?,
        }

        let status = required(self.status, "status")?
            .map(|s| s.parse::<TradeStatus>())
            .transpose()?;
        match status {
            Some(TradeStatus::Open) => trade.reopen(),
            Some(TradeStatus::Closed) if trade.exit_price.is_none() => {
                return Err(JournalError::validation(
                    "status",
                    "A trade can only be closed once it has an exit price",
                ));
            }
            _ => trade.derive_outcome(),
        }

        Ok(trade)
    }
}

fn required<T>(patch: Patch<T>, field: &str) -> Result<Option<T>, JournalError> {
    match patch {
        Patch::Absent => Ok(None),
        Patch::Null => Err(JournalError::validation(
            field,
            format!("{field} cannot be cleared"),
        )),
        Patch::Value(v) => Ok(Some(v)),
    }
}

fn normalize_symbol(raw: &str) -> Result<String, JournalError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(JournalError::validation(
            "symbol",
            "Please add a trading symbol",
        ));
    }
    Ok(symbol)
}

fn positive(field: &str, label: &str, value: f64) -> Result<f64, JournalError> {
    if !value.is_finite() || value < MIN_POSITIVE {
        return Err(JournalError::validation(
            field,
            format!("{label} must be greater than 0"),
        ));
    }
    Ok(value)
}

fn normalize_tag(raw: Option<String>) -> Option<String> {
    raw.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn normalize_notes(raw: Option<String>) -> Result<Option<String>, JournalError> {
    match raw {
        Some(notes) if notes.trim().is_empty() => Ok(None),
        Some(notes) if notes.chars().count() > MAX_NOTES_LEN => Err(JournalError::validation(
            "notes",
            format!("Notes cannot be more than {MAX_NOTES_LEN} characters"),
        )),
        other => Ok(other),
    }
}

/// Parse an RFC 3339 timestamp, a `YYYY-MM-DDTHH:MM` local form, or a bare
/// `YYYY-MM-DD` day (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn parse_trade_date(field: &str, raw: &str) -> Result<DateTime<Utc>, JournalError> {
    parse_timestamp(raw)
        .ok_or_else(|| JournalError::validation(field, format!("Invalid date: {raw}")))
}
