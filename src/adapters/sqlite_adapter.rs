//! SQLite storage adapter for accounts and trades.

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter};

use crate::domain::account::{Account, NewAccount, Profile};
use crate::domain::error::JournalError;
use crate::domain::query::{SortField, SortOrder, TradeQuery};
use crate::domain::trade::{NewTrade, Trade, TradeId, UserId};
use crate::ports::account_store::AccountStore;
use crate::ports::config_port::ConfigPort;
use crate::ports::trade_store::TradeStore;

pub const MEMORY_PATH: &str = ":memory:";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        risk_preference TEXT NOT NULL,
        experience_level TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS trades (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        symbol TEXT NOT NULL,
        side TEXT NOT NULL CHECK (side IN ('buy', 'sell')),
        entry_price REAL NOT NULL,
        exit_price REAL,
        quantity REAL NOT NULL,
        date TEXT NOT NULL,
        strategy_tag TEXT,
        notes TEXT,
        profit_loss REAL NOT NULL DEFAULT 0,
        status TEXT NOT NULL CHECK (status IN ('open', 'closed')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_trades_user_date ON trades(user_id, date);
    CREATE INDEX IF NOT EXISTS idx_trades_user_symbol ON trades(user_id, symbol);
    CREATE INDEX IF NOT EXISTS idx_trades_user_status ON trades(user_id, status);";

const TRADE_COLUMNS: &str = "id, user_id, symbol, side, entry_price, exit_price, quantity, date, \
     strategy_tag, notes, profit_loss, status, created_at, updated_at";

const USER_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, \
     risk_preference, experience_level, created_at, updated_at";

fn pool_err(e: r2d2::Error) -> JournalError {
    JournalError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> JournalError {
    JournalError::DatabaseQuery {
        reason: e.to_string(),
    }
}

/// Fixed-width UTC text, so stored timestamps order lexically.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = JournalError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        user_id: row.get(1)?,
        symbol: row.get(2)?,
        side: parsed_column(row, 3)?,
        entry_price: row.get(4)?,
        exit_price: row.get(5)?,
        quantity: row.get(6)?,
        date: timestamp_column(row, 7)?,
        strategy_tag: row.get(8)?,
        notes: row.get(9)?,
        profit_loss: row.get(10)?,
        status: parsed_column(row, 11)?,
        created_at: timestamp_column(row, 12)?,
        updated_at: timestamp_column(row, 13)?,
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        profile: Profile {
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            risk_preference: parsed_column(row, 6)?,
            experience_level: parsed_column(row, 7)?,
        },
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Date => "date",
        SortField::Symbol => "symbol",
        SortField::Side => "side",
        SortField::EntryPrice => "entry_price",
        SortField::ExitPrice => "exit_price",
        SortField::Quantity => "quantity",
        SortField::ProfitLoss => "profit_loss",
        SortField::Status => "status",
        SortField::StrategyTag => "strategy_tag",
        SortField::CreatedAt => "created_at",
    }
}

/// Map a UNIQUE violation on `users` to a field-level conflict.
fn insert_account_err(e: rusqlite::Error) -> JournalError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &e {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("users.email") {
                return JournalError::conflict("email", "Email already registered");
            }
            if message.contains("users.username") {
                return JournalError::conflict("username", "Username already taken");
            }
        }
    }
    query_err(e)
}

fn fetch_trade(
    conn: &Connection,
    owner: UserId,
    id: TradeId,
) -> Result<Option<Trade>, JournalError> {
    conn.query_row(
        &format!("SELECT {TRADE_COLUMNS} FROM trades WHERE id = ?1 AND user_id = ?2"),
        params![id, owner],
        trade_from_row,
    )
    .optional()
    .map_err(query_err)
}

fn fetch_account(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::ToSql,
) -> Result<Option<Account>, JournalError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
        params![value],
        account_from_row,
    )
    .optional()
    .map_err(query_err)
}

fn insert_trade_row(
    conn: &Connection,
    owner: UserId,
    trade: &NewTrade,
    now: &str,
) -> Result<TradeId, JournalError> {
    conn.execute(
        "INSERT INTO trades (user_id, symbol, side, entry_price, exit_price, quantity, date,
                             strategy_tag, notes, profit_loss, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            owner,
            trade.symbol,
            trade.side.as_str(),
            trade.entry_price,
            trade.exit_price,
            trade.quantity,
            timestamp(&trade.date),
            trade.strategy_tag,
            trade.notes,
            trade.profit_loss,
            trade.status.as_str(),
            now,
        ],
    )
    .map_err(query_err)?;
    Ok(conn.last_insert_rowid())
}

fn update_trade_row(
    conn: &Connection,
    owner: UserId,
    trade: &Trade,
    now: &str,
) -> Result<bool, JournalError> {
    let changed = conn
        .execute(
            "UPDATE trades SET symbol = ?1, side = ?2, entry_price = ?3, exit_price = ?4,
                    quantity = ?5, date = ?6, strategy_tag = ?7, notes = ?8,
                    profit_loss = ?9, status = ?10, updated_at = ?11
             WHERE id = ?12 AND user_id = ?13",
            params![
                trade.symbol,
                trade.side.as_str(),
                trade.entry_price,
                trade.exit_price,
                trade.quantity,
                timestamp(&trade.date),
                trade.strategy_tag,
                trade.notes,
                trade.profit_loss,
                trade.status.as_str(),
                now,
                trade.id,
                owner,
            ],
        )
        .map_err(query_err)?;
    Ok(changed > 0)
}

#[derive(Debug)]
pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, JournalError> {
        let db_path = config.require_string("database", "sqlite_path")?;
        if db_path == MEMORY_PATH {
            return Self::in_memory();
        }

        let pool_size = config.get_int("database", "pool_size", 4);
        let pool_size = u32::try_from(pool_size)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| JournalError::ConfigInvalid {
                section: "database".into(),
                key: "pool_size".into(),
                reason: format!("expected a positive integer, got {pool_size}"),
            })?;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;"));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        tracing::info!(path = %db_path, pool_size, "opened sqlite database");
        Ok(Self { pool })
    }

    /// A private in-memory database. The pool holds a single connection
    /// so every caller sees the same data.
    pub fn in_memory() -> Result<Self, JournalError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, JournalError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), JournalError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)?;
        tracing::debug!("schema initialized");
        Ok(())
    }
}

impl TradeStore for SqliteAdapter {
    fn insert_trade(
        &self,
        owner: UserId,
        trade: &NewTrade,
        now: DateTime<Utc>,
    ) -> Result<Trade, JournalError> {
        let conn = self.conn()?;
        let id = insert_trade_row(&conn, owner, trade, &timestamp(&now))?;
        fetch_trade(&conn, owner, id)?.ok_or(JournalError::NotFound { resource: "Trade" })
    }

    fn insert_trades(
        &self,
        owner: UserId,
        trades: &[NewTrade],
        now: DateTime<Utc>,
    ) -> Result<Vec<Trade>, JournalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        let now = timestamp(&now);
        let mut inserted = Vec::with_capacity(trades.len());
        for trade in trades {
            let id = insert_trade_row(&tx, owner, trade, &now)?;
            let stored =
                fetch_trade(&tx, owner, id)?.ok_or(JournalError::NotFound { resource: "Trade" })?;
            inserted.push(stored);
        }

        tx.commit().map_err(query_err)?;
        Ok(inserted)
    }

    fn find_trade(&self, owner: UserId, id: TradeId) -> Result<Option<Trade>, JournalError> {
        fetch_trade(&*self.conn()?, owner, id)
    }

    fn save_trade(&self, trade: &Trade, now: DateTime<Utc>) -> Result<bool, JournalError> {
        update_trade_row(&*self.conn()?, trade.user_id, trade, &timestamp(&now))
    }

    fn save_trades(
        &self,
        owner: UserId,
        trades: &[Trade],
        now: DateTime<Utc>,
    ) -> Result<usize, JournalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        let now = timestamp(&now);
        let mut saved = 0;
        for trade in trades {
            if update_trade_row(&tx, owner, trade, &now)? {
                saved += 1;
            }
        }

        tx.commit().map_err(query_err)?;
        Ok(saved)
    }

    fn delete_trade(&self, owner: UserId, id: TradeId) -> Result<bool, JournalError> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM trades WHERE id = ?1 AND user_id = ?2",
                params![id, owner],
            )
            .map_err(query_err)?;
        Ok(deleted > 0)
    }

    fn list_trades(
        &self,
        owner: UserId,
        query: &TradeQuery,
    ) -> Result<(Vec<Trade>, u64), JournalError> {
        let filter = &query.filter;
        let mut clauses = vec!["user_id = ?"];
        let mut args = vec![Value::Integer(owner)];

        if let Some(symbol) = &filter.symbol {
            clauses.push("symbol = ?");
            args.push(Value::Text(symbol.clone()));
        }
        if let Some(side) = filter.side {
            clauses.push("side = ?");
            args.push(Value::Text(side.as_str().into()));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            args.push(Value::Text(status.as_str().into()));
        }
        if let Some(strategy) = &filter.strategy {
            clauses.push("strategy_tag = ?");
            args.push(Value::Text(strategy.clone()));
        }
        if let Some(start) = &filter.start {
            clauses.push("date >= ?");
            args.push(Value::Text(timestamp(start)));
        }
        if let Some(end) = &filter.end {
            clauses.push("date <= ?");
            args.push(Value::Text(timestamp(end)));
        }
        let where_clause = clauses.join(" AND ");

        let conn = self.conn()?;
        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM trades WHERE {where_clause}"),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .map_err(query_err)?;

        let direction = match query.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            "SELECT {TRADE_COLUMNS} FROM trades WHERE {where_clause}
             ORDER BY {column} {direction}, id {direction}
             LIMIT ? OFFSET ?",
            column = sort_column(query.sort_by),
        );
        args.push(Value::Integer(i64::from(query.page_size)));
        args.push(Value::Integer(
            i64::try_from(query.offset()).unwrap_or(i64::MAX),
        ));

        let mut stmt = conn.prepare(&sql).map_err(query_err)?;
        let trades = stmt
            .query_map(params_from_iter(args.iter()), trade_from_row)
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        Ok((trades, u64::try_from(total).unwrap_or(0)))
    }

    fn all_trades(&self, owner: UserId) -> Result<Vec<Trade>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TRADE_COLUMNS} FROM trades WHERE user_id = ?1
                 ORDER BY date DESC, id DESC"
            ))
            .map_err(query_err)?;
        let trades = stmt
            .query_map(params![owner], trade_from_row)
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;
        Ok(trades)
    }
}

impl AccountStore for SqliteAdapter {
    fn insert_account(
        &self,
        account: &NewAccount,
        now: DateTime<Utc>,
    ) -> Result<Account, JournalError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (email, username, password_hash, first_name, last_name,
                                risk_preference, experience_level, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                account.email,
                account.username,
                account.password_hash,
                account.profile.first_name,
                account.profile.last_name,
                account.profile.risk_preference.as_str(),
                account.profile.experience_level.as_str(),
                timestamp(&now),
            ],
        )
        .map_err(insert_account_err)?;

        let id = conn.last_insert_rowid();
        fetch_account(&conn, "id", &id)?.ok_or(JournalError::NotFound { resource: "User" })
    }

    fn find_account(&self, id: UserId) -> Result<Option<Account>, JournalError> {
        fetch_account(&*self.conn()?, "id", &id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, JournalError> {
        fetch_account(&*self.conn()?, "email", &email)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Account>, JournalError> {
        fetch_account(&*self.conn()?, "username", &username)
    }

    fn update_profile(
        &self,
        id: UserId,
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, JournalError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE users SET first_name = ?1, last_name = ?2, risk_preference = ?3,
                        experience_level = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    profile.first_name,
                    profile.last_name,
                    profile.risk_preference.as_str(),
                    profile.experience_level.as_str(),
                    timestamp(&now),
                    id,
                ],
            )
            .map_err(query_err)?;
        if changed == 0 {
            return Ok(None);
        }
        fetch_account(&conn, "id", &id)
    }

    fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, JournalError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                params![password_hash, timestamp(&now), id],
            )
            .map_err(query_err)?;
        Ok(changed > 0)
    }

    fn delete_account(&self, id: UserId) -> Result<bool, JournalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        let trades = tx
            .execute("DELETE FROM trades WHERE user_id = ?1", params![id])
            .map_err(query_err)?;
        let users = tx
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(query_err)?;

        tx.commit().map_err(query_err)?;
        if users > 0 {
            tracing::info!(user = id, trades, "account rows removed");
        }
        Ok(users > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{ExperienceLevel, RiskPreference};
    use crate::domain::query::TradeFilter;
    use crate::domain::trade::{Side, TradeStatus};
    use chrono::TimeZone;

    fn adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn new_account(email: &str, username: &str) -> NewAccount {
        NewAccount {
            email: email.into(),
            username: username.into(),
            password_hash: "$argon2id$stub".into(),
            profile: Profile {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                risk_preference: RiskPreference::High,
                experience_level: ExperienceLevel::Expert,
            },
        }
    }

    fn new_trade(symbol: &str, day: u32, exit: Option<f64>) -> NewTrade {
        let (profit_loss, status) = match exit {
            Some(x) => ((x - 100.0) * 2.0, TradeStatus::Closed),
            None => (0.0, TradeStatus::Open),
        };
        NewTrade {
            symbol: symbol.into(),
            side: Side::Buy,
            entry_price: 100.0,
            exit_price: exit,
            quantity: 2.0,
            date: Utc.with_ymd_and_hms(2024, 1, day, 9, 30, 0).unwrap(),
            strategy_tag: Some("swing".into()),
            notes: None,
            profit_loss,
            status,
        }
    }

    #[test]
    fn account_round_trips_through_storage() {
        let db = adapter();
        let stored = db.insert_account(&new_account("a@x.io", "ada"), now()).unwrap();
        assert_eq!(stored.profile.risk_preference, RiskPreference::High);
        assert_eq!(stored.created_at, now());

        let by_email = db.find_by_email("a@x.io").unwrap().unwrap();
        assert_eq!(by_email, stored);
        assert!(db.find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_and_username_conflict() {
        let db = adapter();
        db.insert_account(&new_account("a@x.io", "ada"), now()).unwrap();

        let err = db
            .insert_account(&new_account("a@x.io", "other"), now())
            .unwrap_err();
        assert_eq!(err.field(), Some("email"));

        let err = db
            .insert_account(&new_account("b@x.io", "ada"), now())
            .unwrap_err();
        assert_eq!(err.field(), Some("username"));
    }

    #[test]
    fn trades_are_scoped_to_their_owner() {
        let db = adapter();
        let alice = db.insert_account(&new_account("a@x.io", "alice"), now()).unwrap();
        let bob = db.insert_account(&new_account("b@x.io", "bob"), now()).unwrap();

        let trade = db.insert_trade(alice.id, &new_trade("BTC", 1, None), now()).unwrap();
        assert_eq!(trade.user_id, alice.id);
        assert!(db.find_trade(bob.id, trade.id).unwrap().is_none());
        assert!(!db.delete_trade(bob.id, trade.id).unwrap());

        let mut hijacked = trade.clone();
        hijacked.user_id = bob.id;
        hijacked.symbol = "ETH".into();
        assert!(!db.save_trade(&hijacked, now()).unwrap());
        assert_eq!(db.find_trade(alice.id, trade.id).unwrap().unwrap().symbol, "BTC");
    }

    #[test]
    fn list_filters_sorts_and_pages() {
        let db = adapter();
        let owner = db.insert_account(&new_account("a@x.io", "alice"), now()).unwrap().id;
        for day in 1..=5 {
            let symbol = if day % 2 == 0 { "ETH" } else { "BTC" };
            let exit = (day > 3).then_some(110.0);
            db.insert_trade(owner, &new_trade(symbol, day, exit), now()).unwrap();
        }

        let (page, total) = db.list_trades(owner, &TradeQuery::default()).unwrap();
        assert_eq!(total, 5);
        let days: Vec<u32> = page.iter().map(|t| t.date.format("%d").to_string().parse().unwrap()).collect();
        assert_eq!(days, vec![5, 4, 3, 2, 1]);

        let query = TradeQuery {
            filter: TradeFilter {
                symbol: Some("BTC".into()),
                ..TradeFilter::default()
            },
            sort_order: SortOrder::Asc,
            page: 2,
            page_size: 2,
            ..TradeQuery::default()
        };
        let (page, total) = db.list_trades(owner, &query).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].date.format("%d").to_string(), "05");

        let query = TradeQuery {
            filter: TradeFilter {
                status: Some(TradeStatus::Closed),
                start: Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()),
                ..TradeFilter::default()
            },
            ..TradeQuery::default()
        };
        let (page, total) = db.list_trades(owner, &query).unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].symbol, "BTC");
    }

    #[test]
    fn batch_insert_is_all_or_nothing() {
        let db = adapter();
        let owner = db.insert_account(&new_account("a@x.io", "alice"), now()).unwrap().id;
        let mut bad = new_trade("BTC", 2, None);
        bad.entry_price = f64::NAN;
        let batch = vec![new_trade("BTC", 1, None), bad];

        // NaN binds as NULL and trips the NOT NULL constraint.
        assert!(db.insert_trades(owner, &batch, now()).is_err());
        assert!(db.all_trades(owner).unwrap().is_empty());

        let ok = db
            .insert_trades(owner, &[new_trade("BTC", 1, None), new_trade("ETH", 2, Some(90.0))], now())
            .unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(db.all_trades(owner).unwrap()[0].symbol, "ETH");
    }

    #[test]
    fn deleting_account_cascades_to_trades() {
        let db = adapter();
        let alice = db.insert_account(&new_account("a@x.io", "alice"), now()).unwrap();
        let bob = db.insert_account(&new_account("b@x.io", "bob"), now()).unwrap();
        db.insert_trade(alice.id, &new_trade("BTC", 1, None), now()).unwrap();
        db.insert_trade(bob.id, &new_trade("ETH", 1, None), now()).unwrap();

        assert!(db.delete_account(alice.id).unwrap());
        assert!(db.find_account(alice.id).unwrap().is_none());
        assert!(db.all_trades(alice.id).unwrap().is_empty());
        assert_eq!(db.all_trades(bob.id).unwrap().len(), 1);
        assert!(!db.delete_account(alice.id).unwrap());
    }

    #[test]
    fn profile_and_password_updates() {
        let db = adapter();
        let id = db.insert_account(&new_account("a@x.io", "ada"), now()).unwrap().id;
        let later = now() + chrono::Duration::hours(1);

        let profile = Profile {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            risk_preference: RiskPreference::Low,
            experience_level: ExperienceLevel::Intermediate,
        };
        let updated = db.update_profile(id, &profile, later).unwrap().unwrap();
        assert_eq!(updated.profile, profile);
        assert_eq!(updated.updated_at, later);
        assert!(db.update_profile(999, &profile, later).unwrap().is_none());

        assert!(db.update_password(id, "$argon2id$new", later).unwrap());
        assert_eq!(db.find_account(id).unwrap().unwrap().password_hash, "$argon2id$new");
    }

    #[test]
    fn single_row_lookups_borrow_a_pooled_connection() {
        let db = adapter();
        assert!(format!("{db:?}").starts_with("SqliteAdapter"));
        let account = db.insert_account(&new_account("a@x.io", "ada"), now()).unwrap();
        assert_eq!(db.find_account(account.id).unwrap().unwrap().username, "ada");
        assert_eq!(db.find_by_username("ada").unwrap().unwrap().id, account.id);

        let mut trade = db.insert_trade(account.id, &new_trade("BTC", 1, None), now()).unwrap();
        trade.notes = Some("scaled in".into());
        assert!(db.save_trade(&trade, now()).unwrap());
        let reread = db.find_trade(account.id, trade.id).unwrap().unwrap();
        assert_eq!(reread.notes.as_deref(), Some("scaled in"));
    }
}
