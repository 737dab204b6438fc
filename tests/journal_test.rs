//! Service-level tests over an in-memory store with a pinned clock.

mod common;

use approx::assert_relative_eq;
use proptest::prelude::*;
use tradejournal::adapters::csv_adapter::CsvTradeReader;
use tradejournal::domain::account::{DeleteAccount, PasswordChange, ProfileUpdate};
use tradejournal::domain::error::JournalError;
use tradejournal::domain::query::{SortField, SortOrder, TradeQuery};
use tradejournal::domain::stats;
use tradejournal::domain::trade::{CreateTrade, Trade, TradeStatus, UpdateTrade};
use tradejournal::services::accounts::{hash_password, verify_password};

use common::*;

mod trades {
    use super::*;

    #[test]
    fn create_then_fetch() {
        let (journal, accounts) = services();
        let owner = register(&accounts, "ada@example.com", "ada").id;

        let created = journal
            .create_trade(owner, create_input("btc", "buy", 100.0, Some(125.0), 0.5, "2024-03-01"))
            .unwrap();
        assert_eq!(created.symbol, "BTC");
        assert_relative_eq!(created.profit_loss, 12.5);
        assert_eq!(created.created_at, fixed_now());

        let fetched = journal.get_trade(owner, created.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn missing_date_defaults_to_now() {
        let (journal, accounts) = services();
        let owner = register(&accounts, "ada@example.com", "ada").id;
        let mut input = create_input("eth", "sell", 10.0, None, 1.0, "");
        input.date = None;
        let trade = journal.create_trade(owner, input).unwrap();
        assert_eq!(trade.date, fixed_now());
    }

    #[test]
    fn other_owners_cannot_touch_a_trade() {
        let (journal, accounts) = services();
        let alice = register(&accounts, "alice@example.com", "alice").id;
        let bob = register(&accounts, "bob@example.com", "bob").id;
        let trade = journal
            .create_trade(alice, create_input("btc", "buy", 1.0, None, 1.0, "2024-03-01"))
            .unwrap();

        assert!(matches!(
            journal.get_trade(bob, trade.id),
            Err(JournalError::NotFound { resource: "Trade" })
        ));
        let patch: UpdateTrade = serde_json::from_str(r#"{"quantity": 3}"#).unwrap();
        assert!(journal.update_trade(bob, trade.id, patch).is_err());
        assert!(journal.delete_trade(bob, trade.id).is_err());
        assert_eq!(journal.get_trade(alice, trade.id).unwrap().quantity, 1.0);
    }

    #[test]
    fn update_persists_and_bumps_timestamp() {
        let (journal, accounts) = services();
        let owner = register(&accounts, "ada@example.com", "ada").id;
        let trade = journal
            .create_trade(owner, create_input("btc", "buy", 100.0, None, 2.0, "2024-03-01"))
            .unwrap();

        let patch: UpdateTrade = serde_json::from_str(r#"{"exitPrice": 90, "notes": "stopped out"}"#).unwrap();
        let updated = journal.update_trade(owner, trade.id, patch).unwrap();
        assert_eq!(updated.status, TradeStatus::Closed);
        assert_relative_eq!(updated.profit_loss, -20.0);

        let stored = journal.get_trade(owner, trade.id).unwrap();
        assert_eq!(stored.notes.as_deref(), Some("stopped out"));
        assert_eq!(stored.status, TradeStatus::Closed);
    }

    fn sub_micro_now() -> chrono::DateTime<chrono::Utc> {
        fixed_now() + chrono::Duration::nanoseconds(123_456_789)
    }

    #[test]
    fn update_returns_what_a_later_get_returns() {
        let store = store();
        let journal = tradejournal::services::TradeJournal::new(store.clone()).with_clock(sub_micro_now);
        let accounts = tradejournal::services::AccountService::new(store);
        let owner = register(&accounts, "ada@example.com", "ada").id;
        let trade = journal
            .create_trade(owner, create_input("btc", "buy", 100.0, None, 2.0, "2024-03-01"))
            .unwrap();

        let patch: UpdateTrade =
            serde_json::from_str(r#"{"date": "2024-03-02T10:00:00.123456789Z"}"#).unwrap();
        let updated = journal.update_trade(owner, trade.id, patch).unwrap();
        assert_eq!(updated.updated_at.timestamp_subsec_nanos(), 123_456_000);
        assert_eq!(updated, journal.get_trade(owner, trade.id).unwrap());
    }

    #[test]
    fn list_sorts_with_id_tiebreak() {
        let (journal, accounts) = services();
        let owner = register(&accounts, "ada@example.com", "ada").id;
        let ids: Vec<i64> = (0..3)
            .map(|_| {
                journal
                    .create_trade(owner, create_input("btc", "buy", 5.0, None, 1.0, "2024-03-01"))
                    .unwrap()
                    .id
            })
            .collect();

        let query = TradeQuery {
            sort_by: SortField::EntryPrice,
            sort_order: SortOrder::Asc,
            ..TradeQuery::default()
        };
        let page = journal.list_trades(owner, &query).unwrap();
        let listed: Vec<i64> = page.trades.iter().map(|t| t.id).collect();
        assert_eq!(listed, ids);
        assert_eq!(page.pagination.total_count, 3);
    }
}

mod import {
    use super::*;

    const CSV: &str = "\
symbol,side,entryPrice,exitPrice,quantity,date,strategyTag,notes
btc,buy,100,110,1,2024-01-02,swing,
eth,sell,50,,2,2024-01-03,,first short
";

    #[test]
    fn csv_rows_are_imported() {
        let (journal, accounts) = services();
        let owner = register(&accounts, "ada@example.com", "ada").id;

        let rows = CsvTradeReader::read(CSV.as_bytes()).unwrap();
        let imported = journal.import_trades(owner, rows).unwrap();
        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].status, TradeStatus::Closed);
        assert_eq!(imported[1].status, TradeStatus::Open);
        assert_eq!(imported[1].notes.as_deref(), Some("first short"));
        assert_eq!(journal.basic_stats(owner).unwrap().total_trades, 2);
    }

    #[test]
    fn one_bad_row_rejects_the_whole_file() {
        let (journal, accounts) = services();
        let owner = register(&accounts, "ada@example.com", "ada").id;

        let csv = format!("{CSV}sol,buy,-1,,1,2024-01-04,,\n");
        let rows = CsvTradeReader::read(csv.as_bytes()).unwrap();
        match journal.import_trades(owner, rows) {
            Err(JournalError::Import { line, reason }) => {
                assert_eq!(line, 4);
                assert!(reason.contains("Entry price"), "{reason}");
            }
            other => panic!("expected import error, got {other:?}"),
        }
        assert_eq!(journal.basic_stats(owner).unwrap().total_trades, 0);
    }
}

mod recalculation {
    use super::*;

    #[test]
    fn only_trades_with_exit_are_counted_and_rerun_is_stable() {
        let (journal, accounts) = services();
        let owner = register(&accounts, "ada@example.com", "ada").id;
        journal
            .create_trade(owner, create_input("btc", "buy", 100.0, Some(90.0), 1.0, "2024-03-01"))
            .unwrap();
        journal
            .create_trade(owner, create_input("eth", "sell", 100.0, Some(90.0), 3.0, "2024-03-02"))
            .unwrap();
        journal
            .create_trade(owner, create_input("sol", "buy", 1.0, None, 1.0, "2024-03-03"))
            .unwrap();

        let before = journal.detailed_stats(owner).unwrap();
        assert_eq!(journal.recalculate_all(owner).unwrap(), 2);
        assert_eq!(journal.recalculate_all(owner).unwrap(), 2);
        let after = journal.detailed_stats(owner).unwrap();
        assert_eq!(before, after);
        assert_relative_eq!(after.total_pnl, 20.0);
    }
}

mod statistics {
    use super::*;

    #[test]
    fn monthly_window_is_six_months_back_from_now() {
        let (journal, accounts) = services();
        let owner = register(&accounts, "ada@example.com", "ada").id;
        for date in ["2023-11-30", "2024-01-10", "2024-01-20", "2024-06-01"] {
            journal
                .create_trade(owner, create_input("btc", "buy", 10.0, Some(11.0), 1.0, date))
                .unwrap();
        }

        let stats = journal.detailed_stats(owner).unwrap();
        assert_eq!(stats.total_trades, 4);
        let months: Vec<(&str, usize)> = stats
            .trades_by_month
            .iter()
            .map(|m| (m.month.as_str(), m.count))
            .collect();
        assert_eq!(months, [("2024-01", 2), ("2024-06", 1)]);
    }

    #[test]
    fn best_and_worst_ignore_open_trades() {
        let (journal, accounts) = services();
        let owner = register(&accounts, "ada@example.com", "ada").id;
        let winner = journal
            .create_trade(owner, create_input("btc", "buy", 10.0, Some(15.0), 1.0, "2024-05-01"))
            .unwrap();
        let loser = journal
            .create_trade(owner, create_input("eth", "buy", 10.0, Some(7.0), 1.0, "2024-05-02"))
            .unwrap();
        journal
            .create_trade(owner, create_input("sol", "buy", 10.0, None, 1.0, "2024-05-03"))
            .unwrap();

        let stats = journal.detailed_stats(owner).unwrap();
        assert_eq!(stats.best_trade.unwrap().id, winner.id);
        assert_eq!(stats.worst_trade.unwrap().id, loser.id);
        assert_eq!(stats.open_trades, 1);
        assert_relative_eq!(stats.win_rate, 50.0);
    }
}

mod accounts {
    use super::*;

    #[test]
    fn passwords_are_hashed() {
        let hash = hash_password(TEST_PASSWORD).unwrap();
        assert_ne!(hash, TEST_PASSWORD);
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hash, TEST_PASSWORD));
        assert!(!verify_password(&hash, "Other1234"));
        assert!(!verify_password("not a hash", TEST_PASSWORD));
    }

    #[test]
    fn credentials_check_is_case_insensitive_on_email() {
        let (_, accounts) = services();
        register(&accounts, "ada@example.com", "ada");
        assert!(accounts.verify_credentials("ADA@example.com", TEST_PASSWORD).unwrap().is_some());
        assert!(accounts.verify_credentials("ada@example.com", "Wrong1234").unwrap().is_none());
        assert!(accounts.verify_credentials("nobody@example.com", TEST_PASSWORD).unwrap().is_none());
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let (_, accounts) = services();
        register(&accounts, "ada@example.com", "ada");
        let err = accounts.register(registration("ada@example.com", "other")).unwrap_err();
        assert!(matches!(err, JournalError::Conflict { .. }));
        assert_eq!(err.field(), Some("email"));
        let err = accounts.register(registration("new@example.com", "ada")).unwrap_err();
        assert_eq!(err.field(), Some("username"));
    }

    #[test]
    fn profile_update_keeps_unsent_preferences() {
        let (_, accounts) = services();
        let account = register(&accounts, "ada@example.com", "ada");
        let update: ProfileUpdate = serde_json::from_str(
            r#"{"firstName": "Ada", "lastName": "Lovelace", "experienceLevel": "Expert"}"#,
        )
        .unwrap();
        let updated = accounts.update_profile(account.id, update).unwrap();
        assert_eq!(updated.profile.first_name, "Ada");
        assert_eq!(updated.profile.experience_level.as_str(), "Expert");
        assert_eq!(updated.profile.risk_preference.as_str(), "Med");
    }

    #[test]
    fn password_change_requires_current_password() {
        let (_, accounts) = services();
        let account = register(&accounts, "ada@example.com", "ada");

        let wrong = PasswordChange {
            current_password: Some("Nope12345".into()),
            new_password: Some("Changed456".into()),
        };
        assert!(matches!(
            accounts.change_password(account.id, wrong),
            Err(JournalError::Authentication { .. })
        ));

        let right = PasswordChange {
            current_password: Some(TEST_PASSWORD.into()),
            new_password: Some("Changed456".into()),
        };
        let changed = accounts.change_password(account.id, right).unwrap();
        assert_ne!(changed.password_hash, account.password_hash);
        assert!(accounts.verify_credentials("ada@example.com", "Changed456").unwrap().is_some());
    }

    #[test]
    fn delete_removes_account_and_trades() {
        let (journal, accounts) = services();
        let account = register(&accounts, "ada@example.com", "ada");
        let trade = journal
            .create_trade(account.id, create_input("btc", "buy", 1.0, None, 1.0, "2024-03-01"))
            .unwrap();

        let err = accounts
            .delete_account(account.id, DeleteAccount { confirm: Some("yes".into()) })
            .unwrap_err();
        assert_eq!(err.field(), Some("confirm"));

        accounts
            .delete_account(account.id, DeleteAccount { confirm: Some("DELETE".into()) })
            .unwrap();
        assert!(accounts.find(account.id).unwrap().is_none());
        assert!(journal.get_trade(account.id, trade.id).is_err());
        assert!(matches!(
            accounts.find_by_email("ada@example.com"),
            Err(JournalError::NotFound { .. })
        ));
    }
}

fn arb_input() -> impl Strategy<Value = CreateTrade> {
    (
        prop_oneof![Just("buy"), Just("sell")],
        0.01f64..1e6,
        proptest::option::of(0.01f64..1e6),
        0.0001f64..1e4,
        0u32..28,
    )
        .prop_map(|(side, entry, exit, qty, day)| {
            create_input("btc", side, entry, exit, qty, &format!("2024-02-{:02}", day + 1))
        })
}

fn persisted(owner: i64, input: CreateTrade, id: i64) -> Trade {
    let new = input.validate(fixed_now()).unwrap();
    Trade {
        id,
        user_id: owner,
        symbol: new.symbol,
        side: new.side,
        entry_price: new.entry_price,
        exit_price: new.exit_price,
        quantity: new.quantity,
        date: new.date,
        strategy_tag: new.strategy_tag,
        notes: new.notes,
        profit_loss: new.profit_loss,
        status: new.status,
        created_at: fixed_now(),
        updated_at: fixed_now(),
    }
}

proptest! {
    #[test]
    fn status_follows_exit_price(input in arb_input()) {
        let trade = persisted(1, input, 1);
        prop_assert_eq!(trade.is_closed(), trade.exit_price.is_some());
        if !trade.is_closed() {
            prop_assert_eq!(trade.profit_loss, 0.0);
        }
    }

    #[test]
    fn recalculation_is_idempotent(input in arb_input()) {
        let mut trade = persisted(1, input, 1);
        let original = trade.clone();
        trade.recalculate();
        prop_assert_eq!(&trade, &original);
    }

    #[test]
    fn stats_stay_in_bounds(inputs in proptest::collection::vec(arb_input(), 0..40)) {
        let trades: Vec<Trade> = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| persisted(1, input, i as i64 + 1))
            .collect();
        let basic = stats::basic_stats(&trades);
        prop_assert!(basic.closed_trades <= basic.total_trades);
        prop_assert!((0.0..=100.0).contains(&basic.win_rate));

        let detailed = stats::detailed_stats(&trades, fixed_now());
        prop_assert_eq!(detailed.open_trades + detailed.closed_trades, detailed.total_trades);
        prop_assert!(detailed.avg_rr >= 0.0);
        let by_strategy: usize = detailed.trades_by_strategy.values().map(|s| s.count).sum();
        prop_assert_eq!(by_strategy, trades.len());
        if let (Some(best), Some(worst)) = (&detailed.best_trade, &detailed.worst_trade) {
            prop_assert!(best.profit_loss >= worst.profit_loss);
        }
    }
}
