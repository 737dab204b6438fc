#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tradejournal::adapters::file_config_adapter::FileConfigAdapter;
use tradejournal::adapters::sqlite_adapter::SqliteAdapter;
use tradejournal::domain::account::{Account, Registration};
use tradejournal::domain::trade::CreateTrade;
use tradejournal::services::{AccountService, TradeJournal};

pub const TEST_PASSWORD: &str = "Secret123";

pub const TEST_INI: &str = "
[database]
sqlite_path = :memory:

[auth]
session_secret = 0000000000000000000000000000000100000000000000000000000000000001\
0000000000000000000000000000000100000000000000000000000000000001
session_lifetime = 86400
auth_attempts = 1000
";

pub fn test_config() -> FileConfigAdapter {
    FileConfigAdapter::from_string(TEST_INI).unwrap()
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

pub fn store() -> Arc<SqliteAdapter> {
    let store = SqliteAdapter::in_memory().unwrap();
    store.initialize_schema().unwrap();
    Arc::new(store)
}

/// Services over a fresh in-memory store with the clock pinned to [`fixed_now`].
pub fn services() -> (TradeJournal, AccountService) {
    let store = store();
    (
        TradeJournal::new(store.clone()).with_clock(fixed_now),
        AccountService::new(store).with_clock(fixed_now),
    )
}

pub fn registration(email: &str, username: &str) -> Registration {
    Registration {
        email: Some(email.into()),
        password: Some(TEST_PASSWORD.into()),
        username: Some(username.into()),
        fields: tradejournal::domain::account::ProfileFields {
            first_name: Some("Test".into()),
            last_name: Some("Trader".into()),
            ..Default::default()
        },
        profile: None,
    }
}

pub fn register(accounts: &AccountService, email: &str, username: &str) -> Account {
    accounts.register(registration(email, username)).unwrap()
}

pub fn create_input(
    symbol: &str,
    side: &str,
    entry: f64,
    exit: Option<f64>,
    quantity: f64,
    date: &str,
) -> CreateTrade {
    CreateTrade {
        symbol: Some(symbol.into()),
        side: Some(side.into()),
        entry_price: Some(entry),
        exit_price: exit,
        quantity: Some(quantity),
        date: Some(date.into()),
        strategy_tag: None,
        notes: None,
    }
}

#[cfg(feature = "web")]
pub mod http {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tradejournal::adapters::web::{AppState, build_router};

    use super::*;

    pub async fn test_app() -> Router {
        app_with_config(&test_config()).await
    }

    pub async fn app_with_config(config: &FileConfigAdapter) -> Router {
        let store = store();
        let state = AppState {
            journal: TradeJournal::new(store.clone()),
            accounts: AccountService::new(store),
        };
        build_router(state, config).await.unwrap()
    }

    pub struct TestResponse {
        pub status: StatusCode,
        pub body: Value,
        pub set_cookies: Vec<String>,
    }

    impl TestResponse {
        /// `name=value` pairs from Set-Cookie, ready for a Cookie header.
        pub fn cookie(&self) -> Option<String> {
            if self.set_cookies.is_empty() {
                return None;
            }
            Some(
                self.set_cookies
                    .iter()
                    .map(|sc| sc.split(';').next().unwrap_or("").to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        }

        pub fn data(&self) -> &Value {
            &self.body["data"]
        }
    }

    pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn send(app: &Router, req: Request<Body>) -> TestResponse {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .collect();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            body,
            set_cookies,
        }
    }

    pub async fn get(app: &Router, uri: &str, cookie: &str) -> TestResponse {
        send(app, request("GET", uri, Some(cookie), None)).await
    }

    pub async fn post(app: &Router, uri: &str, cookie: &str, body: Value) -> TestResponse {
        send(app, request("POST", uri, Some(cookie), Some(body))).await
    }

    pub async fn put(app: &Router, uri: &str, cookie: &str, body: Value) -> TestResponse {
        send(app, request("PUT", uri, Some(cookie), Some(body))).await
    }

    pub async fn delete(app: &Router, uri: &str, cookie: &str) -> TestResponse {
        send(app, request("DELETE", uri, Some(cookie), None)).await
    }

    pub fn registration_body(email: &str, username: &str) -> Value {
        json!({
            "email": email,
            "password": TEST_PASSWORD,
            "username": username,
            "firstName": "Test",
            "lastName": "Trader"
        })
    }

    /// Register a user and return the session cookie issued with the response.
    pub async fn signup(app: &Router, email: &str, username: &str) -> String {
        let res = send(
            app,
            request("POST", "/api/auth/register", None, Some(registration_body(email, username))),
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.cookie().expect("register should set a session cookie")
    }

    pub async fn login(app: &Router, email: &str, password: &str) -> TestResponse {
        send(
            app,
            request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            ),
        )
        .await
    }

    pub async fn create_trade(app: &Router, cookie: &str, body: Value) -> Value {
        let res = post(app, "/api/trades", cookie, body).await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.data().clone()
    }
}
