//! Web server adapter: JSON API over axum with cookie sessions.
//!
//! Sessions are kept in the journal database so they survive a restart.

mod auth;
mod error;
mod extract;
mod handlers;
mod rate_limit;
mod response;

pub use auth::{AuthSession, Backend, Credentials, CurrentUser, SessionUser};
pub use error::WebError;
pub use rate_limit::{AuthLimiter, TOO_MANY_ATTEMPTS};

use axum::{
    Router,
    middleware,
    routing::{get, post, put},
};
use axum_login::AuthManagerLayerBuilder;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tokio_rusqlite::Connection;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer, cookie::Key};
use tower_sessions_rusqlite_store::RusqliteStore;

use crate::adapters::sqlite_adapter::MEMORY_PATH;
use crate::domain::error::JournalError;
use crate::ports::config_port::ConfigPort;
use crate::services::{AccountService, TradeJournal};

pub const SESSION_KEY_LEN: usize = 64;
pub const DEFAULT_SESSION_LIFETIME: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_CLEANUP_INTERVAL: i64 = 60;

pub struct AppState {
    pub journal: TradeJournal,
    pub accounts: AccountService,
}

/// Cookie signing key from `[auth] session_secret` (hex). Without one a
/// random key is used and sessions do not survive a restart.
fn session_key(config: &dyn ConfigPort) -> Result<Key, JournalError> {
    let Some(secret) = config.get_string("auth", "session_secret") else {
        tracing::warn!("no [auth] session_secret configured, using a random signing key");
        let mut bytes = [0u8; SESSION_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        return Ok(Key::from(&bytes[..]));
    };

    let invalid = |reason: String| JournalError::ConfigInvalid {
        section: "auth".into(),
        key: "session_secret".into(),
        reason,
    };
    let bytes = hex::decode(secret.trim()).map_err(|e| invalid(e.to_string()))?;
    if bytes.len() < SESSION_KEY_LEN {
        return Err(invalid(format!(
            "expected at least {SESSION_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Key::from(bytes.as_slice()))
}

fn positive_seconds(config: &dyn ConfigPort, key: &str, default: i64) -> Result<i64, JournalError> {
    let value = config.get_int("auth", key, default);
    if value <= 0 {
        return Err(JournalError::ConfigInvalid {
            section: "auth".into(),
            key: key.into(),
            reason: format!("expected a positive number of seconds, got {value}"),
        });
    }
    Ok(value)
}

fn session_db_err(err: impl std::fmt::Display) -> JournalError {
    JournalError::Database {
        reason: format!("session store: {err}"),
    }
}

/// Opens the session table next to the journal tables in `[database] sqlite_path`.
pub async fn open_session_store(config: &dyn ConfigPort) -> Result<RusqliteStore, JournalError> {
    let path = config.require_string("database", "sqlite_path")?;
    let conn = if path == MEMORY_PATH {
        Connection::open_in_memory().await
    } else {
        Connection::open(&path).await
    }
    .map_err(session_db_err)?;

    let store = RusqliteStore::new(conn);
    store.migrate().await.map_err(session_db_err)?;
    tracing::debug!(path = %path, "session store ready");
    Ok(store)
}

/// Periodically drops expired sessions and idle rate-limit entries.
/// Must be called from within a tokio runtime.
fn spawn_housekeeping(store: RusqliteStore, limiter: AuthLimiter, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = store.delete_expired().await {
                tracing::warn!(error = %e, "expired session cleanup failed");
            }
            limiter.retain_recent();
        }
    });
}

pub async fn build_router(state: AppState, config: &dyn ConfigPort) -> Result<Router, JournalError> {
    let lifetime = positive_seconds(config, "session_lifetime", DEFAULT_SESSION_LIFETIME)?;
    let cleanup = positive_seconds(config, "session_cleanup_interval", DEFAULT_CLEANUP_INTERVAL)?;
    let limiter = AuthLimiter::from_config(config)?;
    let key = session_key(config)?;

    let store = open_session_store(config).await?;
    spawn_housekeeping(
        store.clone(),
        limiter.clone(),
        Duration::from_secs(cleanup.unsigned_abs()),
    );

    let session_layer = SessionManagerLayer::new(store)
        .with_secure(config.get_bool("auth", "secure_cookie", false))
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(lifetime)))
        .with_signed(key);
    let backend = Backend::new(state.accounts.clone());
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let credentials = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit::limit_auth));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(credentials)
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route(
            "/profile",
            get(handlers::get_profile)
                .put(handlers::update_profile)
                .delete(handlers::delete_profile),
        )
        .route("/profile/password", put(handlers::change_password))
        .route("/profile/stats", get(handlers::profile_stats))
        .route(
            "/trades",
            get(handlers::list_trades).post(handlers::create_trade),
        )
        .route("/trades/recalculate", post(handlers::recalculate_trades))
        .route(
            "/trades/{id}",
            get(handlers::get_trade)
                .put(handlers::update_trade)
                .delete(handlers::delete_trade),
        )
        .route("/portfolio/summary", get(handlers::portfolio_summary))
        .route("/portfolio/pnl", get(handlers::portfolio_pnl));

    Ok(Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(auth_layer),
        )
        .with_state(Arc::new(state)))
}
