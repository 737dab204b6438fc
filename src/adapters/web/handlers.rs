//! HTTP request handlers for the JSON API.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::account::{
    Account, DeleteAccount, LoginRequest, PasswordChange, ProfileUpdate, Registration,
};
use crate::domain::error::JournalError;
use crate::domain::query::TradeQueryParams;
use crate::domain::stats::BasicStats;
use crate::domain::trade::{CreateTrade, UpdateTrade};
use crate::services::accounts::INVALID_CREDENTIALS;

use super::auth::{AuthSession, Credentials, CurrentUser, SessionUser};
use super::extract::{ApiJson, parse_id};
use super::response;
use super::{AppState, WebError};

type ApiResult = Result<Response, WebError>;

#[derive(Serialize)]
struct UserEnvelope<'a> {
    user: &'a Account,
}

#[derive(Serialize)]
struct MeView<'a> {
    #[serde(flatten)]
    account: &'a Account,
    statistics: BasicStats,
}

#[derive(Serialize)]
struct ProfileView<'a> {
    #[serde(flatten)]
    account: &'a Account,
    stats: BasicStats,
}

#[derive(Serialize)]
struct Recalculated {
    updated: usize,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

pub async fn health() -> Response {
    Json(Health {
        status: "OK",
        timestamp: Utc::now(),
    })
    .into_response()
}

pub async fn not_found() -> WebError {
    WebError::not_found("Route not found")
}

// --- auth ---

pub async fn register(
    State(state): State<Arc<AppState>>,
    mut auth_session: AuthSession,
    ApiJson(body): ApiJson<Registration>,
) -> ApiResult {
    let account = state.accounts.register(body)?;
    auth_session.login(&SessionUser::from(&account)).await?;
    Ok(response::created(
        "User registered successfully",
        UserEnvelope { user: &account },
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    mut auth_session: AuthSession,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult {
    let (email, password) = body.validate()?;
    let creds = Credentials {
        email: email.clone(),
        password,
    };
    let Some(user) = auth_session.authenticate(creds).await? else {
        tracing::warn!(%email, "rejected login");
        return Err(JournalError::authentication(INVALID_CREDENTIALS).into());
    };
    auth_session.login(&user).await?;

    let account = state.accounts.require(user.id)?;
    tracing::info!(user = account.id, "logged in");
    Ok(response::ok_with_message(
        "Login successful",
        UserEnvelope { user: &account },
    ))
}

pub async fn logout(mut auth_session: AuthSession) -> ApiResult {
    if let Some(user) = auth_session.logout().await? {
        tracing::info!(user = user.id, "logged out");
    }
    Ok(response::ok_with_message("Logout successful", ()))
}

pub async fn me(State(state): State<Arc<AppState>>, CurrentUser(user): CurrentUser) -> ApiResult {
    let account = state.accounts.require(user.id)?;
    let statistics = state.journal.basic_stats(user.id)?;
    Ok(response::ok(MeView {
        account: &account,
        statistics,
    }))
}

// --- profile ---

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult {
    let account = state.accounts.require(user.id)?;
    let stats = state.journal.basic_stats(user.id)?;
    Ok(response::ok(ProfileView {
        account: &account,
        stats,
    }))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> ApiResult {
    let account = state.accounts.update_profile(user.id, body)?;
    Ok(response::ok_with_message("Profile updated successfully", &account))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut auth_session: AuthSession,
    ApiJson(body): ApiJson<PasswordChange>,
) -> ApiResult {
    let account = state.accounts.change_password(user.id, body)?;
    // Re-bind this session to the new hash; every other session is now stale.
    auth_session.login(&SessionUser::from(&account)).await?;
    Ok(response::ok_with_message("Password updated successfully", ()))
}

pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut auth_session: AuthSession,
    ApiJson(body): ApiJson<DeleteAccount>,
) -> ApiResult {
    state.accounts.delete_account(user.id, body)?;
    auth_session.logout().await?;
    Ok(response::no_content())
}

pub async fn profile_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult {
    Ok(response::ok(state.journal.detailed_stats(user.id)?))
}

// --- trades ---

pub async fn list_trades(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    params: Result<Query<TradeQueryParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let query = params.validate()?;
    Ok(response::ok(state.journal.list_trades(user.id, &query)?))
}

pub async fn create_trade(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<CreateTrade>,
) -> ApiResult {
    let trade = state.journal.create_trade(user.id, body)?;
    Ok(response::created("Trade created successfully", &trade))
}

pub async fn get_trade(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult {
    let trade = state.journal.get_trade(user.id, parse_id(&id)?)?;
    Ok(response::ok(&trade))
}

pub async fn update_trade(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateTrade>,
) -> ApiResult {
    let trade = state.journal.update_trade(user.id, parse_id(&id)?, body)?;
    Ok(response::ok_with_message("Trade updated successfully", &trade))
}

pub async fn delete_trade(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult {
    state.journal.delete_trade(user.id, parse_id(&id)?)?;
    Ok(response::no_content())
}

pub async fn recalculate_trades(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult {
    let updated = state.journal.recalculate_all(user.id)?;
    Ok(response::ok_with_message(
        format!("Recalculated P&L for {updated} trades"),
        Recalculated { updated },
    ))
}

// --- portfolio ---

pub async fn portfolio_summary(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult {
    Ok(response::ok(state.journal.portfolio_summary(user.id)?))
}

pub async fn portfolio_pnl(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult {
    Ok(response::ok(state.journal.pnl_breakdown(user.id)?))
}
