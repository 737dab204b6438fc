//! Request extractors that reject with JSON errors.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::domain::error::JournalError;
use crate::domain::trade::TradeId;

use super::WebError;

/// `Json<T>` whose rejection is a 400 in the API error shape.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Path ids must be positive integers.
pub fn parse_id(raw: &str) -> Result<TradeId, JournalError> {
    match raw.parse::<TradeId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(JournalError::validation("id", format!("Invalid trade id: {raw}"))),
    }
}
