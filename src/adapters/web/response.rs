//! Success envelope: `{"success": true, "message"?: ..., "data": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: T,
}

fn envelope<T: Serialize>(status: StatusCode, message: Option<String>, data: T) -> Response {
    let body = Envelope {
        success: true,
        message,
        data,
    };
    (status, Json(body)).into_response()
}

pub fn ok<T: Serialize>(data: T) -> Response {
    envelope(StatusCode::OK, None, data)
}

pub fn ok_with_message<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    envelope(StatusCode::OK, Some(message.into()), data)
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    envelope(StatusCode::CREATED, Some(message.into()), data)
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
