//! Per-client throttling for the credential endpoints.
//!
//! Register and login share one budget per client address. Clients are
//! keyed by the peer address, or by the first `X-Forwarded-For` hop when
//! `[web] trust_forwarded_for` is set.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::error::JournalError;
use crate::ports::config_port::ConfigPort;

use super::WebError;

pub const DEFAULT_AUTH_ATTEMPTS: i64 = 5;
pub const DEFAULT_AUTH_WINDOW: i64 = 15 * 60;
pub const TOO_MANY_ATTEMPTS: &str = "Too many authentication attempts, please try again later";

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone)]
pub struct AuthLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    trust_forwarded_for: bool,
}

fn positive(config: &dyn ConfigPort, key: &str, default: i64) -> Result<NonZeroU32, JournalError> {
    let value = config.get_int("auth", key, default);
    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| JournalError::ConfigInvalid {
            section: "auth".into(),
            key: key.into(),
            reason: format!("expected a positive integer, got {value}"),
        })
}

impl AuthLimiter {
    /// `attempts` requests per `window`, refilled evenly across the window.
    pub fn new(attempts: NonZeroU32, window: Duration, trust_forwarded_for: bool) -> Self {
        let quota = Quota::with_period(window / attempts.get())
            .unwrap_or_else(|| Quota::per_second(attempts))
            .allow_burst(attempts);
        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            trust_forwarded_for,
        }
    }

    /// Reads `[auth] auth_attempts`, `[auth] auth_window` (seconds) and
    /// `[web] trust_forwarded_for`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, JournalError> {
        let attempts = positive(config, "auth_attempts", DEFAULT_AUTH_ATTEMPTS)?;
        let window = positive(config, "auth_window", DEFAULT_AUTH_WINDOW)?;
        Ok(Self::new(
            attempts,
            Duration::from_secs(u64::from(window.get())),
            config.get_bool("web", "trust_forwarded_for", false),
        ))
    }

    fn client_key(&self, req: &Request) -> String {
        if self.trust_forwarded_for {
            let forwarded = req
                .headers()
                .get(FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return ip.to_string();
            }
        }
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }

    /// Drops clients whose budget has fully refilled.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }
}

pub async fn limit_auth(State(limiter): State<AuthLimiter>, req: Request, next: Next) -> Response {
    let client = limiter.client_key(&req);
    match limiter.limiter.check_key(&client) {
        Ok(()) => next.run(req).await,
        Err(not_until) => {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            tracing::warn!(%client, retry_after = wait.as_secs(), "auth rate limit exceeded");
            let mut response = WebError::too_many_requests(TOO_MANY_ATTEMPTS).into_response();
            if let Ok(value) = HeaderValue::from_str(&wait.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}
