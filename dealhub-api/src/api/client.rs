//! Caller identification and per-IP rate limiting

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use dealhub_common::rate_limit::{check_rate_limit, RateLimitConfig};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const FALLBACK_IP: &str = "127.0.0.1";

/// Client address: first `X-Forwarded-For` entry, else the socket peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        if let Some(ip) = forwarded {
            return Ok(ClientIp(ip.to_string()));
        }

        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            return Ok(ClientIp(addr.ip().to_string()));
        }

        Ok(ClientIp(FALLBACK_IP.to_string()))
    }
}

/// Count this request against `endpoint`'s window for the caller
///
/// Returns [`ApiError::RateLimited`] once the window is used up.
pub async fn enforce_rate_limit(
    state: &AppState,
    ip: &ClientIp,
    endpoint: &str,
    config: RateLimitConfig,
) -> ApiResult<()> {
    let decision = check_rate_limit(state.cache.as_ref(), &ip.0, endpoint, config).await;

    if decision.allowed {
        Ok(())
    } else {
        debug!("Rate limit hit: {} on {}", ip.0, endpoint);
        Err(ApiError::RateLimited {
            reset_in: decision.reset_in,
        })
    }
}

/// `User-Agent` header, if present and readable
pub(crate) fn user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
