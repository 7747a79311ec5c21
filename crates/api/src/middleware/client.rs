//! Extraction of the caller's user agent and network origin.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::auth::identity::ClientInfo;

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientInfo {
            user_agent: header_str(&parts.headers, USER_AGENT.as_str()).map(str::to_owned),
            source_address: forwarded_address(&parts.headers).or(peer),
        })
    }
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`. Blank values count as
/// absent.
fn forwarded_address(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| non_blank(v.split(',').next()?))
        .or_else(|| non_blank(header_str(headers, "x-real-ip")?))
        .map(str::to_owned)
}

fn non_blank(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
