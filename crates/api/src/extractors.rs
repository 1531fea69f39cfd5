//! Request extractors.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use relay_core::limits::UNKNOWN_CLIENT;
use std::net::SocketAddr;

/// Client IP address used for rate limiting.
///
/// Resolution order: first entry of `X-Forwarded-For`, `X-Real-IP`, the
/// transport peer address, then the literal `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientIp(resolve_client_ip(&parts.headers, peer)))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Picks the client address from proxy headers or the peer address.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<String>) -> String {
    // Take the first IP in the chain
    if let Some(ip) = header_str(headers, "X-Forwarded-For")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    if let Some(ip) = header_str(headers, "X-Real-IP") {
        return ip.to_string();
    }

    peer.unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
