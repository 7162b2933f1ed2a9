//! Client identification
//!
//! `X-Forwarded-For` and `X-Real-IP` are set by whoever sends the request.
//! Under `TrustAll` a client can pick its own identifier and so its own
//! budget. `TrustedProxies` only reads the headers when the connecting peer
//! is a known proxy.

use std::net::IpAddr;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Identifier used when nothing else is known about the client
pub const FALLBACK_IDENTIFIER: &str = "127.0.0.1";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Which forwarding headers are believed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ForwardedHeaderPolicy {
    /// Headers are always honoured
    #[default]
    TrustAll,
    /// Headers are honoured only from these peers
    TrustedProxies { proxies: Vec<IpAddr> },
}

/// Derives the rate limit identifier for a request.
///
/// First entry of `X-Forwarded-For`, then `X-Real-IP`, then the peer
/// address, then `127.0.0.1`.
pub fn client_identifier(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    policy: &ForwardedHeaderPolicy,
) -> String {
    let trust_headers = match policy {
        ForwardedHeaderPolicy::TrustAll => true,
        ForwardedHeaderPolicy::TrustedProxies { proxies } => {
            peer.is_some_and(|peer| proxies.contains(&peer))
        }
    };

    if trust_headers {
        if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR)
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|first| !first.is_empty())
        {
            return forwarded.to_string();
        }
        if let Some(real_ip) = header_str(headers, X_REAL_IP)
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return real_ip.to_string();
        }
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| FALLBACK_IDENTIFIER.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
