//! Client address
//!
//! The decoy runs behind a reverse proxy that appends the peer address to
//! `X-Forwarded-For`. Only that last hop is the proxy's own word; anything
//! to its left was sent by the client and can be forged.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Recorded when the proxy did not supply an address
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

impl ClientAddr {
    pub fn from_forwarded_for(header: Option<&str>) -> Self {
        let addr = header
            .and_then(|value| value.rsplit(',').next())
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .unwrap_or(UNKNOWN_CLIENT);
        ClientAddr(addr.to_string())
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get_all("X-Forwarded-For")
            .iter()
            .last()
            .and_then(|v| v.to_str().ok());
        Ok(ClientAddr::from_forwarded_for(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_hop_appended_by_proxy() {
        assert_eq!(
            ClientAddr::from_forwarded_for(Some("8.8.8.8 , 203.0.113.9 ")),
            ClientAddr("203.0.113.9".into())
        );
        assert_eq!(
            ClientAddr::from_forwarded_for(Some("1.2.3.4")),
            ClientAddr("1.2.3.4".into())
        );
    }

    #[test]
    fn trailing_empty_hop_is_unknown() {
        assert_eq!(ClientAddr::from_forwarded_for(Some("8.8.8.8,")).0, UNKNOWN_CLIENT);
    }

    #[test]
    fn missing_header_is_unknown() {
        assert_eq!(ClientAddr::from_forwarded_for(None).0, UNKNOWN_CLIENT);
        assert_eq!(ClientAddr::from_forwarded_for(Some("  ")).0, UNKNOWN_CLIENT);
    }
}
