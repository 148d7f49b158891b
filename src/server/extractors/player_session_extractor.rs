use axum::Extension;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use tracing::debug;

use crate::server::error::Error;
use crate::server::services::RelayServices;

/// a player, as far as the relay can tell, plus the services to serve it
pub struct PlayerSession(pub String, pub RelayServices);

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}

/// same player = same address and same user agent
pub fn generate_client_id(ip: Option<&str>, user_agent: Option<&str>) -> String {
    let mut hasher = DefaultHasher::new();
    ip.unwrap_or("unknown").hash(&mut hasher);
    user_agent.unwrap_or("unknown").hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

impl<S> FromRequestParts<S> for PlayerSession
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(services): Extension<RelayServices> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|err| Error::InternalServerErrorWithContext(err.to_string()))?;

        let user_agent = header_str(parts, USER_AGENT.as_str());

        // players sitting behind another local proxy show up through the forwarding headers
        let client_ip = header_str(parts, "x-forwarded-for")
            .and_then(|forwarded| forwarded.split(',').next())
            .map(str::trim)
            .or_else(|| header_str(parts, "x-real-ip"))
            .map(str::to_string)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            });

        let client_id = generate_client_id(client_ip.as_deref(), user_agent);
        debug!("player session {} from {:?}", client_id, client_ip);

        Ok(PlayerSession(client_id, services))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_player_same_id() {
        let a = generate_client_id(Some("192.168.1.20"), Some("VLC/3.0.20"));
        let b = generate_client_id(Some("192.168.1.20"), Some("VLC/3.0.20"));
        assert_eq!(a, b);
    }

    #[test]
    fn different_player_different_id() {
        let vlc = generate_client_id(Some("192.168.1.20"), Some("VLC/3.0.20"));
        let kodi = generate_client_id(Some("192.168.1.20"), Some("Kodi/20.2"));
        let other_box = generate_client_id(Some("192.168.1.21"), Some("VLC/3.0.20"));
        assert_ne!(vlc, kodi);
        assert_ne!(vlc, other_box);
    }
}
