//! Informational HTTP surface: landing page, client configuration, and
//! identity endpoints.
//!
//! None of these affect the handshake core; they exist so operators and
//! clients can discover the server's current identifier and build a working
//! client configuration.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Host, State},
    response::Html,
    Json,
};
use serde::Serialize;
use veil_core::ident;

use crate::AppState;

const ENDPOINTS: [&str; 6] = ["/", "/config", "/uuid", "/debug", "/ws", "/vless"];

/// Response body for `GET /uuid`.
#[derive(Debug, Serialize)]
pub struct UuidResponse {
    pub uuid: String,
    pub status: &'static str,
    pub note: &'static str,
}

/// Response body for `GET /debug`.
#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub server: String,
    pub uuid: String,
    pub uuid_format: &'static str,
    pub timestamp: u64,
    pub endpoints: Vec<&'static str>,
}

/// `GET /uuid` - the identifier clients must present.
pub async fn uuid(State(state): State<Arc<AppState>>) -> Json<UuidResponse> {
    Json(UuidResponse {
        uuid: state.identity.to_string(),
        status: "active",
        note: "regenerated on restart unless VEIL_UUID is set",
    })
}

/// `GET /debug` - server diagnostics.
pub async fn debug(State(state): State<Arc<AppState>>, Host(host): Host) -> Json<DebugResponse> {
    let uuid_format = if ident::is_canonical_v4(state.identity.as_str()) {
        "canonical-v4"
    } else {
        "non-canonical"
    };

    Json(DebugResponse {
        server: host,
        uuid: state.identity.to_string(),
        uuid_format,
        timestamp: unix_millis(),
        endpoints: ENDPOINTS.to_vec(),
    })
}

/// `GET /config` - connection strings and a proxy-client configuration block.
pub async fn client_config(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
) -> Html<String> {
    let (hostname, port) = split_host(&host, state.config.port);
    let uuid = state.identity.as_str();

    let links: Vec<String> = ["/ws", "/vless"]
        .iter()
        .map(|path| vless_link(uuid, &hostname, port, path))
        .collect();

    let yaml = clash_block(uuid, &hostname, port);

    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>veil - client config</title></head>\n<body>\n\
         <h1>Client configuration</h1>\n\
         <h2>Connection strings</h2>\n\
         <pre>{}</pre>\n\
         <h2>Proxy client block</h2>\n\
         <pre>{}</pre>\n\
         </body>\n</html>\n",
        links.join("\n"),
        yaml,
    );

    Html(body)
}

/// `GET /` and every unmatched path.
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>veil</title></head>\n<body>\n\
         <h1>veil edge relay</h1>\n\
         <p>WebSocket endpoints: <code>/ws</code>, <code>/vless</code></p>\n\
         <p>Fetch the current identifier from <a href=\"/uuid\">/uuid</a>,\n\
         a ready-made client configuration from <a href=\"/config\">/config</a>.</p>\n\
         <p>Listening on port {}.</p>\n\
         </body>\n</html>\n",
        state.config.port,
    );
    Html(body)
}

/// Build a `vless://` connection string for one websocket path.
fn vless_link(uuid: &str, hostname: &str, port: u16, path: &str) -> String {
    let encoded_path = path.replace('/', "%2F");
    format!(
        "vless://{uuid}@{hostname}:{port}?encryption=none&type=ws&host={hostname}&path={encoded_path}#veil{path}"
    )
}

/// Render the YAML proxy block for clash-style clients.
fn clash_block(uuid: &str, hostname: &str, port: u16) -> String {
    format!(
        "- name: veil-ws\n  type: vless\n  server: {hostname}\n  port: {port}\n  \
         uuid: {uuid}\n  network: ws\n  udp: false\n  ws-opts:\n    path: /ws\n    \
         headers:\n      Host: {hostname}\n"
    )
}

/// Split a Host header into hostname and port, falling back to the listen
/// port when the header carries none.
fn split_host(host: &str, default_port: u16) -> (String, u16) {
    match host.rsplit_once(':') {
        Some((name, port)) => match port.parse() {
            Ok(port) if !name.is_empty() => (name.to_string(), port),
            _ => (host.to_string(), default_port),
        },
        None => (host.to_string(), default_port),
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host() {
        assert_eq!(split_host("example.com", 8080), ("example.com".into(), 8080));
        assert_eq!(split_host("example.com:443", 8080), ("example.com".into(), 443));
        assert_eq!(split_host("localhost:9000", 8080), ("localhost".into(), 9000));
        // Garbage port falls back to the default.
        assert_eq!(split_host("example.com:x", 8080), ("example.com:x".into(), 8080));
    }

    #[test]
    fn test_vless_link() {
        let link = vless_link(
            "d1e8a1c2-4b3f-4a5e-8c1d-2f3e4a5b6c7d",
            "example.com",
            443,
            "/ws",
        );
        assert!(link.starts_with("vless://d1e8a1c2-4b3f-4a5e-8c1d-2f3e4a5b6c7d@example.com:443?"));
        assert!(link.contains("type=ws"));
        assert!(link.contains("path=%2Fws"));
    }

    #[test]
    fn test_clash_block_mentions_identity() {
        let block = clash_block("d1e8a1c2-4b3f-4a5e-8c1d-2f3e4a5b6c7d", "example.com", 443);
        assert!(block.contains("uuid: d1e8a1c2-4b3f-4a5e-8c1d-2f3e4a5b6c7d"));
        assert!(block.contains("server: example.com"));
        assert!(block.contains("path: /ws"));
    }
}
