//! Server configuration.

use clap::Parser;

/// Veil - VLESS-over-WebSocket edge relay.
#[derive(Parser, Debug, Clone)]
#[command(name = "veil-server")]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "VEIL_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for HTTP and websocket traffic
    #[arg(long, env = "VEIL_PORT", default_value = "8080")]
    pub port: u16,

    /// Pre-shared identifier clients must present (hyphenated form).
    /// If not provided, a random identifier is generated for this process;
    /// clients must fetch the current value from /uuid.
    #[arg(long, env = "VEIL_UUID")]
    pub uuid: Option<String>,

    /// Failed handshake attempts tolerated before the connection is closed
    /// (0 = unbounded)
    #[arg(long, env = "VEIL_MAX_ATTEMPTS", default_value = "5")]
    pub max_attempts: u32,

    /// Seconds a connection may spend handshaking before it is closed
    #[arg(long, env = "VEIL_HANDSHAKE_TIMEOUT", default_value = "10")]
    pub handshake_timeout: u64,

    /// Enable debug logging
    #[arg(long, env = "VEIL_DEBUG")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // parse_from still honors env fallbacks, so a VEIL_* variable in the
        // test environment would shadow the defaults under assertion.
        for var in [
            "VEIL_HOST",
            "VEIL_PORT",
            "VEIL_UUID",
            "VEIL_MAX_ATTEMPTS",
            "VEIL_HANDSHAKE_TIMEOUT",
            "VEIL_DEBUG",
        ] {
            std::env::remove_var(var);
        }

        let config = ServerConfig::parse_from(["veil-server"]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.uuid, None);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.handshake_timeout, 10);
        assert!(!config.debug);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::parse_from([
            "veil-server",
            "--port",
            "9000",
            "--uuid",
            "d1e8a1c2-4b3f-4a5e-8c1d-2f3e4a5b6c7d",
            "--max-attempts",
            "0",
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.uuid.as_deref(),
            Some("d1e8a1c2-4b3f-4a5e-8c1d-2f3e4a5b6c7d")
        );
        assert_eq!(config.max_attempts, 0);
    }
}
