use serde::{Deserialize, Serialize};

/// Listener settings for the WebSocket endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind. There is no authentication, so loopback by default.
    pub bind: String,
    pub port: u16,
    /// The single route that accepts upgrade requests.
    pub route: String,
    /// Seconds allowed for the WebSocket handshake (valid range: 1-120).
    pub handshake_timeout_secs: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
            route: "/terminal".into(),
            handshake_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// `bind:port` suitable for `TcpListener::bind`. IPv6 literals are
    /// bracketed.
    pub fn listen_addr(&self) -> String {
        if self.bind.contains(':') && !self.bind.starts_with('[') {
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }
}
