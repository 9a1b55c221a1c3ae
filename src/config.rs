//! Runtime configuration: bind address and the initial per-stream
//! CONTINUE credit, set entirely from the CLI. No config file, unlike
//! the TOML-backed `NooshdarooConfig`/`ServerConfig` this crate grew
//! out of.

use std::net::SocketAddr;

use crate::stream::DEFAULT_CREDIT;

/// Server-wide settings the session supervisor and dispatcher both read.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Advisory CONTINUE credit announced at session start and after every
    /// TCP CONNECT.
    pub buffer_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "127.0.0.1:6001".parse().expect("valid default address"),
            buffer_size: DEFAULT_CREDIT,
        }
    }
}
