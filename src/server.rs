//! TCP accept loop and WebSocket upgrade, grounded on the same
//! `TcpListener::bind` + `loop { accept }` + `tokio::spawn` pattern as
//! `proxy.rs::UnifiedProxyListener::listen` and `socat.rs::tcp_to_tcp`.
//! One task per accepted connection, each running its own independent
//! session.

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::session;

/// Bind the configured address and run sessions until the process is
/// asked to shut down. Returns only on a bind failure; the accept loop
/// itself never exits on a per-connection error.
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    log::info!("listening on {}", config.bind_addr);
    accept_loop(listener, config.buffer_size).await
}

/// Drive the accept loop over an already-bound listener. Split out from
/// [`run`] so tests can bind to `127.0.0.1:0`, read back the OS-assigned
/// port, and connect a real client against it.
pub async fn accept_loop(listener: TcpListener, buffer_size: u32) -> std::io::Result<()> {
    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("accept error: {err}");
                continue;
            }
        };
        log::debug!("accepted connection from {addr}");

        tokio::spawn(async move {
            session::run(socket, buffer_size).await;
        });
    }
}
