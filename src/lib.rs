//! wisp-server: multiplexes many TCP and UDP streams over a single
//! WebSocket connection using the Wisp protocol.
//!
//! A client opens one WebSocket to this server and then multiplexes any
//! number of independent streams over it by tagging each frame with a
//! stream id: `CONNECT` opens a stream against a real TCP or UDP target,
//! `DATA` carries payload in either direction, and `CLOSE` tears a stream
//! down. Stream id 0 is reserved for session-wide control frames.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   binary WS frames   ┌──────────────────┐
//! │   Client   │◀─────────────────────▶│  Session (1/conn) │
//! └────────────┘                       └──────────────────┘
//!                                         │            │
//!                                   ingress│      writer│ (owns the sink)
//!                                         ▼            ▲
//!                                  ┌──────────────┐     │
//!                                  │ Stream table │     │
//!                                  └──────────────┘     │
//!                                         │             │
//!                                   spawn │             │ DATA frames
//!                                         ▼             │
//!                                  ┌──────────────┐──────┘
//!                                  │ Egress pump  │
//!                                  │ (per stream) │
//!                                  └──────────────┘
//!                                         │
//!                                         ▼
//!                                  TCP / UDP target
//! ```

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod server;
pub mod session;
pub mod stream;
pub mod table;
pub mod transport;

pub use config::ServerConfig;
