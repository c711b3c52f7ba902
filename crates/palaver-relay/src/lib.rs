//! Reference relay for Palaver.
//!
//! Accepts WebSocket clients and forwards every well-formed envelope to
//! every other connected client. Undecodable frames are logged and
//! dropped. The relay takes no part in negotiation.

mod config;
mod error;
mod hub;
mod server;

pub use config::{BIND_ADDR_ENV, DEFAULT_BIND_ADDR, RelayConfig};
pub use error::RelayError;
pub use hub::{ClientSender, Frame, HubHandle};
pub use server::{RelayServer, RelayServerBuilder};
