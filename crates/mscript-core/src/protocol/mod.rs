//! Serial Protocol Communication
//!
//! Implements the line-oriented MethodSCRIPT exchange: scripts go out as
//! newline-terminated ASCII lines, results come back the same way until the
//! end-of-run marker.

pub mod commands;
mod config;
mod connection;
mod error;
mod framing;
pub mod serial;
pub mod stream;

pub use commands::Command;
pub use config::{ConfigError, ConnectionConfig, ProtocolMarkers};
pub use connection::Connection;
pub use error::{DiscoveryError, ProtocolError, TransportError};
pub use framing::{read_until_end, send_script, LineKind};
pub use serial::{discover_port, discover_port_with, list_ports, DeviceSignature, PortInfo};
pub use stream::{CommunicationChannel, SerialChannel};

/// Default baud rate of MethodSCRIPT instruments
pub const DEFAULT_BAUD_RATE: u32 = 230_400;

/// Default per-line timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Granularity of blocking reads on the underlying channel
pub const POLL_INTERVAL_MS: u64 = 50;
