//! # MethodSCRIPT Core Library
//!
//! Host-side communication with MethodSCRIPT instruments.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial port discovery and scoped connections with bounded reads
//! - Line framing for sending scripts and collecting the response stream
//! - Decoding of encoded measurement values (variable type, SI prefix, metadata)
//! - Parsing of the response stream into curves and packages
//! - Column projection of parsed results for plotting or storage
//!
//! ## Example
//!
//! ```rust,ignore
//! use mscript_core::mscript::{column_values, parse_result_lines};
//! use mscript_core::protocol::{discover_port, Connection, ConnectionConfig};
//! use mscript_core::{Instrument, Script, TracingSink};
//!
//! let port = discover_port()?;
//! let config = ConnectionConfig::for_port(port);
//! let mut device = Instrument::new(Connection::open_with(&config)?, TracingSink);
//!
//! device.send_script(&Script::from_file("scripts/chrono_amp.mscr")?)?;
//! let lines = device.read_until_end()?;
//!
//! let results = parse_result_lines(&lines)?;
//! let currents = column_values(&results, 1)?;
//! ```

pub mod archive;
pub mod diagnostics;
mod error;
pub mod instrument;
pub mod mscript;
pub mod protocol;
pub mod script;
pub mod simulator;

pub use diagnostics::{DiagnosticSink, Level, MemorySink, NullSink, TracingSink};
pub use error::{Error, Result};
pub use instrument::{DeviceType, Instrument};
pub use script::Script;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::diagnostics::{DiagnosticSink, Level, TracingSink};
    pub use crate::instrument::{DeviceType, Instrument};
    pub use crate::mscript::{
        column_values, decode_token, parse_result_lines, Curve, Package, ResultSet, SiPrefix,
        Unit, Value, VarType,
    };
    pub use crate::protocol::{
        discover_port, read_until_end, send_script, Connection, ConnectionConfig,
        ProtocolMarkers,
    };
    pub use crate::script::Script;
    pub use crate::Error;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
