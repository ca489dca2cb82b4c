//! Crate-level error

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::mscript::{DecodeError, ParseError};
use crate::protocol::{ConfigError, DiscoveryError, ProtocolError, TransportError};
use crate::script::ScriptError;

/// Any failure of a measurement session
#[derive(Error, Debug)]
pub enum Error {
    /// Port discovery failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Serial transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Broken request/response exchange
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Response could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Value or column decoding failed
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Script could not be loaded
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Archive could not be written or read
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Raw response lines salvaged from a failed read, if any
    pub fn raw_lines(&self) -> Option<&[String]> {
        match self {
            Error::Protocol(e) => e.raw_lines(),
            _ => None,
        }
    }
}

/// Result alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
