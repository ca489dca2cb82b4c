//! Instrument commands
//!
//! Single-letter commands understood by MethodSCRIPT firmware outside of a
//! script body. Scripts themselves start with their own `e` line.

use serde::{Deserialize, Serialize};

/// Commands sent as their own line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Get firmware version ('t' command)
    GetFirmwareVersion,

    /// Get device serial number ('i' command)
    GetSerialNumber,

    /// Abort the running script ('Z' command)
    AbortScript,
}

impl Command {
    /// Get the command character
    pub fn code(&self) -> char {
        match self {
            Command::GetFirmwareVersion => 't',
            Command::GetSerialNumber => 'i',
            Command::AbortScript => 'Z',
        }
    }

    /// The command as a line ready for `write_line`
    pub fn line(&self) -> String {
        self.code().to_string()
    }

    /// Strip the echoed command character from a reply line
    ///
    /// Replies start with the command character, e.g. `tespico1.2` for `t`.
    pub fn strip_echo<'a>(&self, reply: &'a str) -> Option<&'a str> {
        reply.strip_prefix(self.code())
    }

    /// Get the expected response timeout in milliseconds
    pub fn timeout_ms(&self) -> u64 {
        match self {
            Command::AbortScript => 2000, // Device may be mid-measurement
            _ => 1000,
        }
    }
}
