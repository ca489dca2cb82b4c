//! Protocol errors

use thiserror::Error;

/// Errors raised while locating the instrument's serial port
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// No port matched a known instrument signature
    #[error("No MethodSCRIPT device found ({scanned} serial ports scanned)")]
    NoDeviceFound {
        /// Number of ports inspected
        scanned: usize,
    },

    /// More than one port matched and none was preferred
    #[error("Multiple MethodSCRIPT devices found: {}", candidates.join(", "))]
    AmbiguousDevice {
        /// Names of the matching ports
        candidates: Vec<String>,
    },
}

/// Errors from the serial transport itself
#[derive(Error, Debug)]
pub enum TransportError {
    /// The port does not exist, is busy, or rejected its settings
    #[error("Port '{port}' unavailable: {reason}")]
    PortUnavailable {
        /// Port name as given to `open`
        port: String,
        /// Reason reported by the OS or the port owner
        reason: String,
    },

    /// A line could not be written within the connection timeout
    #[error("Write timed out after {timeout_ms}ms")]
    WriteTimeout {
        /// Timeout in force at the time
        timeout_ms: u64,
    },

    /// No complete line arrived within the connection timeout
    #[error("No line received within {timeout_ms}ms")]
    ReadTimeout {
        /// Timeout in force at the time
        timeout_ms: u64,
    },

    /// Any other channel failure, including a closed connection
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors in the line-level request/response exchange
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The stream stopped before the end-of-run marker.
    ///
    /// `raw` holds what the transport delivered before the timeout so it can
    /// still be archived. It is empty when raised by the parser, whose caller
    /// already owns the input.
    #[error("Response incomplete: no end-of-run marker after {lines_seen} lines")]
    IncompleteResponse {
        /// Lines consumed before giving up
        lines_seen: usize,
        /// Lines received, oldest first
        raw: Vec<String>,
    },

    /// A line that is not valid at this point of the response
    #[error("Unexpected line {line_number}: {line:?}")]
    ProtocolSyntaxError {
        /// 1-based position in the response
        line_number: usize,
        /// The offending line
        line: String,
    },

    /// The instrument answered with an `!` error line
    #[error("Device reported error {code:#06x} at line {line_number}: {line:?}")]
    DeviceError {
        /// Firmware error code
        code: u16,
        /// 1-based position of the error line
        line_number: usize,
        /// The error line as received
        line: String,
        /// Every line received up to and including the error
        raw: Vec<String>,
    },

    /// The underlying transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProtocolError {
    /// Raw lines collected before the failure, if the error carries any
    pub fn raw_lines(&self) -> Option<&[String]> {
        match self {
            ProtocolError::IncompleteResponse { raw, .. }
            | ProtocolError::DeviceError { raw, .. }
                if !raw.is_empty() =>
            {
                Some(raw)
            }
            _ => None,
        }
    }
}
