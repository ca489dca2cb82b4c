//! Instrument session
//!
//! [`Instrument`] owns a [`Connection`] for the length of a session and offers
//! the device-level operations: identification, script transfer, result
//! collection and abort.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::diagnostics::{DiagnosticSink, Level};
use crate::protocol::{
    read_until_end, send_script, Command, Connection, ProtocolError, ProtocolMarkers,
    TransportError,
};
use crate::script::Script;
use crate::Result;

/// Quiet period that ends a drain
const DRAIN_IDLE_MS: u64 = 200;

/// Upper bound on lines discarded while draining after an abort
const ABORT_DRAIN_MAX_LINES: usize = 100_000;

/// Instrument family, derived from the firmware version string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeviceType {
    /// Firmware `espico*`
    EmStatPico,
    /// Firmware `es4_lr*`
    EmStat4Lr,
    /// Firmware `es4_hr*`
    EmStat4Hr,
    /// Other `es4*` firmware
    EmStat4,
    /// Firmware `mes4*`
    MultiEmStat4,
    /// Unrecognised firmware, with its version text
    Unknown(String),
}

impl DeviceType {
    /// Classify a firmware version string (with the `t` echo removed)
    pub fn from_firmware_version(version: &str) -> Self {
        let v = version.trim().to_ascii_lowercase();
        if v.starts_with("espico") {
            DeviceType::EmStatPico
        } else if v.starts_with("mes4") {
            DeviceType::MultiEmStat4
        } else if v.starts_with("es4_lr") || v.starts_with("es4lr") {
            DeviceType::EmStat4Lr
        } else if v.starts_with("es4_hr") || v.starts_with("es4hr") {
            DeviceType::EmStat4Hr
        } else if v.starts_with("es4") {
            DeviceType::EmStat4
        } else {
            DeviceType::Unknown(version.trim().to_string())
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::EmStatPico => f.write_str("EmStat Pico"),
            DeviceType::EmStat4Lr => f.write_str("EmStat4 LR"),
            DeviceType::EmStat4Hr => f.write_str("EmStat4 HR"),
            DeviceType::EmStat4 => f.write_str("EmStat4"),
            DeviceType::MultiEmStat4 => f.write_str("MultiEmStat4"),
            DeviceType::Unknown(v) => write!(f, "unknown device ({})", v),
        }
    }
}

/// A session with one MethodSCRIPT instrument
pub struct Instrument<S: DiagnosticSink> {
    connection: Connection,
    markers: ProtocolMarkers,
    sink: S,
}

impl<S: DiagnosticSink> Instrument<S> {
    /// Wrap a connection using the default markers
    pub fn new(connection: Connection, sink: S) -> Self {
        Self::with_markers(connection, ProtocolMarkers::default(), sink)
    }

    /// Wrap a connection whose device uses non-default markers
    pub fn with_markers(connection: Connection, markers: ProtocolMarkers, sink: S) -> Self {
        Self {
            connection,
            markers,
            sink,
        }
    }

    /// Markers used to frame responses
    pub fn markers(&self) -> &ProtocolMarkers {
        &self.markers
    }

    /// The underlying connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Give the connection back, ending the session
    pub fn into_connection(self) -> Connection {
        self.connection
    }

    fn query(&mut self, command: Command) -> std::result::Result<String, TransportError> {
        self.connection.write_line(&command.line())?;
        let reply = self.connection.read_line()?;
        match command.strip_echo(&reply) {
            Some(body) => Ok(body.to_string()),
            None => {
                self.sink.log(
                    Level::Warn,
                    &format!("{:?}: reply {:?} lacks the command echo", command, reply),
                );
                Ok(reply)
            }
        }
    }

    /// Firmware version text, e.g. `espico1.3`
    pub fn firmware_version(&mut self) -> Result<String> {
        let version = self.query(Command::GetFirmwareVersion)?;
        // Some firmware appends build info lines after the version
        self.drain(Duration::from_millis(DRAIN_IDLE_MS))?;
        Ok(version.trim().to_string())
    }

    /// Instrument family
    pub fn device_type(&mut self) -> Result<DeviceType> {
        let version = self.firmware_version()?;
        let device = DeviceType::from_firmware_version(&version);
        self.sink
            .log(Level::Info, &format!("Connected to {}.", device));
        Ok(device)
    }

    /// Device serial number
    pub fn serial_number(&mut self) -> Result<String> {
        Ok(self.query(Command::GetSerialNumber)?.trim().to_string())
    }

    /// Transmit a script; returns the number of lines sent
    pub fn send_script(&mut self, script: &Script) -> Result<usize> {
        self.sink.log(
            Level::Info,
            &format!("Sending MethodSCRIPT ({} lines).", script.len()),
        );
        Ok(send_script(&mut self.connection, script)?)
    }

    /// Collect the response of a running script
    pub fn read_until_end(&mut self) -> Result<Vec<String>> {
        self.sink.log(Level::Info, "Waiting for results.");
        match read_until_end(&mut self.connection, &self.markers) {
            Ok(lines) => Ok(lines),
            Err(e) => {
                self.sink.log(Level::Error, &e.to_string());
                Err(e.into())
            }
        }
    }

    /// Abort whatever the device is running and discard pending output
    pub fn abort_and_sync(&mut self) -> Result<usize> {
        self.connection.write_line(&Command::AbortScript.line())?;
        let dropped = self.drain(Duration::from_millis(Command::AbortScript.timeout_ms()))?;
        self.connection.clear_input()?;
        self.sink.log(
            Level::Debug,
            &format!("abort_and_sync: discarded {} lines", dropped),
        );
        Ok(dropped)
    }

    /// Read and discard lines until the device stays quiet for `idle`
    fn drain(&mut self, idle: Duration) -> std::result::Result<usize, ProtocolError> {
        let saved = self.connection.timeout();
        self.connection.set_timeout(idle)?;
        let mut dropped = 0;
        let outcome = loop {
            match self.connection.read_line() {
                Ok(_) if dropped >= ABORT_DRAIN_MAX_LINES => {
                    break Err(ProtocolError::IncompleteResponse {
                        lines_seen: dropped,
                        raw: Vec::new(),
                    })
                }
                Ok(_) => dropped += 1,
                Err(TransportError::ReadTimeout { .. }) => break Ok(dropped),
                Err(e) => break Err(e.into()),
            }
        };
        self.connection.set_timeout(saved)?;
        outcome
    }
}

impl<S: DiagnosticSink> fmt::Debug for Instrument<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument")
            .field("connection", &self.connection)
            .finish()
    }
}
