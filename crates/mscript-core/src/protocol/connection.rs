//! Connection management
//!
//! A [`Connection`] owns the byte channel to the instrument and turns it into
//! newline-terminated ASCII lines. Dropping the connection closes it, so the
//! port is released on every exit path, including `?` propagation.

use std::io::{self, ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{
    serial::{clear_buffers, configure_port, open_port},
    stream::{CommunicationChannel, SerialChannel},
    ConnectionConfig, TransportError, DEFAULT_BAUD_RATE, POLL_INTERVAL_MS,
};
use crate::diagnostics::{DiagnosticSink, Level, TracingSink};

/// Longest line accepted before the stream is considered garbage
const MAX_LINE_LENGTH: usize = 8192;

/// Channel timeout used between deadline checks while reading
fn poll_interval(timeout: Duration) -> Duration {
    timeout.min(Duration::from_millis(POLL_INTERVAL_MS))
}

fn closed_error() -> TransportError {
    TransportError::IoError(io::Error::new(
        ErrorKind::NotConnected,
        "connection is closed",
    ))
}

/// Scoped line-oriented connection to an instrument
pub struct Connection {
    /// Byte channel; `None` once closed
    channel: Option<Box<dyn CommunicationChannel>>,
    /// Port name, kept for diagnostics after close
    name: String,
    /// Per-line read/write timeout
    timeout: Duration,
    /// Bytes received past the last returned line
    pending: Vec<u8>,
    /// Diagnostic sink
    sink: Arc<dyn DiagnosticSink>,
    /// Metrics: lines and bytes sent & received
    tx_lines: u64,
    rx_lines: u64,
    tx_bytes: u64,
    rx_bytes: u64,
}

impl Connection {
    /// Open `port` at the default baud rate with the given line timeout
    pub fn open(port: &str, timeout: Duration) -> Result<Self, TransportError> {
        Self::open_serial(port, DEFAULT_BAUD_RATE, timeout)
    }

    /// Open the port named in `config`
    pub fn open_with(config: &ConnectionConfig) -> Result<Self, TransportError> {
        Self::open_serial(&config.port_name, config.baud_rate, config.timeout())
    }

    fn open_serial(port: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        // Short per-read timeout; the line deadline is enforced in read_line
        let mut serial = open_port(port, baud_rate, poll_interval(timeout))?;
        configure_port(port, serial.as_mut())?;
        clear_buffers(port, serial.as_mut())?;
        Self::from_channel(Box::new(SerialChannel::new(port, serial)), timeout)
    }

    /// Wrap an already open channel
    pub fn from_channel(
        mut channel: Box<dyn CommunicationChannel>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        channel.set_timeout(poll_interval(timeout))?;
        let name = channel.describe();
        let conn = Self {
            channel: Some(channel),
            name,
            timeout,
            pending: Vec::new(),
            sink: Arc::new(TracingSink),
            tx_lines: 0,
            rx_lines: 0,
            tx_bytes: 0,
            rx_bytes: 0,
        };
        conn.sink.log(
            Level::Debug,
            &format!(
                "opened {} (timeout {}ms)",
                conn.name,
                conn.timeout.as_millis()
            ),
        );
        Ok(conn)
    }

    /// Route this connection's diagnostics to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sink this connection reports to
    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    /// Port name this connection was opened on
    pub fn port_name(&self) -> &str {
        &self.name
    }

    /// Whether the channel is still held
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Current per-line timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Change the per-line timeout
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        if let Some(channel) = self.channel.as_mut() {
            channel.set_timeout(poll_interval(timeout))?;
        }
        self.timeout = timeout;
        Ok(())
    }

    /// Get cumulative (tx lines, rx lines, tx bytes, rx bytes)
    pub fn get_counters(&self) -> (u64, u64, u64, u64) {
        (self.tx_lines, self.rx_lines, self.tx_bytes, self.rx_bytes)
    }

    /// Write one line followed by the `\n` terminator
    ///
    /// A trailing `\n` or `\r\n` already on `line` is stripped first; any other
    /// embedded newline is rejected since it would split the line on the wire.
    pub fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let line = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);
        if line.contains('\n') {
            return Err(TransportError::IoError(io::Error::new(
                ErrorKind::InvalidInput,
                format!("embedded newline in {:?}", line),
            )));
        }

        let timeout_ms = self.timeout.as_millis() as u64;
        let channel = self.channel.as_mut().ok_or_else(closed_error)?;

        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        // Writes get the whole line timeout; reads keep the short poll
        channel.set_timeout(self.timeout)?;
        let written = channel.write_all(&bytes).and_then(|_| channel.flush());
        let restored = channel.set_timeout(poll_interval(self.timeout));
        written.map_err(|e| match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::WriteTimeout { timeout_ms },
            _ => TransportError::IoError(e),
        })?;
        restored?;

        self.tx_lines = self.tx_lines.saturating_add(1);
        self.tx_bytes = self.tx_bytes.saturating_add(bytes.len() as u64);
        self.sink.log(Level::Trace, &format!("tx {:?}", line));
        Ok(())
    }

    /// Read one line, waiting at most the connection timeout
    ///
    /// The returned line has its `\n` (and a preceding `\r`) removed. Bytes
    /// after the newline stay buffered for the next call. The channel is read
    /// at least once, even with a zero timeout. A line holding non-ASCII bytes
    /// is an `InvalidData` I/O error.
    pub fn read_line(&mut self) -> Result<String, TransportError> {
        let deadline = Instant::now() + self.timeout;
        let timeout_ms = self.timeout.as_millis() as u64;
        let mut buffer = [0u8; 256];
        let mut polled = false;

        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let mut raw: Vec<u8> = self.pending.drain(..=pos).collect();
                raw.pop();
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
                if !raw.is_ascii() {
                    self.sink.log(
                        Level::Error,
                        &format!("read_line: non-ASCII line on {}: {:02x?}", self.name, raw),
                    );
                    return Err(TransportError::IoError(io::Error::new(
                        ErrorKind::InvalidData,
                        format!("non-ASCII bytes in line: {:02x?}", raw),
                    )));
                }
                let line: String = raw.iter().map(|&b| char::from(b)).collect();
                self.rx_lines = self.rx_lines.saturating_add(1);
                self.sink.log(Level::Trace, &format!("rx {:?}", line));
                return Ok(line);
            }

            if self.pending.len() > MAX_LINE_LENGTH {
                let dropped = self.pending.len();
                self.pending.clear();
                return Err(TransportError::IoError(io::Error::new(
                    ErrorKind::InvalidData,
                    format!("no line terminator within {} bytes", dropped),
                )));
            }

            if polled && Instant::now() >= deadline {
                self.sink.log(
                    Level::Debug,
                    &format!(
                        "read_line: timeout after {}ms ({} bytes pending)",
                        timeout_ms,
                        self.pending.len()
                    ),
                );
                return Err(TransportError::ReadTimeout { timeout_ms });
            }

            let channel = self.channel.as_mut().ok_or_else(closed_error)?;
            polled = true;
            match channel.read(&mut buffer) {
                Ok(0) => {
                    // Nothing available yet
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&buffer[..n]);
                    self.rx_bytes = self.rx_bytes.saturating_add(n as u64);
                }
                Err(ref e)
                    if e.kind() == ErrorKind::TimedOut
                        || e.kind() == ErrorKind::WouldBlock
                        || e.kind() == ErrorKind::Interrupted =>
                {
                    // Poll interval elapsed, check the deadline again
                }
                Err(e) => {
                    self.sink
                        .log(Level::Error, &format!("read_line: {} on {}", e, self.name));
                    return Err(TransportError::IoError(e));
                }
            }
        }
    }

    /// Discard buffered and unread input
    pub fn clear_input(&mut self) -> Result<(), TransportError> {
        self.pending.clear();
        let channel = self.channel.as_mut().ok_or_else(closed_error)?;
        channel.clear_input_buffer()?;
        Ok(())
    }

    /// Release the channel. Calling this more than once is harmless.
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            drop(channel);
            self.pending.clear();
            self.sink.log(
                Level::Debug,
                &format!(
                    "closed {} (tx {} lines, rx {} lines)",
                    self.name, self.tx_lines, self.rx_lines
                ),
            );
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field("timeout", &self.timeout)
            .finish()
    }
}
