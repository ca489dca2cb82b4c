//! Simulated instrument
//!
//! Speaks enough of the MethodSCRIPT line protocol to run a whole session
//! without hardware. Identification commands are answered, and every
//! `meas_loop_*` line of a received script produces one curve of
//! time/current packages following a Cottrell-like decay with random noise.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::mscript::{encode_value, SiPrefix};
use crate::protocol::{CommunicationChannel, Connection, TransportError};

/// Firmware string reported by default
pub const DEFAULT_FIRMWARE: &str = "espico1.3";

/// Serial number reported by default
pub const DEFAULT_SERIAL: &str = "SIM0000001";

/// Upper bound on packages generated for a single curve
const MAX_POINTS: usize = 10_000;

/// Interval and run time used when a measurement line has no usable values (seconds)
const DEFAULT_INTERVAL_S: f64 = 0.1;
const DEFAULT_RUN_S: f64 = 1.0;

/// Full-scale value (amps) for each reported current range code
const CURRENT_RANGES: &[(u8, f64)] = &[
    (0x00, 100e-9),
    (0x01, 2e-6),
    (0x02, 4e-6),
    (0x03, 8e-6),
    (0x04, 16e-6),
    (0x05, 32e-6),
    (0x06, 63e-6),
    (0x07, 125e-6),
    (0x08, 250e-6),
    (0x09, 500e-6),
    (0x0a, 1e-3),
    (0x0b, 5e-3),
];

/// A named simulated port that can be held by one connection at a time
#[derive(Debug, Clone)]
pub struct SimulatedPort {
    name: String,
    in_use: Arc<AtomicBool>,
    seed: Option<u64>,
    firmware: Option<String>,
}

impl SimulatedPort {
    /// Create a free port reporting the default firmware
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            in_use: Arc::new(AtomicBool::new(false)),
            seed: None,
            firmware: None,
        }
    }

    /// Make the noise of every device opened on this port reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Firmware version reported by devices opened on this port
    pub fn with_firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware = Some(firmware.into());
        self
    }

    /// Port name given at construction
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a connection currently holds the port
    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::SeqCst)
    }

    /// Open a connection; fails while another connection holds the port
    pub fn open(&self, timeout: Duration) -> Result<Connection, TransportError> {
        if self.in_use.swap(true, Ordering::SeqCst) {
            return Err(TransportError::PortUnavailable {
                port: self.name.clone(),
                reason: "port is in use".to_string(),
            });
        }
        let lease = PortLease(self.in_use.clone());
        let device = match self.seed {
            Some(seed) => SimulatedDevice::with_seed(seed),
            None => SimulatedDevice::new(),
        };
        let device = match &self.firmware {
            Some(firmware) => device.with_firmware(firmware.clone()),
            None => device,
        };
        let device = device.named(self.name.clone()).leased(lease);
        // On failure the device is dropped here, releasing the lease
        Connection::from_channel(Box::new(device), timeout)
    }
}

/// Marks a [`SimulatedPort`] busy until dropped
#[derive(Debug)]
struct PortLease(Arc<AtomicBool>);

impl Drop for PortLease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Simulated MethodSCRIPT instrument
pub struct SimulatedDevice {
    name: String,
    firmware: String,
    serial: String,
    /// Relative noise amplitude applied to generated currents
    noise: f64,
    rng: StdRng,
    /// Bytes written by the host that do not yet form a full line
    input: Vec<u8>,
    /// Bytes waiting to be read by the host
    output: VecDeque<u8>,
    /// Script lines received so far while a script is being loaded
    receiving: Option<Vec<String>>,
    timeout: Duration,
    scripts_run: usize,
    _lease: Option<PortLease>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    /// Create a device with entropy-seeded noise
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a device whose output is fully determined by `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            name: "simulator".to_string(),
            firmware: DEFAULT_FIRMWARE.to_string(),
            serial: DEFAULT_SERIAL.to_string(),
            noise: 0.02,
            rng,
            input: Vec::new(),
            output: VecDeque::new(),
            receiving: None,
            timeout: Duration::from_millis(10),
            scripts_run: 0,
            _lease: None,
        }
    }

    /// Name reported by `describe`
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Report a different firmware version, e.g. `es4_lr1.2`
    pub fn with_firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware = firmware.into();
        self
    }

    /// Set the relative noise amplitude (0.0 for a clean signal)
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(0.0);
        self
    }

    fn leased(mut self, lease: PortLease) -> Self {
        self._lease = Some(lease);
        self
    }

    /// Number of scripts executed so far
    pub fn scripts_run(&self) -> usize {
        self.scripts_run
    }

    fn reply(&mut self, line: &str) {
        self.output.extend(line.as_bytes());
        self.output.push_back(b'\n');
    }

    fn handle_line(&mut self, line: &str) {
        if let Some(script) = self.receiving.as_mut() {
            if line.is_empty() {
                let script = self.receiving.take().unwrap_or_default();
                self.run_script(&script);
            } else {
                script.push(line.to_string());
            }
            return;
        }

        match line {
            "" => {}
            "t" => {
                let reply = format!("t{}", self.firmware);
                self.reply(&reply);
            }
            "i" => {
                let reply = format!("i{}", self.serial);
                self.reply(&reply);
            }
            "Z" => self.output.clear(),
            "e" => {
                self.reply("e");
                self.receiving = Some(Vec::new());
            }
            // Unknown command
            _ => self.reply("!0004"),
        }
    }

    fn run_script(&mut self, script: &[String]) {
        self.scripts_run += 1;
        for line in script {
            let mut words = line.split_whitespace();
            let Some(command) = words.next() else {
                continue;
            };
            if !command.starts_with("meas_loop_") {
                continue;
            }
            let args: Vec<&str> = words.collect();
            let (interval, run) = if command == "meas_loop_ca" {
                // meas_loop_ca <p> <c> <e_dc> <t_interval> <t_run>
                (
                    args.get(3).and_then(|s| parse_si(s)).unwrap_or(DEFAULT_INTERVAL_S),
                    args.get(4).and_then(|s| parse_si(s)).unwrap_or(DEFAULT_RUN_S),
                )
            } else {
                (DEFAULT_INTERVAL_S, DEFAULT_RUN_S)
            };
            self.emit_curve(interval, run);
        }
        self.reply("");
    }

    fn emit_curve(&mut self, interval: f64, run: f64) {
        self.reply("M0000");
        let points = if interval > 0.0 && run > 0.0 {
            ((run / interval + 1e-9).floor() as usize).min(MAX_POINTS)
        } else {
            0
        };
        for n in 1..=points {
            let time = n as f64 * interval;
            let clean = 1e-7 + 2e-7 / time.sqrt();
            let current = clean * (1.0 + self.noise * self.rng.gen_range(-1.0..1.0));
            let (Some(t), Some(i)) = (
                encode_value("eb", time, SiPrefix::Milli),
                encode_value("ba", current, SiPrefix::Nano),
            ) else {
                continue;
            };
            let line = format!("P{};{},10,2{:02X}", t, i, current_range_for(current));
            self.reply(&line);
        }
        self.reply("*");
    }
}

/// Smallest current range that holds `amps`
fn current_range_for(amps: f64) -> u8 {
    let magnitude = amps.abs();
    CURRENT_RANGES
        .iter()
        .find(|(_, full_scale)| magnitude <= *full_scale)
        .map(|(code, _)| *code)
        .unwrap_or(0x0b)
}

/// Parse a MethodSCRIPT literal such as `200m`, `10`, or `1500u`
fn parse_si(text: &str) -> Option<f64> {
    let last = text.chars().last()?;
    let (number, prefix) = if last.is_ascii_alphabetic() {
        (&text[..text.len() - 1], SiPrefix::from_char(last)?)
    } else {
        (text, SiPrefix::Unit)
    };
    let value: f64 = number.parse().ok()?;
    let exp = prefix.exponent();
    if exp < 0 {
        Some(value / 10f64.powi(-exp))
    } else {
        Some(value * 10f64.powi(exp))
    }
}

impl Read for SimulatedDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.output.is_empty() {
            std::thread::sleep(self.timeout.min(Duration::from_millis(2)));
            return Err(io::Error::new(ErrorKind::TimedOut, "no data"));
        }
        let mut n = 0;
        while n < buf.len() {
            match self.output.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for SimulatedDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.input.extend_from_slice(buf);
        while let Some(pos) = self.input.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.input.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..pos]);
            let line = line.trim_end_matches('\r').to_string();
            self.handle_line(&line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommunicationChannel for SimulatedDevice {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.output.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
