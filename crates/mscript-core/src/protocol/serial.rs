//! Serial port handling
//!
//! Port listing, device discovery and low-level port setup.

use serde::{Deserialize, Serialize};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;

use super::{DiscoveryError, TransportError};

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product description (if available)
    pub product: Option<String>,

    /// Serial number (if available)
    pub serial_number: Option<String>,
}

impl PortInfo {
    /// A port known only by name (no USB descriptor)
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, manufacturer, product, serial_number) = match info.port_type {
            SerialPortType::UsbPort(usb_info) => (
                Some(usb_info.vid),
                Some(usb_info.pid),
                usb_info.manufacturer,
                usb_info.product,
                usb_info.serial_number,
            ),
            _ => (None, None, None, None, None),
        };

        Self {
            name: info.port_name,
            vid,
            pid,
            manufacturer,
            product,
            serial_number,
        }
    }
}

/// Identification markers of a supported instrument
///
/// Every field that is set must match; unset fields are wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSignature {
    /// USB vendor ID
    pub vid: Option<u16>,
    /// USB product ID
    pub pid: Option<u16>,
    /// Prefix of the USB product description
    pub product_prefix: Option<String>,
}

impl DeviceSignature {
    /// Signature matching on the product description prefix only
    pub fn product(prefix: impl Into<String>) -> Self {
        Self {
            vid: None,
            pid: None,
            product_prefix: Some(prefix.into()),
        }
    }

    /// Signature matching on USB vendor/product IDs only
    pub fn usb(vid: u16, pid: u16) -> Self {
        Self {
            vid: Some(vid),
            pid: Some(pid),
            product_prefix: None,
        }
    }

    /// Whether this signature identifies the given port
    pub fn matches(&self, port: &PortInfo) -> bool {
        if self.vid.is_none() && self.pid.is_none() && self.product_prefix.is_none() {
            return false;
        }
        if self.vid.is_some() && self.vid != port.vid {
            return false;
        }
        if self.pid.is_some() && self.pid != port.pid {
            return false;
        }
        match (&self.product_prefix, &port.product) {
            (None, _) => true,
            (Some(prefix), Some(product)) => product.starts_with(prefix.as_str()),
            (Some(_), None) => false,
        }
    }
}

/// Product descriptions reported by MethodSCRIPT instruments
pub const KNOWN_PRODUCT_PREFIXES: &[&str] = &["ESPicoDev", "EmStat4", "MultiEmStat", "EmStat Pico"];

/// Signatures used by [`discover_port`]
pub fn default_signatures() -> Vec<DeviceSignature> {
    KNOWN_PRODUCT_PREFIXES
        .iter()
        .map(|prefix| DeviceSignature::product(*prefix))
        .collect()
}

/// Helper used to sort port names so that:
///  - ttyACM* ports come first (sorted numerically by suffix)
///  - then ttyUSB* ports (sorted numerically)
///  - then other ports (sorted by name)
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
    {
        let p = PortInfo::from(info);
        map.entry(p.name.clone()).or_insert(p);
    }

    // Linux-only: ports the enumeration API missed
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Pick the single port matching one of `signatures`
///
/// When several ports match, `preferred` (a port name) disambiguates.
pub fn discover_port_with(
    ports: &[PortInfo],
    signatures: &[DeviceSignature],
    preferred: Option<&str>,
) -> Result<String, DiscoveryError> {
    let candidates: Vec<&PortInfo> = ports
        .iter()
        .filter(|p| signatures.iter().any(|s| s.matches(p)))
        .collect();

    match candidates.as_slice() {
        [] => Err(DiscoveryError::NoDeviceFound {
            scanned: ports.len(),
        }),
        [only] => Ok(only.name.clone()),
        many => {
            if let Some(wanted) = preferred {
                if let Some(hit) = many.iter().find(|p| p.name == wanted) {
                    return Ok(hit.name.clone());
                }
            }
            Err(DiscoveryError::AmbiguousDevice {
                candidates: many.iter().map(|p| p.name.clone()).collect(),
            })
        }
    }
}

/// Scan the system's serial ports for exactly one MethodSCRIPT instrument
pub fn discover_port() -> Result<String, DiscoveryError> {
    discover_port_with(&list_ports(), &default_signatures(), None)
}

/// Open a serial port with the given baud rate and read/write timeout
pub fn open_port(
    name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, TransportError> {
    serialport::new(name, baud_rate)
        .timeout(timeout)
        .open()
        .map_err(|e| TransportError::PortUnavailable {
            port: name.to_string(),
            reason: e.to_string(),
        })
}

fn setup_error(port: &str, e: serialport::Error) -> TransportError {
    TransportError::PortUnavailable {
        port: port.to_string(),
        reason: e.to_string(),
    }
}

/// Configure a serial port for 8N1 without flow control
pub fn configure_port(name: &str, port: &mut dyn SerialPort) -> Result<(), TransportError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| setup_error(name, e))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| setup_error(name, e))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| setup_error(name, e))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| setup_error(name, e))?;
    Ok(())
}

/// Clear the serial port buffers
pub fn clear_buffers(name: &str, port: &mut dyn SerialPort) -> Result<(), TransportError> {
    port.clear(serialport::ClearBuffer::All)
        .map_err(|e| setup_error(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb(name: &str, product: &str) -> PortInfo {
        PortInfo {
            name: name.to_string(),
            vid: Some(0x0403),
            pid: Some(0x6015),
            manufacturer: Some("FTDI".to_string()),
            product: Some(product.to_string()),
            serial_number: None,
        }
    }

    #[test]
    fn test_list_ports() {
        // This test just ensures the function doesn't panic
        let ports = list_ports();
        for port in &ports {
            println!("Found port: {} - {:?}", port.name, port.product);
        }
    }

    #[test]
    fn test_port_sorting() {
        let names = vec![
            "/dev/ttyUSB1",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/ttyACM0",
            "/dev/someport",
            "/dev/ttyACM10",
        ];
        let mut ports: Vec<PortInfo> = names.into_iter().map(PortInfo::bare).collect();

        ports.sort_by_key(|p| port_sort_key(&p.name));
        let ordered: Vec<String> = ports.into_iter().map(|p| p.name).collect();

        assert_eq!(
            ordered,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/ttyACM10",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn test_discover_single_match() {
        let ports = vec![
            PortInfo::bare("/dev/ttyS0"),
            usb("/dev/ttyUSB0", "ESPicoDev"),
            usb("/dev/ttyUSB1", "USB Serial"),
        ];
        let port = discover_port_with(&ports, &default_signatures(), None).unwrap();
        assert_eq!(port, "/dev/ttyUSB0");
    }

    #[test]
    fn test_discover_no_match() {
        let ports = vec![PortInfo::bare("/dev/ttyS0"), usb("/dev/ttyUSB1", "USB Serial")];
        match discover_port_with(&ports, &default_signatures(), None) {
            Err(DiscoveryError::NoDeviceFound { scanned }) => assert_eq!(scanned, 2),
            other => panic!("Expected NoDeviceFound, got {:?}", other),
        }
    }

    #[test]
    fn test_discover_ambiguous() {
        let ports = vec![
            usb("/dev/ttyUSB0", "ESPicoDev"),
            usb("/dev/ttyUSB1", "EmStat4 HR"),
        ];
        match discover_port_with(&ports, &default_signatures(), None) {
            Err(DiscoveryError::AmbiguousDevice { candidates }) => {
                assert_eq!(candidates, vec!["/dev/ttyUSB0", "/dev/ttyUSB1"]);
            }
            other => panic!("Expected AmbiguousDevice, got {:?}", other),
        }

        let port =
            discover_port_with(&ports, &default_signatures(), Some("/dev/ttyUSB1")).unwrap();
        assert_eq!(port, "/dev/ttyUSB1");
    }

    #[test]
    fn test_usb_signature() {
        let sig = DeviceSignature::usb(0x0403, 0x6015);
        assert!(sig.matches(&usb("/dev/ttyUSB0", "anything")));
        assert!(!sig.matches(&PortInfo::bare("/dev/ttyS0")));
    }

    #[test]
    fn test_empty_signature_matches_nothing() {
        let sig = DeviceSignature {
            vid: None,
            pid: None,
            product_prefix: None,
        };
        assert!(!sig.matches(&usb("/dev/ttyUSB0", "ESPicoDev")));
    }
}
