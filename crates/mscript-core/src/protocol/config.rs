//! Connection and framing configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::serial::{default_signatures, DeviceSignature};
use super::{DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Errors loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Cannot read config '{path}': {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid configuration document
    #[error("Invalid config '{path}': {source}")]
    Json {
        /// File path
        path: String,
        /// Position and cause reported by the JSON reader
        #[source]
        source: serde_json::Error,
    },
}

/// Literal line markers of the MethodSCRIPT response stream
///
/// These come from the firmware's protocol version. All of them are compared
/// against the complete newline-stripped line, except the prefixes that
/// introduce a payload (method id, package fields, error code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolMarkers {
    /// Line the device answers with once it accepted a script
    pub script_ack: String,
    /// Prefix of a measurement loop start, followed by the method id
    pub curve_start: String,
    /// Number of hex digits in the method id after `curve_start`
    pub method_id_digits: usize,
    /// Line closing a measurement loop
    pub curve_end: String,
    /// Plain (non-measurement) loop markers, structural only
    pub loop_markers: Vec<String>,
    /// Prefix of a data package line
    pub package_prefix: String,
    /// Separator between the values of a package
    pub value_separator: char,
    /// Separator between a value and its metadata fields
    pub metadata_separator: char,
    /// Prefix of a firmware error report, followed by a hex error code
    pub error_prefix: String,
    /// Line terminating the whole response
    pub end_of_run: String,
}

impl Default for ProtocolMarkers {
    fn default() -> Self {
        Self {
            script_ack: "e".to_string(),
            curve_start: "M".to_string(),
            method_id_digits: 4,
            curve_end: "*".to_string(),
            loop_markers: vec!["L".to_string(), "+".to_string(), "-".to_string()],
            package_prefix: "P".to_string(),
            value_separator: ';',
            metadata_separator: ',',
            error_prefix: "!".to_string(),
            end_of_run: String::new(),
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port name; empty means auto-detect
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Per-line read/write timeout in milliseconds
    pub timeout_ms: u64,
    /// Response stream markers
    pub markers: ProtocolMarkers,
    /// Signatures used for auto-detection
    pub signatures: Vec<DeviceSignature>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            markers: ProtocolMarkers::default(),
            signatures: default_signatures(),
        }
    }
}

impl ConnectionConfig {
    /// Default configuration bound to a specific port
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Timeout as a `Duration`
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(config.port_name.is_empty());
        assert!(!config.signatures.is_empty());
    }

    #[test]
    fn test_default_markers() {
        let markers = ProtocolMarkers::default();
        assert_eq!(markers.end_of_run, "");
        assert_eq!(markers.curve_end, "*");
        assert_eq!(markers.value_separator, ';');
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{ "port_name": "/dev/ttyACM3", "timeout_ms": 500, "markers": {{ "curve_end": "#" }} }}"##
        )
        .unwrap();

        let config = ConnectionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.port_name, "/dev/ttyACM3");
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.markers.curve_end, "#");
        assert_eq!(config.markers.package_prefix, "P");
    }

    #[test]
    fn test_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ConnectionConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = ConnectionConfig::from_json_file("/nonexistent/mscript.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
