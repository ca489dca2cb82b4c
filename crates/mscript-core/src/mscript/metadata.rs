//! Per-value metadata
//!
//! Values may carry comma-separated metadata fields after the magnitude. The
//! first character of a field is its id: `1` status flags, `2` current range.

use serde::Serialize;
use std::fmt;

/// Status flags reported with a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Status(pub u8);

impl Status {
    /// The measurement loop could not keep its interval
    pub const TIMING_ERROR: u8 = 0x1;
    /// Signal above the current range
    pub const OVERLOAD: u8 = 0x2;
    /// Signal too small for the current range
    pub const UNDERLOAD: u8 = 0x4;
    /// Signal close to the top of the current range
    pub const OVERLOAD_WARNING: u8 = 0x8;

    /// No flag set
    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }

    /// [`Status::TIMING_ERROR`] is set
    pub fn timing_error(&self) -> bool {
        self.0 & Self::TIMING_ERROR != 0
    }

    /// [`Status::OVERLOAD`] is set
    pub fn overload(&self) -> bool {
        self.0 & Self::OVERLOAD != 0
    }

    /// [`Status::UNDERLOAD`] is set
    pub fn underload(&self) -> bool {
        self.0 & Self::UNDERLOAD != 0
    }

    /// [`Status::OVERLOAD_WARNING`] is set
    pub fn overload_warning(&self) -> bool {
        self.0 & Self::OVERLOAD_WARNING != 0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("OK");
        }
        let flags: Vec<&str> = [
            (self.timing_error(), "timing error"),
            (self.overload(), "overload"),
            (self.underload(), "underload"),
            (self.overload_warning(), "overload warning"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect();
        if flags.is_empty() {
            write!(f, "status {:#x}", self.0)
        } else {
            f.write_str(&flags.join(", "))
        }
    }
}

/// Current range the instrument was in when the value was sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CurrentRange(pub u8);

const CURRENT_RANGES: &[(u8, &str)] = &[
    (0x00, "100 nA"),
    (0x01, "2 uA"),
    (0x02, "4 uA"),
    (0x03, "8 uA"),
    (0x04, "16 uA"),
    (0x05, "32 uA"),
    (0x06, "63 uA"),
    (0x07, "125 uA"),
    (0x08, "250 uA"),
    (0x09, "500 uA"),
    (0x0a, "1 mA"),
    (0x0b, "5 mA"),
    // High speed mode
    (0x80, "100 nA"),
    (0x81, "1 uA"),
    (0x82, "6 uA"),
    (0x83, "13 uA"),
    (0x84, "25 uA"),
    (0x85, "50 uA"),
    (0x86, "100 uA"),
    (0x87, "200 uA"),
    (0x88, "1 mA"),
    (0x89, "5 mA"),
];

impl CurrentRange {
    /// Nominal range label, if the code is known
    pub fn label(&self) -> Option<&'static str> {
        CURRENT_RANGES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, label)| *label)
    }

    /// Whether the code belongs to the high speed range set
    pub fn is_high_speed(&self) -> bool {
        self.0 & 0x80 != 0
    }
}

impl fmt::Display for CurrentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) if self.is_high_speed() => write!(f, "{} (high speed)", label),
            Some(label) => f.write_str(label),
            None => write!(f, "range {:#04x}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_flags() {
        assert!(Status(0).is_ok());
        let s = Status(0x6);
        assert!(s.overload());
        assert!(s.underload());
        assert!(!s.timing_error());
        assert_eq!(s.to_string(), "overload, underload");
        assert_eq!(Status(0).to_string(), "OK");
        assert_eq!(Status(0x10).to_string(), "status 0x10");
    }

    #[test]
    fn test_current_range_labels() {
        assert_eq!(CurrentRange(0x0a).label(), Some("1 mA"));
        assert_eq!(CurrentRange(0x88).to_string(), "1 mA (high speed)");
        assert_eq!(CurrentRange(0x03).to_string(), "8 uA");
        assert_eq!(CurrentRange(0x40).to_string(), "range 0x40");
    }
}
