//! Line framing of the MethodSCRIPT exchange
//!
//! A script goes out line by line with no per-line reply. The response comes
//! back as a stream of lines closed by the end-of-run marker.

use super::{Connection, ProtocolError, ProtocolMarkers, TransportError};
use crate::diagnostics::Level;

/// Shape of a single response line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Terminator of the whole response
    EndOfRun,
    /// Device accepted the script
    ScriptAck,
    /// Measurement loop started
    CurveStart { method_id: u16 },
    /// Measurement loop finished
    CurveEnd,
    /// Plain loop marker without data meaning
    LoopMarker,
    /// Data package; the payload follows the package prefix
    Package(&'a str),
    /// Firmware error report
    DeviceError { code: u16 },
    /// Anything else
    Unrecognized,
}

impl ProtocolMarkers {
    /// Classify a newline-stripped response line
    pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        if line == self.end_of_run {
            return LineKind::EndOfRun;
        }
        if line == self.curve_end {
            return LineKind::CurveEnd;
        }
        if line == self.script_ack {
            return LineKind::ScriptAck;
        }
        if self.loop_markers.iter().any(|m| m == line) {
            return LineKind::LoopMarker;
        }
        if let Some(rest) = line.strip_prefix(self.error_prefix.as_str()) {
            if !self.error_prefix.is_empty() {
                let digits = rest
                    .find(|c: char| !c.is_ascii_hexdigit())
                    .map_or(rest, |end| &rest[..end]);
                // Codes are 1 to 4 hex digits; anything else is not an error report
                if (1..=4).contains(&digits.len()) {
                    if let Ok(code) = u16::from_str_radix(digits, 16) {
                        return LineKind::DeviceError { code };
                    }
                }
                return LineKind::Unrecognized;
            }
        }
        if let Some(id) = line.strip_prefix(self.curve_start.as_str()) {
            if id.len() == self.method_id_digits && id.chars().all(|c| c.is_ascii_hexdigit()) {
                if let Ok(method_id) = u16::from_str_radix(id, 16) {
                    return LineKind::CurveStart { method_id };
                }
            }
        }
        if let Some(payload) = line.strip_prefix(self.package_prefix.as_str()) {
            if !self.package_prefix.is_empty() {
                return LineKind::Package(payload);
            }
        }
        LineKind::Unrecognized
    }
}

/// Transmit a script, one line at a time, in order
///
/// Lines are sent exactly as given (minus any trailing terminator); the
/// device does not answer individual script lines.
pub fn send_script<I, S>(connection: &mut Connection, lines: I) -> Result<usize, TransportError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sent = 0;
    for line in lines {
        connection.write_line(line.as_ref())?;
        sent += 1;
    }
    connection
        .sink()
        .log(Level::Debug, &format!("send_script: {} lines sent", sent));
    Ok(sent)
}

/// Collect response lines up to and including the end-of-run marker
///
/// A read timeout before the marker is an [`ProtocolError::IncompleteResponse`]
/// and a firmware error line aborts with [`ProtocolError::DeviceError`]; both
/// carry the lines received so far.
pub fn read_until_end(
    connection: &mut Connection,
    markers: &ProtocolMarkers,
) -> Result<Vec<String>, ProtocolError> {
    let mut lines: Vec<String> = Vec::new();

    loop {
        let line = match connection.read_line() {
            Ok(line) => line,
            Err(TransportError::ReadTimeout { timeout_ms }) => {
                connection.sink().log(
                    Level::Warn,
                    &format!(
                        "read_until_end: no line within {}ms after {} lines",
                        timeout_ms,
                        lines.len()
                    ),
                );
                return Err(ProtocolError::IncompleteResponse {
                    lines_seen: lines.len(),
                    raw: lines,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match markers.classify(&line) {
            LineKind::EndOfRun => {
                lines.push(line);
                connection.sink().log(
                    Level::Debug,
                    &format!("read_until_end: {} lines received", lines.len()),
                );
                return Ok(lines);
            }
            LineKind::DeviceError { code } => {
                connection
                    .sink()
                    .log(Level::Error, &format!("device error: {:?}", line));
                lines.push(line.clone());
                return Err(ProtocolError::DeviceError {
                    code,
                    line_number: lines.len(),
                    line,
                    raw: lines,
                });
            }
            _ => lines.push(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_markers() {
        let m = ProtocolMarkers::default();
        assert_eq!(m.classify(""), LineKind::EndOfRun);
        assert_eq!(m.classify("e"), LineKind::ScriptAck);
        assert_eq!(m.classify("M0007"), LineKind::CurveStart { method_id: 7 });
        assert_eq!(m.classify("M00a1"), LineKind::CurveStart { method_id: 0xa1 });
        assert_eq!(m.classify("*"), LineKind::CurveEnd);
        assert_eq!(m.classify("L"), LineKind::LoopMarker);
        assert_eq!(m.classify("+"), LineKind::LoopMarker);
        assert_eq!(
            m.classify("Pda8000000 ;ba8000000 "),
            LineKind::Package("da8000000 ;ba8000000 ")
        );
        assert_eq!(
            m.classify("!0004: Line 3, Col 1"),
            LineKind::DeviceError { code: 4 }
        );
    }

    #[test]
    fn test_classify_is_exact_match() {
        let m = ProtocolMarkers::default();
        // Markers are whole-line literals, not prefixes
        assert_eq!(m.classify("**"), LineKind::Unrecognized);
        assert_eq!(m.classify(" "), LineKind::Unrecognized);
        assert_eq!(m.classify("eX"), LineKind::Unrecognized);
        assert_eq!(m.classify("M007"), LineKind::Unrecognized);
        assert_eq!(m.classify("M00071"), LineKind::Unrecognized);
        assert_eq!(m.classify("Mxyz1"), LineKind::Unrecognized);
    }

    #[test]
    fn test_classify_error_needs_hex_code() {
        let m = ProtocolMarkers::default();
        assert_eq!(m.classify("!2A"), LineKind::DeviceError { code: 0x2a });
        assert_eq!(m.classify("!"), LineKind::Unrecognized);
        assert_eq!(m.classify("!: no code"), LineKind::Unrecognized);
        assert_eq!(m.classify("!12345"), LineKind::Unrecognized);
    }

    #[test]
    fn test_classify_custom_markers() {
        let m = ProtocolMarkers {
            end_of_run: "END".to_string(),
            ..ProtocolMarkers::default()
        };
        assert_eq!(m.classify("END"), LineKind::EndOfRun);
        assert_eq!(m.classify(""), LineKind::Unrecognized);
    }
}
