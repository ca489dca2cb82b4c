//! Result parser
//!
//! Turns the raw response lines into a [`ResultSet`]:
//!
//! ```text
//! AwaitCurveStart --curve start--> InCurve --curve end--> AwaitCurveStart
//!                                  InCurve --package----> InCurve
//! AwaitCurveStart --end of run---> Done
//! ```
//!
//! Any other line is a syntax error. Running out of lines before `Done` is an
//! incomplete response. Errors discard everything parsed so far.

use serde::Serialize;

use super::value::{decode_token_with, Value};
use super::{DecodeError, ParseError};
use crate::protocol::{LineKind, ProtocolError, ProtocolMarkers};

/// One row of simultaneously sampled values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    values: Vec<Value>,
}

impl Package {
    /// Package holding `values` in column order
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Values in column order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at a column, if the package is wide enough
    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a package without values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Packages of one measurement loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    method_id: Option<u16>,
    packages: Vec<Package>,
}

impl Curve {
    /// Curve with packages in arrival order
    pub fn new(method_id: Option<u16>, packages: Vec<Package>) -> Self {
        Self {
            method_id,
            packages,
        }
    }

    /// Method id announced by the curve start line
    pub fn method_id(&self) -> Option<u16> {
        self.method_id
    }

    /// Packages in arrival order
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// True when the loop produced no packages
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// All curves of one script run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    curves: Vec<Curve>,
}

impl ResultSet {
    /// Result set of `curves` in arrival order
    pub fn new(curves: Vec<Curve>) -> Self {
        Self { curves }
    }

    /// Curves in arrival order
    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    /// Total number of packages over all curves
    pub fn package_count(&self) -> usize {
        self.curves.iter().map(Curve::len).sum()
    }

    /// Iterate packages in curve-then-package order
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.curves.iter().flat_map(|c| c.packages.iter())
    }
}

enum State {
    AwaitCurveStart,
    InCurve(Curve),
    Done,
}

/// Parse response lines using the default markers
pub fn parse_result_lines<S: AsRef<str>>(lines: &[S]) -> Result<ResultSet, ParseError> {
    parse_result_lines_with(lines, &ProtocolMarkers::default())
}

/// Parse response lines using `markers`
///
/// Lines may still carry their `\n` / `\r\n` terminator (as read back from an
/// archive file); it is stripped before classification. Lines after the
/// end-of-run marker are not examined.
pub fn parse_result_lines_with<S: AsRef<str>>(
    lines: &[S],
    markers: &ProtocolMarkers,
) -> Result<ResultSet, ParseError> {
    let mut curves = Vec::new();
    let mut state = State::AwaitCurveStart;

    for (index, raw) in lines.iter().enumerate() {
        if matches!(state, State::Done) {
            break;
        }
        let line_number = index + 1;
        let line = strip_terminator(raw.as_ref());
        let syntax_error = || {
            ParseError::Protocol(ProtocolError::ProtocolSyntaxError {
                line_number,
                line: line.to_string(),
            })
        };

        state = match (state, markers.classify(line)) {
            (State::Done, _) => State::Done,

            (_, LineKind::DeviceError { code }) => {
                return Err(ProtocolError::DeviceError {
                    code,
                    line_number,
                    line: line.to_string(),
                    raw: Vec::new(),
                }
                .into())
            }

            (State::AwaitCurveStart, LineKind::EndOfRun) => State::Done,
            (State::AwaitCurveStart, LineKind::CurveStart { method_id }) => {
                State::InCurve(Curve::new(Some(method_id), Vec::new()))
            }
            (State::AwaitCurveStart, LineKind::ScriptAck | LineKind::LoopMarker) => {
                State::AwaitCurveStart
            }

            (State::InCurve(mut curve), LineKind::Package(payload)) => {
                let package = parse_package(payload, markers).map_err(|source| {
                    ParseError::Decode {
                        line_number,
                        line: line.to_string(),
                        source,
                    }
                })?;
                curve.packages.push(package);
                State::InCurve(curve)
            }
            (State::InCurve(curve), LineKind::CurveEnd) => {
                curves.push(curve);
                State::AwaitCurveStart
            }
            (State::InCurve(curve), LineKind::LoopMarker) => State::InCurve(curve),

            _ => return Err(syntax_error()),
        };
    }

    match state {
        State::Done => Ok(ResultSet::new(curves)),
        _ => Err(ProtocolError::IncompleteResponse {
            lines_seen: lines.len(),
            raw: Vec::new(),
        }
        .into()),
    }
}

fn strip_terminator(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

fn parse_package(payload: &str, markers: &ProtocolMarkers) -> Result<Package, DecodeError> {
    payload
        .split(markers.value_separator)
        .map(|token| decode_token_with(token, markers.metadata_separator))
        .collect::<Result<Vec<_>, _>>()
        .map(Package::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_curve() {
        let lines = [
            "e",
            "M0007",
            "Peb8000000 ;ba8000064n,10,20A",
            "Peb80003E8m;ba80000C8n,10,20A",
            "*",
            "",
        ];
        let result = parse_result_lines(&lines).unwrap();
        assert_eq!(result.curves().len(), 1);
        let curve = &result.curves()[0];
        assert_eq!(curve.method_id(), Some(7));
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.packages()[1].get(1).unwrap().numeric_value, 200e-9);
    }

    #[test]
    fn test_lines_with_terminators() {
        let lines = ["e\n", "M0001\r\n", "Pda8000000 \n", "*\n", "\n"];
        let result = parse_result_lines(&lines).unwrap();
        assert_eq!(result.package_count(), 1);
    }

    #[test]
    fn test_curve_start_inside_curve_is_syntax_error() {
        let lines = ["M0001", "M0002", "*", ""];
        match parse_result_lines(&lines) {
            Err(ParseError::Protocol(ProtocolError::ProtocolSyntaxError { line_number, line })) => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "M0002");
            }
            other => panic!("Expected ProtocolSyntaxError, got {:?}", other),
        }
    }

    #[test]
    fn test_package_outside_curve_is_syntax_error() {
        let lines = ["e", "Pda8000000 ", ""];
        let err = parse_result_lines(&lines).unwrap_err();
        assert_eq!(err.line_number(), Some(2));
    }

    #[test]
    fn test_end_of_run_inside_curve_is_syntax_error() {
        let lines = ["M0001", "Pda8000000 ", ""];
        assert!(matches!(
            parse_result_lines(&lines),
            Err(ParseError::Protocol(ProtocolError::ProtocolSyntaxError { line_number: 3, .. }))
        ));
    }

    #[test]
    fn test_device_error_line() {
        let lines = ["e", "!0004: Line 2, Col 1", ""];
        match parse_result_lines(&lines) {
            Err(ParseError::Protocol(ProtocolError::DeviceError { code, line_number, .. })) => {
                assert_eq!(code, 4);
                assert_eq!(line_number, 2);
            }
            other => panic!("Expected DeviceError, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_lines_after_end_are_ignored() {
        let lines = ["M0001", "*", "", "garbage"];
        let result = parse_result_lines(&lines).unwrap();
        assert_eq!(result.curves().len(), 1);
    }

    #[test]
    fn test_custom_separators() {
        let markers = ProtocolMarkers {
            value_separator: '|',
            metadata_separator: '/',
            ..ProtocolMarkers::default()
        };
        let lines = ["M0001", "Peb8000000 |ba8000001n/10", "*", ""];
        let result = parse_result_lines_with(&lines, &markers).unwrap();
        let package = &result.curves()[0].packages()[0];
        assert_eq!(package.len(), 2);
        assert!(package.get(1).unwrap().status.unwrap().is_ok());
    }
}
