//! Tests for result parsing and column projection

use mscript_core::mscript::{
    column_values, column_values_by_curve, decode_token, encode_token, encode_value,
    parse_result_lines, DecodeError, ParseError, SiPrefix, Unit,
};
use mscript_core::protocol::ProtocolError;
use pretty_assertions::assert_eq;

/// Package line with a time and a current column
fn package(time_ms: i64, current_na: i64) -> String {
    format!(
        "P{};{}",
        encode_token("eb", time_ms, SiPrefix::Milli).unwrap(),
        encode_token("ba", current_na, SiPrefix::Nano).unwrap()
    )
}

fn response(curves: &[usize]) -> Vec<String> {
    let mut lines = vec!["e".to_string()];
    let mut t = 0;
    for &count in curves {
        lines.push("M0000".to_string());
        for _ in 0..count {
            t += 1;
            lines.push(package(t * 100, t * 10));
        }
        lines.push("*".to_string());
    }
    lines.push(String::new());
    lines
}

#[test]
fn test_packages_keep_wire_order() {
    let lines = response(&[4]);
    let result = parse_result_lines(&lines).unwrap();

    assert_eq!(result.curves().len(), 1);
    let curve = &result.curves()[0];
    assert_eq!(curve.len(), 4);
    let times: Vec<f64> = curve
        .packages()
        .iter()
        .map(|p| p.get(0).unwrap().numeric_value)
        .collect();
    assert_eq!(times, vec![0.1, 0.2, 0.3, 0.4]);
}

#[test]
fn test_empty_curve() {
    let result = parse_result_lines(&["e", "M0000", "*", ""]).unwrap();
    assert_eq!(result.curves().len(), 1);
    assert!(result.curves()[0].is_empty());
    assert_eq!(result.package_count(), 0);
}

#[test]
fn test_no_curves() {
    let result = parse_result_lines(&["e", ""]).unwrap();
    assert!(result.curves().is_empty());
}

#[test]
fn test_missing_end_of_run_is_incomplete() {
    let mut lines = response(&[2]);
    lines.pop();
    match parse_result_lines(&lines) {
        Err(ParseError::Protocol(ProtocolError::IncompleteResponse { lines_seen, .. })) => {
            assert_eq!(lines_seen, lines.len());
        }
        other => panic!("Expected IncompleteResponse, got {:?}", other),
    }
}

#[test]
fn test_missing_curve_end_is_incomplete() {
    let lines = ["e", "M0000", "Pda8000000 "];
    assert!(matches!(
        parse_result_lines(&lines),
        Err(ParseError::Protocol(ProtocolError::IncompleteResponse { .. }))
    ));
}

#[test]
fn test_unknown_type_fails_whole_parse() {
    let mut lines = response(&[3]);
    lines[3] = "Pzz8000000 ;ba8000001n".to_string();
    let err = parse_result_lines(&lines).unwrap_err();
    assert_eq!(err.line_number(), Some(4));
    assert_eq!(err.malformed_token(), Some("zz8000000 "));
}

#[test]
fn test_loop_markers_inside_curve() {
    let lines = ["e", "L", "M0000", "Pda8000000 ", "+", "Pda8000001 ", "-", "*", ""];
    let result = parse_result_lines(&lines).unwrap();
    assert_eq!(result.package_count(), 2);
}

#[test]
fn test_columns_across_curves() {
    let lines = response(&[2, 3]);
    let result = parse_result_lines(&lines).unwrap();

    assert_eq!(result.curves().len(), 2);
    assert_eq!(result.curves()[0].len(), 2);
    assert_eq!(result.curves()[1].len(), 3);

    let times = column_values(&result, 0).unwrap();
    let currents = column_values(&result, 1).unwrap();
    assert_eq!(times, vec![0.1, 0.2, 0.3, 0.4, 0.5]);
    assert_eq!(currents.len(), 5);
    assert_eq!(currents[0], 10e-9);
    assert_eq!(currents[4], 50e-9);

    let per_curve = column_values_by_curve(&result, 0).unwrap();
    assert_eq!(per_curve, vec![vec![0.1, 0.2], vec![0.3, 0.4, 0.5]]);
}

#[test]
fn test_column_out_of_range() {
    let result = parse_result_lines(&response(&[2])).unwrap();
    assert_eq!(
        column_values(&result, 5),
        Err(DecodeError::ColumnIndexOutOfRange {
            column: 5,
            curve: 0,
            package: 0,
            width: 2,
        })
    );
    assert!(result.column_values(2).is_err());
}

#[test]
fn test_column_of_empty_result_set() {
    let result = parse_result_lines(&["e", ""]).unwrap();
    assert_eq!(column_values(&result, 7).unwrap(), Vec::<f64>::new());
}

#[test]
fn test_parse_is_deterministic() {
    let lines = response(&[3, 1]);
    let first = parse_result_lines(&lines).unwrap();
    let second = parse_result_lines(&lines).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_encoded_value_decodes_back() {
    let token = encode_value("ba", -1.5e-6, SiPrefix::Nano).unwrap();
    let value = decode_token(&token).unwrap();
    assert_eq!(value.raw_magnitude, -1500);
    assert_eq!(value.unit, Unit::Ampere);
    assert_eq!(value.numeric_value, -1.5e-6);
}

#[test]
fn test_result_set_serializes() {
    let result = parse_result_lines(&response(&[1])).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    let values = &json["curves"][0]["packages"][0]["values"];
    assert_eq!(values[0]["var_type"]["id"], "eb");
    assert_eq!(values[1]["unit"], "Ampere");
}
