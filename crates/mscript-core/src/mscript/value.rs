//! Value decoder
//!
//! An encoded value looks like `ba48D503Dp,10,288`:
//!
//! - `ba` variable type id (see [`VarType`])
//! - `48D503D` magnitude, 7 hex digits, offset by 2^27 to carry the sign
//! - `p` SI prefix character
//! - `,10,288` optional metadata fields

use serde::Serialize;
use std::fmt;

use super::metadata::{CurrentRange, Status};
use super::prefix::SiPrefix;
use super::var_types::{Quantity, Unit, VarType};
use super::DecodeError;

/// Offset added to the signed magnitude before hex encoding
pub const MAGNITUDE_OFFSET: i64 = 1 << 27;

const TYPE_ID_LEN: usize = 2;
const MAGNITUDE_DIGITS: usize = 7;
const VALUE_LEN: usize = TYPE_ID_LEN + MAGNITUDE_DIGITS + 1;

/// Separator between a value and its metadata fields
pub const METADATA_SEPARATOR: char = ',';

/// One decoded measurement value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Value {
    /// Variable type from the closed table
    pub var_type: &'static VarType,
    /// Signed fixed-point magnitude as transmitted
    pub raw_magnitude: i32,
    /// Scale of `raw_magnitude`
    pub si_prefix: SiPrefix,
    /// Unit of `numeric_value`
    pub unit: Unit,
    /// `raw_magnitude * 10^exponent(si_prefix)`
    pub numeric_value: f64,
    /// Status flags, when reported
    pub status: Option<Status>,
    /// Current range, when reported
    pub current_range: Option<CurrentRange>,
}

impl Value {
    /// Two-letter variable type id
    pub fn type_id(&self) -> &'static str {
        self.var_type.id
    }

    /// Physical quantity of the value
    pub fn quantity(&self) -> Quantity {
        self.var_type.quantity
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {}{}{}",
            self.var_type.name,
            self.raw_magnitude,
            self.si_prefix.symbol(),
            self.unit.symbol()
        )?;
        if let Some(status) = self.status {
            if !status.is_ok() {
                write!(f, " [{}]", status)?;
            }
        }
        if let Some(range) = self.current_range {
            write!(f, " (CR: {})", range)?;
        }
        Ok(())
    }
}

/// Decode one encoded value using the default metadata separator
pub fn decode_token(token: &str) -> Result<Value, DecodeError> {
    decode_token_with(token, METADATA_SEPARATOR)
}

/// Decode one encoded value whose metadata fields are split by `separator`
pub fn decode_token_with(token: &str, separator: char) -> Result<Value, DecodeError> {
    if !token.is_ascii() {
        return Err(DecodeError::malformed(token, "non-ASCII characters"));
    }

    let mut fields = token.split(separator);
    let value_text = fields.next().unwrap_or_default();
    if value_text.len() != VALUE_LEN {
        return Err(DecodeError::malformed(
            token,
            format!(
                "expected {} characters before metadata, found {}",
                VALUE_LEN,
                value_text.len()
            ),
        ));
    }

    let (type_id, rest) = value_text.split_at(TYPE_ID_LEN);
    let (digits, prefix_text) = rest.split_at(MAGNITUDE_DIGITS);

    let var_type = VarType::lookup(type_id)
        .ok_or_else(|| DecodeError::malformed(token, format!("unknown variable type '{}'", type_id)))?;

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DecodeError::malformed(
            token,
            format!("magnitude '{}' is not hexadecimal", digits),
        ));
    }
    let encoded = i64::from_str_radix(digits, 16)
        .map_err(|e| DecodeError::malformed(token, format!("magnitude '{}': {}", digits, e)))?;
    let raw_magnitude = (encoded - MAGNITUDE_OFFSET) as i32;

    let prefix_char = prefix_text.chars().next().unwrap_or_default();
    let si_prefix = SiPrefix::from_char(prefix_char)
        .ok_or_else(|| DecodeError::malformed(token, format!("unknown SI prefix {:?}", prefix_char)))?;

    let mut status = None;
    let mut current_range = None;
    for field in fields {
        let mut chars = field.chars();
        let id = chars.next();
        let body = chars.as_str();
        let parsed = if !body.is_empty()
            && body.len() <= 2
            && body.chars().all(|c| c.is_ascii_hexdigit())
        {
            u8::from_str_radix(body, 16).ok()
        } else {
            None
        };
        match (id, parsed) {
            (Some('1'), Some(bits)) => status = Some(Status(bits)),
            (Some('2'), Some(code)) => current_range = Some(CurrentRange(code)),
            _ => {
                return Err(DecodeError::malformed(
                    token,
                    format!("invalid metadata field {:?}", field),
                ))
            }
        }
    }

    Ok(Value {
        var_type,
        raw_magnitude,
        si_prefix,
        unit: var_type.unit,
        numeric_value: si_prefix.scale(raw_magnitude as i64),
        status,
        current_range,
    })
}

/// Encode a magnitude the way the instrument does (no metadata)
///
/// Returns `None` for an unknown type id or a magnitude outside the
/// 28-bit signed range.
pub fn encode_token(type_id: &str, raw_magnitude: i64, prefix: SiPrefix) -> Option<String> {
    VarType::lookup(type_id)?;
    let encoded = raw_magnitude.checked_add(MAGNITUDE_OFFSET)?;
    if !(0..(1 << 28)).contains(&encoded) {
        return None;
    }
    Some(format!("{}{:07X}{}", type_id, encoded, prefix.to_char()))
}

/// Encode a physical value, rounding to the resolution of `prefix`
pub fn encode_value(type_id: &str, value: f64, prefix: SiPrefix) -> Option<String> {
    let exp = prefix.exponent();
    let scaled = if exp < 0 {
        value * 10f64.powi(-exp)
    } else {
        value / 10f64.powi(exp)
    };
    if !scaled.is_finite() {
        return None;
    }
    encode_token(type_id, scaled.round() as i64, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_current_with_metadata() {
        let v = decode_token("ba48D503Dp,10,288").unwrap();
        assert_eq!(v.type_id(), "ba");
        assert_eq!(v.unit, Unit::Ampere);
        assert_eq!(v.si_prefix, SiPrefix::Pico);
        assert_eq!(v.raw_magnitude, 0x48D503D - (1 << 27));
        assert_eq!(v.status, Some(Status(0)));
        assert_eq!(v.current_range, Some(CurrentRange(0x88)));
        let expected = (0x48D503D_i64 - (1 << 27)) as f64 / 1e12;
        assert_eq!(v.numeric_value, expected);
    }

    #[test]
    fn test_decode_zero_and_negative() {
        let zero = decode_token("da8000000 ").unwrap();
        assert_eq!(zero.raw_magnitude, 0);
        assert_eq!(zero.numeric_value, 0.0);

        let neg = decode_token("da7FFFC18m").unwrap();
        assert_eq!(neg.raw_magnitude, -1000);
        assert_eq!(neg.numeric_value, -1.0);
    }

    #[test]
    fn test_decode_lowercase_hex() {
        let v = decode_token("eb80003e8m").unwrap();
        assert_eq!(v.raw_magnitude, 1000);
        assert_eq!(v.numeric_value, 1.0);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let a = decode_token("ab80F4240u,14").unwrap();
        let b = decode_token("ab80F4240u,14").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_type() {
        match decode_token("zz8000000 ") {
            Err(DecodeError::MalformedToken { token, reason }) => {
                assert_eq!(token, "zz8000000 ");
                assert!(reason.contains("zz"));
            }
            other => panic!("Expected MalformedToken, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_shapes() {
        for token in [
            "",
            "ba",
            "ba800000",
            "ba80000000 ",
            "ba80G0000 ",
            "ba+800000 ",
            "ba8000000x",
            "ba8000000 ,3",
            "ba8000000 ,1",
            "ba8000000 ,2ZZ",
            "ba8000000 ,2123",
            "ba800000µ",
        ] {
            assert!(
                matches!(decode_token(token), Err(DecodeError::MalformedToken { .. })),
                "{:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_encode_round_trip() {
        for (id, raw, prefix) in [
            ("eb", 1234_i64, SiPrefix::Milli),
            ("ba", -98765, SiPrefix::Nano),
            ("da", 0, SiPrefix::Unit),
            ("ee", 42, SiPrefix::Integer),
            ("dc", 5, SiPrefix::Kilo),
        ] {
            let token = encode_token(id, raw, prefix).unwrap();
            let v = decode_token(&token).unwrap();
            assert_eq!(v.raw_magnitude as i64, raw);
            assert_eq!(v.si_prefix, prefix);
            assert_eq!(v.numeric_value, prefix.scale(raw));
        }
    }

    #[test]
    fn test_encode_value_rounds_to_resolution() {
        let token = encode_value("ba", 1.2346e-6, SiPrefix::Nano).unwrap();
        let v = decode_token(&token).unwrap();
        assert_eq!(v.raw_magnitude, 1235);
        assert!((v.numeric_value - 1.2346e-6).abs() <= 0.5e-9);
    }

    #[test]
    fn test_encode_out_of_range() {
        assert!(encode_token("ba", 1 << 27, SiPrefix::Unit).is_none());
        assert!(encode_token("ba", -(1 << 27) - 1, SiPrefix::Unit).is_none());
        assert!(encode_token("ba", -(1 << 27), SiPrefix::Unit).is_some());
        assert!(encode_token("qq", 0, SiPrefix::Unit).is_none());
    }

    #[test]
    fn test_display() {
        let v = decode_token("eb80003E8m").unwrap();
        assert_eq!(v.to_string(), "Time = 1000ms");
    }
}
