//! SI prefixes of encoded values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale selector carried as the last character of an encoded value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiPrefix {
    /// `a`, 1e-18
    Atto,
    /// `f`, 1e-15
    Femto,
    /// `p`, 1e-12
    Pico,
    /// `n`, 1e-9
    Nano,
    /// `u`, 1e-6
    Micro,
    /// `m`, 1e-3
    Milli,
    /// No prefix (encoded as a space)
    Unit,
    /// `k`, 1e3
    Kilo,
    /// `M`, 1e6
    Mega,
    /// `G`, 1e9
    Giga,
    /// `T`, 1e12
    Tera,
    /// `P`, 1e15
    Peta,
    /// `E`, 1e18
    Exa,
    /// Plain integer (encoded as `i`), scale 1
    Integer,
}

/// (prefix, wire character, decimal exponent)
const PREFIX_TABLE: &[(SiPrefix, char, i32)] = &[
    (SiPrefix::Atto, 'a', -18),
    (SiPrefix::Femto, 'f', -15),
    (SiPrefix::Pico, 'p', -12),
    (SiPrefix::Nano, 'n', -9),
    (SiPrefix::Micro, 'u', -6),
    (SiPrefix::Milli, 'm', -3),
    (SiPrefix::Unit, ' ', 0),
    (SiPrefix::Kilo, 'k', 3),
    (SiPrefix::Mega, 'M', 6),
    (SiPrefix::Giga, 'G', 9),
    (SiPrefix::Tera, 'T', 12),
    (SiPrefix::Peta, 'P', 15),
    (SiPrefix::Exa, 'E', 18),
    (SiPrefix::Integer, 'i', 0),
];

impl SiPrefix {
    /// Look up the prefix for a wire character
    pub fn from_char(c: char) -> Option<Self> {
        PREFIX_TABLE
            .iter()
            .find(|(_, ch, _)| *ch == c)
            .map(|(p, _, _)| *p)
    }

    /// Wire character of this prefix
    pub fn to_char(self) -> char {
        PREFIX_TABLE
            .iter()
            .find(|(p, _, _)| *p == self)
            .map(|(_, ch, _)| *ch)
            .unwrap_or(' ')
    }

    /// Decimal exponent this prefix stands for
    pub fn exponent(self) -> i32 {
        PREFIX_TABLE
            .iter()
            .find(|(p, _, _)| *p == self)
            .map(|(_, _, e)| *e)
            .unwrap_or(0)
    }

    /// Apply the prefix to an integer magnitude
    ///
    /// Negative exponents divide by an exact power of ten so that e.g.
    /// `1234` milli comes out as exactly `1.234`.
    pub fn scale(self, raw: i64) -> f64 {
        let exp = self.exponent();
        if exp < 0 {
            raw as f64 / 10f64.powi(-exp)
        } else {
            raw as f64 * 10f64.powi(exp)
        }
    }

    /// Symbol used when printing values (`µ`, `m`, ...)
    pub fn symbol(self) -> &'static str {
        match self {
            SiPrefix::Atto => "a",
            SiPrefix::Femto => "f",
            SiPrefix::Pico => "p",
            SiPrefix::Nano => "n",
            SiPrefix::Micro => "µ",
            SiPrefix::Milli => "m",
            SiPrefix::Unit | SiPrefix::Integer => "",
            SiPrefix::Kilo => "k",
            SiPrefix::Mega => "M",
            SiPrefix::Giga => "G",
            SiPrefix::Tera => "T",
            SiPrefix::Peta => "P",
            SiPrefix::Exa => "E",
        }
    }
}

impl fmt::Display for SiPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
