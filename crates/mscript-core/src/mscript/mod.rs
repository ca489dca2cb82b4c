//! MethodSCRIPT result decoding
//!
//! Decodes the response lines of a script run into curves of packages of
//! typed values, and projects them by column.

mod column;
mod error;
pub mod metadata;
mod parser;
pub mod prefix;
pub mod value;
pub mod var_types;

pub use column::{column, column_values, column_values_by_curve};
pub use error::{DecodeError, ParseError};
pub use metadata::{CurrentRange, Status};
pub use parser::{parse_result_lines, parse_result_lines_with, Curve, Package, ResultSet};
pub use prefix::SiPrefix;
pub use value::{decode_token, decode_token_with, encode_token, encode_value, Value};
pub use var_types::{Quantity, Unit, VarType, VAR_TYPES};
