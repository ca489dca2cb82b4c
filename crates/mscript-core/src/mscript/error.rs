//! Error types for result decoding

use thiserror::Error;

use crate::protocol::ProtocolError;

/// Errors decoding a single value or projecting a column
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// A value token that does not follow the encoding
    #[error("Malformed token {token:?}: {reason}")]
    MalformedToken {
        /// The token text
        token: String,
        /// What was wrong with it
        reason: String,
    },

    /// A package narrower than the requested column

    #[error(
        "Column {column} out of range: curve {curve} package {package} has only {width} values"
    )]
    ColumnIndexOutOfRange {
        /// Requested column
        column: usize,
        /// Index of the curve holding the package
        curve: usize,
        /// Index of the package within that curve
        package: usize,
        /// Number of values the package has
        width: usize,
    },
}

impl DecodeError {
    pub(crate) fn malformed(token: &str, reason: impl Into<String>) -> Self {
        DecodeError::MalformedToken {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors turning response lines into a result set
#[derive(Error, Debug)]
pub enum ParseError {
    /// The line sequence breaks the response structure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A package line holds a token that does not decode
    #[error("Line {line_number}: {source} in {line:?}")]
    Decode {
        /// 1-based position of the package line
        line_number: usize,
        /// The package line
        line: String,
        /// Why the token failed
        #[source]
        source: DecodeError,
    },
}

impl ParseError {
    /// Text of the offending token, if a token failed to decode
    pub fn malformed_token(&self) -> Option<&str> {
        match self {
            ParseError::Decode {
                source: DecodeError::MalformedToken { token, .. },
                ..
            } => Some(token),
            _ => None,
        }
    }

    /// Line number (1-based) the error refers to, if any
    pub fn line_number(&self) -> Option<usize> {
        match self {
            ParseError::Decode { line_number, .. }
            | ParseError::Protocol(ProtocolError::ProtocolSyntaxError { line_number, .. })
            | ParseError::Protocol(ProtocolError::DeviceError { line_number, .. }) => {
                Some(*line_number)
            }
            _ => None,
        }
    }
}
