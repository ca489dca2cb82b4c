//! MethodSCRIPT scripts
//!
//! The library does not interpret script commands; a script is only the
//! ordered list of lines to transmit.

use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors loading a script
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The script file could not be read
    #[error("Cannot read script '{path}': {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// No lines at all
    #[error("Script is empty")]
    Empty,

    /// The device only accepts ASCII
    #[error("Script line {line_number} is not ASCII: {line:?}")]
    NonAscii {
        /// 1-based line number
        line_number: usize,
        /// The offending line
        line: String,
    },
}

/// An immutable, ordered sequence of script lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    /// Build a script from lines; terminators are stripped
    pub fn from_lines<I, S>(lines: I) -> Result<Self, ScriptError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines
            .into_iter()
            .map(|l| {
                let mut l: String = l.into();
                while l.ends_with('\n') || l.ends_with('\r') {
                    l.pop();
                }
                l
            })
            .collect();

        if lines.iter().all(|l| l.trim().is_empty()) {
            return Err(ScriptError::Empty);
        }
        if let Some((index, line)) = lines.iter().enumerate().find(|(_, l)| !l.is_ascii()) {
            return Err(ScriptError::NonAscii {
                line_number: index + 1,
                line: line.clone(),
            });
        }
        Ok(Self { lines })
    }

    /// Read a script file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        text.parse()
    }

    /// Lines in transmission order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines to transmit
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false for a loaded script
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl FromStr for Script {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_lines(s.lines())
    }
}

impl<'a> IntoIterator for &'a Script {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
