//! # Error Types
//!
//! This module defines the full error taxonomy for the Musique interpreter.
//!
//! Every recoverable failure produces a [`MusiqueError`] wrapped in an
//! [`Error`] that pairs it with an optional [`FileRange`]; propagation is
//! fail-fast via `Result`'s `?`. The pretty-printer ([`Error::render`])
//! renders a heading, the offending source line with a `^` pointer, and
//! kind-specific advice, matching the original implementation's
//! `errors.cc`.
//!
//! ## Usage
//! ```rust
//! use musique::error::{Error, MusiqueError};
//!
//! let err: Error = MusiqueError::Missing_Variable { name: "x".into() }.into();
//! assert_eq!(err.to_string(), "Undefined variable referenced: x");
//! ```

use crate::location::FileRange;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq)]
#[allow(non_camel_case_types)]
pub enum Arithmetic_Error {
    #[error("division by zero")]
    Division_By_Zero,
    #[error("modulo by a non-integer divisor is not defined")]
    Fractional_Modulo,
    #[error("could not compute modular multiplicative inverse")]
    Unable_To_Calculate_Modular_Multiplicative_Inverse,
}

/// The full error taxonomy, one variant per kind listed in the design's
/// error-handling section.
#[derive(ThisError, Debug, Clone, PartialEq)]
#[allow(non_camel_case_types)]
pub enum MusiqueError {
    #[error("unrecognized character '{ch}'")]
    Unrecognized_Character { ch: char },

    #[error("expected an expression but source ended")]
    Unexpected_Empty_Source,

    #[error("failed to parse numeric literal '{source}'")]
    Failed_Numeric_Parsing { source: String },

    #[error("expected an expression separator before '{found}'")]
    Expected_Expression_Separator_Before { found: String },

    #[error("unexpected keyword '{keyword}'")]
    Unexpected_Keyword { keyword: String },

    #[error("undefined operator '{name}'")]
    Undefined_Operator { name: String },

    #[error("wrong number of arguments to {name}: expected {expected}, got {actual}")]
    Wrong_Arity_Of {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("value of type {type_name} is not callable")]
    Not_Callable { type_name: &'static str },

    #[error("'{what}' cannot be used as an identifier in {context}")]
    Literal_As_Identifier { what: String, context: &'static str },

    #[error("unsupported types for {operator_or_function} '{name}': expected one of {possibilities:?}")]
    Unsupported_Types_For {
        operator_or_function: &'static str,
        name: String,
        possibilities: Vec<&'static str>,
    },

    #[error("undefined variable referenced: {name}")]
    Missing_Variable { name: String },

    #[error("{0}")]
    Arithmetic(#[from] Arithmetic_Error),

    #[error("index {required_index} out of range for collection of size {size}")]
    Out_Of_Range { required_index: usize, size: usize },

    #[error("closing token '{token}' has no matching opening token")]
    Closing_Token_Without_Opening { token: String },

    #[error("this operation requires a MIDI {} connection named {name:?}", if *.is_input { "input" } else { "output" })]
    Operation_Requires_Midi_Connection { is_input: bool, name: Option<String> },

    #[error("internal: unexpected token '{found}'")]
    Unexpected_Token { found: String },

    #[error("evaluation interrupted")]
    Interrupted,
}

/// An error paired with the source range it occurred at, if known.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub details: MusiqueError,
    pub location: Option<FileRange>,
}

impl Error {
    pub fn new(details: MusiqueError) -> Self {
        Self {
            details,
            location: None,
        }
    }

    /// Attaches a location, but only if one is not already present —
    /// innermost sources dominate, matching the evaluator's fill-only-if-absent rule.
    pub fn with(mut self, location: FileRange) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    /// Renders the heading, offending source line with a `^` pointer, and
    /// kind-specific advice, given the original source text.
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        match &self.location {
            Some(range) => {
                let (line_no, column) = range.line_column(source);
                out.push_str(&format!("ERROR at {}:{}:{}\n", range.filename, line_no, column));
                if let Some(line) = source.lines().nth(line_no - 1) {
                    out.push_str(line);
                    out.push('\n');
                    out.push_str(&" ".repeat(column.saturating_sub(1)));
                    out.push_str("^\n");
                }
            }
            None => out.push_str("ERROR\n"),
        }
        out.push_str(&self.details.to_string());
        out.push('\n');
        out.push_str(advice_for(&self.details));
        out
    }
}

fn advice_for(details: &MusiqueError) -> &'static str {
    match details {
        MusiqueError::Missing_Variable { .. } => {
            "hint: variables must be declared with ':=' before use or assignment"
        }
        MusiqueError::Not_Callable { .. } => "hint: only blocks, intrinsics and chords can be called",
        MusiqueError::Wrong_Arity_Of { .. } => "hint: check the number of arguments passed",
        MusiqueError::Operation_Requires_Midi_Connection { .. } => {
            "hint: connect a MIDI output port before running this program"
        }
        _ => "",
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl std::error::Error for Error {}

impl From<MusiqueError> for Error {
    fn from(details: MusiqueError) -> Self {
        Error::new(details)
    }
}

impl From<Arithmetic_Error> for Error {
    fn from(a: Arithmetic_Error) -> Self {
        Error::new(MusiqueError::Arithmetic(a))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero_renders() {
        let err: Error = Arithmetic_Error::Division_By_Zero.into();
        assert_eq!(err.to_string(), "division by zero");
    }

    #[test]
    fn location_attaches_only_once() {
        let name: std::rc::Rc<str> = std::rc::Rc::from("a.mq");
        let inner = FileRange::new(name.clone(), 0, 1);
        let outer = FileRange::new(name, 5, 6);
        let err = Error::new(MusiqueError::Missing_Variable { name: "x".into() })
            .with(inner.clone())
            .with(outer);
        assert_eq!(err.location, Some(inner));
    }
}
