use std::fmt;

use thiserror::Error;

use crate::value::ValueKind;

/// Where in the loaded dialogue a script problem was found.
///
/// Line numbers are a best guess: they count from the first line of the
/// node's body, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub node: String,
    pub line_number: usize,
}

impl SourceLocation {
    pub fn new(file: Option<String>, node: &str, line_number: usize) -> Self {
        Self {
            file,
            node: node.to_string(),
            line_number,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file)?;
        }
        write!(f, "{}:{}", self.node, self.line_number)
    }
}

/// Malformed markup found while compiling or running a node body.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    pub location: SourceLocation,
    pub message: String,
}

impl ScriptError {
    pub fn new(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl std::error::Error for ScriptError {}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// The text is missing the `---` sentinel that starts every node body.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A start or target node is not part of the loaded node set.
    #[error("no node named {0:?} has been loaded")]
    NodeNotFound(String),

    /// A variable was read as a different type than the one stored.
    #[error("variable {name} holds a {found}, not a {expected}")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// An option index outside of the options currently offered.
    #[error("{index} is not a valid option (expected a number below {count})")]
    InvalidOption { index: usize, count: usize },

    /// An operation was called while the session was in the wrong status.
    #[error("cannot {operation} while the dialogue is {status:?}")]
    InvalidState {
        operation: &'static str,
        status: crate::SessionStatus,
    },

    #[error("script error at {0}")]
    RuntimeScript(ScriptError),

    /// Variable text that does not follow the `type:$name,value` layout.
    #[error("malformed variable data: {0}")]
    MalformedVariableData(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ScriptError> for Error {
    fn from(err: ScriptError) -> Self {
        Self::RuntimeScript(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
