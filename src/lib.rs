//! The portable core of the Merino Yarn editor.
//!
//! - [`codec`] reads and writes the plain-text node format.
//! - [`VariableStore`] keeps typed dialogue variables.
//! - [`DialogueSession`] walks node bodies one line, option set or command
//!   at a time, waiting for the host between each.
//!
//! ```
//! use merino::{codec, DialogueSession, SuspendReason};
//!
//! let nodes = codec::parse("title: Start\n---\nHello!\n===\n").unwrap();
//!
//! let mut session = DialogueSession::default();
//! session.start("Start", &nodes).unwrap();
//!
//! match session.continue_dialogue().unwrap() {
//!     SuspendReason::Line(line) => assert_eq!(line.text, "Hello!"),
//!     other => panic!("unexpected {:?}", other),
//! }
//! session.acknowledge_line().unwrap();
//! ```

use std::collections::HashMap;

pub use crate::{
    codec::{CodecConfig, LineEnding, NodeRecord, Position},
    errors::{Error, Result, ScriptError, SourceLocation},
    session::{DialogueSession, SessionConfig, SessionStatus, SuspendReason},
    utils::expand_format_functions,
    value::{ValueKind, YarnValue},
    variables::{VariableStore, VariableType},
};

pub mod codec;
pub mod compiler;
mod errors;
pub mod functions;
pub mod parser;
mod session;
mod utils;
mod value;
mod variables;

/// A line of dialogue, with its inline expressions already substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub tags: Vec<String>,
    pub location: SourceLocation,
}

/// One of the choices offered by [`SuspendReason::Options`].
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueOption {
    pub line: Line,
    /// The index to pass to [`DialogueSession::choose_option`].
    pub id: usize,
    /// A node name for `[[links]]`; an internal label for `->` options.
    pub destination: String,
}

impl DialogueOption {
    fn new(line: Line, id: usize, destination: String) -> Self {
        Self {
            line,
            id,
            destination,
        }
    }
}

pub type ReturningFunction = dyn Fn(&DialogueSession, &[YarnValue]) -> std::result::Result<YarnValue, String>;
pub type Function = dyn Fn(&DialogueSession, &[YarnValue]);

pub enum YarnFunction {
    Void(Box<Function>),
    Returning(Box<ReturningFunction>),
}

impl YarnFunction {
    pub fn call(&self, session: &DialogueSession, params: &[YarnValue]) -> std::result::Result<Option<YarnValue>, String> {
        match self {
            Self::Void(func) => {
                (func)(session, params);
                Ok(None)
            }
            Self::Returning(func) => {
                (func)(session, params).map(Some)
            }
        }
    }
}

pub struct FunctionInfo {
    /// `-1` accepts any number of parameters.
    param_count: i8,
    func: YarnFunction,
}

impl FunctionInfo {
    pub fn new<F>(param_count: i8, func: F) -> Self
    where
        F: Fn(&DialogueSession, &[YarnValue]) + 'static,
    {
        Self {
            param_count,
            func: YarnFunction::Void(Box::new(func)),
        }
    }

    pub fn new_returning<F>(param_count: i8, func: F) -> Self
    where
        F: Fn(&DialogueSession, &[YarnValue]) -> std::result::Result<YarnValue, String> + 'static,
    {
        Self {
            param_count,
            func: YarnFunction::Returning(Box::new(func)),
        }
    }

    pub fn param_count(&self) -> i8 {
        self.param_count
    }

    /// Calls the function after checking it was given the right number of
    /// parameters.
    pub fn call(&self, session: &DialogueSession, params: &[YarnValue]) -> std::result::Result<Option<YarnValue>, String> {
        if self.param_count >= 0 && self.param_count as usize != params.len() {
            return Err(format!(
                "expected {} parameters, but received {}",
                self.param_count,
                params.len(),
            ));
        }
        self.func.call(session, params)
    }
}

pub type Library = HashMap<String, FunctionInfo>;
