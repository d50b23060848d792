use std::collections::HashMap;
use std::mem;

use log::*;

use crate::{
    codec::NodeRecord,
    compiler::{self, Instruction, Program},
    errors::{Error, Result, ScriptError, SourceLocation},
    functions,
    utils::expand_format_functions,
    DialogueOption, Library, Line, VariableStore, YarnValue,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// BCP-47 tag used to pick plural forms in format functions.
    pub locale: String,
    /// Reported in script error locations.
    pub file_name: Option<String>,
    pub reset_variables_on_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            file_name: None,
            reset_variables_on_start: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    WaitingForLineAck,
    WaitingForOptionChoice,
    WaitingForCommandAck,
    Complete,
}

/// Why [`DialogueSession::continue_dialogue`] returned.
#[derive(Debug, Clone, PartialEq)]
pub enum SuspendReason {
    /// Call [`DialogueSession::acknowledge_line`] once it has been shown.
    Line(Line),
    /// Call [`DialogueSession::choose_option`] with the picked option's id.
    Options(Vec<DialogueOption>),
    /// Call [`DialogueSession::acknowledge_command`] once it has run.
    Command(String),
    /// `node` finished. When `next` is set, the session is already running it.
    NodeComplete { node: String, next: Option<String> },
    /// Nothing is left to run. Holds the last node's name.
    DialogueComplete(String),
}

#[derive(Debug, Clone)]
struct PendingOption {
    line: Line,
    destination: String,
    jump_if_alone: bool,
}

struct VmState {
    current_node_name: String,
    program_counter: usize,
    current_options: Vec<PendingOption>,
    stack: Vec<YarnValue>,
    /// The last node completed without moving on; the next step ends the
    /// dialogue.
    finished: bool,
}

impl VmState {
    fn new() -> Self {
        Self {
            current_node_name: String::new(),
            program_counter: 0,
            current_options: Vec::new(),
            stack: Vec::new(),
            finished: false,
        }
    }
}

/// Runs dialogue from a set of parsed nodes.
///
/// The session never resumes on its own: every line, option set and command
/// it returns must be answered by the host before
/// [`continue_dialogue`](Self::continue_dialogue) can be called again.
pub struct DialogueSession {
    config: SessionConfig,
    program: Program,
    state: VmState,
    status: SessionStatus,
    visit_counter: HashMap<String, usize>,
    error_handler: Option<Box<dyn FnMut(&ScriptError)>>,

    pub variable_storage: VariableStore,
    pub library: Library,
}

impl Default for DialogueSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl DialogueSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            program: Program::default(),
            state: VmState::new(),
            status: SessionStatus::Idle,
            visit_counter: HashMap::new(),
            error_handler: None,
            variable_storage: VariableStore::new(),
            library: functions::standard_library(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// The node being run, or `None` when the session is not running.
    pub fn current_node(&self) -> Option<&str> {
        match self.status {
            SessionStatus::Idle | SessionStatus::Complete => None,
            _ => Some(&self.state.current_node_name),
        }
    }

    /// How many times a node has been completed since the session started.
    pub fn visit_count(&self, node_name: &str) -> usize {
        self.visit_counter.get(node_name).copied().unwrap_or(0)
    }

    /// Receives every script error found while compiling or running bodies.
    pub fn set_error_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&ScriptError) + 'static,
    {
        self.error_handler = Some(Box::new(handler));
    }

    /// Compiles `nodes` and gets ready to run `node_name`.
    ///
    /// Fails without changing anything if `node_name` is not one of `nodes`.
    pub fn start(&mut self, node_name: &str, nodes: &[NodeRecord]) -> Result<()> {
        if !nodes.iter().any(|node| node.title == node_name) {
            return Err(Error::NodeNotFound(node_name.to_string()));
        }

        let (program, errors) = compiler::compile_nodes(nodes, self.config.file_name.as_deref());
        for err in errors {
            self.report(err);
        }
        self.program = program;

        if self.config.reset_variables_on_start {
            self.variable_storage.clear();
        }
        self.visit_counter.clear();

        self.set_node(node_name);
        self.status = SessionStatus::Running;
        Ok(())
    }

    /// Abandons the dialogue. Valid in any status.
    pub fn stop(&mut self) {
        if self.status != SessionStatus::Idle {
            info!("Stopping dialogue in {:?}", self.state.current_node_name);
        }
        self.state = VmState::new();
        self.status = SessionStatus::Idle;
    }

    pub fn acknowledge_line(&mut self) -> Result<()> {
        self.resume(SessionStatus::WaitingForLineAck, "acknowledge a line")
    }

    pub fn acknowledge_command(&mut self) -> Result<()> {
        self.resume(SessionStatus::WaitingForCommandAck, "acknowledge a command")
    }

    pub fn choose_option(&mut self, selected_option_id: usize) -> Result<()> {
        self.expect_status(SessionStatus::WaitingForOptionChoice, "choose an option")?;

        let count = self.state.current_options.len();
        if selected_option_id >= count {
            return Err(Error::InvalidOption {
                index: selected_option_id,
                count,
            });
        }

        // We now know what number option was selected; push the
        // corresponding destination to the stack
        let option = self.state.current_options.swap_remove(selected_option_id);
        self.state.stack.push(YarnValue::Str(option.destination));
        self.state.current_options.clear();

        self.status = SessionStatus::Running;

        debug!("Selected option: {}", selected_option_id);
        Ok(())
    }

    /// Runs until the host needs to do something.
    pub fn continue_dialogue(&mut self) -> Result<SuspendReason> {
        self.expect_status(SessionStatus::Running, "continue the dialogue")?;

        if self.state.finished {
            let last_node = mem::take(&mut self.state.current_node_name);
            self.state = VmState::new();
            self.status = SessionStatus::Complete;
            info!("Dialogue complete");
            return Ok(SuspendReason::DialogueComplete(last_node));
        }

        // Execute instructions until something forces us to stop
        loop {
            let current_instruction = {
                let current_node = self.program.nodes.get(&self.state.current_node_name)
                    .ok_or_else(|| Error::NodeNotFound(self.state.current_node_name.clone()))?;
                current_node.instructions.get(self.state.program_counter)
                    .cloned()
                    .unwrap_or(Instruction::Stop)
            };

            self.state.program_counter += 1;

            if let Some(reason) = self.run_instruction(current_instruction)? {
                return Ok(reason);
            }
        }
    }

    fn expect_status(&self, expected: SessionStatus, operation: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                status: self.status,
            })
        }
    }

    fn resume(&mut self, expected: SessionStatus, operation: &'static str) -> Result<()> {
        self.expect_status(expected, operation)?;
        self.status = SessionStatus::Running;
        Ok(())
    }

    fn set_node(&mut self, node_name: &str) {
        debug!("Running node {}", node_name);
        self.state = VmState::new();
        self.state.current_node_name = node_name.to_string();
    }

    fn location(&self, line_number: usize) -> SourceLocation {
        SourceLocation::new(self.config.file_name.clone(), &self.state.current_node_name, line_number)
    }

    fn report(&mut self, err: ScriptError) {
        error!("{}", err);
        if let Some(handler) = self.error_handler.as_mut() {
            handler(&err);
        }
    }

    fn complete_node(&mut self, next: Option<String>) -> SuspendReason {
        let node = self.state.current_node_name.clone();
        *self.visit_counter.entry(node.clone()).or_insert(0) += 1;
        debug!("Completed node {}", node);
        SuspendReason::NodeComplete { node, next }
    }

    fn finish(&mut self) -> SuspendReason {
        let reason = self.complete_node(None);
        self.state.finished = true;
        reason
    }

    fn jump_to_label(&mut self, label: &str) -> Result<()> {
        let position = self.program.nodes.get(&self.state.current_node_name)
            .and_then(|node| node.labels.get(label))
            .copied();
        match position {
            Some(position) => {
                self.state.program_counter = position;
                Ok(())
            }
            None => {
                let message = format!("unknown label {}", label);
                Err(ScriptError::new(self.location(0), message).into())
            }
        }
    }

    fn pop_value(&mut self) -> YarnValue {
        self.state.stack.pop().unwrap_or(YarnValue::Null)
    }

    fn pop_substitutions(&mut self, count: usize) -> Vec<String> {
        let mut substitutions = vec![String::new(); count];
        for i in (0..count).rev() {
            substitutions[i] = self.pop_value().as_string();
        }
        substitutions
    }

    /// Builds the final text: `{n}` substitutions and `$variables`, then
    /// format functions when `format` is set.
    fn compose(&mut self, template: &str, substitutions: &[String], line_number: usize, format: bool) -> String {
        let text = fill_template(template, substitutions, &self.variable_storage);

        if !format {
            return text;
        }
        match expand_format_functions(&text, &self.config.locale) {
            Ok(expanded) => expanded,
            Err(message) => {
                let err = ScriptError::new(self.location(line_number), message);
                self.report(err);
                text
            }
        }
    }

    fn run_instruction(&mut self, instruction: Instruction) -> Result<Option<SuspendReason>> {
        trace!("Running {:?}", instruction);

        match instruction {
            Instruction::JumpTo(label) => {
                self.jump_to_label(&label)?;
            }
            Instruction::Jump => {
                match self.state.stack.last() {
                    Some(YarnValue::Str(label)) => {
                        let label = label.clone();
                        self.jump_to_label(&label)?;
                    }
                    other => {
                        let message = format!("cannot jump to {:?}", other);
                        return Err(ScriptError::new(self.location(0), message).into());
                    }
                }
            }
            Instruction::RunLine { text, substitutions, tags, line_number } => {
                let substitutions = self.pop_substitutions(substitutions);
                let text = self.compose(&text, &substitutions, line_number, true);
                let line = Line {
                    text,
                    tags,
                    location: self.location(line_number),
                };

                self.status = SessionStatus::WaitingForLineAck;
                return Ok(Some(SuspendReason::Line(line)));
            }
            Instruction::RunCommand { text, substitutions, line_number } => {
                let substitutions = self.pop_substitutions(substitutions);
                let command = self.compose(&text, &substitutions, line_number, false);

                self.status = SessionStatus::WaitingForCommandAck;
                return Ok(Some(SuspendReason::Command(command)));
            }
            Instruction::AddOption { text, substitutions, destination, tags, jump_if_alone, line_number } => {
                let substitutions = self.pop_substitutions(substitutions);
                let text = self.compose(&text, &substitutions, line_number, true);
                let line = Line {
                    text,
                    tags,
                    location: self.location(line_number),
                };

                self.state.current_options.push(PendingOption {
                    line,
                    destination,
                    jump_if_alone,
                });
            }
            Instruction::ShowOptions => {
                // If we have no options to show, immediately stop.
                if self.state.current_options.is_empty() {
                    return Ok(Some(self.finish()));
                }

                if self.state.current_options.len() == 1 && self.state.current_options[0].jump_if_alone {
                    let option = self.state.current_options.remove(0);
                    debug!("Following lone link to {}", option.destination);
                    self.state.stack.push(YarnValue::Str(option.destination));
                    return Ok(None);
                }

                let options = self.state.current_options.iter()
                    .enumerate()
                    .map(|(i, opt)| DialogueOption::new(opt.line.clone(), i, opt.destination.clone()))
                    .collect();

                // We can't continue until our client tell us which option to pick.
                self.status = SessionStatus::WaitingForOptionChoice;
                return Ok(Some(SuspendReason::Options(options)));
            }
            Instruction::PushString(val) => {
                self.state.stack.push(YarnValue::Str(val));
            }
            Instruction::PushFloat(val) => {
                self.state.stack.push(YarnValue::Number(val));
            }
            Instruction::PushBool(val) => {
                self.state.stack.push(YarnValue::Bool(val));
            }
            Instruction::PushNull => {
                self.state.stack.push(YarnValue::Null);
            }
            Instruction::JumpIfFalse(label) => {
                // Jump to a named label if the value on the top of the stack
                // evaluates to the boolean value 'false'.
                let condition = self.state.stack.last()
                    .map_or(false, YarnValue::as_bool);
                if !condition {
                    self.jump_to_label(&label)?;
                }
            }
            Instruction::Pop => {
                self.state.stack.pop();
            }
            Instruction::CallFunc { function, line_number } => {
                // Call a function, whose parameters are expected to
                // be on the stack. Pushes the function's return value,
                // or null if it returns nothing.
                let actual_param_count = self.pop_value().as_number() as usize;

                // Get the parameters, which were pushed in reverse
                let mut parameters = vec![YarnValue::Null; actual_param_count];
                for i in (0..actual_param_count).rev() {
                    parameters[i] = self.pop_value();
                }

                let result = match self.library.get(&function) {
                    Some(info) => info.call(self, &parameters),
                    None => Err("no such function".to_string()),
                };

                match result {
                    Ok(value) => {
                        self.state.stack.push(value.unwrap_or(YarnValue::Null));
                    }
                    Err(message) => {
                        let message = format!("{}: {}", function, message);
                        let err = ScriptError::new(self.location(line_number), message);
                        self.report(err);
                        self.state.stack.push(YarnValue::Null);
                    }
                }
            }
            Instruction::PushVariable(var_name) => {
                // Undefined variables are null.
                let value = self.variable_storage.get(&var_name)
                    .cloned()
                    .unwrap_or(YarnValue::Null);
                self.state.stack.push(value);
            }
            Instruction::StoreVariable(var_name) => {
                if let Some(val) = self.state.stack.last().cloned() {
                    self.variable_storage.set_value(&var_name, val);
                }
            }
            Instruction::Stop => {
                return Ok(Some(self.finish()));
            }
            Instruction::RunNode => {
                let node_name = self.pop_value().as_string();
                if !self.program.nodes.contains_key(&node_name) {
                    error!("Cannot run node {:?} from {:?}: it does not exist", node_name, self.state.current_node_name);
                    self.state = VmState::new();
                    self.status = SessionStatus::Complete;
                    return Err(Error::NodeNotFound(node_name));
                }

                let reason = self.complete_node(Some(node_name.clone()));
                self.set_node(&node_name);
                return Ok(Some(reason));
            }
        }

        Ok(None)
    }
}

/// Fills a compiled template in one pass: `{n}` placeholders take the n-th
/// substitution and `$name` tokens take the variable's text. Unknown names and
/// out of range placeholders are left as they are. Inserted text is never
/// scanned again.
fn fill_template(template: &str, substitutions: &[String], variables: &VariableStore) -> String {
    let mut text = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(|c: char| c == '{' || c == '$') {
        text.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        if rest[start..].starts_with('{') {
            let digits = after.find(|c: char| !c.is_ascii_digit()).unwrap_or(after.len());
            let substitution = if digits > 0 && after[digits..].starts_with('}') {
                after[..digits].parse::<usize>().ok().and_then(|i| substitutions.get(i))
            } else {
                None
            };
            match substitution {
                Some(substitution) => {
                    text.push_str(substitution);
                    rest = &after[digits + 1..];
                }
                None => {
                    text.push('{');
                    rest = after;
                }
            }
            continue;
        }

        let len = after
            .char_indices()
            .find(|&(i, c)| !(c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit())))
            .map_or(after.len(), |(i, _)| i);

        let name = &rest[start..start + 1 + len];
        match variables.get(name) {
            Some(value) if len > 0 => text.push_str(&value.as_string()),
            _ => text.push_str(name),
        }
        rest = &after[len..];
    }
    text.push_str(rest);

    text
}
