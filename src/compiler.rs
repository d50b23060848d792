//! Turns parsed node bodies into instructions for [`DialogueSession`].
//!
//! [`DialogueSession`]: crate::DialogueSession

use std::collections::HashMap;

use log::*;

use crate::{
    codec::{self, NodeRecord},
    errors::{Result, ScriptError, SourceLocation},
    parser::{
        self,
        ast::{Expression, FormattedText, ShortcutOption, Statement},
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Jumps to a named position in the node.
    JumpTo(String),
    /// Peeks a label name from the stack and jumps to it.
    Jump,
    /// Pops `substitutions` values and delivers the line to the host.
    RunLine {
        text: String,
        substitutions: usize,
        tags: Vec<String>,
        line_number: usize,
    },
    /// Pops `substitutions` values and delivers the command to the host.
    RunCommand {
        text: String,
        substitutions: usize,
        line_number: usize,
    },
    /// Adds an entry to the option list (see ShowOptions). `destination` is
    /// a node name for `[[links]]` and a label for `->` options.
    AddOption {
        text: String,
        substitutions: usize,
        destination: String,
        tags: Vec<String>,
        /// A `[[Node]]` link without a label: when it ends up as the only
        /// option it is followed without asking.
        jump_if_alone: bool,
        line_number: usize,
    },
    /// Presents the current list of options to the host, then clears the
    /// list. The selected destination is pushed when execution resumes.
    ShowOptions,
    PushString(String),
    PushFloat(f32),
    PushBool(bool),
    PushNull,
    /// Jumps to the named position if the top of the stack is falsy.
    JumpIfFalse(String),
    Pop,
    /// Pops an argument count, then that many arguments, and pushes the
    /// function's return value.
    CallFunc {
        function: String,
        line_number: usize,
    },
    PushVariable(String),
    /// Stores the top of the stack in the named variable.
    StoreVariable(String),
    Stop,
    /// Runs the node whose name is on top of the stack.
    RunNode,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: String,
    pub instructions: Vec<Instruction>,
    /// A jump table, mapping the names of labels to positions in the
    /// instructions list.
    pub labels: HashMap<String, usize>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub nodes: HashMap<String, Node>,
}

/// Compiles Yarn text straight from its file form.
pub fn compile_string(src: &str, file: Option<&str>) -> Result<(Program, Vec<ScriptError>)> {
    let nodes = codec::parse(src)?;
    Ok(compile_nodes(&nodes, file))
}

/// Compiles every node body. Problems are returned alongside the program;
/// the statements they affect are left out.
pub fn compile_nodes(nodes: &[NodeRecord], file: Option<&str>) -> (Program, Vec<ScriptError>) {
    let mut program = Program::default();
    let mut errors = Vec::new();

    for record in nodes {
        let location = |line_number| SourceLocation::new(file.map(str::to_string), &record.title, line_number);

        let (body, diagnostics) = parser::parse_body(&record.body);
        errors.extend(diagnostics.into_iter().map(|diagnostic| {
            ScriptError::new(location(diagnostic.line_number), diagnostic.message)
        }));

        let mut compiler = NodeCompiler::default();
        compiler.statements(&body.statements);
        if compiler.has_link_options {
            compiler.emit(Instruction::ShowOptions);
            compiler.emit(Instruction::RunNode);
        } else {
            compiler.emit(Instruction::Stop);
        }

        let node = Node {
            name: record.title.clone(),
            instructions: compiler.instructions,
            labels: compiler.labels,
            tags: record.tag_list().map(str::to_string).collect(),
        };

        debug!("Compiled node {} into {} instructions", node.name, node.instructions.len());

        if program.nodes.insert(node.name.clone(), node).is_some() {
            errors.push(ScriptError::new(location(0), "duplicate node title, keeping the last one"));
        }
    }

    (program, errors)
}

#[derive(Default)]
struct NodeCompiler {
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
    label_count: usize,
    has_link_options: bool,
}

impl NodeCompiler {
    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn register_label(&mut self, hint: &str) -> String {
        self.label_count += 1;
        format!("L{}{}", self.label_count, hint)
    }

    fn mark(&mut self, label: &str) {
        self.labels.insert(label.to_string(), self.instructions.len());
    }

    fn statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Line { text, tags, line_number } => {
                let substitutions = self.formatted_text(text, *line_number);
                self.emit(Instruction::RunLine {
                    text: text.template.clone(),
                    substitutions,
                    tags: tags.clone(),
                    line_number: *line_number,
                });
            }
            Statement::Command { text, line_number } => {
                let substitutions = self.formatted_text(text, *line_number);
                self.emit(Instruction::RunCommand {
                    text: text.template.clone(),
                    substitutions,
                    line_number: *line_number,
                });
            }
            Statement::Set { variable, value, line_number } => {
                self.expression(value, *line_number);
                self.emit(Instruction::StoreVariable(variable.clone()));
                self.emit(Instruction::Pop);
            }
            Statement::If { clauses } => {
                let end_label = self.register_label("endif");
                for clause in clauses {
                    match &clause.condition {
                        Some(condition) => {
                            let skip_label = self.register_label("skipclause");
                            self.expression(condition, clause.line_number);
                            self.emit(Instruction::JumpIfFalse(skip_label.clone()));
                            self.emit(Instruction::Pop);
                            self.statements(&clause.statements);
                            self.emit(Instruction::JumpTo(end_label.clone()));
                            self.mark(&skip_label);
                            self.emit(Instruction::Pop);
                        }
                        None => {
                            self.statements(&clause.statements);
                            self.emit(Instruction::JumpTo(end_label.clone()));
                        }
                    }
                }
                self.mark(&end_label);
            }
            Statement::OptionLink { label, destination, line_number } => {
                self.has_link_options = true;
                let (text, substitutions) = match label {
                    Some(label) => (label.template.clone(), self.formatted_text(label, *line_number)),
                    None => (destination.clone(), 0),
                };
                self.emit(Instruction::AddOption {
                    text,
                    substitutions,
                    destination: destination.clone(),
                    tags: Vec::new(),
                    jump_if_alone: label.is_none(),
                    line_number: *line_number,
                });
            }
            Statement::ShortcutOptions(options) => {
                self.shortcut_options(options);
            }
            Statement::Jump { destination, .. } => {
                self.emit(Instruction::PushString(destination.clone()));
                self.emit(Instruction::RunNode);
            }
            Statement::Stop => {
                self.emit(Instruction::Stop);
            }
        }
    }

    fn shortcut_options(&mut self, options: &[ShortcutOption]) {
        let end_label = self.register_label("group_end");
        let mut option_labels = Vec::with_capacity(options.len());

        for option in options {
            let option_label = self.register_label("option");
            let skip_label = option.condition.as_ref().map(|condition| {
                let skip_label = self.register_label("conditional_option");
                self.expression(condition, option.line_number);
                self.emit(Instruction::JumpIfFalse(skip_label.clone()));
                skip_label
            });

            let substitutions = self.formatted_text(&option.text, option.line_number);
            self.emit(Instruction::AddOption {
                text: option.text.template.clone(),
                substitutions,
                destination: option_label.clone(),
                tags: option.tags.clone(),
                jump_if_alone: false,
                line_number: option.line_number,
            });

            if let Some(skip_label) = skip_label {
                self.mark(&skip_label);
                self.emit(Instruction::Pop);
            }
            option_labels.push(option_label);
        }

        self.emit(Instruction::ShowOptions);
        self.emit(Instruction::Jump);

        for (option, option_label) in options.iter().zip(&option_labels) {
            self.mark(option_label);
            self.emit(Instruction::Pop);
            self.statements(&option.statements);
            self.emit(Instruction::JumpTo(end_label.clone()));
        }

        self.mark(&end_label);
    }

    /// Pushes the inline expressions and returns how many there are.
    fn formatted_text(&mut self, text: &FormattedText, line_number: usize) -> usize {
        for expr in &text.expressions {
            self.expression(expr, line_number);
        }
        text.expressions.len()
    }

    fn expression(&mut self, expr: &Expression, line_number: usize) {
        match expr {
            Expression::Number(val) => self.emit(Instruction::PushFloat(*val)),
            Expression::Str(val) => self.emit(Instruction::PushString(val.clone())),
            Expression::Bool(val) => self.emit(Instruction::PushBool(*val)),
            Expression::Null => self.emit(Instruction::PushNull),
            Expression::Variable(name) => self.emit(Instruction::PushVariable(name.clone())),
            Expression::Call { function, arguments } => {
                for argument in arguments {
                    self.expression(argument, line_number);
                }
                self.emit(Instruction::PushFloat(arguments.len() as f32));
                self.emit(Instruction::CallFunc {
                    function: function.clone(),
                    line_number,
                });
            }
        }
    }
}
