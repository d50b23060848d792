//! Parses node bodies into statements.
//!
//! Bodies are read line by line. Conditionals are delimited by
//! `<<if>>`/`<<endif>>`, while the contents of a `->` option are the lines
//! indented deeper than the option itself.

pub mod ast;
mod expression;
mod lexer;
mod token;

use log::*;

pub use self::expression::parse_expression;
use self::{
    ast::{Body, Clause, Expression, FormattedText, ShortcutOption, Statement},
    expression::ExpressionParser,
    token::Token,
};

const TAB_WIDTH: usize = 4;

/// A problem found while parsing, with the body line it was found on.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line_number: usize,
    pub message: String,
}

#[derive(Debug, Copy, Clone)]
struct SourceLine<'input> {
    number: usize,
    indent: usize,
    text: &'input str,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum LineKind<'input> {
    If(&'input str),
    ElseIf(&'input str),
    Else,
    EndIf,
    Shortcut,
    Other,
}

impl<'input> LineKind<'input> {
    fn of(text: &'input str) -> Self {
        if text.starts_with("->") {
            return Self::Shortcut;
        }

        let inner = match command_inner(text) {
            Some(inner) => inner,
            None => return Self::Other,
        };
        let (keyword, rest) = split_keyword(inner);
        match keyword {
            "if" => Self::If(rest),
            "elseif" => Self::ElseIf(rest),
            "else" if rest.is_empty() => Self::Else,
            "endif" if rest.is_empty() => Self::EndIf,
            _ => Self::Other,
        }
    }
}

/// The text between `<<` and `>>` when the whole line is one command.
fn command_inner(text: &str) -> Option<&str> {
    if text.starts_with("<<") && text.ends_with(">>") && text.len() >= 4 {
        Some(text[2..text.len() - 2].trim())
    } else {
        None
    }
}

fn split_keyword(inner: &str) -> (&str, &str) {
    match inner.find(char::is_whitespace) {
        Some(i) => (&inner[..i], inner[i..].trim()),
        None => (inner, ""),
    }
}

fn measure_indent(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

/// Splits trailing `#tag` words off a line.
fn split_tags(text: &str) -> (&str, Vec<String>) {
    let mut text = text.trim_end();
    let mut tags = Vec::new();

    loop {
        let start = text.rfind(char::is_whitespace).map_or(0, |i| i + 1);
        let word = &text[start..];
        if start == 0 || !word.starts_with('#') || word.len() < 2 {
            break;
        }
        tags.push(word[1..].to_string());
        text = text[..start].trim_end();
    }

    tags.reverse();
    (text, tags)
}

/// Parses a node body. Malformed statements are skipped and reported in the
/// returned diagnostics.
pub fn parse_body(src: &str) -> (Body, Vec<Diagnostic>) {
    let lines = src.lines()
        .enumerate()
        .map(|(i, line)| SourceLine {
            number: i + 1,
            indent: measure_indent(line),
            text: line.trim(),
        })
        .filter(|line| !line.text.is_empty() && !line.text.starts_with("//"))
        .collect();

    let mut parser = BodyParser {
        lines,
        pos: 0,
        if_depth: 0,
        diagnostics: Vec::new(),
    };

    let mut body = Body::new();
    body.statements = parser.block(None);
    (body, parser.diagnostics)
}

struct BodyParser<'input> {
    lines: Vec<SourceLine<'input>>,
    pos: usize,
    if_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'input> BodyParser<'input> {
    fn report(&mut self, line_number: usize, message: impl Into<String>) {
        let message = message.into();
        warn!("Body line {}: {}", line_number, message);
        self.diagnostics.push(Diagnostic { line_number, message });
    }

    /// The next line, unless it is dedented out of the current block.
    fn current(&self, parent_indent: Option<usize>) -> Option<SourceLine<'input>> {
        let line = *self.lines.get(self.pos)?;
        match parent_indent {
            Some(indent) if line.indent <= indent => None,
            _ => Some(line),
        }
    }

    fn block(&mut self, parent_indent: Option<usize>) -> Vec<Statement> {
        let mut statements = Vec::new();

        while let Some(line) = self.current(parent_indent) {
            match LineKind::of(line.text) {
                LineKind::ElseIf(_) | LineKind::Else | LineKind::EndIf => {
                    if self.if_depth > 0 {
                        break;
                    }
                    self.report(line.number, format!("{} without a matching <<if>>", line.text));
                    self.pos += 1;
                }
                LineKind::If(condition) => {
                    self.pos += 1;
                    let statement = self.if_statement(line, condition, parent_indent);
                    statements.push(statement);
                }
                LineKind::Shortcut => {
                    let statement = self.shortcut_options(line.indent);
                    statements.push(statement);
                }
                LineKind::Other => {
                    self.pos += 1;
                    self.simple_statement(line, &mut statements);
                }
            }
        }

        statements
    }

    fn condition(&mut self, line_number: usize, src: &str) -> Expression {
        parse_expression(src).unwrap_or_else(|err| {
            self.report(line_number, format!("bad condition: {}", err));
            Expression::Bool(false)
        })
    }

    fn if_statement(
        &mut self,
        if_line: SourceLine<'input>,
        condition: &str,
        parent_indent: Option<usize>,
    ) -> Statement {
        self.if_depth += 1;

        let condition = self.condition(if_line.number, condition);
        let mut clauses = vec![Clause {
            condition: Some(condition),
            statements: self.block(parent_indent),
            line_number: if_line.number,
        }];

        loop {
            let line = match self.current(parent_indent) {
                Some(line) => line,
                None => {
                    self.report(if_line.number, "<<if>> is missing its <<endif>>");
                    break;
                }
            };

            match LineKind::of(line.text) {
                LineKind::ElseIf(condition) => {
                    self.pos += 1;
                    let condition = self.condition(line.number, condition);
                    clauses.push(Clause {
                        condition: Some(condition),
                        statements: self.block(parent_indent),
                        line_number: line.number,
                    });
                }
                LineKind::Else => {
                    self.pos += 1;
                    clauses.push(Clause {
                        condition: None,
                        statements: self.block(parent_indent),
                        line_number: line.number,
                    });
                }
                LineKind::EndIf => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    self.report(if_line.number, "<<if>> is missing its <<endif>>");
                    break;
                }
            }
        }

        self.if_depth -= 1;
        Statement::If { clauses }
    }

    fn shortcut_options(&mut self, indent: usize) -> Statement {
        let mut options = Vec::new();

        // The option bodies are their own blocks; an enclosing <<if>> must
        // not end them early.
        let if_depth = self.if_depth;

        while let Some(line) = self.lines.get(self.pos).copied() {
            if line.indent != indent || LineKind::of(line.text) != LineKind::Shortcut {
                break;
            }
            self.pos += 1;

            let (text, tags) = split_tags(line.text[2..].trim());
            let (text, condition) = match text.rfind("<<if") {
                Some(i) if text.ends_with(">>") => {
                    let condition = text[i + 4..text.len() - 2].trim();
                    let condition = self.condition(line.number, condition);
                    (text[..i].trim_end(), Some(condition))
                }
                _ => (text, None),
            };
            let text = self.formatted_text(line.number, text);

            self.if_depth = 0;
            let statements = self.block(Some(indent));
            self.if_depth = if_depth;

            options.push(ShortcutOption {
                text,
                condition,
                tags,
                statements,
                line_number: line.number,
            });
        }

        Statement::ShortcutOptions(options)
    }

    fn simple_statement(&mut self, line: SourceLine<'input>, statements: &mut Vec<Statement>) {
        if let Some(inner) = command_inner(line.text) {
            if let Some(statement) = self.command(line.number, inner) {
                statements.push(statement);
            }
            return;
        }

        if line.text.contains("[[") {
            self.option_links(line, statements);
            return;
        }

        let (text, tags) = split_tags(line.text);
        statements.push(Statement::Line {
            text: self.formatted_text(line.number, text),
            tags,
            line_number: line.number,
        });
    }

    fn command(&mut self, line_number: usize, inner: &str) -> Option<Statement> {
        let (keyword, rest) = split_keyword(inner);
        let statement = match keyword {
            "set" => return self.set_statement(line_number, rest),
            "stop" if rest.is_empty() => Statement::Stop,
            "jump" if !rest.is_empty() => Statement::Jump {
                destination: rest.to_string(),
                line_number,
            },
            "jump" => {
                self.report(line_number, "<<jump>> needs a node name");
                return None;
            }
            _ => Statement::Command {
                text: self.formatted_text(line_number, inner),
                line_number,
            },
        };
        Some(statement)
    }

    fn set_statement(&mut self, line_number: usize, src: &str) -> Option<Statement> {
        let parsed = ExpressionParser::new(src).and_then(|mut parser| {
            let variable = match parser.next() {
                Some(Token::Variable(name)) => name.to_string(),
                other => return Err(format!("expected a variable, got {:?}", other)),
            };
            match parser.next() {
                Some(Token::Identifier("to")) | Some(Token::Assign) => {}
                other => return Err(format!("expected 'to' or '=', got {:?}", other)),
            }
            let value = parser.expression(0)?;
            if let Some(tok) = parser.peek() {
                return Err(format!("unexpected {:?} after value", tok));
            }
            Ok((variable, value))
        });

        match parsed {
            Ok((variable, value)) => Some(Statement::Set {
                variable,
                value,
                line_number,
            }),
            Err(err) => {
                self.report(line_number, format!("bad <<set {}>>: {}", src, err));
                None
            }
        }
    }

    fn option_links(&mut self, line: SourceLine<'input>, statements: &mut Vec<Statement>) {
        let mut rest = line.text;
        let mut links = Vec::new();

        while let Some(start) = rest.find("[[") {
            let end = match rest[start..].find("]]") {
                Some(end) => start + end,
                None => {
                    self.report(line.number, "option is missing its closing ']]'");
                    break;
                }
            };

            let leading = rest[..start].trim();
            if !leading.is_empty() {
                let (text, tags) = split_tags(leading);
                statements.push(Statement::Line {
                    text: self.formatted_text(line.number, text),
                    tags,
                    line_number: line.number,
                });
            }

            let inner = &rest[start + 2..end];
            let (label, destination) = match inner.rfind('|') {
                Some(i) => (Some(&inner[..i]), inner[i + 1..].trim()),
                None => (None, inner.trim()),
            };
            if destination.is_empty() {
                self.report(line.number, format!("option [[{}]] has no destination", inner));
            } else {
                let label = label.map(|label| self.formatted_text(line.number, label.trim()));
                links.push(Statement::OptionLink {
                    label,
                    destination: destination.to_string(),
                    line_number: line.number,
                });
            }

            rest = &rest[end + 2..];
        }

        if !rest.trim().is_empty() && !links.is_empty() {
            self.report(line.number, format!("ignoring text after option: {:?}", rest.trim()));
        }
        statements.extend(links);
    }

    /// Turns `{expression}` segments into numbered placeholders.
    fn formatted_text(&mut self, line_number: usize, text: &str) -> FormattedText {
        let mut template = String::with_capacity(text.len());
        let mut expressions = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find('{') {
            template.push_str(&rest[..start]);
            let end = match rest[start..].find('}') {
                Some(end) => start + end,
                None => {
                    self.report(line_number, "inline expression is missing its closing '}'");
                    template.push_str(&rest[start..]);
                    rest = "";
                    break;
                }
            };

            match parse_expression(&rest[start + 1..end]) {
                Ok(expr) => {
                    template.push_str(&format!("{{{}}}", expressions.len()));
                    expressions.push(expr);
                }
                Err(err) => {
                    self.report(line_number, format!("bad inline expression: {}", err));
                    template.push_str(&rest[start..=end]);
                }
            }
            rest = &rest[end + 1..];
        }
        template.push_str(rest);

        FormattedText {
            template,
            expressions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> FormattedText {
        FormattedText {
            template: text.to_string(),
            expressions: Vec::new(),
        }
    }

    fn line(text: &str, line_number: usize) -> Statement {
        Statement::Line {
            text: plain(text),
            tags: Vec::new(),
            line_number,
        }
    }

    #[test]
    fn test_lines_and_comments() {
        let (body, diagnostics) = parse_body("// a comment\nHello there! #line:a1 #happy\n\n<<wave Sam>>\n");
        assert!(diagnostics.is_empty());
        assert_eq!(
            body.statements,
            vec![
                Statement::Line {
                    text: plain("Hello there!"),
                    tags: vec!["line:a1".to_string(), "happy".to_string()],
                    line_number: 2,
                },
                Statement::Command {
                    text: plain("wave Sam"),
                    line_number: 4,
                },
            ],
        );
    }

    #[test]
    fn test_option_links() {
        let (body, diagnostics) = parse_body("[[Go left|Left]] [[Right]]");
        assert!(diagnostics.is_empty());
        assert_eq!(
            body.statements,
            vec![
                Statement::OptionLink {
                    label: Some(plain("Go left")),
                    destination: "Left".to_string(),
                    line_number: 1,
                },
                Statement::OptionLink {
                    label: None,
                    destination: "Right".to_string(),
                    line_number: 1,
                },
            ],
        );
    }

    #[test]
    fn test_if_blocks() {
        let src = "\
<<if $a>>
A
<<elseif $b>>
B
<<else>>
C
<<endif>>
After";
        let (body, diagnostics) = parse_body(src);
        assert!(diagnostics.is_empty());
        assert_eq!(
            body.statements,
            vec![
                Statement::If {
                    clauses: vec![
                        Clause {
                            condition: Some(Expression::Variable("$a".to_string())),
                            statements: vec![line("A", 2)],
                            line_number: 1,
                        },
                        Clause {
                            condition: Some(Expression::Variable("$b".to_string())),
                            statements: vec![line("B", 4)],
                            line_number: 3,
                        },
                        Clause {
                            condition: None,
                            statements: vec![line("C", 6)],
                            line_number: 5,
                        },
                    ],
                },
                line("After", 8),
            ],
        );
    }

    #[test]
    fn test_shortcut_options() {
        let src = "\
-> Yes
    Great!
    <<set $agreed to true>>
-> No <<if $rude>> #mean
    Fine.
Done";
        let (body, diagnostics) = parse_body(src);
        assert!(diagnostics.is_empty());
        assert_eq!(
            body.statements,
            vec![
                Statement::ShortcutOptions(vec![
                    ShortcutOption {
                        text: plain("Yes"),
                        condition: None,
                        tags: Vec::new(),
                        statements: vec![
                            line("Great!", 2),
                            Statement::Set {
                                variable: "$agreed".to_string(),
                                value: Expression::Bool(true),
                                line_number: 3,
                            },
                        ],
                        line_number: 1,
                    },
                    ShortcutOption {
                        text: plain("No"),
                        condition: Some(Expression::Variable("$rude".to_string())),
                        tags: vec!["mean".to_string()],
                        statements: vec![line("Fine.", 5)],
                        line_number: 4,
                    },
                ]),
                line("Done", 6),
            ],
        );
    }

    #[test]
    fn test_inline_expressions() {
        let (body, _) = parse_body("You have {$gold + 1} coins, {$name}.");
        match &body.statements[0] {
            Statement::Line { text, .. } => {
                assert_eq!(text.template, "You have {0} coins, {1}.");
                assert_eq!(text.expressions.len(), 2);
            }
            other => panic!("Expected a line, got {:?}", other),
        }
    }

    #[test]
    fn test_set_forms() {
        let (body, diagnostics) = parse_body("<<set $x = 2>>\n<<set $y to \"a\">>\n<<set x to 1>>");
        assert_eq!(body.statements.len(), 2);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line_number, 3);
    }

    #[test]
    fn test_recovers_from_bad_structure() {
        let src = "<<endif>>\n<<if $a>>\nInside\n";
        let (body, diagnostics) = parse_body(src);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            body.statements,
            vec![Statement::If {
                clauses: vec![Clause {
                    condition: Some(Expression::Variable("$a".to_string())),
                    statements: vec![line("Inside", 3)],
                    line_number: 2,
                }],
            }],
        );
    }

    #[test]
    fn test_jump_and_stop() {
        let (body, diagnostics) = parse_body("<<jump Forest>>\n<<stop>>\n<<jump>>");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            body.statements,
            vec![
                Statement::Jump {
                    destination: "Forest".to_string(),
                    line_number: 1,
                },
                Statement::Stop,
            ],
        );
    }
}
