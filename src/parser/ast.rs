/// A parsed node body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub statements: Vec<Statement>,
}

impl Body {
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
        }
    }
}

/// Text with `{expression}` holes, stored as `{0}`, `{1}`, ... placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedText {
    pub template: String,
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Line {
        text: FormattedText,
        tags: Vec<String>,
        line_number: usize,
    },
    Command {
        text: FormattedText,
        line_number: usize,
    },
    Set {
        variable: String,
        value: Expression,
        line_number: usize,
    },
    If {
        clauses: Vec<Clause>,
    },
    /// `[[Label|Node]]` or `[[Node]]`.
    OptionLink {
        label: Option<FormattedText>,
        destination: String,
        line_number: usize,
    },
    /// A group of consecutive `->` options.
    ShortcutOptions(Vec<ShortcutOption>),
    Jump {
        destination: String,
        line_number: usize,
    },
    Stop,
}

/// One branch of an `<<if>>`; `condition` is `None` for `<<else>>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub condition: Option<Expression>,
    pub statements: Vec<Statement>,
    pub line_number: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShortcutOption {
    pub text: FormattedText,
    pub condition: Option<Expression>,
    pub tags: Vec<String>,
    pub statements: Vec<Statement>,
    pub line_number: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f32),
    Str(String),
    Bool(bool),
    Null,
    Variable(String),
    /// A library function call. Operators are calls too, e.g. `Add`.
    Call {
        function: String,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    pub fn call(function: &str, arguments: Vec<Expression>) -> Self {
        Self::Call {
            function: function.to_string(),
            arguments,
        }
    }
}
