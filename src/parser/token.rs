#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    Number(f32),
    Str(String),
    Variable(&'input str),
    Identifier(&'input str),
    True,
    False,
    Null,

    LeftParen,
    RightParen,
    Comma,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    Assign,
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,

    And,
    Or,
    Xor,
    Not,
}

impl<'input> Token<'input> {
    /// Maps word operators and literals; anything else is an identifier.
    pub fn from_word(word: &'input str) -> Self {
        match word {
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            "and" => Self::And,
            "or" => Self::Or,
            "xor" => Self::Xor,
            "not" => Self::Not,
            "is" | "eq" => Self::EqualTo,
            "neq" => Self::NotEqualTo,
            "gt" => Self::GreaterThan,
            "gte" => Self::GreaterThanOrEqualTo,
            "lt" => Self::LessThan,
            "lte" => Self::LessThanOrEqualTo,
            _ => Self::Identifier(word),
        }
    }
}
