use std::{fmt, str::CharIndices};

use crate::parser::token::Token;

fn is_identifier_start(c: char) -> bool {
    match c {
        '_' | 'a'..='z' | 'A'..='Z' => true,
        _ => false,
    }
}

fn is_identifier_rest(c: char) -> bool {
    match c {
        '0'..='9' => true,
        c => is_identifier_start(c),
    }
}

pub type SpannedToken<'input> = (usize, Token<'input>, usize);

#[derive(Debug, Clone, PartialEq)]
pub enum LexerError {
    UnexpectedCharacter(usize, char),
    UnterminatedString(usize),
    InvalidNumber(usize),
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(loc, c) => write!(f, "unexpected {:?} at column {}", c, loc + 1),
            Self::UnterminatedString(loc) => write!(f, "unterminated string starting at column {}", loc + 1),
            Self::InvalidNumber(loc) => write!(f, "invalid number at column {}", loc + 1),
        }
    }
}

/// Splits a single expression, such as the inside of `<<if ...>>`, into tokens.
pub struct Lexer<'input> {
    input: &'input str,
    chars: CharIndices<'input>,
    lookahead: Option<(usize, char)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        let mut chars = input.char_indices();
        Self {
            input,
            lookahead: chars.next(),
            chars,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let current = self.lookahead;
        if current.is_some() {
            self.lookahead = self.chars.next();
        }
        current
    }

    fn slice(&self, start: usize, end: usize) -> &'input str {
        &self.input[start..end]
    }

    fn test_lookahead<F>(&self, mut test: F) -> bool
    where
        F: FnMut(char) -> bool,
    {
        self.lookahead.map_or(false, |(_, c)| test(c))
    }

    fn current_location(&self) -> usize {
        self.lookahead.map_or(self.input.len(), |(loc, _)| loc)
    }

    fn identifier(&mut self, start: usize) -> (usize, &'input str) {
        while self.test_lookahead(is_identifier_rest) {
            self.bump();
        }
        let end = self.current_location();
        (end, self.slice(start, end))
    }

    fn number(&mut self, start: usize) -> Result<SpannedToken<'input>, LexerError> {
        while self.test_lookahead(|c| c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        let end = self.current_location();
        self.slice(start, end)
            .parse::<f32>()
            .map(|val| (start, Token::Number(val), end))
            .map_err(|_| LexerError::InvalidNumber(start))
    }

    fn string(&mut self, start: usize) -> Result<SpannedToken<'input>, LexerError> {
        let mut string = String::new();
        while let Some((loc, c)) = self.bump() {
            match c {
                '"' => return Ok((start, Token::Str(string), loc + 1)),
                '\\' => {
                    match self.bump() {
                        Some((_, 'n')) => string.push('\n'),
                        Some((_, escaped)) => string.push(escaped),
                        None => break,
                    }
                }
                c => string.push(c),
            }
        }
        Err(LexerError::UnterminatedString(start))
    }

    /// Consumes `second` if it is next, picking between a two and a one
    /// character operator.
    fn operator(
        &mut self,
        start: usize,
        second: char,
        double: Token<'input>,
        single: Token<'input>,
    ) -> SpannedToken<'input> {
        if self.test_lookahead(|c| c == second) {
            self.bump();
            (start, double, start + 2)
        } else {
            (start, single, start + 1)
        }
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Result<SpannedToken<'input>, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((start, c)) = self.bump() {
            if c.is_whitespace() {
                continue;
            }

            let tok = match c {
                '(' => (start, Token::LeftParen, start + 1),
                ')' => (start, Token::RightParen, start + 1),
                ',' => (start, Token::Comma, start + 1),
                '+' => (start, Token::Plus, start + 1),
                '-' => (start, Token::Minus, start + 1),
                '*' => (start, Token::Star, start + 1),
                '/' => (start, Token::Slash, start + 1),
                '%' => (start, Token::Percent, start + 1),
                '^' => (start, Token::Xor, start + 1),
                '=' => self.operator(start, '=', Token::EqualTo, Token::Assign),
                '!' => self.operator(start, '=', Token::NotEqualTo, Token::Not),
                '>' => self.operator(start, '=', Token::GreaterThanOrEqualTo, Token::GreaterThan),
                '<' => self.operator(start, '=', Token::LessThanOrEqualTo, Token::LessThan),
                '&' if self.test_lookahead(|la| la == '&') => {
                    self.bump();
                    (start, Token::And, start + 2)
                }
                '|' if self.test_lookahead(|la| la == '|') => {
                    self.bump();
                    (start, Token::Or, start + 2)
                }
                '"' => return Some(self.string(start)),
                '$' if self.test_lookahead(is_identifier_start) => {
                    let (end, name) = self.identifier(start);
                    (start, Token::Variable(name), end)
                }
                c if c.is_ascii_digit() => return Some(self.number(start)),
                c if is_identifier_start(c) => {
                    let (end, word) = self.identifier(start);
                    (start, Token::from_word(word), end)
                }
                c => return Some(Err(LexerError::UnexpectedCharacter(start, c))),
            };
            return Some(Ok(tok));
        }

        None
    }
}
