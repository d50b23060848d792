use crate::parser::{
    ast::Expression,
    lexer::Lexer,
    token::Token,
};

/// Binding power of each binary operator and the library function it maps to.
fn binary_operator(token: &Token<'_>) -> Option<(u8, &'static str)> {
    let op = match token {
        Token::Or => (1, "Or"),
        Token::Xor => (2, "Xor"),
        Token::And => (3, "And"),
        Token::EqualTo => (4, "EqualTo"),
        Token::NotEqualTo => (4, "NotEqualTo"),
        Token::GreaterThan => (5, "GreaterThan"),
        Token::GreaterThanOrEqualTo => (5, "GreaterThanOrEqualTo"),
        Token::LessThan => (5, "LessThan"),
        Token::LessThanOrEqualTo => (5, "LessThanOrEqualTo"),
        Token::Plus => (6, "Add"),
        Token::Minus => (6, "Minus"),
        Token::Star => (7, "Multiply"),
        Token::Slash => (7, "Divide"),
        Token::Percent => (7, "Modulo"),
        _ => return None,
    };
    Some(op)
}

const UNARY_POWER: u8 = 8;

/// Parses a complete expression. Trailing tokens are an error.
pub fn parse_expression(src: &str) -> Result<Expression, String> {
    let mut parser = ExpressionParser::new(src)?;
    let expr = parser.expression(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(format!("unexpected {:?} after expression in {:?}", tok, src)),
    }
}

pub(crate) struct ExpressionParser<'input> {
    src: &'input str,
    tokens: Vec<Token<'input>>,
    pos: usize,
}

impl<'input> ExpressionParser<'input> {
    pub fn new(src: &'input str) -> Result<Self, String> {
        let tokens = Lexer::new(src)
            .map(|res| res.map(|(_, tok, _)| tok))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| format!("{} in {:?}", err, src))?;
        Ok(Self {
            src,
            tokens,
            pos: 0,
        })
    }

    pub fn peek(&self) -> Option<&Token<'input>> {
        self.tokens.get(self.pos)
    }

    pub fn next(&mut self) -> Option<Token<'input>> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token<'static>) -> Result<(), String> {
        match self.next() {
            Some(ref tok) if *tok == expected => Ok(()),
            other => Err(format!("expected {:?}, got {:?} in {:?}", expected, other, self.src)),
        }
    }

    pub fn expression(&mut self, min_power: u8) -> Result<Expression, String> {
        let mut lhs = self.operand()?;

        loop {
            let (power, function) = match self.peek().and_then(binary_operator) {
                Some(op) => op,
                None => break,
            };
            if power <= min_power {
                break;
            }
            self.next();

            let rhs = self.expression(power)?;
            lhs = Expression::call(function, vec![lhs, rhs]);
        }

        Ok(lhs)
    }

    fn operand(&mut self) -> Result<Expression, String> {
        let tok = match self.next() {
            Some(tok) => tok,
            None => return Err(format!("expected a value at end of {:?}", self.src)),
        };

        let expr = match tok {
            Token::Number(val) => Expression::Number(val),
            Token::Str(val) => Expression::Str(val),
            Token::True => Expression::Bool(true),
            Token::False => Expression::Bool(false),
            Token::Null => Expression::Null,
            Token::Variable(name) => Expression::Variable(name.to_string()),
            Token::Minus => {
                let operand = self.expression(UNARY_POWER)?;
                Expression::call("UnaryMinus", vec![operand])
            }
            Token::Not => {
                let operand = self.expression(UNARY_POWER)?;
                Expression::call("Not", vec![operand])
            }
            Token::LeftParen => {
                let inner = self.expression(0)?;
                self.expect(Token::RightParen)?;
                inner
            }
            Token::Identifier(name) => {
                self.expect(Token::LeftParen)?;
                let arguments = self.arguments()?;
                Expression::call(name, arguments)
            }
            tok => return Err(format!("unexpected {:?} in {:?}", tok, self.src)),
        };

        Ok(expr)
    }

    fn arguments(&mut self) -> Result<Vec<Expression>, String> {
        let mut arguments = Vec::new();
        if let Some(Token::RightParen) = self.peek() {
            self.next();
            return Ok(arguments);
        }

        loop {
            arguments.push(self.expression(0)?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RightParen) => return Ok(arguments),
                other => {
                    return Err(format!("expected ',' or ')', got {:?} in {:?}", other, self.src));
                }
            }
        }
    }
}
