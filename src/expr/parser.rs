use super::lexer::Token;
use super::{BinaryOp, Expr, ExprError, UnaryOp};
use serde_json::Value;

/// 递归下降解析器, 优先级从低到高:
/// `||` < `&&` < `== !=` < `< <= > >=` < `+ -` < `* / %` < 一元 < 基本项
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    max_depth: usize,
    nesting: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            max_depth,
            nesting: 0,
        }
    }

    pub fn parse(mut self) -> Result<Expr, ExprError> {
        if self.peek() == &Token::Eof {
            return Err(ExprError::Empty);
        }
        let (expr, _) = self.or()?;
        match self.peek() {
            Token::Eof => Ok(expr),
            other => Err(ExprError::UnexpectedToken {
                expected: "表达式结尾".to_string(),
                found: other.to_string(),
            }),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.nesting += 1;
        if self.nesting > self.max_depth {
            return Err(ExprError::TooDeep(self.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn combine(
        &self,
        op: BinaryOp,
        (lhs, ld): (Expr, usize),
        (rhs, rd): (Expr, usize),
    ) -> Result<(Expr, usize), ExprError> {
        let depth = ld.max(rd) + 1;
        if depth > self.max_depth {
            return Err(ExprError::TooDeep(self.max_depth));
        }
        Ok((Expr::Binary(op, Box::new(lhs), Box::new(rhs)), depth))
    }

    fn or(&mut self) -> Result<(Expr, usize), ExprError> {
        let mut lhs = self.and()?;
        while self.peek() == &Token::Or {
            self.advance();
            let rhs = self.and()?;
            lhs = self.combine(BinaryOp::Or, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<(Expr, usize), ExprError> {
        let mut lhs = self.equality()?;
        while self.peek() == &Token::And {
            self.advance();
            let rhs = self.equality()?;
            lhs = self.combine(BinaryOp::And, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<(Expr, usize), ExprError> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.comparison()?;
            lhs = self.combine(op, lhs, rhs)?;
        }
    }

    fn comparison(&mut self) -> Result<(Expr, usize), ExprError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = self.combine(op, lhs, rhs)?;
        }
    }

    fn additive(&mut self) -> Result<(Expr, usize), ExprError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = self.combine(op, lhs, rhs)?;
        }
    }

    fn multiplicative(&mut self) -> Result<(Expr, usize), ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = self.combine(op, lhs, rhs)?;
        }
    }

    fn unary(&mut self) -> Result<(Expr, usize), ExprError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Not => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.advance();
        self.enter()?;
        let (operand, depth) = self.unary()?;
        self.leave();
        Ok((Expr::Unary(op, Box::new(operand)), depth + 1))
    }

    fn primary(&mut self) -> Result<(Expr, usize), ExprError> {
        let expr = match self.advance() {
            Token::Number(n) => Expr::Literal(super::number(n)?),
            Token::Str(s) => Expr::Literal(Value::String(s)),
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::Null => Expr::Literal(Value::Null),
            Token::Ident(first) => {
                let mut path = vec![first];
                while self.peek() == &Token::Dot {
                    self.advance();
                    match self.advance() {
                        Token::Ident(segment) => path.push(segment),
                        other => {
                            return Err(ExprError::UnexpectedToken {
                                expected: "字段名".to_string(),
                                found: other.to_string(),
                            })
                        }
                    }
                }
                Expr::Field(path)
            }
            Token::LParen => {
                self.enter()?;
                let inner = self.or()?;
                self.leave();
                return match self.advance() {
                    Token::RParen => Ok(inner),
                    other => Err(ExprError::UnexpectedToken {
                        expected: "')'".to_string(),
                        found: other.to_string(),
                    }),
                };
            }
            other => {
                return Err(ExprError::UnexpectedToken {
                    expected: "值或字段".to_string(),
                    found: other.to_string(),
                })
            }
        };
        Ok((expr, 1))
    }
}
