use crate::error::CleaningError;

use super::{
    ast::{ArithOp, BoolExpr, CompareOp, NumExpr, NumFunc},
    lexer::{Token, TokenKind},
    syntax_error,
};

const MAX_NESTING_DEPTH: usize = 64;

enum Typed {
    Bool(BoolExpr),
    Num(NumExpr),
}

pub(crate) struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(expression: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            expression,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub(crate) fn parse(mut self) -> Result<BoolExpr, CleaningError> {
        let offset = self.offset();
        let root = match self.parse_or()? {
            Typed::Bool(expr) => expr,
            Typed::Num(_) => {
                return Err(self.error_at(offset, "expression must be boolean, found a number"));
            }
        };
        if let Some(token) = self.tokens.get(self.pos) {
            return Err(self.error_at(token.offset, "unexpected trailing input"));
        }
        Ok(root)
    }

    fn parse_or(&mut self) -> Result<Typed, CleaningError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let lhs_bool = self.expect_bool(lhs, "'||'")?;
            let rhs = self.parse_and()?;
            let rhs_bool = self.expect_bool(rhs, "'||'")?;
            lhs = Typed::Bool(BoolExpr::Or(Box::new(lhs_bool), Box::new(rhs_bool)));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Typed, CleaningError> {
        let mut lhs = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let lhs_bool = self.expect_bool(lhs, "'&&'")?;
            let rhs = self.parse_not()?;
            let rhs_bool = self.expect_bool(rhs, "'&&'")?;
            lhs = Typed::Bool(BoolExpr::And(Box::new(lhs_bool), Box::new(rhs_bool)));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Typed, CleaningError> {
        if self.eat(&TokenKind::Not) {
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave();
            let operand = self.expect_bool(operand, "'!'")?;
            return Ok(Typed::Bool(BoolExpr::Not(Box::new(operand))));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Typed, CleaningError> {
        let lhs = self.parse_sum()?;
        let Some(op) = self.peek().and_then(compare_op) else {
            return Ok(lhs);
        };
        self.pos += 1;

        let lhs = self.expect_num(lhs, "comparison")?;
        let rhs = self.parse_sum()?;
        let rhs = self.expect_num(rhs, "comparison")?;

        if let Some(token) = self.tokens.get(self.pos)
            && compare_op(&token.kind).is_some()
        {
            return Err(self.error_at(
                token.offset,
                "chained comparisons are not supported; combine them with '&&'",
            ));
        }
        Ok(Typed::Bool(BoolExpr::Compare { op, lhs, rhs }))
    }

    fn parse_sum(&mut self) -> Result<Typed, CleaningError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let lhs_num = self.expect_num(lhs, "arithmetic")?;
            let rhs = self.parse_term()?;
            let rhs_num = self.expect_num(rhs, "arithmetic")?;
            lhs = Typed::Num(NumExpr::Binary {
                op,
                lhs: Box::new(lhs_num),
                rhs: Box::new(rhs_num),
            });
        }
    }

    fn parse_term(&mut self) -> Result<Typed, CleaningError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Slash) => ArithOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let lhs_num = self.expect_num(lhs, "arithmetic")?;
            let rhs = self.parse_unary()?;
            let rhs_num = self.expect_num(rhs, "arithmetic")?;
            lhs = Typed::Num(NumExpr::Binary {
                op,
                lhs: Box::new(lhs_num),
                rhs: Box::new(rhs_num),
            });
        }
    }

    fn parse_unary(&mut self) -> Result<Typed, CleaningError> {
        if self.eat(&TokenKind::Minus) {
            self.enter()?;
            let operand = self.parse_unary()?;
            self.leave();
            let operand = self.expect_num(operand, "unary '-'")?;
            return Ok(Typed::Num(NumExpr::Neg(Box::new(operand))));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Typed, CleaningError> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error_at(self.expression.len(), "unexpected end of expression"));
        };
        self.pos += 1;

        match token.kind {
            TokenKind::Number(value) => Ok(Typed::Num(NumExpr::Literal(value))),
            TokenKind::Ident(name) if name == "true" => Ok(Typed::Bool(BoolExpr::Literal(true))),
            TokenKind::Ident(name) if name == "false" => Ok(Typed::Bool(BoolExpr::Literal(false))),
            TokenKind::Ident(name) => {
                if self.eat(&TokenKind::LParen) {
                    self.parse_call(name, token.offset)
                } else {
                    Ok(Typed::Num(NumExpr::Attribute(name)))
                }
            }
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.leave();
                self.expect_token(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.error_at(token.offset, "expected a value")),
        }
    }

    fn parse_call(&mut self, name: String, offset: usize) -> Result<Typed, CleaningError> {
        if name == "has" {
            let argument = match self.tokens.get(self.pos) {
                Some(Token {
                    kind: TokenKind::Ident(argument),
                    ..
                }) => argument.clone(),
                _ => {
                    return Err(self.error_at(self.offset(), "has() expects a bare name"));
                }
            };
            self.pos += 1;
            self.expect_token(&TokenKind::RParen, "')'")?;
            return Ok(Typed::Bool(BoolExpr::Has(argument)));
        }

        let Some(func) = NumFunc::lookup(&name) else {
            return Err(self.error_at(offset, &format!("unknown function '{name}'")));
        };

        self.enter()?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                let arg = self.parse_sum()?;
                args.push(self.expect_num(arg, "function argument")?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect_token(&TokenKind::RParen, "')' or ','")?;
                break;
            }
        }
        self.leave();

        if args.len() != func.arity() {
            return Err(self.error_at(
                offset,
                &format!(
                    "function '{name}' takes {} argument(s), found {}",
                    func.arity(),
                    args.len()
                ),
            ));
        }
        Ok(Typed::Num(NumExpr::Call { func, args }))
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|token| &token.kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, kind: &TokenKind, what: &str) -> Result<(), CleaningError> {
        if self.eat(kind) {
            return Ok(());
        }
        Err(self.error_at(self.offset(), &format!("expected {what}")))
    }

    fn expect_bool(&self, value: Typed, context: &str) -> Result<BoolExpr, CleaningError> {
        match value {
            Typed::Bool(expr) => Ok(expr),
            Typed::Num(_) => Err(self.error_at(
                self.previous_offset(),
                &format!("{context} needs boolean operands"),
            )),
        }
    }

    fn expect_num(&self, value: Typed, context: &str) -> Result<NumExpr, CleaningError> {
        match value {
            Typed::Num(expr) => Ok(expr),
            Typed::Bool(_) => Err(self.error_at(
                self.previous_offset(),
                &format!("{context} needs numeric operands"),
            )),
        }
    }

    fn enter(&mut self) -> Result<(), CleaningError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error_at(self.previous_offset(), "expression nests too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.expression.len(), |token| token.offset)
    }

    fn previous_offset(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map_or(0, |token| token.offset)
    }

    fn error_at(&self, offset: usize, reason: &str) -> CleaningError {
        syntax_error(self.expression, offset, reason)
    }
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Lt => Some(CompareOp::Lt),
        TokenKind::Le => Some(CompareOp::Le),
        TokenKind::Gt => Some(CompareOp::Gt),
        TokenKind::Ge => Some(CompareOp::Ge),
        TokenKind::Eq => Some(CompareOp::Eq),
        TokenKind::Ne => Some(CompareOp::Ne),
        _ => None,
    }
}
