//! Recursive-descent parser producing [`Expr`] trees

use crate::ast::{BinOp, BoolOp, CmpOp, Expr, UnaryOp};
use crate::error::{ExprError, ExprResult};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::value::Value;

/// A compiled expression: the parsed tree plus its original source text.
///
/// Compilation happens once; the expression can then be evaluated any
/// number of times against different scopes.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Compile a filter expression. The two mutation forms (`=`, `+=`/`-=`)
    /// are rejected with an `InvalidExpression` error.
    ///
    /// # Errors
    /// `Syntax` for unparsable input, `InvalidExpression` for assignment.
    pub fn compile(text: &str) -> ExprResult<Self> {
        Self::parse(text, false)
    }

    /// Compile an update expression. A single assignment or augmented
    /// assignment is permitted at the top level; plain expressions are
    /// also accepted.
    ///
    /// # Errors
    /// `Syntax` for unparsable input.
    pub fn compile_update(text: &str) -> ExprResult<Self> {
        Self::parse(text, true)
    }

    /// The original source text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The root node of the parsed tree
    #[must_use]
    pub fn root(&self) -> &Expr {
        &self.root
    }

    fn parse(text: &str, allow_mutation: bool) -> ExprResult<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            text,
            tokens: &tokens,
            pos: 0,
        };
        let root = parser.parse_input(allow_mutation)?;
        Ok(Expression {
            source: text.to_string(),
            root,
        })
    }
}

struct Parser<'t> {
    text: &'t str,
    tokens: &'t [Token],
    pos: usize,
}

impl Parser<'_> {
    fn parse_input(&mut self, allow_mutation: bool) -> ExprResult<Expr> {
        let root = if let Some(assign) = self.try_parse_assignment(allow_mutation)? {
            assign
        } else {
            self.parse_expr()?
        };
        if let Some(extra) = self.peek() {
            return Err(ExprError::syntax(self.text, extra.offset));
        }
        Ok(root)
    }

    /// Recognize `NAME <assign-op> expr` at the start of the input. In
    /// filter mode the form is rejected as disallowed rather than
    /// unparsable, matching the statement/expression split of the grammar.
    fn try_parse_assignment(&mut self, allow_mutation: bool) -> ExprResult<Option<Expr>> {
        let (target, op) = match (self.tokens.first(), self.tokens.get(1)) {
            (Some(Token { kind: TokenKind::Ident(name), .. }), Some(second)) => {
                let op = match second.kind {
                    TokenKind::Assign => None,
                    TokenKind::PlusAssign => Some(BinOp::Add),
                    TokenKind::MinusAssign => Some(BinOp::Sub),
                    TokenKind::StarAssign => Some(BinOp::Mul),
                    TokenKind::SlashAssign => Some(BinOp::Div),
                    TokenKind::PercentAssign => Some(BinOp::Mod),
                    _ => return Ok(None),
                };
                (name.clone(), op)
            }
            _ => return Ok(None),
        };
        if !allow_mutation {
            return Err(ExprError::InvalidExpression(format!(
                "assignment to '{target}' is not allowed in filter expressions"
            )));
        }
        self.pos = 2;
        let value = Box::new(self.parse_expr()?);
        Ok(Some(match op {
            None => Expr::Assign { target, value },
            Some(op) => Expr::AugAssign { target, op, value },
        }))
    }

    fn parse_expr(&mut self) -> ExprResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ExprResult<Expr> {
        let first = self.parse_and()?;
        if !self.eat(&TokenKind::Or) {
            return Ok(first);
        }
        let mut operands = vec![first, self.parse_and()?];
        while self.eat(&TokenKind::Or) {
            operands.push(self.parse_and()?);
        }
        Ok(Expr::Bool {
            op: BoolOp::Or,
            operands,
        })
    }

    fn parse_and(&mut self) -> ExprResult<Expr> {
        let first = self.parse_not()?;
        if !self.eat(&TokenKind::And) {
            return Ok(first);
        }
        let mut operands = vec![first, self.parse_not()?];
        while self.eat(&TokenKind::And) {
            operands.push(self.parse_not()?);
        }
        Ok(Expr::Bool {
            op: BoolOp::And,
            operands,
        })
    }

    fn parse_not(&mut self) -> ExprResult<Expr> {
        if self.eat(&TokenKind::Not) {
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(self.parse_not()?),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ExprResult<Expr> {
        let first = self.parse_arith()?;
        let mut rest = Vec::new();
        while let Some(op) = self.eat_cmp_op()? {
            rest.push((op, self.parse_arith()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn eat_cmp_op(&mut self) -> ExprResult<Option<CmpOp>> {
        let op = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::EqEq) => CmpOp::Eq,
            Some(TokenKind::NotEq) => CmpOp::Ne,
            Some(TokenKind::Lt) => CmpOp::Lt,
            Some(TokenKind::Le) => CmpOp::Le,
            Some(TokenKind::Gt) => CmpOp::Gt,
            Some(TokenKind::Ge) => CmpOp::Ge,
            Some(TokenKind::In) => CmpOp::In,
            Some(TokenKind::Not) => {
                // Only `not in` is valid here; a bare `not` mid-comparison
                // is a syntax error.
                let offset = self.tokens[self.pos].offset;
                if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::In) {
                    self.pos += 2;
                    return Ok(Some(CmpOp::NotIn));
                }
                return Err(ExprError::syntax(self.text, offset));
            }
            _ => return Ok(None),
        };
        self.pos += 1;
        Ok(Some(op))
    }

    fn parse_arith(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(self.parse_term()?),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::Percent) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(self.parse_unary()?),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        let op = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            Some(TokenKind::Plus) => Some(UnaryOp::Pos),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(self.parse_unary()?),
            });
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> ExprResult<Expr> {
        let token = self
            .peek()
            .ok_or_else(|| ExprError::syntax(self.text, self.text.len()))?;
        let offset = token.offset;
        let expr = match token.kind.clone() {
            TokenKind::Int(n) => {
                self.pos += 1;
                Expr::Literal(Value::Int(n))
            }
            TokenKind::Float(x) => {
                self.pos += 1;
                Expr::Literal(Value::Float(x))
            }
            TokenKind::Str(s) => {
                self.pos += 1;
                Expr::Literal(Value::Str(s))
            }
            TokenKind::True => {
                self.pos += 1;
                Expr::Literal(Value::Bool(true))
            }
            TokenKind::False => {
                self.pos += 1;
                Expr::Literal(Value::Bool(false))
            }
            TokenKind::None => {
                self.pos += 1;
                Expr::Literal(Value::Null)
            }
            TokenKind::Ident(name) => {
                self.pos += 1;
                if self.eat(&TokenKind::LParen) {
                    let args = self.parse_args(&TokenKind::RParen)?;
                    Expr::Call { name, args }
                } else {
                    Expr::Name(name)
                }
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                inner
            }
            TokenKind::LBracket => {
                self.pos += 1;
                let items = self.parse_args(&TokenKind::RBracket)?;
                Expr::List(items)
            }
            _ => return Err(ExprError::syntax(self.text, offset)),
        };
        Ok(expr)
    }

    /// Comma-separated expressions up to (and consuming) `close`
    fn parse_args(&mut self, close: &TokenKind) -> ExprResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(close) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.eat(&TokenKind::Comma) {
                // Tolerate a trailing comma before the closer
                if self.eat(close) {
                    return Ok(args);
                }
                continue;
            }
            self.expect(close)?;
            return Ok(args);
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ExprResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            let offset = self.peek().map_or(self.text.len(), |t| t.offset);
            Err(ExprError::syntax(self.text, offset))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_of_and_over_or() {
        let expr = Expression::compile("a or b and c").unwrap();
        match expr.root() {
            Expr::Bool { op: BoolOp::Or, operands } => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(operands[1], Expr::Bool { op: BoolOp::And, .. }));
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_chained_comparison() {
        let expr = Expression::compile("1 <= x < 10").unwrap();
        match expr.root() {
            Expr::Compare { rest, .. } => assert_eq!(rest.len(), 2),
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_not_in() {
        let expr = Expression::compile("'x' not in members").unwrap();
        match expr.root() {
            Expr::Compare { rest, .. } => assert_eq!(rest[0].0, CmpOp::NotIn),
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_filter_mode_rejects_assignment() {
        let err = Expression::compile("register = 0").unwrap_err();
        assert!(matches!(err, ExprError::InvalidExpression(_)));
    }

    #[test]
    fn test_update_mode_accepts_assignment() {
        let expr = Expression::compile_update("register = 0").unwrap();
        assert!(expr.root().is_mutation());
    }

    #[test]
    fn test_update_mode_accepts_augmented_assignment() {
        let expr = Expression::compile_update("contacts += 'ops'").unwrap();
        match expr.root() {
            Expr::AugAssign { op, .. } => assert_eq!(*op, BinOp::Add),
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_tokens_are_syntax_errors() {
        let err = Expression::compile("a == 1 1").unwrap_err();
        match err {
            ExprError::Syntax { offset, .. } => assert_eq!(offset, 7),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_paren() {
        assert!(matches!(
            Expression::compile("(a == 1"),
            Err(ExprError::Syntax { .. })
        ));
    }
}
