//! Recursive-descent parser building the AST in [`crate::ast`] from the
//! token stream produced by [`crate::lexer`].

use std::fmt;

use ir::RelOp;
use num_bigint::BigInt;
use util::SourcePos;

use crate::ast::*;
use crate::lexer::{Keyword, Token, TokenKind};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParseError {
    pub pos: SourcePos,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

impl std::error::Error for ParseError {}

pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    let mut parser = Parser { tokens, pos: 0 };
    let statements = parser.parse_stmts(&[])?;
    parser.expect_eof()?;
    Ok(Program { statements })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn pos_here(&self) -> SourcePos {
        self.current().pos
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError { pos: self.pos_here(), message: message.into() }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if self.current().kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.error(format!("expected end of input, found {:?}", self.current().kind)))
        }
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        self.current().kind == TokenKind::Keyword(kw)
    }

    fn at_any_keyword(&self, kws: &[Keyword]) -> bool {
        kws.iter().any(|&kw| self.at_keyword(kw))
    }

    fn eat_keyword(&mut self, kw: Keyword) -> Result<(), ParseError> {
        if self.at_keyword(kw) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected keyword {:?}, found {:?}", kw, self.current().kind)))
        }
    }

    fn eat_kind(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.current().kind == kind {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", kind, self.current().kind)))
        }
    }

    fn eat_ident(&mut self) -> Result<String, ParseError> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Ok(name)
            }
            other => Err(self.error(format!("expected identifier, found {:?}", other))),
        }
    }

    fn eat_signed_int(&mut self) -> Result<i64, ParseError> {
        let negative = if self.current().kind == TokenKind::Minus {
            self.bump();
            true
        } else {
            false
        };
        match self.current().kind.clone() {
            TokenKind::Number(digits) => {
                self.bump();
                let value: i64 = digits.parse().map_err(|_| self.error("integer literal out of range"))?;
                Ok(if negative { -value } else { value })
            }
            other => Err(self.error(format!("expected integer literal, found {:?}", other))),
        }
    }

    /// Parses statements until the next token is `Eof` or one of `stop`
    /// (not consumed — the caller consumes its own block terminator).
    fn parse_stmts(&mut self, stop: &[Keyword]) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while self.current().kind != TokenKind::Eof && !self.at_any_keyword(stop) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pos_here();
        if self.at_keyword(Keyword::Array) {
            return self.parse_array_decl(pos);
        }
        if self.at_keyword(Keyword::Read) {
            return self.parse_read(pos);
        }
        if self.at_keyword(Keyword::Write) {
            return self.parse_write(pos);
        }
        if self.at_keyword(Keyword::If) {
            return self.parse_if(pos);
        }
        if self.at_keyword(Keyword::While) {
            return self.parse_while(pos);
        }
        if self.at_keyword(Keyword::For) {
            return self.parse_for(pos);
        }
        self.parse_assign(pos)
    }

    fn parse_array_decl(&mut self, pos: SourcePos) -> Result<Stmt, ParseError> {
        self.eat_keyword(Keyword::Array)?;
        let name = self.eat_ident()?;
        self.eat_kind(TokenKind::LParen)?;
        let lo = self.eat_signed_int()?;
        self.eat_kind(TokenKind::Colon)?;
        let hi = self.eat_signed_int()?;
        self.eat_kind(TokenKind::RParen)?;
        self.eat_kind(TokenKind::Semicolon)?;
        Ok(Stmt { kind: StmtKind::ArrayDecl { name, lo, hi }, pos })
    }

    fn parse_read(&mut self, pos: SourcePos) -> Result<Stmt, ParseError> {
        self.eat_keyword(Keyword::Read)?;
        let lvalue = self.parse_lvalue()?;
        self.eat_kind(TokenKind::Semicolon)?;
        Ok(Stmt { kind: StmtKind::Read { lvalue }, pos })
    }

    fn parse_write(&mut self, pos: SourcePos) -> Result<Stmt, ParseError> {
        self.eat_keyword(Keyword::Write)?;
        let expr = self.parse_expr()?;
        self.eat_kind(TokenKind::Semicolon)?;
        Ok(Stmt { kind: StmtKind::Write { expr }, pos })
    }

    fn parse_if(&mut self, pos: SourcePos) -> Result<Stmt, ParseError> {
        self.eat_keyword(Keyword::If)?;
        let cond = self.parse_cond()?;
        self.eat_keyword(Keyword::Then)?;
        let then_body = self.parse_stmts(&[Keyword::Else, Keyword::Endif])?;
        let else_body = if self.at_keyword(Keyword::Else) {
            self.bump();
            self.parse_stmts(&[Keyword::Endif])?
        } else {
            Vec::new()
        };
        self.eat_keyword(Keyword::Endif)?;
        Ok(Stmt { kind: StmtKind::If { cond, then_body, else_body }, pos })
    }

    fn parse_while(&mut self, pos: SourcePos) -> Result<Stmt, ParseError> {
        self.eat_keyword(Keyword::While)?;
        let cond = self.parse_cond()?;
        self.eat_keyword(Keyword::Do)?;
        let body = self.parse_stmts(&[Keyword::Endwhile])?;
        self.eat_keyword(Keyword::Endwhile)?;
        Ok(Stmt { kind: StmtKind::While { cond, body }, pos })
    }

    fn parse_for(&mut self, pos: SourcePos) -> Result<Stmt, ParseError> {
        self.eat_keyword(Keyword::For)?;
        let var = self.eat_ident()?;
        self.eat_keyword(Keyword::From)?;
        let from = self.parse_expr()?;
        let downto = if self.at_keyword(Keyword::Downto) {
            self.bump();
            true
        } else {
            self.eat_keyword(Keyword::To)?;
            false
        };
        let to = self.parse_expr()?;
        self.eat_keyword(Keyword::Do)?;
        let body = self.parse_stmts(&[Keyword::Endfor])?;
        self.eat_keyword(Keyword::Endfor)?;
        Ok(Stmt { kind: StmtKind::For { var, from, to, downto, body }, pos })
    }

    fn parse_assign(&mut self, pos: SourcePos) -> Result<Stmt, ParseError> {
        let lvalue = self.parse_lvalue()?;
        self.eat_kind(TokenKind::Assign)?;
        let expr = self.parse_expr()?;
        self.eat_kind(TokenKind::Semicolon)?;
        Ok(Stmt { kind: StmtKind::Assign { lvalue, expr }, pos })
    }

    fn parse_lvalue(&mut self) -> Result<LValue, ParseError> {
        let pos = self.pos_here();
        let name = self.eat_ident()?;
        if self.current().kind == TokenKind::LParen {
            self.bump();
            let index = self.parse_expr()?;
            self.eat_kind(TokenKind::RParen)?;
            Ok(LValue { kind: LValueKind::Index(name, Box::new(index)), pos })
        } else {
            Ok(LValue { kind: LValueKind::Name(name), pos })
        }
    }

    fn parse_cond(&mut self) -> Result<Cond, ParseError> {
        let pos = self.pos_here();
        let left = self.parse_expr()?;
        let op = self.eat_relop()?;
        let right = self.parse_expr()?;
        Ok(Cond { op, left, right, pos })
    }

    fn eat_relop(&mut self) -> Result<RelOp, ParseError> {
        let op = match self.current().kind {
            TokenKind::Eq => RelOp::Eq,
            TokenKind::Ne => RelOp::Ne,
            TokenKind::Lt => RelOp::Lt,
            TokenKind::Gt => RelOp::Gt,
            TokenKind::Le => RelOp::Le,
            TokenKind::Ge => RelOp::Ge,
            ref other => return Err(self.error(format!("expected a relational operator, found {:?}", other))),
        };
        self.bump();
        Ok(op)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pos_here();
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_term()?;
            left = Expr { kind: ExprKind::Bin(op, Box::new(left), Box::new(right)), pos };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pos_here();
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.bump();
            let right = self.parse_unary()?;
            left = Expr { kind: ExprKind::Bin(op, Box::new(left), Box::new(right)), pos };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pos_here();
        if self.current().kind == TokenKind::Minus {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(Expr { kind: ExprKind::Neg(Box::new(inner)), pos });
        }
        self.parse_factor()
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pos_here();
        match self.current().kind.clone() {
            TokenKind::Number(digits) => {
                self.bump();
                let value: BigInt = digits.parse().map_err(|_| self.error("integer literal out of range"))?;
                Ok(Expr { kind: ExprKind::Number(value), pos })
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.eat_kind(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                self.bump();
                if self.current().kind == TokenKind::LParen {
                    self.bump();
                    let index = self.parse_expr()?;
                    self.eat_kind(TokenKind::RParen)?;
                    Ok(Expr { kind: ExprKind::Index(name, Box::new(index)), pos })
                } else {
                    Ok(Expr { kind: ExprKind::Var(name), pos })
                }
            }
            other => Err(self.error(format!("expected an expression, found {:?}", other))),
        }
    }
}
