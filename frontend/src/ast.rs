//! Abstract syntax tree produced by [`crate::parser`] and consumed by
//! [`crate::lower`].

use ir::RelOp;
use num_bigint::BigInt;
use util::SourcePos;

#[derive(Clone, Debug)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: SourcePos,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    ArrayDecl { name: String, lo: i64, hi: i64 },
    Assign { lvalue: LValue, expr: Expr },
    Read { lvalue: LValue },
    Write { expr: Expr },
    If { cond: Cond, then_body: Vec<Stmt>, else_body: Vec<Stmt> },
    While { cond: Cond, body: Vec<Stmt> },
    For { var: String, from: Expr, to: Expr, downto: bool, body: Vec<Stmt> },
}

#[derive(Clone, Debug)]
pub struct LValue {
    pub kind: LValueKind,
    pub pos: SourcePos,
}

#[derive(Clone, Debug)]
pub enum LValueKind {
    Name(String),
    Index(String, Box<Expr>),
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: SourcePos,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Number(BigInt),
    Var(String),
    Index(String, Box<Expr>),
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Clone, Debug)]
pub struct Cond {
    pub op: RelOp,
    pub left: Expr,
    pub right: Expr,
    pub pos: SourcePos,
}
