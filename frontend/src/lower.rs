//! Lowers an [`crate::ast::Program`] to the three-address [`ir::Program`].
//!
//! One pass, left to right: each statement appends to the block currently
//! being built and returns the block where control continues afterwards,
//! which is either the same block (straight-line statements) or a fresh one
//! (`IF`/`WHILE`/`FOR`, which all terminate the block they're given).

use std::collections::HashMap;

use ir::{Block, BlockId, Instruction, Operand, Program as IrProgram, RelOp, Symbol, SymbolTable, TempCounter};
use util::{Diagnostics, SourcePos};

use crate::ast;
use crate::ast::{BinOp, ExprKind, LValueKind, StmtKind};

enum Place {
    Scalar(Symbol),
    Array(Symbol, Operand),
}

struct Lowering<'a> {
    blocks: Vec<Block>,
    symtab: SymbolTable,
    scopes: Vec<HashMap<String, Symbol>>,
    placeholders: HashMap<String, Symbol>,
    temps: TempCounter,
    diagnostics: &'a mut Diagnostics,
    label_counter: u32,
}

pub fn lower(program: &ast::Program, diagnostics: &mut Diagnostics) -> IrProgram {
    let mut l = Lowering {
        blocks: vec![Block::new("entry", vec![])],
        symtab: SymbolTable::new(),
        scopes: vec![HashMap::new()],
        placeholders: HashMap::new(),
        temps: TempCounter::new(),
        diagnostics,
        label_counter: 0,
    };

    let mut current = BlockId(0);
    for stmt in &program.statements {
        current = l.lower_stmt(current, stmt);
    }
    l.terminate(current, Instruction::Halt);

    IrProgram::new(l.blocks, l.symtab)
}

impl<'a> Lowering<'a> {
    fn next_id(&mut self) -> u32 {
        self.label_counter += 1;
        self.label_counter
    }

    fn new_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block::new(label, vec![]));
        id
    }

    fn emit(&mut self, block: BlockId, instr: Instruction) {
        self.blocks[block.0].instructions.push(instr);
    }

    fn terminate(&mut self, block: BlockId, instr: Instruction) {
        self.blocks[block.0].instructions.push(instr);
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare_in_scope(&mut self, name: &str, sym: Symbol) {
        self.scopes.last_mut().expect("a scope is always open").insert(name.to_string(), sym);
    }

    fn lookup(&self, name: &str) -> Option<Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    fn declare_variable(&mut self, name: &str, iterator: bool, pos: SourcePos) -> Symbol {
        if self.scopes.last().expect("a scope is always open").contains_key(name) {
            self.diagnostics.error(Some(pos), format!("`{}` is already declared", name));
        }
        let sym = self.symtab.declare_variable_at(name, iterator, Some(pos));
        self.declare_in_scope(name, sym);
        sym
    }

    fn declare_array(&mut self, name: &str, lo: i64, hi: i64, pos: SourcePos) -> Symbol {
        if self.scopes.last().expect("a scope is always open").contains_key(name) {
            self.diagnostics.error(Some(pos), format!("`{}` is already declared", name));
        }
        let (lo, hi) = if hi < lo {
            self.diagnostics.error(
                Some(pos),
                format!("array `{}` has upper bound {} below lower bound {}", name, hi, lo),
            );
            (lo, lo)
        } else {
            (lo, hi)
        };
        let sym = self.symtab.declare_array_at(name, lo, hi, Some(pos));
        self.declare_in_scope(name, sym);
        sym
    }

    fn placeholder_variable(&mut self, name: &str) -> Symbol {
        let key = format!("{}#var", name);
        if let Some(&sym) = self.placeholders.get(&key) {
            return sym;
        }
        let sym = self.symtab.declare_variable(format!("{}$recovered", name), false);
        self.placeholders.insert(key, sym);
        sym
    }

    fn placeholder_array(&mut self, name: &str) -> Symbol {
        let key = format!("{}#arr", name);
        if let Some(&sym) = self.placeholders.get(&key) {
            return sym;
        }
        let sym = self.symtab.declare_array(format!("{}$recovered", name), 0, 0);
        self.placeholders.insert(key, sym);
        sym
    }

    fn resolve_variable(&mut self, name: &str, pos: SourcePos) -> Symbol {
        if let Some(sym) = self.lookup(name) {
            if self.symtab.get(sym).kind.is_array() {
                self.diagnostics.error(Some(pos), format!("`{}` is an array; an index is required", name));
                return self.placeholder_variable(name);
            }
            return sym;
        }
        self.diagnostics.error(Some(pos), format!("undeclared variable `{}`", name));
        self.placeholder_variable(name)
    }

    fn resolve_array(&mut self, name: &str, pos: SourcePos) -> Symbol {
        if let Some(sym) = self.lookup(name) {
            if !self.symtab.get(sym).kind.is_array() {
                self.diagnostics.error(Some(pos), format!("`{}` is not an array", name));
                return self.placeholder_array(name);
            }
            return sym;
        }
        self.diagnostics.error(Some(pos), format!("undeclared array `{}`", name));
        self.placeholder_array(name)
    }

    fn lower_stmt(&mut self, block: BlockId, stmt: &ast::Stmt) -> BlockId {
        match &stmt.kind {
            StmtKind::ArrayDecl { name, lo, hi } => {
                self.declare_array(name, *lo, *hi, stmt.pos);
                block
            }
            StmtKind::Assign { lvalue, expr } => {
                let place = self.lower_lvalue(block, lvalue);
                let value = self.lower_expr(block, expr);
                self.store(block, place, value, stmt.pos);
                block
            }
            StmtKind::Read { lvalue } => {
                let place = self.lower_lvalue(block, lvalue);
                match place {
                    Place::Scalar(sym) => {
                        self.check_not_iterator(sym, stmt.pos);
                        self.emit(block, Instruction::Get { dst: Operand::Name(sym) });
                        self.symtab.get(sym).initialized.set(true);
                    }
                    Place::Array(base, offset) => {
                        let t = self.temps.fresh();
                        self.emit(block, Instruction::Get { dst: Operand::Temp(t) });
                        self.emit(block, Instruction::IndexedStore { src: Operand::Temp(t), base, offset });
                    }
                }
                block
            }
            StmtKind::Write { expr } => {
                let value = self.lower_expr(block, expr);
                self.emit(block, Instruction::Put { src: value });
                block
            }
            StmtKind::If { cond, then_body, else_body } => self.lower_if(block, cond, then_body, else_body),
            StmtKind::While { cond, body } => self.lower_while(block, cond, body),
            StmtKind::For { var, from, to, downto, body } => {
                self.lower_for(block, var, from, to, *downto, body, stmt.pos)
            }
        }
    }

    fn check_not_iterator(&mut self, sym: Symbol, pos: SourcePos) {
        let entry = self.symtab.get(sym);
        if entry.is_iterator() {
            self.diagnostics.error(Some(pos), format!("cannot assign to loop iterator `{}`", entry.name));
        }
    }

    fn store(&mut self, block: BlockId, place: Place, value: Operand, pos: SourcePos) {
        match place {
            Place::Scalar(sym) => {
                self.check_not_iterator(sym, pos);
                self.emit(block, Instruction::Move { src: value, dst: Operand::Name(sym) });
                self.symtab.get(sym).initialized.set(true);
            }
            Place::Array(base, offset) => {
                self.emit(block, Instruction::IndexedStore { src: value, base, offset });
            }
        }
    }

    fn lower_lvalue(&mut self, block: BlockId, lvalue: &ast::LValue) -> Place {
        match &lvalue.kind {
            LValueKind::Name(name) => Place::Scalar(self.resolve_variable(name, lvalue.pos)),
            LValueKind::Index(name, index) => {
                let base = self.resolve_array(name, lvalue.pos);
                let offset = self.lower_expr(block, index);
                Place::Array(base, offset)
            }
        }
    }

    fn lower_cond(&mut self, block: BlockId, cond: &ast::Cond) -> (RelOp, Operand, Operand) {
        let left = self.lower_expr(block, &cond.left);
        let right = self.lower_expr(block, &cond.right);
        (cond.op, left, right)
    }

    fn lower_expr(&mut self, block: BlockId, expr: &ast::Expr) -> Operand {
        match &expr.kind {
            ExprKind::Number(value) => Operand::Constant(value.clone()),
            ExprKind::Var(name) => Operand::Name(self.resolve_variable(name, expr.pos)),
            ExprKind::Index(name, index) => {
                let base = self.resolve_array(name, expr.pos);
                let offset = self.lower_expr(block, index);
                let dst = self.temps.fresh();
                self.emit(block, Instruction::IndexedLoad { base, offset, dst: Operand::Temp(dst) });
                Operand::Temp(dst)
            }
            ExprKind::Neg(inner) => {
                let value = self.lower_expr(block, inner);
                let dst = self.temps.fresh();
                self.emit(
                    block,
                    Instruction::Sub { left: Operand::constant(0), right: value, result: Operand::Temp(dst) },
                );
                Operand::Temp(dst)
            }
            ExprKind::Bin(op, left, right) => {
                let left = self.lower_expr(block, left);
                let right = self.lower_expr(block, right);
                let dst = self.temps.fresh();
                let result = Operand::Temp(dst);
                let instr = match op {
                    BinOp::Add => Instruction::Add { left, right, result: result.clone() },
                    BinOp::Sub => Instruction::Sub { left, right, result: result.clone() },
                    BinOp::Mul => Instruction::Mul { left, right, result: result.clone() },
                    BinOp::Div => Instruction::Div { left, right, result: result.clone() },
                    BinOp::Mod => Instruction::Rem { left, right, result: result.clone() },
                };
                self.emit(block, instr);
                result
            }
        }
    }

    fn lower_if(&mut self, block: BlockId, cond: &ast::Cond, then_body: &[ast::Stmt], else_body: &[ast::Stmt]) -> BlockId {
        let n = self.next_id();
        let (op, left, right) = self.lower_cond(block, cond);

        let then_id = self.new_block(format!("if.then.{}", n));
        let else_id = if else_body.is_empty() { None } else { Some(self.new_block(format!("if.else.{}", n))) };
        let end_id = self.new_block(format!("if.end.{}", n));

        self.terminate(
            block,
            Instruction::JumpIf { op, left, right, if_true: then_id, if_false: else_id.unwrap_or(end_id) },
        );

        let mut then_cur = then_id;
        for stmt in then_body {
            then_cur = self.lower_stmt(then_cur, stmt);
        }
        self.terminate(then_cur, Instruction::Jump { target: end_id });

        if let Some(else_id) = else_id {
            let mut else_cur = else_id;
            for stmt in else_body {
                else_cur = self.lower_stmt(else_cur, stmt);
            }
            self.terminate(else_cur, Instruction::Jump { target: end_id });
        }

        end_id
    }

    fn lower_while(&mut self, block: BlockId, cond: &ast::Cond, body: &[ast::Stmt]) -> BlockId {
        let n = self.next_id();
        let cond_id = self.new_block(format!("while.cond.{}", n));
        self.terminate(block, Instruction::Jump { target: cond_id });

        let (op, left, right) = self.lower_cond(cond_id, cond);
        let body_id = self.new_block(format!("while.body.{}", n));
        let end_id = self.new_block(format!("while.end.{}", n));
        self.terminate(cond_id, Instruction::JumpIf { op, left, right, if_true: body_id, if_false: end_id });

        let mut body_cur = body_id;
        for stmt in body {
            body_cur = self.lower_stmt(body_cur, stmt);
        }
        self.terminate(body_cur, Instruction::Jump { target: cond_id });

        end_id
    }

    /// `FOR var FROM e1 (TO|DOWNTO) e2 DO body ENDFOR`.
    ///
    /// `from`/`to` are evaluated once, at loop entry. A hidden counter
    /// `_var` is initialized to the iteration span and decremented once per
    /// trip; the loop exits the first (and only) time it hits zero, which
    /// holds exactly at the trip that processes `e2` itself — this is what
    /// keeps an empty range (`from` past `to`) from running the body at all
    /// and a single-element range (`from == to`) from running it twice.
    fn lower_for(
        &mut self,
        block: BlockId,
        var: &str,
        from: &ast::Expr,
        to: &ast::Expr,
        downto: bool,
        body: &[ast::Stmt],
        pos: SourcePos,
    ) -> BlockId {
        let n = self.next_id();
        let from_val = self.lower_expr(block, from);
        let to_val = self.lower_expr(block, to);

        let setup_id = self.new_block(format!("for.setup.{}", n));
        let body_id = self.new_block(format!("for.body.{}", n));
        let continue_id = self.new_block(format!("for.continue.{}", n));
        let end_id = self.new_block(format!("for.end.{}", n));

        let guard_op = if downto { RelOp::Ge } else { RelOp::Le };
        self.terminate(
            block,
            Instruction::JumpIf {
                op: guard_op,
                left: from_val.clone(),
                right: to_val.clone(),
                if_true: setup_id,
                if_false: end_id,
            },
        );

        self.push_scope();
        let iter_sym = self.declare_variable(var, true, pos);
        let counter_sym = self.declare_variable(&format!("_{}", var), false, pos);

        self.emit(setup_id, Instruction::Move { src: from_val.clone(), dst: Operand::Name(iter_sym) });
        let span = if downto {
            Instruction::Sub { left: from_val, right: to_val, result: Operand::Name(counter_sym) }
        } else {
            Instruction::Sub { left: to_val, right: from_val, result: Operand::Name(counter_sym) }
        };
        self.emit(setup_id, span);
        self.terminate(setup_id, Instruction::Jump { target: body_id });

        let mut body_cur = body_id;
        for stmt in body {
            body_cur = self.lower_stmt(body_cur, stmt);
        }
        self.terminate(
            body_cur,
            Instruction::JumpIf {
                op: RelOp::Eq,
                left: Operand::Name(counter_sym),
                right: Operand::constant(0),
                if_true: end_id,
                if_false: continue_id,
            },
        );

        let step = if downto {
            Instruction::Sub { left: Operand::Name(iter_sym), right: Operand::constant(1), result: Operand::Name(iter_sym) }
        } else {
            Instruction::Add { left: Operand::Name(iter_sym), right: Operand::constant(1), result: Operand::Name(iter_sym) }
        };
        self.emit(continue_id, step);
        self.emit(
            continue_id,
            Instruction::Sub { left: Operand::Name(counter_sym), right: Operand::constant(1), result: Operand::Name(counter_sym) },
        );
        self.terminate(continue_id, Instruction::Jump { target: body_id });

        self.pop_scope();
        end_id
    }
}
