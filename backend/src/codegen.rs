//! Code-gen driver (§4.6, C7): walks blocks in input order, dispatches each
//! quadruple to a peephole idiom or the generic macro, and threads the
//! register allocator and next-use information through the whole pass.

use crate::asm::{AssembleError, Assembler, Instr};
use crate::macros;
use crate::regalloc::Allocator;
use ir::{analyses, BlockId, Instruction, MalformedCfg, Operand, Program, RelOp};
use std::fmt;
use util::Diagnostics;

#[derive(Debug)]
pub enum CodegenError {
    MalformedCfg(MalformedCfg),
    Assemble(AssembleError),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::MalformedCfg(e) => write!(f, "{}", e),
            CodegenError::Assemble(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<MalformedCfg> for CodegenError {
    fn from(e: MalformedCfg) -> CodegenError {
        CodegenError::MalformedCfg(e)
    }
}

impl From<AssembleError> for CodegenError {
    fn from(e: AssembleError) -> CodegenError {
        CodegenError::Assemble(e)
    }
}

/// Lowers `program` to target assembly text. `diagnostics` accumulates the
/// allocator's lazy uninitialized-use warnings (§4.5, §7); `debug` controls
/// whether the rendered text carries label/inline comments (§6).
pub fn compile(program: &Program, diagnostics: &mut Diagnostics, debug: bool) -> Result<String, CodegenError> {
    ir::validate(program)?;
    let preds = analyses::predecessors(program)?;
    let dominators = analyses::dominators(program, &preds);
    let liveness = analyses::liveness(program);

    let mut alloc = Allocator::new(&program.symtab);
    let mut asm = Assembler::new();

    for id in program.block_ids() {
        let block = program.block(id);
        asm.place_label(block.label.clone());

        let live_out = &liveness[&id].live_out;
        let next_use = analyses::next_use(block, live_out);
        let _ = next_use; // computed per §4.6 step 2; consulted by future peephole refinements.

        for instr in block.body() {
            alloc.clear_selection();
            lower(instr, &mut alloc, &mut asm, diagnostics);
        }

        let terminator = block.terminator().expect("validate() already rejected missing terminators");
        alloc.clear_selection();
        lower_terminator(terminator, id, program, &dominators, live_out, &mut alloc, &mut asm, diagnostics);
    }

    Ok(asm.render(debug)?)
}

fn lower(instr: &Instruction, alloc: &mut Allocator, asm: &mut Assembler, diagnostics: &mut Diagnostics) {
    match instr {
        Instruction::Move { src, dst } => {
            let r = macros::copy(alloc, asm, diagnostics, src);
            alloc.seize(r, dst.clone());
        }
        Instruction::Get { dst } => {
            let r = macros::get(alloc, asm);
            alloc.seize(r, dst.clone());
        }
        Instruction::Put { src } => {
            macros::put(alloc, asm, diagnostics, src);
        }
        Instruction::IndexedLoad { base, offset, dst } => {
            let r = alloc.load_indexed(asm, diagnostics, *base, offset);
            alloc.seize(r, dst.clone());
        }
        Instruction::IndexedStore { src, base, offset } => {
            alloc.store_indexed(asm, diagnostics, src, *base, offset);
        }
        Instruction::Add { left, right, result } => {
            let r = lower_add(alloc, asm, diagnostics, left, right, result);
            alloc.seize(r, result.clone());
        }
        Instruction::Sub { left, right, result } => {
            let r = lower_sub(alloc, asm, diagnostics, left, right, result);
            alloc.seize(r, result.clone());
        }
        Instruction::Mul { left, right, result } => {
            let r = lower_mul(alloc, asm, diagnostics, left, right, result);
            alloc.seize(r, result.clone());
        }
        Instruction::Div { left, right, result } => {
            let r = lower_div(alloc, asm, diagnostics, left, right, result);
            alloc.seize(r, result.clone());
        }
        Instruction::Rem { left, right, result } => {
            let r = lower_rem(alloc, asm, diagnostics, left, right, result);
            alloc.seize(r, result.clone());
        }
        Instruction::Jump { .. } | Instruction::JumpIf { .. } | Instruction::Halt => {
            unreachable!("terminators are dispatched by lower_terminator, never lower()")
        }
    }
}

fn one() -> Operand {
    Operand::constant(1)
}

fn two() -> Operand {
    Operand::constant(2)
}

/// `Add(x, 1, x)` / `Add(1, x, x)` -> `INC` in place; `Add(x, 1, y)` /
/// `Add(1, x, y)` -> non-destructive `inc`; `Add(x, y, x)` / `Add(y, x, x)`
/// -> destructive `add`; otherwise the generic non-destructive `add`.
fn lower_add(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    left: &Operand,
    right: &Operand,
    result: &Operand,
) -> crate::asm::Register {
    if right == &one() && left == result {
        return macros::inc_destructive(alloc, asm, diagnostics, left);
    }
    if left == &one() && right == result {
        return macros::inc_destructive(alloc, asm, diagnostics, right);
    }
    if right == &one() {
        return macros::inc(alloc, asm, diagnostics, left);
    }
    if left == &one() {
        return macros::inc(alloc, asm, diagnostics, right);
    }
    if left == result {
        return macros::add_destructive(alloc, asm, diagnostics, left, right);
    }
    if right == result {
        return macros::add_destructive(alloc, asm, diagnostics, right, left);
    }
    macros::add(alloc, asm, diagnostics, left, right)
}

/// `Sub(x, 1, x)` -> `DEC` in place; `Sub(x, 1, y)` -> non-destructive
/// `dec`; `Sub(x, y, x)` -> destructive `sub`; otherwise generic.
fn lower_sub(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    left: &Operand,
    right: &Operand,
    result: &Operand,
) -> crate::asm::Register {
    if right == &one() && left == result {
        return macros::dec_destructive(alloc, asm, diagnostics, left);
    }
    if right == &one() {
        return macros::dec(alloc, asm, diagnostics, left);
    }
    if left == result {
        return macros::sub_destructive(alloc, asm, diagnostics, left, right);
    }
    macros::sub(alloc, asm, diagnostics, left, right)
}

/// `Mul(x, 2, x)` / `Mul(2, x, x)` -> destructive `twice`; otherwise the
/// full `longMul`.
fn lower_mul(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    left: &Operand,
    right: &Operand,
    result: &Operand,
) -> crate::asm::Register {
    if right == &two() && left == result {
        return macros::twice_destructive(alloc, asm, diagnostics, left);
    }
    if left == &two() && right == result {
        return macros::twice_destructive(alloc, asm, diagnostics, right);
    }
    macros::long_mul(alloc, asm, diagnostics, left, right)
}

/// `Div(x, 2, x)` -> destructive `half`; otherwise the full `longDiv`.
fn lower_div(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    left: &Operand,
    right: &Operand,
    result: &Operand,
) -> crate::asm::Register {
    if right == &two() && left == result {
        return macros::half_destructive(alloc, asm, diagnostics, left);
    }
    macros::long_div(alloc, asm, diagnostics, left, right)
}

/// `Rem(x, 2, y)` -> `rem2`; otherwise the full `longRem`.
fn lower_rem(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    left: &Operand,
    right: &Operand,
    _result: &Operand,
) -> crate::asm::Register {
    if right == &two() {
        return macros::rem2(alloc, asm, diagnostics, left);
    }
    macros::long_rem(alloc, asm, diagnostics, left, right)
}

#[allow(clippy::too_many_arguments)]
fn lower_terminator(
    terminator: &Instruction,
    current: BlockId,
    program: &Program,
    dominators: &analyses::Dominators,
    live_out: &std::collections::HashSet<Operand>,
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
) {
    match terminator {
        Instruction::Jump { target } => {
            let dominates = dominators[target].contains(&current);
            alloc.save_variables(asm, live_out, dominates);
            asm.emit(Instr::Jump(program.block(*target).label.clone()));
            alloc.reset_registers_state();
        }
        Instruction::JumpIf { op, left, right, if_true, if_false } => {
            let dominates = dominators[if_true].contains(&current) && dominators[if_false].contains(&current);
            alloc.save_variables(asm, live_out, dominates);

            let true_label = program.block(*if_true).label.clone();
            let false_label = program.block(*if_false).label.clone();
            lower_branch(*op, left, right, &true_label, alloc, asm, diagnostics);
            asm.emit(Instr::Jump(false_label));

            alloc.reset_registers_state();
        }
        Instruction::Halt => {
            alloc.save_variables(asm, live_out, true);
            asm.emit(Instr::Halt);
            alloc.reset_registers_state();
        }
        _ => unreachable!("block.terminator() only ever returns a control-flow instruction"),
    }
}

/// Peephole branch idioms (§4.6): any comparison against literal zero
/// shortcuts straight to `JZERO`/its negation instead of the generic
/// saturating-subtraction sequence.
fn lower_branch(
    op: RelOp,
    left: &Operand,
    right: &Operand,
    true_label: &str,
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
) {
    let zero = Operand::constant(0);
    if let Some(other) = zero_peephole_operand(op, left, right, &zero) {
        match zero_peephole_sense(op, left, &zero) {
            ZeroSense::JumpIfZero => macros::jzero(alloc, asm, diagnostics, other, true_label.to_string()),
            ZeroSense::JumpIfNonzero => {
                let r = alloc.load(asm, diagnostics, other);
                let skip = asm.fresh_label("macro.branch.nz_skip");
                asm.emit(Instr::Jzero(r, skip.clone()));
                asm.emit(Instr::Jump(true_label.to_string()));
                asm.place_label(skip);
            }
        }
        return;
    }

    match op {
        RelOp::Eq => macros::jump_eq(alloc, asm, diagnostics, left, right, true_label.to_string()),
        RelOp::Ne => macros::jump_ne(alloc, asm, diagnostics, left, right, true_label.to_string()),
        RelOp::Lt => macros::jump_lt(alloc, asm, diagnostics, left, right, true_label.to_string()),
        RelOp::Gt => macros::jump_gt(alloc, asm, diagnostics, left, right, true_label.to_string()),
        RelOp::Le => macros::jump_le(alloc, asm, diagnostics, left, right, true_label.to_string()),
        RelOp::Ge => macros::jump_ge(alloc, asm, diagnostics, left, right, true_label.to_string()),
    }
}

enum ZeroSense {
    JumpIfZero,
    JumpIfNonzero,
}

/// Whichever side isn't the literal `0`, if exactly one side is — the
/// operand the zero-peephole needs to test.
fn zero_peephole_operand<'a>(op: RelOp, left: &'a Operand, right: &'a Operand, zero: &Operand) -> Option<&'a Operand> {
    match op {
        RelOp::Eq | RelOp::Ne => {
            if right == zero {
                Some(left)
            } else if left == zero {
                Some(right)
            } else {
                None
            }
        }
        RelOp::Gt if right == zero => Some(left),
        RelOp::Lt if left == zero => Some(right),
        _ => None,
    }
}

fn zero_peephole_sense(op: RelOp, left: &Operand, zero: &Operand) -> ZeroSense {
    match op {
        RelOp::Eq => ZeroSense::JumpIfZero,
        RelOp::Ne => ZeroSense::JumpIfNonzero,
        RelOp::Gt | RelOp::Lt => {
            let _ = (left, zero);
            ZeroSense::JumpIfNonzero
        }
        _ => unreachable!("zero_peephole_operand only returns Some for Eq/Ne/Gt/Lt"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::{Block, SymbolTable, Temp};

    #[test]
    fn constant_move_then_put_then_halt_compiles() {
        let a = Operand::Temp(Temp(0));
        let program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Move { src: Operand::constant(5), dst: a.clone() },
                    Instruction::Put { src: a },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        let mut diags = Diagnostics::new();
        let text = compile(&program, &mut diags, false).unwrap();
        assert!(text.contains("PUT"));
        assert!(text.trim_end().ends_with("HALT"));
    }

    #[test]
    fn branch_against_zero_uses_the_jzero_peephole_not_the_generic_sequence() {
        let x = Operand::Temp(Temp(0));
        let program = Program::new(
            vec![
                Block::new(
                    "entry",
                    vec![Instruction::JumpIf {
                        op: RelOp::Eq,
                        left: x,
                        right: Operand::constant(0),
                        if_true: BlockId(1),
                        if_false: BlockId(2),
                    }],
                ),
                Block::new("then", vec![Instruction::Halt]),
                Block::new("else", vec![Instruction::Halt]),
            ],
            SymbolTable::new(),
        );
        let mut diags = Diagnostics::new();
        let text = compile(&program, &mut diags, false).unwrap();
        assert!(text.contains("JZERO"));
    }

    #[test]
    fn compiled_addition_runs_to_the_expected_output() {
        let a = Operand::Temp(Temp(0));
        let b = Operand::Temp(Temp(1));
        let program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Move { src: Operand::constant(2), dst: a.clone() },
                    Instruction::Add { left: a, right: Operand::constant(3), result: b.clone() },
                    Instruction::Put { src: b },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        let mut diags = Diagnostics::new();
        let text = compile(&program, &mut diags, false).unwrap();

        let resolved = vm::parse(&text).unwrap();
        let mut interp = vm::Vm::new(resolved, std::io::Cursor::new(&b""[..]), Vec::new());
        let exit = interp.run();
        assert_eq!(exit, vm::ExitCode::Halted);
        assert_eq!(interp.output(), &b"5\n".to_vec());
    }

    #[test]
    fn jump_to_a_block_the_current_block_does_not_dominate_saves_live_registers() {
        // A diamond where the join block is reached from two predecessors,
        // so neither predecessor dominates it; a named variable live into
        // the join must be stored before branching there — only named
        // variables are ever flushed by `save_variables`, never temps.
        let mut symtab = SymbolTable::new();
        let v = Operand::Name(symtab.declare_variable("v", false));
        let program = Program::new(
            vec![
                Block::new(
                    "entry",
                    vec![
                        Instruction::Get { dst: v.clone() },
                        Instruction::JumpIf {
                            op: RelOp::Eq,
                            left: v.clone(),
                            right: Operand::constant(0),
                            if_true: BlockId(1),
                            if_false: BlockId(2),
                        },
                    ],
                ),
                Block::new("left", vec![Instruction::Jump { target: BlockId(3) }]),
                Block::new("right", vec![Instruction::Jump { target: BlockId(3) }]),
                Block::new("join", vec![Instruction::Put { src: v }, Instruction::Halt]),
            ],
            symtab,
        );
        let mut diags = Diagnostics::new();
        let text = compile(&program, &mut diags, false).unwrap();
        assert!(text.contains("STORE"));
    }
}
