use crate::block::{Block, Program};
use crate::instr::{Instruction, RelOp};
use crate::operand::Operand;
use crate::sat;
use crate::symtab::Symbol;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use std::collections::HashMap;

type Known = HashMap<Operand, BigInt>;
type ArraySlots = HashMap<(Symbol, BigInt), Option<BigInt>>;

fn substitute(op: &Operand, known: &Known) -> Operand {
    match op {
        Operand::Constant(_) => op.clone(),
        _ => known.get(op).map(|v| Operand::Constant(v.clone())).unwrap_or_else(|| op.clone()),
    }
}

fn eval_rel(op: RelOp, l: &BigInt, r: &BigInt) -> bool {
    match op {
        RelOp::Eq => l == r,
        RelOp::Ne => l != r,
        RelOp::Lt => l < r,
        RelOp::Gt => l > r,
        RelOp::Le => l <= r,
        RelOp::Ge => l >= r,
    }
}

/// Folds one arithmetic quadruple, applying the neutral-element rewrites
/// before falling back to full literal/literal folding, per §4.2. Returns
/// the instruction to keep in its place (itself, a `Move`, or unchanged).
fn fold_arith(instr: &Instruction, known: &Known) -> Instruction {
    use Instruction::*;

    match instr {
        Add { left, right, result } => {
            let (l, r) = (substitute(left, known), substitute(right, known));
            if is_zero(&r) {
                Move { src: l, dst: result.clone() }
            } else if is_zero(&l) {
                Move { src: r, dst: result.clone() }
            } else if let (Some(a), Some(b)) = (as_lit(&l), as_lit(&r)) {
                Move { src: Operand::Constant(a + b), dst: result.clone() }
            } else {
                Add { left: l, right: r, result: result.clone() }
            }
        }
        Sub { left, right, result } => {
            let (l, r) = (substitute(left, known), substitute(right, known));
            if is_zero(&r) {
                Move { src: l, dst: result.clone() }
            } else if is_zero(&l) {
                Move { src: Operand::constant(0), dst: result.clone() }
            } else if let (Some(a), Some(b)) = (as_lit(&l), as_lit(&r)) {
                Move { src: Operand::Constant(sat::sub(&a, &b)), dst: result.clone() }
            } else {
                Sub { left: l, right: r, result: result.clone() }
            }
        }
        Mul { left, right, result } => {
            let (l, r) = (substitute(left, known), substitute(right, known));
            if is_zero(&l) || is_zero(&r) {
                Move { src: Operand::constant(0), dst: result.clone() }
            } else if is_one(&r) {
                Move { src: l, dst: result.clone() }
            } else if is_one(&l) {
                Move { src: r, dst: result.clone() }
            } else if let (Some(a), Some(b)) = (as_lit(&l), as_lit(&r)) {
                Move { src: Operand::Constant(a * b), dst: result.clone() }
            } else {
                Mul { left: l, right: r, result: result.clone() }
            }
        }
        Div { left, right, result } => {
            let (l, r) = (substitute(left, known), substitute(right, known));
            if is_zero(&r) {
                Move { src: Operand::constant(0), dst: result.clone() }
            } else if is_one(&r) {
                Move { src: l, dst: result.clone() }
            } else if let (Some(a), Some(b)) = (as_lit(&l), as_lit(&r)) {
                Move { src: Operand::Constant(sat::div(&a, &b)), dst: result.clone() }
            } else {
                Div { left: l, right: r, result: result.clone() }
            }
        }
        Rem { left, right, result } => {
            let (l, r) = (substitute(left, known), substitute(right, known));
            if is_zero(&r) {
                Move { src: Operand::constant(0), dst: result.clone() }
            } else if is_one(&r) {
                Move { src: Operand::constant(0), dst: result.clone() }
            } else if let (Some(a), Some(b)) = (as_lit(&l), as_lit(&r)) {
                Move { src: Operand::Constant(sat::rem(&a, &b)), dst: result.clone() }
            } else {
                Rem { left: l, right: r, result: result.clone() }
            }
        }
        other => other.clone(),
    }
}

fn as_lit(op: &Operand) -> Option<BigInt> {
    op.as_constant().cloned()
}

fn is_zero(op: &Operand) -> bool {
    matches!(op, Operand::Constant(v) if v.is_zero())
}

fn is_one(op: &Operand) -> bool {
    matches!(op, Operand::Constant(v) if v.is_one())
}

fn fold_block(block: &mut Block) -> bool {
    let mut known: Known = Known::new();
    let mut slots: ArraySlots = ArraySlots::new();
    let mut changed = false;

    for instr in block.instructions.iter_mut() {
        let rewritten = match instr {
            Instruction::Add { .. }
            | Instruction::Sub { .. }
            | Instruction::Mul { .. }
            | Instruction::Div { .. }
            | Instruction::Rem { .. } => fold_arith(instr, &known),

            Instruction::Move { src, dst } => {
                Instruction::Move { src: substitute(src, &known), dst: dst.clone() }
            }

            Instruction::Put { src } => Instruction::Put { src: substitute(src, &known) },

            Instruction::JumpIf { op, left, right, if_true, if_false } => {
                let (l, r) = (substitute(left, &known), substitute(right, &known));
                if let (Some(a), Some(b)) = (as_lit(&l), as_lit(&r)) {
                    let target = if eval_rel(*op, &a, &b) { *if_true } else { *if_false };
                    Instruction::Jump { target }
                } else {
                    Instruction::JumpIf { op: *op, left: l, right: r, if_true: *if_true, if_false: *if_false }
                }
            }

            Instruction::IndexedLoad { base, offset, dst } => {
                let off = substitute(offset, &known);
                if let Some(v) = as_lit(&off) {
                    if let Some(Some(value)) = slots.get(&(*base, v)) {
                        Instruction::Move { src: Operand::Constant(value.clone()), dst: dst.clone() }
                    } else {
                        Instruction::IndexedLoad { base: *base, offset: off, dst: dst.clone() }
                    }
                } else {
                    Instruction::IndexedLoad { base: *base, offset: off, dst: dst.clone() }
                }
            }

            Instruction::IndexedStore { src, base, offset } => {
                let (s, off) = (substitute(src, &known), substitute(offset, &known));
                Instruction::IndexedStore { src: s, base: *base, offset: off }
            }

            other => other.clone(),
        };

        if rewritten != *instr {
            changed = true;
            *instr = rewritten;
        }

        // Map maintenance: record what this (possibly just-rewritten)
        // instruction teaches us for the remainder of the block.
        match instr {
            Instruction::Move { src, dst } => match src.as_constant() {
                Some(v) => {
                    known.insert(dst.clone(), v.clone());
                }
                None => {
                    known.remove(dst);
                }
            },
            Instruction::IndexedStore { src, base, offset } => {
                if let Some(off_v) = as_lit(offset) {
                    slots.insert((*base, off_v), src.as_constant().cloned());
                } else {
                    // Unknown index: any slot of this array may have been
                    // overwritten.
                    slots.retain(|(b, _), _| b != base);
                }
            }
            other => {
                if let Some(def) = other.defines() {
                    known.remove(def);
                }
            }
        }
    }

    changed
}

/// Constant propagation and folding to a fixpoint (§4.2): repeats the
/// map-maintenance/propagation pair over every block until a full pass
/// leaves every block unchanged.
///
/// Analyses that depend on instruction identity (reaching definitions,
/// liveness) are invalidated by these rewrites and must be recomputed by the
/// caller afterwards — consistent with §5's "analysis results ... rebuilt on
/// demand after each optimization pass".
pub fn constant_fold(program: &mut Program) -> bool {
    let mut any_changed = false;
    loop {
        let mut pass_changed = false;
        for block in program.blocks.iter_mut() {
            if fold_block(block) {
                pass_changed = true;
            }
        }
        if !pass_changed {
            break;
        }
        any_changed = true;
        log::debug!("constant_fold: another fixpoint iteration changed the program");
    }
    any_changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::BlockId;
    use crate::operand::Temp;
    use crate::symtab::SymbolTable;

    fn run(mut block: Block) -> Block {
        let mut program = Program::new(vec![block.clone()], SymbolTable::new());
        constant_fold(&mut program);
        block = program.blocks.remove(0);
        block
    }

    #[test]
    fn constant_arithmetic_folds_to_a_single_move() {
        let a = Operand::Temp(Temp(0));
        let block = Block::new(
            "entry",
            vec![
                Instruction::Move { src: Operand::constant(2), dst: a.clone() },
                Instruction::Add { left: a.clone(), right: Operand::constant(3), result: a.clone() },
                Instruction::Put { src: a },
                Instruction::Halt,
            ],
        );
        let folded = run(block);
        assert_eq!(
            folded.instructions[1],
            Instruction::Move { src: Operand::constant(5), dst: Operand::Temp(Temp(0)) }
        );
    }

    #[test]
    fn subtraction_underflow_saturates_to_zero() {
        let a = Operand::Temp(Temp(0));
        let b = Operand::Temp(Temp(1));
        let c = Operand::Temp(Temp(2));
        let block = Block::new(
            "entry",
            vec![
                Instruction::Move { src: Operand::constant(3), dst: a.clone() },
                Instruction::Move { src: Operand::constant(5), dst: b.clone() },
                Instruction::Sub { left: a, right: b, result: c.clone() },
                Instruction::Put { src: c },
                Instruction::Halt,
            ],
        );
        let folded = run(block);
        assert_eq!(
            folded.instructions[2],
            Instruction::Move { src: Operand::constant(0), dst: Operand::Temp(Temp(2)) }
        );
    }

    #[test]
    fn division_by_zero_folds_to_zero() {
        let a = Operand::Temp(Temp(0));
        let b = Operand::Temp(Temp(1));
        let c = Operand::Temp(Temp(2));
        let block = Block::new(
            "entry",
            vec![
                Instruction::Move { src: Operand::constant(10), dst: a.clone() },
                Instruction::Move { src: Operand::constant(0), dst: b.clone() },
                Instruction::Div { left: a, right: b, result: c.clone() },
                Instruction::Put { src: c },
                Instruction::Halt,
            ],
        );
        let folded = run(block);
        assert_eq!(
            folded.instructions[2],
            Instruction::Move { src: Operand::constant(0), dst: Operand::Temp(Temp(2)) }
        );
    }

    #[test]
    fn add_one_is_not_folded_into_a_literal_move() {
        let x = Operand::Temp(Temp(0));
        let y = Operand::Temp(Temp(1));
        let block = Block::new(
            "entry",
            vec![
                Instruction::Add { left: x.clone(), right: Operand::constant(1), result: y },
                Instruction::Halt,
            ],
        );
        let folded = run(block);
        assert!(matches!(folded.instructions[0], Instruction::Add { .. }));
    }

    #[test]
    fn branch_with_literal_operands_folds_to_unconditional_jump() {
        let block = Block::new(
            "entry",
            vec![Instruction::JumpIf {
                op: RelOp::Lt,
                left: Operand::constant(1),
                right: Operand::constant(2),
                if_true: BlockId(1),
                if_false: BlockId(2),
            }],
        );
        let folded = run(block);
        assert_eq!(folded.instructions[0], Instruction::Jump { target: BlockId(1) });
    }

    #[test]
    fn re_running_fold_after_convergence_changes_nothing() {
        let a = Operand::Temp(Temp(0));
        let mut program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Move { src: Operand::constant(2), dst: a.clone() },
                    Instruction::Add { left: a.clone(), right: Operand::constant(3), result: a },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        assert!(constant_fold(&mut program));
        assert!(!constant_fold(&mut program));
    }
}
