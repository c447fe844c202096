//! Reference semantics for a [`Program`] (§6, §8).
//!
//! Used by tests to check that an optimization pass doesn't change what a
//! program actually computes: run the same inputs through the program
//! before and after a pass and compare the `Put` sequence.

use crate::block::Program;
use crate::error::MalformedCfg;
use crate::instr::{Instruction, RelOp};
use crate::operand::Operand;
use crate::sat;
use crate::symtab::Symbol;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterpError {
    Cfg(MalformedCfg),
    OutOfInputs,
    ArrayIndexOutOfBounds { base: Symbol, index: BigInt },
    StepBudgetExceeded,
}

impl fmt::Display for InterpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpError::Cfg(e) => write!(f, "{}", e),
            InterpError::OutOfInputs => write!(f, "program read more inputs than were supplied"),
            InterpError::ArrayIndexOutOfBounds { base, index } => {
                write!(f, "index {} out of bounds for array %{}", index, base.0)
            }
            InterpError::StepBudgetExceeded => {
                write!(f, "exceeded interpreter step budget (likely a non-terminating program)")
            }
        }
    }
}

impl std::error::Error for InterpError {}

impl From<MalformedCfg> for InterpError {
    fn from(e: MalformedCfg) -> Self {
        InterpError::Cfg(e)
    }
}

/// Generous enough for every test program in this crate; exists only to
/// turn an accidental infinite loop in a malformed test fixture into an
/// error instead of a hang.
const STEP_BUDGET: usize = 1_000_000;

fn eval(op: &Operand, values: &HashMap<Operand, BigInt>) -> BigInt {
    match op {
        Operand::Constant(v) => v.clone(),
        _ => values.get(op).cloned().unwrap_or_else(BigInt::zero),
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

fn array_key(program: &Program, base: Symbol, idx: &BigInt) -> Result<(Symbol, i64), InterpError> {
    let i = idx.to_i64().ok_or_else(|| InterpError::ArrayIndexOutOfBounds { base, index: idx.clone() })?;
    if let Some((lo, hi)) = program.symtab.get(base).bounds() {
        if i < lo || i > hi {
            return Err(InterpError::ArrayIndexOutOfBounds { base, index: idx.clone() });
        }
    }
    Ok((base, i))
}

/// Runs `program` to completion against `inputs` (consumed in order by
/// `Get`), returning the sequence of values written by `Put`.
pub fn run(program: &Program, inputs: &[BigInt]) -> Result<Vec<BigInt>, InterpError> {
    let mut values: HashMap<Operand, BigInt> = HashMap::new();
    let mut arrays: HashMap<(Symbol, i64), BigInt> = HashMap::new();
    let mut outputs = Vec::new();
    let mut next_input = 0usize;
    let mut block_id = program.entry();
    let mut steps = 0usize;

    loop {
        let block = program.block(block_id);

        for instr in block.body() {
            steps += 1;
            if steps > STEP_BUDGET {
                return Err(InterpError::StepBudgetExceeded);
            }

            match instr {
                Instruction::Move { src, dst } => {
                    let v = eval(src, &values);
                    values.insert(dst.clone(), v);
                }
                Instruction::Get { dst } => {
                    let v = inputs.get(next_input).cloned().ok_or(InterpError::OutOfInputs)?;
                    next_input += 1;
                    values.insert(dst.clone(), v);
                }
                Instruction::Put { src } => {
                    outputs.push(eval(src, &values));
                }
                Instruction::IndexedLoad { base, offset, dst } => {
                    let idx = eval(offset, &values);
                    let key = array_key(program, *base, &idx)?;
                    let v = arrays.get(&key).cloned().unwrap_or_else(BigInt::zero);
                    values.insert(dst.clone(), v);
                }
                Instruction::IndexedStore { src, base, offset } => {
                    let idx = eval(offset, &values);
                    let key = array_key(program, *base, &idx)?;
                    let v = eval(src, &values);
                    arrays.insert(key, v);
                }
                Instruction::Add { left, right, result } => {
                    values.insert(result.clone(), eval(left, &values) + eval(right, &values));
                }
                Instruction::Sub { left, right, result } => {
                    values.insert(result.clone(), sat::sub(&eval(left, &values), &eval(right, &values)));
                }
                Instruction::Mul { left, right, result } => {
                    values.insert(result.clone(), eval(left, &values) * eval(right, &values));
                }
                Instruction::Div { left, right, result } => {
                    values.insert(result.clone(), sat::div(&eval(left, &values), &eval(right, &values)));
                }
                Instruction::Rem { left, right, result } => {
                    values.insert(result.clone(), sat::rem(&eval(left, &values), &eval(right, &values)));
                }
                Instruction::Jump { .. } | Instruction::JumpIf { .. } | Instruction::Halt => {
                    unreachable!("terminator found in block body")
                }
            }
        }

        steps += 1;
        if steps > STEP_BUDGET {
            return Err(InterpError::StepBudgetExceeded);
        }

        match block.terminator().ok_or(MalformedCfg::MissingTerminator { block: block_id })? {
            Instruction::Halt => return Ok(outputs),
            Instruction::Jump { target } => block_id = *target,
            Instruction::JumpIf { op, left, right, if_true, if_false } => {
                let l = eval(left, &values);
                let r = eval(right, &values);
                block_id = if eval_rel(*op, &l, &r) { *if_true } else { *if_false };
            }
            _ => unreachable!("is_terminator() guarantees one of the above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::instr::BlockId;
    use crate::operand::Temp;
    use crate::optimize::optimize;
    use crate::symtab::SymbolTable;

    #[test]
    fn adds_two_inputs_and_writes_the_sum() {
        let a = Operand::Temp(Temp(0));
        let b = Operand::Temp(Temp(1));
        let c = Operand::Temp(Temp(2));
        let program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Get { dst: a.clone() },
                    Instruction::Get { dst: b.clone() },
                    Instruction::Add { left: a, right: b, result: c.clone() },
                    Instruction::Put { src: c },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        let out = run(&program, &[BigInt::from(2), BigInt::from(3)]).unwrap();
        assert_eq!(out, vec![BigInt::from(5)]);
    }

    #[test]
    fn subtraction_saturates_instead_of_going_negative() {
        let a = Operand::Temp(Temp(0));
        let b = Operand::Temp(Temp(1));
        let c = Operand::Temp(Temp(2));
        let program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Get { dst: a.clone() },
                    Instruction::Get { dst: b.clone() },
                    Instruction::Sub { left: a, right: b, result: c.clone() },
                    Instruction::Put { src: c },
                    Instruction::Halt,
                ],
            )],
            SymbolTable::new(),
        );
        let out = run(&program, &[BigInt::from(3), BigInt::from(5)]).unwrap();
        assert_eq!(out, vec![BigInt::zero()]);
    }

    #[test]
    fn jump_if_branches_on_the_condition() {
        let program = Program::new(
            vec![
                Block::new(
                    "entry",
                    vec![Instruction::JumpIf {
                        op: RelOp::Lt,
                        left: Operand::constant(1),
                        right: Operand::constant(2),
                        if_true: BlockId(1),
                        if_false: BlockId(2),
                    }],
                ),
                Block::new("then", vec![Instruction::Put { src: Operand::constant(10) }, Instruction::Halt]),
                Block::new("else", vec![Instruction::Put { src: Operand::constant(20) }, Instruction::Halt]),
            ],
            SymbolTable::new(),
        );
        let out = run(&program, &[]).unwrap();
        assert_eq!(out, vec![BigInt::from(10)]);
    }

    #[test]
    fn out_of_bounds_array_access_is_reported() {
        let mut symtab = SymbolTable::new();
        let arr = symtab.declare_array("a", 0, 2);
        let program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::IndexedStore { src: Operand::constant(1), base: arr, offset: Operand::constant(5) },
                    Instruction::Halt,
                ],
            )],
            symtab,
        );
        assert!(matches!(run(&program, &[]), Err(InterpError::ArrayIndexOutOfBounds { .. })));
    }

    #[test]
    fn optimizing_a_program_does_not_change_what_it_computes() {
        let a = Operand::Temp(Temp(0));
        let b = Operand::Temp(Temp(1));
        let mut symtab = SymbolTable::new();
        let arr = symtab.declare_array("a", 0, 1);
        let mut program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::Move { src: Operand::constant(2), dst: a.clone() },
                    Instruction::Add { left: a.clone(), right: Operand::constant(3), result: a.clone() },
                    Instruction::IndexedStore { src: a.clone(), base: arr, offset: Operand::constant(0) },
                    Instruction::IndexedLoad { base: arr, offset: Operand::constant(0), dst: b.clone() },
                    Instruction::Put { src: b },
                    Instruction::Halt,
                ],
            )],
            symtab,
        );

        let before = run(&program, &[]).unwrap();
        optimize(&mut program);
        let after = run(&program, &[]).unwrap();
        assert_eq!(before, after);
    }
}
