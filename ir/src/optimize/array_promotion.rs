use crate::block::Program;
use crate::instr::Instruction;
use crate::operand::Operand;
use crate::symtab::Symbol;
use num_bigint::BigInt;
use std::collections::{HashMap, HashSet};

/// Promotes arrays accessed only through literal offsets into a fresh
/// scalar per distinct offset (§4.2).
///
/// An array is eligible only if *every* `IndexedLoad`/`IndexedStore` against
/// it uses a `Constant` offset; if even one access uses a dynamic offset the
/// array is left untouched; rewriting it partially would make the remaining
/// `IndexedLoad`/`IndexedStore`s on it address a memory region that no
/// longer holds what they expect.
pub fn promote_arrays(program: &mut Program) -> bool {
    let mut offsets_by_base: HashMap<Symbol, HashSet<BigInt>> = HashMap::new();
    let mut ineligible: HashSet<Symbol> = HashSet::new();

    for block in &program.blocks {
        for instr in &block.instructions {
            if let Some((base, offset, _is_load)) = instr.array_access() {
                match offset.as_constant() {
                    Some(v) => {
                        offsets_by_base.entry(base).or_default().insert(v.clone());
                    }
                    None => {
                        ineligible.insert(base);
                    }
                }
            }
        }
    }

    let eligible_bases: Vec<Symbol> = offsets_by_base
        .keys()
        .copied()
        .filter(|b| !ineligible.contains(b))
        .collect();

    if eligible_bases.is_empty() {
        return false;
    }

    let mut scalar_for: HashMap<(Symbol, BigInt), Symbol> = HashMap::new();
    for base in &eligible_bases {
        let name = program.symtab.get(*base).name.clone();
        let mut offsets: Vec<&BigInt> = offsets_by_base[base].iter().collect();
        offsets.sort();
        for offset in offsets {
            let scalar_name = format!("{}#{}", name, offset);
            let scalar = program.symtab.declare_variable(scalar_name, false);
            scalar_for.insert((*base, offset.clone()), scalar);
        }
    }

    for block in program.blocks.iter_mut() {
        for instr in block.instructions.iter_mut() {
            let rewritten = match instr {
                Instruction::IndexedLoad { base, offset, dst } if eligible_bases.contains(base) => {
                    let v = offset.as_constant().expect("eligible base implies literal offset").clone();
                    let scalar = scalar_for[&(*base, v)];
                    Some(Instruction::Move { src: Operand::Name(scalar), dst: dst.clone() })
                }
                Instruction::IndexedStore { src, base, offset } if eligible_bases.contains(base) => {
                    let v = offset.as_constant().expect("eligible base implies literal offset").clone();
                    let scalar = scalar_for[&(*base, v)];
                    Some(Instruction::Move { src: src.clone(), dst: Operand::Name(scalar) })
                }
                _ => None,
            };
            if let Some(rewritten) = rewritten {
                *instr = rewritten;
            }
        }
    }

    log::debug!("promote_arrays: promoted {} array(s) to scalar slots", eligible_bases.len());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::operand::Temp;
    use crate::symtab::SymbolTable;

    #[test]
    fn literal_only_array_has_no_indexed_instructions_left() {
        let mut symtab = SymbolTable::new();
        let a = symtab.declare_array("a", 0, 2);
        let t = Operand::Temp(Temp(0));

        let mut program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::IndexedStore { src: Operand::constant(1), base: a, offset: Operand::constant(0) },
                    Instruction::IndexedLoad { base: a, offset: Operand::constant(0), dst: t.clone() },
                    Instruction::Put { src: t },
                    Instruction::Halt,
                ],
            )],
            symtab,
        );

        assert!(promote_arrays(&mut program));
        for instr in &program.blocks[0].instructions {
            assert!(!matches!(instr, Instruction::IndexedLoad { .. } | Instruction::IndexedStore { .. }));
        }
    }

    #[test]
    fn dynamic_offset_leaves_array_untouched() {
        let mut symtab = SymbolTable::new();
        let a = symtab.declare_array("a", 0, 2);
        let i = Operand::Temp(Temp(0));
        let t = Operand::Temp(Temp(1));

        let mut program = Program::new(
            vec![Block::new(
                "entry",
                vec![
                    Instruction::IndexedLoad { base: a, offset: Operand::constant(0), dst: t.clone() },
                    Instruction::IndexedLoad { base: a, offset: i, dst: t.clone() },
                    Instruction::Halt,
                ],
            )],
            symtab,
        );

        assert!(!promote_arrays(&mut program));
        assert!(matches!(program.blocks[0].instructions[0], Instruction::IndexedLoad { .. }));
    }
}
