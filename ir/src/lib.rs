//! Three-address intermediate representation: the CFG, its dataflow
//! analyses, and the optimization passes that rewrite it (§2-§5).

pub mod analyses;
pub mod block;
pub mod error;
pub mod instr;
pub mod interp;
pub mod operand;
pub mod optimize;
pub mod sat;
pub mod symtab;

pub use block::{Block, Program};
pub use error::MalformedCfg;
pub use instr::{BlockId, Instruction, RelOp};
pub use operand::{Operand, Temp, TempCounter};
pub use symtab::{Symbol, SymbolEntry, SymbolKind, SymbolTable};

/// Verifies the CFG invariant from §3: every block ends in exactly one
/// control-flow instruction, and every jump target names a real block.
pub fn validate(program: &Program) -> Result<(), MalformedCfg> {
    for id in program.block_ids() {
        let block = program.block(id);
        let terminator = block.terminator().ok_or(MalformedCfg::MissingTerminator { block: id })?;
        for target in terminator.successors() {
            if target.0 >= program.blocks.len() {
                return Err(MalformedCfg::UnknownTarget { from: id, target });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_program_validates() {
        let program = Program::new(vec![Block::new("entry", vec![Instruction::Halt])], SymbolTable::new());
        assert!(validate(&program).is_ok());
    }

    #[test]
    fn jump_to_unknown_block_is_rejected() {
        let program = Program::new(
            vec![Block::new("entry", vec![Instruction::Jump { target: BlockId(9) }])],
            SymbolTable::new(),
        );
        assert_eq!(
            validate(&program),
            Err(MalformedCfg::UnknownTarget { from: BlockId(0), target: BlockId(9) })
        );
    }

    #[test]
    fn block_without_terminator_is_rejected() {
        let program = Program::new(vec![Block::new("entry", vec![])], SymbolTable::new());
        assert_eq!(validate(&program), Err(MalformedCfg::MissingTerminator { block: BlockId(0) }));
    }
}
