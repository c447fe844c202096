//! Instruction selection, macro expansion, register allocation and assembly
//! rendering (§4.3-§4.6, C4-C7): the back half of the pipeline, downstream
//! of `ir`'s analyses and optimizations.

pub mod asm;
pub mod codegen;
pub mod cost;
pub mod macros;
pub mod regalloc;

pub use asm::{AssembleError, Assembler, Instr, Register};
pub use codegen::{compile, CodegenError};
pub use regalloc::Allocator;
