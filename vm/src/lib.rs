//! Interpreter for the back end's eight-register, word-addressable,
//! arbitrary-precision target machine (§4.3, §6). Used by the back end's
//! own tests and the `compiler` binary's end-to-end suite to check that
//! emitted assembly actually computes what the IR says it should.
//!
//! Deliberately independent of `backend`: this crate owns the target ISA's
//! *runtime* semantics (a resolved, numeric-jump-target program and its
//! execution), while `backend::asm` owns the *assembler* model (unresolved
//! string labels, rendering). The two share a small, stable vocabulary
//! (eight registers, thirteen opcodes) that is cheaper to keep in sync by
//! hand than to thread a dependency edge through for.

pub mod core;
pub mod parse;

pub use core::{ExitCode, TickResult, Vm};
pub use parse::{parse, ParseError, Program, ResolvedInstr};
