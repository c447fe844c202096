//! Front end for the source language: lexing, recursive-descent parsing,
//! an AST, and lowering to the three-address IR in the `ir` crate.

pub mod ast;
pub mod lexer;
pub mod lower;
pub mod parser;

use util::Diagnostics;

/// Runs the full front-end pipeline — lex, parse, lower — stopping at the
/// first phase that reports an error (§7: phases validate at their
/// boundaries before handing off to the next).
pub fn compile_source(source: &str, diagnostics: &mut Diagnostics) -> Option<ir::Program> {
    let tokens = match lexer::tokenize(source) {
        Ok(tokens) => tokens,
        Err(err) => {
            diagnostics.error(Some(err.pos), err.message);
            return None;
        }
    };

    let ast = match parser::parse(tokens) {
        Ok(ast) => ast,
        Err(err) => {
            diagnostics.error(Some(err.pos), err.message);
            return None;
        }
    };

    let program = lower::lower(&ast, diagnostics);
    if diagnostics.has_errors() {
        return None;
    }
    Some(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_small_program_end_to_end() {
        let mut diags = Diagnostics::new();
        let program = compile_source("WRITE 2 + 3;", &mut diags).expect("should compile");
        assert!(ir::validate(&program).is_ok());
    }

    #[test]
    fn a_lexer_error_is_reported_and_stops_the_pipeline() {
        let mut diags = Diagnostics::new();
        assert!(compile_source("a := 1 @ 2;", &mut diags).is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn a_semantic_error_is_reported_and_stops_the_pipeline() {
        let mut diags = Diagnostics::new();
        assert!(compile_source("WRITE x;", &mut diags).is_none());
        assert!(diags.has_errors());
    }
}
