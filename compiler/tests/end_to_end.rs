//! One test per end-to-end scenario: source text all the way through to an
//! interpreted run of the emitted assembly.

use util::Diagnostics;

fn run_source(source: &str) -> Vec<u8> {
    let mut diagnostics = Diagnostics::new();
    let mut program = frontend::compile_source(source, &mut diagnostics).expect("should compile");
    assert!(!diagnostics.has_errors());

    ir::optimize(&mut program);

    let text = backend::compile(&program, &mut diagnostics, false).expect("should assemble");
    let resolved = vm::parse(&text).expect("emitted assembly should parse");

    let mut machine = vm::Vm::new(resolved, std::io::Cursor::new(&b""[..]), Vec::new());
    let exit = machine.run();
    assert_eq!(exit, vm::ExitCode::Halted);
    machine.output().clone()
}

#[test]
fn constant_arithmetic() {
    assert_eq!(run_source("a := 2 + 3; WRITE a;"), b"5\n".to_vec());
}

#[test]
fn saturating_subtraction() {
    assert_eq!(run_source("a := 3; b := 5; c := a - b; WRITE c;"), b"0\n".to_vec());
}

#[test]
fn division_by_zero_yields_zero() {
    assert_eq!(run_source("a := 10; b := 0; c := a / b; WRITE c;"), b"0\n".to_vec());
}

#[test]
fn for_loop_sum() {
    assert_eq!(
        run_source("sum := 0; FOR i FROM 1 TO 5 DO sum := sum + i; ENDFOR WRITE sum;"),
        b"15\n".to_vec()
    );
}

#[test]
fn array_accessed_only_through_literal_indices_is_promoted_to_scalars() {
    let source = "ARRAY a(0:2); a(0) := 10; a(1) := 20; a(2) := 30; \
                   WRITE a(0); WRITE a(1); WRITE a(2);";

    let mut diagnostics = Diagnostics::new();
    let mut program = frontend::compile_source(source, &mut diagnostics).expect("should compile");
    ir::optimize(&mut program);

    for block in &program.blocks {
        for instr in &block.instructions {
            assert!(!matches!(instr, ir::Instruction::IndexedLoad { .. } | ir::Instruction::IndexedStore { .. }));
        }
    }

    let text = backend::compile(&program, &mut diagnostics, false).unwrap();
    let resolved = vm::parse(&text).unwrap();
    let mut machine = vm::Vm::new(resolved, std::io::Cursor::new(&b""[..]), Vec::new());
    assert_eq!(machine.run(), vm::ExitCode::Halted);
    assert_eq!(machine.output(), &b"10\n20\n30\n".to_vec());
}

#[test]
fn register_pressure_forces_a_spill_and_still_computes_the_right_answer() {
    // Reads a..h rather than assigning literals, so constant folding can't
    // collapse the expression before it ever reaches the allocator.
    let source = "READ a; READ b; READ c; READ d; READ e; READ f; READ g; READ h; \
                   result := (((a + b) * (c + d)) - ((e + f) * (g + h))); WRITE result;";

    let mut diagnostics = Diagnostics::new();
    let mut program = frontend::compile_source(source, &mut diagnostics).expect("should compile");
    ir::optimize(&mut program);

    let text = backend::compile(&program, &mut diagnostics, false).unwrap();
    assert!(text.contains("STORE"), "computing this expression should force a spill to memory");
    assert!(text.contains("LOAD"));

    let resolved = vm::parse(&text).unwrap();
    let input = b"1\n2\n3\n4\n5\n6\n7\n8\n".to_vec();
    let mut machine = vm::Vm::new(resolved, std::io::Cursor::new(input), Vec::new());
    assert_eq!(machine.run(), vm::ExitCode::Halted);
    // (1+2)*(3+4) - (5+6)*(7+8) = 21 - 165, saturates to 0.
    assert_eq!(machine.output(), &b"0\n".to_vec());
}
