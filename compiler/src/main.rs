//! CLI entry point: `compiler <source> <output> [--debug]` (§6), wiring the
//! front end's lex/parse/lower pipeline through the IR optimizer to the
//! back end's assembly emission, in the manner of the teacher's `vasm`/`vex`
//! binaries.

#[macro_use]
extern crate clap;

mod error;

use std::fs;
use std::path::PathBuf;

use clap::Arg;
use colored::Colorize;
use util::{Diagnostics, Severity};

use error::Error;

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(Arg::with_name("SOURCE").help("Source file to compile").required(true).index(1))
        .arg(Arg::with_name("OUTPUT").help("Assembly output path").required(true).index(2))
        .arg(
            Arg::with_name("debug")
                .long("debug")
                .help("Annotate emitted assembly with label and inline comments"),
        )
        .get_matches();

    let source_path = matches.value_of("SOURCE").expect("required argument");
    let output_path = matches.value_of("OUTPUT").expect("required argument");
    let debug = matches.is_present("debug");

    std::process::exit(run(source_path, output_path, debug));
}

fn run(source_path: &str, output_path: &str, debug: bool) -> i32 {
    let source = match fs::read_to_string(source_path) {
        Ok(source) => source,
        Err(source_err) => {
            eprintln!("{}", Error::ReadInput { path: PathBuf::from(source_path), source: source_err });
            return 1;
        }
    };

    let mut diagnostics = Diagnostics::new();
    let ir_program = frontend::compile_source(&source, &mut diagnostics);

    if diagnostics.has_errors() {
        print_diagnostics(&diagnostics, source_path);
        return 1;
    }
    let mut program = ir_program.expect("no accumulated errors implies a program was produced");

    log::debug!("running optimization passes to a fixpoint");
    ir::optimize(&mut program);

    let text = match backend::compile(&program, &mut diagnostics, debug) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("{}", format!("error: {}", err).red());
            return 1;
        }
    };

    print_diagnostics(&diagnostics, source_path);
    if diagnostics.has_errors() {
        return 1;
    }

    if let Err(source_err) = fs::write(output_path, text) {
        eprintln!("{}", Error::WriteOutput { path: PathBuf::from(output_path), source: source_err });
        return 1;
    }

    0
}

fn print_diagnostics(diagnostics: &Diagnostics, source: &str) {
    for item in diagnostics.iter() {
        let line = match item.pos {
            Some(pos) => format!("{}:{}: {}: {}", source, pos, item.severity, item.message),
            None => format!("{}: {}: {}", source, item.severity, item.message),
        };
        match item.severity {
            Severity::Error => eprintln!("{}", line.red()),
            Severity::Warning => eprintln!("{}", line.yellow()),
        }
    }
}
