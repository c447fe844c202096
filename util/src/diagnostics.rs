//! A process-wide diagnostic accumulator (§7), shared by the front end, the
//! register allocator's lazy uninitialized-use warning, and the `compiler`
//! binary that renders everything to the user.
//!
//! This is the "global mutable diagnostic state" design note modelled as a
//! plain value instead: callers thread a `&mut Diagnostics` through a phase
//! rather than reaching for a `static`, but the lifecycle is the same one
//! described in the spec — created at startup, accumulated into during a
//! phase, checked at phase boundaries, rendered on exit.

use std::fmt;

/// A 1-based source position, threaded from the lexer through the AST.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    pub fn new(line: u32, column: u32) -> SourcePos {
        SourcePos { line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub pos: Option<SourcePos>,
    pub message: String,
}

/// Accumulates diagnostics across phases (parse, semantic check, IR
/// lowering, emission) and answers whether compilation must abort.
///
/// Compilation phases call [`Diagnostics::has_errors`] at natural
/// boundaries and stop before running the next phase if it returns `true`
/// (§7: "compilation phases call a *validate* step at natural boundaries").
#[derive(Default, Debug)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn error(&mut self, pos: Option<SourcePos>, message: impl Into<String>) {
        self.items.push(Diagnostic { severity: Severity::Error, pos, message: message.into() });
    }

    pub fn warning(&mut self, pos: Option<SourcePos>, message: impl Into<String>) {
        self.items.push(Diagnostic { severity: Severity::Warning, pos, message: message.into() });
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Renders every accumulated diagnostic as `source:line:column:
    /// severity: message`, one per line (§6). Diagnostics without a
    /// position (the back end rarely has one available) omit the
    /// `line:column` segment but keep the source name, so output stays
    /// greppable.
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item.pos {
                Some(pos) => out.push_str(&format!("{}:{}: {}: {}\n", source, pos, item.severity, item.message)),
                None => out.push_str(&format!("{}: {}: {}\n", source, item.severity, item.message)),
            }
        }
        out
    }
}
