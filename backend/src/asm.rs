//! Target ISA and assembler model (§4.3, C4): eight registers, word-
//! addressable arbitrary-precision memory, a label table resolving named
//! jump targets to instruction indices, and text rendering.

use std::collections::HashMap;
use std::fmt;
use util::{EnumFromStr, Mnemonic};
use util_derive::{EnumFromStr, Mnemonic};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Mnemonic, EnumFromStr)]
pub enum Register {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl Register {
    pub const ALL: [Register; 8] = [
        Register::A,
        Register::B,
        Register::C,
        Register::D,
        Register::E,
        Register::F,
        Register::G,
        Register::H,
    ];

    /// `A` is the address register: `LOAD`/`STORE` always act through it, so
    /// it is never a candidate the allocator hands out for an ordinary value.
    pub fn is_address(self) -> bool {
        matches!(self, Register::A)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// One target-machine instruction (§4.3). Jump targets are label names until
/// [`Assembler::render`] resolves them to instruction indices.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instr {
    Get(Register),
    Put(Register),
    Load(Register),
    Store(Register),
    Copy(Register, Register),
    Add(Register, Register),
    Sub(Register, Register),
    Half(Register),
    Inc(Register),
    Dec(Register),
    Jump(String),
    Jzero(Register, String),
    Jodd(Register, String),
    Halt,
}

impl Instr {
    fn mnemonic(&self) -> &'static str {
        match self {
            Instr::Get(_) => "GET",
            Instr::Put(_) => "PUT",
            Instr::Load(_) => "LOAD",
            Instr::Store(_) => "STORE",
            Instr::Copy(..) => "COPY",
            Instr::Add(..) => "ADD",
            Instr::Sub(..) => "SUB",
            Instr::Half(_) => "HALF",
            Instr::Inc(_) => "INC",
            Instr::Dec(_) => "DEC",
            Instr::Jump(_) => "JUMP",
            Instr::Jzero(..) => "JZERO",
            Instr::Jodd(..) => "JODD",
            Instr::Halt => "HALT",
        }
    }

    /// Renders the instruction with its jump target already resolved to a
    /// numeric instruction index.
    fn render(&self, resolve: impl Fn(&str) -> Option<usize>) -> Result<String, AssembleError> {
        let op = self.mnemonic();
        Ok(match self {
            Instr::Get(r) | Instr::Put(r) | Instr::Load(r) | Instr::Store(r) | Instr::Half(r)
            | Instr::Inc(r) | Instr::Dec(r) => format!("{} {}", op, r),
            Instr::Copy(r, s) | Instr::Add(r, s) | Instr::Sub(r, s) => format!("{} {} {}", op, r, s),
            Instr::Jump(label) => format!("{} {}", op, resolve_or_err(&resolve, label)?),
            Instr::Jzero(r, label) | Instr::Jodd(r, label) => {
                format!("{} {} {}", op, r, resolve_or_err(&resolve, label)?)
            }
            Instr::Halt => op.to_string(),
        })
    }
}

fn resolve_or_err(
    resolve: &impl Fn(&str) -> Option<usize>,
    label: &str,
) -> Result<usize, AssembleError> {
    resolve(label).ok_or_else(|| AssembleError::UnknownLabel(label.to_string()))
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AssembleError {
    UnknownLabel(String),
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssembleError::UnknownLabel(name) => {
                write!(f, "internal error: jump to undefined label \"{}\"", name)
            }
        }
    }
}

impl std::error::Error for AssembleError {}

/// Accumulates instructions and a label table, then renders to text (§4.3).
///
/// Labels are recorded as the instruction index they land on *at the moment
/// they're placed*; multiple labels may land on the same index (e.g. two
/// consecutive IR blocks that both fall through to the same code).
pub struct Assembler {
    instructions: Vec<Instr>,
    comments: Vec<Option<String>>,
    labels: HashMap<String, usize>,
    label_counters: HashMap<&'static str, u32>,
}

impl Assembler {
    pub fn new() -> Assembler {
        Assembler {
            instructions: Vec::new(),
            comments: Vec::new(),
            labels: HashMap::new(),
            label_counters: HashMap::new(),
        }
    }

    /// Binds `name` to the instruction index about to be emitted next.
    pub fn place_label(&mut self, name: impl Into<String>) {
        self.labels.insert(name.into(), self.instructions.len());
    }

    /// A fresh, deterministic label under `prefix`, unique within this
    /// assembler instance (§4.4: "macro-generated labels use a deterministic
    /// counter keyed by a prefix").
    pub fn fresh_label(&mut self, prefix: &'static str) -> String {
        let n = self.label_counters.entry(prefix).or_insert(0);
        let label = format!("{}.{}", prefix, n);
        *n += 1;
        label
    }

    pub fn emit(&mut self, instr: Instr) {
        self.instructions.push(instr);
        self.comments.push(None);
    }

    /// Like [`Assembler::emit`], but attaches a `--debug`-only inline
    /// comment (§6: "embed per-instruction inline comments").
    pub fn emit_with_comment(&mut self, instr: Instr, comment: impl Into<String>) {
        self.instructions.push(instr);
        self.comments.push(Some(comment.into()));
    }

    pub fn next_index(&self) -> usize {
        self.instructions.len()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Renders the accumulated instructions to text, one per line, with
    /// jump targets resolved to numeric indices. When `debug`, precedes
    /// lines with `# label:` comments at label points and appends any
    /// per-instruction inline comment.
    pub fn render(&self, debug: bool) -> Result<String, AssembleError> {
        let mut labels_at: HashMap<usize, Vec<&str>> = HashMap::new();
        if debug {
            for (name, &idx) in &self.labels {
                labels_at.entry(idx).or_default().push(name);
            }
            for names in labels_at.values_mut() {
                names.sort();
            }
        }

        let resolve = |label: &str| self.labels.get(label).copied();
        let mut out = String::new();

        for (idx, instr) in self.instructions.iter().enumerate() {
            if debug {
                if let Some(names) = labels_at.get(&idx) {
                    for name in names {
                        out.push_str(&format!("# {}:\n", name));
                    }
                }
            }

            out.push_str(&instr.render(resolve)?);

            if debug {
                if let Some(comment) = &self.comments[idx] {
                    out.push_str("  # ");
                    out.push_str(comment);
                }
            }
            out.push('\n');
        }

        Ok(out)
    }
}

impl Default for Assembler {
    fn default() -> Assembler {
        Assembler::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_jump_resolves_to_the_label_target_index() {
        let mut asm = Assembler::new();
        asm.emit(Instr::Jump("skip".to_string()));
        asm.emit(Instr::Get(Register::A));
        asm.place_label("skip");
        asm.emit(Instr::Halt);

        let text = asm.render(false).unwrap();
        assert_eq!(text, "JUMP 2\nGET A\nHALT\n");
    }

    #[test]
    fn unresolved_label_is_an_internal_error() {
        let mut asm = Assembler::new();
        asm.emit(Instr::Jump("nowhere".to_string()));
        assert_eq!(asm.render(false), Err(AssembleError::UnknownLabel("nowhere".to_string())));
    }

    #[test]
    fn fresh_labels_under_the_same_prefix_are_distinct() {
        let mut asm = Assembler::new();
        let a = asm.fresh_label("macro.mul.loop");
        let b = asm.fresh_label("macro.mul.loop");
        assert_ne!(a, b);
    }

    #[test]
    fn debug_rendering_includes_label_and_inline_comments() {
        let mut asm = Assembler::new();
        asm.place_label("entry");
        asm.emit_with_comment(Instr::Halt, "Halt");
        let text = asm.render(true).unwrap();
        assert_eq!(text, "# entry:\nHALT  # Halt\n");
    }
}
