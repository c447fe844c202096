//! Parses the text assembly format emitted by `backend::asm::Assembler`
//! (§6: "one assembly instruction per line, instructions resolved to
//! numeric targets") into a runnable [`Program`].

use std::fmt;
use util::{EnumFromStr, Mnemonic, ParseEnumError};
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
    pub const ALL: [Register; 8] =
        [Register::A, Register::B, Register::C, Register::D, Register::E, Register::F, Register::G, Register::H];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One instruction with jump targets already resolved to instruction
/// indices, as they appear in a rendered (non-`--debug`) program.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ResolvedInstr {
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
    Jump(usize),
    Jzero(Register, usize),
    Jodd(Register, usize),
    Halt,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Program {
    pub instructions: Vec<ResolvedInstr>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ParseError {
    UnknownOpcode(String),
    BadRegister(String),
    BadTarget(String),
    MissingOperand { opcode: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnknownOpcode(op) => write!(f, "unknown opcode \"{}\"", op),
            ParseError::BadRegister(r) => write!(f, "not a register: \"{}\"", r),
            ParseError::BadTarget(t) => write!(f, "not a jump target: \"{}\"", t),
            ParseError::MissingOperand { opcode } => write!(f, "{} is missing an operand", opcode),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseEnumError> for ParseError {
    fn from(e: ParseEnumError) -> ParseError {
        ParseError::BadRegister(e.value)
    }
}

fn register(tok: Option<&str>, opcode: &str) -> Result<Register, ParseError> {
    let tok = tok.ok_or_else(|| ParseError::MissingOperand { opcode: opcode.to_string() })?;
    Ok(Register::from_str(tok)?)
}

fn target(tok: Option<&str>, opcode: &str) -> Result<usize, ParseError> {
    let tok = tok.ok_or_else(|| ParseError::MissingOperand { opcode: opcode.to_string() })?;
    tok.parse().map_err(|_| ParseError::BadTarget(tok.to_string()))
}

/// Parses one rendered program. Lines beginning with `#` (`--debug` label
/// comments) are skipped; a trailing ` # ...` inline comment on an
/// instruction line is ignored.
pub fn parse(text: &str) -> Result<Program, ParseError> {
    let mut instructions = Vec::new();

    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let opcode = tokens.next().unwrap();

        let instr = match opcode {
            "GET" => ResolvedInstr::Get(register(tokens.next(), opcode)?),
            "PUT" => ResolvedInstr::Put(register(tokens.next(), opcode)?),
            "LOAD" => ResolvedInstr::Load(register(tokens.next(), opcode)?),
            "STORE" => ResolvedInstr::Store(register(tokens.next(), opcode)?),
            "COPY" => ResolvedInstr::Copy(register(tokens.next(), opcode)?, register(tokens.next(), opcode)?),
            "ADD" => ResolvedInstr::Add(register(tokens.next(), opcode)?, register(tokens.next(), opcode)?),
            "SUB" => ResolvedInstr::Sub(register(tokens.next(), opcode)?, register(tokens.next(), opcode)?),
            "HALF" => ResolvedInstr::Half(register(tokens.next(), opcode)?),
            "INC" => ResolvedInstr::Inc(register(tokens.next(), opcode)?),
            "DEC" => ResolvedInstr::Dec(register(tokens.next(), opcode)?),
            "JUMP" => ResolvedInstr::Jump(target(tokens.next(), opcode)?),
            "JZERO" => ResolvedInstr::Jzero(register(tokens.next(), opcode)?, target(tokens.next(), opcode)?),
            "JODD" => ResolvedInstr::Jodd(register(tokens.next(), opcode)?, target(tokens.next(), opcode)?),
            "HALT" => ResolvedInstr::Halt,
            other => return Err(ParseError::UnknownOpcode(other.to_string())),
        };

        instructions.push(instr);
    }

    Ok(Program { instructions })
}
