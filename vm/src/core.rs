//! The interpreter itself (§4.3, §6): eight `BigInt` registers, a growable
//! word-addressable memory of `BigInt` cells, and a tick loop over a
//! [`Program`](crate::parse::Program) of [`ResolvedInstr`](crate::parse::ResolvedInstr)s.

use std::io::{self, BufRead, Write as IoWrite};
use std::ops::{Index, IndexMut};

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::parse::{Program, Register, ResolvedInstr};

pub enum TickResult {
    Running,
    Exit(ExitCode),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ExitCode {
    Halted,
    /// Ran off the end of the program without a `HALT` (§4.3: programs are
    /// expected to `HALT` explicitly; falling off the end is a bug in the
    /// emitting pass, not a runtime fault, so it is reported rather than
    /// silently treated as `HALT`).
    RanOffEnd,
}

/// Word-addressable memory, growing on demand (§3: "memory is an unbounded
/// array of arbitrary-precision integer cells, initially all zero").
struct Memory {
    cells: Vec<BigInt>,
}

impl Memory {
    fn new() -> Memory {
        Memory { cells: Vec::new() }
    }

    fn ensure(&mut self, addr: usize) {
        if addr >= self.cells.len() {
            self.cells.resize(addr + 1, BigInt::zero());
        }
    }

    fn read(&self, addr: usize) -> BigInt {
        self.cells.get(addr).cloned().unwrap_or_else(BigInt::zero)
    }

    fn write(&mut self, addr: usize, value: BigInt) {
        self.ensure(addr);
        self.cells[addr] = value;
    }
}

struct Registers([BigInt; 8]);

impl Registers {
    fn new() -> Registers {
        Registers([
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
            BigInt::zero(),
        ])
    }
}

impl Index<Register> for Registers {
    type Output = BigInt;
    fn index(&self, r: Register) -> &BigInt {
        &self.0[r.index()]
    }
}

impl IndexMut<Register> for Registers {
    fn index_mut(&mut self, r: Register) -> &mut BigInt {
        &mut self.0[r.index()]
    }
}

/// An interpreter for one loaded [`Program`]. `R`/`W` let tests inject
/// canned input and capture output instead of talking to real stdio.
pub struct Vm<R, W> {
    registers: Registers,
    memory: Memory,
    program: Program,
    program_counter: usize,
    input: R,
    output: W,
}

impl<R: BufRead, W: IoWrite> Vm<R, W> {
    pub fn new(program: Program, input: R, output: W) -> Vm<R, W> {
        Vm { registers: Registers::new(), memory: Memory::new(), program, program_counter: 0, input, output }
    }

    pub fn register(&self, r: Register) -> &BigInt {
        &self.registers[r]
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Executes one instruction and advances (or redirects) the program
    /// counter.
    pub fn tick(&mut self) -> TickResult {
        let instr = match self.program.instructions.get(self.program_counter) {
            Some(instr) => instr.clone(),
            None => return TickResult::Exit(ExitCode::RanOffEnd),
        };

        let mut next = self.program_counter + 1;

        match instr {
            ResolvedInstr::Get(r) => self.registers[r] = self.read_input(),
            ResolvedInstr::Put(r) => self.write_output(&self.registers[r].clone()),
            ResolvedInstr::Load(r) => {
                let addr = self.address_of(Register::A);
                self.registers[r] = self.memory.read(addr);
            }
            ResolvedInstr::Store(r) => {
                let addr = self.address_of(Register::A);
                self.memory.write(addr, self.registers[r].clone());
            }
            ResolvedInstr::Copy(r, s) => self.registers[r] = self.registers[s].clone(),
            ResolvedInstr::Add(r, s) => self.registers[r] = &self.registers[r] + &self.registers[s],
            ResolvedInstr::Sub(r, s) => {
                // §4.3: subtraction saturates at zero, it never goes negative.
                self.registers[r] = saturating_sub(&self.registers[r], &self.registers[s]);
            }
            ResolvedInstr::Half(r) => {
                let two = BigInt::from(2);
                self.registers[r] = &self.registers[r] / &two;
            }
            ResolvedInstr::Inc(r) => {
                let one = BigInt::from(1);
                self.registers[r] = &self.registers[r] + &one;
            }
            ResolvedInstr::Dec(r) => {
                let one = BigInt::from(1);
                self.registers[r] = saturating_sub(&self.registers[r], &one);
            }
            ResolvedInstr::Jump(target) => next = target,
            ResolvedInstr::Jzero(r, target) => {
                if self.registers[r].is_zero() {
                    next = target;
                }
            }
            ResolvedInstr::Jodd(r, target) => {
                let two = BigInt::from(2);
                if &self.registers[r] % &two == BigInt::from(1) {
                    next = target;
                }
            }
            ResolvedInstr::Halt => return TickResult::Exit(ExitCode::Halted),
        }

        self.program_counter = next;
        TickResult::Running
    }

    /// Runs until `HALT` or the program runs off its own end.
    pub fn run(&mut self) -> ExitCode {
        loop {
            match self.tick() {
                TickResult::Running => continue,
                TickResult::Exit(code) => return code,
            }
        }
    }

    fn address_of(&self, r: Register) -> usize {
        // Negative or oversized addresses can't arise from generated code;
        // memory simply treats them as zero rather than panicking.
        self.registers[r].to_usize().unwrap_or(0)
    }

    fn read_input(&mut self) -> BigInt {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => BigInt::zero(),
            Ok(_) => line.trim().parse().unwrap_or_else(|_| BigInt::zero()),
        }
    }

    fn write_output(&mut self, value: &BigInt) {
        let _ = writeln!(self.output, "{}", value);
    }
}

fn saturating_sub(a: &BigInt, b: &BigInt) -> BigInt {
    if a < b {
        BigInt::zero()
    } else {
        a - b
    }
}

pub fn stdio_vm(program: Program) -> Vm<io::BufReader<io::Stdin>, io::Stdout> {
    Vm::new(program, io::BufReader::new(io::stdin()), io::stdout())
}
