//! Register allocator (§4.5, C6): the eight machine registers, backed by a
//! descriptor-based spill-and-reload policy.
//!
//! [`Allocator`] owns the location descriptor and the address table
//! (`descriptor`), the per-instruction selection set, and a reference to the
//! symbol table it reads array bounds and diagnostic names from. It is the
//! single place that hands out registers, spills them under pressure, and
//! moves values between registers and memory; the macro library
//! (`crate::macros`) and the code-gen driver (`crate::codegen`) are built on
//! top of it.

pub mod descriptor;

pub use descriptor::{AddressTable, Location, LocationDescriptor};

use crate::asm::{Assembler, Instr, Register};
use crate::cost;
use ir::{Operand, Symbol, SymbolTable};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::collections::HashSet;
use util::Diagnostics;

/// Registers the allocator may hand out for ordinary values. `A` is
/// reserved as the address register (§4.3) and never appears here.
const GENERAL: [Register; 7] =
    [Register::B, Register::C, Register::D, Register::E, Register::F, Register::G, Register::H];

pub struct Allocator<'a> {
    descriptor: LocationDescriptor,
    addresses: AddressTable<'a>,
    selected: HashSet<Register>,
    symtab: &'a SymbolTable,
}

impl<'a> Allocator<'a> {
    pub fn new(symtab: &'a SymbolTable) -> Allocator<'a> {
        Allocator {
            descriptor: LocationDescriptor::new(),
            addresses: AddressTable::new(symtab),
            selected: HashSet::new(),
            symtab,
        }
    }

    /// `clearSelection` (§4.5): called by the driver at the start of
    /// lowering each IR instruction.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn address_of(&mut self, operand: &Operand) -> u64 {
        self.addresses.address_of(operand)
    }

    pub fn array_base(&mut self, base: Symbol) -> u64 {
        self.addresses.array_base(base)
    }

    pub fn register_of(&self, operand: &Operand) -> Option<Register> {
        self.descriptor.register_of(operand)
    }

    /// `select()` (§4.5): a register outside the current selection set.
    /// Prefers an unbound register; if none is free, spills the occupied
    /// candidate with the lowest penalty.
    pub fn select(&mut self, asm: &mut Assembler) -> Register {
        if let Some(free) =
            GENERAL.iter().copied().find(|r| !self.selected.contains(r) && self.descriptor.owner_of(*r).is_none())
        {
            self.selected.insert(free);
            return free;
        }

        let candidates: Vec<Register> = GENERAL.iter().copied().filter(|r| !self.selected.contains(r)).collect();
        let mut best: Option<(Register, BigInt)> = None;
        for r in candidates {
            let penalty = self.spill_penalty(r);
            if best.as_ref().map_or(true, |(_, p)| penalty < *p) {
                best = Some((r, penalty));
            }
        }
        let victim = best.expect("register pressure exceeded within a single instruction's expansion").0;

        self.spill(asm, victim);
        self.selected.insert(victim);
        victim
    }

    /// Spill penalty (§4.5): cost of re-materializing the victim's home
    /// address plus a fixed factor, favoring registers that are cheap to
    /// reload a future reference to.
    fn spill_penalty(&mut self, r: Register) -> BigInt {
        match self.descriptor.owner_of(r) {
            Some(op) => cost::constant_cost(&BigInt::from(self.address_of(&op))) + BigInt::from(50u32),
            None => BigInt::zero(),
        }
    }

    fn spill(&mut self, asm: &mut Assembler, r: Register) {
        let owner = self.descriptor.owner_of(r).expect("select() only ever spills an occupied register");
        let addr = self.address_of(&owner);
        self.emit_constant(asm, Register::A, &BigInt::from(addr));
        asm.emit(Instr::Store(r));
        self.descriptor.add(owner.clone(), Location::InMemory(addr));
        self.descriptor.evict_register(r);
        log::debug!("regalloc: spilled {:?} (home address {}) to free a register", r, addr);
    }

    /// `seize(r, operand)` (§4.5): bind `operand` to exactly `{InRegister(r)}`
    /// after a definition lands in `r`.
    pub fn seize(&mut self, r: Register, operand: Operand) {
        self.descriptor.seize(r, operand);
    }

    /// Synthesizes the literal `v` into register `r` from zero (§4.4),
    /// picking between repeated `INC` and the binary buildup by cost.
    /// `SUB r r` is the zeroing idiom: the VM's saturating subtract yields
    /// 0 for any register subtracted from itself, regardless of its prior
    /// contents.
    pub fn emit_constant(&mut self, asm: &mut Assembler, r: Register, v: &BigInt) {
        let v = v.abs();
        asm.emit(Instr::Sub(r, r));

        let bitlen = cost::bitlen(&v);
        let popcount = cost::popcount(&v);
        let binary_cost = 5 * bitlen + popcount;

        if v <= BigInt::from(binary_cost) {
            let mut remaining = v;
            let one = BigInt::from(1u32);
            while remaining > BigInt::zero() {
                asm.emit(Instr::Inc(r));
                remaining -= &one;
            }
        } else {
            let (_, bits) = v.to_radix_be(2);
            for bit in bits {
                asm.emit(Instr::Add(r, r));
                if bit == 1 {
                    asm.emit(Instr::Inc(r));
                }
            }
        }
    }

    /// `load(operand)` (§4.5): the register currently holding `operand`,
    /// materializing it if necessary. Constants are synthesized fresh;
    /// named values already in a register are returned as-is; values with
    /// only a memory home are reloaded; values with no location at all are
    /// uninitialized (a diagnostic is raised, but a register is still
    /// handed back so lowering can proceed).
    pub fn load(&mut self, asm: &mut Assembler, diagnostics: &mut Diagnostics, operand: &Operand) -> Register {
        if let Operand::Constant(v) = operand {
            let r = self.select(asm);
            self.emit_constant(asm, r, v);
            self.descriptor.seize(r, operand.clone());
            return r;
        }

        if let Some(r) = self.descriptor.register_of(operand) {
            return r;
        }

        if let Some(addr) = self.descriptor.memory_of(operand) {
            let r = self.select(asm);
            self.emit_constant(asm, Register::A, &BigInt::from(addr));
            asm.emit(Instr::Load(r));
            self.descriptor.add(operand.clone(), Location::InRegister(r));
            return r;
        }

        self.warn_uninitialized(diagnostics, operand);
        let r = self.select(asm);
        self.descriptor.seize(r, operand.clone());
        r
    }

    fn warn_uninitialized(&self, diagnostics: &mut Diagnostics, operand: &Operand) {
        if let Operand::Name(sym) = operand {
            let entry = self.symtab.get(*sym);
            diagnostics.warning(entry.declared_at, format!("use of uninitialized variable `{}`", entry.name));
        }
    }

    /// Effective-address computation (`lea`, §4.5): writes an array
    /// element's runtime address into `A`. `offset` is loaded into a
    /// register, the array's base-minus-lower-bound delta is synthesized
    /// into a second register, and `A` is assembled from the two.
    pub fn lea(&mut self, asm: &mut Assembler, diagnostics: &mut Diagnostics, base: Symbol, offset: &Operand) {
        let r_off = self.load(asm, diagnostics, offset);
        let entry = self.symtab.get(base);
        let (lo, _hi) = entry.bounds().expect("lea is only ever called on an array base");
        let base_addr = self.array_base(base) as i64;
        let delta = base_addr - lo;

        asm.emit(Instr::Copy(Register::A, r_off));
        if delta != 0 {
            let delta_reg = self.select(asm);
            self.emit_constant(asm, delta_reg, &BigInt::from(delta.abs()));
            if delta > 0 {
                asm.emit(Instr::Add(Register::A, delta_reg));
            } else {
                asm.emit(Instr::Sub(Register::A, delta_reg));
            }
        }
    }

    /// `load(base, offset)` (§4.5): loads an array element into a fresh
    /// register via `lea`.
    pub fn load_indexed(
        &mut self,
        asm: &mut Assembler,
        diagnostics: &mut Diagnostics,
        base: Symbol,
        offset: &Operand,
    ) -> Register {
        self.lea(asm, diagnostics, base, offset);
        let r = self.select(asm);
        asm.emit(Instr::Load(r));
        r
    }

    /// `store(base, offset, value)` (§4.5): loads `value`, computes the
    /// element address, and stores.
    pub fn store_indexed(
        &mut self,
        asm: &mut Assembler,
        diagnostics: &mut Diagnostics,
        value: &Operand,
        base: Symbol,
        offset: &Operand,
    ) {
        let rv = self.load(asm, diagnostics, value);
        self.lea(asm, diagnostics, base, offset);
        asm.emit(Instr::Store(rv));
    }

    /// Writes `operand`'s current register value to its memory home,
    /// allocating that home on first reference, and records the memory
    /// location in the descriptor alongside whatever register it still
    /// occupies.
    pub fn store_to_memory(&mut self, asm: &mut Assembler, operand: &Operand) -> u64 {
        let r = self
            .descriptor
            .register_of(operand)
            .expect("store_to_memory requires operand to currently be in a register");
        let addr = self.address_of(operand);
        self.emit_constant(asm, Register::A, &BigInt::from(addr));
        asm.emit(Instr::Store(r));
        self.descriptor.add(operand.clone(), Location::InMemory(addr));
        addr
    }

    /// `saveVariables()` (§4.5): at a control-flow boundary, flush every
    /// register-only *named* variable (never a temp — temps don't survive
    /// past their defining block) that is either live-out of the block or
    /// cannot assume the next block re-establishes it from a register (the
    /// block does not dominate it, i.e. it's a merge point reachable from
    /// elsewhere). Iterates in a fixed order (by symbol id) so the emitted
    /// `STORE`s — and therefore the whole assembly listing — are
    /// deterministic (§5, §8).
    pub fn save_variables(
        &mut self,
        asm: &mut Assembler,
        live_out: &HashSet<Operand>,
        current_block_dominates_next: bool,
    ) {
        let mut candidates: Vec<(Operand, Register)> = self
            .descriptor
            .register_only_operands()
            .into_iter()
            .filter(|(op, _)| {
                op.is_named() && (live_out.contains(op) || !current_block_dominates_next)
            })
            .collect();
        candidates.sort_by_key(|(op, _)| match op {
            Operand::Name(sym) => sym.0,
            _ => unreachable!("filtered to named operands above"),
        });

        for (op, _) in candidates {
            self.store_to_memory(asm, &op);
        }
    }

    /// `resetRegistersState()` (§4.5): registers don't survive a block
    /// boundary unless re-established at the next block's entry.
    pub fn reset_registers_state(&mut self) {
        self.descriptor.clear_registers();
    }
}
