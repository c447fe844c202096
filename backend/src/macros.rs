//! Macro library (§4.4, C5): multi-instruction expansions for comparisons,
//! long multiplication/division/remainder, and the small peephole-friendly
//! idioms (`inc`/`dec`/`add`/`sub` destructive and non-destructive, doubling,
//! halving, `rem2`). Every macro obtains its registers through
//! [`Allocator`](crate::regalloc::Allocator) and therefore participates in
//! the same spill-and-reload policy as ordinary code-gen.

use crate::asm::{Assembler, Instr, Register};
use crate::regalloc::Allocator;
use ir::Operand;
use util::Diagnostics;

pub fn get(alloc: &mut Allocator, asm: &mut Assembler) -> Register {
    let r = alloc.select(asm);
    asm.emit(Instr::Get(r));
    r
}

pub fn put(alloc: &mut Allocator, asm: &mut Assembler, diagnostics: &mut Diagnostics, operand: &Operand) {
    let r = alloc.load(asm, diagnostics, operand);
    asm.emit(Instr::Put(r));
}

/// Loads `operand` and copies it into a fresh register, leaving the
/// original binding untouched.
pub fn copy(alloc: &mut Allocator, asm: &mut Assembler, diagnostics: &mut Diagnostics, operand: &Operand) -> Register {
    let src = alloc.load(asm, diagnostics, operand);
    let dst = alloc.select(asm);
    asm.emit(Instr::Copy(dst, src));
    dst
}

pub fn inc(alloc: &mut Allocator, asm: &mut Assembler, diagnostics: &mut Diagnostics, operand: &Operand) -> Register {
    let r = copy(alloc, asm, diagnostics, operand);
    asm.emit(Instr::Inc(r));
    r
}

pub fn dec(alloc: &mut Allocator, asm: &mut Assembler, diagnostics: &mut Diagnostics, operand: &Operand) -> Register {
    let r = copy(alloc, asm, diagnostics, operand);
    asm.emit(Instr::Dec(r));
    r
}

pub fn inc_destructive(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    operand: &Operand,
) -> Register {
    let r = alloc.load(asm, diagnostics, operand);
    asm.emit(Instr::Inc(r));
    r
}

pub fn dec_destructive(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    operand: &Operand,
) -> Register {
    let r = alloc.load(asm, diagnostics, operand);
    asm.emit(Instr::Dec(r));
    r
}

pub fn add(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
) -> Register {
    let rl = alloc.load(asm, diagnostics, l);
    let rr = alloc.load(asm, diagnostics, r);
    let dst = alloc.select(asm);
    asm.emit(Instr::Copy(dst, rl));
    asm.emit(Instr::Add(dst, rr));
    dst
}

pub fn sub(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
) -> Register {
    let rl = alloc.load(asm, diagnostics, l);
    let rr = alloc.load(asm, diagnostics, r);
    let dst = alloc.select(asm);
    asm.emit(Instr::Copy(dst, rl));
    asm.emit(Instr::Sub(dst, rr));
    dst
}

pub fn add_destructive(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
) -> Register {
    let rl = alloc.load(asm, diagnostics, l);
    let rr = alloc.load(asm, diagnostics, r);
    asm.emit(Instr::Add(rl, rr));
    rl
}

pub fn sub_destructive(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
) -> Register {
    let rl = alloc.load(asm, diagnostics, l);
    let rr = alloc.load(asm, diagnostics, r);
    asm.emit(Instr::Sub(rl, rr));
    rl
}

pub fn twice_destructive(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    operand: &Operand,
) -> Register {
    let r = alloc.load(asm, diagnostics, operand);
    asm.emit(Instr::Add(r, r));
    r
}

pub fn half_destructive(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    operand: &Operand,
) -> Register {
    let r = alloc.load(asm, diagnostics, operand);
    asm.emit(Instr::Half(r));
    r
}

/// `operand mod 2`, without disturbing `operand`'s own register: `rl mod 2
/// = rl - 2*(rl/2)`.
pub fn rem2(alloc: &mut Allocator, asm: &mut Assembler, diagnostics: &mut Diagnostics, operand: &Operand) -> Register {
    let rl = alloc.load(asm, diagnostics, operand);
    let halved = alloc.select(asm);
    asm.emit(Instr::Copy(halved, rl));
    asm.emit(Instr::Half(halved));
    asm.emit(Instr::Add(halved, halved));

    let result = alloc.select(asm);
    asm.emit(Instr::Copy(result, rl));
    asm.emit(Instr::Sub(result, halved));
    result
}

/// `c <- l; c <- max(0, c-r)` then returns `c` (not yet compared to zero) —
/// the shared building block for every comparison jump below.
fn saturating_diff(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
) -> Register {
    let rl = alloc.load(asm, diagnostics, l);
    let rr = alloc.load(asm, diagnostics, r);
    let c = alloc.select(asm);
    asm.emit(Instr::Copy(c, rl));
    asm.emit(Instr::Sub(c, rr));
    c
}

/// `l <= r`, via `saturating_diff(l, r)` and a direct `JZERO` — the literal
/// idiom from §4.4.
pub fn jump_le(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
    label: impl Into<String>,
) {
    let c = saturating_diff(alloc, asm, diagnostics, l, r);
    asm.emit(Instr::Jzero(c, label.into()));
}

pub fn jump_ge(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
    label: impl Into<String>,
) {
    jump_le(alloc, asm, diagnostics, r, l, label);
}

/// Jumps to `label` unconditionally unless `reg` reads zero.
fn jump_if_nonzero(alloc: &mut Allocator, asm: &mut Assembler, reg: Register, label: impl Into<String>) {
    let _ = alloc;
    let skip = asm.fresh_label("macro.cmp.nz_skip");
    asm.emit(Instr::Jzero(reg, skip.clone()));
    asm.emit(Instr::Jump(label.into()));
    asm.place_label(skip);
}

pub fn jump_lt(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
    label: impl Into<String>,
) {
    let c = saturating_diff(alloc, asm, diagnostics, r, l);
    jump_if_nonzero(alloc, asm, c, label);
}

pub fn jump_gt(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
    label: impl Into<String>,
) {
    jump_lt(alloc, asm, diagnostics, r, l, label);
}

pub fn jump_eq(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
    label: impl Into<String>,
) {
    let label = label.into();
    let d1 = saturating_diff(alloc, asm, diagnostics, l, r);
    let cont = asm.fresh_label("macro.eq.cont");
    let skip = asm.fresh_label("macro.eq.skip");
    asm.emit(Instr::Jzero(d1, cont.clone()));
    asm.emit(Instr::Jump(skip.clone()));
    asm.place_label(cont);
    let d2 = saturating_diff(alloc, asm, diagnostics, r, l);
    asm.emit(Instr::Jzero(d2, label));
    asm.place_label(skip);
}

pub fn jump_ne(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
    label: impl Into<String>,
) {
    let label = label.into();
    let d1 = saturating_diff(alloc, asm, diagnostics, l, r);
    jump_if_nonzero(alloc, asm, d1, label.clone());
    let d2 = saturating_diff(alloc, asm, diagnostics, r, l);
    jump_if_nonzero(alloc, asm, d2, label);
}

/// Direct `JZERO` for a comparison against literal zero.
pub fn jzero(alloc: &mut Allocator, asm: &mut Assembler, diagnostics: &mut Diagnostics, operand: &Operand, label: impl Into<String>) {
    let r = alloc.load(asm, diagnostics, operand);
    asm.emit(Instr::Jzero(r, label.into()));
}

/// Long multiplication (§4.4): double-and-add over the bits of `r`, read
/// via `HALF`/`JODD` on a disposable working copy.
pub fn long_mul(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
) -> Register {
    let l_src = alloc.load(asm, diagnostics, l);
    let base = alloc.select(asm);
    asm.emit(Instr::Copy(base, l_src));

    let r_src = alloc.load(asm, diagnostics, r);
    let mult = alloc.select(asm);
    asm.emit(Instr::Copy(mult, r_src));

    let result = alloc.select(asm);
    asm.emit(Instr::Sub(result, result));

    let loop_label = asm.fresh_label("macro.mul.loop");
    let odd_label = asm.fresh_label("macro.mul.odd");
    let cont_label = asm.fresh_label("macro.mul.cont");
    let end_label = asm.fresh_label("macro.mul.end");

    asm.place_label(loop_label.clone());
    asm.emit(Instr::Jzero(mult, end_label.clone()));
    asm.emit(Instr::Jodd(mult, odd_label.clone()));
    asm.emit(Instr::Jump(cont_label.clone()));
    asm.place_label(odd_label);
    asm.emit(Instr::Add(result, base));
    asm.place_label(cont_label);
    asm.emit(Instr::Add(base, base));
    asm.emit(Instr::Half(mult));
    asm.emit(Instr::Jump(loop_label));
    asm.place_label(end_label);

    result
}

/// Shared body of `longDiv`/`longRem` (§4.4): doubles the divisor until it
/// would exceed the dividend, then walks back down, restoring at each
/// level. Division and remainder by zero both yield zero (§6).
fn long_div_rem(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
) -> (Register, Register) {
    let dividend = alloc.load(asm, diagnostics, l);
    let divisor = alloc.load(asm, diagnostics, r);

    let quotient = alloc.select(asm);
    asm.emit(Instr::Sub(quotient, quotient));
    let remainder = alloc.select(asm);
    asm.emit(Instr::Copy(remainder, dividend));

    let zero_label = asm.fresh_label("macro.div.zero");
    let nonzero_label = asm.fresh_label("macro.div.nonzero");
    let end_label = asm.fresh_label("macro.div.end");

    asm.emit(Instr::Jzero(divisor, zero_label.clone()));
    asm.emit(Instr::Jump(nonzero_label.clone()));
    asm.place_label(zero_label);
    asm.emit(Instr::Sub(remainder, remainder));
    asm.emit(Instr::Jump(end_label.clone()));
    asm.place_label(nonzero_label);

    let shifted = alloc.select(asm);
    asm.emit(Instr::Copy(shifted, divisor));
    let doubled = alloc.select(asm);

    let grow_loop = asm.fresh_label("macro.div.grow");
    let grow_commit = asm.fresh_label("macro.div.growcommit");
    let grow_done = asm.fresh_label("macro.div.growdone");
    asm.place_label(grow_loop.clone());
    asm.emit(Instr::Copy(doubled, shifted));
    asm.emit(Instr::Add(doubled, doubled));
    // Commit the doubling only while it still does not exceed the
    // remaining dividend; otherwise `shifted` holds the highest valid
    // power-of-two multiple of the divisor.
    let diff = alloc.select(asm);
    asm.emit(Instr::Copy(diff, doubled));
    asm.emit(Instr::Sub(diff, remainder));
    asm.emit(Instr::Jzero(diff, grow_commit.clone()));
    asm.emit(Instr::Jump(grow_done.clone()));
    asm.place_label(grow_commit);
    asm.emit(Instr::Copy(shifted, doubled));
    asm.emit(Instr::Jump(grow_loop));
    asm.place_label(grow_done);

    let sub_loop = asm.fresh_label("macro.div.sub");
    let do_subtract = asm.fresh_label("macro.div.subtract");
    let after_subtract = asm.fresh_label("macro.div.aftersubtract");
    let sub_done = asm.fresh_label("macro.div.subdone");
    asm.place_label(sub_loop.clone());
    asm.emit(Instr::Add(quotient, quotient));
    asm.emit(Instr::Copy(diff, shifted));
    asm.emit(Instr::Sub(diff, remainder));
    asm.emit(Instr::Jzero(diff, do_subtract.clone()));
    asm.emit(Instr::Jump(after_subtract.clone()));
    asm.place_label(do_subtract);
    asm.emit(Instr::Sub(remainder, shifted));
    asm.emit(Instr::Inc(quotient));
    asm.place_label(after_subtract);

    asm.emit(Instr::Copy(diff, shifted));
    asm.emit(Instr::Sub(diff, divisor));
    let below = asm.fresh_label("macro.div.below");
    asm.emit(Instr::Copy(doubled, divisor));
    asm.emit(Instr::Sub(doubled, shifted));
    asm.emit(Instr::Jzero(diff, below));
    asm.emit(Instr::Half(shifted));
    asm.emit(Instr::Jump(sub_loop));
    asm.place_label(below);
    asm.emit(Instr::Jzero(doubled, sub_done.clone()));
    asm.emit(Instr::Half(shifted));
    asm.emit(Instr::Jump(sub_loop));
    asm.place_label(sub_done);

    asm.place_label(end_label);
    (quotient, remainder)
}

pub fn long_div(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
) -> Register {
    long_div_rem(alloc, asm, diagnostics, l, r).0
}

pub fn long_rem(
    alloc: &mut Allocator,
    asm: &mut Assembler,
    diagnostics: &mut Diagnostics,
    l: &Operand,
    r: &Operand,
) -> Register {
    long_div_rem(alloc, asm, diagnostics, l, r).1
}
