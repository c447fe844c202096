//! Location descriptor and address table (§3, §4.5).

use crate::asm::Register;
use ir::{Operand, Symbol, SymbolTable};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Location {
    InRegister(Register),
    InMemory(u64),
}

/// Maps an operand to its currently-valid physical locations (§3).
///
/// Well-formedness (§3, §8): at any point between IR instructions, at most
/// one operand has `InRegister(r)` among its locations, for any `r != A`.
/// [`LocationDescriptor::evict_register`] is the only way to make room for a
/// new binding, and every caller that's about to add one calls it first.
#[derive(Default, Debug)]
pub struct LocationDescriptor {
    locations: HashMap<Operand, HashSet<Location>>,
}

impl LocationDescriptor {
    pub fn new() -> LocationDescriptor {
        LocationDescriptor::default()
    }

    pub fn locations_of(&self, op: &Operand) -> Option<&HashSet<Location>> {
        self.locations.get(op)
    }

    pub fn register_of(&self, op: &Operand) -> Option<Register> {
        self.locations_of(op)?.iter().find_map(|loc| match loc {
            Location::InRegister(r) => Some(*r),
            _ => None,
        })
    }

    pub fn memory_of(&self, op: &Operand) -> Option<u64> {
        self.locations_of(op)?.iter().find_map(|loc| match loc {
            Location::InMemory(a) => Some(*a),
            _ => None,
        })
    }

    /// The operand currently bound to register `r`, if any.
    pub fn owner_of(&self, r: Register) -> Option<Operand> {
        self.locations
            .iter()
            .find(|(_, locs)| locs.contains(&Location::InRegister(r)))
            .map(|(op, _)| op.clone())
    }

    pub fn add(&mut self, op: Operand, loc: Location) {
        self.locations.entry(op).or_default().insert(loc);
    }

    /// Removes `r` from whichever operand currently holds it, restoring the
    /// descriptor invariant before a new value is seized into `r`.
    pub fn evict_register(&mut self, r: Register) {
        if let Some(owner) = self.owner_of(r) {
            if let Some(set) = self.locations.get_mut(&owner) {
                set.remove(&Location::InRegister(r));
                if set.is_empty() {
                    self.locations.remove(&owner);
                }
            }
        }
    }

    /// Binds `operand` to exactly `{InRegister(r)}`, first evicting whatever
    /// previously held `r` (§4.5: `seize`).
    pub fn seize(&mut self, r: Register, operand: Operand) {
        self.evict_register(r);
        self.locations.insert(operand, [Location::InRegister(r)].into_iter().collect());
    }

    /// `resetRegistersState` (§4.5): registers don't survive a block
    /// boundary unless re-established at the next block's entry.
    pub fn clear_registers(&mut self) {
        for set in self.locations.values_mut() {
            set.retain(|loc| !matches!(loc, Location::InRegister(_)));
        }
        self.locations.retain(|_, set| !set.is_empty());
    }

    pub fn is_empty_for(&self, op: &Operand) -> bool {
        self.locations_of(op).map(HashSet::is_empty).unwrap_or(true)
    }

    /// Operands whose *only* current location is a register — candidates
    /// for `saveVariables` (§4.5), which only needs to act on values that
    /// haven't already reached memory.
    pub fn register_only_operands(&self) -> Vec<(Operand, Register)> {
        self.locations
            .iter()
            .filter_map(|(op, locs)| {
                if locs.len() == 1 {
                    if let Some(Location::InRegister(r)) = locs.iter().next() {
                        return Some((op.clone(), *r));
                    }
                }
                None
            })
            .collect()
    }
}

/// Assigns monotonically increasing addresses to operands and array bases
/// (§4.5: "Addresses are assigned on first reference via a monotonically
/// increasing offset. Scalars occupy one word; arrays occupy `size`
/// consecutive words."). A single running counter shared between scalars
/// and arrays makes the allocation injective by construction (§8: "address
/// uniqueness").
pub struct AddressTable<'a> {
    symtab: &'a SymbolTable,
    scalars: HashMap<Operand, u64>,
    arrays: HashMap<Symbol, u64>,
    next: u64,
}

impl<'a> AddressTable<'a> {
    pub fn new(symtab: &'a SymbolTable) -> AddressTable<'a> {
        AddressTable { symtab, scalars: HashMap::new(), arrays: HashMap::new(), next: 0 }
    }

    pub fn address_of(&mut self, operand: &Operand) -> u64 {
        if let Some(&a) = self.scalars.get(operand) {
            return a;
        }
        let a = self.next;
        self.next += 1;
        self.scalars.insert(operand.clone(), a);
        a
    }

    /// Base address of array `base`; reserves `size` words on first call.
    pub fn array_base(&mut self, base: Symbol) -> u64 {
        if let Some(&a) = self.arrays.get(&base) {
            return a;
        }
        let size = self.symtab.get(base).size() as u64;
        let a = self.next;
        self.next += size.max(1);
        self.arrays.insert(base, a);
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::Temp;

    #[test]
    fn seizing_a_register_evicts_its_previous_owner() {
        let mut desc = LocationDescriptor::new();
        let x = Operand::Temp(Temp(0));
        let y = Operand::Temp(Temp(1));
        desc.seize(Register::B, x.clone());
        desc.seize(Register::B, y.clone());
        assert_eq!(desc.register_of(&x), None);
        assert_eq!(desc.register_of(&y), Some(Register::B));
        assert_eq!(desc.owner_of(Register::B), Some(y));
    }

    #[test]
    fn clear_registers_drops_register_locations_but_keeps_memory_ones() {
        let mut desc = LocationDescriptor::new();
        let x = Operand::Temp(Temp(0));
        desc.add(x.clone(), Location::InRegister(Register::C));
        desc.add(x.clone(), Location::InMemory(4));
        desc.clear_registers();
        assert_eq!(desc.register_of(&x), None);
        assert_eq!(desc.memory_of(&x), Some(4));
    }

    #[test]
    fn addresses_are_injective_and_arrays_reserve_their_full_size() {
        let mut symtab = SymbolTable::new();
        let arr = symtab.declare_array("a", 0, 2);
        let mut table = AddressTable::new(&symtab);
        let x = Operand::Temp(Temp(0));
        let y = Operand::Temp(Temp(1));

        let ax = table.address_of(&x);
        let base = table.array_base(arr);
        let ay = table.address_of(&y);

        assert_eq!(ax, 0);
        assert_eq!(base, 1);
        assert_eq!(ay, 4); // base(1) + size(3)
        assert_eq!(table.array_base(arr), base); // idempotent on repeat lookup
    }
}
