//! The fuzzing overlay (spec §2.7, §4.7, §4.8).
//!
//! `Fuzz` is the user-facing configuration: a default mutator per
//! primitive type, plus per-variable overrides. `FuzzContext` is the
//! re-architected global mutation counter from spec §9's design note
//! ("re-architect as an explicit `FuzzContext` threaded through
//! specialization; never as process-wide state"): one instance is
//! created per `Symbol::specialize` call and threaded by `&mut`
//! reference down the whole recursive descent, never stored globally.

pub mod mutator;
pub mod prng;

use std::collections::HashMap;

use log::debug;

use crate::bits::BitVec;
use crate::error::MaxFuzzing;
use crate::tree::{VarId, VariableArena, VariableKind};
use crate::types::DataType;

pub use mutator::{default_naughty_strings, FuzzingMode, Mutator, MutatorKind};
pub use prng::PrngAlgorithm;
use prng::PrngPool;

/// The closed set of primitive-type keys a default mutator can target
/// (spec §6 `Fuzz.set(key, ...)`, `key = Type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Integer,
    String,
    Raw,
    HexaString,
    BitArray,
    Ipv4,
    Timestamp,
}

impl TypeTag {
    pub fn of(ty: &DataType) -> Self {
        match ty {
            DataType::Integer(_) => TypeTag::Integer,
            DataType::String(_) => TypeTag::String,
            DataType::Raw(_) => TypeTag::Raw,
            DataType::HexaString(_) => TypeTag::HexaString,
            DataType::BitArray(_) => TypeTag::BitArray,
            DataType::Ipv4(_) => TypeTag::Ipv4,
            DataType::Timestamp(_) => TypeTag::Timestamp,
        }
    }
}

/// Fuzzing configuration (spec §6 `Fuzz` entry point). `key ∈ {Type,
/// Variable, Field, Symbol}` collapses here to `Type` or `Variable`: a
/// `Field`/`Symbol` override is installed by resolving it to its root
/// `VarId` before calling `set_variable`.
#[derive(Debug, Clone, Default)]
pub struct Fuzz {
    type_mutators: HashMap<TypeTag, Mutator>,
    field_mutators: HashMap<VarId, Mutator>,
    node_mutators: HashMap<VarId, Mutator>,
    /// `global_counter_max` (spec §6 `Fuzz(counter_max=2^32)`).
    pub global_counter_max: u64,
}

impl Fuzz {
    pub fn new() -> Self {
        Self {
            type_mutators: HashMap::new(),
            field_mutators: HashMap::new(),
            node_mutators: HashMap::new(),
            global_counter_max: 1u64 << 32,
        }
    }

    pub fn with_counter_max(mut self, counter_max: u64) -> Self {
        self.global_counter_max = counter_max;
        self
    }

    pub fn set_type(&mut self, tag: TypeTag, mutator: Mutator) {
        self.type_mutators.insert(tag, mutator);
    }

    pub fn set_variable(&mut self, id: VarId, mutator: Mutator) {
        self.field_mutators.insert(id, mutator);
    }

    /// Installs a `Composite` mutator on an `Alt`/`Agg`/`Repeat` node.
    /// When the mutator's `mutate_child` is set, this immediately
    /// propagates a type-default mutator onto every descendant variable
    /// that doesn't already have its own override (spec §4.7
    /// "Propagation"), mirroring the original's `Fuzz._propagateMutation`
    /// walking `variable.children` and calling `_retrieveDefaultMutator`
    /// on each. Propagation descends at most `max_depth` levels.
    pub fn set_node(&mut self, id: VarId, mutator: Mutator, arena: &VariableArena) {
        let (propagate, max_depth) = match &mutator.kind {
            MutatorKind::Composite { mutate_child, max_depth } => (*mutate_child, *max_depth),
            _ => (false, 0),
        };
        self.node_mutators.insert(id, mutator);
        if propagate {
            for child in arena.get(id).children() {
                self.propagate_defaults(child, arena, max_depth);
            }
        }
    }

    /// Installs the type-default mutator onto `id` if it's a `Data` leaf
    /// without its own override already, then recurses into its children
    /// (if it's itself a node) until `depth_remaining` hits zero. Bounded
    /// by `depth_remaining` regardless of any cycle in `arena` (a
    /// recursive `Alt` re-entering itself still terminates here).
    fn propagate_defaults(&mut self, id: VarId, arena: &VariableArena, depth_remaining: u32) {
        if depth_remaining == 0 {
            return;
        }
        let variable = arena.get(id);
        if let VariableKind::Data { ty, .. } = &variable.kind {
            if !self.field_mutators.contains_key(&id) {
                if let Some(default) = self.type_mutators.get(&TypeTag::of(ty)).cloned() {
                    self.field_mutators.insert(id, default);
                }
            }
        }
        for child in variable.children() {
            self.propagate_defaults(child, arena, depth_remaining - 1);
        }
    }

    pub fn unset_variable(&mut self, id: VarId) {
        self.field_mutators.remove(&id);
    }

    pub fn get_variable(&self, id: VarId) -> Option<&Mutator> {
        self.field_mutators.get(&id)
    }

    fn leaf_mutator(&self, id: VarId, ty: &DataType) -> Option<&Mutator> {
        self.field_mutators.get(&id).or_else(|| self.type_mutators.get(&TypeTag::of(ty)))
    }

    fn node_mutator(&self, id: VarId) -> Option<&Mutator> {
        self.node_mutators.get(&id)
    }
}

/// The per-`specialize`-call mutation budget and PRNG state (spec §9).
/// Never a `static`/global: one is constructed per top-level
/// specialization and threaded through by mutable reference.
pub struct FuzzContext<'f> {
    config: &'f Fuzz,
    global_remaining: u64,
    local_remaining: HashMap<VarId, u64>,
    prngs: PrngPool,
}

impl<'f> FuzzContext<'f> {
    pub fn new(config: &'f Fuzz) -> Self {
        Self {
            config,
            global_remaining: config.global_counter_max,
            local_remaining: HashMap::new(),
            prngs: PrngPool::new(10),
        }
    }

    pub fn with_seed(config: &'f Fuzz, seed: u64) -> Self {
        Self {
            config,
            global_remaining: config.global_counter_max,
            local_remaining: HashMap::new(),
            prngs: PrngPool::new(seed),
        }
    }

    fn charge(&mut self, id: VarId, local_max: Option<u64>) -> Result<(), MaxFuzzing> {
        if self.global_remaining == 0 {
            debug!("fuzz: global counter exhausted");
            return Err(MaxFuzzing);
        }
        if let Some(max) = local_max {
            let remaining = self.local_remaining.entry(id).or_insert(max);
            if *remaining == 0 {
                debug!("fuzz: local counter for {:?} exhausted", id);
                return Err(MaxFuzzing);
            }
            *remaining -= 1;
        }
        self.global_remaining -= 1;
        Ok(())
    }

    /// Produces a fuzzed value for `id`'s `Data` leaf, if a mutator is
    /// configured. `Ok(None)` means "no mutator installed; use
    /// `ty.generate()`". `Err(MaxFuzzing)` means a counter is exhausted
    /// and the specializer's iterator should end cleanly (spec §7).
    pub fn produce_leaf(&mut self, id: VarId, ty: &DataType) -> Result<Option<BitVec>, MaxFuzzing> {
        let Some(mutator) = self.config.leaf_mutator(id, ty) else {
            return Ok(None);
        };
        if mutator.mode == FuzzingMode::None {
            return Ok(None);
        }
        self.charge(id, mutator.counter_max)?;
        Ok(mutator.produce_leaf(&mut self.prngs, ty))
    }

    /// Returns the `Composite` mutator installed on `id` (an `Alt`,
    /// `Agg`, or `Repeat`), if any.
    pub fn node_mutator(&self, id: VarId) -> Option<&Mutator> {
        self.config.node_mutator(id)
    }

    /// Picks a fuzzed `Alt` child index via `id`'s `Composite` mutator,
    /// if `mutate_child` is set. Consumes one unit of mutation budget.
    pub fn alt_child_index(&mut self, id: VarId, child_count: usize) -> Result<Option<usize>, MaxFuzzing> {
        let Some(mutator) = self.config.node_mutator(id) else {
            return Ok(None);
        };
        let MutatorKind::Composite { mutate_child, .. } = &mutator.kind else {
            return Ok(None);
        };
        if !mutate_child {
            return Ok(None);
        }
        self.charge(id, mutator.counter_max)?;
        let index = (self.prngs.next_u64(mutator.generator) as usize) % child_count.max(1);
        Ok(Some(index))
    }

    /// Picks a fuzzed `Repeat` count via `id`'s `Composite` mutator.
    pub fn repeat_count(&mut self, id: VarId, bounds: (usize, Option<usize>), hard_cap: usize) -> Result<Option<usize>, MaxFuzzing> {
        let Some(mutator) = self.config.node_mutator(id) else {
            return Ok(None);
        };
        if !matches!(mutator.kind, MutatorKind::Composite { .. }) {
            return Ok(None);
        }
        self.charge(id, mutator.counter_max)?;
        let (lo, hi) = bounds;
        let upper = hi.unwrap_or(hard_cap).max(lo);
        let span = (upper - lo) as u64 + 1;
        let count = lo + (self.prngs.next_u64(mutator.generator) % span) as usize;
        Ok(Some(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Endianness;
    use crate::types::{IntegerType, Sign, UnitSize};

    #[test]
    fn global_counter_exhausts_after_n_values() {
        let mut fuzz = Fuzz::new().with_counter_max(1);
        fuzz.set_type(
            TypeTag::Integer,
            Mutator::new(MutatorKind::PseudoRandomInteger { interval: (0, 255) }),
        );
        let mut ctx = FuzzContext::new(&fuzz);
        let ty = DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big));
        let id = VarId(0);

        assert!(ctx.produce_leaf(id, &ty).unwrap().is_some());
        assert!(matches!(ctx.produce_leaf(id, &ty), Err(MaxFuzzing)));
    }

    #[test]
    fn variable_override_wins_over_type_default() {
        let mut fuzz = Fuzz::new();
        fuzz.set_type(TypeTag::Integer, Mutator::fixed(BitVec::from_bytes_be(&[1])));
        let id = VarId(0);
        fuzz.set_variable(id, Mutator::fixed(BitVec::from_bytes_be(&[2])));

        let mut ctx = FuzzContext::new(&fuzz);
        let ty = DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big));
        let value = ctx.produce_leaf(id, &ty).unwrap().unwrap();
        assert_eq!(value.to_bytes_be(), vec![2]);
    }

    #[test]
    fn propagation_installs_type_defaults_on_descendants_without_overrides() {
        use crate::tree::Scope;

        let mut arena = VariableArena::new();
        let ty = DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big));
        let leaf_a = arena.alloc(
            None,
            Scope::None,
            VariableKind::Data { ty: ty.clone(), value: None },
        );
        let leaf_b = arena.alloc(
            None,
            Scope::None,
            VariableKind::Data { ty: ty.clone(), value: None },
        );
        let agg = arena.alloc(
            None,
            Scope::None,
            VariableKind::Agg {
                children: vec![leaf_a, leaf_b],
            },
        );

        let mut fuzz = Fuzz::new();
        fuzz.set_type(TypeTag::Integer, Mutator::fixed(BitVec::from_bytes_be(&[0xaa])));
        // Pre-existing explicit override: propagation must not clobber it.
        fuzz.set_variable(leaf_b, Mutator::fixed(BitVec::from_bytes_be(&[0xbb])));

        fuzz.set_node(
            agg,
            Mutator::new(MutatorKind::Composite {
                mutate_child: true,
                max_depth: 4,
            }),
            &arena,
        );

        assert_eq!(
            fuzz.get_variable(leaf_a).unwrap().fixed_value,
            Some(BitVec::from_bytes_be(&[0xaa]))
        );
        assert_eq!(
            fuzz.get_variable(leaf_b).unwrap().fixed_value,
            Some(BitVec::from_bytes_be(&[0xbb]))
        );
    }

    #[test]
    fn propagation_respects_max_depth() {
        use crate::tree::Scope;

        let mut arena = VariableArena::new();
        let ty = DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big));
        let grandchild = arena.alloc(None, Scope::None, VariableKind::Data { ty: ty.clone(), value: None });
        let child_agg = arena.alloc(
            None,
            Scope::None,
            VariableKind::Agg {
                children: vec![grandchild],
            },
        );
        let root_agg = arena.alloc(
            None,
            Scope::None,
            VariableKind::Agg {
                children: vec![child_agg],
            },
        );

        let mut fuzz = Fuzz::new();
        fuzz.set_type(TypeTag::Integer, Mutator::fixed(BitVec::from_bytes_be(&[0xaa])));
        fuzz.set_node(
            root_agg,
            Mutator::new(MutatorKind::Composite {
                mutate_child: true,
                max_depth: 1,
            }),
            &arena,
        );

        // depth 1 only reaches `child_agg`, not `grandchild`.
        assert!(fuzz.get_variable(grandchild).is_none());
    }
}
