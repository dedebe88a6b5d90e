//! `protospec`: a variable-domain parser/specializer engine for
//! declaratively described binary and text message formats.
//!
//! A format is built as a tree of `Variable`s (see [`tree`]) rooted at one
//! or more [`tree::Symbol`]s. [`MessageParser`] turns a bit stream into
//! every variable assignment consistent with that tree; [`FlowParser`]
//! segments a longer stream against a set of candidate symbols;
//! [`Symbol::specialize`] runs the tree the other direction, producing
//! concrete bytes (optionally under a [`fuzz::Fuzz`] configuration).

pub mod bits;
pub mod channel;
pub mod config;
pub mod error;
pub mod fuzz;
pub mod memory;
pub mod parser;
pub mod relation;
pub mod specializer;
pub mod tree;
pub mod types;

pub use bits::{BitVec, Endianness};
pub use channel::{Channel, RawMessage};
pub use config::EngineLimits;
pub use error::{EngineError, MaxFuzzing};
pub use fuzz::{Fuzz, FuzzContext, Mutator, MutatorKind, PrngAlgorithm, TypeTag};
pub use memory::Memory;
pub use parser::{FlowSegment, ParsingPath};
pub use specializer::{SpecializeOutcome, SpecializingPath};
pub use tree::{Field, Scope, Symbol, TreeBuilder, VarId, VariableArena};
pub use types::DataType;

/// `MessageParser.parse_bitarray` (spec §6): parses `bits` against the
/// variable tree rooted at `root`, returning every consistent assignment
/// as a `ParsingPath`. `must_consume_everything=true` discards any path
/// that doesn't consume the whole input (spec §4.2).
pub struct MessageParser<'a> {
    arena: &'a VariableArena,
    limits: EngineLimits,
}

impl<'a> MessageParser<'a> {
    pub fn new(arena: &'a VariableArena) -> Self {
        Self {
            arena,
            limits: EngineLimits::default(),
        }
    }

    pub fn with_limits(arena: &'a VariableArena, limits: EngineLimits) -> Self {
        Self { arena, limits }
    }

    pub fn parse_bitarray(
        &self,
        root: VarId,
        bits: BitVec,
        memory: Memory,
        must_consume_everything: bool,
    ) -> Result<Vec<ParsingPath>, EngineError> {
        parser::parse(self.arena, root, bits, memory, must_consume_everything, &self.limits)
    }
}

/// `FlowParser.parse_flow` (spec §6, §4.6): recovers every possible
/// segmentation of `bits` against `symbols`, trying each candidate symbol
/// at the front of the remaining stream and recursing on what's left.
pub struct FlowParser<'a> {
    arena: &'a VariableArena,
    limits: EngineLimits,
}

impl<'a> FlowParser<'a> {
    pub fn new(arena: &'a VariableArena) -> Self {
        Self {
            arena,
            limits: EngineLimits::default(),
        }
    }

    pub fn with_limits(arena: &'a VariableArena, limits: EngineLimits) -> Self {
        Self { arena, limits }
    }

    pub fn parse_flow<'s>(
        &self,
        symbols: &'s [Symbol],
        bits: BitVec,
        memory: &Memory,
    ) -> Result<Vec<Vec<FlowSegment<'s>>>, EngineError> {
        parser::parse_flow(self.arena, symbols, bits, memory, &self.limits)
    }
}

impl Symbol {
    /// `Symbol.specialize` (spec §6): produces one concrete assignment of
    /// this symbol's root variable, optionally perturbed by `fuzz`.
    /// Returns `SpecializeOutcome::FuzzExhausted` (not an `Err`) once a
    /// fuzz counter in `fuzz` runs out (spec §7).
    pub fn specialize(
        &self,
        arena: &VariableArena,
        memory: Memory,
        fuzz: Option<&mut FuzzContext>,
        limits: &EngineLimits,
    ) -> Result<SpecializeOutcome, EngineError> {
        specializer::specialize(arena, self.root(), memory, fuzz, limits)
    }
}
