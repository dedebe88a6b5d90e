//! Recursive-descent parsing over the variable tree (spec §4.2).
//!
//! `parse` enumerates every valid assignment of the input bit-stream to
//! the tree's variables as a set of `ParsingPath`s. A *lazy* sequence
//! (spec §2 item 5, §9 design note: "use an explicit iterator abstraction
//! that owns the branch stack") was considered; this implementation
//! instead enumerates eagerly into a `Vec`. Branching is already bounded by
//! `EngineLimits` (max `Alt` depth, max `Repeat` count, a hard cap
//! substituted for unbounded `Data` domains), so the living set of paths
//! at any one recursion is the same bounded quantity a lazy walk would
//! visit one at a time — eager collection trades a constant-factor
//! memory cost for a recursive-descent structure that doesn't need a
//! hand-rolled stack-owning iterator to get right. Ordering (declaration
//! order for `Alt`, ascending for `Repeat` counts and accepted lengths)
//! is preserved exactly as specified.

pub mod flow;

use std::collections::HashMap;

use log::trace;

use crate::bits::BitVec;
use crate::config::EngineLimits;
use crate::error::EngineError;
use crate::memory::Memory;
use crate::relation;
use crate::tree::{RelationKind, Scope, VarId, VariableArena, VariableKind};
use crate::types::{DataType, TypeOps};

pub use flow::{parse_flow, FlowSegment};

/// A relation leaf whose targets were not all bound at the time its
/// slice was consumed. Drained after every subsequent assignment (spec
/// §4.4 resolution algorithm, §9: "model as a queue of `Pending{...}`
/// drained on every assignment").
#[derive(Debug, Clone)]
struct PendingRelation {
    relation_id: VarId,
    targets: Vec<VarId>,
    kind: RelationKind,
    encoding_type: DataType,
    factor: f64,
    offset: i64,
    modulo: Option<u64>,
    observed: BitVec,
}

/// A branch of the non-deterministic parser, carrying partial
/// assignments and a cursor (spec §3 `ParsingPath`).
#[derive(Debug, Clone)]
pub struct ParsingPath {
    pub cursor: BitVec,
    pub assignments: HashMap<VarId, BitVec>,
    pub memory: Memory,
    pending: Vec<PendingRelation>,
    alt_depth: HashMap<VarId, u32>,
}

impl ParsingPath {
    fn new(cursor: BitVec, memory: Memory) -> Self {
        Self {
            cursor,
            assignments: HashMap::new(),
            memory,
            pending: Vec::new(),
            alt_depth: HashMap::new(),
        }
    }

    /// Concatenates the assignments of `ids` in order (spec §4.4:
    /// "the concatenated encoded form of targets").
    fn concat_of(&self, ids: &[VarId]) -> Option<BitVec> {
        let mut parts = Vec::with_capacity(ids.len());
        for id in ids {
            parts.push(self.assignments.get(id)?.clone());
        }
        Some(BitVec::concat(&parts))
    }

    /// Drains every pending relation whose targets are now fully bound,
    /// validating each against its originally observed slice. Returns
    /// `Err` (branch failure) on the first mismatch.
    fn drain_pending(&mut self) -> Result<(), EngineError> {
        let taken = std::mem::take(&mut self.pending);
        let mut remaining = Vec::with_capacity(taken.len());
        for pending in taken {
            match self.concat_of(&pending.targets) {
                Some(concat) => {
                    let expected = relation::resolve(
                        pending.kind,
                        &pending.encoding_type,
                        pending.factor,
                        pending.offset,
                        pending.modulo,
                        &concat,
                    )?;
                    if expected.as_bools() != pending.observed.as_bools() {
                        return Err(EngineError::InvalidParsingPath);
                    }
                }
                None => remaining.push(pending),
            }
        }
        self.pending = remaining;
        Ok(())
    }

    /// Called once the whole tree has been walked: any relation still
    /// pending never had its targets bound (spec §4.4 step 3).
    fn finish(self) -> Result<Self, EngineError> {
        if let Some(p) = self.pending.first() {
            return Err(EngineError::UnresolvedRelation {
                relation: format!("{:?}", p.relation_id),
            });
        }
        Ok(self)
    }
}

/// Entry point: `MessageParser.parse_bitarray` (spec §6).
///
/// `must_consume_everything`: when `true` (the default for a top-level
/// message parse), paths that leave unconsumed input are rejected.
/// `FlowParser` calls this with `false` (spec §4.6).
pub fn parse(
    arena: &VariableArena,
    root: VarId,
    bits: BitVec,
    memory: Memory,
    must_consume_everything: bool,
    limits: &EngineLimits,
) -> Result<Vec<ParsingPath>, EngineError> {
    let path = ParsingPath::new(bits, memory);
    let mut paths = walk(arena, root, path, true, limits)?;

    let mut finished = Vec::with_capacity(paths.len());
    for p in paths.drain(..) {
        let p = p.finish()?;
        if must_consume_everything && !p.cursor.is_empty() {
            continue;
        }
        finished.push(p);
    }
    Ok(finished)
}

/// Recursively walks `id`, returning every successor path. An empty
/// `Vec` is a silent, branch-local failure (spec §7 `ParseMiss`); a
/// returned `Err` is an iterator-terminating failure.
fn walk(
    arena: &VariableArena,
    id: VarId,
    path: ParsingPath,
    carnivorous: bool,
    limits: &EngineLimits,
) -> Result<Vec<ParsingPath>, EngineError> {
    let var = arena.get(id);
    match &var.kind {
        VariableKind::Data { ty, value } => walk_data(id, var.scope, ty, value.as_ref(), path, carnivorous, limits),
        VariableKind::Relation {
            targets,
            kind,
            encoding_type,
            factor,
            offset,
            modulo,
        } => walk_relation(id, targets, *kind, encoding_type, *factor, *offset, *modulo, path),
        VariableKind::Alt { children, callback } => {
            walk_alt(arena, id, children, callback.as_ref(), path, carnivorous, limits)
        }
        VariableKind::Agg { children } => walk_agg(arena, children, path, carnivorous, limits),
        VariableKind::Repeat {
            child,
            bounds,
            delimiter,
        } => walk_repeat(arena, *child, *bounds, delimiter.as_ref(), path, limits),
    }
}

fn walk_data(
    id: VarId,
    scope: Scope,
    ty: &DataType,
    fixed: Option<&BitVec>,
    path: ParsingPath,
    carnivorous: bool,
    limits: &EngineLimits,
) -> Result<Vec<ParsingPath>, EngineError> {
    // CONSTANT: valueCMP against the pre-set bits (spec §3 Scope table).
    if scope == Scope::Constant {
        let value = fixed.expect("Constant-scoped Data leaf always carries a preset value");
        return Ok(value_cmp(id, value, path));
    }

    // SESSION/MESSAGE already bound: valueCMP against the memorized value.
    if (scope == Scope::Session || scope == Scope::Message) && path.memory.contains(id) {
        let value = path.memory.get(id).expect("just checked contains").clone();
        return Ok(value_cmp(id, &value, path));
    }

    // Otherwise: domainCMP, learning into memory for MESSAGE/SESSION.
    let (min, max) = ty.size();
    let remaining = path.cursor.len();
    if remaining < min {
        return Ok(Vec::new());
    }

    // Carnivorous mode (spec §4.2): the last field of a top-level parse
    // may consume all remaining input even when the leaf's declared `max`
    // is smaller. Try that single length first; if the type rejects it
    // (e.g. a fixed-size type shorter than what's left), fall back to the
    // ordinary ascending enumeration.
    let mut accepted = Vec::new();
    if carnivorous && remaining >= min && ty.can_parse(&path.cursor.slice(0, remaining)) {
        accepted.push(remaining);
    } else {
        accepted.extend(candidate_lengths(min, max, remaining, limits));
    }

    let mut out = Vec::new();
    for len in accepted {
        let slice = path.cursor.slice(0, len);
        if !ty.can_parse(&slice) {
            continue;
        }
        let mut branch = path.clone();
        branch.cursor = branch.cursor.slice(len, branch.cursor.len());
        branch.assignments.insert(id, slice.clone());
        if scope == Scope::Message || scope == Scope::Session {
            branch.memory.record(id, scope, slice);
        }
        if branch.drain_pending().is_ok() {
            out.push(branch);
        }
    }
    Ok(out)
}

/// Ascending candidate lengths in `[min, min(max, remaining)]`, with
/// `max = None` capped at `limits.max_unbounded_domain_bits`.
fn candidate_lengths(min: usize, max: Option<usize>, remaining: usize, limits: &EngineLimits) -> Vec<usize> {
    let upper = max.unwrap_or(limits.max_unbounded_domain_bits).min(remaining);
    if upper < min {
        return Vec::new();
    }
    (min..=upper).collect()
}

fn value_cmp(id: VarId, value: &BitVec, mut path: ParsingPath) -> Vec<ParsingPath> {
    let len = value.len();
    if path.cursor.len() < len {
        return Vec::new();
    }
    let slice = path.cursor.slice(0, len);
    if slice.as_bools() != value.as_bools() {
        return Vec::new();
    }
    path.cursor = path.cursor.slice(len, path.cursor.len());
    path.assignments.insert(id, value.clone());
    match path.drain_pending() {
        Ok(()) => vec![path],
        Err(_) => Vec::new(),
    }
}

#[allow(clippy::too_many_arguments)]
fn walk_relation(
    id: VarId,
    targets: &[VarId],
    kind: RelationKind,
    encoding_type: &DataType,
    factor: f64,
    offset: i64,
    modulo: Option<u64>,
    mut path: ParsingPath,
) -> Result<Vec<ParsingPath>, EngineError> {
    // Padding's on-wire length isn't a property of `encoding_type` (it's
    // typically an unbounded BitArray): it's however many bits reach the
    // next `modulo` boundary given the targets' own encoded length. That
    // means its targets must already be bound — a forward-referenced
    // Padding can't be sized, so it's treated as unparseable here rather
    // than queued as a pending relation.
    if kind == RelationKind::Padding {
        let Some(concat) = path.concat_of(targets) else {
            trace!("Padding relation {:?} has unbound targets; cannot be sized", id);
            return Ok(Vec::new());
        };
        let expected = relation::resolve(kind, encoding_type, factor, offset, modulo, &concat)?;
        let len = expected.len();
        if path.cursor.len() < len {
            return Ok(Vec::new());
        }
        let slice = path.cursor.slice(0, len);
        if slice.as_bools() != expected.as_bools() {
            return Ok(Vec::new());
        }
        path.cursor = path.cursor.slice(len, path.cursor.len());
        path.assignments.insert(id, slice);
        return match path.drain_pending() {
            Ok(()) => Ok(vec![path]),
            Err(_) => Ok(Vec::new()),
        };
    }

    let (min, max) = encoding_type.size();
    let len = max.unwrap_or(min);
    if path.cursor.len() < len {
        return Ok(Vec::new());
    }
    let slice = path.cursor.slice(0, len);
    path.cursor = path.cursor.slice(len, path.cursor.len());
    path.assignments.insert(id, slice.clone());

    match path.concat_of(targets) {
        Some(concat) => {
            let expected = relation::resolve(kind, encoding_type, factor, offset, modulo, &concat)?;
            if expected.as_bools() != slice.as_bools() {
                return Ok(Vec::new());
            }
        }
        None => {
            trace!("relation {:?} deferred: targets not yet bound", id);
            path.pending.push(PendingRelation {
                relation_id: id,
                targets: targets.to_vec(),
                kind,
                encoding_type: encoding_type.clone(),
                factor,
                offset,
                modulo,
                observed: slice,
            });
        }
    }

    match path.drain_pending() {
        Ok(()) => Ok(vec![path]),
        Err(_) => Ok(Vec::new()),
    }
}

fn walk_alt(
    arena: &VariableArena,
    id: VarId,
    children: &[VarId],
    callback: Option<&crate::tree::AltCallback>,
    path: ParsingPath,
    carnivorous: bool,
    limits: &EngineLimits,
) -> Result<Vec<ParsingPath>, EngineError> {
    let depth = path.alt_depth.get(&id).copied().unwrap_or(0) + 1;
    if depth > limits.max_alt_depth {
        trace!("Alt {:?} pruned: max_depth {} exceeded", id, limits.max_alt_depth);
        return Ok(Vec::new());
    }
    let mut path = path;
    path.alt_depth.insert(id, depth);

    if let Some(cb) = callback {
        let choice = cb();
        let index = if choice < 0 {
            children.len() - 1
        } else {
            choice as usize
        };
        let child = children.get(index).copied().ok_or(EngineError::InvalidParsingPath)?;
        return walk(arena, child, path, carnivorous, limits);
    }

    let mut out = Vec::new();
    for &child in children {
        out.extend(walk(arena, child, path.clone(), carnivorous, limits)?);
    }
    Ok(out)
}

fn walk_agg(
    arena: &VariableArena,
    children: &[VarId],
    path: ParsingPath,
    carnivorous: bool,
    limits: &EngineLimits,
) -> Result<Vec<ParsingPath>, EngineError> {
    let mut frontier = vec![path];
    let last = children.len().saturating_sub(1);
    for (i, &child) in children.iter().enumerate() {
        let child_carnivorous = carnivorous && i == last;
        let mut next = Vec::new();
        for p in frontier.drain(..) {
            next.extend(walk(arena, child, p, child_carnivorous, limits)?);
        }
        frontier = next;
    }
    Ok(frontier)
}

fn walk_repeat(
    arena: &VariableArena,
    child: VarId,
    bounds: (usize, Option<usize>),
    delimiter: Option<&BitVec>,
    path: ParsingPath,
    limits: &EngineLimits,
) -> Result<Vec<ParsingPath>, EngineError> {
    let (lo, hi) = bounds;
    let hi = hi.unwrap_or(limits.max_repeat_count).min(limits.max_repeat_count);
    let mut out = Vec::new();
    for count in lo..=hi {
        let mut frontier = vec![path.clone()];
        let mut ok = true;
        for iteration in 0..count {
            if iteration > 0 {
                if let Some(delim) = delimiter {
                    let mut after_delim = Vec::new();
                    for mut p in frontier.drain(..) {
                        if p.cursor.len() < delim.len()
                            || p.cursor.slice(0, delim.len()).as_bools() != delim.as_bools()
                        {
                            continue;
                        }
                        p.cursor = p.cursor.slice(delim.len(), p.cursor.len());
                        after_delim.push(p);
                    }
                    frontier = after_delim;
                }
            }
            if frontier.is_empty() {
                ok = false;
                break;
            }
            let mut next = Vec::new();
            for p in frontier.drain(..) {
                next.extend(walk(arena, child, p, false, limits)?);
            }
            frontier = next;
        }
        if ok {
            out.extend(frontier);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Endianness;
    use crate::tree::TreeBuilder;
    use crate::types::{IntegerType, RawType, Sign, UnitSize};

    fn uint8() -> DataType {
        DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big))
    }

    #[test]
    fn two_fixed_fields_parse_back() {
        let mut b = TreeBuilder::new();
        let f1 = b.data(uint8(), Scope::None);
        let f2 = b.data(uint8(), Scope::None);
        let root = b.agg(vec![f1, f2]).unwrap();

        let bits = BitVec::from_bytes_be(&[0xab, 0x01]);
        let paths = parse(&b.arena, root, bits, Memory::new(), true, &EngineLimits::default()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].assignments.get(&f1).unwrap().to_bytes_be(), vec![0xab]);
        assert_eq!(paths[0].assignments.get(&f2).unwrap().to_bytes_be(), vec![0x01]);
    }

    #[test]
    fn size_relation_validates_against_prior_field() {
        let mut b = TreeBuilder::new();
        let f1 = b.data(DataType::Raw(RawType::new((1, Some(1)))), Scope::None);
        let f2 = b.size_relation(vec![f1], uint8(), 1.0 / 8.0, 0).unwrap();
        let root = b.agg(vec![f1, f2]).unwrap();

        let bits = BitVec::from_bytes_be(&[0xab, 0x01]);
        let paths = parse(&b.arena, root, bits, Memory::new(), true, &EngineLimits::default()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].assignments.get(&f2).unwrap().to_bytes_be(), vec![1]);
    }

    #[test]
    fn size_relation_rejects_mismatched_length_byte() {
        let mut b = TreeBuilder::new();
        let f1 = b.data(DataType::Raw(RawType::new((1, Some(1)))), Scope::None);
        let f2 = b.size_relation(vec![f1], uint8(), 1.0 / 8.0, 0).unwrap();
        let root = b.agg(vec![f1, f2]).unwrap();

        let bits = BitVec::from_bytes_be(&[0xab, 0x02]);
        let paths = parse(&b.arena, root, bits, Memory::new(), true, &EngineLimits::default()).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn alt_with_negative_one_callback_picks_last_child() {
        let mut b = TreeBuilder::new();
        let a = b.data(DataType::Raw(RawType::fixed(b"A".to_vec())), Scope::None);
        let c = b.data(DataType::Raw(RawType::fixed(b"C".to_vec())), Scope::None);
        let root = b.alt(vec![a, c], Some(TreeBuilder::callback(|| -1))).unwrap();

        let bits = BitVec::from_bytes_be(b"C");
        let paths = parse(&b.arena, root, bits, Memory::new(), true, &EngineLimits::default()).unwrap();
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn repeat_enumerates_every_feasible_count() {
        let mut b = TreeBuilder::new();
        let byte = b.data(DataType::Raw(RawType::new((1, Some(1)))), Scope::None);
        let root = b.repeat(byte, (1, Some(3)), None).unwrap();

        let bits = BitVec::from_bytes_be(&[1, 2, 3]);
        let paths = parse(&b.arena, root, bits, Memory::new(), true, &EngineLimits::default()).unwrap();
        // Only count=3 fully consumes all three bytes under must_consume_everything.
        assert_eq!(paths.len(), 1);
    }
}

