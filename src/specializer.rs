//! Specialization: the dual of the parser (spec §4.3). Walks the
//! variable tree emitting bits instead of consuming them, resolving
//! relations against already-produced siblings or patching a
//! placeholder once a forward-referenced target is produced.

use std::collections::HashMap;

use log::trace;

use crate::bits::BitVec;
use crate::config::EngineLimits;
use crate::error::{EngineError, MaxFuzzing};
use crate::fuzz::FuzzContext;
use crate::memory::Memory;
use crate::relation;
use crate::tree::{RelationKind, Scope, VarId, VariableArena, VariableKind};
use crate::types::{DataType, TypeOps};

/// A relation's bits could not be computed yet when it was reached
/// (forward reference); recorded so the patch can be applied once the
/// target is produced (spec §4.3, §9 "resolvers patch placeholder bit
/// ranges by offset").
#[derive(Debug, Clone)]
struct DeferredPatch {
    offset: usize,
    len: usize,
    targets: Vec<VarId>,
    kind: RelationKind,
    encoding_type: DataType,
    factor: f64,
    relation_offset: i64,
    modulo: Option<u64>,
}

/// A branch of the specializer, accumulating emitted output in
/// left-to-right tree order (spec §3 `SpecializingPath`).
#[derive(Debug, Clone)]
pub struct SpecializingPath {
    pub produced: HashMap<VarId, BitVec>,
    pub output: BitVec,
    pub memory: Memory,
    deferred: Vec<DeferredPatch>,
    alt_depth: HashMap<VarId, u32>,
}

impl SpecializingPath {
    fn new(memory: Memory) -> Self {
        Self {
            produced: HashMap::new(),
            output: BitVec::new(),
            memory,
            deferred: Vec::new(),
            alt_depth: HashMap::new(),
        }
    }

    fn emit(&mut self, id: VarId, bits: BitVec) -> Result<(), EngineError> {
        self.output.extend(&bits);
        self.produced.insert(id, bits);
        self.apply_ready_patches()
    }

    fn concat_of(&self, ids: &[VarId]) -> Option<BitVec> {
        let mut parts = Vec::with_capacity(ids.len());
        for id in ids {
            parts.push(self.produced.get(id)?.clone());
        }
        Some(BitVec::concat(&parts))
    }

    /// Retries every deferred patch; any whose targets are now all
    /// produced gets spliced into `output` at its reserved offset.
    fn apply_ready_patches(&mut self) -> Result<(), EngineError> {
        let taken = std::mem::take(&mut self.deferred);
        let mut remaining = Vec::with_capacity(taken.len());
        for patch in taken {
            match self.concat_of(&patch.targets) {
                Some(concat) => {
                    let resolved = relation::resolve(
                        patch.kind,
                        &patch.encoding_type,
                        patch.factor,
                        patch.relation_offset,
                        patch.modulo,
                        &concat,
                    )?;
                    splice(&mut self.output, patch.offset, patch.len, &resolved);
                }
                None => remaining.push(patch),
            }
        }
        self.deferred = remaining;
        Ok(())
    }

    fn finish(self) -> Result<Self, EngineError> {
        if let Some(p) = self.deferred.first() {
            return Err(EngineError::UnresolvedRelation {
                relation: format!("{:?} targets", p.targets),
            });
        }
        Ok(self)
    }
}

/// Overwrites `len` bits of `buf` starting at `offset` with `value`
/// (which must itself be `len` bits long).
fn splice(buf: &mut BitVec, offset: usize, len: usize, value: &BitVec) {
    let before = buf.slice(0, offset);
    let after = buf.slice(offset + len, buf.len());
    *buf = BitVec::concat(&[before, value.clone(), after]);
}

/// Internal control-flow signal distinguishing a fatal error (spec §7
/// `EncodingError`/`UnresolvedRelation`/`RecursionLimit`, propagated to
/// the caller) from fuzz-counter exhaustion (spec §7 `MaxFuzzing`: "the
/// specializer's iterator ends cleanly, not an error to callers").
#[derive(Debug)]
enum Halt {
    Error(EngineError),
    FuzzExhausted,
}

impl From<EngineError> for Halt {
    fn from(e: EngineError) -> Self {
        Halt::Error(e)
    }
}

impl From<MaxFuzzing> for Halt {
    fn from(_: MaxFuzzing) -> Self {
        Halt::FuzzExhausted
    }
}

type WalkResult = Result<SpecializingPath, Halt>;

/// Outcome of a top-level `specialize` call.
#[derive(Debug)]
pub enum SpecializeOutcome {
    Produced(SpecializingPath),
    /// A fuzz counter (global or per-variable) was exhausted; per spec §7
    /// this is not an error, it's a clean end of the specialization.
    FuzzExhausted,
}

/// `Symbol.specialize` (spec §6): produces one `SpecializingPath` for
/// `root`. A caller wanting many concrete messages calls repeatedly,
/// threading the same `FuzzContext` to keep its counters and PRNG state
/// across calls (spec §8 "fuzz counter": "with counter_max = N,
/// specialize yields exactly N values then terminates").
pub fn specialize(
    arena: &VariableArena,
    root: VarId,
    memory: Memory,
    fuzz: Option<&mut FuzzContext>,
    limits: &EngineLimits,
) -> Result<SpecializeOutcome, EngineError> {
    let path = SpecializingPath::new(memory);
    match walk(arena, root, path, fuzz, limits) {
        Ok(path) => Ok(SpecializeOutcome::Produced(path.finish()?)),
        Err(Halt::FuzzExhausted) => Ok(SpecializeOutcome::FuzzExhausted),
        Err(Halt::Error(e)) => Err(e),
    }
}

fn walk(
    arena: &VariableArena,
    id: VarId,
    path: SpecializingPath,
    mut fuzz: Option<&mut FuzzContext>,
    limits: &EngineLimits,
) -> WalkResult {
    let var = arena.get(id);
    match &var.kind {
        VariableKind::Data { ty, value } => {
            walk_data(id, var.scope, ty, value.as_ref(), path, fuzz.as_deref_mut())
        }
        VariableKind::Relation {
            targets,
            kind,
            encoding_type,
            factor,
            offset,
            modulo,
        } => walk_relation(id, targets, *kind, encoding_type, *factor, *offset, *modulo, path),
        VariableKind::Alt { children, callback } => {
            walk_alt(arena, id, children, callback.as_ref(), path, fuzz, limits)
        }
        VariableKind::Agg { children } => walk_agg(arena, children, path, fuzz, limits),
        VariableKind::Repeat {
            child,
            bounds,
            delimiter,
        } => walk_repeat(arena, id, *child, *bounds, delimiter.as_ref(), path, fuzz, limits),
    }
}

fn walk_data(
    id: VarId,
    scope: Scope,
    ty: &DataType,
    fixed: Option<&BitVec>,
    mut path: SpecializingPath,
    fuzz: Option<&mut FuzzContext>,
) -> WalkResult {
    // CONSTANT: always emit the pre-set bits ("use").
    if scope == Scope::Constant {
        let value = fixed.expect("Constant-scoped Data leaf always carries a preset value").clone();
        path.emit(id, value)?;
        return Ok(path);
    }

    // MESSAGE/SESSION already memoized: "use".
    if (scope == Scope::Message || scope == Scope::Session) && path.memory.contains(id) {
        let value = path.memory.get(id).expect("just checked contains").clone();
        path.emit(id, value)?;
        return Ok(path);
    }

    let value = match fuzz {
        Some(ctx) => match ctx.produce_leaf(id, ty)? {
            Some(v) => v,
            None => ty.generate(&mut rand::thread_rng()),
        },
        None => ty.generate(&mut rand::thread_rng()),
    };

    if scope == Scope::Message || scope == Scope::Session {
        path.memory.record(id, scope, value.clone());
    }
    path.emit(id, value)?;
    Ok(path)
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
    mut path: SpecializingPath,
) -> WalkResult {
    match path.concat_of(targets) {
        Some(concat) => {
            let resolved = relation::resolve(kind, encoding_type, factor, offset, modulo, &concat)?;
            path.emit(id, resolved)?;
        }
        None if kind == RelationKind::Padding => {
            // Padding's length comes from its targets' own encoded length
            // (modulo arithmetic), not from `encoding_type` — there's no
            // sane placeholder width to reserve for a forward reference.
            return Err(Halt::Error(EngineError::UnresolvedRelation {
                relation: format!("Padding relation over {:?} targets forward-referenced", targets),
            }));
        }
        None => {
            trace!("relation {:?} deferred: targets not yet produced", id);
            let (min, max) = encoding_type.size();
            let len = max.unwrap_or(min);
            let reserved_offset = path.output.len();
            let placeholder = BitVec::from_bits(vec![false; len]);
            path.emit(id, placeholder)?;
            path.deferred.push(DeferredPatch {
                offset: reserved_offset,
                len,
                targets: targets.to_vec(),
                kind,
                encoding_type: encoding_type.clone(),
                factor,
                relation_offset: offset,
                modulo,
            });
        }
    }
    Ok(path)
}

fn walk_alt(
    arena: &VariableArena,
    id: VarId,
    children: &[VarId],
    callback: Option<&crate::tree::AltCallback>,
    mut path: SpecializingPath,
    mut fuzz: Option<&mut FuzzContext>,
    limits: &EngineLimits,
) -> WalkResult {
    let depth = path.alt_depth.get(&id).copied().unwrap_or(0) + 1;
    if depth > limits.max_alt_depth {
        return Err(Halt::Error(EngineError::RecursionLimit {
            max_depth: limits.max_alt_depth,
        }));
    }
    path.alt_depth.insert(id, depth);

    let index = match fuzz.as_deref_mut() {
        Some(ctx) => match ctx.alt_child_index(id, children.len())? {
            Some(i) => i,
            None => pick_index(callback, children.len()),
        },
        None => pick_index(callback, children.len()),
    };
    let child = children[index];
    let before = path.output.len();
    let mut path = walk(arena, child, path, fuzz, limits)?;
    let child_bits = path.output.slice(before, path.output.len());
    path.produced.insert(id, child_bits);
    Ok(path)
}

fn pick_index(callback: Option<&crate::tree::AltCallback>, child_count: usize) -> usize {
    match callback {
        Some(cb) => {
            let choice = cb();
            if choice < 0 {
                child_count - 1
            } else {
                choice as usize
            }
        }
        None => (rand::random::<u32>() as usize) % child_count,
    }
}

fn walk_agg(
    arena: &VariableArena,
    children: &[VarId],
    mut path: SpecializingPath,
    mut fuzz: Option<&mut FuzzContext>,
    limits: &EngineLimits,
) -> WalkResult {
    for &child in children {
        path = walk(arena, child, path, fuzz.as_deref_mut(), limits)?;
    }
    Ok(path)
}

#[allow(clippy::too_many_arguments)]
fn walk_repeat(
    arena: &VariableArena,
    id: VarId,
    child: VarId,
    bounds: (usize, Option<usize>),
    delimiter: Option<&BitVec>,
    mut path: SpecializingPath,
    mut fuzz: Option<&mut FuzzContext>,
    limits: &EngineLimits,
) -> WalkResult {
    let (lo, hi) = bounds;
    let count = match fuzz.as_deref_mut() {
        Some(ctx) => match ctx.repeat_count(id, bounds, limits.max_repeat_count)? {
            Some(c) => c,
            None => random_count(lo, hi, limits.max_repeat_count),
        },
        None => random_count(lo, hi, limits.max_repeat_count),
    };

    for iteration in 0..count {
        if iteration > 0 {
            if let Some(delim) = delimiter {
                path.output.extend(delim);
            }
        }
        path = walk(arena, child, path, fuzz.as_deref_mut(), limits)?;
    }
    Ok(path)
}

fn random_count(lo: usize, hi: Option<usize>, hard_cap: usize) -> usize {
    let upper = hi.unwrap_or(hard_cap).max(lo);
    if upper == lo {
        return lo;
    }
    lo + (rand::random::<u32>() as usize) % (upper - lo + 1)
}
