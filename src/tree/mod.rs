//! The variable tree (spec §2.3, §3): leaves (`Data`, `Relation`) and
//! nodes (`Alt`, `Agg`, `Repeat`, `Opt`) arranged as an arena of
//! arena-indexed `Variable`s, per the design note in spec §9 ("never
//! represent variables as mutually-owning graphs; use arena + indices").
//! Sharing a `VarId` as a child of two different parents is the
//! supported way to express "the same logical slot appears twice".

use std::rc::Rc;

use crate::bits::BitVec;
use crate::types::DataType;

pub mod builder;
pub mod symbol;

pub use builder::TreeBuilder;
pub use symbol::{symbol_of, Field, Symbol};

/// Stable identity of a variable within a single `VariableArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

/// Identity of an `Alt` placeholder reserved by `TreeBuilder::forward_alt`
/// before its children are known — the tagged-variant handle spec §9's
/// design note calls for ("tagged variants with an explicit `AltId`...
/// carrying a depth counter on the path") so a recursive grammar rule can
/// refer to its own `Alt` while it is still being built. Not a general
/// `VarId`: only `TreeBuilder::finish_alt`/`VariableArena::patch_alt`
/// accept one, and only while the placeholder is still unfinished in
/// spirit (patching twice just overwrites it, mirroring `PendingRelation`
/// accepting a second resolution silently).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AltId(pub(crate) VarId);

impl AltId {
    /// The `VarId` this placeholder will resolve to once finished —
    /// usable immediately as a child reference to build genuine
    /// recursion before `finish_alt` is called.
    pub fn var_id(self) -> VarId {
        self.0
    }
}

/// Lifetime over which a variable's learned value is reused (spec §3
/// Scope semantics table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Constant,
    Message,
    Session,
    None,
}

/// How an `Alt` picks a child deterministically: a non-negative return
/// value is a child index; `-1` means "the last child". The callback
/// takes no path context — spec concrete scenario 3
/// uses exactly this shape ("a callback returning -1").
pub type AltCallback = Rc<dyn Fn() -> i64>;

/// The function of a `Relation` leaf's targets (spec §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Size,
    Value,
    Checksum,
    Padding,
}

/// The body of a variable: either a leaf (`Data`, `Relation`) or a node
/// (`Alt`, `Agg`, `Repeat`). `Opt` is sugar desugared at construction time
/// into `Alt{[child, empty]}` (spec §3: "`Opt{child}` = `Alt{child,
/// Empty}`").
#[derive(Clone)]
pub enum VariableKind {
    Data {
        ty: DataType,
        value: Option<BitVec>,
    },
    Relation {
        targets: Vec<VarId>,
        kind: RelationKind,
        encoding_type: DataType,
        factor: f64,
        offset: i64,
        modulo: Option<u64>,
    },
    Alt {
        children: Vec<VarId>,
        callback: Option<AltCallback>,
    },
    Agg {
        children: Vec<VarId>,
    },
    Repeat {
        child: VarId,
        bounds: (usize, Option<usize>),
        delimiter: Option<BitVec>,
    },
}

impl std::fmt::Debug for VariableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data { ty, value } => f.debug_struct("Data").field("ty", ty).field("value", value).finish(),
            Self::Relation { targets, kind, encoding_type, factor, offset, modulo } => f
                .debug_struct("Relation")
                .field("targets", targets)
                .field("kind", kind)
                .field("encoding_type", encoding_type)
                .field("factor", factor)
                .field("offset", offset)
                .field("modulo", modulo)
                .finish(),
            Self::Alt { children, callback } => f
                .debug_struct("Alt")
                .field("children", children)
                .field("callback", &callback.as_ref().map(|_| "<fn>"))
                .finish(),
            Self::Agg { children } => f.debug_struct("Agg").field("children", children).finish(),
            Self::Repeat { child, bounds, delimiter } => f
                .debug_struct("Repeat")
                .field("child", child)
                .field("bounds", bounds)
                .field("delimiter", delimiter)
                .finish(),
        }
    }
}

impl VariableKind {
    pub fn is_node(&self) -> bool {
        matches!(
            self,
            VariableKind::Alt { .. } | VariableKind::Agg { .. } | VariableKind::Repeat { .. }
        )
    }
}

/// A node or leaf in the declarative format tree.
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: VarId,
    pub name: Option<String>,
    pub scope: Scope,
    pub kind: VariableKind,
}

impl Variable {
    pub fn is_node(&self) -> bool {
        self.kind.is_node()
    }

    pub fn children(&self) -> Vec<VarId> {
        match &self.kind {
            VariableKind::Alt { children, .. } => children.clone(),
            VariableKind::Agg { children } => children.clone(),
            VariableKind::Repeat { child, .. } => vec![*child],
            VariableKind::Data { .. } | VariableKind::Relation { .. } => Vec::new(),
        }
    }
}

/// Owns every `Variable` in a single declarative format tree. Variables
/// are never mutated once allocated (beyond the `Variable` struct's own
/// fields) so a `VarId` remains a stable, cheap-to-copy handle across the
/// whole engine — arena cloning is O(n) pointer-sized copies, never a
/// deep graph walk.
#[derive(Debug, Clone, Default)]
pub struct VariableArena {
    variables: Vec<Variable>,
}

impl VariableArena {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
        }
    }

    pub fn get(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub(crate) fn alloc(&mut self, name: Option<String>, scope: Scope, kind: VariableKind) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            id,
            name,
            scope,
            kind,
        });
        id
    }

    /// Rewrites a previously-reserved `Alt` placeholder (from
    /// `TreeBuilder::forward_alt`) in place with its real children and
    /// callback. Only valid on a variable that is still an `Alt` — the
    /// forward-reference/patch counterpart to `PendingRelation`'s
    /// deferred resolution, but for tree construction itself (spec §9
    /// design note).
    pub(crate) fn patch_alt(
        &mut self,
        id: VarId,
        children: Vec<VarId>,
        callback: Option<AltCallback>,
    ) -> Result<(), crate::error::EngineError> {
        match &mut self.variables[id.0].kind {
            VariableKind::Alt { children: existing, callback: existing_cb } => {
                *existing = children;
                *existing_cb = callback;
                Ok(())
            }
            other => Err(crate::error::EngineError::TypeError(format!(
                "patch_alt called on a non-Alt variable ({:?})",
                other
            ))),
        }
    }

    /// Checks the variable graph is acyclic: no variable is reachable
    /// from itself through `children()`. Called at `Symbol` construction
    /// (spec §3 invariant: "the variable graph is acyclic"). A cycle that
    /// closes back on an `Alt` node is tolerated here — recursive-Alt
    /// re-entry is bounded at walk time by `EngineLimits::max_alt_depth`
    /// (both `parser` and `specializer` track `alt_depth` per `VarId` on
    /// their paths) — but a cycle through `Agg`/`Repeat`, which has no
    /// depth-bounding mechanism, is still rejected outright.
    pub fn is_acyclic_from(&self, root: VarId) -> bool {
        let mut visiting = std::collections::HashSet::new();
        self.visit_acyclic(root, &mut visiting)
    }

    fn visit_acyclic(&self, id: VarId, visiting: &mut std::collections::HashSet<VarId>) -> bool {
        if !visiting.insert(id) {
            return matches!(self.get(id).kind, VariableKind::Alt { .. });
        }
        for child in self.get(id).children() {
            if !self.visit_acyclic(child, visiting) {
                return false;
            }
        }
        visiting.remove(&id);
        true
    }
}
