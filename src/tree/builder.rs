//! The variable-tree construction API (spec §6 pseudocode). Construction
//! errors here are fatal and not caught by the engine (spec §7: "Fatal at
//! construction; no retry").

use std::rc::Rc;

use crate::bits::BitVec;
use crate::error::EngineError;
use crate::types::{DataType, TypeOps};

use super::{AltCallback, AltId, RelationKind, Scope, VarId, VariableArena, VariableKind};

/// Owns a `VariableArena` and exposes the builder functions named in
/// spec §6: `Data`, `Alt`, `Agg`, `Repeat`, `Size`, `Value`, `Opt`.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    pub arena: VariableArena,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            arena: VariableArena::new(),
        }
    }

    /// `Data(type, scope?=NONE)`.
    pub fn data(&mut self, ty: DataType, scope: Scope) -> VarId {
        self.arena
            .alloc(None, scope, VariableKind::Data { ty, value: None })
    }

    pub fn data_named(&mut self, name: impl Into<String>, ty: DataType, scope: Scope) -> VarId {
        self.arena.alloc(
            Some(name.into()),
            scope,
            VariableKind::Data { ty, value: None },
        )
    }

    /// A `Data` leaf with a pre-set value — used for `CONSTANT` scope and
    /// for literal bytes embedded directly in a format (e.g. a magic
    /// number).
    pub fn constant(&mut self, ty: DataType, value: BitVec) -> Result<VarId, EngineError> {
        let (min, max) = ty.size();
        let len = value.len();
        if len < min || max.map(|m| len > m).unwrap_or(false) {
            return Err(EngineError::TypeError(format!(
                "constant value length {} outside type bounds [{}, {:?}]",
                len, min, max
            )));
        }
        Ok(self.arena.alloc(
            None,
            Scope::Constant,
            VariableKind::Data {
                ty,
                value: Some(value),
            },
        ))
    }

    /// `Alt([children], callback?)`.
    pub fn alt(&mut self, children: Vec<VarId>, callback: Option<AltCallback>) -> Result<VarId, EngineError> {
        if children.is_empty() {
            return Err(EngineError::TypeError("Alt requires >= 1 child".into()));
        }
        Ok(self
            .arena
            .alloc(None, Scope::None, VariableKind::Alt { children, callback }))
    }

    /// Reserves an `Alt` placeholder with no children yet, returning its
    /// `AltId` so a recursive grammar rule can reference its own `Alt`
    /// from inside one of the children it is about to build. Mirrors the
    /// deferred-resolution pattern `PendingRelation` uses for relations,
    /// generalized to tree construction itself (spec §9 design note). Must
    /// be completed with `finish_alt` before the tree is used.
    pub fn forward_alt(&mut self) -> AltId {
        AltId(self.arena.alloc(
            None,
            Scope::None,
            VariableKind::Alt {
                children: Vec::new(),
                callback: None,
            },
        ))
    }

    /// Supplies the real children/callback for a placeholder returned by
    /// `forward_alt`. `children` may include the placeholder's own
    /// `VarId` (`id.var_id()`) to wire up genuine recursion.
    pub fn finish_alt(
        &mut self,
        id: AltId,
        children: Vec<VarId>,
        callback: Option<AltCallback>,
    ) -> Result<VarId, EngineError> {
        if children.is_empty() {
            return Err(EngineError::TypeError("Alt requires >= 1 child".into()));
        }
        let var_id = id.var_id();
        self.arena.patch_alt(var_id, children, callback)?;
        Ok(var_id)
    }

    /// `Agg([children])`.
    pub fn agg(&mut self, children: Vec<VarId>) -> Result<VarId, EngineError> {
        if children.is_empty() {
            return Err(EngineError::TypeError("Agg requires >= 1 child".into()));
        }
        Ok(self
            .arena
            .alloc(None, Scope::None, VariableKind::Agg { children }))
    }

    /// `Repeat(child, (lo, hi), delimiter?)`.
    pub fn repeat(
        &mut self,
        child: VarId,
        bounds: (usize, Option<usize>),
        delimiter: Option<BitVec>,
    ) -> Result<VarId, EngineError> {
        if let Some(hi) = bounds.1 {
            if bounds.0 > hi {
                return Err(EngineError::TypeError(format!(
                    "Repeat bounds ({}, {}) have lo > hi",
                    bounds.0, hi
                )));
            }
        }
        Ok(self.arena.alloc(
            None,
            Scope::None,
            VariableKind::Repeat {
                child,
                bounds,
                delimiter,
            },
        ))
    }

    /// `Opt(child)` = `Alt{child, Empty}` (spec §3). `Empty` is an
    /// always-zero-length `Raw` leaf.
    pub fn opt(&mut self, child: VarId) -> Result<VarId, EngineError> {
        let empty = self.data(
            DataType::Raw(crate::types::RawType::new((0, Some(0)))),
            Scope::None,
        );
        self.alt(vec![child, empty], None)
    }

    /// `Size(targets, data_type, factor=1/8, offset=0)`.
    pub fn size_relation(
        &mut self,
        targets: Vec<VarId>,
        encoding_type: DataType,
        factor: f64,
        offset: i64,
    ) -> Result<VarId, EngineError> {
        self.relation(targets, RelationKind::Size, encoding_type, factor, offset, None)
    }

    /// `Value(targets)`.
    pub fn value_relation(&mut self, targets: Vec<VarId>, encoding_type: DataType) -> Result<VarId, EngineError> {
        self.relation(targets, RelationKind::Value, encoding_type, 1.0, 0, None)
    }

    pub fn checksum_relation(
        &mut self,
        targets: Vec<VarId>,
        encoding_type: DataType,
    ) -> Result<VarId, EngineError> {
        self.relation(targets, RelationKind::Checksum, encoding_type, 1.0, 0, None)
    }

    pub fn padding_relation(
        &mut self,
        targets: Vec<VarId>,
        modulo: u64,
    ) -> Result<VarId, EngineError> {
        self.relation(
            targets,
            RelationKind::Padding,
            DataType::BitArray(crate::types::BitArrayType::new((0, None))),
            1.0,
            0,
            Some(modulo),
        )
    }

    fn relation(
        &mut self,
        targets: Vec<VarId>,
        kind: RelationKind,
        encoding_type: DataType,
        factor: f64,
        offset: i64,
        modulo: Option<u64>,
    ) -> Result<VarId, EngineError> {
        if targets.is_empty() {
            return Err(EngineError::TypeError(
                "Relation requires >= 1 target".into(),
            ));
        }
        Ok(self.arena.alloc(
            None,
            Scope::None,
            VariableKind::Relation {
                targets,
                kind,
                encoding_type,
                factor,
                offset,
                modulo,
            },
        ))
    }

    /// Wraps an `Fn() -> i64` closure as an `AltCallback`.
    pub fn callback(f: impl Fn() -> i64 + 'static) -> AltCallback {
        Rc::new(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntegerType, Sign, UnitSize};
    use crate::bits::Endianness;

    #[test]
    fn repeat_rejects_inverted_bounds() {
        let mut b = TreeBuilder::new();
        let leaf = b.data(
            DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big)),
            Scope::None,
        );
        assert!(b.repeat(leaf, (5, Some(2)), None).is_err());
    }

    #[test]
    fn alt_and_agg_reject_empty_children() {
        let mut b = TreeBuilder::new();
        assert!(b.alt(vec![], None).is_err());
        assert!(b.agg(vec![]).is_err());
    }

    #[test]
    fn opt_desugars_to_alt_with_empty_sibling() {
        let mut b = TreeBuilder::new();
        let leaf = b.data(
            DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big)),
            Scope::None,
        );
        let opt = b.opt(leaf).unwrap();
        match &b.arena.get(opt).kind {
            VariableKind::Alt { children, .. } => assert_eq!(children.len(), 2),
            _ => panic!("expected Alt"),
        }
    }
}
