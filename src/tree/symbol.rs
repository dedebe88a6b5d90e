//! `Field` and `Symbol` (spec §6, GLOSSARY): a `Field` is a named wrapper
//! over a root variable ("domain"); a `Symbol` is a named grouping of
//! fields forming a message type.

use crate::error::EngineError;

use super::{TreeBuilder, VarId};

/// A human-readable wrapper over a root variable.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Option<String>,
    pub domain: VarId,
}

impl Field {
    pub fn new(domain: VarId) -> Self {
        Self { name: None, domain }
    }

    pub fn named(name: impl Into<String>, domain: VarId) -> Self {
        Self {
            name: Some(name.into()),
            domain,
        }
    }
}

/// A named grouping of fields. `root()` is the `Agg` of every field's
/// domain in declaration order — parsing/specializing a `Symbol` is
/// exactly parsing/specializing that `Agg`.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub fields: Vec<Field>,
    root: VarId,
}

impl Symbol {
    pub fn new(
        builder: &mut TreeBuilder,
        name: impl Into<String>,
        fields: Vec<Field>,
    ) -> Result<Self, EngineError> {
        if fields.is_empty() {
            return Err(EngineError::TypeError(
                "Symbol requires >= 1 field".into(),
            ));
        }
        let domains = fields.iter().map(|f| f.domain).collect();
        let root = builder.agg(domains)?;
        if !builder.arena.is_acyclic_from(root) {
            return Err(EngineError::TypeError(format!(
                "symbol '{}' has a cyclic variable graph",
                name.into()
            )));
        }
        Ok(Self {
            name: name.into(),
            fields,
            root,
        })
    }

    pub fn root(&self) -> VarId {
        self.root
    }

    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.as_deref() == Some(name))
    }
}

/// Helper used by tests/fixtures: wraps a single variable as a one-field
/// unnamed symbol.
pub fn symbol_of(builder: &mut TreeBuilder, name: impl Into<String>, domain: VarId) -> Result<Symbol, EngineError> {
    Symbol::new(builder, name, vec![Field::new(domain)])
}
