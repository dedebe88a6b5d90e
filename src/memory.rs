//! Memory and path duplication (spec §2.4, §4.5).
//!
//! `Memory` is a two-layer store: a session-wide layer (survives across
//! messages) and a per-message layer (reset per top-level parse/
//! specialize call). Lookups consult the per-message layer first, then
//! the session layer; writes go to the layer matching the variable's
//! scope.
//!
//! Duplication is required wherever a path branches (spec §4.5: "must be
//! O(1) amortized"). Rather than a hand-rolled HAMT — no crate in this
//! workspace's dependency stack provides one, and fabricating a
//! persistent-map dependency is worse than using what the standard
//! library already gives us — each layer is an `Rc<HashMap<..>>`: cloning
//! an `Rc` is O(1), and `Rc::make_mut` copy-on-writes only the layer a
//! branch actually mutates, so sibling branches sharing an unmodified
//! layer never pay for a deep copy.

use std::collections::HashMap;
use std::rc::Rc;

use crate::bits::BitVec;
use crate::tree::{Scope, VarId};

type Layer = Rc<HashMap<VarId, BitVec>>;

/// The session/message-layered learned-value store (spec §4.5).
#[derive(Debug, Clone, Default)]
pub struct Memory {
    session: Layer,
    message: Layer,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            session: Rc::new(HashMap::new()),
            message: Rc::new(HashMap::new()),
        }
    }

    /// Starts a new top-level parse/specialize: keeps the session layer,
    /// resets the message layer.
    pub fn begin_message(&self) -> Memory {
        Memory {
            session: Rc::clone(&self.session),
            message: Rc::new(HashMap::new()),
        }
    }

    /// O(1): shares both layers with the clone until one is mutated.
    pub fn fork(&self) -> Memory {
        self.clone()
    }

    pub fn get(&self, id: VarId) -> Option<&BitVec> {
        self.message.get(&id).or_else(|| self.session.get(&id))
    }

    /// Writes `value` into the layer matching `scope`. `NONE`-scoped
    /// variables are never written: they re-generate/re-parse freely and
    /// have no memorized value (spec §3 Scope table).
    pub fn record(&mut self, id: VarId, scope: Scope, value: BitVec) {
        match scope {
            Scope::Session => {
                Rc::make_mut(&mut self.session).insert(id, value);
            }
            Scope::Message | Scope::Constant => {
                Rc::make_mut(&mut self.message).insert(id, value);
            }
            Scope::None => {}
        }
    }

    pub fn contains(&self, id: VarId) -> bool {
        self.message.contains_key(&id) || self.session.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVec;
    use crate::tree::VarId;

    fn vid(n: usize) -> VarId {
        VarId(n)
    }

    #[test]
    fn message_layer_resets_session_layer_persists() {
        let mut mem = Memory::new();
        mem.record(vid(0), Scope::Session, BitVec::from_bytes_be(&[1]));
        mem.record(vid(1), Scope::Message, BitVec::from_bytes_be(&[2]));

        let next_message = mem.begin_message();
        assert!(next_message.contains(vid(0)));
        assert!(!next_message.contains(vid(1)));
    }

    #[test]
    fn fork_is_independent_after_a_write() {
        let mut mem = Memory::new();
        mem.record(vid(0), Scope::Message, BitVec::from_bytes_be(&[1]));
        let mut branch = mem.fork();
        branch.record(vid(0), Scope::Message, BitVec::from_bytes_be(&[2]));

        assert_eq!(mem.get(vid(0)).unwrap().to_bytes_be(), vec![1]);
        assert_eq!(branch.get(vid(0)).unwrap().to_bytes_be(), vec![2]);
    }

    #[test]
    fn none_scope_is_never_recorded() {
        let mut mem = Memory::new();
        mem.record(vid(0), Scope::None, BitVec::from_bytes_be(&[9]));
        assert!(!mem.contains(vid(0)));
    }
}
