//! `BitArray`: raw bits, optionally with named bit positions for
//! ergonomic access (e.g. flag fields).

use rand_core::RngCore;

use crate::bits::BitVec;
use crate::error::EngineError;

use super::{sample_len, TypeOps};

const HARD_CAP_BITS: usize = 8192;

#[derive(Debug, Clone, PartialEq)]
pub struct BitArrayType {
    pub nb_bits: (usize, Option<usize>),
    /// Parallel to bit indices; `None` entries are unnamed positions.
    pub labels: Vec<Option<String>>,
    pub fixed: Option<BitVec>,
}

impl BitArrayType {
    pub fn new(nb_bits: (usize, Option<usize>)) -> Self {
        Self {
            nb_bits,
            labels: Vec::new(),
            fixed: None,
        }
    }

    pub fn fixed(value: BitVec) -> Self {
        let len = value.len();
        Self {
            nb_bits: (len, Some(len)),
            labels: Vec::new(),
            fixed: Some(value),
        }
    }

    pub fn with_labels(mut self, labels: Vec<Option<String>>) -> Self {
        self.labels = labels;
        self
    }

    /// Looks up a named bit by label, relative to the start of a concrete
    /// parsed value.
    pub fn bit_named<'a>(&self, value: &'a BitVec, name: &str) -> Option<bool> {
        self.labels
            .iter()
            .position(|l| l.as_deref() == Some(name))
            .and_then(|idx| value.get(idx))
    }

    fn in_bounds(&self, len: usize) -> bool {
        len >= self.nb_bits.0 && self.nb_bits.1.map(|m| len <= m).unwrap_or(true)
    }
}

impl TypeOps for BitArrayType {
    fn size(&self) -> (usize, Option<usize>) {
        self.nb_bits
    }

    fn can_parse(&self, bits: &BitVec) -> bool {
        if !self.in_bounds(bits.len()) {
            return false;
        }
        match &self.fixed {
            Some(value) => value.as_bools() == bits.as_bools(),
            None => true,
        }
    }

    fn generate(&self, rng: &mut dyn RngCore) -> BitVec {
        if let Some(value) = &self.fixed {
            return value.clone();
        }
        let len = sample_len(rng, self.nb_bits.0, self.nb_bits.1, HARD_CAP_BITS);
        (0..len).map(|_| rng.next_u32() & 1 == 1).collect()
    }

    fn encode(&self, raw: &[u8]) -> Result<BitVec, EngineError> {
        let bits = BitVec::from_bytes_be(raw);
        if !self.in_bounds(bits.len()) {
            return Err(EngineError::EncodingError(
                "bit array length outside nb_bits bounds".into(),
            ));
        }
        Ok(bits)
    }

    fn decode(&self, bits: &BitVec) -> Result<Vec<u8>, EngineError> {
        Ok(bits.to_bytes_be())
    }
}
