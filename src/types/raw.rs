//! `Raw` and `HexaString`: opaque byte sequences parameterized by a
//! byte-count bound. They share an implementation; `HexaString` only
//! differs in how a caller renders its bytes for display (hex digits
//! rather than arbitrary bytes), which is not a concern of `TypeOps`.

use rand_core::RngCore;

use crate::bits::BitVec;
use crate::error::EngineError;

use super::{sample_len, TypeOps};

const HARD_CAP_BYTES: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct RawType {
    pub nb_bytes: (usize, Option<usize>),
    pub fixed: Option<Vec<u8>>,
}

impl RawType {
    pub fn new(nb_bytes: (usize, Option<usize>)) -> Self {
        Self {
            nb_bytes,
            fixed: None,
        }
    }

    pub fn fixed(value: impl Into<Vec<u8>>) -> Self {
        let value = value.into();
        let len = value.len();
        Self {
            nb_bytes: (len, Some(len)),
            fixed: Some(value),
        }
    }

    fn in_bounds(&self, len: usize) -> bool {
        len >= self.nb_bytes.0 && self.nb_bytes.1.map(|m| len <= m).unwrap_or(true)
    }
}

impl TypeOps for RawType {
    fn size(&self) -> (usize, Option<usize>) {
        (self.nb_bytes.0 * 8, self.nb_bytes.1.map(|m| m * 8))
    }

    fn can_parse(&self, bits: &BitVec) -> bool {
        if bits.len() % 8 != 0 {
            return false;
        }
        let len = bits.len() / 8;
        if !self.in_bounds(len) {
            return false;
        }
        match &self.fixed {
            Some(value) => bits.to_bytes_be() == *value,
            None => true,
        }
    }

    fn generate(&self, rng: &mut dyn RngCore) -> BitVec {
        if let Some(value) = &self.fixed {
            return BitVec::from_bytes_be(value);
        }
        let len = sample_len(rng, self.nb_bytes.0, self.nb_bytes.1, HARD_CAP_BYTES);
        let mut buf = vec![0u8; len];
        rng.fill_bytes(&mut buf);
        BitVec::from_bytes_be(&buf)
    }

    fn encode(&self, raw: &[u8]) -> Result<BitVec, EngineError> {
        if !self.in_bounds(raw.len()) {
            return Err(EngineError::EncodingError(format!(
                "{} bytes outside nb_bytes bounds",
                raw.len()
            )));
        }
        Ok(BitVec::from_bytes_be(raw))
    }

    fn decode(&self, bits: &BitVec) -> Result<Vec<u8>, EngineError> {
        if bits.len() % 8 != 0 {
            return Err(EngineError::EncodingError(
                "raw value is not byte-aligned".into(),
            ));
        }
        Ok(bits.to_bytes_be())
    }
}

/// `HexaString` shares `RawType`'s wire behavior exactly; only the
/// caller-facing textual form (hex digits) differs, via `to_hex`/`from_hex`.
#[derive(Debug, Clone, PartialEq)]
pub struct HexaStringType(pub RawType);

impl HexaStringType {
    pub fn new(nb_bytes: (usize, Option<usize>)) -> Self {
        Self(RawType::new(nb_bytes))
    }

    pub fn from_hex(hex: &str) -> Result<Self, EngineError> {
        let bytes = decode_hex(hex)?;
        Ok(Self(RawType::fixed(bytes)))
    }

    pub fn to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, EngineError> {
    if hex.len() % 2 != 0 {
        return Err(EngineError::EncodingError("odd-length hex string".into()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| EngineError::EncodingError("invalid hex digit".into()))
        })
        .collect()
}

impl TypeOps for HexaStringType {
    fn size(&self) -> (usize, Option<usize>) {
        self.0.size()
    }
    fn can_parse(&self, bits: &BitVec) -> bool {
        self.0.can_parse(bits)
    }
    fn generate(&self, rng: &mut dyn RngCore) -> BitVec {
        self.0.generate(rng)
    }
    fn encode(&self, raw: &[u8]) -> Result<BitVec, EngineError> {
        self.0.encode(raw)
    }
    fn decode(&self, bits: &BitVec) -> Result<Vec<u8>, EngineError> {
        self.0.decode(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trips_within_bounds() {
        let t = RawType::new((2, Some(4)));
        let bits = t.encode(&[1, 2, 3]).unwrap();
        assert!(t.can_parse(&bits));
        assert_eq!(t.decode(&bits).unwrap(), vec![1, 2, 3]);
        assert!(t.encode(&[1]).is_err());
    }

    #[test]
    fn hexastring_round_trips_hex_text() {
        let t = HexaStringType::from_hex("deadbeef").unwrap();
        let bits = t.generate(&mut rand::thread_rng());
        assert_eq!(HexaStringType::to_hex(&bits.to_bytes_be()), "deadbeef");
    }
}
