//! `Timestamp`: a 32-bit big-endian Unix epoch second count.

use byteorder::{BigEndian, ByteOrder};
use rand_core::RngCore;

use crate::bits::BitVec;
use crate::error::EngineError;

use super::TypeOps;

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampType {
    pub interval: (u32, u32),
    pub fixed: Option<u32>,
}

impl TimestampType {
    pub fn new() -> Self {
        Self {
            interval: (0, u32::MAX),
            fixed: None,
        }
    }

    pub fn fixed(epoch_seconds: u32) -> Self {
        Self {
            interval: (epoch_seconds, epoch_seconds),
            fixed: Some(epoch_seconds),
        }
    }
}

impl Default for TimestampType {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeOps for TimestampType {
    fn size(&self) -> (usize, Option<usize>) {
        (32, Some(32))
    }

    fn can_parse(&self, bits: &BitVec) -> bool {
        if bits.len() != 32 {
            return false;
        }
        let value = BigEndian::read_u32(&bits.to_bytes_be());
        match self.fixed {
            Some(v) => value == v,
            None => value >= self.interval.0 && value <= self.interval.1,
        }
    }

    fn generate(&self, rng: &mut dyn RngCore) -> BitVec {
        let value = match self.fixed {
            Some(v) => v,
            None => {
                let (lo, hi) = self.interval;
                let span = (hi as u64 - lo as u64) + 1;
                (lo as u64 + rng.next_u64() % span) as u32
            }
        };
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        BitVec::from_bytes_be(&buf)
    }

    fn encode(&self, raw: &[u8]) -> Result<BitVec, EngineError> {
        if raw.len() != 4 {
            return Err(EngineError::EncodingError(
                "timestamp must be exactly 4 bytes".into(),
            ));
        }
        Ok(BitVec::from_bytes_be(raw))
    }

    fn decode(&self, bits: &BitVec) -> Result<Vec<u8>, EngineError> {
        if bits.len() != 32 {
            return Err(EngineError::EncodingError(
                "timestamp must be exactly 32 bits".into(),
            ));
        }
        Ok(bits.to_bytes_be())
    }
}
