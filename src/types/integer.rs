//! `Integer`: fixed-width signed/unsigned values in either endianness.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use rand_core::RngCore;

use crate::bits::{BitVec, Endianness};
use crate::error::EngineError;

use super::{Sign, TypeOps, UnitSize};

/// A fixed-width integer type: storage width, sign, endianness, and the
/// interval of permitted values (used both to bound `generate` and to
/// validate `encode`).
#[derive(Debug, Clone, PartialEq)]
pub struct IntegerType {
    pub unit_size: UnitSize,
    pub sign: Sign,
    pub endianness: Endianness,
    /// Inclusive interval of legal values. Defaults to the full range of
    /// `(unit_size, sign)`.
    pub interval: (i128, i128),
    /// A pre-set value, if this leaf's domain has been narrowed to a
    /// constant.
    pub fixed: Option<i128>,
}

impl IntegerType {
    pub fn new(unit_size: UnitSize, sign: Sign, endianness: Endianness) -> Self {
        let (lo, hi) = Self::full_range(unit_size, sign);
        Self {
            unit_size,
            sign,
            endianness,
            interval: (lo, hi),
            fixed: None,
        }
    }

    pub fn fixed(unit_size: UnitSize, sign: Sign, endianness: Endianness, value: i128) -> Self {
        Self {
            unit_size,
            sign,
            endianness,
            interval: (value, value),
            fixed: Some(value),
        }
    }

    pub fn with_interval(mut self, lo: i128, hi: i128) -> Self {
        self.interval = (lo, hi);
        self
    }

    fn full_range(unit_size: UnitSize, sign: Sign) -> (i128, i128) {
        let bits = unit_size.bits().max(8) as u32;
        match sign {
            Sign::Unsigned => (0, (1i128 << bits) - 1),
            Sign::Signed => (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1),
        }
    }

    fn byte_width(&self) -> usize {
        self.unit_size.bits().max(8) / 8
    }

    /// Encodes a concrete integer value directly, bypassing the raw-byte
    /// round trip. Used by `generate` and by relation resolution (§4.4)
    /// where the value to emit is already known as an integer.
    pub fn encode_value(&self, value: i128) -> Result<BitVec, EngineError> {
        if value < self.interval.0 || value > self.interval.1 {
            return Err(EngineError::EncodingError(format!(
                "value {} out of interval [{}, {}]",
                value, self.interval.0, self.interval.1
            )));
        }
        let width = self.byte_width();
        let mut buf = vec![0u8; width];
        match (self.endianness, self.sign) {
            (Endianness::Big, Sign::Unsigned) => write_uint_be(&mut buf, value as u64),
            (Endianness::Little, Sign::Unsigned) => write_uint_le(&mut buf, value as u64),
            (Endianness::Big, Sign::Signed) => BigEndian::write_int(&mut buf, value as i64, width),
            (Endianness::Little, Sign::Signed) => {
                LittleEndian::write_int(&mut buf, value as i64, width)
            }
        }
        Ok(BitVec::from_bytes_be(&buf).with_tag(self.endianness))
    }

    /// Decodes the concrete integer value carried by `bits`.
    pub fn decode_value(&self, bits: &BitVec) -> Result<i128, EngineError> {
        if bits.len() != self.unit_size.bits() {
            return Err(EngineError::EncodingError(format!(
                "expected {} bits, got {}",
                self.unit_size.bits(),
                bits.len()
            )));
        }
        let bytes = bits.to_bytes_be();
        let width = self.byte_width();
        let value = match (self.endianness, self.sign) {
            (Endianness::Big, Sign::Unsigned) => read_uint_be(&bytes) as i128,
            (Endianness::Little, Sign::Unsigned) => read_uint_le(&bytes) as i128,
            (Endianness::Big, Sign::Signed) => BigEndian::read_int(&bytes, width) as i128,
            (Endianness::Little, Sign::Signed) => LittleEndian::read_int(&bytes, width) as i128,
        };
        Ok(value)
    }
}

fn write_uint_be(buf: &mut [u8], value: u64) {
    let width = buf.len();
    let mut tmp = [0u8; 8];
    BigEndian::write_u64(&mut tmp, value);
    buf.copy_from_slice(&tmp[8 - width..]);
}

fn write_uint_le(buf: &mut [u8], value: u64) {
    let width = buf.len();
    let mut tmp = [0u8; 8];
    LittleEndian::write_u64(&mut tmp, value);
    buf.copy_from_slice(&tmp[..width]);
}

fn read_uint_be(bytes: &[u8]) -> u64 {
    let mut tmp = [0u8; 8];
    tmp[8 - bytes.len()..].copy_from_slice(bytes);
    BigEndian::read_u64(&tmp)
}

fn read_uint_le(bytes: &[u8]) -> u64 {
    let mut tmp = [0u8; 8];
    tmp[..bytes.len()].copy_from_slice(bytes);
    LittleEndian::read_u64(&tmp)
}

impl TypeOps for IntegerType {
    fn size(&self) -> (usize, Option<usize>) {
        let bits = self.unit_size.bits();
        (bits, Some(bits))
    }

    fn can_parse(&self, bits: &BitVec) -> bool {
        if bits.len() != self.unit_size.bits() {
            return false;
        }
        match self.fixed {
            Some(v) => self.decode_value(bits).map(|d| d == v).unwrap_or(false),
            None => self.decode_value(bits).is_ok(),
        }
    }

    fn generate(&self, rng: &mut dyn RngCore) -> BitVec {
        let value = match self.fixed {
            Some(v) => v,
            None => {
                let (lo, hi) = self.interval;
                let span = (hi - lo) as u128 + 1;
                lo + (rng.next_u64() as u128 % span) as i128
            }
        };
        self.encode_value(value)
            .expect("sampled value is within the configured interval by construction")
    }

    fn encode(&self, raw: &[u8]) -> Result<BitVec, EngineError> {
        if raw.len() > 16 {
            return Err(EngineError::EncodingError(
                "raw integer representation too wide".into(),
            ));
        }
        let mut padded = [0u8; 16];
        padded[16 - raw.len()..].copy_from_slice(raw);
        let value = u128::from_be_bytes(padded) as i128;
        self.encode_value(value)
    }

    fn decode(&self, bits: &BitVec) -> Result<Vec<u8>, EngineError> {
        let value = self.decode_value(bits)?;
        Ok(value.to_be_bytes()[16 - self.byte_width()..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Endianness;

    #[test]
    fn round_trips_u16_big_endian() {
        let t = IntegerType::new(UnitSize::Bits16, Sign::Unsigned, Endianness::Big);
        let bits = t.encode_value(258).unwrap();
        assert_eq!(bits.to_bytes_be(), vec![0x01, 0x02]);
        assert_eq!(t.decode_value(&bits).unwrap(), 258);
    }

    #[test]
    fn fixed_value_constrains_can_parse() {
        let t = IntegerType::fixed(UnitSize::Bits8, Sign::Unsigned, Endianness::Big, 0xab);
        let good = BitVec::from_bytes_be(&[0xab]);
        let bad = BitVec::from_bytes_be(&[0xac]);
        assert!(t.can_parse(&good));
        assert!(!t.can_parse(&bad));
    }

    #[test]
    fn signed_little_endian_round_trips_negative() {
        let t = IntegerType::new(UnitSize::Bits32, Sign::Signed, Endianness::Little);
        let bits = t.encode_value(-12345).unwrap();
        assert_eq!(t.decode_value(&bits).unwrap(), -12345);
    }

    #[test]
    fn out_of_interval_value_fails_to_encode() {
        let t = IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big).with_interval(0, 10);
        assert!(t.encode_value(11).is_err());
    }
}
