//! Relation resolution (spec §4.4), shared by the parser and the
//! specializer. A `Relation` is a pure function of the concatenated
//! encoded form of its targets.

use crate::bits::BitVec;
use crate::error::EngineError;
use crate::tree::RelationKind;
use crate::types::{DataType, IntegerType, TypeOps};

/// Computes the bits a `Relation` leaf must carry, given the concatenated
/// encoded bits of its already-bound targets.
pub fn resolve(
    kind: RelationKind,
    encoding_type: &DataType,
    factor: f64,
    offset: i64,
    modulo: Option<u64>,
    targets_concat: &BitVec,
) -> Result<BitVec, EngineError> {
    match kind {
        RelationKind::Size => {
            let measured = targets_concat.len() as f64 * factor + offset as f64;
            encode_integer(encoding_type, measured.round() as i128)
        }
        RelationKind::Value => Ok(targets_concat.clone()),
        RelationKind::Checksum => {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&targets_concat.to_bytes_be());
            let crc = hasher.finalize();
            encode_integer(encoding_type, crc as i128)
        }
        RelationKind::Padding => {
            let modulo = modulo.ok_or_else(|| {
                EngineError::ValueError("Padding relation requires a modulo".into())
            })?;
            let prefix_bits = targets_concat.len() as u64;
            let pad_bits = (modulo - (prefix_bits % modulo)) % modulo;
            Ok((0..pad_bits).map(|_| false).collect())
        }
    }
}

fn encode_integer(encoding_type: &DataType, value: i128) -> Result<BitVec, EngineError> {
    match encoding_type {
        DataType::Integer(int_ty) => int_ty.encode_value(value),
        other => {
            let width = other.size().0.max(8);
            let int_ty = IntegerType::new(
                crate::types::UnitSize::from_bits(width)?,
                crate::types::Sign::Unsigned,
                crate::bits::Endianness::Big,
            );
            int_ty.encode_value(value)
        }
    }
}

/// Verifies a previously computed/parsed relation value against what
/// `resolve` would produce — used by the parser's `valueCMP`-style checks
/// and by the round-trip property tests in spec §8.
pub fn verify(
    kind: RelationKind,
    encoding_type: &DataType,
    factor: f64,
    offset: i64,
    modulo: Option<u64>,
    targets_concat: &BitVec,
    actual: &BitVec,
) -> Result<bool, EngineError> {
    let expected = resolve(kind, encoding_type, factor, offset, modulo, targets_concat)?;
    Ok(expected.as_bools() == actual.as_bools())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Endianness;
    use crate::types::{Sign, UnitSize};

    #[test]
    fn size_relation_counts_bytes_via_factor() {
        let encoding = DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big));
        let target = BitVec::from_bytes_be(&[0xab]); // 8 bits
        let size_bits = resolve(RelationKind::Size, &encoding, 1.0 / 8.0, 0, None, &target).unwrap();
        assert_eq!(size_bits.to_bytes_be(), vec![1]);
    }

    #[test]
    fn value_relation_is_identity() {
        let encoding = DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big));
        let target = BitVec::from_bytes_be(&[0xab]);
        let value_bits = resolve(RelationKind::Value, &encoding, 1.0, 0, None, &target).unwrap();
        assert_eq!(value_bits.to_bytes_be(), vec![0xab]);
    }

    #[test]
    fn padding_fills_to_modulo() {
        let encoding = DataType::BitArray(crate::types::BitArrayType::new((0, None)));
        let target = BitVec::from_bytes_be(&[0u8; 58]); // 464 bits
        let pad = resolve(RelationKind::Padding, &encoding, 1.0, 0, Some(60 * 8), &target).unwrap();
        assert_eq!(target.len() + pad.len(), 60 * 8);
    }
}
