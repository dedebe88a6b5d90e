//! The primitive type catalog (spec §2.2, §4.1).
//!
//! Every primitive exposes the same closed capability set —
//! `size`/`can_parse`/`generate`/`encode`/`decode` — behind the `TypeOps`
//! trait. `DataType` is a closed sum type over the seven primitives this
//! engine understands, rather than open dynamic dispatch across an
//! extensible type hierarchy (spec §9 design note).

use rand_core::RngCore;

use crate::bits::BitVec;
pub use crate::error::EngineError;

pub mod bitarray;
pub mod integer;
pub mod ipv4;
pub mod raw;
pub mod string;
pub mod timestamp;

pub use bitarray::BitArrayType;
pub use integer::IntegerType;
pub use ipv4::Ipv4Type;
pub use raw::{HexaStringType, RawType};
pub use string::StringType;
pub use timestamp::TimestampType;

/// Sign of an `Integer` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Signed,
    Unsigned,
}

/// Storage width, in bits, of an `Integer` value. The 1/4/24-bit widths
/// exist only as `length_bit_size` options for the fuzzing overlay (spec
/// §6 Fuzz API); `Integer` itself only ever stores on an 8/16/32/64-bit
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitSize {
    Bits1,
    Bits4,
    Bits8,
    Bits16,
    Bits24,
    Bits32,
    Bits64,
}

impl UnitSize {
    pub const fn bits(self) -> usize {
        match self {
            UnitSize::Bits1 => 1,
            UnitSize::Bits4 => 4,
            UnitSize::Bits8 => 8,
            UnitSize::Bits16 => 16,
            UnitSize::Bits24 => 24,
            UnitSize::Bits32 => 32,
            UnitSize::Bits64 => 64,
        }
    }

    /// Rounds `width` up to the nearest storage width this engine
    /// actually stores integers at (8/16/24/32/64 bits). Used when a
    /// relation's `encoding_type` is not itself an `Integer` and a width
    /// must be inferred from the target type's declared bit size.
    pub fn from_bits(width: usize) -> Result<UnitSize, EngineError> {
        Ok(match width {
            0..=8 => UnitSize::Bits8,
            9..=16 => UnitSize::Bits16,
            17..=24 => UnitSize::Bits24,
            25..=32 => UnitSize::Bits32,
            33..=64 => UnitSize::Bits64,
            _ => {
                return Err(EngineError::EncodingError(format!(
                    "no integer storage width covers {} bits",
                    width
                )))
            }
        })
    }
}

/// An inclusive `[min, max]` bit-length bound. `max = None` means
/// unbounded (only `String` and some `Raw`/`HexaString` configurations).
pub type SizeBounds = (usize, Option<usize>);

/// The capability set every primitive type exposes.
pub trait TypeOps {
    /// Static bit-length bounds.
    fn size(&self) -> SizeBounds;

    /// Total function: checks bit-length bounds and, if a fixed value is
    /// set, equality against it.
    fn can_parse(&self, bits: &BitVec) -> bool;

    /// If a fixed value is set, returns it; else samples uniformly.
    fn generate(&self, rng: &mut dyn RngCore) -> BitVec;

    /// Encodes a raw byte representation into bits.
    fn encode(&self, raw: &[u8]) -> Result<BitVec, EngineError>;

    /// Decodes bits into their raw byte representation.
    fn decode(&self, bits: &BitVec) -> Result<Vec<u8>, EngineError>;
}

/// The closed catalog of primitive data types a `Data` leaf may wrap.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Integer(IntegerType),
    String(StringType),
    Raw(RawType),
    HexaString(HexaStringType),
    BitArray(BitArrayType),
    Ipv4(Ipv4Type),
    Timestamp(TimestampType),
}

impl TypeOps for DataType {
    fn size(&self) -> SizeBounds {
        match self {
            DataType::Integer(t) => t.size(),
            DataType::String(t) => t.size(),
            DataType::Raw(t) => t.size(),
            DataType::HexaString(t) => t.size(),
            DataType::BitArray(t) => t.size(),
            DataType::Ipv4(t) => t.size(),
            DataType::Timestamp(t) => t.size(),
        }
    }

    fn can_parse(&self, bits: &BitVec) -> bool {
        match self {
            DataType::Integer(t) => t.can_parse(bits),
            DataType::String(t) => t.can_parse(bits),
            DataType::Raw(t) => t.can_parse(bits),
            DataType::HexaString(t) => t.can_parse(bits),
            DataType::BitArray(t) => t.can_parse(bits),
            DataType::Ipv4(t) => t.can_parse(bits),
            DataType::Timestamp(t) => t.can_parse(bits),
        }
    }

    fn generate(&self, rng: &mut dyn RngCore) -> BitVec {
        match self {
            DataType::Integer(t) => t.generate(rng),
            DataType::String(t) => t.generate(rng),
            DataType::Raw(t) => t.generate(rng),
            DataType::HexaString(t) => t.generate(rng),
            DataType::BitArray(t) => t.generate(rng),
            DataType::Ipv4(t) => t.generate(rng),
            DataType::Timestamp(t) => t.generate(rng),
        }
    }

    fn encode(&self, raw: &[u8]) -> Result<BitVec, EngineError> {
        match self {
            DataType::Integer(t) => t.encode(raw),
            DataType::String(t) => t.encode(raw),
            DataType::Raw(t) => t.encode(raw),
            DataType::HexaString(t) => t.encode(raw),
            DataType::BitArray(t) => t.encode(raw),
            DataType::Ipv4(t) => t.encode(raw),
            DataType::Timestamp(t) => t.encode(raw),
        }
    }

    fn decode(&self, bits: &BitVec) -> Result<Vec<u8>, EngineError> {
        match self {
            DataType::Integer(t) => t.decode(bits),
            DataType::String(t) => t.decode(bits),
            DataType::Raw(t) => t.decode(bits),
            DataType::HexaString(t) => t.decode(bits),
            DataType::BitArray(t) => t.decode(bits),
            DataType::Ipv4(t) => t.decode(bits),
            DataType::Timestamp(t) => t.decode(bits),
        }
    }
}

/// Samples a uniform `usize` length in `[min, upper]`, where `upper` is
/// `max` clamped to `hard_cap` when `max` is `None`. Shared by every
/// `generate` impl that has a variable-length domain.
pub(crate) fn sample_len(rng: &mut dyn RngCore, min: usize, max: Option<usize>, hard_cap: usize) -> usize {
    let upper = max.unwrap_or(hard_cap).max(min);
    if upper == min {
        return min;
    }
    min + (rng.next_u64() as usize) % (upper - min + 1)
}
