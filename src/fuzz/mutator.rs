//! Mutator kinds and modes (spec §4.7).

use crate::bits::BitVec;
use crate::types::{DataType, IntegerType, TypeOps};

use super::prng::{PrngAlgorithm, PrngPool};

/// How a `Mutator` produces its value (spec §4.7 "Modes per mutator").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzingMode {
    /// Produce a fresh mutated value in place of `generate()`.
    Generate,
    /// Call `generate()` then perturb bits.
    Mutate,
    /// Return a constant.
    Fixed,
    /// Pass-through: defer to the type's own `generate()`.
    None,
}

/// The strategy a `Mutator` applies (spec §4.7 "Mutator kinds").
#[derive(Debug, Clone)]
pub enum MutatorKind {
    /// Seeded PRNG over a bounded interval; `Integer` only.
    PseudoRandomInteger { interval: (i128, i128) },
    /// Enumerates interval endpoints and special values (spec §B:
    /// `{0, 1, min, max, min+1, max-1}`).
    DeterministicInteger,
    /// Naughty-string table plus length fuzzing; `String` only.
    StringMutator {
        naughty: Vec<Vec<u8>>,
        truncate_terminator: bool,
    },
    /// `Alt`/`Agg`/`Repeat` overlay: emits a child index (`Alt`),
    /// propagates to every child (`Agg`), or perturbs a count (`Repeat`).
    Composite {
        mutate_child: bool,
        max_depth: u32,
    },
}

/// A concrete fuzzing strategy attached to a type or a variable (spec §6
/// `Fuzz.set`).
#[derive(Debug, Clone)]
pub struct Mutator {
    pub kind: MutatorKind,
    pub mode: FuzzingMode,
    pub generator: PrngAlgorithm,
    pub counter_max: Option<u64>,
    pub fixed_value: Option<BitVec>,
}

impl Mutator {
    pub fn new(kind: MutatorKind) -> Self {
        Self {
            kind,
            mode: FuzzingMode::Generate,
            generator: PrngAlgorithm::default(),
            counter_max: None,
            fixed_value: None,
        }
    }

    pub fn with_mode(mut self, mode: FuzzingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_generator(mut self, generator: PrngAlgorithm) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_counter_max(mut self, counter_max: u64) -> Self {
        self.counter_max = Some(counter_max);
        self
    }

    pub fn fixed(value: BitVec) -> Self {
        Self {
            kind: MutatorKind::DeterministicInteger,
            mode: FuzzingMode::Fixed,
            generator: PrngAlgorithm::default(),
            counter_max: None,
            fixed_value: Some(value),
        }
    }

    /// Produces a mutated leaf value for a `Data` leaf of type `ty`.
    /// Returns `None` when this mutator's kind doesn't apply to `ty`
    /// (e.g. a `StringMutator` installed on an `Integer` field) — the
    /// caller falls back to `ty.generate()`.
    pub fn produce_leaf(&self, prngs: &mut PrngPool, ty: &DataType) -> Option<BitVec> {
        if self.mode == FuzzingMode::Fixed {
            return self.fixed_value.clone();
        }
        if self.mode == FuzzingMode::None {
            return None;
        }

        let base = match &self.kind {
            MutatorKind::PseudoRandomInteger { interval } => pseudo_random_integer(prngs, self.generator, ty, *interval)?,
            MutatorKind::DeterministicInteger => deterministic_integer(prngs, self.generator, ty)?,
            MutatorKind::StringMutator {
                naughty,
                truncate_terminator,
            } => string_mutator(prngs, self.generator, ty, naughty, *truncate_terminator)?,
            MutatorKind::Composite { .. } => return None,
        };

        if self.mode == FuzzingMode::Mutate {
            Some(bitflip(base, prngs, self.generator))
        } else {
            Some(base)
        }
    }
}

fn pseudo_random_integer(
    prngs: &mut PrngPool,
    generator: PrngAlgorithm,
    ty: &DataType,
    interval: (i128, i128),
) -> Option<BitVec> {
    let DataType::Integer(int_ty) = ty else { return None };
    let (lo, hi) = interval;
    let span = (hi - lo) as u128 + 1;
    let draw = prngs.next_u64(generator) as u128 % span;
    let value = lo + draw as i128;
    int_ty.clone().with_interval(lo, hi).encode_value(value).ok()
}

/// Boundary set `{0, 1, min, max, min+1, max-1}` (spec §B), cycled by the
/// mutator's configured generator cursor.
fn deterministic_integer(prngs: &mut PrngPool, generator: PrngAlgorithm, ty: &DataType) -> Option<BitVec> {
    let DataType::Integer(int_ty) = ty else { return None };
    let (min, max) = int_ty.interval;
    let mut boundaries = vec![0, 1, min, max];
    if min + 1 <= max {
        boundaries.push(min + 1);
    }
    if max - 1 >= min {
        boundaries.push(max - 1);
    }
    boundaries.retain(|v| *v >= min && *v <= max);
    boundaries.dedup();
    if boundaries.is_empty() {
        return None;
    }
    let index = (prngs.next_u64(generator) as usize) % boundaries.len();
    int_ty.encode_value(boundaries[index]).ok()
}

fn string_mutator(
    prngs: &mut PrngPool,
    generator: PrngAlgorithm,
    ty: &DataType,
    naughty: &[Vec<u8>],
    truncate_terminator: bool,
) -> Option<BitVec> {
    let DataType::String(string_ty) = ty else { return None };
    if naughty.is_empty() {
        return None;
    }
    let index = (prngs.next_u64(generator) as usize) % naughty.len();
    let mut body = naughty[index].clone();
    if let Some(eos) = &string_ty.eos {
        if !truncate_terminator {
            body.extend_from_slice(eos);
        }
    }
    Some(BitVec::from_bytes_be(&body))
}

fn bitflip(value: BitVec, prngs: &mut PrngPool, generator: PrngAlgorithm) -> BitVec {
    if value.is_empty() {
        return value;
    }
    let index = (prngs.next_u64(generator) as usize) % value.len();
    let mut bits: Vec<bool> = value.as_bools().to_vec();
    bits[index] = !bits[index];
    BitVec::from_bits(bits).with_tag(value.endianness())
}

/// A default `DeterministicInteger`-backed naughty-string table (spec
/// §B). The original ships a much larger external list; this is a
/// representative in-crate subset.
pub fn default_naughty_strings() -> Vec<Vec<u8>> {
    vec![
        b"".to_vec(),
        vec![b'A'; 4096],
        b"\x00embedded-nul".to_vec(),
        vec![0xff, 0xfe, 0xfd],
        b"%s%s%s%n".to_vec(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Endianness;
    use crate::types::{Sign, UnitSize};

    #[test]
    fn pseudo_random_integer_stays_in_interval() {
        let ty = DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big));
        let mutator = Mutator::new(MutatorKind::PseudoRandomInteger { interval: (10, 20) });
        let mut prngs = PrngPool::new(7);
        for _ in 0..16 {
            let bits = mutator.produce_leaf(&mut prngs, &ty).unwrap();
            let value = match &ty {
                DataType::Integer(t) => t.decode_value(&bits).unwrap(),
                _ => unreachable!(),
            };
            assert!((10..=20).contains(&value));
        }
    }

    #[test]
    fn deterministic_integer_only_applies_to_integers() {
        let ty = DataType::Raw(crate::types::RawType::new((1, Some(1))));
        let mutator = Mutator::new(MutatorKind::DeterministicInteger);
        let mut prngs = PrngPool::new(1);
        assert!(mutator.produce_leaf(&mut prngs, &ty).is_none());
    }

    #[test]
    fn fixed_mode_always_returns_the_same_bits() {
        let value = BitVec::from_bytes_be(&[0xaa]);
        let mutator = Mutator::fixed(value.clone());
        let mut prngs = PrngPool::new(3);
        let ty = DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big));
        assert_eq!(mutator.produce_leaf(&mut prngs, &ty).unwrap().to_bytes_be(), value.to_bytes_be());
    }
}
