//! `Alt`/`Repeat` semantics (spec §8 concrete scenarios 3-4): a
//! deterministic `Alt` callback picks the same child both ways, and
//! `Repeat` bounds are honored by both the parser and the specializer.

use std::cell::Cell;
use std::rc::Rc;

use protospec::bits::{BitVec, Endianness};
use protospec::tree::{Field, Scope, Symbol, TreeBuilder};
use protospec::types::{DataType, IntegerType, RawType, Sign, UnitSize};
use protospec::{EngineError, EngineLimits, Memory, MessageParser, SpecializeOutcome};

fn uint8() -> DataType {
    DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big))
}

fn specialize_once(symbol: &Symbol, arena: &protospec::VariableArena) -> BitVec {
    match symbol
        .specialize(arena, Memory::new(), None, &EngineLimits::default())
        .unwrap()
    {
        SpecializeOutcome::Produced(path) => path.output,
        SpecializeOutcome::FuzzExhausted => panic!("no fuzz configured"),
    }
}

#[test]
fn alt_callback_returning_a_positive_index_picks_that_child() {
    let mut b = TreeBuilder::new();
    let a = b.data(DataType::Raw(RawType::fixed(*b"A")), Scope::None);
    let c = b.data(DataType::Raw(RawType::fixed(*b"B")), Scope::None);
    let cb = TreeBuilder::callback(|| 1);
    let alt = b.alt(vec![a, c], Some(cb)).unwrap();
    let symbol = Symbol::new(&mut b, "pick_b", vec![Field::new(alt)]).unwrap();

    let bits = specialize_once(&symbol, &b.arena);
    assert_eq!(bits.to_bytes_be(), b"B".to_vec());
}

#[test]
fn alt_with_no_callback_parses_every_child_that_matches() {
    let mut b = TreeBuilder::new();
    let a = b.data(DataType::Raw(RawType::fixed(*b"A")), Scope::None);
    let c = b.data(DataType::Raw(RawType::fixed(*b"B")), Scope::None);
    let alt = b.alt(vec![a, c], None).unwrap();
    let symbol = Symbol::new(&mut b, "either", vec![Field::new(alt)]).unwrap();

    let parser = MessageParser::new(&b.arena);
    let a_paths = parser
        .parse_bitarray(symbol.root(), BitVec::from_bytes_be(b"A"), Memory::new(), true)
        .unwrap();
    assert!(!a_paths.is_empty());
    let b_paths = parser
        .parse_bitarray(symbol.root(), BitVec::from_bytes_be(b"B"), Memory::new(), true)
        .unwrap();
    assert!(!b_paths.is_empty());
    let neither = parser
        .parse_bitarray(symbol.root(), BitVec::from_bytes_be(b"Z"), Memory::new(), true)
        .unwrap();
    assert!(neither.is_empty());
}

#[test]
fn repeat_within_bounds_parses_every_valid_count() {
    let mut b = TreeBuilder::new();
    let item = b.data(uint8(), Scope::None);
    let rep = b.repeat(item, (2, Some(4)), None).unwrap();
    let symbol = Symbol::new(&mut b, "listish", vec![Field::new(rep)]).unwrap();

    let parser = MessageParser::new(&b.arena);

    // Below the minimum, no path should consume the whole input.
    let too_short = parser
        .parse_bitarray(symbol.root(), BitVec::from_bytes_be(&[1]), Memory::new(), true)
        .unwrap();
    assert!(too_short.is_empty());

    // Within bounds, at least one path consumes exactly 3 bytes.
    let within = parser
        .parse_bitarray(symbol.root(), BitVec::from_bytes_be(&[1, 2, 3]), Memory::new(), true)
        .unwrap();
    assert!(!within.is_empty());

    // Above the maximum, no path consumes the whole 5-byte input.
    let too_long = parser
        .parse_bitarray(symbol.root(), BitVec::from_bytes_be(&[1, 2, 3, 4, 5]), Memory::new(), true)
        .unwrap();
    assert!(too_long.is_empty());
}

#[test]
fn repeat_specializes_a_count_within_its_bounds() {
    let mut b = TreeBuilder::new();
    let item = b.data(uint8(), Scope::None);
    let rep = b.repeat(item, (2, Some(4)), None).unwrap();
    let symbol = Symbol::new(&mut b, "listish", vec![Field::new(rep)]).unwrap();

    let bits = specialize_once(&symbol, &b.arena);
    assert!((2..=4).contains(&bits.to_bytes_be().len()));
}

#[test]
fn repeat_with_a_delimiter_inserts_it_between_items_and_parses_back() {
    let mut b = TreeBuilder::new();
    let item = b.data(uint8(), Scope::None);
    let delim = BitVec::from_bytes_be(&[0xff]);
    let rep = b.repeat(item, (3, Some(3)), Some(delim)).unwrap();
    let symbol = Symbol::new(&mut b, "delimited", vec![Field::new(rep)]).unwrap();

    let bits = specialize_once(&symbol, &b.arena);
    assert_eq!(bits.len(), 8 * (3 + 2)); // 3 items + 2 delimiters

    let parser = MessageParser::new(&b.arena);
    let paths = parser
        .parse_bitarray(symbol.root(), bits, Memory::new(), true)
        .unwrap();
    assert!(!paths.is_empty());
}

#[test]
fn a_self_referential_alt_terminates_within_max_alt_depth() {
    let mut b = TreeBuilder::new();
    let base_case = b.data(uint8(), Scope::None);
    let recursive_alt = b.forward_alt();
    let recurse_into_self = recursive_alt.var_id();

    let calls = Rc::new(Cell::new(0u64));
    let calls_in_cb = calls.clone();
    let always_recurse = TreeBuilder::callback(move || {
        calls_in_cb.set(calls_in_cb.get() + 1);
        1 // always picks the second child: itself
    });
    let root = b
        .finish_alt(recursive_alt, vec![base_case, recurse_into_self], Some(always_recurse))
        .unwrap();
    let symbol = Symbol::new(&mut b, "recursive_alt", vec![Field::new(root)]).unwrap();

    let limits = EngineLimits {
        max_alt_depth: 3,
        ..EngineLimits::default()
    };

    // The specializer is the deterministic walk, so it recurses exactly
    // `max_alt_depth` times before `RecursionLimit` halts it.
    let outcome = symbol.specialize(&b.arena, Memory::new(), None, &limits);
    match outcome {
        Err(EngineError::RecursionLimit { max_depth: 3 }) => {}
        other => panic!("expected RecursionLimit{{max_depth: 3}}, got {:?}", other),
    }
    assert_eq!(calls.get(), 3);

    // The parser follows the same callback-driven branch and, finding no
    // base case within the depth bound, silently prunes to no paths
    // rather than recursing forever.
    let parser = MessageParser::with_limits(&b.arena, limits);
    let paths = parser
        .parse_bitarray(symbol.root(), BitVec::from_bytes_be(&[7]), Memory::new(), true)
        .unwrap();
    assert!(paths.is_empty());
}
