//! `FlowParser` backtracking segmentation (spec §4.6, §6).

use protospec::bits::{BitVec, Endianness};
use protospec::tree::{symbol_of, Scope, TreeBuilder};
use protospec::types::{DataType, IntegerType, RawType, Sign, UnitSize};
use protospec::{EngineLimits, FlowParser, Memory};

fn uint8() -> DataType {
    DataType::Integer(IntegerType::new(UnitSize::Bits8, Sign::Unsigned, Endianness::Big))
}

#[test]
fn two_uint8_symbols_segment_a_two_byte_stream() {
    let mut b = TreeBuilder::new();
    let v1 = b.data(uint8(), Scope::None);
    let v2 = b.data(uint8(), Scope::None);
    let s1 = symbol_of(&mut b, "s1", v1).unwrap();
    let s2 = symbol_of(&mut b, "s2", v2).unwrap();
    let symbols = vec![s1, s2];

    let flow = FlowParser::new(&b.arena);
    let segmentations = flow
        .parse_flow(&symbols, BitVec::from_bytes_be(&[0x01, 0x02]), &Memory::new())
        .unwrap();

    assert!(segmentations.iter().any(|seg| seg.len() == 2));
}

#[test]
fn an_ambiguous_stream_yields_more_than_one_segmentation() {
    // Two candidate symbols of different fixed widths cut a 4-byte
    // stream more than one way.
    let mut b = TreeBuilder::new();
    let short = b.data(DataType::Raw(RawType::new((1, Some(1)))), Scope::None);
    let long = b.data(DataType::Raw(RawType::new((2, Some(2)))), Scope::None);
    let s_short = symbol_of(&mut b, "short", short).unwrap();
    let s_long = symbol_of(&mut b, "long", long).unwrap();
    let symbols = vec![s_short, s_long];

    let flow = FlowParser::new(&b.arena);
    let segmentations = flow
        .parse_flow(&symbols, BitVec::from_bytes_be(&[1, 2, 3, 4]), &Memory::new())
        .unwrap();

    assert!(segmentations.len() > 1);
}

#[test]
fn no_candidate_symbol_matching_yields_no_segmentation() {
    let mut b = TreeBuilder::new();
    let fixed = b.data(DataType::Raw(RawType::fixed(vec![0xaa])), Scope::None);
    let only = symbol_of(&mut b, "only_aa", fixed).unwrap();
    let symbols = vec![only];

    let flow = FlowParser::with_limits(&b.arena, EngineLimits::default());
    let segmentations = flow
        .parse_flow(&symbols, BitVec::from_bytes_be(&[0xbb]), &Memory::new())
        .unwrap();
    assert!(segmentations.is_empty());
}
