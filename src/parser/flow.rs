//! Flow parsing (spec §4.6): decomposing a concatenated byte stream into
//! a sequence of `(symbol, assignment)` pairs.

use crate::bits::BitVec;
use crate::config::EngineLimits;
use crate::error::EngineError;
use crate::memory::Memory;
use crate::tree::Symbol;

use super::{parse, ParsingPath};

/// One recovered segment of a flow: which symbol matched, and the
/// resulting path (whose `assignments` carries the per-variable slices).
#[derive(Debug, Clone)]
pub struct FlowSegment<'a> {
    pub symbol: &'a Symbol,
    pub path: ParsingPath,
}

/// `FlowParser.parse_flow` (spec §6, §4.6): repeatedly tries every
/// candidate symbol against the front of `bits` with
/// `must_consume_everything=false`, then recurses on the remainder with
/// the same symbol list, yielding every complete segmentation. Ties are
/// broken by symbol declaration order, then by the parser's own ordering
/// rules (spec §5).
pub fn parse_flow<'a>(
    arena: &crate::tree::VariableArena,
    symbols: &'a [Symbol],
    bits: BitVec,
    memory: &Memory,
    limits: &EngineLimits,
) -> Result<Vec<Vec<FlowSegment<'a>>>, EngineError> {
    if bits.is_empty() {
        return Ok(vec![Vec::new()]);
    }

    let mut segmentations = Vec::new();
    for symbol in symbols {
        let candidates = parse(
            arena,
            symbol.root(),
            bits.clone(),
            memory.begin_message(),
            false,
            limits,
        )?;
        for path in candidates {
            let consumed = bits.len() - path.cursor.len();
            if consumed == 0 {
                // A zero-width match would recurse forever on the same
                // remainder; it can never contribute to a segmentation
                // of non-empty input.
                continue;
            }
            let remainder = path.cursor.clone();
            let rest = parse_flow(arena, symbols, remainder, memory, limits)?;
            for mut tail in rest {
                let mut segmentation = vec![FlowSegment { symbol, path: path.clone() }];
                segmentation.append(&mut tail);
                segmentations.push(segmentation);
            }
        }
    }
    Ok(segmentations)
}
