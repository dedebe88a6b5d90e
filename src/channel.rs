//! Channel collaborators (spec §6): opaque message carriers and the
//! transport contract `FlowParser` consumes. Behavior lives entirely with
//! whoever implements `Channel`; this crate only needs the shapes to
//! compile against.

use crate::error::EngineError;

/// An opaque message as handed to `parse_flow` by a capture source (spec
/// §6 "PCAP / channel collaborators"). `source`/`destination` are
/// transport-addressing metadata (e.g. socket peers); `date` is a capture
/// timestamp. None of the three affect parsing — they're carried through
/// for a caller's own bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub data: Vec<u8>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub date: Option<i64>,
}

impl RawMessage {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            source: None,
            destination: None,
            date: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_date(mut self, date: i64) -> Self {
        self.date = Some(date);
        self
    }
}

/// A transport capable of exchanging `RawMessage`s. Out of scope for this
/// engine's own behavior (spec §6): no implementation ships here, only the
/// contract a caller's transport adapter must satisfy to feed `FlowParser`
/// or to carry a `Symbol::specialize` result onto the wire.
pub trait Channel {
    fn open(&mut self) -> Result<(), EngineError>;
    fn close(&mut self) -> Result<(), EngineError>;
    fn read(&mut self) -> Result<RawMessage, EngineError>;
    fn write(&mut self, data: &[u8]) -> Result<usize, EngineError>;
    fn send_receive(&mut self, data: &[u8]) -> Result<RawMessage, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_optional_metadata() {
        let msg = RawMessage::new(vec![1, 2, 3])
            .with_source("10.0.0.1:9000")
            .with_destination("10.0.0.2:9000")
            .with_date(1_700_000_000);
        assert_eq!(msg.data, vec![1, 2, 3]);
        assert_eq!(msg.source.as_deref(), Some("10.0.0.1:9000"));
        assert_eq!(msg.destination.as_deref(), Some("10.0.0.2:9000"));
        assert_eq!(msg.date, Some(1_700_000_000));
    }
}
