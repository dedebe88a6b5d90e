//! `IPv4`: a fixed 32-bit address.

use rand_core::RngCore;
use std::net::Ipv4Addr;

use crate::bits::BitVec;
use crate::error::EngineError;

use super::TypeOps;

#[derive(Debug, Clone, PartialEq)]
pub struct Ipv4Type {
    pub fixed: Option<Ipv4Addr>,
}

impl Ipv4Type {
    pub fn new() -> Self {
        Self { fixed: None }
    }

    pub fn fixed(addr: Ipv4Addr) -> Self {
        Self { fixed: Some(addr) }
    }
}

impl Default for Ipv4Type {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeOps for Ipv4Type {
    fn size(&self) -> (usize, Option<usize>) {
        (32, Some(32))
    }

    fn can_parse(&self, bits: &BitVec) -> bool {
        if bits.len() != 32 {
            return false;
        }
        match self.fixed {
            Some(addr) => bits.to_bytes_be() == addr.octets(),
            None => true,
        }
    }

    fn generate(&self, rng: &mut dyn RngCore) -> BitVec {
        let octets = match self.fixed {
            Some(addr) => addr.octets(),
            None => {
                let mut buf = [0u8; 4];
                rng.fill_bytes(&mut buf);
                buf
            }
        };
        BitVec::from_bytes_be(&octets)
    }

    fn encode(&self, raw: &[u8]) -> Result<BitVec, EngineError> {
        if raw.len() != 4 {
            return Err(EngineError::EncodingError(
                "IPv4 address must be exactly 4 bytes".into(),
            ));
        }
        Ok(BitVec::from_bytes_be(raw))
    }

    fn decode(&self, bits: &BitVec) -> Result<Vec<u8>, EngineError> {
        if bits.len() != 32 {
            return Err(EngineError::EncodingError(
                "IPv4 address must be exactly 32 bits".into(),
            ));
        }
        Ok(bits.to_bytes_be())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_address() {
        let t = Ipv4Type::new();
        let bits = t.encode(&[192, 168, 1, 1]).unwrap();
        assert_eq!(t.decode(&bits).unwrap(), vec![192, 168, 1, 1]);
    }
}
