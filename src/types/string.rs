//! `String`: UTF-8 byte sequences with an optional character-count bound
//! and an optional end-of-string sentinel.

use rand_core::RngCore;

use crate::bits::BitVec;
use crate::error::EngineError;

use super::{sample_len, TypeOps};

const HARD_CAP_BYTES: usize = 4096;
const PRINTABLE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789 ";

/// `nb_chars` is a character-count bound (spec §2.2); tracked here as a
/// byte-count bound directly (every generated/parsed string is
/// restricted to single-byte UTF-8 codepoints), which keeps the
/// bit-length bookkeeping exact without a variable-width accounting pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StringType {
    pub nb_chars: (usize, Option<usize>),
    pub eos: Option<Vec<u8>>,
    pub fixed: Option<String>,
}

impl StringType {
    pub fn new(nb_chars: (usize, Option<usize>)) -> Self {
        Self {
            nb_chars,
            eos: None,
            fixed: None,
        }
    }

    pub fn fixed(value: impl Into<String>) -> Self {
        let value = value.into();
        let len = value.len();
        Self {
            nb_chars: (len, Some(len)),
            eos: None,
            fixed: Some(value),
        }
    }

    pub fn with_eos(mut self, eos: impl Into<Vec<u8>>) -> Self {
        self.eos = Some(eos.into());
        self
    }

    fn eos_len(&self) -> usize {
        self.eos.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// Splits `bytes` into its body given this type's terminator
    /// configuration. Returns `None` if a configured terminator is absent.
    fn strip_eos<'a>(&self, bytes: &'a [u8]) -> Option<&'a [u8]> {
        match &self.eos {
            Some(eos) => bytes.strip_suffix(eos.as_slice()),
            None => Some(bytes),
        }
    }
}

impl TypeOps for StringType {
    fn size(&self) -> (usize, Option<usize>) {
        let eos = self.eos_len();
        let min = (self.nb_chars.0 + eos) * 8;
        let max = self.nb_chars.1.map(|m| (m + eos) * 8);
        (min, max)
    }

    fn can_parse(&self, bits: &BitVec) -> bool {
        if bits.len() % 8 != 0 {
            return false;
        }
        let bytes = bits.to_bytes_be();
        match self.strip_eos(&bytes) {
            Some(body) => self.check_body(body),
            None => false,
        }
    }

    fn generate(&self, rng: &mut dyn RngCore) -> BitVec {
        let body: Vec<u8> = if let Some(fixed) = &self.fixed {
            fixed.as_bytes().to_vec()
        } else {
            let len = sample_len(rng, self.nb_chars.0, self.nb_chars.1, HARD_CAP_BYTES);
            (0..len)
                .map(|_| PRINTABLE[rng.next_u32() as usize % PRINTABLE.len()])
                .collect()
        };
        let mut out = body;
        if let Some(eos) = &self.eos {
            out.extend_from_slice(eos);
        }
        BitVec::from_bytes_be(&out)
    }

    fn encode(&self, raw: &[u8]) -> Result<BitVec, EngineError> {
        std::str::from_utf8(raw)
            .map_err(|e| EngineError::EncodingError(format!("not valid UTF-8: {}", e)))?;
        if !self.check_body(raw) {
            return Err(EngineError::EncodingError(
                "string length outside nb_chars bounds".into(),
            ));
        }
        let mut out = raw.to_vec();
        if let Some(eos) = &self.eos {
            out.extend_from_slice(eos);
        }
        Ok(BitVec::from_bytes_be(&out))
    }

    fn decode(&self, bits: &BitVec) -> Result<Vec<u8>, EngineError> {
        let bytes = bits.to_bytes_be();
        self.strip_eos(&bytes)
            .map(|body| body.to_vec())
            .ok_or_else(|| EngineError::EncodingError("expected terminator not found".into()))
    }
}

impl StringType {
    fn check_body(&self, body: &[u8]) -> bool {
        if std::str::from_utf8(body).is_err() {
            return false;
        }
        if let Some(fixed) = &self.fixed {
            return body == fixed.as_bytes();
        }
        let len = body.len();
        len >= self.nb_chars.0 && self.nb_chars.1.map(|m| len <= m).unwrap_or(true)
    }
}
