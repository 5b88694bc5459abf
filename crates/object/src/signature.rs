//! DER and raw fixed-width signature encodings
//!
//! Tokens return ECDSA signatures as `r || s`, each component exactly
//! `ceil(bits / 8)` bytes. Callers above PKCS#11 often hold the DER form:
//!
//! ```text
//! SEQUENCE { INTEGER r, INTEGER s }
//! ```

use bytes::Bytes;
use coolkey_core::ByteBuffer;

use crate::der::tlv::{DerCursor, Tlv, tag, write_header};
use crate::error::Structure;
use crate::{Error, Result};

/// A DER-encoded `(r, s)` signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerSignature {
    der: Bytes,
}

impl DerSignature {
    /// Wrap DER signature bytes
    pub fn new(der: impl Into<Bytes>) -> Self {
        Self { der: der.into() }
    }

    /// The DER encoding
    pub fn as_bytes(&self) -> &[u8] {
        &self.der
    }

    /// Convert to `r || s` for a key of `key_bits` bits
    ///
    /// Components longer than the key size must carry only leading zero
    /// bytes, which are dropped. Shorter components are left-padded.
    pub fn to_raw(&self, key_bits: usize) -> Result<ByteBuffer> {
        let width = key_bits.div_ceil(8);
        let (r, s) = self.components().ok_or(Error::Decode(Structure::Signature))?;

        let mut raw = ByteBuffer::with_capacity(2 * width)?;
        for component in [r, s] {
            let component = fit_component(component, width)?;
            raw.resize(raw.len() + width - component.len())?;
            raw.append_slice(component)?;
        }
        Ok(raw)
    }

    /// Encode a raw `r || s` signature as DER
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() || raw.len() % 2 != 0 {
            return Err(Error::Decode(Structure::Signature));
        }
        let (r, s) = raw.split_at(raw.len() / 2);

        let mut integers = ByteBuffer::new();
        append_unsigned_integer(&mut integers, r)?;
        append_unsigned_integer(&mut integers, s)?;

        let mut der = ByteBuffer::with_capacity(integers.len() + 4)?;
        write_header(&mut der, tag::SEQUENCE, integers.len())?;
        der.append_slice(&integers)?;
        Ok(Self::new(der.freeze()))
    }

    fn components(&self) -> Option<(&[u8], &[u8])> {
        let sequence = Tlv::parse(&self.der)?;
        let mut integers = DerCursor::new(sequence.value());
        let r = integers.next()?.value();
        let s = integers.next()?.value();
        Some((r, s))
    }
}

/// Drop DER sign padding so that `component` is at most `width` bytes
fn fit_component(component: &[u8], width: usize) -> Result<&[u8]> {
    let Some(excess) = component.len().checked_sub(width) else {
        return Ok(component);
    };
    let (padding, value) = component.split_at(excess);
    if padding.iter().any(|b| *b != 0) {
        return Err(Error::Decode(Structure::Signature));
    }
    Ok(value)
}

/// Append `value` as a non-negative DER INTEGER
fn append_unsigned_integer(out: &mut ByteBuffer, value: &[u8]) -> Result<()> {
    let first = value
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(value.len().saturating_sub(1));
    let value = &value[first..];
    let sign_pad = value.first().is_some_and(|b| b & 0x80 != 0);

    write_header(out, tag::INTEGER, value.len() + usize::from(sign_pad))?;
    if sign_pad {
        out.append_u8(0)?;
    }
    out.append_slice(value)?;
    Ok(())
}
