//! Growable byte buffer with positional field accessors
//!
//! [`ByteBuffer`] carries the card-facing byte layouts: APDU frames, on-card object
//! blobs and the attribute values derived from them. Multi-byte fields come in two
//! flavours, big-endian ("applet order", the default) and little-endian (`_le`).
//!
//! Reads past the logical length return zero instead of failing. Writes past the
//! logical length grow the buffer and zero-fill any gap.

use std::fmt;

use bytes::Bytes;
use derive_more::Deref;
use tracing::warn;

use crate::{Error, Result};

/// An owned, growable byte sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deref)]
#[deref(forward)]
pub struct ByteBuffer(Vec<u8>);

impl ByteBuffer {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create an empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buf = Self::new();
        buf.reserve_total(capacity)?;
        Ok(buf)
    }

    /// Create a buffer holding a copy of `data`
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let mut buf = Self::new();
        buf.append_slice(data)?;
        Ok(buf)
    }

    /// Create a buffer by decoding a hex string
    ///
    /// An odd number of digits is read as if a leading `0` were present, so `"abc"`
    /// decodes to `0A BC`.
    pub fn from_hex(hex_string: &str) -> Result<Self> {
        let decoded = if hex_string.len() % 2 == 1 {
            hex::decode(format!("0{hex_string}"))?
        } else {
            hex::decode(hex_string)?
        };
        Ok(Self(decoded))
    }

    /// Create a buffer from `len` bytes of `src` starting at `start`
    ///
    /// The range is clamped to the source: a start past the end yields an empty buffer.
    pub fn from_range(src: &[u8], start: usize, len: usize) -> Result<Self> {
        let start = start.min(src.len());
        let end = start.saturating_add(len).min(src.len());
        Self::from_slice(&src[start..end])
    }

    /// Create a buffer of `len` zero bytes
    pub fn zeroed(len: usize) -> Result<Self> {
        let mut buf = Self::new();
        buf.resize(len)?;
        Ok(buf)
    }

    /// Logical length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// View the content as a slice
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Convert into an immutable [`Bytes`]
    pub fn freeze(self) -> Bytes {
        Bytes::from(self.0)
    }

    /// Make sure at least `total` bytes fit without reallocating
    ///
    /// On allocation failure the buffer is released and left empty.
    pub fn reserve_total(&mut self, total: usize) -> Result<()> {
        if total <= self.0.capacity() {
            return Ok(());
        }
        if self.0.try_reserve(total - self.0.len()).is_err() {
            warn!(requested = total, "Byte buffer allocation failed");
            self.0 = Vec::new();
            return Err(Error::OutOfMemory(total));
        }
        Ok(())
    }

    /// Change the logical length, zero-filling any growth
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        if new_len > self.0.len() {
            self.reserve_total(new_len)?;
        }
        self.0.resize(new_len, 0);
        Ok(())
    }

    /// Shorten the buffer to `len` bytes; no-op if already shorter
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Wipe the content, spare capacity included, and set the length to zero
    pub fn zero(&mut self) {
        let capacity = self.0.capacity();
        self.0.clear();
        self.0.resize(capacity, 0);
        self.0.clear();
    }

    /// Append a single byte
    pub fn append_u8(&mut self, value: u8) -> Result<()> {
        self.append_slice(&[value])
    }

    /// Append a big-endian 16-bit value
    pub fn append_u16(&mut self, value: u16) -> Result<()> {
        self.append_slice(&value.to_be_bytes())
    }

    /// Append a little-endian 16-bit value
    pub fn append_u16_le(&mut self, value: u16) -> Result<()> {
        self.append_slice(&value.to_le_bytes())
    }

    /// Append a big-endian 32-bit value
    pub fn append_u32(&mut self, value: u32) -> Result<()> {
        self.append_slice(&value.to_be_bytes())
    }

    /// Append a little-endian 32-bit value
    pub fn append_u32_le(&mut self, value: u32) -> Result<()> {
        self.append_slice(&value.to_le_bytes())
    }

    /// Append raw bytes
    pub fn append_slice(&mut self, data: &[u8]) -> Result<()> {
        self.reserve_total(self.0.len() + data.len())?;
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append `len` bytes of `src` starting at `offset`
    ///
    /// Unlike [`ByteBuffer::from_range`] the range is not clamped: asking for bytes the
    /// source does not have is an error.
    pub fn append_range(&mut self, src: &[u8], offset: usize, len: usize) -> Result<()> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= src.len())
            .ok_or(Error::data_too_long(offset.saturating_add(len), src.len()))?;
        self.append_slice(&src[offset..end])
    }

    /// Overwrite bytes at `offset`, growing the buffer if they extend past the end
    pub fn replace(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = field_end(offset, data.len())?;
        if end > self.0.len() {
            self.resize(end)?;
        }
        self.0[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Set the byte at `offset`
    pub fn set_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        self.replace(offset, &[value])
    }

    /// Fill `len` bytes at `offset` with `value`
    pub fn set_bytes(&mut self, offset: usize, value: u8, len: usize) -> Result<()> {
        let end = field_end(offset, len)?;
        if end > self.0.len() {
            self.resize(end)?;
        }
        self.0[offset..end].fill(value);
        Ok(())
    }

    /// Set a big-endian 16-bit value at `offset`
    pub fn set_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        self.replace(offset, &value.to_be_bytes())
    }

    /// Set a little-endian 16-bit value at `offset`
    pub fn set_u16_le(&mut self, offset: usize, value: u16) -> Result<()> {
        self.replace(offset, &value.to_le_bytes())
    }

    /// Set a big-endian 32-bit value at `offset`
    pub fn set_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.replace(offset, &value.to_be_bytes())
    }

    /// Set a little-endian 32-bit value at `offset`
    pub fn set_u32_le(&mut self, offset: usize, value: u32) -> Result<()> {
        self.replace(offset, &value.to_le_bytes())
    }

    /// The byte at `offset`, or 0 past the end
    pub fn get_u8(&self, offset: usize) -> u8 {
        self.0.get(offset).copied().unwrap_or(0)
    }

    /// The big-endian 16-bit value at `offset`, or 0 if it does not fit
    pub fn get_u16(&self, offset: usize) -> u16 {
        self.field::<2>(offset).map_or(0, u16::from_be_bytes)
    }

    /// The little-endian 16-bit value at `offset`, or 0 if it does not fit
    pub fn get_u16_le(&self, offset: usize) -> u16 {
        self.field::<2>(offset).map_or(0, u16::from_le_bytes)
    }

    /// The big-endian 32-bit value at `offset`, or 0 if it does not fit
    pub fn get_u32(&self, offset: usize) -> u32 {
        self.field::<4>(offset).map_or(0, u32::from_be_bytes)
    }

    /// The little-endian 32-bit value at `offset`, or 0 if it does not fit
    pub fn get_u32_le(&self, offset: usize) -> u32 {
        self.field::<4>(offset).map_or(0, u32::from_le_bytes)
    }

    fn field<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        self.0.get(offset..end)?.try_into().ok()
    }
}

/// End of a `len`-byte field at `offset`; a field past `usize::MAX` can never be allocated
fn field_end(offset: usize, len: usize) -> Result<usize> {
    offset.checked_add(len).ok_or(Error::OutOfMemory(usize::MAX))
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl From<ByteBuffer> for Vec<u8> {
    fn from(buf: ByteBuffer) -> Self {
        buf.0
    }
}

impl PartialEq<[u8]> for ByteBuffer {
    fn eq(&self, other: &[u8]) -> bool {
        self.0 == other
    }
}

impl fmt::Display for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}
