//! Minimal DER tag/length/value reader
//!
//! Only single-byte tags are understood, which covers everything found in
//! certificates, public keys and signatures handled here.

use coolkey_core::ByteBuffer;

use crate::Result;

/// Universal tag numbers used by the extractors
pub mod tag {
    /// INTEGER
    pub const INTEGER: u8 = 0x02;
    /// BIT STRING
    pub const BIT_STRING: u8 = 0x03;
    /// OBJECT IDENTIFIER
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    /// SEQUENCE (constructed)
    pub const SEQUENCE: u8 = 0x30;
    /// SET (constructed)
    pub const SET: u8 = 0x31;
}

/// One DER element, borrowed from its enclosing buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    tag: u8,
    raw: &'a [u8],
    value: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Parse the element at the start of `buf`
    ///
    /// Returns `None` for a zero tag (end of data), a truncated header, or a
    /// length running past the end of `buf`.
    pub fn parse(buf: &'a [u8]) -> Option<Self> {
        let [tag, first, rest @ ..] = buf else {
            return None;
        };
        if *tag == 0 {
            return None;
        }

        let (len, len_field) = if first & 0x80 == 0 {
            (usize::from(*first), 0)
        } else {
            let count = usize::from(first & 0x7F);
            if count == 0 || count > size_of::<usize>() || count > rest.len() {
                return None;
            }
            let len = rest[..count]
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
            (len, count)
        };

        let header_len = 2 + len_field;
        if len > buf.len() - header_len {
            return None;
        }

        Some(Self {
            tag: *tag,
            raw: &buf[..header_len + len],
            value: &buf[header_len..header_len + len],
        })
    }

    /// Tag byte
    pub const fn tag(&self) -> u8 {
        self.tag
    }

    /// Content bytes, without tag and length
    pub const fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Complete encoding, including tag and length
    pub const fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// Whether this is a context-specific constructed tag (`[n]` explicit)
    pub const fn is_context_constructed(&self) -> bool {
        self.tag & 0xA0 == 0xA0
    }
}

/// Read one element from `buf`
///
/// With `include_tag` the returned slice starts at the tag and covers the
/// whole encoding; otherwise it is the content only.
pub fn read_tlv(buf: &[u8], include_tag: bool) -> Option<&[u8]> {
    Tlv::parse(buf).map(|tlv| if include_tag { tlv.raw() } else { tlv.value() })
}

/// Strip the unused-bits byte of a BIT STRING's content
///
/// Only byte-aligned bit strings (unused bits = 0) are accepted.
pub fn unwrap_bit_string(content: &[u8]) -> Option<&[u8]> {
    match content {
        [0, payload @ ..] => Some(payload),
        _ => None,
    }
}

/// Cursor over consecutive DER elements
///
/// Iteration yields each element in turn and stops at the end of the buffer,
/// at a zero tag, or at the first malformed element.
#[derive(Debug, Clone)]
pub struct DerCursor<'a> {
    remaining: &'a [u8],
}

impl<'a> DerCursor<'a> {
    /// Cursor over `buf`
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { remaining: buf }
    }

    /// Bytes not yet consumed
    pub const fn remaining(&self) -> &'a [u8] {
        self.remaining
    }

    /// Whether all bytes have been consumed
    pub const fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Next element without consuming it
    pub fn peek(&self) -> Option<Tlv<'a>> {
        Tlv::parse(self.remaining)
    }
}

impl<'a> Iterator for DerCursor<'a> {
    type Item = Tlv<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let tlv = Tlv::parse(self.remaining)?;
        self.remaining = &self.remaining[tlv.raw.len()..];
        Some(tlv)
    }
}

/// Append a DER tag and length header
pub fn write_header(out: &mut ByteBuffer, tag: u8, len: usize) -> Result<()> {
    out.append_u8(tag)?;
    if len < 0x80 {
        out.append_u8(len as u8)?;
        return Ok(());
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.append_u8(0x80 | significant.len() as u8)?;
    out.append_slice(significant)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_short_form() {
        let buf = hex!("02 03 010001 ff");
        let tlv = Tlv::parse(&buf).unwrap();
        assert_eq!(tlv.tag(), tag::INTEGER);
        assert_eq!(tlv.value(), &hex!("010001"));
        assert_eq!(tlv.raw(), &hex!("02 03 010001"));
        assert_eq!(read_tlv(&buf, false), Some(&hex!("010001")[..]));
        assert_eq!(read_tlv(&buf, true), Some(&hex!("02 03 010001")[..]));
    }

    #[test]
    fn test_long_form() {
        let mut buf = vec![0x04u8, 0x82, 0x01, 0x00];
        buf.extend(std::iter::repeat_n(0xAB, 256));
        let tlv = Tlv::parse(&buf).unwrap();
        assert_eq!(tlv.value().len(), 256);
        assert_eq!(tlv.raw().len(), 260);
    }

    #[test]
    fn test_rejects_bad_input() {
        // end of data
        assert_eq!(Tlv::parse(&hex!("00 00")), None);
        // too short
        assert_eq!(Tlv::parse(&hex!("30")), None);
        // overruns
        assert_eq!(Tlv::parse(&hex!("30 05 0102")), None);
        // length bytes missing
        assert_eq!(Tlv::parse(&hex!("30 82 01")), None);
        // indefinite length
        assert_eq!(Tlv::parse(&hex!("30 80 0000")), None);
    }

    #[test]
    fn test_bit_string() {
        assert_eq!(unwrap_bit_string(&hex!("00 0102")), Some(&hex!("0102")[..]));
        assert_eq!(unwrap_bit_string(&hex!("00")), Some(&[][..]));
        assert_eq!(unwrap_bit_string(&hex!("04 0102")), None);
        assert_eq!(unwrap_bit_string(&[]), None);
    }

    #[test]
    fn test_cursor() {
        let buf = hex!("02 01 05 04 02 aabb 00 00");
        let mut cursor = DerCursor::new(&buf);
        assert_eq!(cursor.peek().map(|t| t.tag()), Some(tag::INTEGER));
        assert_eq!(cursor.next().unwrap().value(), &[0x05u8]);
        assert_eq!(cursor.next().unwrap().value(), &[0xAAu8, 0xBB]);
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.remaining(), &[0u8, 0]);
        assert!(!cursor.is_empty());
    }

    #[test]
    fn test_write_header() {
        let mut out = ByteBuffer::new();
        write_header(&mut out, tag::SEQUENCE, 0x45).unwrap();
        write_header(&mut out, tag::INTEGER, 0x81).unwrap();
        write_header(&mut out, tag::BIT_STRING, 0x0102).unwrap();
        assert_eq!(out.as_slice(), &hex!("30 45 02 81 81 03 82 0102"));
    }
}
