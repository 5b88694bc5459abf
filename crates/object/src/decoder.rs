//! Decoding of on-card object blobs
//!
//! Every blob starts with a one-byte format tag and the big-endian object id.
//!
//! Format 0 (`0x00`):
//!
//! ```text
//! 00 | id(4) | attr_len(2) | { type(4) len(2) value(len) }*
//! ```
//!
//! Format 1 (`0x01`):
//!
//! ```text
//! 01 | id(4) | fixed(4) | count(2) | { type(4) kind(1) payload }*
//! ```
//!
//! In format 1 the fixed word packs a default `CKA_ID`, the object class and
//! the boolean attributes the class allows.

use tracing::{trace, warn};

use crate::attribute::AttributeStore;
use crate::constants::{AttributeType, CkUlong, cka, data_kind};
use crate::{Error, Result};

/// Smallest blob carrying a format tag and an object id
const ID_HEADER_LEN: usize = 5;
/// Format 0 header length
const V0_HEADER_LEN: usize = 7;
/// Format 1 header length
const V1_HEADER_LEN: usize = 11;

/// Valid boolean flag bits per class index
const BOOL_MASK: [u32; 8] = [
    0x0000_0380, // data
    0x0000_0380, // certificate
    0x000c_5f80, // public key
    0x00f3_af80, // private key
    0x00f5_ff80, // secret key
    0,
    0,
    0,
];

/// Bit position of the first boolean flag
const FIRST_FLAG_BIT: u32 = 7;

/// Boolean attribute for each flag bit, starting at [`FIRST_FLAG_BIT`]
const FLAG_ATTRIBUTES: [AttributeType; 17] = [
    cka::TOKEN,
    cka::PRIVATE,
    cka::MODIFIABLE,
    cka::DERIVE,
    cka::LOCAL,
    cka::ENCRYPT,
    cka::DECRYPT,
    cka::WRAP,
    cka::UNWRAP,
    cka::SIGN,
    cka::SIGN_RECOVER,
    cka::VERIFY,
    cka::VERIFY_RECOVER,
    cka::SENSITIVE,
    cka::ALWAYS_SENSITIVE,
    cka::EXTRACTABLE,
    cka::NEVER_EXTRACTABLE,
];

/// On-card object encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFormat {
    /// Explicit type/length/value records
    V0,
    /// Packed fixed attributes plus typed records
    V1,
}

impl TryFrom<u8> for ObjectFormat {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::V0),
            1 => Ok(Self::V1),
            other => Err(Error::UnknownFormat(other)),
        }
    }
}

/// Bounds-checked reader over a blob
#[derive(Debug)]
struct BlobReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BlobReader<'a> {
    const fn new(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    const fn is_at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(Error::Truncated(self.offset))?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let offset = self.offset;
        self.take(N)?
            .try_into()
            .map_err(|_| Error::Truncated(offset))
    }

    fn u8(&mut self) -> Result<u8> {
        self.array::<1>().map(|[b]| b)
    }

    fn u16(&mut self) -> Result<u16> {
        self.array().map(u16::from_be_bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        self.array().map(u32::from_be_bytes)
    }
}

fn be_u16(blob: &[u8], offset: usize) -> u16 {
    let mut reader = BlobReader::new(blob, offset);
    reader.u16().unwrap_or_default()
}

fn be_u32(blob: &[u8], offset: usize) -> u32 {
    let mut reader = BlobReader::new(blob, offset);
    reader.u32().unwrap_or_default()
}

/// Decode an on-card object blob into its attributes
///
/// `expected_id` must match the id stored in the blob.
pub fn decode_object(expected_id: u32, blob: &[u8]) -> Result<AttributeStore> {
    decode(expected_id, blob).inspect_err(|err| {
        warn!(
            object_id = format_args!("{expected_id:#010x}"),
            len = blob.len(),
            %err,
            "Rejected object blob"
        );
    })
}

fn decode(expected_id: u32, blob: &[u8]) -> Result<AttributeStore> {
    if blob.len() < ID_HEADER_LEN {
        return Err(Error::InvalidObjectSize(blob.len()));
    }

    let actual = be_u32(blob, 1);
    if actual != expected_id {
        return Err(Error::IdMismatch {
            expected: expected_id,
            actual,
        });
    }

    let format = ObjectFormat::try_from(blob[0])?;
    trace!(
        ?format,
        object_id = format_args!("{actual:#010x}"),
        len = blob.len(),
        "Decoding object"
    );

    let mut store = AttributeStore::new();
    match format {
        ObjectFormat::V0 => decode_v0(blob, &mut store)?,
        ObjectFormat::V1 => decode_v1(blob, &mut store)?,
    }
    Ok(store)
}

/// Attributes whose four on-card bytes are a little-endian `CK_ULONG`
const fn is_card_ulong(attr_type: AttributeType) -> bool {
    matches!(
        attr_type,
        cka::CLASS | cka::CERTIFICATE_TYPE | cka::KEY_TYPE
    )
}

fn decode_v0(blob: &[u8], store: &mut AttributeStore) -> Result<()> {
    if blob.len() < V0_HEADER_LEN {
        return Err(Error::InvalidObjectSize(blob.len()));
    }

    let declared = usize::from(be_u16(blob, 5));
    let actual = blob.len() - V0_HEADER_LEN;
    if declared != actual {
        return Err(Error::LengthMismatch { declared, actual });
    }

    let mut reader = BlobReader::new(blob, V0_HEADER_LEN);
    while !reader.is_at_end() {
        let attr_type = reader.u32()?;
        let len = usize::from(reader.u16()?);
        let value = reader.take(len)?;
        trace!(attr_type = format_args!("{attr_type:#x}"), len, "Format 0 attribute");

        if is_card_ulong(attr_type) {
            let raw: [u8; 4] = value
                .try_into()
                .map_err(|_| Error::InvalidAttributeLength { attribute: attr_type, len })?;
            store.set_ulong(attr_type, CkUlong::from(u32::from_le_bytes(raw)))?;
        } else {
            store.set(attr_type, value)?;
        }
    }
    Ok(())
}

fn decode_v1(blob: &[u8], store: &mut AttributeStore) -> Result<()> {
    if blob.len() < V1_HEADER_LEN {
        return Err(Error::InvalidObjectSize(blob.len()));
    }

    let fixed = be_u32(blob, 5);
    let count = be_u16(blob, 9);

    let mut reader = BlobReader::new(blob, V1_HEADER_LEN);
    for _ in 0..count {
        // A count running past the data ends the record list
        if reader.is_at_end() {
            break;
        }

        let attr_type = reader.u32()?;
        let kind = reader.u8()?;
        trace!(attr_type = format_args!("{attr_type:#x}"), kind, "Format 1 attribute");

        match kind {
            data_kind::STRING => {
                let len = usize::from(reader.u16()?);
                store.set(attr_type, reader.take(len)?)?;
            }
            data_kind::BOOL_FALSE | data_kind::BOOL_TRUE => {
                store.set(attr_type, &[kind & 1])?;
            }
            data_kind::INTEGER => {
                store.set_ulong(attr_type, CkUlong::from(reader.u32()?))?;
            }
            _ => {
                return Err(Error::InvalidDataKind {
                    attribute: attr_type,
                    kind,
                });
            }
        }
    }

    expand_fixed_attributes(store, fixed)
}

/// Fill in attributes packed into a format 1 fixed word
///
/// Explicit attributes already in the store are left untouched.
pub fn expand_fixed_attributes(store: &mut AttributeStore, fixed: u32) -> Result<()> {
    let id = (fixed & 0xF) as u8;
    let class = (fixed >> 4) & 0x7;
    let mask = BOOL_MASK[class as usize];

    if !store.exists(cka::ID) {
        store.set(cka::ID, &[id])?;
    }
    if !store.exists(cka::CLASS) {
        store.set_ulong(cka::CLASS, CkUlong::from(class))?;
    }

    // The mask follows the class packed in `fixed`, not an explicit CKA_CLASS
    for (bit, attr_type) in (FIRST_FLAG_BIT..).zip(FLAG_ATTRIBUTES) {
        let bit_mask = 1u32 << bit;
        if mask & bit_mask == 0 || store.exists(attr_type) {
            continue;
        }
        store.set_bool(attr_type, fixed & bit_mask != 0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ckk, cko};
    use crate::error::ErrorCategory;
    use hex_literal::hex;

    #[test]
    fn test_format0_decodes_records() {
        // class (LE 1), label "ab"
        let blob = hex!(
            "00 00000042 0012"
            "00000000 0004 01000000"
            "00000003 0002 6162"
        );
        let store = decode_object(0x42, &blob).unwrap();
        assert_eq!(store.get_ulong(cka::CLASS), Some(cko::CERTIFICATE));
        assert_eq!(store.get(cka::LABEL), Some(&b"ab"[..]));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_format0_length_mismatch() {
        let blob = hex!("00 00000042 0005 00000003 0001 61");
        let err = decode_object(0x42, &blob).unwrap_err();
        assert_eq!(
            err,
            Error::LengthMismatch {
                declared: 5,
                actual: 7
            }
        );
        assert_eq!(err.category(), ErrorCategory::MalformedInput);
    }

    #[test]
    fn test_format0_record_overrun() {
        let blob = hex!("00 00000042 0007 00000003 0005 61");
        assert!(matches!(
            decode_object(0x42, &blob),
            Err(Error::Truncated(_))
        ));
    }

    #[test]
    fn test_format0_ulong_must_be_four_bytes() {
        let blob = hex!("00 00000042 0008 00000100 0002 0300");
        assert!(matches!(
            decode_object(0x42, &blob),
            Err(Error::InvalidAttributeLength { attribute: cka::KEY_TYPE, len: 2 })
        ));
    }

    #[test]
    fn test_id_mismatch() {
        let blob = hex!("01 00000043 00000000 0000");
        let err = decode_object(0x42, &blob).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::IdentityMismatch);
    }

    #[test]
    fn test_short_and_unknown_blobs() {
        assert_eq!(decode_object(0, &[0x00, 0x00]), Err(Error::InvalidObjectSize(2)));
        assert_eq!(
            decode_object(0, &hex!("07 00000000")),
            Err(Error::UnknownFormat(7))
        );
        assert_eq!(
            decode_object(0, &hex!("01 00000000 00")),
            Err(Error::InvalidObjectSize(6))
        );
    }

    #[test]
    fn test_format1_records_and_expansion() {
        // fixed: id 1, class 3 (private key), TOKEN | SIGN | SENSITIVE
        let fixed: u32 = 0x1 | (3 << 4) | (1 << 7) | (1 << 16) | (1 << 20);
        let mut blob = vec![0x01, 0x00, 0x00, 0x00, 0x10];
        blob.extend_from_slice(&fixed.to_be_bytes());
        blob.extend_from_slice(&hex!(
            "0003"
            "00000003 00 0003 6b6579"
            "00000100 01 00000003"
            "00000108 02"
        ));

        let store = decode_object(0x10, &blob).unwrap();
        assert_eq!(store.get(cka::LABEL), Some(&b"key"[..]));
        assert_eq!(store.get_ulong(cka::KEY_TYPE), Some(ckk::EC));
        // explicit SIGN=false wins over the fixed bit
        assert_eq!(store.get_bool(cka::SIGN), Some(false));
        assert_eq!(store.get(cka::ID), Some(&[1u8][..]));
        assert_eq!(store.get_ulong(cka::CLASS), Some(cko::PRIVATE_KEY));
        assert_eq!(store.get_bool(cka::TOKEN), Some(true));
        assert_eq!(store.get_bool(cka::SENSITIVE), Some(true));
        assert_eq!(store.get_bool(cka::PRIVATE), Some(false));
        assert_eq!(store.get_bool(cka::DECRYPT), Some(false));
        // not in the private key mask
        assert!(!store.exists(cka::ENCRYPT));
        assert!(!store.exists(cka::VERIFY));
    }

    #[test]
    fn test_format1_unknown_kind() {
        let blob = hex!("01 00000001 00000000 0001 00000003 09");
        assert_eq!(
            decode_object(1, &blob),
            Err(Error::InvalidDataKind {
                attribute: cka::LABEL,
                kind: 9
            })
        );
    }

    #[test]
    fn test_format1_count_past_end_stops() {
        let blob = hex!("01 00000001 00000000 0005 00000001 03");
        let store = decode_object(1, &blob).unwrap();
        assert_eq!(store.get_bool(cka::TOKEN), Some(true));
        // class 0 (data) defaults
        assert_eq!(store.get_ulong(cka::CLASS), Some(cko::DATA));
        assert_eq!(store.get_bool(cka::MODIFIABLE), Some(false));
    }

    #[test]
    fn test_format1_truncated_record() {
        let blob = hex!("01 00000001 00000000 0001 00000003 00 0010 61");
        assert!(matches!(decode_object(1, &blob), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_expand_reserved_class_has_no_flags() {
        let mut store = AttributeStore::new();
        expand_fixed_attributes(&mut store, 0x00FF_FF70).unwrap();
        assert_eq!(store.get(cka::ID), Some(&[0u8][..]));
        assert_eq!(store.get_ulong(cka::CLASS), Some(7));
        assert_eq!(store.len(), 2);
    }
}
