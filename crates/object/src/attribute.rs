//! Typed attribute storage and PKCS#11 template handling

use coolkey_core::ByteBuffer;
use tracing::debug;

use crate::constants::{AttributeType, CkUlong};
use crate::{Error, Result};

/// Length reported for template entries that could not be filled
pub const UNAVAILABLE_INFORMATION: usize = usize::MAX;

/// A single `(type, value)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    attr_type: AttributeType,
    value: ByteBuffer,
}

impl Attribute {
    /// Attribute type
    pub const fn attr_type(&self) -> AttributeType {
        self.attr_type
    }

    /// Raw attribute value
    pub fn value(&self) -> &[u8] {
        self.value.as_slice()
    }
}

/// One entry of a `C_GetAttributeValue`-style template
///
/// `buffer` is the caller's output space; its length is the capacity. After a
/// query, `value_len` holds either the exact value length or
/// [`UNAVAILABLE_INFORMATION`].
#[derive(Debug)]
pub struct TemplateEntry<'a> {
    /// Requested attribute type
    pub attr_type: AttributeType,
    /// Output buffer, `None` to only ask for the length
    pub buffer: Option<&'a mut [u8]>,
    /// Length written by the query
    pub value_len: usize,
}

impl<'a> TemplateEntry<'a> {
    /// Entry asking only for the value length
    pub const fn length_only(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            buffer: None,
            value_len: 0,
        }
    }

    /// Entry with an output buffer
    pub const fn with_buffer(attr_type: AttributeType, buffer: &'a mut [u8]) -> Self {
        Self {
            attr_type,
            buffer: Some(buffer),
            value_len: 0,
        }
    }

    /// The bytes written into the buffer by a successful query
    pub fn filled(&self) -> Option<&[u8]> {
        match &self.buffer {
            Some(buffer) if self.value_len <= buffer.len() => Some(&buffer[..self.value_len]),
            _ => None,
        }
    }
}

/// Insertion-ordered attribute collection with at most one value per type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeStore {
    attributes: Vec<Attribute>,
}

impl AttributeStore {
    /// Create an empty store
    pub const fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the store holds no attributes
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate attributes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Set an attribute, overwriting in place if the type is already present
    pub fn set(&mut self, attr_type: AttributeType, value: &[u8]) -> Result<()> {
        let value = ByteBuffer::from_slice(value)?;
        match self.attributes.iter_mut().find(|a| a.attr_type == attr_type) {
            Some(existing) => existing.value = value,
            None => {
                self.attributes
                    .try_reserve(1)
                    .map_err(|_| coolkey_core::Error::OutOfMemory(self.attributes.len() + 1))?;
                self.attributes.push(Attribute { attr_type, value });
            }
        }
        Ok(())
    }

    /// Set a `CK_BBOOL` attribute
    pub fn set_bool(&mut self, attr_type: AttributeType, value: bool) -> Result<()> {
        self.set(attr_type, &[u8::from(value)])
    }

    /// Set a `CK_ULONG` attribute in native width and byte order
    pub fn set_ulong(&mut self, attr_type: AttributeType, value: CkUlong) -> Result<()> {
        self.set(attr_type, &value.to_ne_bytes())
    }

    /// Set a string attribute (no terminator)
    pub fn set_str(&mut self, attr_type: AttributeType, value: &str) -> Result<()> {
        self.set(attr_type, value.as_bytes())
    }

    /// Whether an attribute of this type exists
    pub fn exists(&self, attr_type: AttributeType) -> bool {
        self.attributes.iter().any(|a| a.attr_type == attr_type)
    }

    /// Value of an attribute
    pub fn get(&self, attr_type: AttributeType) -> Option<&[u8]> {
        self.attributes
            .iter()
            .find(|a| a.attr_type == attr_type)
            .map(Attribute::value)
    }

    /// Value of a `CK_ULONG` attribute, if stored with exactly native width
    pub fn get_ulong(&self, attr_type: AttributeType) -> Option<CkUlong> {
        let value = self.get(attr_type)?;
        value.try_into().ok().map(CkUlong::from_ne_bytes)
    }

    /// Value of a `CK_BBOOL` attribute
    pub fn get_bool(&self, attr_type: AttributeType) -> Option<bool> {
        match self.get(attr_type)? {
            [value] => Some(*value != 0),
            _ => None,
        }
    }

    /// Fill a query template
    ///
    /// Every entry is processed. Absent types and short buffers get
    /// [`UNAVAILABLE_INFORMATION`]; the call then fails with
    /// [`Error::AttributeTypeInvalid`] if any type was absent, otherwise with
    /// [`Error::BufferTooSmall`] if any buffer was short. Entries that could be
    /// filled are filled either way.
    pub fn get_attribute_values(&self, template: &mut [TemplateEntry<'_>]) -> Result<()> {
        let mut type_invalid = false;
        let mut too_small = false;

        for entry in template.iter_mut() {
            let Some(value) = self.get(entry.attr_type) else {
                debug!(
                    attr_type = format_args!("{:#010x}", entry.attr_type),
                    "Invalid attribute type"
                );
                entry.value_len = UNAVAILABLE_INFORMATION;
                type_invalid = true;
                continue;
            };

            match entry.buffer.as_deref_mut() {
                None => entry.value_len = value.len(),
                Some(buffer) if buffer.len() < value.len() => {
                    entry.value_len = UNAVAILABLE_INFORMATION;
                    too_small = true;
                }
                Some(buffer) => {
                    buffer[..value.len()].copy_from_slice(value);
                    entry.value_len = value.len();
                }
            }
        }

        if type_invalid {
            Err(Error::AttributeTypeInvalid)
        } else if too_small {
            Err(Error::BufferTooSmall)
        } else {
            Ok(())
        }
    }

    /// Whether every `(type, value)` pair is present with an identical value
    ///
    /// An empty template matches.
    pub fn matches_template(&self, template: &[(AttributeType, &[u8])]) -> bool {
        template
            .iter()
            .all(|(attr_type, value)| self.get(*attr_type) == Some(*value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{cka, cko};

    fn sample() -> AttributeStore {
        let mut store = AttributeStore::new();
        store.set_ulong(cka::CLASS, cko::CERTIFICATE).unwrap();
        store.set_str(cka::LABEL, "signing").unwrap();
        store.set_bool(cka::TOKEN, true).unwrap();
        store
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut store = sample();
        store.set_str(cka::CLASS, "x").unwrap();

        let order: Vec<_> = store.iter().map(Attribute::attr_type).collect();
        assert_eq!(order, vec![cka::CLASS, cka::LABEL, cka::TOKEN]);
        assert_eq!(store.get(cka::CLASS), Some(&b"x"[..]));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_typed_accessors() {
        let store = sample();
        assert_eq!(store.get_ulong(cka::CLASS), Some(cko::CERTIFICATE));
        assert_eq!(store.get_ulong(cka::LABEL), None);
        assert_eq!(store.get_bool(cka::TOKEN), Some(true));
        assert!(store.exists(cka::LABEL));
        assert!(!store.exists(cka::VALUE));
        assert_eq!(store.get(cka::VALUE), None);
    }

    #[test]
    fn test_get_attribute_values_success() {
        let store = sample();
        let mut label = [0u8; 16];
        let mut template = [
            TemplateEntry::length_only(cka::LABEL),
            TemplateEntry::with_buffer(cka::LABEL, &mut label),
        ];

        store.get_attribute_values(&mut template).unwrap();
        assert_eq!(template[0].value_len, 7);
        assert_eq!(template[1].value_len, 7);
        assert_eq!(template[1].filled(), Some(&b"signing"[..]));
    }

    #[test]
    fn test_get_attribute_values_buffer_too_small() {
        let store = sample();
        let mut short = [0u8; 3];
        let mut flag = [0u8; 1];
        let mut template = [
            TemplateEntry::with_buffer(cka::LABEL, &mut short),
            TemplateEntry::with_buffer(cka::TOKEN, &mut flag),
        ];

        assert_eq!(
            store.get_attribute_values(&mut template),
            Err(Error::BufferTooSmall)
        );
        assert_eq!(template[0].value_len, UNAVAILABLE_INFORMATION);
        assert_eq!(template[1].filled(), Some(&[1u8][..]));
    }

    #[test]
    fn test_unknown_type_takes_priority() {
        let store = sample();
        let mut short = [0u8; 1];
        let mut template = [
            TemplateEntry::with_buffer(cka::LABEL, &mut short),
            TemplateEntry::length_only(cka::MODULUS),
        ];

        let err = store.get_attribute_values(&mut template).unwrap_err();
        assert_eq!(err, Error::AttributeTypeInvalid);
        assert_eq!(template[0].value_len, UNAVAILABLE_INFORMATION);
        assert_eq!(template[1].value_len, UNAVAILABLE_INFORMATION);
    }

    #[test]
    fn test_matches_template() {
        let store = sample();
        assert!(store.matches_template(&[]));
        assert!(store.matches_template(&[(cka::LABEL, &b"signing"[..]), (cka::TOKEN, &[1u8][..])]));
        assert!(!store.matches_template(&[(cka::LABEL, &b"signin"[..])]));
        assert!(!store.matches_template(&[(cka::ID, &[1u8][..])]));
    }
}
