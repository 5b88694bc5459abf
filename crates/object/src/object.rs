//! Card objects and the assemblers that build them
//!
//! A [`CardObject`] pairs an [`AttributeStore`] with the identity the token
//! layer needs (object id, handle) and what has been learned about the key
//! material. Each constructor builds the whole object before returning it; on
//! error nothing is published.

use std::borrow::Cow;

use bytes::Bytes;
use tracing::debug;

use crate::attribute::{AttributeStore, TemplateEntry};
use crate::config::ObjectConfig;
use crate::constants::{AttributeType, CkUlong, cka, ckc, ckk, cko};
use crate::decoder::decode_object;
use crate::der::{KeyType, certificate_fields, common_name, ec_public_key, key_type, rsa_public_key};
use crate::{Error, Result};

/// Labels of the three identity-document certificate slots
const IDENTITY_LABELS: [&str; 3] = [
    "CAC ID Certificate",
    "CAC Email Signature Certificate",
    "CAC Email Encryption Certificate",
];

/// Identity-document slot holding the encryption key pair
const IDENTITY_ENCRYPTION_INSTANCE: u8 = 2;

/// What kind of constructor produced an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Plain object decoded from the card
    Generic,
    /// Public, private or secret key decoded from the card
    Key,
    /// Secret key assembled from a key value and template
    SecretKey,
    /// Certificate decoded from the card
    Certificate,
    /// Reader pseudo-object
    Reader,
    /// Identity-document public or private key
    IdentityKey,
    /// Identity-document certificate
    IdentityCertificate,
}

/// A PKCS#11 object backed by card data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardObject {
    object_id: u32,
    handle: u32,
    kind: ObjectKind,
    key_type: KeyType,
    attributes: AttributeStore,
    public_key: Bytes,
    name: Option<String>,
}

impl CardObject {
    const fn with_attributes(
        object_id: u32,
        handle: u32,
        kind: ObjectKind,
        attributes: AttributeStore,
    ) -> Self {
        Self {
            object_id,
            handle,
            kind,
            key_type: KeyType::Unknown,
            attributes,
            public_key: Bytes::new(),
            name: None,
        }
    }

    /// Decode a generic object blob
    pub fn decode(object_id: u32, blob: &[u8], handle: u32) -> Result<Self> {
        let attributes = decode_object(object_id, blob)?;
        debug!(object_id = format_args!("{object_id:#010x}"), handle, "Decoded object");
        Ok(Self::with_attributes(object_id, handle, ObjectKind::Generic, attributes))
    }

    /// Decode a key object blob and fill in key defaults
    ///
    /// For public and private keys the key type is taken from `CKA_KEY_TYPE`
    /// (EC if it says so, RSA otherwise). The key fields themselves come later
    /// from [`CardObject::complete_key`].
    pub fn key(object_id: u32, blob: &[u8], handle: u32) -> Result<Self> {
        let mut attributes = decode_object(object_id, blob)?;
        let mut key_type = KeyType::Unknown;

        match attributes.get_ulong(cka::CLASS) {
            Some(cko::PUBLIC_KEY | cko::PRIVATE_KEY) => {
                key_type = match attributes.get_ulong(cka::KEY_TYPE) {
                    Some(ckk::EC) => KeyType::Ec,
                    _ => KeyType::Rsa,
                };
                let value = if key_type == KeyType::Ec { ckk::EC } else { ckk::RSA };
                attributes.set_ulong(cka::KEY_TYPE, value)?;
            }
            Some(cko::SECRET_KEY) => {
                if !attributes.exists(cka::LABEL) {
                    attributes.set(cka::LABEL, &[])?;
                }
                if !attributes.exists(cka::KEY_TYPE) {
                    attributes.set_ulong(cka::KEY_TYPE, ckk::DES3)?;
                }
            }
            _ => {}
        }

        for date in [cka::START_DATE, cka::END_DATE] {
            if !attributes.exists(date) {
                attributes.set(date, &[])?;
            }
        }

        debug!(object_id = format_args!("{object_id:#010x}"), handle, ?key_type, "Decoded key");
        let mut object = Self::with_attributes(object_id, handle, ObjectKind::Key, attributes);
        object.key_type = key_type;
        Ok(object)
    }

    /// Fill in key fields from the matching certificate
    ///
    /// The label is copied when the key has none. Modulus and exponent (RSA)
    /// or point and parameters (EC) are only written where absent. On error
    /// the key is left unchanged.
    pub fn complete_key(&mut self, cert: &Self) -> Result<()> {
        let mut attributes = self.attributes.clone();

        if !attributes.exists(cka::LABEL) {
            if let Some(label) = cert.attributes.get(cka::LABEL) {
                attributes.set(cka::LABEL, label)?;
            }
        }

        let key_type = key_type(&cert.public_key)?;
        let fields = match key_type {
            KeyType::Rsa => [cka::MODULUS, cka::PUBLIC_EXPONENT],
            _ => [cka::EC_POINT, cka::EC_PARAMS],
        };
        if fields.iter().any(|field| !attributes.exists(*field)) {
            let values = public_key_fields(key_type, &cert.public_key)?;
            for (field, value) in fields.into_iter().zip(values) {
                if !attributes.exists(field) {
                    attributes.set(field, value)?;
                }
            }
        }

        debug!(object_id = format_args!("{:#010x}", self.object_id), ?key_type, "Completed key");
        self.attributes = attributes;
        self.key_type = key_type;
        Ok(())
    }

    /// Assemble a secret key from its value and a creation template
    ///
    /// `CKA_VALUE_LEN` in the template sets the length of the stored value and
    /// is not kept as an attribute. A shorter value is left-padded with zeros
    /// when the growth is below the configured bound; a longer one loses its
    /// most significant bytes.
    pub fn secret_key(
        object_id: u32,
        handle: u32,
        key_value: &[u8],
        template: &[(AttributeType, &[u8])],
        config: &ObjectConfig,
    ) -> Result<Self> {
        let mut attributes = AttributeStore::new();
        let mut value_len = None;

        for (attr_type, value) in template {
            if *attr_type == cka::VALUE_LEN {
                let raw = (*value)
                    .try_into()
                    .map_err(|_| Error::InvalidData("CKA_VALUE_LEN is not a CK_ULONG"))?;
                value_len = Some(CkUlong::from_ne_bytes(raw) as usize);
            } else {
                attributes.set(*attr_type, value)?;
            }
        }

        if !attributes.exists(cka::CLASS) {
            attributes.set_ulong(cka::CLASS, cko::SECRET_KEY)?;
        }
        if !attributes.exists(cka::KEY_TYPE) {
            attributes.set_ulong(cka::KEY_TYPE, ckk::GENERIC_SECRET)?;
        }
        for flag in [cka::TOKEN, cka::DERIVE] {
            if !attributes.exists(flag) {
                attributes.set_bool(flag, true)?;
            }
        }

        let value = match value_len {
            Some(len) => adjust_key_length(key_value, len, config.max_secret_key_padding)?,
            None => Cow::Borrowed(key_value),
        };
        attributes.set(cka::VALUE, &value)?;

        debug!(
            object_id = format_args!("{object_id:#010x}"),
            handle,
            len = value.len(),
            "Assembled secret key"
        );
        Ok(Self::with_attributes(object_id, handle, ObjectKind::SecretKey, attributes))
    }

    /// Decode a certificate object blob
    ///
    /// Fields are parsed from `der_cert` when given, otherwise from the blob's
    /// `CKA_VALUE`. `CKA_VALUE` is only set from `der_cert` when the blob does
    /// not carry one. Serial, subject and issuer are filled where absent.
    pub fn certificate(
        object_id: u32,
        blob: &[u8],
        handle: u32,
        der_cert: Option<&[u8]>,
    ) -> Result<Self> {
        let mut attributes = decode_object(object_id, blob)?;
        attributes.set_ulong(cka::CERTIFICATE_TYPE, ckc::X_509)?;

        let der = match (der_cert, attributes.get(cka::VALUE)) {
            (Some(der), _) => Bytes::copy_from_slice(der),
            (None, Some(value)) => Bytes::copy_from_slice(value),
            (None, None) => return Err(Error::InvalidData("missing certificate data")),
        };
        if !attributes.exists(cka::VALUE) {
            attributes.set(cka::VALUE, &der)?;
        }

        let fields = certificate_fields(&der)?;
        for (attr_type, value) in [
            (cka::SERIAL_NUMBER, fields.serial),
            (cka::SUBJECT, fields.subject),
            (cka::ISSUER, fields.issuer),
        ] {
            if !attributes.exists(attr_type) {
                attributes.set(attr_type, value)?;
            }
        }

        let mut object =
            Self::with_attributes(object_id, handle, ObjectKind::Certificate, attributes);
        object.public_key = der.slice_ref(fields.public_key);
        object.name = display_name(fields.subject);
        debug!(
            object_id = format_args!("{object_id:#010x}"),
            handle,
            name = ?object.name,
            "Decoded certificate"
        );
        Ok(object)
    }

    /// Build the pseudo-object describing a reader
    pub fn reader(
        object_id: u32,
        handle: u32,
        reader_name: &str,
        atr: &[u8],
        is_coolkey: bool,
    ) -> Result<Self> {
        let mut attributes = AttributeStore::new();
        attributes.set_ulong(cka::CLASS, cko::MOZ_READER)?;
        attributes.set_str(cka::LABEL, reader_name)?;
        attributes.set_bool(cka::TOKEN, true)?;
        attributes.set_bool(cka::PRIVATE, false)?;
        attributes.set_bool(cka::MODIFIABLE, false)?;
        attributes.set_bool(cka::MOZ_IS_COOL_KEY, is_coolkey)?;
        attributes.set(cka::MOZ_ATR, atr)?;
        Ok(Self::with_attributes(object_id, handle, ObjectKind::Reader, attributes))
    }

    /// Identity-document certificate for slot `instance` (0 to 2)
    pub fn identity_certificate(instance: u8, der_cert: &[u8]) -> Result<Self> {
        let label = identity_label(instance)?;
        let mut attributes = identity_base(instance, cko::CERTIFICATE, None)?;
        attributes.set_ulong(cka::CERTIFICATE_TYPE, ckc::X_509)?;
        attributes.set_str(cka::LABEL, label)?;

        let der = Bytes::copy_from_slice(der_cert);
        attributes.set(cka::VALUE, &der)?;
        let fields = certificate_fields(&der)?;
        attributes.set(cka::SERIAL_NUMBER, fields.serial)?;
        attributes.set(cka::SUBJECT, fields.subject)?;
        attributes.set(cka::ISSUER, fields.issuer)?;

        let mut object = Self::with_attributes(
            identity_id(b'c', b'0', instance),
            u32::from(instance) | 0x600,
            ObjectKind::IdentityCertificate,
            attributes,
        );
        object.public_key = der.slice_ref(fields.public_key);
        object.name = display_name(fields.subject);
        debug!(instance, name = ?object.name, "Assembled identity certificate");
        Ok(object)
    }

    /// Identity-document private key matching `cert`
    ///
    /// Slot 2 decrypts (RSA) or derives (EC); the other slots sign.
    pub fn identity_private_key(instance: u8, cert: &Self) -> Result<Self> {
        identity_label(instance)?;
        let decrypt = instance == IDENTITY_ENCRYPTION_INSTANCE;

        let label = cert.attributes.get(cka::LABEL);
        let mut attributes = identity_base(instance, cko::PRIVATE_KEY, label)?;
        attributes.set(cka::START_DATE, &[])?;
        attributes.set(cka::END_DATE, &[])?;
        attributes.set_bool(cka::DERIVE, false)?;
        attributes.set_bool(cka::LOCAL, true)?;
        attributes.set_ulong(cka::KEY_TYPE, ckk::RSA)?;
        attributes.set_bool(cka::SIGN, !decrypt)?;
        attributes.set_bool(cka::SIGN_RECOVER, !decrypt)?;
        attributes.set_bool(cka::UNWRAP, false)?;
        attributes.set_bool(cka::SENSITIVE, true)?;
        attributes.set_bool(cka::EXTRACTABLE, false)?;

        let key_type = set_identity_key_fields(&mut attributes, &cert.public_key)?;
        match key_type {
            KeyType::Ec => {
                attributes.set_bool(cka::DECRYPT, false)?;
                attributes.set_bool(cka::DERIVE, decrypt)?;
            }
            _ => {
                attributes.set_bool(cka::DECRYPT, decrypt)?;
                attributes.set_bool(cka::DERIVE, false)?;
            }
        }

        let mut object = Self::with_attributes(
            identity_id(b'k', b'0', instance),
            u32::from(instance) | 0x400,
            ObjectKind::IdentityKey,
            attributes,
        );
        object.key_type = key_type;
        debug!(instance, ?key_type, "Assembled identity private key");
        Ok(object)
    }

    /// Identity-document public key matching `cert`
    ///
    /// Slot 2 encrypts; the other slots verify.
    pub fn identity_public_key(instance: u8, cert: &Self) -> Result<Self> {
        identity_label(instance)?;
        let encrypt = instance == IDENTITY_ENCRYPTION_INSTANCE;

        let label = cert.attributes.get(cka::LABEL);
        let mut attributes = identity_base(instance, cko::PUBLIC_KEY, label)?;
        attributes.set(cka::START_DATE, &[])?;
        attributes.set(cka::END_DATE, &[])?;
        attributes.set_bool(cka::DERIVE, false)?;
        attributes.set_bool(cka::LOCAL, true)?;
        attributes.set_bool(cka::ENCRYPT, encrypt)?;
        attributes.set_bool(cka::VERIFY, !encrypt)?;
        attributes.set_bool(cka::VERIFY_RECOVER, !encrypt)?;
        attributes.set_bool(cka::WRAP, false)?;

        let key_type = set_identity_key_fields(&mut attributes, &cert.public_key)?;

        let mut object = Self::with_attributes(
            identity_id(b'k', b'5', instance),
            u32::from(instance) | 0x500,
            ObjectKind::IdentityKey,
            attributes,
        );
        object.key_type = key_type;
        debug!(instance, ?key_type, "Assembled identity public key");
        Ok(object)
    }

    /// Card object id
    pub const fn object_id(&self) -> u32 {
        self.object_id
    }

    /// PKCS#11 object handle
    pub const fn handle(&self) -> u32 {
        self.handle
    }

    /// Constructor that produced this object
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Key algorithm, when known
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// All attributes
    pub const fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// SubjectPublicKeyInfo taken from a certificate, empty otherwise
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Display name from the certificate subject's common name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `CKA_LABEL` as text, empty when absent
    pub fn label(&self) -> Cow<'_, str> {
        self.attributes
            .get(cka::LABEL)
            .map_or(Cow::Borrowed(""), String::from_utf8_lossy)
    }

    /// `CKA_CLASS`, when stored as a native `CK_ULONG`
    pub fn class(&self) -> Option<CkUlong> {
        self.attributes.get_ulong(cka::CLASS)
    }

    /// Whether this object matches a search template
    ///
    /// With an empty template every object matches, except reader
    /// pseudo-objects when `config` hides them.
    pub fn matches_template(
        &self,
        template: &[(AttributeType, &[u8])],
        config: &ObjectConfig,
    ) -> bool {
        if template.is_empty() && config.hide_reader_objects {
            return self.class() != Some(cko::MOZ_READER);
        }
        self.attributes.matches_template(template)
    }

    /// Fill a query template from this object's attributes
    pub fn get_attribute_values(&self, template: &mut [TemplateEntry<'_>]) -> Result<()> {
        self.attributes.get_attribute_values(template).inspect_err(|err| {
            debug!(
                object_id = format_args!("{:#010x}", self.object_id),
                %err,
                "Attribute query incomplete"
            );
        })
    }
}

/// Resize a secret key value to `len` bytes
fn adjust_key_length(value: &[u8], len: usize, max_padding: usize) -> Result<Cow<'_, [u8]>> {
    if len < value.len() {
        return Ok(Cow::Borrowed(&value[value.len() - len..]));
    }
    let growth = len - value.len();
    if growth == 0 || growth >= max_padding {
        return Ok(Cow::Borrowed(value));
    }

    let mut padded = coolkey_core::ByteBuffer::zeroed(growth)?;
    padded.append_slice(value)?;
    Ok(Cow::Owned(padded.into()))
}

/// The two key fields an SPKI contributes, in attribute order
fn public_key_fields(key_type: KeyType, spki: &[u8]) -> Result<[&[u8]; 2]> {
    match key_type {
        KeyType::Rsa => rsa_public_key(spki).map(|key| [key.modulus, key.exponent]),
        _ => ec_public_key(spki).map(|key| [key.point, key.params]),
    }
}

/// Set key type and key fields of an identity key from a certificate SPKI
fn set_identity_key_fields(attributes: &mut AttributeStore, spki: &[u8]) -> Result<KeyType> {
    let key_type = key_type(spki)?;
    let fields = match key_type {
        KeyType::Ec => [cka::EC_POINT, cka::EC_PARAMS],
        _ => [cka::MODULUS, cka::PUBLIC_EXPONENT],
    };
    let values = public_key_fields(key_type, spki)?;
    for (field, value) in fields.into_iter().zip(values) {
        attributes.set(field, value)?;
    }
    if let Some(value) = key_type.key_type_value() {
        attributes.set_ulong(cka::KEY_TYPE, value)?;
    }
    Ok(key_type)
}

fn identity_label(instance: u8) -> Result<&'static str> {
    IDENTITY_LABELS
        .get(usize::from(instance))
        .copied()
        .ok_or(Error::InvalidData("identity instance out of range"))
}

const fn identity_id(prefix: u8, digit_base: u8, instance: u8) -> u32 {
    ((prefix as u32) << 24) | (((digit_base + instance) as u32) << 16)
}

/// Attributes shared by every identity-document object
fn identity_base(instance: u8, class: CkUlong, label: Option<&[u8]>) -> Result<AttributeStore> {
    let mut attributes = AttributeStore::new();
    attributes.set_ulong(cka::CLASS, class)?;
    attributes.set_bool(cka::TOKEN, true)?;
    attributes.set_bool(cka::PRIVATE, false)?;
    if let Some(label) = label {
        attributes.set(cka::LABEL, label)?;
    }
    attributes.set_bool(cka::MODIFIABLE, false)?;
    // zero byte, then the slot number
    attributes.set(cka::ID, &[0, instance + 1])?;
    Ok(attributes)
}

fn display_name(subject: &[u8]) -> Option<String> {
    common_name(subject)
        .ok()
        .map(|cn| String::from_utf8_lossy(cn).into_owned())
}
