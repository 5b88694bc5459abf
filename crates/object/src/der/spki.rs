//! SubjectPublicKeyInfo field extraction
//!
//! All functions take the complete, tag-inclusive SPKI encoding:
//!
//! ```text
//! SEQUENCE {
//!     SEQUENCE { algorithm OID, parameters ANY OPTIONAL }
//!     BIT STRING subjectPublicKey
//! }
//! ```

use crate::constants::{CkUlong, ckk, oid};
use crate::der::tlv::{DerCursor, Tlv, unwrap_bit_string};
use crate::error::Structure;
use crate::{Error, Result};

/// Public key algorithm of a key or certificate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyType {
    /// Not yet known
    #[default]
    Unknown,
    /// RSA
    Rsa,
    /// Elliptic curve
    Ec,
}

impl KeyType {
    /// Matching `CKK_*` value
    pub const fn key_type_value(&self) -> Option<CkUlong> {
        match self {
            Self::Unknown => None,
            Self::Rsa => Some(ckk::RSA),
            Self::Ec => Some(ckk::EC),
        }
    }
}

/// RSA public key components, as unsigned big-endian integers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaPublicKey<'a> {
    /// Modulus
    pub modulus: &'a [u8],
    /// Public exponent
    pub exponent: &'a [u8],
}

/// EC public key components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcPublicKey<'a> {
    /// Encoded curve point
    pub point: &'a [u8],
    /// DER curve parameters, usually a named curve OID
    pub params: &'a [u8],
}

/// Split an SPKI into its algorithm identifier and key bit string
fn split(spki: &[u8]) -> Option<(Tlv<'_>, Tlv<'_>)> {
    let outer = Tlv::parse(spki)?;
    let mut fields = DerCursor::new(outer.value());
    let algorithm = fields.next()?;
    let key = fields.next()?;
    Some((algorithm, key))
}

/// Determine the key algorithm from the SPKI's algorithm OID
pub fn key_type(spki: &[u8]) -> Result<KeyType> {
    let algorithm = Tlv::parse(spki)
        .and_then(|outer| Tlv::parse(outer.value()))
        .ok_or(Error::Decode(Structure::AlgorithmId))?;
    let found = Tlv::parse(algorithm.value())
        .ok_or(Error::Decode(Structure::AlgorithmId))?
        .value();

    if found.len() <= 3 || found.len() >= algorithm.value().len() {
        return Err(Error::UnsupportedKeyAlgorithm);
    }

    if found == oid::RSA_ENCRYPTION {
        Ok(KeyType::Rsa)
    } else if found == oid::EC_PUBLIC_KEY {
        Ok(KeyType::Ec)
    } else {
        Err(Error::UnsupportedKeyAlgorithm)
    }
}

/// Extract modulus and exponent from an RSA SPKI
pub fn rsa_public_key(spki: &[u8]) -> Result<RsaPublicKey<'_>> {
    rsa_fields(spki).ok_or(Error::Decode(Structure::SubjectPublicKeyInfo))
}

fn rsa_fields(spki: &[u8]) -> Option<RsaPublicKey<'_>> {
    let (_, key) = split(spki)?;
    let key = unwrap_bit_string(key.value())?;
    let sequence = Tlv::parse(key)?;
    let mut integers = DerCursor::new(sequence.value());
    let modulus = integers.next()?.value();
    let exponent = integers.next()?.value();
    Some(RsaPublicKey { modulus, exponent })
}

/// Extract point and curve parameters from an EC SPKI
///
/// The point is the bit string payload as-is; it is not wrapped in an
/// OCTET STRING.
pub fn ec_public_key(spki: &[u8]) -> Result<EcPublicKey<'_>> {
    ec_fields(spki).ok_or(Error::Decode(Structure::SubjectPublicKeyInfo))
}

fn ec_fields(spki: &[u8]) -> Option<EcPublicKey<'_>> {
    let (algorithm, key) = split(spki)?;
    let mut algorithm = DerCursor::new(algorithm.value());
    algorithm.next()?;
    let params = algorithm.remaining();
    let point = unwrap_bit_string(key.value())?;
    Some(EcPublicKey { point, params })
}
