//! X.509 certificate field extraction

use crate::der::tlv::{DerCursor, Tlv};
use crate::error::Structure;
use crate::{Error, Result};

/// Fields located in a DER certificate
///
/// All slices borrow from the certificate passed to [`certificate_fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateFields<'a> {
    /// Serial number as a complete DER INTEGER
    pub serial: &'a [u8],
    /// Serial number content bytes
    pub serial_value: &'a [u8],
    /// Issuer name, tag-inclusive
    pub issuer: &'a [u8],
    /// Validity content (`notBefore`, `notAfter`)
    pub validity: &'a [u8],
    /// Subject name, tag-inclusive
    pub subject: &'a [u8],
    /// SubjectPublicKeyInfo, tag-inclusive
    pub public_key: &'a [u8],
}

/// Locate serial, names, validity and public key in a DER certificate
///
/// ```text
/// Certificate ::= SEQUENCE {
///     tbsCertificate SEQUENCE {
///         version [0] EXPLICIT OPTIONAL,
///         serialNumber, signature, issuer, validity, subject,
///         subjectPublicKeyInfo, ...
///     },
///     signatureAlgorithm, signatureValue
/// }
/// ```
pub fn certificate_fields(der: &[u8]) -> Result<CertificateFields<'_>> {
    fields(der).ok_or(Error::Decode(Structure::Certificate))
}

fn fields(der: &[u8]) -> Option<CertificateFields<'_>> {
    let signed = Tlv::parse(der)?;
    let tbs = Tlv::parse(signed.value())?;
    let mut cursor = DerCursor::new(tbs.value());

    if cursor.peek()?.is_context_constructed() {
        cursor.next()?;
    }

    let serial = cursor.next()?;
    // signature algorithm
    cursor.next()?;
    let issuer = cursor.next()?;
    let validity = cursor.next()?;
    let subject = cursor.next()?;
    let public_key = cursor.next()?;

    Some(CertificateFields {
        serial: serial.raw(),
        serial_value: serial.value(),
        issuer: issuer.raw(),
        validity: validity.value(),
        subject: subject.raw(),
        public_key: public_key.raw(),
    })
}
