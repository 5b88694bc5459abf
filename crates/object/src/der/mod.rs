//! DER navigation and field extraction
//!
//! A bounds-checked reader ([`tlv`]) plus the extractors built on it for
//! public keys, certificates and names.

pub mod cert;
pub mod name;
pub mod spki;
pub mod tlv;

pub use cert::{CertificateFields, certificate_fields};
pub use name::common_name;
pub use spki::{EcPublicKey, KeyType, RsaPublicKey, ec_public_key, key_type, rsa_public_key};
pub use tlv::{DerCursor, Tlv, read_tlv, unwrap_bit_string};

/// DER builders for unit tests
#[cfg(test)]
pub(crate) mod test_fixtures {
    use coolkey_core::ByteBuffer;

    use super::tlv::{tag, write_header};

    /// countryName
    pub(crate) const COUNTRY: &[u8] = &[0x55, 0x04, 0x06];
    /// organizationName
    pub(crate) const ORGANIZATION: &[u8] = &[0x55, 0x04, 0x0A];

    /// Encode one element
    pub(crate) fn der(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = ByteBuffer::new();
        write_header(&mut out, tag, content.len()).unwrap();
        out.append_slice(content).unwrap();
        out.into()
    }

    /// SEQUENCE of already encoded elements
    pub(crate) fn sequence(elements: &[&[u8]]) -> Vec<u8> {
        der(tag::SEQUENCE, &elements.concat())
    }

    /// Name with one UTF8String attribute per RDN
    pub(crate) fn name(attributes: &[(&[u8], &str)]) -> Vec<u8> {
        let rdns: Vec<Vec<u8>> = attributes
            .iter()
            .map(|(oid, value)| {
                let atv = sequence(&[
                    &der(tag::OBJECT_IDENTIFIER, oid),
                    &der(0x0C, value.as_bytes()),
                ]);
                der(tag::SET, &atv)
            })
            .collect();
        let rdns: Vec<&[u8]> = rdns.iter().map(Vec::as_slice).collect();
        sequence(&rdns)
    }

    /// Minimal certificate around the given fields
    pub(crate) fn certificate(
        with_version: bool,
        serial: &[u8],
        issuer: &[u8],
        subject: &[u8],
        spki: &[u8],
    ) -> Vec<u8> {
        let version = der(0xA0, &der(tag::INTEGER, &[2]));
        let serial = der(tag::INTEGER, serial);
        let algorithm = sequence(&[&der(tag::OBJECT_IDENTIFIER, &[0x2A, 0x03]), &[0x05, 0x00]]);
        let validity = sequence(&[
            &der(0x17, b"250101000000Z"),
            &der(0x17, b"350101000000Z"),
        ]);

        let mut tbs_fields: Vec<&[u8]> = Vec::new();
        if with_version {
            tbs_fields.push(&version);
        }
        tbs_fields.extend([
            serial.as_slice(),
            algorithm.as_slice(),
            issuer,
            validity.as_slice(),
            subject,
            spki,
        ]);
        let tbs = sequence(&tbs_fields);
        let signature = der(tag::BIT_STRING, &[0x00, 0xAA, 0xBB]);
        sequence(&[&tbs, &algorithm, &signature])
    }
}
