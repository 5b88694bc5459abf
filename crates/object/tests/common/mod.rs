//! Blob and certificate builders shared by the integration tests

#![allow(dead_code)]

use coolkey_object::AttributeType;
use hex_literal::hex;

/// RSA SPKI with a 5-byte modulus and exponent 65537
pub const RSA_SPKI: [u8; 34] = hex!(
    "30 20"
    "30 0D 06 09 2A864886F70D010101 05 00"
    "03 0F 00 30 0C 02 05 00C3A1B2C1 02 03 010001"
);

/// EC SPKI on P-256 with a short point
pub const EC_SPKI: [u8; 31] = hex!(
    "30 1D"
    "30 13 06 07 2A8648CE3D0201 06 08 2A8648CE3D030107"
    "03 06 00 04 01020304"
);

/// Encode one DER element with a short-form length
pub fn der(tag: u8, content: &[u8]) -> Vec<u8> {
    assert!(content.len() < 0x80, "test builder only handles short lengths");
    let mut out = vec![tag, content.len() as u8];
    out.extend_from_slice(content);
    out
}

/// Name with a single commonName
pub fn common_name(cn: &str) -> Vec<u8> {
    let atv = der(0x30, &[der(0x06, &hex!("550403")), der(0x0C, cn.as_bytes())].concat());
    der(0x30, &der(0x31, &atv))
}

/// Certificate with version 3 and the given subject CN and public key
///
/// The SPKI is kept small enough that the whole certificate stays within
/// short-form lengths.
pub fn certificate(serial: &[u8], subject_cn: &str, spki: &[u8]) -> Vec<u8> {
    let algorithm = der(0x30, &hex!("06 03 2A0304 05 00"));
    let tbs = der(
        0x30,
        &[
            der(0xA0, &der(0x02, &[2])),
            der(0x02, serial),
            algorithm.clone(),
            common_name("Issuer"),
            der(0x30, &[]),
            common_name(subject_cn),
            spki.to_vec(),
        ]
        .concat(),
    );
    der(0x30, &[tbs, algorithm, der(0x03, &hex!("00 AA"))].concat())
}

/// Format 0 blob holding string records
pub fn format0_blob(object_id: u32, records: &[(AttributeType, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (attr_type, value) in records {
        body.extend(attr_type.to_be_bytes());
        body.extend((value.len() as u16).to_be_bytes());
        body.extend_from_slice(value);
    }

    let mut blob = vec![0x00];
    blob.extend(object_id.to_be_bytes());
    blob.extend((body.len() as u16).to_be_bytes());
    blob.extend(body);
    blob
}

/// Format 1 blob holding string records after the fixed word
pub fn format1_blob(object_id: u32, fixed: u32, records: &[(AttributeType, &[u8])]) -> Vec<u8> {
    let mut blob = vec![0x01];
    blob.extend(object_id.to_be_bytes());
    blob.extend(fixed.to_be_bytes());
    blob.extend((records.len() as u16).to_be_bytes());
    for (attr_type, value) in records {
        blob.extend(attr_type.to_be_bytes());
        blob.push(0x00);
        blob.extend((value.len() as u16).to_be_bytes());
        blob.extend_from_slice(value);
    }
    blob
}
