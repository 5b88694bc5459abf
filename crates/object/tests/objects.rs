//! End-to-end assembly of card objects from blobs and certificates

mod common;

use coolkey_object::prelude::*;
use coolkey_object::{ErrorCategory, UNAVAILABLE_INFORMATION};
use hex_literal::hex;

use common::{EC_SPKI, RSA_SPKI, certificate, format0_blob, format1_blob};

const CERT_ID: u32 = 0x6330_0000;
const KEY_ID: u32 = 0x6b30_0000;

fn ulong(value: CkUlong) -> Vec<u8> {
    value.to_ne_bytes().to_vec()
}

#[test]
fn test_key_completed_from_format0_certificate() {
    let der = certificate(&hex!("01"), "Alice", &RSA_SPKI);
    let cert_blob = format0_blob(
        CERT_ID,
        &[
            (cka::CLASS, &hex!("01000000")[..]),
            (cka::LABEL, &b"Alice's Signing Cert"[..]),
            (cka::VALUE, der.as_slice()),
        ],
    );
    let cert = CardObject::certificate(CERT_ID, &cert_blob, 1, None).unwrap();
    assert_eq!(cert.class(), Some(cko::CERTIFICATE));
    assert_eq!(cert.name(), Some("Alice"));

    // private key, id 0, TOKEN | SIGN
    let fixed = (3 << 4) | (1 << 7) | (1 << 16);
    let key_blob = format1_blob(KEY_ID, fixed, &[]);
    let mut key = CardObject::key(KEY_ID, &key_blob, 2).unwrap();
    assert!(!key.attributes().exists(cka::LABEL));

    key.complete_key(&cert).unwrap();
    assert_eq!(key.label(), "Alice's Signing Cert");
    assert_eq!(key.key_type(), KeyType::Rsa);
    assert_eq!(key.attributes().get_bool(cka::SIGN), Some(true));
    assert_eq!(key.attributes().get_bool(cka::DECRYPT), Some(false));
    assert_eq!(key.attributes().get(cka::MODULUS), Some(&hex!("00C3A1B2C1")[..]));

    let config = ObjectConfig::default();
    let class = ulong(cko::PRIVATE_KEY);
    assert!(key.matches_template(&[(cka::CLASS, class.as_slice())], &config));
    assert!(!cert.matches_template(&[(cka::CLASS, class.as_slice())], &config));
}

#[test]
fn test_object_id_mismatch_is_reported() {
    let blob = format1_blob(KEY_ID, 0, &[]);
    let err = CardObject::key(KEY_ID + 1, &blob, 2).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::IdentityMismatch);
}

#[test]
fn test_identity_card_objects() {
    let mut objects = Vec::new();
    for (instance, spki) in [(0u8, &RSA_SPKI[..]), (1, &RSA_SPKI[..]), (2, &EC_SPKI[..])] {
        let der = certificate(&[instance + 1], "Bob", spki);
        let cert = CardObject::identity_certificate(instance, &der).unwrap();
        let private = CardObject::identity_private_key(instance, &cert).unwrap();
        let public = CardObject::identity_public_key(instance, &cert).unwrap();
        objects.extend([cert, private, public]);
    }

    let handles: Vec<u32> = objects.iter().map(CardObject::handle).collect();
    assert_eq!(handles, [0x600, 0x400, 0x500, 0x601, 0x401, 0x501, 0x602, 0x402, 0x502]);

    let encryption_key = &objects[7];
    assert_eq!(encryption_key.key_type(), KeyType::Ec);
    assert_eq!(encryption_key.label(), "CAC Email Encryption Certificate");
    assert_eq!(encryption_key.attributes().get_bool(cka::DERIVE), Some(true));
    assert_eq!(encryption_key.attributes().get_bool(cka::SIGN), Some(false));

    let signing_key = &objects[4];
    assert_eq!(signing_key.attributes().get_bool(cka::SIGN), Some(true));
    assert_eq!(signing_key.attributes().get(cka::ID), Some(&[0u8, 2][..]));

    // every slot shares its CKA_ID between certificate and keys
    for triple in objects.chunks(3) {
        let ids: Vec<_> = triple.iter().map(|o| o.attributes().get(cka::ID)).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }
}

#[test]
fn test_reader_object_enumeration() {
    let config = ObjectConfig::default();
    let reader =
        CardObject::reader(0x7230_0000, 0x700, "Omnikey 3121", &hex!("3BFF1400"), true).unwrap();
    let der = certificate(&hex!("05"), "Carol", &RSA_SPKI);
    let cert = CardObject::identity_certificate(0, &der).unwrap();

    let visible: Vec<_> = [&reader, &cert]
        .into_iter()
        .filter(|o| o.matches_template(&[], &config))
        .collect();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind(), ObjectKind::IdentityCertificate);

    let shown = config.with_hide_reader_objects(false);
    assert!(reader.matches_template(&[], &shown));
    assert_eq!(reader.label(), "Omnikey 3121");
}

#[test]
fn test_attribute_query() {
    let der = certificate(&hex!("05"), "Carol", &RSA_SPKI);
    let cert = CardObject::identity_certificate(1, &der).unwrap();

    let mut label = [0u8; 64];
    let mut small = [0u8; 2];
    let mut template = [
        TemplateEntry::with_buffer(cka::LABEL, &mut label),
        TemplateEntry::with_buffer(cka::VALUE, &mut small),
        TemplateEntry::length_only(cka::SUBJECT),
    ];
    assert_eq!(cert.get_attribute_values(&mut template), Err(Error::BufferTooSmall));
    assert_eq!(template[0].filled(), Some(&b"CAC Email Signature Certificate"[..]));
    assert_eq!(template[1].value_len, UNAVAILABLE_INFORMATION);
    assert_eq!(template[2].value_len, common::common_name("Carol").len());
}

#[test]
fn test_signature_conversion() {
    let raw = hex!(
        "8000000000000000000000000000000000000000000000000000000000000001"
        "0000000000000000000000000000000000000000000000000000000000000002"
    );
    let sig = DerSignature::from_raw(&raw).unwrap();
    assert_eq!(&sig.as_bytes()[..6], &hex!("30 26 02 21 00 80"));
    assert_eq!(sig.to_raw(256).unwrap().as_slice(), &raw);
}
