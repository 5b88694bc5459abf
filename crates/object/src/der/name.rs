//! Distinguished name helpers

use crate::constants::oid;
use crate::der::tlv::{DerCursor, Tlv};
use crate::error::Structure;
use crate::{Error, Result};

/// Value bytes of the first commonName in a DER `Name`
///
/// Only the first attribute of each RDN is examined.
pub fn common_name(name: &[u8]) -> Result<&[u8]> {
    find_common_name(name).ok_or(Error::Decode(Structure::DistinguishedName))
}

fn find_common_name(name: &[u8]) -> Option<&[u8]> {
    let sequence = Tlv::parse(name)?;
    for rdn in DerCursor::new(sequence.value()) {
        let attribute = Tlv::parse(rdn.value())?;
        let mut parts = DerCursor::new(attribute.value());
        if parts.next()?.value() != oid::COMMON_NAME {
            continue;
        }
        return parts.next().map(|value| value.value());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::test_fixtures::{COUNTRY, ORGANIZATION, name};
    use hex_literal::hex;

    #[test]
    fn test_common_name_found() {
        let dn = name(&[
            (COUNTRY, "US"),
            (ORGANIZATION, "Org"),
            (oid::COMMON_NAME, "Alice"),
        ]);
        assert_eq!(common_name(&dn).unwrap(), b"Alice");
    }

    #[test]
    fn test_common_name_missing() {
        let dn = name(&[(ORGANIZATION, "Org")]);
        assert_eq!(
            common_name(&dn),
            Err(Error::Decode(Structure::DistinguishedName))
        );
        assert_eq!(
            common_name(&hex!("30 00")),
            Err(Error::Decode(Structure::DistinguishedName))
        );
    }
}
