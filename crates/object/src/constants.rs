//! PKCS#11 constants used by the object model
//!
//! Attribute types are plain `u32` values. Values stored *inside* attributes
//! (classes, key types, certificate types) are native `CK_ULONG`s.

use std::ffi::c_ulong;

/// Attribute type identifier (`CK_ATTRIBUTE_TYPE`)
pub type AttributeType = u32;

/// Native unsigned long (`CK_ULONG`)
pub type CkUlong = c_ulong;

/// Netscape/Mozilla vendor-defined base
pub const NSS_VENDOR_BASE: u32 = 0xCE53_4350;

/// Attribute types
pub mod cka {
    use super::{AttributeType, NSS_VENDOR_BASE};

    /// Object class
    pub const CLASS: AttributeType = 0x0000;
    /// Stored on the token
    pub const TOKEN: AttributeType = 0x0001;
    /// Requires login
    pub const PRIVATE: AttributeType = 0x0002;
    /// Display label
    pub const LABEL: AttributeType = 0x0003;
    /// Object value
    pub const VALUE: AttributeType = 0x0011;
    /// Certificate type
    pub const CERTIFICATE_TYPE: AttributeType = 0x0080;
    /// DER-encoded issuer name
    pub const ISSUER: AttributeType = 0x0081;
    /// DER-encoded serial number
    pub const SERIAL_NUMBER: AttributeType = 0x0082;
    /// Key type
    pub const KEY_TYPE: AttributeType = 0x0100;
    /// DER-encoded subject name
    pub const SUBJECT: AttributeType = 0x0101;
    /// Key identifier
    pub const ID: AttributeType = 0x0102;
    /// Sensitive key
    pub const SENSITIVE: AttributeType = 0x0103;
    /// Supports encryption
    pub const ENCRYPT: AttributeType = 0x0104;
    /// Supports decryption
    pub const DECRYPT: AttributeType = 0x0105;
    /// Supports wrapping
    pub const WRAP: AttributeType = 0x0106;
    /// Supports unwrapping
    pub const UNWRAP: AttributeType = 0x0107;
    /// Supports signing
    pub const SIGN: AttributeType = 0x0108;
    /// Supports signing with recovery
    pub const SIGN_RECOVER: AttributeType = 0x0109;
    /// Supports verification
    pub const VERIFY: AttributeType = 0x010A;
    /// Supports verification with recovery
    pub const VERIFY_RECOVER: AttributeType = 0x010B;
    /// Supports key derivation
    pub const DERIVE: AttributeType = 0x010C;
    /// Start of validity
    pub const START_DATE: AttributeType = 0x0110;
    /// End of validity
    pub const END_DATE: AttributeType = 0x0111;
    /// RSA modulus
    pub const MODULUS: AttributeType = 0x0120;
    /// RSA public exponent
    pub const PUBLIC_EXPONENT: AttributeType = 0x0122;
    /// Secret key length in bytes
    pub const VALUE_LEN: AttributeType = 0x0161;
    /// Key may be extracted
    pub const EXTRACTABLE: AttributeType = 0x0162;
    /// Key generated on the token
    pub const LOCAL: AttributeType = 0x0163;
    /// Key has never been extractable
    pub const NEVER_EXTRACTABLE: AttributeType = 0x0164;
    /// Key has always been sensitive
    pub const ALWAYS_SENSITIVE: AttributeType = 0x0165;
    /// Object may be modified
    pub const MODIFIABLE: AttributeType = 0x0170;
    /// DER-encoded EC domain parameters
    pub const EC_PARAMS: AttributeType = 0x0180;
    /// DER-encoded EC point
    pub const EC_POINT: AttributeType = 0x0181;

    /// Reader holds a CoolKey token
    pub const MOZ_IS_COOL_KEY: AttributeType = NSS_VENDOR_BASE + 24;
    /// Card ATR
    pub const MOZ_ATR: AttributeType = NSS_VENDOR_BASE + 25;
}

/// Object classes
pub mod cko {
    use super::{CkUlong, NSS_VENDOR_BASE};

    /// Data object
    pub const DATA: CkUlong = 0;
    /// Certificate
    pub const CERTIFICATE: CkUlong = 1;
    /// Public key
    pub const PUBLIC_KEY: CkUlong = 2;
    /// Private key
    pub const PRIVATE_KEY: CkUlong = 3;
    /// Secret key
    pub const SECRET_KEY: CkUlong = 4;
    /// Reader pseudo-object
    pub const MOZ_READER: CkUlong = (NSS_VENDOR_BASE + 5) as CkUlong;
}

/// Key types
pub mod ckk {
    use super::CkUlong;

    /// RSA
    pub const RSA: CkUlong = 0x00;
    /// Elliptic curve
    pub const EC: CkUlong = 0x03;
    /// Generic secret
    pub const GENERIC_SECRET: CkUlong = 0x10;
    /// Triple DES
    pub const DES3: CkUlong = 0x15;
}

/// Certificate types
pub mod ckc {
    use super::CkUlong;

    /// X.509 public key certificate
    pub const X_509: CkUlong = 0;
}

/// Data kind tags of format 1 attribute records
pub mod data_kind {
    /// Two-byte length followed by raw bytes
    pub const STRING: u8 = 0;
    /// Four-byte big-endian integer
    pub const INTEGER: u8 = 1;
    /// Boolean false, no payload
    pub const BOOL_FALSE: u8 = 2;
    /// Boolean true, no payload
    pub const BOOL_TRUE: u8 = 3;
}

/// Well-known object identifiers, as raw DER content bytes
pub mod oid {
    /// rsaEncryption (1.2.840.113549.1.1.1)
    pub const RSA_ENCRYPTION: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x01];
    /// id-ecPublicKey (1.2.840.10045.2.1)
    pub const EC_PUBLIC_KEY: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01];
    /// commonName (2.5.4.3)
    pub const COMMON_NAME: &[u8] = &[0x55, 0x04, 0x03];
}
