//! Error types for object decoding and attribute queries

use derive_more::Display;
use thiserror::Error;

use crate::constants::AttributeType;

/// Result type for object operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// DER structure named in a decode failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Structure {
    /// SubjectPublicKeyInfo
    #[display("certificate Subject Public Key Info")]
    SubjectPublicKeyInfo,
    /// X.509 certificate
    #[display("DER certificate")]
    Certificate,
    /// AlgorithmIdentifier of a public key
    #[display("key algorithm ID")]
    AlgorithmId,
    /// X.501 Name
    #[display("distinguished name")]
    DistinguishedName,
    /// DER `SEQUENCE { r, s }` signature
    #[display("DER signature")]
    Signature,
}

/// Broad classification of an [`Error`]
///
/// Callers exposing a PKCS#11 surface map these onto `CKR_*` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Lengths, tags or layouts that do not add up
    MalformedInput,
    /// A blob carries a different object id than requested
    IdentityMismatch,
    /// Well-formed key material for an algorithm we do not handle
    UnsupportedAlgorithm,
    /// Expected outcome of a template query, not corruption
    AttributeQuery,
    /// Allocation failure
    ResourceExhausted,
}

/// Errors raised while decoding or querying card objects
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Buffer or framing error from the core crate
    #[error(transparent)]
    Core(#[from] coolkey_core::Error),

    /// Blob too short to hold its header
    #[error("Invalid PKCS#11 object size {0}")]
    InvalidObjectSize(usize),

    /// Unknown leading format byte
    #[error("Unknown object format {0}")]
    UnknownFormat(u8),

    /// Format 0 attribute section length disagrees with the blob
    #[error("Attribute data length {actual} does not match stated length {declared}")]
    LengthMismatch {
        /// Length stated in the header
        declared: usize,
        /// Bytes actually following the header
        actual: usize,
    },

    /// An attribute record runs past the end of the blob
    #[error("Invalid attribute length at offset {0}")]
    Truncated(usize),

    /// A ulong attribute was not stored as four bytes
    #[error("Invalid length {len} for attribute {attribute:#x}")]
    InvalidAttributeLength {
        /// Attribute type
        attribute: AttributeType,
        /// Stored length
        len: usize,
    },

    /// Format 1 record with an unknown data kind
    #[error("Invalid attribute data type {kind} for attribute {attribute:#x}")]
    InvalidDataKind {
        /// Attribute type
        attribute: AttributeType,
        /// Data kind tag
        kind: u8,
    },

    /// Declared object id does not match the requested one
    #[error("Object id {actual:#010x} does not match stated id {expected:#010x}")]
    IdMismatch {
        /// Requested id
        expected: u32,
        /// Id found in the blob
        actual: u32,
    },

    /// DER navigation failed
    #[error("Failed to decode {0}")]
    Decode(Structure),

    /// Algorithm OID is neither RSA nor EC
    #[error("Unsupported key algorithm")]
    UnsupportedKeyAlgorithm,

    /// Assembler input missing or out of range
    #[error("Invalid object data: {0}")]
    InvalidData(&'static str),

    /// A template named an attribute the object does not carry
    #[error("Attribute type invalid")]
    AttributeTypeInvalid,

    /// A template buffer could not hold the attribute value
    #[error("Buffer too small")]
    BufferTooSmall,
}

impl Error {
    /// Classify this error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Core(coolkey_core::Error::OutOfMemory(_)) => ErrorCategory::ResourceExhausted,
            Self::IdMismatch { .. } => ErrorCategory::IdentityMismatch,
            Self::UnsupportedKeyAlgorithm => ErrorCategory::UnsupportedAlgorithm,
            Self::AttributeTypeInvalid | Self::BufferTooSmall => ErrorCategory::AttributeQuery,
            _ => ErrorCategory::MalformedInput,
        }
    }
}
