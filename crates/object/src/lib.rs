//! PKCS#11 object model for CoolKey tokens
//!
//! Turns what the applet stores into PKCS#11 objects:
//!
//! - [`decoder`] reads the two on-card blob formats into an [`AttributeStore`]
//! - [`der`] locates certificate and public key fields without a full ASN.1 parser
//! - [`CardObject`] assembles keys, certificates, reader pseudo-objects and the
//!   fixed objects of identity-document (CAC) cards
//! - [`signature`] converts between DER and raw `r || s` signatures
//!
//! Everything operates on byte slices already read from the card.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod attribute;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod der;
mod error;
pub mod object;
pub mod signature;

pub use attribute::{Attribute, AttributeStore, TemplateEntry, UNAVAILABLE_INFORMATION};
pub use config::ObjectConfig;
pub use constants::{AttributeType, CkUlong};
pub use decoder::{ObjectFormat, decode_object};
pub use der::KeyType;
pub use error::{Error, ErrorCategory, Result, Structure};
pub use object::{CardObject, ObjectKind};
pub use signature::DerSignature;

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::constants::{cka, ckc, ckk, cko};
    pub use crate::{
        AttributeStore, AttributeType, CardObject, CkUlong, DerSignature, Error, KeyType,
        ObjectConfig, ObjectKind, Result, TemplateEntry,
    };
}
