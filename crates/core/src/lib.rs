//! Byte buffers and APDU framing for CoolKey smart cards
//!
//! This crate provides the low-level byte handling shared by the CoolKey token driver:
//!
//! - [`ByteBuffer`], a growable buffer with positional big/little-endian field accessors
//! - [`Command`], the ISO/IEC 7816-4 command frame with short and extended length encodings
//! - [`Response`] and [`StatusWord`], the split of a card reply into payload and status
//!
//! Nothing here performs I/O. Frames are built for, and parsed from, a transport that
//! lives outside this crate.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod buffer;
pub mod command;
pub mod response;

mod error;
pub use error::{Error, Result};

pub use buffer::ByteBuffer;
pub use command::{Command, Le, LengthEncoding};
pub use response::status::StatusWord;
pub use response::{Response, StatusError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        ByteBuffer, Bytes, BytesMut, Command, Error, Le, LengthEncoding, Response, Result,
        StatusError, StatusWord,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let cmd = Command::new(0xB0, 0x56, 0x00, 0x00);
        assert_eq!(cmd.class(), 0xB0);
        assert_eq!(cmd.instruction(), 0x56);
        assert_eq!(cmd.p1(), 0x00);
        assert_eq!(cmd.p2(), 0x00);

        let resp = Response::from_bytes(&[0x01, 0x02, 0x03, 0x90, 0x00]).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.payload(), &[0x01, 0x02, 0x03]);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
