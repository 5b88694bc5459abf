//! APDU response frames
//!
//! A card reply is the response payload followed by a two-byte status word.

pub mod status;

use bytes::Bytes;
use tracing::trace;

use crate::{Error, Result};
use status::StatusWord;

/// A response whose status word did not indicate success
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Card returned status {status}: {}", status.description())]
pub struct StatusError {
    /// Status word that caused the error
    pub status: StatusWord,
}

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Bytes,
    status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(payload: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload: payload.into(),
            status: status.into(),
        }
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let Some((payload, [sw1, sw2])) = raw.split_last_chunk::<2>() else {
            return Err(Error::Incomplete);
        };
        let status = StatusWord::new(*sw1, *sw2);

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = payload.len(),
            "Parsed APDU response"
        );

        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status,
        })
    }

    /// Response payload, without the status word
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The payload on success, the status as an error otherwise
    pub fn into_payload(self) -> std::result::Result<Bytes, StatusError> {
        if self.is_success() {
            Ok(self.payload)
        } else {
            Err(StatusError {
                status: self.status,
            })
        }
    }
}
