//! Core error type for buffer and framing operations
//!
//! All fallible operations in this crate return [`Error`]. Callers further up
//! (the object model, the tools) wrap it rather than inventing parallel variants.

/// Result type for buffer and framing operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    //
    // Buffer related errors
    //
    /// Growing a buffer failed; the buffer has been reset to empty
    #[error("Out of memory: failed to reserve {0} bytes")]
    OutOfMemory(usize),

    /// Hex input could not be decoded
    #[error("Invalid hex string: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    //
    // Command related errors
    //
    /// Payload or requested length does not fit the active encoding
    #[error("Data too long: {len} bytes (max {max})")]
    DataTooLong {
        /// Offending length
        len: usize,
        /// Largest length the encoding accepts
        max: usize,
    },

    /// Raw command bytes do not describe a valid frame
    #[error("Invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Short and extended length encodings were mixed in one frame
    #[error("Length encoding mismatch: {0}")]
    EncodingMismatch(&'static str),

    //
    // Response related errors
    //
    /// Response shorter than a status word
    #[error("Incomplete response")]
    Incomplete,
}

impl Error {
    /// Create a data too long error
    pub const fn data_too_long(len: usize, max: usize) -> Self {
        Self::DataTooLong { len, max }
    }

    /// Create an encoding mismatch error
    pub const fn mismatch(message: &'static str) -> Self {
        Self::EncodingMismatch(message)
    }
}
