//! APDU command frames
//!
//! A command is a fixed 4-byte header (CLA, INS, P1, P2) optionally followed by a
//! payload and an expected response length (Le). Two length encodings exist:
//!
//! - short ("direct", T=0 style): a single Lc byte, payloads below 256 bytes
//! - extended (T=1 style): a zero sentinel byte then a 2-byte big-endian length,
//!   payloads below 65536 bytes
//!
//! Once a frame carries data it is committed to one encoding, and its Le must use
//! the same one.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::{Error, Result};

/// Header length (CLA, INS, P1, P2)
pub const HEADER_LEN: usize = 4;
/// Offset of the Lc byte, or of the Le byte in a frame without data
pub const LC_OFFSET: usize = 4;
/// Payloads strictly below this size use the short encoding
pub const MAX_SHORT_DATA_LEN: usize = 256;
/// Payloads strictly below this size fit the extended encoding
pub const MAX_EXTENDED_DATA_LEN: usize = 65536;

/// Length encoding of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthEncoding {
    /// Single length byte
    Short,
    /// Zero sentinel followed by a 2-byte big-endian length
    Extended,
}

impl LengthEncoding {
    /// Pick the encoding for a payload of `len` bytes
    pub const fn for_data_len(len: usize) -> Result<Self> {
        if len < MAX_SHORT_DATA_LEN {
            Ok(Self::Short)
        } else if len < MAX_EXTENDED_DATA_LEN {
            Ok(Self::Extended)
        } else {
            Err(Error::data_too_long(len, MAX_EXTENDED_DATA_LEN - 1))
        }
    }
}

/// Expected response length
///
/// The encoded value 0 asks for the implicit maximum of the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Le {
    /// One byte, 0 meaning 256
    Short(u8),
    /// Two bytes, 0 meaning 65536
    Extended(u16),
}

impl Le {
    /// The encoding this Le uses
    pub const fn encoding(&self) -> LengthEncoding {
        match self {
            Self::Short(_) => LengthEncoding::Short,
            Self::Extended(_) => LengthEncoding::Extended,
        }
    }

    /// Number of response bytes requested, with 0 expanded to the implicit maximum
    pub const fn expected_bytes(&self) -> usize {
        match self {
            Self::Short(0) => MAX_SHORT_DATA_LEN,
            Self::Short(n) => *n as usize,
            Self::Extended(0) => MAX_EXTENDED_DATA_LEN,
            Self::Extended(n) => *n as usize,
        }
    }
}

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Option<Bytes>,
    le: Option<Le>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Command class byte
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction byte
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// First parameter
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Set the class byte
    pub const fn set_class(&mut self, cla: u8) {
        self.cla = cla;
    }

    /// Set the instruction byte
    pub const fn set_instruction(&mut self, ins: u8) {
        self.ins = ins;
    }

    /// Set the first parameter
    pub const fn set_p1(&mut self, p1: u8) {
        self.p1 = p1;
    }

    /// Set the second parameter
    pub const fn set_p2(&mut self, p2: u8) {
        self.p2 = p2;
    }

    /// Command payload, if any
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Expected response length, if any
    pub const fn le(&self) -> Option<Le> {
        self.le
    }

    /// The encoding the payload has committed the frame to
    pub fn data_encoding(&self) -> Option<LengthEncoding> {
        self.data.as_ref().map(|data| self.encoding_of(data.len()))
    }

    /// Replace the payload, choosing the short or extended encoding from its size
    ///
    /// Any previously set Le is dropped.
    pub fn set_data(&mut self, data: impl Into<Bytes>) -> Result<()> {
        let data = data.into();
        LengthEncoding::for_data_len(data.len())?;
        self.data = Some(data);
        self.le = None;
        Ok(())
    }

    /// Builder form of [`Command::set_data`]
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Result<Self> {
        self.set_data(data)?;
        Ok(self)
    }

    /// Append to the payload, rewriting the length field
    ///
    /// Appending uses the short encoding only: a payload that would grow to 256
    /// bytes or more is rejected rather than upgraded, and so is any append to an
    /// extended frame.
    pub fn append_data(&mut self, more: &[u8]) -> Result<()> {
        if self.le.is_some() {
            return Err(Error::mismatch("cannot append data after Le"));
        }
        let existing = self.data.as_ref().map_or(0, Bytes::len);
        let total = existing + more.len();
        if total >= MAX_SHORT_DATA_LEN {
            return Err(Error::data_too_long(total, MAX_SHORT_DATA_LEN - 1));
        }

        let mut joined = BytesMut::with_capacity(total);
        if let Some(data) = &self.data {
            joined.put_slice(data);
        }
        joined.put_slice(more);
        self.data = Some(joined.freeze());
        Ok(())
    }

    /// Make this a data-less frame expecting `len` response bytes
    ///
    /// Lengths up to 256 use the short encoding, up to 65536 the extended one.
    pub fn set_receive_length(&mut self, len: usize) -> Result<()> {
        let le = if len <= MAX_SHORT_DATA_LEN {
            Le::Short((len & 0xFF) as u8)
        } else if len <= MAX_EXTENDED_DATA_LEN {
            Le::Extended((len & 0xFFFF) as u16)
        } else {
            return Err(Error::data_too_long(len, MAX_EXTENDED_DATA_LEN));
        };
        self.data = None;
        self.le = Some(le);
        Ok(())
    }

    /// Append an Le using exactly the given encoding
    ///
    /// A data-bearing frame only accepts an Le in its committed encoding.
    pub fn append_le(&mut self, le: Le) -> Result<()> {
        match (self.data_encoding(), le.encoding()) {
            (Some(LengthEncoding::Short), LengthEncoding::Extended) => Err(Error::mismatch(
                "extended Le on a short-encoded frame",
            )),
            (Some(LengthEncoding::Extended), LengthEncoding::Short) => Err(Error::mismatch(
                "short Le on an extended-encoded frame",
            )),
            _ => {
                self.le = Some(le);
                Ok(())
            }
        }
    }

    /// Append an Le for `len` response bytes, picking a compatible encoding
    ///
    /// On a data-bearing frame the committed encoding is used and 0 asks for its
    /// implicit maximum. On a frame without data, 1..=256 is encoded short and
    /// anything else up to 65536 extended.
    pub fn append_receive_length(&mut self, len: usize) -> Result<()> {
        let le = match self.data_encoding() {
            Some(LengthEncoding::Short) => {
                if len > MAX_SHORT_DATA_LEN {
                    return Err(Error::mismatch(
                        "receive length needs extended encoding on a short-encoded frame",
                    ));
                }
                Le::Short((len & 0xFF) as u8)
            }
            Some(LengthEncoding::Extended) | None if len > MAX_EXTENDED_DATA_LEN => {
                return Err(Error::data_too_long(len, MAX_EXTENDED_DATA_LEN));
            }
            Some(LengthEncoding::Extended) => Le::Extended((len & 0xFFFF) as u16),
            None if len != 0 && len <= MAX_SHORT_DATA_LEN => Le::Short((len & 0xFF) as u8),
            None => Le::Extended((len & 0xFFFF) as u16),
        };
        self.append_le(le)
    }

    /// Builder form of [`Command::append_le`]
    pub fn with_le(mut self, le: Le) -> Result<Self> {
        self.append_le(le)?;
        Ok(self)
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        // Header (CLA, INS, P1, P2) is always 4 bytes
        let mut length = HEADER_LEN;

        if let Some(data) = &self.data {
            length += match self.encoding_of(data.len()) {
                LengthEncoding::Short => 1,
                LengthEncoding::Extended => 3,
            };
            length += data.len();
        }

        length += match (self.le, &self.data) {
            (None, _) => 0,
            (Some(Le::Short(_)), _) => 1,
            (Some(Le::Extended(_)), Some(_)) => 2,
            // Data-less extended Le carries its own zero sentinel
            (Some(Le::Extended(_)), None) => 3,
        };

        length
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        // Header: CLA, INS, P1, P2
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if let Some(data) = &self.data {
            match self.encoding_of(data.len()) {
                LengthEncoding::Short => buffer.put_u8(data.len() as u8),
                LengthEncoding::Extended => {
                    buffer.put_u8(0);
                    buffer.put_u16(data.len() as u16);
                }
            }
            buffer.put_slice(data);
        }

        match self.le {
            Some(Le::Short(le)) => buffer.put_u8(le),
            Some(Le::Extended(le)) => {
                if self.data.is_none() {
                    buffer.put_u8(0);
                }
                buffer.put_u16(le);
            }
            None => {}
        }

        trace!(
            cla = format_args!("{:#04x}", self.cla),
            ins = format_args!("{:#04x}", self.ins),
            data_len = self.data.as_ref().map_or(0, Bytes::len),
            le = ?self.le,
            "Encoded APDU command"
        );

        buffer.freeze()
    }

    /// Parse a command from raw bytes
    ///
    /// Accepts the short and extended layouts of all four ISO 7816-4 cases.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_LEN {
            return Err(Error::InvalidCommandLength(raw.len()));
        }

        let mut command = Self::new(raw[0], raw[1], raw[2], raw[3]);
        let body = &raw[HEADER_LEN..];

        match body {
            // Case 1: header only
            [] => {}
            // Case 2 short: Le only
            [le] => command.le = Some(Le::Short(*le)),
            // Case 2 extended: 00 Le1 Le2
            [0, hi, lo] => command.le = Some(Le::Extended(u16::from_be_bytes([*hi, *lo]))),
            // Case 3/4 extended: 00 Lc1 Lc2 data [Le1 Le2]
            [0, hi, lo, rest @ ..] => {
                let lc = u16::from_be_bytes([*hi, *lo]) as usize;
                if lc < MAX_SHORT_DATA_LEN {
                    return Err(Error::mismatch("extended Lc for a short payload"));
                }
                match rest.len().checked_sub(lc) {
                    Some(0) => {}
                    Some(2) => {
                        command.le = Some(Le::Extended(u16::from_be_bytes([
                            rest[lc],
                            rest[lc + 1],
                        ])));
                    }
                    _ => return Err(Error::InvalidCommandLength(raw.len())),
                }
                command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
            }
            // Case 3/4 short: Lc data [Le]
            [0, ..] => return Err(Error::mismatch("zero Lc in a short-encoded frame")),
            [lc, rest @ ..] => {
                let lc = *lc as usize;
                match rest.len().checked_sub(lc) {
                    Some(0) => {}
                    Some(1) => command.le = Some(Le::Short(rest[lc])),
                    _ => return Err(Error::InvalidCommandLength(raw.len())),
                }
                command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
            }
        }

        Ok(command)
    }

    const fn encoding_of(&self, data_len: usize) -> LengthEncoding {
        if data_len < MAX_SHORT_DATA_LEN {
            LengthEncoding::Short
        } else {
            LengthEncoding::Extended
        }
    }
}
