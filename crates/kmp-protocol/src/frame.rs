//! Frame encoding/decoding utilities.
//!
//! Requests are wrapped in a frame with a fixed prefix and terminator. Bytes
//! that collide with framing bytes are escaped as `0x1b, byte ^ 0xff`.
//!
//! ```text
//! +------+---------------------------------------------+------+
//! | 0x80 | escaped(address cmd 0x01 reg_hi reg_lo crc) | 0x0d |
//! +------+---------------------------------------------+------+
//! ```
//!
//! Responses end with the same terminator. The meter may put `0x40` start
//! markers in front of (or into) its answer; those are dropped as they arrive.

use heapless::Vec;
use tracing::warn;

use crate::constants::*;
use crate::crc::{append_crc, crc16};
use crate::error::{BufferKind, ProtocolError, ProtocolResult};
use crate::types::DestinationAddress;

/// Escaped frame ready for transmission.
pub type TxFrame = Vec<u8, TX_FRAME_CAPACITY>;

/// Unescaped message (request or response body including its CRC).
pub type Message = Vec<u8, MESSAGE_CAPACITY>;

/// A single register read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Where the request goes.
    pub address: DestinationAddress,
    /// Register to read.
    pub register: u16,
}

impl Request {
    /// Create a register read request.
    pub fn new(address: DestinationAddress, register: u16) -> Self {
        Request { address, register }
    }

    /// Build the unescaped message, CRC included.
    pub fn to_message(&self) -> ProtocolResult<Message> {
        build_message(
            self.address.to_byte(),
            &[CMD_GET_REGISTER, GET_REGISTER_COUNT],
            self.register,
        )
    }

    /// Encode the request as a transmit frame.
    pub fn encode(&self) -> ProtocolResult<TxFrame> {
        let message = self.to_message()?;
        encode_frame(&message)
    }
}

/// Concatenate address, command bytes and register id and append the CRC.
pub fn build_message(address: u8, command: &[u8], register: u16) -> ProtocolResult<Message> {
    let overflow = || ProtocolError::capacity(BufferKind::Message, MESSAGE_CAPACITY);

    let mut message = Message::new();
    message.push(address).map_err(|_| overflow())?;
    message.extend_from_slice(command).map_err(|_| overflow())?;
    message
        .extend_from_slice(&register.to_be_bytes())
        .map_err(|_| overflow())?;
    message.extend_from_slice(&[0, 0]).map_err(|_| overflow())?;
    append_crc(&mut message)?;
    Ok(message)
}

/// Wrap a message in prefix and terminator, escaping reserved bytes.
pub fn encode_frame(message: &[u8]) -> ProtocolResult<TxFrame> {
    let overflow = || ProtocolError::capacity(BufferKind::Transmit, TX_FRAME_CAPACITY);

    let mut frame = TxFrame::new();
    frame.push(FRAME_PREFIX).map_err(|_| overflow())?;
    escape_into(message, &mut frame, BufferKind::Transmit)?;
    frame.push(FRAME_TERMINATOR).map_err(|_| overflow())?;
    Ok(frame)
}

/// Append `message` to `out`, escaping every byte of the escape set.
pub fn escape_into<const N: usize>(
    message: &[u8],
    out: &mut Vec<u8, N>,
    buffer: BufferKind,
) -> ProtocolResult<()> {
    let overflow = || ProtocolError::capacity(buffer, N);

    for &byte in message {
        if needs_escape(byte) {
            out.push(ESCAPE_MARKER).map_err(|_| overflow())?;
            out.push(byte ^ ESCAPE_XOR).map_err(|_| overflow())?;
        } else {
            out.push(byte).map_err(|_| overflow())?;
        }
    }
    Ok(())
}

/// Result of removing escape sequences from a raw frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unescaped {
    /// The message bytes.
    pub message: Message,
    /// Escape sequences whose value was not a reserved byte.
    pub malformed_escapes: usize,
}

/// Remove escape sequences from `raw`.
///
/// An escape whose decoded value is not a reserved byte is logged and kept.
/// A dangling escape marker at the very end is dropped.
pub fn unescape(raw: &[u8]) -> ProtocolResult<Unescaped> {
    let overflow = || ProtocolError::capacity(BufferKind::Message, MESSAGE_CAPACITY);

    let mut message = Message::new();
    let mut malformed_escapes = 0;
    let mut i = 0;
    while i < raw.len() {
        let byte = raw[i];
        if byte == ESCAPE_MARKER {
            let Some(&next) = raw.get(i + 1) else {
                warn!("Dangling escape marker at end of frame");
                malformed_escapes += 1;
                break;
            };
            let value = next ^ ESCAPE_XOR;
            if !needs_escape(value) {
                warn!("Missing escape {:02X}", value);
                malformed_escapes += 1;
            }
            message.push(value).map_err(|_| overflow())?;
            i += 2;
        } else {
            message.push(byte).map_err(|_| overflow())?;
            i += 1;
        }
    }

    Ok(Unescaped {
        message,
        malformed_escapes,
    })
}

/// Unescape a received frame and verify its CRC.
///
/// A trailing terminator is excluded from the pass.
pub fn decode_frame(raw: &[u8]) -> ProtocolResult<Unescaped> {
    let body = raw.strip_suffix(&[FRAME_TERMINATOR]).unwrap_or(raw);
    let unescaped = unescape(body)?;

    let residue = crc16(&unescaped.message);
    if residue != 0 {
        return Err(ProtocolError::CrcError {
            residue,
            len: unescaped.message.len(),
        });
    }
    Ok(unescaped)
}

/// Accumulates a response frame one byte at a time.
///
/// Start markers are dropped; the frame is complete once a terminator has
/// been appended.
#[derive(Debug, Default)]
pub struct FrameReceiver {
    buffer: Vec<u8, RX_RAW_CAPACITY>,
}

impl FrameReceiver {
    /// Create an empty receiver.
    pub fn new() -> Self {
        FrameReceiver { buffer: Vec::new() }
    }

    /// Feed one byte from the link.
    ///
    /// Returns `Ok(true)` once the terminator has arrived. Bytes pushed after
    /// that are ignored.
    pub fn push(&mut self, byte: u8) -> ProtocolResult<bool> {
        if self.is_complete() {
            return Ok(true);
        }
        if byte == START_MARKER {
            return Ok(false);
        }
        self.buffer
            .push(byte)
            .map_err(|_| ProtocolError::capacity(BufferKind::RawReceive, RX_RAW_CAPACITY))?;
        Ok(byte == FRAME_TERMINATOR)
    }

    /// Feed a slice of bytes, stopping at the terminator.
    ///
    /// Returns `Ok(true)` if the frame is complete.
    pub fn extend(&mut self, bytes: &[u8]) -> ProtocolResult<bool> {
        for &byte in bytes {
            if self.push(byte)? {
                return Ok(true);
            }
        }
        Ok(self.is_complete())
    }

    /// Whether the last stored byte is the terminator.
    pub fn is_complete(&self) -> bool {
        self.buffer.last() == Some(&FRAME_TERMINATOR)
    }

    /// Raw bytes received so far, terminator included.
    pub fn raw(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Unescape and CRC-check the buffered frame.
    pub fn decode(&self) -> ProtocolResult<Unescaped> {
        decode_frame(&self.buffer)
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
