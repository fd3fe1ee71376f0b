//! Protocol constants
//!
//! These constants define the framing bytes, command codes, buffer capacities
//! and timing values used by the Kamstrup KMP serial protocol.

use std::time::Duration;

// ============================================================================
// Framing
// ============================================================================

/// First byte of every frame sent to the meter.
pub const FRAME_PREFIX: u8 = 0x80;
/// Start marker the meter may send ahead of (or inside) a response.
pub const START_MARKER: u8 = 0x40;
/// Last byte of every frame in both directions.
pub const FRAME_TERMINATOR: u8 = 0x0d;
/// Escape marker. The following byte is the escaped value XOR [`ESCAPE_XOR`].
pub const ESCAPE_MARKER: u8 = 0x1b;
/// Value XORed into an escaped byte.
pub const ESCAPE_XOR: u8 = 0xff;
/// Acknowledge byte. Never sent by this driver but reserved on the wire.
pub const ACK: u8 = 0x06;

/// Bytes that must be escaped inside a message body.
pub const ESCAPE_SET: [u8; 5] = [ACK, FRAME_TERMINATOR, ESCAPE_MARKER, START_MARKER, FRAME_PREFIX];

/// Returns true if `byte` must be escaped inside a message body.
#[inline]
pub const fn needs_escape(byte: u8) -> bool {
    matches!(
        byte,
        ACK | FRAME_TERMINATOR | ESCAPE_MARKER | START_MARKER | FRAME_PREFIX
    )
}

// ============================================================================
// Commands
// ============================================================================

/// Register read command.
pub const CMD_GET_REGISTER: u8 = 0x10;
/// Number of registers requested in a single read command.
pub const GET_REGISTER_COUNT: u8 = 0x01;

// ============================================================================
// Response layout
// ============================================================================

/// Address echoed by a heat meter in its responses.
pub const RESPONSE_ADDRESS: u8 = 0x3f;
/// Offset of the register id (big-endian, 2 bytes).
pub const RESPONSE_REGISTER_OFFSET: usize = 2;
/// Offset of the unit code.
pub const RESPONSE_UNIT_OFFSET: usize = 4;
/// Offset of the mantissa length.
pub const RESPONSE_MANTISSA_LEN_OFFSET: usize = 5;
/// Offset of the sign/exponent byte.
pub const RESPONSE_SIGN_EXP_OFFSET: usize = 6;
/// Offset of the first mantissa byte.
pub const RESPONSE_MANTISSA_OFFSET: usize = 7;

/// Sign/exponent byte: the scale factor is negative.
pub const SIGN_EXP_NEGATIVE: u8 = 0x80;
/// Sign/exponent byte: the exponent is negative.
pub const SIGN_EXP_NEGATIVE_EXPONENT: u8 = 0x40;
/// Sign/exponent byte: exponent magnitude.
pub const SIGN_EXP_MAGNITUDE_MASK: u8 = 0x3f;

// ============================================================================
// Capacities and timing
// ============================================================================

/// Capacity of the transmit frame buffer.
pub const TX_FRAME_CAPACITY: usize = 20;
/// Capacity of the raw receive buffer (escaped, start markers removed).
pub const RX_RAW_CAPACITY: usize = 50;
/// Capacity of the unescaped message buffer.
pub const MESSAGE_CAPACITY: usize = 40;

/// How long the meter gets to answer a request.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(200);

/// Length of the CRC trailer.
pub const CRC_LEN: usize = 2;
