//! CRC-16 (polynomial 0x1021) used by KMP.
//!
//! The checksum is systematic: a sender computes the CRC over the message
//! followed by two zero bytes and writes the result big-endian into those two
//! bytes. The CRC of the complete message is then zero, so a receiver checks
//! validity with a single pass over everything it got.

use crate::constants::CRC_LEN;
use crate::error::{ProtocolError, ProtocolResult};

/// Generator polynomial.
pub const CRC_POLY: u16 = 0x1021;

/// Compute the KMP CRC-16 over `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut reg: u32 = 0;
    for &byte in bytes {
        let mut mask = 0x80u8;
        while mask != 0 {
            reg <<= 1;
            if byte & mask != 0 {
                reg |= 1;
            }
            mask >>= 1;
            if reg & 0x1_0000 != 0 {
                reg &= 0xffff;
                reg ^= CRC_POLY as u32;
            }
        }
    }
    (reg & 0xffff) as u16
}

/// Fill the last two bytes of `message` with the big-endian CRC of the rest.
///
/// The two trailing bytes are treated as placeholders and overwritten, so the
/// caller only needs to reserve room for them. Fails if there is no room.
pub fn append_crc(message: &mut [u8]) -> ProtocolResult<()> {
    let len = message.len();
    if len < CRC_LEN {
        return Err(ProtocolError::Truncated {
            expected: CRC_LEN,
            actual: len,
        });
    }
    message[len - 2] = 0;
    message[len - 1] = 0;
    let crc = crc16(message);
    message[len - 2..].copy_from_slice(&crc.to_be_bytes());
    Ok(())
}

/// Returns true if `message` (including its CRC trailer) checks out.
#[inline]
pub fn crc_is_valid(message: &[u8]) -> bool {
    crc16(message) == 0
}
