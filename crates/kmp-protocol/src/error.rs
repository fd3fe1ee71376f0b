//! Protocol error types.

use thiserror::Error;

/// Which fixed-size buffer ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Escaped transmit frame.
    Transmit,
    /// Raw bytes read from the link.
    RawReceive,
    /// Unescaped response message.
    Message,
}

impl std::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferKind::Transmit => write!(f, "transmit"),
            BufferKind::RawReceive => write!(f, "raw receive"),
            BufferKind::Message => write!(f, "message"),
        }
    }
}

/// Errors that can occur while encoding a request or decoding a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A fixed-size buffer would have overflowed.
    #[error("{buffer} buffer capacity of {capacity} bytes exceeded")]
    CapacityExceeded {
        /// The buffer that filled up.
        buffer: BufferKind,
        /// Its capacity in bytes.
        capacity: usize,
    },

    /// Checksum over the unescaped message was not zero.
    #[error("CRC error: residue 0x{residue:04X} over {len} bytes")]
    CrcError {
        /// CRC computed over the whole message including its trailer.
        residue: u16,
        /// Number of message bytes checked.
        len: usize,
    },

    /// The echoed address or command byte was wrong.
    #[error("invalid message header: address 0x{address:02X}, command 0x{command:02X}")]
    MalformedHeader {
        /// Echoed address byte.
        address: u8,
        /// Echoed command byte.
        command: u8,
    },

    /// The response carried a different register than the one requested.
    #[error("register id mismatch: requested 0x{requested:04X}, got 0x{received:04X}")]
    RegisterMismatch {
        /// Register that was requested.
        requested: u16,
        /// Register echoed by the meter.
        received: u16,
    },

    /// The message ended before the fields it announces.
    #[error("message truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required by the header.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// The mantissa does not fit in a 64-bit integer.
    #[error("mantissa of {0} bytes does not fit in 64 bits")]
    MantissaOverflow(usize),
}

impl ProtocolError {
    /// Create a capacity error for the given buffer.
    pub fn capacity(buffer: BufferKind, capacity: usize) -> Self {
        ProtocolError::CapacityExceeded { buffer, capacity }
    }

    /// Stable snake_case name of the error, used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::CapacityExceeded { .. } => "capacity_exceeded",
            ProtocolError::CrcError { .. } => "crc_error",
            ProtocolError::MalformedHeader { .. } => "malformed_header",
            ProtocolError::RegisterMismatch { .. } => "register_mismatch",
            ProtocolError::Truncated { .. } => "truncated",
            ProtocolError::MantissaOverflow(_) => "mantissa_overflow",
        }
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::capacity(BufferKind::Transmit, 20);
        assert_eq!(err.to_string(), "transmit buffer capacity of 20 bytes exceeded");

        let err = ProtocolError::RegisterMismatch {
            requested: 0x003c,
            received: 0x0050,
        };
        assert!(err.to_string().contains("0x003C"));
        assert!(err.to_string().contains("0x0050"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            ProtocolError::CrcError { residue: 1, len: 3 }.kind(),
            "crc_error"
        );
        assert_eq!(
            ProtocolError::MalformedHeader {
                address: 0,
                command: 0
            }
            .kind(),
            "malformed_header"
        );
        assert_eq!(ProtocolError::MantissaOverflow(9).kind(), "mantissa_overflow");
    }
}
