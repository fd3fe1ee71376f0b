//! Register value decoding.
//!
//! A register response carries its value as an unsigned big-endian mantissa
//! and a sign/exponent byte:
//!
//! ```text
//! +------+------+--------+--------+------+-----+----------+-----------+-----+
//! | 0x3f | 0x10 | reg_hi | reg_lo | unit | len | sign_exp | mantissa… | crc |
//! +------+------+--------+--------+------+-----+----------+-----------+-----+
//! ```
//!
//! `sign_exp` bit 7 negates the scale factor, bit 6 negates the exponent and
//! bits 0-5 hold its magnitude. The value is `mantissa * ±10^±exp`.

use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{Reading, UnitCode};

/// Decode the value of `register` from a CRC-checked response message.
pub fn decode_value(message: &[u8], register: u16) -> ProtocolResult<Reading> {
    if message.len() < RESPONSE_MANTISSA_OFFSET {
        return Err(ProtocolError::Truncated {
            expected: RESPONSE_MANTISSA_OFFSET,
            actual: message.len(),
        });
    }

    if message[0] != RESPONSE_ADDRESS || message[1] != CMD_GET_REGISTER {
        return Err(ProtocolError::MalformedHeader {
            address: message[0],
            command: message[1],
        });
    }

    let received = u16::from_be_bytes([
        message[RESPONSE_REGISTER_OFFSET],
        message[RESPONSE_REGISTER_OFFSET + 1],
    ]);
    if received != register {
        return Err(ProtocolError::RegisterMismatch {
            requested: register,
            received,
        });
    }

    let len = message[RESPONSE_MANTISSA_LEN_OFFSET] as usize;
    let end = RESPONSE_MANTISSA_OFFSET + len;
    let mantissa_bytes = message.get(RESPONSE_MANTISSA_OFFSET..end).ok_or(
        ProtocolError::Truncated {
            expected: end,
            actual: message.len(),
        },
    )?;

    let mantissa = decode_mantissa(mantissa_bytes)?;
    let scale = decode_scale(message[RESPONSE_SIGN_EXP_OFFSET]);

    Ok(Reading {
        register,
        unit: UnitCode(message[RESPONSE_UNIT_OFFSET]),
        value: mantissa as f64 * scale,
    })
}

/// Accumulate big-endian mantissa bytes into a signed integer.
pub fn decode_mantissa(bytes: &[u8]) -> ProtocolResult<i64> {
    if bytes.len() > std::mem::size_of::<i64>() {
        return Err(ProtocolError::MantissaOverflow(bytes.len()));
    }
    Ok(bytes
        .iter()
        .fold(0i64, |acc, &byte| (acc << 8) | byte as i64))
}

/// Scale factor encoded in a sign/exponent byte.
///
/// The sign bit applies to the scale factor rather than to the mantissa.
pub fn decode_scale(sign_exp: u8) -> f64 {
    let mut exponent = (sign_exp & SIGN_EXP_MAGNITUDE_MASK) as i32;
    if sign_exp & SIGN_EXP_NEGATIVE_EXPONENT != 0 {
        exponent = -exponent;
    }
    let scale = 10f64.powi(exponent);
    if sign_exp & SIGN_EXP_NEGATIVE != 0 {
        -scale
    } else {
        scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ENERGY_300: [u8; 10] = [0x3f, 0x10, 0x00, 0x3c, 0x00, 0x03, 0x00, 0x00, 0x01, 0x2c];

    #[test]
    fn test_decode_integer_value() {
        let reading = decode_value(&ENERGY_300, 0x003c).unwrap();
        assert_eq!(reading.register, 0x003c);
        assert_eq!(reading.unit, UnitCode(0x00));
        assert_eq!(reading.value, 300.0);
    }

    #[test]
    fn test_decode_ignores_crc_trailer() {
        let mut message = ENERGY_300.to_vec();
        message.extend_from_slice(&[0x9b, 0x3f]);
        assert_eq!(decode_value(&message, 0x003c).unwrap().value, 300.0);
    }

    #[test]
    fn test_register_mismatch() {
        let err = decode_value(&ENERGY_300, 0x0050).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::RegisterMismatch {
                requested: 0x0050,
                received: 0x003c,
            }
        );
    }

    #[test]
    fn test_malformed_header() {
        let mut message = ENERGY_300;
        message[0] = 0x7f;
        assert!(matches!(
            decode_value(&message, 0x003c),
            Err(ProtocolError::MalformedHeader { address: 0x7f, command: 0x10 })
        ));

        let mut message = ENERGY_300;
        message[1] = 0x11;
        assert!(matches!(
            decode_value(&message, 0x003c),
            Err(ProtocolError::MalformedHeader { address: 0x3f, command: 0x11 })
        ));
    }

    #[test]
    fn test_header_checked_before_register() {
        let mut message = ENERGY_300;
        message[1] = 0x00;
        assert_eq!(
            decode_value(&message, 0x0050).unwrap_err().kind(),
            "malformed_header"
        );
    }

    #[test]
    fn test_negative_exponent() {
        // 2345 * 10^-2 degrees
        let message = [0x3f, 0x10, 0x00, 0x56, 0x25, 0x02, 0x42, 0x09, 0x29];
        let reading = decode_value(&message, 0x0056).unwrap();
        assert_relative_eq!(reading.value, 23.45, epsilon = 1e-9);
        assert_eq!(reading.unit.label(), "C");
    }

    #[test]
    fn test_sign_applies_to_scale() {
        // 3456 * -(10^-2)
        let message = [
            0x3f, 0x10, 0x00, 0x56, 0x25, 0x04, 0xc2, 0x00, 0x00, 0x0d, 0x80,
        ];
        let reading = decode_value(&message, 0x0056).unwrap();
        assert_relative_eq!(reading.value, -34.56, epsilon = 1e-9);
    }

    #[test]
    fn test_positive_exponent() {
        let message = [0x3f, 0x10, 0x00, 0x44, 0x28, 0x01, 0x03, 0x07];
        let reading = decode_value(&message, 0x0044).unwrap();
        assert_eq!(reading.value, 7000.0);
    }

    #[test]
    fn test_zero_is_a_value() {
        let message = [0x3f, 0x10, 0x00, 0x50, 0x16, 0x02, 0x41, 0x00, 0x00];
        let reading = decode_value(&message, 0x0050).unwrap();
        assert_eq!(reading.value, 0.0);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(
            decode_value(&[0x3f, 0x10, 0x00], 0x003c).unwrap_err(),
            ProtocolError::Truncated {
                expected: 7,
                actual: 3,
            }
        );

        // Announces 4 mantissa bytes but carries 2.
        let message = [0x3f, 0x10, 0x00, 0x3c, 0x00, 0x04, 0x00, 0x01, 0x2c];
        assert_eq!(
            decode_value(&message, 0x003c).unwrap_err(),
            ProtocolError::Truncated {
                expected: 11,
                actual: 9,
            }
        );
    }

    #[test]
    fn test_mantissa_overflow() {
        assert_eq!(
            decode_mantissa(&[0u8; 9]).unwrap_err(),
            ProtocolError::MantissaOverflow(9)
        );
        assert_eq!(decode_mantissa(&[]).unwrap(), 0);
        assert_eq!(decode_mantissa(&[0x01, 0x00]).unwrap(), 256);
    }

    #[test]
    fn test_decode_scale() {
        assert_eq!(decode_scale(0x00), 1.0);
        assert_eq!(decode_scale(0x03), 1000.0);
        assert_relative_eq!(decode_scale(0x43), 0.001);
        assert_eq!(decode_scale(0x80), -1.0);
        assert_relative_eq!(decode_scale(0xc1), -0.1);
    }
}
