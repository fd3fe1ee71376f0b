//! Kamstrup KMP Protocol
//!
//! This crate provides the wire-level pieces needed to read registers from a
//! Kamstrup heat meter (Multical 402) over its serial interface. It does no
//! I/O of its own; see `kmp-driver` for the transaction loop.
//!
//! # Protocol Overview
//!
//! Every exchange is a single half-duplex request/response:
//!
//! - **Request** (host → meter): `0x80`, escaped
//!   `[address, 0x10, 0x01, reg_hi, reg_lo, crc_hi, crc_lo]`, `0x0d`
//! - **Response** (meter → host): escaped
//!   `[0x3f, 0x10, reg_hi, reg_lo, unit, len, sign_exp, mantissa…, crc_hi, crc_lo]`, `0x0d`
//!
//! Bytes `0x06 0x0d 0x1b 0x40 0x80` are escaped as `0x1b, byte ^ 0xff`. The
//! CRC is a systematic CRC-16 with polynomial 0x1021, so a valid message has a
//! CRC of zero.
//!
//! # Example
//!
//! ```rust
//! use kmp_protocol::{decode_frame, decode_value, DestinationAddress, Register, Request};
//!
//! let frame = Request::new(DestinationAddress::HeatMeter, Register::HeatEnergy.id()).encode()?;
//! assert_eq!(frame[0], 0x80);
//!
//! let raw = [0x3f, 0x10, 0x00, 0x3c, 0x00, 0x03, 0x00, 0x00, 0x01, 0x2c, 0x9b, 0x3f, 0x0d];
//! let message = decode_frame(&raw)?.message;
//! let reading = decode_value(&message, Register::HeatEnergy.id())?;
//! assert_eq!(reading.value, 300.0);
//! # Ok::<(), kmp_protocol::ProtocolError>(())
//! ```

mod constants;
mod crc;
mod error;
mod frame;
mod registers;
mod types;
mod value;

pub use constants::*;
pub use crc::*;
pub use error::*;
pub use frame::*;
pub use registers::*;
pub use types::*;
pub use value::*;
