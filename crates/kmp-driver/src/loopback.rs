//! In-memory meter stand-in.
//!
//! [`LoopbackLink`] plays back scripted responses, one per request frame
//! written to it. [`ManualClock`] advances a fixed step on every read so
//! timeouts are reached deterministically without sleeping.

use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use kmp_protocol::{
    crc16, needs_escape, CMD_GET_REGISTER, ESCAPE_MARKER, ESCAPE_XOR, FRAME_TERMINATOR,
    RESPONSE_ADDRESS, START_MARKER,
};

use crate::link::{Clock, SerialLink};

/// A scripted serial link.
///
/// Each complete request frame written to the link releases the next queued
/// response. Released bytes become readable on the next availability check,
/// so they survive the input flush at the start of a receive. Bytes added
/// with [`LoopbackLink::inject_noise`] are readable immediately and are
/// discarded by that flush.
#[derive(Debug, Default)]
pub struct LoopbackLink {
    written: Vec<u8>,
    pending: VecDeque<u8>,
    in_flight: VecDeque<u8>,
    responses: VecDeque<Option<Vec<u8>>>,
    requests_seen: usize,
}

impl LoopbackLink {
    /// Create a link with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next request with `bytes`.
    pub fn queue_response(&mut self, bytes: impl Into<Vec<u8>>) {
        self.responses.push_back(Some(bytes.into()));
    }

    /// Leave the next request unanswered.
    pub fn queue_silence(&mut self) {
        self.responses.push_back(None);
    }

    /// Make `bytes` readable right away, as if left over from an earlier exchange.
    pub fn inject_noise(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Written bytes split into frames at each terminator.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.written
            .split_inclusive(|&b| b == FRAME_TERMINATOR)
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// Number of complete request frames written.
    pub fn requests_seen(&self) -> usize {
        self.requests_seen
    }

    /// Scripted responses not yet released.
    pub fn responses_remaining(&self) -> usize {
        self.responses.len()
    }
}

impl SerialLink for LoopbackLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(bytes);
        for _ in bytes.iter().filter(|&&b| b == FRAME_TERMINATOR) {
            self.requests_seen += 1;
            if let Some(Some(response)) = self.responses.pop_front() {
                self.in_flight.extend(response);
            }
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        self.pending.extend(self.in_flight.drain(..));
        Ok(self.pending.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.pending
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no byte available"))
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}

/// A clock that moves forward by a fixed step every time it is read.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    step: Duration,
}

impl ManualClock {
    /// A clock that only moves when [`ManualClock::advance`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that advances by `step` on every read.
    pub fn with_step(step: Duration) -> Self {
        ManualClock {
            now: Cell::new(Duration::ZERO),
            step,
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.advance(self.step);
        self.now.get()
    }
}

/// Build the frame a heat meter sends in answer to a register read.
///
/// The frame starts with a start marker, is escaped, CRC-protected and
/// terminated.
pub fn encode_response(register: u16, unit: u8, sign_exp: u8, mantissa: &[u8]) -> Vec<u8> {
    let mut message = vec![RESPONSE_ADDRESS, CMD_GET_REGISTER];
    message.extend_from_slice(&register.to_be_bytes());
    message.push(unit);
    message.push(mantissa.len() as u8);
    message.push(sign_exp);
    message.extend_from_slice(mantissa);
    message.extend_from_slice(&[0, 0]);
    let crc = crc16(&message);
    let len = message.len();
    message[len - 2..].copy_from_slice(&crc.to_be_bytes());

    let mut frame = vec![START_MARKER];
    for byte in message {
        if needs_escape(byte) {
            frame.push(ESCAPE_MARKER);
            frame.push(byte ^ ESCAPE_XOR);
        } else {
            frame.push(byte);
        }
    }
    frame.push(FRAME_TERMINATOR);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmp_protocol::decode_frame;

    #[test]
    fn test_response_released_per_request() {
        let mut link = LoopbackLink::new();
        link.queue_response(vec![0x01, 0x0d]);
        link.queue_response(vec![0x02, 0x0d]);

        assert_eq!(link.bytes_available().unwrap(), 0);

        link.write_all(&[0x80, 0x0d]).unwrap();
        link.clear_input().unwrap();
        assert_eq!(link.bytes_available().unwrap(), 2);
        assert_eq!(link.read_byte().unwrap(), 0x01);
        assert_eq!(link.read_byte().unwrap(), 0x0d);
        assert!(link.read_byte().is_err());

        assert_eq!(link.requests_seen(), 1);
        assert_eq!(link.responses_remaining(), 1);
    }

    #[test]
    fn test_silence_consumes_a_slot() {
        let mut link = LoopbackLink::new();
        link.queue_silence();
        link.queue_response(vec![0x02, 0x0d]);

        link.write_all(&[0x80, 0x0d]).unwrap();
        assert_eq!(link.bytes_available().unwrap(), 0);

        link.write_all(&[0x80, 0x0d]).unwrap();
        assert_eq!(link.bytes_available().unwrap(), 2);
        assert_eq!(link.written_frames(), vec![vec![0x80, 0x0d], vec![0x80, 0x0d]]);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::with_step(Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::from_millis(20));
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_millis(1030));

        let frozen = ManualClock::new();
        assert_eq!(frozen.now(), Duration::ZERO);
        assert_eq!(frozen.now(), Duration::ZERO);
    }

    #[test]
    fn test_encode_response_decodes() {
        let frame = encode_response(0x0056, 0x25, 0xc2, &[0x00, 0x00, 0x0d, 0x80]);
        assert_eq!(frame[0], START_MARKER);
        assert_eq!(*frame.last().unwrap(), FRAME_TERMINATOR);

        let decoded = decode_frame(&frame[1..]).unwrap();
        assert_eq!(
            decoded.message.as_slice(),
            &[0x3f, 0x10, 0x00, 0x56, 0x25, 0x04, 0xc2, 0x00, 0x00, 0x0d, 0x80, 0x2a, 0x52]
        );
    }
}
