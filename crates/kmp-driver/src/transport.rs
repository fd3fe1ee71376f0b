//! Timeout-bounded frame exchange over a [`SerialLink`].

use std::time::Duration;

use kmp_protocol::{FrameReceiver, RESPONSE_TIMEOUT};
use tracing::{trace, warn};

use crate::error::{DriverError, DriverResult};
use crate::link::{Clock, MonotonicClock, SerialLink};

/// Sends request frames and collects response frames.
///
/// Owns the link for the duration of every exchange; there is never more than
/// one outstanding request.
#[derive(Debug)]
pub struct Transport<L, C = MonotonicClock> {
    link: L,
    clock: C,
    timeout: Duration,
}

impl<L: SerialLink, C: Clock> Transport<L, C> {
    /// Create a transport with an explicit clock.
    pub fn with_clock(link: L, clock: C) -> Self {
        Transport {
            link,
            clock,
            timeout: RESPONSE_TIMEOUT,
        }
    }

    /// Set the response window.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Current response window.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The clock used for deadlines.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Borrow the link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Give the link back.
    pub fn into_link(self) -> L {
        self.link
    }

    /// Write a frame. Nothing is acknowledged at this layer.
    pub fn send(&mut self, frame: &[u8]) -> DriverResult<()> {
        trace!("TX {}", hex::encode(frame));
        self.link.write_all(frame)?;
        Ok(())
    }

    /// Wait for one response frame.
    ///
    /// Stale input is discarded first. Start markers are dropped as they
    /// arrive. Returns once a terminator has been received, or fails when the
    /// response window closes first.
    pub fn receive(&mut self) -> DriverResult<FrameReceiver> {
        self.link.clear_input()?;

        let start = self.clock.now();
        let mut receiver = FrameReceiver::new();
        loop {
            let elapsed = self.clock.now().saturating_sub(start);
            if elapsed > self.timeout {
                warn!("Timed out listening for data");
                return Err(DriverError::Timeout {
                    elapsed,
                    received: receiver.buffered_len(),
                });
            }

            if self.link.bytes_available()? == 0 {
                std::hint::spin_loop();
                continue;
            }

            let byte = self.link.read_byte()?;
            if receiver.push(byte)? {
                trace!("RX {}", hex::encode(receiver.raw()));
                return Ok(receiver);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::{LoopbackLink, ManualClock};
    use kmp_protocol::{BufferKind, ProtocolError, RX_RAW_CAPACITY};

    fn transport(link: LoopbackLink) -> Transport<LoopbackLink, ManualClock> {
        Transport::with_clock(link, ManualClock::with_step(Duration::from_millis(1)))
    }

    #[test]
    fn test_send_writes_frame() {
        let mut transport = transport(LoopbackLink::new());
        transport.send(&[0x80, 0x3f, 0x0d]).unwrap();
        assert_eq!(transport.link().written(), &[0x80, 0x3f, 0x0d]);
    }

    #[test]
    fn test_receive_returns_terminated_frame() {
        let mut link = LoopbackLink::new();
        link.queue_response(vec![0x40, 0x3f, 0x10, 0x0d]);
        let mut transport = transport(link);

        transport.send(&[0x80, 0x0d]).unwrap();
        let receiver = transport.receive().unwrap();
        assert_eq!(receiver.raw(), &[0x3f, 0x10, 0x0d]);
    }

    #[test]
    fn test_receive_discards_stale_input() {
        let mut link = LoopbackLink::new();
        link.inject_noise(&[0x11, 0x22, 0x0d]);
        link.queue_response(vec![0x3f, 0x0d]);
        let mut transport = transport(link);

        transport.send(&[0x80, 0x0d]).unwrap();
        let receiver = transport.receive().unwrap();
        assert_eq!(receiver.raw(), &[0x3f, 0x0d]);
    }

    #[test]
    fn test_receive_times_out_on_silence() {
        let mut transport = transport(LoopbackLink::new());
        transport.set_timeout(Duration::from_millis(50));

        let err = transport.receive().unwrap_err();
        match err {
            DriverError::Timeout { elapsed, received } => {
                assert!(elapsed > Duration::from_millis(50));
                assert!(elapsed <= Duration::from_millis(52));
                assert_eq!(received, 0);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_receive_times_out_without_terminator() {
        let mut link = LoopbackLink::new();
        link.queue_response(vec![0x3f, 0x10, 0x00]);
        let mut transport = transport(link);

        transport.send(&[0x80, 0x0d]).unwrap();
        let err = transport.receive().unwrap_err();
        assert!(matches!(err, DriverError::Timeout { received: 3, .. }));
    }

    #[test]
    fn test_receive_capacity() {
        let mut link = LoopbackLink::new();
        link.queue_response(vec![0x01; RX_RAW_CAPACITY + 5]);
        let mut transport = transport(link);

        transport.send(&[0x80, 0x0d]).unwrap();
        let err = transport.receive().unwrap_err();
        assert!(matches!(
            err,
            DriverError::Protocol(ProtocolError::CapacityExceeded {
                buffer: BufferKind::RawReceive,
                ..
            })
        ));
    }
}
