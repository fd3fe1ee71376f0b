//! Link capabilities the driver needs from its environment.
//!
//! The driver only ever writes a frame, polls for single bytes, discards
//! stale input and reads a monotonic clock. Anything that can do those four
//! things (a serial port, a TCP bridge, a test double) can carry KMP.

use std::io;
use std::time::{Duration, Instant};

/// A byte-level duplex channel to the meter.
pub trait SerialLink {
    /// Write every byte of `bytes` to the peer.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of received bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read one byte. Only called after [`SerialLink::bytes_available`]
    /// reported at least one.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Discard everything received but not yet read.
    fn clear_input(&mut self) -> io::Result<()>;
}

impl<T: SerialLink + ?Sized> SerialLink for &mut T {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn clear_input(&mut self) -> io::Result<()> {
        (**self).clear_input()
    }
}

impl<T: SerialLink + ?Sized> SerialLink for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn clear_input(&mut self) -> io::Result<()> {
        (**self).clear_input()
    }
}

/// A monotonic clock.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
