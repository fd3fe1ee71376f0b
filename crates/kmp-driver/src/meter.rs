//! Register reads against a single meter.
//!
//! A [`Meter`] turns one call into one complete half-duplex transaction:
//! build the request, send it, wait for the answer, unescape and CRC-check it
//! and decode the value. Every failure is reported to the caller; a failed
//! read leaves nothing behind that could affect the next one.

use std::time::Duration;

use kmp_metrics::{metric_defs, TransactionLabels};
use kmp_protocol::{decode_value, DestinationAddress, Reading, Register, Request};
use tracing::{debug, trace, warn};

use crate::error::DriverResult;
use crate::link::{Clock, MonotonicClock, SerialLink};
use crate::transport::Transport;

/// Counters kept across reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterStats {
    /// Reads that produced a value.
    pub reads_succeeded: u64,
    /// Reads that failed.
    pub reads_failed: u64,
    /// Escape sequences that decoded to an unexpected value.
    pub malformed_escapes: u64,
}

/// A Kamstrup meter reachable over a serial link.
#[derive(Debug)]
pub struct Meter<L, C = MonotonicClock> {
    name: String,
    address: DestinationAddress,
    transport: Transport<L, C>,
    stats: MeterStats,
}

impl<L: SerialLink> Meter<L, MonotonicClock> {
    /// Create a meter on `link` using the wall clock.
    pub fn new(name: impl Into<String>, link: L) -> Self {
        Meter::with_clock(name, link, MonotonicClock::new())
    }
}

impl<L: SerialLink, C: Clock> Meter<L, C> {
    /// Create a meter with an explicit clock.
    pub fn with_clock(name: impl Into<String>, link: L, clock: C) -> Self {
        Meter {
            name: name.into(),
            address: DestinationAddress::HeatMeter,
            transport: Transport::with_clock(link, clock),
            stats: MeterStats::default(),
        }
    }

    /// Address requests somewhere other than the heat meter.
    pub fn with_address(mut self, address: DestinationAddress) -> Self {
        self.address = address;
        self
    }

    /// Override the response window.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.set_timeout(timeout);
        self
    }

    /// Meter name used in logs and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Destination address of every request.
    pub fn address(&self) -> DestinationAddress {
        self.address
    }

    /// Counters so far.
    pub fn stats(&self) -> MeterStats {
        self.stats
    }

    /// Borrow the link.
    pub fn link(&self) -> &L {
        self.transport.link()
    }

    /// Mutably borrow the link.
    pub fn link_mut(&mut self) -> &mut L {
        self.transport.link_mut()
    }

    /// Give the link back.
    pub fn into_link(self) -> L {
        self.transport.into_link()
    }

    /// Read one of the known registers.
    pub fn read(&mut self, register: Register) -> DriverResult<Reading> {
        self.read_register(register.id())
    }

    /// Read any register by id.
    pub fn read_register(&mut self, register: u16) -> DriverResult<Reading> {
        let labels = TransactionLabels::new(self.name.as_str(), register);
        let started = self.transport.clock().now();

        let result = self.transact(register, &labels);

        let elapsed = self.transport.clock().now().saturating_sub(started);
        metrics::histogram!(metric_defs::TRANSACTION_TIME.name, &labels.to_labels())
            .record(elapsed.as_micros() as f64);

        match &result {
            Ok(reading) => {
                self.stats.reads_succeeded += 1;
                metrics::counter!(metric_defs::TRANSACTIONS.name, &labels.with_outcome("ok"))
                    .increment(1);
                debug!(
                    "Meter[{}]: register 0x{:04X} = {} {} ({:?})",
                    self.name,
                    register,
                    reading.value,
                    reading.unit,
                    elapsed
                );
            }
            Err(err) => {
                self.stats.reads_failed += 1;
                metrics::counter!(metric_defs::TRANSACTIONS.name, &labels.with_outcome(err.kind()))
                    .increment(1);
                warn!(
                    "Meter[{}]: read of register 0x{:04X} failed: {}",
                    self.name, register, err
                );
            }
        }

        result
    }

    fn transact(&mut self, register: u16, labels: &TransactionLabels) -> DriverResult<Reading> {
        let frame = Request::new(self.address, register).encode()?;
        trace!(
            "Meter[{}]: requesting register 0x{:04X} ({} bytes)",
            self.name,
            register,
            frame.len()
        );
        self.transport.send(&frame)?;

        let receiver = self.transport.receive()?;
        metrics::histogram!(metric_defs::RX_FRAME_SIZE.name, &labels.to_labels())
            .record(receiver.buffered_len() as f64);

        let unescaped = receiver.decode()?;
        if unescaped.malformed_escapes > 0 {
            self.stats.malformed_escapes += unescaped.malformed_escapes as u64;
            metrics::counter!(metric_defs::MALFORMED_ESCAPES.name, &labels.to_labels())
                .increment(unescaped.malformed_escapes as u64);
        }

        Ok(decode_value(&unescaped.message, register)?)
    }
}
