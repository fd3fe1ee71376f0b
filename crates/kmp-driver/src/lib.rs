//! Blocking KMP driver
//!
//! Reads registers from a Kamstrup heat meter over any byte link that
//! implements [`SerialLink`]. One call to [`Meter::read_register`] is one
//! complete request/response transaction; there is never more than one in
//! flight on a link.
//!
//! ```rust
//! use kmp_driver::{encode_response, LoopbackLink, ManualClock, Meter};
//! use kmp_protocol::Register;
//! use std::time::Duration;
//!
//! let mut link = LoopbackLink::new();
//! link.queue_response(encode_response(0x003c, 0x03, 0x00, &[0x01, 0x2c]));
//!
//! let clock = ManualClock::with_step(Duration::from_millis(1));
//! let mut meter = Meter::with_clock("boiler", link, clock);
//! let reading = meter.read(Register::HeatEnergy)?;
//! assert_eq!(reading.value, 300.0);
//! # Ok::<(), kmp_driver::DriverError>(())
//! ```

mod error;
mod link;
mod loopback;
mod meter;
mod poll;
mod transport;

pub use error::{DriverError, DriverResult};
pub use link::{Clock, MonotonicClock, SerialLink};
pub use loopback::{encode_response, LoopbackLink, ManualClock};
pub use meter::{Meter, MeterStats};
pub use poll::{
    CycleReport, DeviceClass, PollCycle, Publisher, Sample, Sensor, SensorKind, StateClass,
};
pub use transport::Transport;
