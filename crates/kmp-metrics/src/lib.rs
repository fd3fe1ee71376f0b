//! Metrics infrastructure for the KMP meter driver.
//!
//! This crate describes all metrics recorded by the driver. It re-exports the
//! `metrics` crate for convenience and defines every metric as a structured
//! [`Metric`] constant to avoid typos and provide rich metadata.
//!
//! Without an installed recorder every metric call is a no-op, so library code
//! records unconditionally.
//!
//! # Example
//!
//! ```rust,ignore
//! use kmp_metrics::{TransactionLabels, metric_defs, describe_metrics};
//!
//! // Initialize metrics descriptions at startup
//! describe_metrics();
//!
//! let labels = TransactionLabels::new("multical", 0x003c).with_outcome("ok");
//! metrics::counter!(metric_defs::TRANSACTIONS.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

/// A metric declaration with its metadata.
///
/// # Example
///
/// ```rust
/// use kmp_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FRAMES_SENT: Metric = Metric::counter("kmp.frames_sent")
///     .with_description("Frames written to the link")
///     .with_unit(Unit::Count)
///     .with_labels(&["meter"]);
///
/// assert_eq!(FRAMES_SENT.name, "kmp.frames_sent");
/// assert_eq!(FRAMES_SENT.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "kmp.transactions").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    ///
    /// This should be called once at startup for each metric.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the driver.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every transaction-scoped metric.
    pub const TRANSACTION_LABELS: &[&str] = &["meter", "register"];

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Register read transactions, by outcome.
    ///
    /// Labels: meter, register, outcome
    ///
    /// `outcome` is `ok` or the error kind (`timeout`, `crc_error`, ...).
    pub const TRANSACTIONS: Metric = Metric::counter("kmp.transactions")
        .with_description("Register read transactions by outcome")
        .with_unit(Unit::Count)
        .with_labels(&["meter", "register", "outcome"]);

    /// Wall-clock time from sending a request to the end of decoding.
    ///
    /// Labels: meter, register
    pub const TRANSACTION_TIME: Metric = Metric::histogram("kmp.transaction_time_us")
        .with_description("Register read transaction time in microseconds")
        .with_unit(Unit::Microseconds)
        .with_labels(TRANSACTION_LABELS);

    // ========================================================================
    // Link
    // ========================================================================

    /// Raw response size, start markers excluded.
    ///
    /// Labels: meter, register
    pub const RX_FRAME_SIZE: Metric = Metric::histogram("kmp.rx_frame_size_bytes")
        .with_description("Raw response frame size in bytes")
        .with_unit(Unit::Bytes)
        .with_labels(TRANSACTION_LABELS);

    /// Escape sequences that decoded to a byte which never needed escaping.
    ///
    /// Labels: meter, register
    pub const MALFORMED_ESCAPES: Metric = Metric::counter("kmp.malformed_escapes")
        .with_description("Escape sequences with an unexpected value")
        .with_unit(Unit::Count)
        .with_labels(TRANSACTION_LABELS);

    // ========================================================================
    // Readings
    // ========================================================================

    /// Last value read for a sensor.
    ///
    /// Labels: meter, sensor
    pub const READING: Metric = Metric::gauge("kmp.reading")
        .with_description("Last decoded value of a sensor")
        .with_labels(&["meter", "sensor"]);

    /// Poll cycles completed.
    ///
    /// Labels: meter
    pub const POLL_CYCLES: Metric = Metric::counter("kmp.poll_cycles")
        .with_description("Completed poll cycles")
        .with_unit(Unit::Count)
        .with_labels(&["meter"]);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &TRANSACTIONS,
        &TRANSACTION_TIME,
        &RX_FRAME_SIZE,
        &MALFORMED_ESCAPES,
        &READING,
        &POLL_CYCLES,
    ];
}

/// Labels identifying a single register transaction.
///
/// # Example
///
/// ```rust
/// use kmp_metrics::TransactionLabels;
///
/// let labels = TransactionLabels::new("multical", 0x003c);
/// let label_vec = labels.to_labels();
/// assert!(label_vec.contains(&("register", "0x003C".to_string())));
/// ```
#[derive(Debug, Clone)]
pub struct TransactionLabels {
    /// Meter name.
    pub meter: String,
    /// Register id.
    pub register: u16,
}

impl TransactionLabels {
    /// Creates labels for a transaction on `register` of `meter`.
    pub fn new(meter: impl Into<String>, register: u16) -> Self {
        Self {
            meter: meter.into(),
            register,
        }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("meter", self.meter.clone()),
            ("register", format!("0x{:04X}", self.register)),
        ]
    }

    /// Returns the labels plus an `outcome` label.
    pub fn with_outcome(&self, outcome: &str) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.push(("outcome", outcome.to_string()));
        labels
    }
}

/// Describes all metrics used by the driver.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Install a Prometheus recorder serving `/metrics` on `addr`.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}
