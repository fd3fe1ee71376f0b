//! Poll cycles over a set of sensors.
//!
//! Each sensor maps one meter register onto a named output. A cycle reads
//! every configured sensor once, in order, and hands each value to a
//! [`Publisher`]. A failed read is reported and skipped; the rest of the
//! cycle still runs.

use kmp_metrics::metric_defs;
use kmp_protocol::Register;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DriverError;
use crate::link::{Clock, SerialLink};
use crate::meter::Meter;

/// The outputs a heat meter can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Accumulated heat energy.
    Energy,
    /// Current power.
    Power,
    /// Forward temperature.
    TemperatureIn,
    /// Return temperature.
    TemperatureOut,
    /// Differential temperature.
    TemperatureDiff,
    /// Current water flow.
    Flow,
    /// Accumulated volume.
    Volume,
}

/// Category of the measured quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Energy.
    Energy,
    /// Power.
    Power,
    /// Temperature.
    Temperature,
}

/// How a value evolves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// A point-in-time measurement.
    Measurement,
    /// A counter that only grows.
    TotalIncreasing,
}

impl SensorKind {
    /// Every sensor kind, in polling order.
    pub const ALL: [SensorKind; 7] = [
        SensorKind::Energy,
        SensorKind::Power,
        SensorKind::TemperatureIn,
        SensorKind::TemperatureOut,
        SensorKind::TemperatureDiff,
        SensorKind::Flow,
        SensorKind::Volume,
    ];

    /// The register backing this sensor.
    pub const fn register(self) -> Register {
        match self {
            SensorKind::Energy => Register::HeatEnergy,
            SensorKind::Power => Register::CurrentPower,
            SensorKind::TemperatureIn => Register::ForwardTemperature,
            SensorKind::TemperatureOut => Register::ReturnTemperature,
            SensorKind::TemperatureDiff => Register::DifferentialTemperature,
            SensorKind::Flow => Register::WaterFlow,
            SensorKind::Volume => Register::Volume,
        }
    }

    /// Configuration key of this sensor.
    pub const fn key(self) -> &'static str {
        match self {
            SensorKind::Energy => "energy",
            SensorKind::Power => "power",
            SensorKind::TemperatureIn => "temperature_in",
            SensorKind::TemperatureOut => "temperature_out",
            SensorKind::TemperatureDiff => "temperature_diff",
            SensorKind::Flow => "flow",
            SensorKind::Volume => "volume",
        }
    }

    /// Name used when none is configured.
    pub const fn default_name(self) -> &'static str {
        match self {
            SensorKind::Energy => "Energy",
            SensorKind::Power => "Power",
            SensorKind::TemperatureIn => "Temperature In",
            SensorKind::TemperatureOut => "Temperature Out",
            SensorKind::TemperatureDiff => "Temperature Difference",
            SensorKind::Flow => "Flow",
            SensorKind::Volume => "Volume",
        }
    }

    /// Unit of measurement.
    pub const fn unit(self) -> &'static str {
        match self {
            SensorKind::Energy => "MWh",
            SensorKind::Power => "kW",
            SensorKind::TemperatureIn | SensorKind::TemperatureOut | SensorKind::TemperatureDiff => {
                "°C"
            }
            SensorKind::Flow => "L/h",
            SensorKind::Volume => "m³",
        }
    }

    /// Decimals shown when the value is displayed.
    pub const fn accuracy_decimals(self) -> usize {
        match self {
            SensorKind::Energy => 3,
            SensorKind::Power => 1,
            SensorKind::TemperatureIn | SensorKind::TemperatureOut | SensorKind::TemperatureDiff => 2,
            SensorKind::Flow => 0,
            SensorKind::Volume => 2,
        }
    }

    /// Device class, if any.
    pub const fn device_class(self) -> Option<DeviceClass> {
        match self {
            SensorKind::Energy => Some(DeviceClass::Energy),
            SensorKind::Power => Some(DeviceClass::Power),
            SensorKind::TemperatureIn | SensorKind::TemperatureOut | SensorKind::TemperatureDiff => {
                Some(DeviceClass::Temperature)
            }
            SensorKind::Flow | SensorKind::Volume => None,
        }
    }

    /// State class.
    pub const fn state_class(self) -> StateClass {
        match self {
            SensorKind::Energy => StateClass::TotalIncreasing,
            _ => StateClass::Measurement,
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A configured sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sensor {
    /// Which output this is.
    pub kind: SensorKind,
    /// Display name.
    pub name: String,
    /// Decimals shown when the value is displayed.
    pub accuracy_decimals: usize,
}

impl Sensor {
    /// A sensor with the defaults for `kind`.
    pub fn new(kind: SensorKind) -> Self {
        Sensor {
            kind,
            name: kind.default_name().to_string(),
            accuracy_decimals: kind.accuracy_decimals(),
        }
    }

    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the displayed precision.
    pub fn with_accuracy_decimals(mut self, decimals: usize) -> Self {
        self.accuracy_decimals = decimals;
        self
    }

    /// Format `value` with this sensor's precision and unit.
    pub fn format_value(&self, value: f64) -> String {
        format!("{:.*} {}", self.accuracy_decimals, value, self.kind.unit())
    }
}

/// A value ready for publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Which output this is.
    pub sensor: SensorKind,
    /// Display name.
    pub name: String,
    /// Decoded value.
    pub value: f64,
    /// Unit of measurement.
    pub unit: &'static str,
    /// Decimals shown when the value is displayed.
    pub accuracy_decimals: usize,
    /// Device class, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<DeviceClass>,
    /// State class.
    pub state_class: StateClass,
}

impl Sample {
    fn new(sensor: &Sensor, value: f64) -> Self {
        Sample {
            sensor: sensor.kind,
            name: sensor.name.clone(),
            value,
            unit: sensor.kind.unit(),
            accuracy_decimals: sensor.accuracy_decimals,
            device_class: sensor.kind.device_class(),
            state_class: sensor.kind.state_class(),
        }
    }
}

/// Receives the outcome of every sensor read.
pub trait Publisher {
    /// A value was read.
    fn publish(&mut self, sample: &Sample);

    /// A read failed. The default does nothing; the meter already logged it.
    fn failed(&mut self, sensor: &Sensor, error: &DriverError) {
        let _ = (sensor, error);
    }
}

impl Publisher for Vec<Sample> {
    fn publish(&mut self, sample: &Sample) {
        self.push(sample.clone());
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Sensors that produced a value.
    pub succeeded: usize,
    /// Sensors whose read failed.
    pub failed: usize,
}

impl CycleReport {
    /// Returns true if every sensor produced a value.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// An ordered set of sensors read once per cycle.
#[derive(Debug, Clone, Default)]
pub struct PollCycle {
    sensors: Vec<Sensor>,
}

impl PollCycle {
    /// Create a cycle over `sensors`, read in the given order.
    pub fn new(sensors: Vec<Sensor>) -> Self {
        PollCycle { sensors }
    }

    /// A cycle over every sensor with default settings.
    pub fn all() -> Self {
        PollCycle::new(SensorKind::ALL.into_iter().map(Sensor::new).collect())
    }

    /// The configured sensors.
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Returns true if there is nothing to poll.
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Read every sensor once.
    pub fn run<L, C, P>(&self, meter: &mut Meter<L, C>, publisher: &mut P) -> CycleReport
    where
        L: SerialLink,
        C: Clock,
        P: Publisher + ?Sized,
    {
        debug!("Meter[{}]: Reading meter values...", meter.name());

        let mut report = CycleReport::default();
        for sensor in &self.sensors {
            match meter.read(sensor.kind.register()) {
                Ok(reading) => {
                    debug!(
                        "Meter[{}]: {}: {}",
                        meter.name(),
                        sensor.name,
                        sensor.format_value(reading.value)
                    );
                    metrics::gauge!(
                        metric_defs::READING.name,
                        "meter" => meter.name().to_string(),
                        "sensor" => sensor.kind.key()
                    )
                    .set(reading.value);
                    publisher.publish(&Sample::new(sensor, reading.value));
                    report.succeeded += 1;
                }
                Err(err) => {
                    publisher.failed(sensor, &err);
                    report.failed += 1;
                }
            }
        }

        metrics::counter!(metric_defs::POLL_CYCLES.name, "meter" => meter.name().to_string())
            .increment(1);
        report
    }
}
