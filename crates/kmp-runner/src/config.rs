//! YAML configuration for the poller.
//!
//! ```yaml
//! port: /dev/ttyUSB0
//! update_interval: 30s
//! sensors:
//!   energy: { name: "Heat Energy" }
//!   temperature_in:
//!   flow: { accuracy_decimals: 1 }
//! ```
//!
//! Sensors that are not listed are not polled.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use kmp_driver::{PollCycle, Sensor, SensorKind};
use kmp_protocol::DestinationAddress;
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::error::{RunnerError, RunnerResult};

/// Baud rate of the meter's optical head.
pub const DEFAULT_BAUD_RATE: u32 = 1200;
/// The meter uses 8N2.
pub const DEFAULT_STOP_BITS: u8 = 2;
/// Time between poll cycles.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);
/// Longest accepted time between poll cycles.
pub const MAX_UPDATE_INTERVAL: Duration = Duration::from_secs(24 * 3600);
/// Name used in logs and metric labels.
pub const DEFAULT_METER_NAME: &str = "multical402";

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_stop_bits() -> u8 {
    DEFAULT_STOP_BITS
}

fn default_update_interval() -> Duration {
    DEFAULT_UPDATE_INTERVAL
}

fn default_meter_name() -> String {
    DEFAULT_METER_NAME.to_string()
}

/// Per-sensor overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Decimals shown when the value is displayed.
    #[serde(default)]
    pub accuracy_decimals: Option<usize>,
}

/// Top-level poller configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Serial port path, e.g. `/dev/ttyUSB0` or `COM3`.
    #[serde(default)]
    pub port: Option<String>,
    /// Line speed.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Stop bits, 1 or 2.
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Time between poll cycles.
    #[serde(
        default = "default_update_interval",
        deserialize_with = "deserialize_interval"
    )]
    pub update_interval: Duration,
    /// Destination address of every request.
    #[serde(default)]
    pub address: DestinationAddress,
    /// Meter name used in logs and metric labels.
    #[serde(default = "default_meter_name")]
    pub name: String,
    /// Serve Prometheus metrics on this address.
    #[serde(default)]
    pub metrics_listen: Option<SocketAddr>,
    /// Sensors to poll. A key with no value uses the defaults.
    #[serde(default)]
    pub sensors: BTreeMap<SensorKind, Option<SensorConfig>>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            stop_bits: DEFAULT_STOP_BITS,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            address: DestinationAddress::default(),
            name: default_meter_name(),
            metrics_listen: None,
            sensors: BTreeMap::new(),
        }
    }
}

impl RunnerConfig {
    /// A config polling every sensor with default settings.
    pub fn all_sensors() -> Self {
        RunnerConfig {
            sensors: SensorKind::ALL.into_iter().map(|kind| (kind, None)).collect(),
            ..Default::default()
        }
    }

    /// Load a config file.
    pub fn from_file(path: impl AsRef<Path>) -> RunnerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RunnerError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse a config from YAML text.
    pub fn from_yaml_str(text: &str) -> RunnerResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Check the config before anything is opened.
    pub fn validate(&self) -> RunnerResult<()> {
        match self.port.as_deref() {
            None | Some("") => return Err(RunnerError::invalid("no serial port configured")),
            Some(_) => {}
        }
        if self.baud_rate == 0 {
            return Err(RunnerError::invalid("baud_rate must be non-zero"));
        }
        if !matches!(self.stop_bits, 1 | 2) {
            return Err(RunnerError::invalid(format!(
                "stop_bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        if self.update_interval.is_zero() {
            return Err(RunnerError::invalid("update_interval must be non-zero"));
        }
        if self.update_interval > MAX_UPDATE_INTERVAL {
            return Err(RunnerError::invalid(format!(
                "update_interval {:?} exceeds {:?}",
                self.update_interval, MAX_UPDATE_INTERVAL
            )));
        }
        if self.sensors.is_empty() {
            return Err(RunnerError::invalid("no sensors configured"));
        }
        Ok(())
    }

    /// Configured sensors, in polling order.
    pub fn sensors(&self) -> Vec<Sensor> {
        self.sensors
            .iter()
            .map(|(&kind, overrides)| {
                let mut sensor = Sensor::new(kind);
                if let Some(overrides) = overrides {
                    if let Some(name) = &overrides.name {
                        sensor = sensor.with_name(name.clone());
                    }
                    if let Some(decimals) = overrides.accuracy_decimals {
                        sensor = sensor.with_accuracy_decimals(decimals);
                    }
                }
                sensor
            })
            .collect()
    }

    /// The poll cycle described by this config.
    pub fn poll_cycle(&self) -> PollCycle {
        PollCycle::new(self.sensors())
    }

    /// Log the effective settings.
    pub fn log_summary(&self) {
        info!("Meter[{}]:", self.name);
        info!(
            "  Port: {} at {} baud, 8N{}",
            self.port.as_deref().unwrap_or("-"),
            self.baud_rate,
            self.stop_bits
        );
        info!("  Address: {}", self.address);
        info!("  Update interval: {:?}", self.update_interval);
        for sensor in self.sensors() {
            info!(
                "  Sensor '{}': {} [{}]",
                sensor.name,
                sensor.kind.register(),
                sensor.kind.unit()
            );
        }
    }
}

/// Parse `<n>ms`, `<n>s`, `<n>m` or `<n>h`. A bare number is seconds.
pub fn parse_interval(text: &str) -> RunnerResult<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, suffix) = text.split_at(split);
    let n: u64 = digits
        .parse()
        .map_err(|_| RunnerError::InvalidInterval(text.to_string()))?;

    let duration = match suffix.trim() {
        "ms" => Duration::from_millis(n),
        "" | "s" => Duration::from_secs(n),
        "m" | "min" => Duration::from_secs(n.saturating_mul(60)),
        "h" => Duration::from_secs(n.saturating_mul(3600)),
        _ => return Err(RunnerError::InvalidInterval(text.to_string())),
    };
    Ok(duration)
}

fn deserialize_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Interval {
        Seconds(u64),
        Text(String),
    }

    match Interval::deserialize(deserializer)? {
        Interval::Seconds(n) => Ok(Duration::from_secs(n)),
        Interval::Text(text) => parse_interval(&text).map_err(serde::de::Error::custom),
    }
}
