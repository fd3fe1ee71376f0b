//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{parse_interval, RunnerConfig};
use crate::error::RunnerResult;

/// Poll a Kamstrup heat meter over KMP and print readings as JSON lines.
#[derive(Parser, Debug, Clone)]
#[command(name = "kmp-poll", author, version, about)]
pub struct Args {
    /// Path to the YAML config file. Without one, every sensor is polled.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial port, overriding the config file.
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate, overriding the config file.
    #[arg(short, long)]
    pub baud_rate: Option<u32>,

    /// Time between cycles, e.g. 30s or 5m, overriding the config file.
    #[arg(short, long, value_parser = parse_interval_arg)]
    pub interval: Option<Duration>,

    /// Run a single poll cycle and exit.
    #[arg(long)]
    pub once: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// List serial ports and exit.
    #[arg(long)]
    pub list_ports: bool,
}

fn parse_interval_arg(text: &str) -> Result<Duration, String> {
    parse_interval(text).map_err(|e| e.to_string())
}

impl Args {
    /// Load the config file, if any, and apply command-line overrides.
    pub fn load_config(&self) -> RunnerResult<RunnerConfig> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::from_file(path)?,
            None => RunnerConfig::all_sensors(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Apply command-line overrides to `config`.
    pub fn apply_overrides(&self, config: &mut RunnerConfig) {
        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        if let Some(baud_rate) = self.baud_rate {
            config.baud_rate = baud_rate;
        }
        if let Some(interval) = self.interval {
            config.update_interval = interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "kmp-poll",
            "--port",
            "/dev/ttyUSB1",
            "--baud-rate",
            "2400",
            "--interval",
            "5m",
            "--once",
        ])
        .unwrap();
        assert!(args.once);

        let config = args.load_config().unwrap();
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.baud_rate, 2400);
        assert_eq!(config.update_interval, Duration::from_secs(300));
        assert_eq!(config.sensors.len(), 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_interval_rejected() {
        assert!(Args::try_parse_from(["kmp-poll", "--interval", "often"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["kmp-poll"]).unwrap();
        assert_eq!(args.log_level, "info");
        assert!(!args.once);

        let config = args.load_config().unwrap();
        assert!(config.port.is_none());
        assert!(config.validate().is_err());
    }
}
