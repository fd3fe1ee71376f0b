//! JSON-lines output of readings.

use std::io::Write;

use chrono::{DateTime, Utc};
use kmp_driver::{DriverError, Publisher, Sample, Sensor};
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct Record<'a> {
    #[serde(flatten)]
    sample: &'a Sample,
    timestamp: DateTime<Utc>,
}

/// Writes one JSON object per reading, one per line.
///
/// ```text
/// {"sensor":"energy","name":"Energy","value":12.345,"unit":"MWh","accuracy_decimals":3,...,"timestamp":"2024-01-01T00:00:00Z"}
/// ```
#[derive(Debug)]
pub struct JsonLinesPublisher<W: Write> {
    writer: W,
    written: u64,
    failures: u64,
}

impl<W: Write> JsonLinesPublisher<W> {
    /// Write records to `writer`.
    pub fn new(writer: W) -> Self {
        JsonLinesPublisher {
            writer,
            written: 0,
            failures: 0,
        }
    }

    /// Records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Failed reads reported so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Give the writer back.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &Record<'_>) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    fn publish(&mut self, sample: &Sample) {
        let record = Record {
            sample,
            timestamp: Utc::now(),
        };
        match self.write_record(&record) {
            Ok(()) => self.written += 1,
            Err(err) => warn!("Failed to publish {}: {}", sample.name, err),
        }
    }

    fn failed(&mut self, _sensor: &Sensor, _error: &DriverError) {
        self.failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmp_driver::{encode_response, LoopbackLink, ManualClock, Meter, PollCycle, SensorKind};
    use std::time::Duration;

    #[test]
    fn test_writes_one_line_per_sample() {
        let mut link = LoopbackLink::new();
        link.queue_response(encode_response(0x003c, 0x03, 0x43, &[0x30, 0x39]));
        link.queue_silence();
        let mut meter =
            Meter::with_clock("test", link, ManualClock::with_step(Duration::from_millis(1)));

        let cycle = PollCycle::new(vec![
            Sensor::new(SensorKind::Energy).with_name("Heat Energy"),
            Sensor::new(SensorKind::Flow),
        ]);
        let mut publisher = JsonLinesPublisher::new(Vec::new());
        let report = cycle.run(&mut meter, &mut publisher);

        assert_eq!(report.succeeded, 1);
        assert_eq!(publisher.written(), 1);
        assert_eq!(publisher.failures(), 1);

        let output = String::from_utf8(publisher.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["sensor"], "energy");
        assert_eq!(record["name"], "Heat Energy");
        assert_eq!(record["unit"], "MWh");
        assert_eq!(record["accuracy_decimals"], 3);
        assert_eq!(record["device_class"], "energy");
        assert_eq!(record["state_class"], "total_increasing");
        assert!((record["value"].as_f64().unwrap() - 12.345).abs() < 1e-9);

        let timestamp = record["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_no_device_class_for_flow() {
        let mut link = LoopbackLink::new();
        link.queue_response(encode_response(0x004a, 0x29, 0x00, &[0x64]));
        let mut meter =
            Meter::with_clock("test", link, ManualClock::with_step(Duration::from_millis(1)));

        let mut publisher = JsonLinesPublisher::new(Vec::new());
        PollCycle::new(vec![Sensor::new(SensorKind::Flow)]).run(&mut meter, &mut publisher);

        let output = String::from_utf8(publisher.into_inner()).unwrap();
        let record: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(record["value"], 100.0);
        assert!(record.get("device_class").is_none());
        assert_eq!(record["state_class"], "measurement");
    }
}
