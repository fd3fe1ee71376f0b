//! End-to-end poll cycles against a scripted meter.

use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use kmp_driver::{
    encode_response, LoopbackLink, ManualClock, Meter, PollCycle, Sample, SensorKind,
};
use kmp_protocol::{DestinationAddress, Register, RESPONSE_TIMEOUT};

fn scripted_meter(link: LoopbackLink) -> Meter<LoopbackLink, ManualClock> {
    Meter::with_clock("boiler", link, ManualClock::with_step(Duration::from_millis(1)))
}

#[test]
fn test_full_cycle_reads_every_register() {
    let mut link = LoopbackLink::new();
    link.queue_response(encode_response(0x003c, 0x03, 0x43, &[0x00, 0x30, 0x39]));
    link.queue_response(encode_response(0x0050, 0x16, 0x41, &[0x01, 0x9a]));
    link.queue_response(encode_response(0x0056, 0x25, 0x42, &[0x1a, 0x0a]));
    link.queue_response(encode_response(0x0057, 0x25, 0x42, &[0x10, 0xcc]));
    link.queue_response(encode_response(0x0059, 0x25, 0x42, &[0x09, 0x3e]));
    link.queue_response(encode_response(0x004a, 0x29, 0x00, &[0x01, 0x0d]));
    link.queue_response(encode_response(0x0044, 0x28, 0x42, &[0x04, 0xd2]));

    let mut meter = scripted_meter(link);
    let mut samples: Vec<Sample> = Vec::new();
    let report = PollCycle::all().run(&mut meter, &mut samples);

    assert!(report.is_complete());
    assert_eq!(report.succeeded, 7);

    let values: Vec<(SensorKind, f64)> = samples.iter().map(|s| (s.sensor, s.value)).collect();
    let expected = [
        (SensorKind::Energy, 12.345),
        (SensorKind::Power, 41.0),
        (SensorKind::TemperatureIn, 66.66),
        (SensorKind::TemperatureOut, 43.0),
        (SensorKind::TemperatureDiff, 23.66),
        (SensorKind::Flow, 269.0),
        (SensorKind::Volume, 12.34),
    ];
    for ((kind, value), (expected_kind, expected_value)) in values.iter().zip(expected) {
        assert_eq!(*kind, expected_kind);
        assert_relative_eq!(*value, expected_value, epsilon = 1e-9);
    }

    let frames = meter.link().written_frames();
    assert_eq!(frames.len(), 7);
    assert_eq!(frames[0], vec![0x80, 0x3f, 0x10, 0x01, 0x00, 0x3c, 0xb2, 0x5f, 0x0d]);
    assert_eq!(frames[1], vec![0x80, 0x3f, 0x10, 0x01, 0x00, 0x50, 0x1f, 0x75, 0x0d]);
    assert_eq!(frames[2], vec![0x80, 0x3f, 0x10, 0x01, 0x00, 0x56, 0x7f, 0xb3, 0x0d]);
    assert_eq!(frames[3], vec![0x80, 0x3f, 0x10, 0x01, 0x00, 0x57, 0x6f, 0x92, 0x0d]);
    assert_eq!(frames[4], vec![0x80, 0x3f, 0x10, 0x01, 0x00, 0x59, 0x8e, 0x5c, 0x0d]);
    assert_eq!(frames[5], vec![0x80, 0x3f, 0x10, 0x01, 0x00, 0x4a, 0xac, 0x0e, 0x0d]);
    assert_eq!(frames[6], vec![0x80, 0x3f, 0x10, 0x01, 0x00, 0x44, 0x4d, 0xc0, 0x0d]);

    assert_eq!(meter.stats().reads_succeeded, 7);
    assert_eq!(meter.link().responses_remaining(), 0);
}

#[test]
fn test_stale_bytes_do_not_leak_into_next_read() {
    let mut link = LoopbackLink::new();
    link.queue_response(encode_response(0x0050, 0x16, 0x41, &[0x00, 0x64]));
    let mut meter = scripted_meter(link);

    // Left over from an earlier, abandoned exchange.
    meter.link_mut().inject_noise(&[0x3f, 0x10, 0x00, 0x3c, 0x0d]);

    let reading = meter.read(Register::CurrentPower).unwrap();
    assert_relative_eq!(reading.value, 10.0, epsilon = 1e-9);
}

#[test]
fn test_logger_address_in_every_request() {
    let mut link = LoopbackLink::new();
    link.queue_silence();
    link.queue_silence();
    let mut meter = scripted_meter(link).with_address(DestinationAddress::LoggerTop);

    assert!(meter.read(Register::HeatEnergy).is_err());
    assert!(meter.read(Register::Volume).is_err());

    let frames = meter.link().written_frames();
    assert_eq!(frames[0], vec![0x80, 0x7f, 0x10, 0x01, 0x00, 0x3c, 0xa3, 0x37, 0x0d]);
    assert!(frames.iter().all(|f| f[1] == 0x7f));
    assert_eq!(meter.stats().reads_failed, 2);
}

#[test]
fn test_silent_meter_times_out_on_wall_clock() {
    let mut link = LoopbackLink::new();
    link.queue_silence();
    let mut meter = Meter::new("silent", link);

    let start = Instant::now();
    let err = meter.read(Register::HeatEnergy).unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout());
    assert!(elapsed >= RESPONSE_TIMEOUT, "returned early: {:?}", elapsed);
    assert!(
        elapsed < RESPONSE_TIMEOUT + Duration::from_millis(150),
        "returned late: {:?}",
        elapsed
    );
}
