//! Periodic polling loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use kmp_driver::{Clock, CycleReport, Meter, PollCycle, Publisher, SerialLink};
use tracing::{debug, info, warn};

/// Longest single sleep between stop-flag checks.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Shared flag used to stop a running [`Poller`].
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Create a handle that is not yet stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the poller to stop after the current cycle.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Check if a stop was requested.
    pub fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Totals over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles completed.
    pub cycles: u64,
    /// Readings published.
    pub succeeded: u64,
    /// Reads that failed.
    pub failed: u64,
}

impl RunSummary {
    /// Fold one cycle into the totals.
    pub fn add(&mut self, report: CycleReport) {
        self.cycles += 1;
        self.succeeded += report.succeeded as u64;
        self.failed += report.failed as u64;
    }
}

/// Runs a [`PollCycle`] every `interval` until stopped.
pub struct Poller<L, C, P> {
    meter: Meter<L, C>,
    cycle: PollCycle,
    publisher: P,
    interval: Duration,
    stop: StopHandle,
}

impl<L: SerialLink, C: Clock, P: Publisher> Poller<L, C, P> {
    /// Create a poller.
    pub fn new(meter: Meter<L, C>, cycle: PollCycle, publisher: P, interval: Duration) -> Self {
        Poller {
            meter,
            cycle,
            publisher,
            interval,
            stop: StopHandle::new(),
        }
    }

    /// Handle that stops this poller from another thread or a signal handler.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The meter being polled.
    pub fn meter(&self) -> &Meter<L, C> {
        &self.meter
    }

    /// Give back the publisher.
    pub fn into_publisher(self) -> P {
        self.publisher
    }

    /// Run a single cycle.
    pub fn run_once(&mut self) -> CycleReport {
        let report = self.cycle.run(&mut self.meter, &mut self.publisher);
        if report.is_complete() {
            debug!(
                "Meter[{}]: cycle complete, {} readings",
                self.meter.name(),
                report.succeeded
            );
        } else {
            warn!(
                "Meter[{}]: cycle finished with {} of {} reads failed",
                self.meter.name(),
                report.failed,
                report.succeeded + report.failed
            );
        }
        report
    }

    /// Poll until stopped, starting a cycle every interval.
    ///
    /// A cycle that overruns the interval is followed immediately by the next
    /// one; missed boundaries are skipped, not queued.
    pub fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut next = Instant::now();

        while !self.stop.should_stop() {
            let report = self.run_once();
            summary.add(report);

            next = match next.checked_add(self.interval) {
                Some(deadline) => deadline,
                None => {
                    warn!(
                        "Meter[{}]: interval {:?} is out of range, stopping",
                        self.meter.name(),
                        self.interval
                    );
                    break;
                }
            };
            let now = Instant::now();
            if next < now {
                warn!(
                    "Meter[{}]: poll cycle overran interval by {:?}",
                    self.meter.name(),
                    now - next
                );
                next = now;
            }
            self.sleep_until(next);
        }

        info!(
            "Meter[{}]: stopped after {} cycles ({} readings, {} failures)",
            self.meter.name(),
            summary.cycles,
            summary.succeeded,
            summary.failed
        );
        summary
    }

    fn sleep_until(&self, deadline: Instant) {
        loop {
            if self.stop.should_stop() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep((deadline - now).min(STOP_CHECK_INTERVAL));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmp_driver::{encode_response, LoopbackLink, ManualClock, Sample, Sensor, SensorKind};

    fn poller(link: LoopbackLink, interval: Duration) -> Poller<LoopbackLink, ManualClock, Vec<Sample>> {
        let meter = Meter::with_clock("test", link, ManualClock::with_step(Duration::from_millis(1)));
        let cycle = PollCycle::new(vec![Sensor::new(SensorKind::Power)]);
        Poller::new(meter, cycle, Vec::new(), interval)
    }

    #[test]
    fn test_run_once() {
        let mut link = LoopbackLink::new();
        link.queue_response(encode_response(0x0050, 0x16, 0x41, &[0x00, 0x2a]));
        let mut poller = poller(link, Duration::from_secs(60));

        let report = poller.run_once();
        assert_eq!(report, CycleReport { succeeded: 1, failed: 0 });

        let samples = poller.into_publisher();
        assert_eq!(samples.len(), 1);
        assert!((samples[0].value - 4.2).abs() < 1e-9);
    }

    #[test]
    fn test_stop_before_run() {
        let mut poller = poller(LoopbackLink::new(), Duration::from_secs(60));
        poller.stop_handle().stop();

        let summary = poller.run();
        assert_eq!(summary.cycles, 0);
        assert_eq!(poller.meter().link().requests_seen(), 0);
    }

    #[test]
    fn test_unreachable_deadline_stops_after_one_cycle() {
        let mut link = LoopbackLink::new();
        link.queue_response(encode_response(0x0050, 0x16, 0x41, &[0x00, 0x2a]));
        let mut poller = poller(link, Duration::MAX);

        let summary = poller.run();
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn test_stop_from_another_thread() {
        let mut link = LoopbackLink::new();
        for _ in 0..1000 {
            link.queue_response(encode_response(0x0050, 0x16, 0x41, &[0x00, 0x2a]));
        }
        let mut poller = poller(link, Duration::from_millis(20));
        let stop = poller.stop_handle();

        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            stop.stop();
        });

        let started = Instant::now();
        let summary = poller.run();
        stopper.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(summary.cycles >= 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.succeeded, summary.cycles);
    }
}
