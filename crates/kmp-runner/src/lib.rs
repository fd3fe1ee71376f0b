//! KMP Runner
//!
//! Library side of the `kmp-poll` binary: configuration, the serial-port
//! link, JSON-lines publication and the periodic polling loop.

pub mod cli;
pub mod config;
pub mod error;
pub mod poller;
pub mod publish;
pub mod serial;

pub use cli::Args;
pub use config::{parse_interval, RunnerConfig, SensorConfig};
pub use error::{RunnerError, RunnerResult};
pub use poller::{Poller, RunSummary, StopHandle};
pub use publish::JsonLinesPublisher;
pub use serial::SerialPortLink;

use kmp_driver::Meter;
use tracing::info;

/// Start metrics export if the config asks for it.
pub fn install_metrics(config: &RunnerConfig) -> RunnerResult<()> {
    let Some(addr) = config.metrics_listen else {
        return Ok(());
    };

    #[cfg(feature = "prometheus")]
    {
        kmp_metrics::install_prometheus(addr).map_err(|e| RunnerError::Metrics(e.to_string()))?;
        info!("Serving metrics on http://{}/metrics", addr);
        Ok(())
    }

    #[cfg(not(feature = "prometheus"))]
    {
        Err(RunnerError::Metrics(format!(
            "metrics_listen {} set but kmp-poll was built without the prometheus feature",
            addr
        )))
    }
}

/// Run the poller described by `args` until it finishes or Ctrl-C is pressed.
pub fn run(args: &Args) -> RunnerResult<RunSummary> {
    let config = args.load_config()?;
    config.validate()?;
    config.log_summary();
    install_metrics(&config)?;

    let link = SerialPortLink::open(&config)?;
    let meter = Meter::new(config.name.clone(), link).with_address(config.address);
    let publisher = JsonLinesPublisher::new(std::io::stdout().lock());
    let mut poller = Poller::new(
        meter,
        config.poll_cycle(),
        publisher,
        config.update_interval,
    );

    if args.once {
        let mut summary = RunSummary::default();
        summary.add(poller.run_once());
        return Ok(summary);
    }

    let stop = poller.stop_handle();
    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, stopping after current cycle");
        stop.stop();
    })?;

    Ok(poller.run())
}
