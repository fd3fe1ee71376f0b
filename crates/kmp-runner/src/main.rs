//! `kmp-poll`: poll a Kamstrup heat meter and print readings as JSON lines.

use std::process::ExitCode;

use clap::Parser;
use kmp_runner::{serial, Args};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Readings go to stdout; logs must not interleave with them.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    if args.list_ports {
        for port in serial::available_ports() {
            println!("{}", port);
        }
        return ExitCode::SUCCESS;
    }

    info!("kmp-poll v{}", env!("CARGO_PKG_VERSION"));

    match kmp_runner::run(&args) {
        Ok(summary) if args.once && summary.failed > 0 => {
            error!("{} of {} reads failed", summary.failed, summary.succeeded + summary.failed);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
