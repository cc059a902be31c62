use anyhow::Result;
use clap::Parser;
use lapsync::{cli::Cli, commands};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber on stderr
///
/// `--debug` forces TRACE; otherwise `RUST_LOG` decides, defaulting to warn.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);
    commands::run(args)
}
