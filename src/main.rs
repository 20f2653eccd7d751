use anyhow::Result;
use clap::Parser;
use execlog::{analyze, cli::Cli};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = analyze::AnalyzeConfig::from(args);
    let report = analyze::run(&config)?;
    print!("{}", report);

    Ok(())
}
