use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod display;

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    if let Err(e) = commands::run(args).await {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}

/// Compact logging on stderr. `RUST_LOG` wins; otherwise `-v` raises the
/// level from the default `warn`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
