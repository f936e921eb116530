use clap::Parser;
use fddtree::cli::commands::Cli;
use fddtree::cli::handlers;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log to stderr so stdout stays clean for --json. `FDT_LOG` wins over
/// `RUST_LOG`; the default only shows warnings.
fn init_tracing() {
    let directives = std::env::var("FDT_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(EnvFilter::new(directives))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
