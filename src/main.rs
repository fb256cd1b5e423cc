use clap::Parser;
use quantcrew::cli::{Cli, run};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> std::process::ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: could not install log subscriber: {e}");
    }

    run(Cli::parse())
}
