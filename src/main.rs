use clap::Parser;
use fxwatch::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    fxwatch::telemetry::init();
    run(Cli::parse())
}
