#![forbid(unsafe_code)]

//! asset-audit CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("asset-audit: {e}");
        std::process::exit(e.exit_code());
    }
}
