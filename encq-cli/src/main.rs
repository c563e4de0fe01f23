// encq-cli/src/main.rs
//
// Entry point for the `encq` binary: parse arguments, run the queue, map
// errors to a non-zero exit code.

use clap::Parser;
use encq_cli::{Cli, output, run_queue};
use std::process;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run_queue(cli) {
        log::error!("{e:#}");
        output::print_error(&format!("{e:#}"));
        process::exit(1);
    }
}
