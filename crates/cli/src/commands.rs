//! Clap command definition.

use clap::{Arg, Command};

/// Build the command-line interface.
pub fn build_cli() -> Command {
    Command::new("strata-cc")
        .about("Interactive driver for the Strata concurrency-control core")
        .long_about(
            "Reads one command per line from stdin:\n  \
             BEGIN | READ <tx> <obj> | WRITE <tx> <obj> | COMMIT <tx> | ABORT <tx> |\n  \
             STATUS <tx> | STATS | HELP | EXIT",
        )
        .arg(
            Arg::new("algorithm")
                .long("algorithm")
                .short('a')
                .help("Protocol: lock (default), timestamp or validation")
                .conflicts_with("config"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Path to a concurrency.toml file; created with defaults if missing"),
        )
}
