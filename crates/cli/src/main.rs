//! strata-cc: line-oriented driver for the Strata concurrency-control core.
//!
//! Two modes:
//! - **Interactive mode**: `strata-cc [flags]` with a TTY on stdin; line editing, history, TAB completion
//! - **Pipe mode**: `printf 'BEGIN\nWRITE 1 X\nCOMMIT 1\n' | strata-cc`
//!
//! Set `RUST_LOG=debug` to see every grant and refusal.

mod commands;
mod format;
mod parse;
mod repl;
mod state;

use std::io::{self, IsTerminal};
use std::path::Path;
use std::process;

use strata_concurrency::{ConcurrencyConfig, ConcurrencyControlManager};
use strata_core::Result;
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use state::SessionState;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let matches = build_cli().get_matches();

    let manager = match open_manager(&matches) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("{}", format::format_error(&e));
            process::exit(1);
        }
    };
    if let Err(e) = manager.initialize() {
        eprintln!("{}", format::format_error(&e));
        process::exit(1);
    }

    let state = SessionState::new(manager);
    let stdin = io::stdin();

    let exit_code = if stdin.is_terminal() {
        repl::run_repl(&state)
    } else {
        match repl::run_pipe(&state, stdin.lock(), &mut io::stdout()) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("(error) {}", e);
                1
            }
        }
    };

    state.manager().shutdown();
    process::exit(exit_code);
}

fn open_manager(matches: &clap::ArgMatches) -> Result<ConcurrencyControlManager> {
    if let Some(path) = matches.get_one::<String>("config") {
        let path = Path::new(path);
        ConcurrencyConfig::write_default_if_missing(path)?;
        let config = ConcurrencyConfig::from_file(path)?;
        return ConcurrencyControlManager::from_config(&config);
    }
    let algorithm = matches
        .get_one::<String>("algorithm")
        .map(String::as_str)
        .unwrap_or("lock");
    ConcurrencyControlManager::new(algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{Algorithm, Error};
    use tempfile::TempDir;

    fn open(args: &[&str]) -> Result<ConcurrencyControlManager> {
        let mut argv = vec!["strata-cc"];
        argv.extend_from_slice(args);
        let matches = build_cli().try_get_matches_from(argv).unwrap();
        open_manager(&matches)
    }

    #[test]
    fn defaults_to_lock() {
        assert_eq!(open(&[]).unwrap().algorithm(), Algorithm::Lock);
    }

    #[test]
    fn algorithm_flag() {
        assert_eq!(
            open(&["--algorithm", "timestamp"]).unwrap().algorithm(),
            Algorithm::Timestamp
        );
        assert!(matches!(
            open(&["--algorithm", "nope"]),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn config_flag_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(strata_concurrency::CONFIG_FILE_NAME);
        let path_str = path.to_str().unwrap();

        assert_eq!(open(&["--config", path_str]).unwrap().algorithm(), Algorithm::Lock);
        assert!(path.exists());

        std::fs::write(&path, "algorithm = \"validation\"\n").unwrap();
        assert_eq!(
            open(&["--config", path_str]).unwrap().algorithm(),
            Algorithm::Validation
        );
    }
}
