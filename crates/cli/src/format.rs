//! Output formatting: one line per executed command.

use strata_core::Error;

use crate::state::Output;

/// Help text printed by `HELP`
pub const HELP: &str = "\
BEGIN                start a transaction, prints its id
READ <tx> <obj>      ask to read <obj>
WRITE <tx> <obj>     ask to write <obj>
COMMIT <tx>          commit (may abort on conflict)
ABORT <tx>           abort
STATUS <tx>          show transaction status
STATS                show engine counters
EXIT                 leave";

/// Format a successful output.
pub fn format_output(output: &Output) -> String {
    match output {
        Output::Began(tx) => format!("BEGIN {}", tx),
        Output::Outcome(outcome) if outcome.allowed => format!("OK {}", outcome.reason),
        Output::Outcome(outcome) => format!("REFUSED {}", outcome.reason),
        Output::Ended {
            tx,
            committed: true,
        } => format!("COMMITTED {}", tx),
        Output::Ended {
            tx,
            committed: false,
        } => format!("ABORTED {}", tx),
        Output::Status(tx, Some(status)) => format!("{} {}", tx, status),
        Output::Status(tx, None) => format!("{} not live", tx),
        Output::Stats(stats) => format!(
            "begun={} committed={} aborted={} in_flight={} refusals={} wounds={}",
            stats.begun,
            stats.committed,
            stats.aborted,
            stats.in_flight(),
            stats.refusals,
            stats.wounds
        ),
        Output::Help => HELP.to_string(),
        Output::Exit => "BYE".to_string(),
    }
}

/// Format an error.
pub fn format_error(err: &Error) -> String {
    format!("(error) {}", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_concurrency::{ConcurrencyStats, TransactionStatus, ValidationOutcome};
    use strata_core::TxnId;

    #[test]
    fn outcomes() {
        assert_eq!(
            format_output(&Output::Outcome(ValidationOutcome::allowed("shared lock granted"))),
            "OK shared lock granted"
        );
        assert_eq!(
            format_output(&Output::Outcome(ValidationOutcome::refused("transaction aborted"))),
            "REFUSED transaction aborted"
        );
    }

    #[test]
    fn lifecycle_lines() {
        assert_eq!(format_output(&Output::Began(TxnId(4))), "BEGIN 4");
        assert_eq!(
            format_output(&Output::Ended {
                tx: TxnId(4),
                committed: false
            }),
            "ABORTED 4"
        );
        assert_eq!(
            format_output(&Output::Status(TxnId(4), Some(TransactionStatus::Active))),
            "4 ACTIVE"
        );
        assert_eq!(format_output(&Output::Status(TxnId(4), None)), "4 not live");
    }

    #[test]
    fn stats_line() {
        let stats = ConcurrencyStats {
            begun: 3,
            committed: 1,
            aborted: 1,
            refusals: 2,
            wounds: 1,
        };
        assert_eq!(
            format_output(&Output::Stats(stats)),
            "begun=3 committed=1 aborted=1 in_flight=1 refusals=2 wounds=1"
        );
    }

    #[test]
    fn errors_are_prefixed() {
        assert_eq!(
            format_error(&Error::UnknownTransaction(TxnId(9))),
            "(error) Unknown transaction: 9"
        );
    }
}
