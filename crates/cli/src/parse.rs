//! Input line → `Request` conversion.
//!
//! Keywords are case-insensitive; object ids are taken verbatim. Blank lines
//! and lines starting with `#` parse to `None`.

use strata_core::TxnId;

/// Command keywords, in the order HELP lists them
pub const KEYWORDS: &[&str] = &[
    "BEGIN", "READ", "WRITE", "COMMIT", "ABORT", "STATUS", "STATS", "HELP", "EXIT",
];

/// One parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `BEGIN`
    Begin,
    /// `READ <tx> <obj>`
    Read {
        /// Transaction
        tx: TxnId,
        /// Object id
        object_id: String,
    },
    /// `WRITE <tx> <obj>`
    Write {
        /// Transaction
        tx: TxnId,
        /// Object id
        object_id: String,
    },
    /// `COMMIT <tx>`
    Commit(TxnId),
    /// `ABORT <tx>`
    Abort(TxnId),
    /// `STATUS <tx>`
    Status(TxnId),
    /// `STATS`
    Stats,
    /// `HELP`
    Help,
    /// `EXIT` / `QUIT`
    Exit,
}

/// Parse one input line.
pub fn parse_line(line: &str) -> Result<Option<Request>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let keyword = tokens[0].to_ascii_uppercase();
    let args = &tokens[1..];

    let request = match keyword.as_str() {
        "BEGIN" => {
            expect_args(&keyword, args, 0)?;
            Request::Begin
        }
        "READ" | "WRITE" => {
            expect_args(&keyword, args, 2)?;
            let tx = parse_txn(args[0])?;
            let object_id = args[1].to_string();
            if keyword == "READ" {
                Request::Read { tx, object_id }
            } else {
                Request::Write { tx, object_id }
            }
        }
        "COMMIT" => {
            expect_args(&keyword, args, 1)?;
            Request::Commit(parse_txn(args[0])?)
        }
        "ABORT" => {
            expect_args(&keyword, args, 1)?;
            Request::Abort(parse_txn(args[0])?)
        }
        "STATUS" => {
            expect_args(&keyword, args, 1)?;
            Request::Status(parse_txn(args[0])?)
        }
        "STATS" => {
            expect_args(&keyword, args, 0)?;
            Request::Stats
        }
        "HELP" => Request::Help,
        "EXIT" | "QUIT" => Request::Exit,
        other => return Err(format!("Unknown command '{}'; type HELP", other)),
    };
    Ok(Some(request))
}

fn expect_args(keyword: &str, args: &[&str], count: usize) -> Result<(), String> {
    if args.len() == count {
        Ok(())
    } else {
        Err(format!(
            "{} takes {} argument(s), got {}",
            keyword,
            count,
            args.len()
        ))
    }
}

fn parse_txn(token: &str) -> Result<TxnId, String> {
    token
        .parse::<TxnId>()
        .map_err(|_| format!("Invalid transaction id '{}'", token))
}
