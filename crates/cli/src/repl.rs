//! REPL loop with rustyline.
//!
//! Interactive mode: prompt, history, TAB completion of keywords.
//! Pipe mode: read lines from any `BufRead`, execute each.

use std::io::{self, BufRead, Write};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use crate::format::{format_error, format_output};
use crate::parse::{parse_line, Request, KEYWORDS};
use crate::state::SessionState;

/// What one input line produced
#[derive(Debug, PartialEq, Eq)]
struct Reply {
    text: String,
    failed: bool,
    exit: bool,
}

/// Parse and execute one line. `None` for blank and comment lines.
fn handle_line(state: &SessionState, line: &str) -> Option<Reply> {
    let request = match parse_line(line) {
        Ok(Some(request)) => request,
        Ok(None) => return None,
        Err(message) => {
            return Some(Reply {
                text: format!("(error) {}", message),
                failed: true,
                exit: false,
            })
        }
    };

    let exit = request == Request::Exit;
    Some(match state.execute(request) {
        Ok(output) => Reply {
            text: format_output(&output),
            failed: false,
            exit,
        },
        Err(e) => Reply {
            text: format_error(&e),
            failed: true,
            exit,
        },
    })
}

/// Run the interactive REPL. Returns 1 if any line failed, 0 otherwise.
pub fn run_repl(state: &SessionState) -> i32 {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let mut rl: Editor<KeywordHelper, _> = match Editor::with_config(config) {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("(error) {}", err);
            return 1;
        }
    };
    rl.set_helper(Some(KeywordHelper));

    let history_path = history_file();
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    let mut exit_code = 0;
    loop {
        match rl.readline(&state.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let Some(reply) = handle_line(state, trimmed) else {
                    continue;
                };
                println!("{}", reply.text);
                if reply.failed {
                    exit_code = 1;
                }
                if reply.exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C: fresh prompt
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("(error) {:?}", err);
                exit_code = 1;
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }
    exit_code
}

/// Run in pipe mode: one result line per command, until EOF or EXIT.
/// Returns 1 if any line failed to parse or execute, 0 otherwise.
pub fn run_pipe<R: BufRead, W: Write>(
    state: &SessionState,
    input: R,
    output: &mut W,
) -> io::Result<i32> {
    let mut exit_code = 0;

    for line in input.lines() {
        let line = line?;
        let Some(reply) = handle_line(state, &line) else {
            continue;
        };
        writeln!(output, "{}", reply.text)?;
        if reply.failed {
            exit_code = 1;
        }
        if reply.exit {
            break;
        }
    }

    output.flush()?;
    Ok(exit_code)
}

fn history_file() -> Option<String> {
    std::env::var("HOME")
        .ok()
        .map(|h| format!("{}/.strata_cc_history", h))
}

/// Completes the command keyword at the start of a line
struct KeywordHelper;

impl Helper for KeywordHelper {}
impl Validator for KeywordHelper {}
impl Highlighter for KeywordHelper {}
impl Hinter for KeywordHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for KeywordHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(complete_keyword(&line[..pos]))
    }
}

fn complete_keyword(line_to_pos: &str) -> (usize, Vec<Pair>) {
    let pos = line_to_pos.len();
    // Only the first word is a keyword
    if line_to_pos.trim_start().contains(char::is_whitespace) {
        return (pos, Vec::new());
    }
    let prefix = line_to_pos.trim_start().to_ascii_uppercase();
    let candidates = KEYWORDS
        .iter()
        .filter(|kw| kw.starts_with(&prefix))
        .map(|kw| Pair {
            display: kw.to_string(),
            replacement: kw.to_string(),
        })
        .collect();
    (pos - prefix.len(), candidates)
}
