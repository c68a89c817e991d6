use crate::builtin::CommandTable;
use crate::command::ExitCode;
use crate::executor;
use crate::resolver::{self, DispatchDecision};
use crate::session::SessionState;
use crate::tokenizer;
use anyhow::{Context, Result, bail};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};

/// Longest accepted input line, in bytes.
pub const MAX_LINE_BYTES: usize = 4096;

/// The shell's read loop: reads lines, resolves them against the command
/// table and runs the result.
///
/// ```no_run
/// use minish::{CommandTable, Interpreter, SessionState};
///
/// let mut shell = Interpreter::new(CommandTable::builtin(), SessionState::init());
/// shell.repl().unwrap();
/// ```
pub struct Interpreter {
    table: CommandTable,
    session: SessionState,
}

impl Interpreter {
    pub fn new(table: CommandTable, session: SessionState) -> Self {
        Self { table, session }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Tokenizes and runs one input line, writing builtin output to
    /// `stdout`. Blank lines succeed without dispatching anything.
    pub fn run_line(&mut self, line: &str, stdout: &mut dyn Write) -> Result<ExitCode> {
        if line.len() > MAX_LINE_BYTES {
            bail!("line is longer than {MAX_LINE_BYTES} bytes");
        }

        let tokens = tokenizer::split_line(line);
        if tokens.is_empty() {
            return Ok(0);
        }

        let decision = resolver::resolve(&self.table, &tokens);
        if let DispatchDecision::Unresolved = decision {
            bail!("command not found: {}", tokens.get(0).unwrap_or_default());
        }
        executor::execute(decision, &self.table, stdout, &mut self.session)
    }

    /// Runs until end of input or until `exit` asks the session to stop.
    ///
    /// Interactive sessions get a line-numbered prompt and history; other
    /// sessions consume standard input silently.
    pub fn repl(&mut self) -> Result<()> {
        if self.session.is_interactive {
            self.repl_terminal()
        } else {
            self.repl_stream()
        }
    }

    fn repl_terminal(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut line_num: usize = 0;
        loop {
            match rl.readline(&format!("{line_num}: ")) {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    self.dispatch_and_report(&line);
                    line_num += 1;
                    if self.session.should_exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn repl_stream(&mut self) -> Result<()> {
        for line in io::stdin().lock().lines() {
            let line = line.context("cannot read from standard input")?;
            self.dispatch_and_report(&line);
            if self.session.should_exit {
                break;
            }
        }
        Ok(())
    }

    /// One loop iteration past reading: failures are reported on stderr and
    /// never end the session.
    fn dispatch_and_report(&mut self, line: &str) {
        let mut stdout = io::stdout();
        match self.run_line(line, &mut stdout) {
            Ok(code) => {
                if code != 0 {
                    log::debug!("command exited with status {code}");
                }
            }
            Err(err) => eprintln!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env as stdenv;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn shell() -> Interpreter {
        Interpreter::new(CommandTable::builtin(), SessionState::detached())
    }

    #[test]
    fn blank_line_is_a_quiet_success() {
        let mut sh = shell();
        let mut out = Vec::new();
        assert_eq!(sh.run_line("   \t ", &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_command_reports_and_the_session_continues() {
        let mut sh = shell();
        let mut out = Vec::new();

        let err = sh.run_line("nonexistent123", &mut out).unwrap_err();
        assert_eq!(err.to_string(), "command not found: nonexistent123");

        // The same session still runs the next command.
        assert_eq!(sh.run_line("/bin/true", &mut out).unwrap(), 0);
    }

    #[test]
    fn help_line_lists_every_builtin() {
        let mut sh = shell();
        let mut out = Vec::new();
        assert_eq!(sh.run_line("?", &mut out).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "? - show this help menu\n\
             exit - exit the command shell\n\
             id - display the user-id, the primary group-id and the groups the user is part of\n"
        );
    }

    #[test]
    fn exit_line_requests_shutdown() {
        let mut sh = shell();
        let mut out = Vec::new();
        assert_eq!(sh.run_line("exit", &mut out).unwrap(), 0);
        assert!(sh.session().should_exit);
    }

    #[test]
    fn three_token_line_runs_the_redirected_form() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let target = stdenv::temp_dir().join(format!(
            "minish_repl_{}_{}",
            std::process::id(),
            nanos
        ));

        let mut sh = shell();
        let mut out = Vec::new();
        let line = format!("/bin/true ignored {}", target.display());
        assert_eq!(sh.run_line(&line, &mut out).unwrap(), 0);
        assert!(target.exists());

        let _ = fs::remove_file(target);
    }

    #[test]
    fn overlong_line_is_rejected() {
        let mut sh = shell();
        let mut out = Vec::new();
        let err = sh.run_line(&"x".repeat(MAX_LINE_BYTES + 1), &mut out).unwrap_err();
        assert!(err.to_string().contains("longer than"));
    }

    #[test]
    fn line_at_the_limit_still_resolves() {
        // 4096 bytes passes the length check and then misses every
        // resolution rule.
        let mut sh = shell();
        let mut out = Vec::new();
        let err = sh.run_line(&"x".repeat(MAX_LINE_BYTES), &mut out).unwrap_err();
        assert!(err.to_string().starts_with("command not found"));
    }
}
