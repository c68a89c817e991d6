use crate::builtin::CommandTable;
use crate::session::SessionState;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Object-safe trait for any command that runs inside the shell process.
///
/// Implemented by built-ins via a blanket impl; the shell never spawns a
/// child to run one of these.
pub trait ExecutableCommand {
    /// Executes the command, writing its output to `stdout`.
    fn execute(
        self: Box<Self>,
        table: &CommandTable,
        stdout: &mut dyn Write,
        session: &mut SessionState,
    ) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
