use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::session::SessionState;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use nix::unistd::{User, getegid, getgid, getgroups, getuid};
use std::io::Write;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "exit" or "id".
    fn name() -> &'static str;

    /// One-line description shown by the help builtin.
    fn description() -> &'static str;

    /// Executes the command using the provided output stream.
    ///
    /// Return value should follow shell conventions: 0 for success,
    /// non-zero for error.
    fn execute(
        self,
        table: &CommandTable,
        stdout: &mut dyn Write,
        session: &mut SessionState,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        table: &CommandTable,
        stdout: &mut dyn Write,
        session: &mut SessionState,
    ) -> Result<ExitCode> {
        match T::execute(*self, table, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{e:#}")?;
                Ok(1)
            }
        }
    }
}

/// Stand-in command produced when argument parsing stops early, either for
/// `--help` output or for a usage error.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _table: &CommandTable,
        stdout: &mut dyn Write,
        _session: &mut SessionState,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

/// Zero-sized factory that recognizes exactly one builtin.
struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

struct TableEntry {
    name: &'static str,
    description: &'static str,
    factory: Box<dyn CommandFactory>,
}

/// Fixed, ordered set of built-in command descriptors.
///
/// Built once at startup and read-only afterwards. Iteration order is the
/// registration order and drives the help output verbatim.
pub struct CommandTable {
    entries: Vec<TableEntry>,
}

impl CommandTable {
    /// The table of this shell's built-ins.
    pub fn builtin() -> Self {
        let mut table = CommandTable {
            entries: Vec::new(),
        };
        table.register::<Help>();
        table.register::<Exit>();
        table.register::<Id>();
        table
    }

    fn register<T: BuiltinCommand + 'static>(&mut self) {
        self.entries.push(TableEntry {
            name: T::name(),
            description: T::description(),
            factory: Box::new(Factory::<T>::default()),
        });
    }

    /// Exact, case-sensitive lookup; `None` when no builtin has that name.
    pub fn lookup(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        self.entries
            .iter()
            .find_map(|entry| entry.factory.try_create(name, args))
    }

    /// Name and description pairs, in registration order.
    pub fn summaries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|e| (e.name, e.description))
    }
}

#[derive(FromArgs)]
/// show this help menu
pub struct Help {
    #[argh(positional, greedy)]
    /// hack to ignore any extra words on the line
    pub _args: Vec<String>,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "?"
    }

    fn description() -> &'static str {
        "show this help menu"
    }

    fn execute(
        self,
        table: &CommandTable,
        stdout: &mut dyn Write,
        _session: &mut SessionState,
    ) -> Result<ExitCode> {
        for (name, description) in table.summaries() {
            writeln!(stdout, "{name} - {description}")?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// exit the command shell
pub struct Exit {
    #[argh(positional, greedy)]
    /// hack to ignore any extra words on the line
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn description() -> &'static str {
        "exit the command shell"
    }

    fn execute(
        self,
        _table: &CommandTable,
        _stdout: &mut dyn Write,
        session: &mut SessionState,
    ) -> Result<ExitCode> {
        session.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// display the user-id, the primary group-id and the groups the user is part of
pub struct Id {
    #[argh(positional, greedy)]
    /// hack to ignore any extra words on the line
    pub _args: Vec<String>,
}

impl BuiltinCommand for Id {
    fn name() -> &'static str {
        "id"
    }

    fn description() -> &'static str {
        "display the user-id, the primary group-id and the groups the user is part of"
    }

    fn execute(
        self,
        _table: &CommandTable,
        stdout: &mut dyn Write,
        _session: &mut SessionState,
    ) -> Result<ExitCode> {
        let uid = getuid();
        let user = User::from_uid(uid)
            .context("cannot read the user database")?
            .ok_or_else(|| anyhow!("no user database entry for uid {uid}"))?;

        writeln!(stdout, "User name: {}", user.name)?;
        writeln!(stdout, "User ID is {uid}")?;
        writeln!(stdout, "Group ID is {}", getgid())?;

        write!(
            stdout,
            "{} belongs to these groups: {}",
            user.name,
            getegid()
        )?;
        for group in getgroups().context("cannot read the supplementary groups")? {
            write!(stdout, ", {group}")?;
        }
        writeln!(stdout)?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_builtin(name: &str, args: &[&str]) -> (Result<ExitCode>, String, SessionState) {
        let table = CommandTable::builtin();
        let mut session = SessionState::detached();
        let mut out = Vec::new();
        let cmd = table.lookup(name, args).expect("builtin should resolve");
        let res = cmd.execute(&table, &mut out, &mut session);
        (res, String::from_utf8(out).unwrap(), session)
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let table = CommandTable::builtin();
        assert!(table.lookup("exit", &[]).is_some());
        assert!(table.lookup("EXIT", &[]).is_none());
        assert!(table.lookup("exi", &[]).is_none());
        assert!(table.lookup("", &[]).is_none());
    }

    #[test]
    fn summaries_follow_registration_order() {
        let table = CommandTable::builtin();
        let names: Vec<&str> = table.summaries().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["?", "exit", "id"]);
    }

    #[test]
    fn help_prints_one_line_per_entry() {
        let (res, out, _) = run_builtin("?", &[]);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(
            out,
            "? - show this help menu\n\
             exit - exit the command shell\n\
             id - display the user-id, the primary group-id and the groups the user is part of\n"
        );
    }

    #[test]
    fn exit_requests_session_shutdown() {
        let (res, out, session) = run_builtin("exit", &[]);
        assert_eq!(res.unwrap(), 0);
        assert!(out.is_empty());
        assert!(session.should_exit);
    }

    #[test]
    fn exit_ignores_surplus_words() {
        let (res, _, session) = run_builtin("exit", &["right", "now"]);
        assert_eq!(res.unwrap(), 0);
        assert!(session.should_exit);
    }

    #[test]
    fn id_reports_current_identity() {
        let (res, out, _) = run_builtin("id", &[]);
        assert_eq!(res.unwrap(), 0);
        assert!(out.starts_with("User name: "));
        assert!(out.contains(&format!("User ID is {}\n", getuid())));
        assert!(out.contains(&format!("Group ID is {}\n", getgid())));
        assert!(out.contains("belongs to these groups: "));
    }

    #[test]
    fn help_flag_prints_usage_without_failing() {
        let (res, out, _) = run_builtin("?", &["--help"]);
        assert_eq!(res.unwrap(), 0);
        assert!(out.contains("show this help menu"));
    }
}
