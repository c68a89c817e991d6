use anyhow::Result;
use argh::FromArgs;
use minish::{CommandTable, Interpreter, SessionState};

#[derive(FromArgs)]
/// A tiny interactive command shell.
struct MinishArgs {}

fn main() -> Result<()> {
    let _args: MinishArgs = argh::from_env();
    env_logger::init();

    let mut shell = Interpreter::new(CommandTable::builtin(), SessionState::init());
    let outcome = shell.repl();
    shell.session().restore_terminal();
    outcome
}
