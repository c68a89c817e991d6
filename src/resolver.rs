//! Classifies a tokenized line into a dispatchable decision.

use crate::builtin::CommandTable;
use crate::command::ExecutableCommand;
use crate::tokenizer::Tokens;
use std::fmt;

/// How a single input line should be executed.
///
/// Produced fresh for every line and consumed immediately by the executor.
pub enum DispatchDecision {
    /// A built-in command, ready to run in the shell process.
    BuiltIn(Box<dyn ExecutableCommand>),
    /// An external program addressed by a filesystem path.
    ExternalDirect(String),
    /// An external program whose stdout and stderr both go to a file.
    ExternalRedirected {
        program: String,
        target: String,
        args: Vec<String>,
    },
    /// Nothing matched; the line names no known command.
    Unresolved,
}

impl fmt::Debug for DispatchDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchDecision::BuiltIn(_) => f.write_str("BuiltIn"),
            DispatchDecision::ExternalDirect(path) => {
                f.debug_tuple("ExternalDirect").field(path).finish()
            }
            DispatchDecision::ExternalRedirected {
                program,
                target,
                args,
            } => f
                .debug_struct("ExternalRedirected")
                .field("program", program)
                .field("target", target)
                .field("args", args)
                .finish(),
            DispatchDecision::Unresolved => f.write_str("Unresolved"),
        }
    }
}

/// Decides how `tokens` should run, in priority order:
///
/// 1. Exactly three tokens select the redirected form: token 0 is the
///    program, token 2 the target file, and token 1 is ignored. The rule
///    is purely length-based and fires no matter what word leads the line.
/// 2. A leading `/` on token 0 selects direct external execution.
/// 3. An exact Command Table match selects the builtin.
/// 4. Anything else, including a blank line, is unresolved.
pub fn resolve(table: &CommandTable, tokens: &Tokens) -> DispatchDecision {
    if tokens.len() == 3 {
        if let (Some(program), Some(target)) = (tokens.get(0), tokens.get(2)) {
            return DispatchDecision::ExternalRedirected {
                program: program.to_owned(),
                target: target.to_owned(),
                args: Vec::new(),
            };
        }
    }

    let Some(name) = tokens.get(0) else {
        return DispatchDecision::Unresolved;
    };

    if name.starts_with('/') {
        return DispatchDecision::ExternalDirect(name.to_owned());
    }

    let args: Vec<&str> = tokens.iter().skip(1).collect();
    match table.lookup(name, &args) {
        Some(command) => DispatchDecision::BuiltIn(command),
        None => DispatchDecision::Unresolved,
    }
}
