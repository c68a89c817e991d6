//! A tiny interactive command shell.
//!
//! The shell reads one line at a time, splits it into whitespace-delimited
//! words and decides between a small table of built-in commands and external
//! programs addressed by absolute path. A three-word line selects the
//! redirected form: the first word is started as a program with its stdout
//! and stderr sent to the file named by the third word.
//!
//! [`Interpreter`] drives the read loop, [`CommandTable`] holds the
//! built-ins, and [`SessionState`] carries the terminal state acquired once
//! at startup. The public modules [`command`], [`resolver`] and [`executor`]
//! expose the traits and operations the loop is assembled from.

mod builtin;
pub mod command;
pub mod executor;
mod interpreter;
pub mod resolver;
pub mod session;
pub mod tokenizer;

pub use builtin::CommandTable;
pub use interpreter::Interpreter;
pub use session::SessionState;
