use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{Signal, kill};
use nix::sys::termios::{self, SetArg, Termios};
use nix::unistd::{Pid, getpgrp, getpid};
use std::io::{self, IsTerminal};

/// Terminal-facing state of one shell session.
///
/// Built exactly once before the first command is read. The `exit` builtin
/// flips `should_exit`; the read loop polls it after every command.
pub struct SessionState {
    /// Whether standard input is a terminal the shell controls.
    pub is_interactive: bool,
    /// Process group that owns the terminal while the shell runs.
    pub shell_pgid: Pid,
    /// Set when the session has been asked to end.
    pub should_exit: bool,
    saved_modes: Option<Termios>,
}

impl SessionState {
    /// State for a shell that is not driving a terminal.
    pub fn detached() -> Self {
        SessionState {
            is_interactive: false,
            shell_pgid: getpid(),
            should_exit: false,
            saved_modes: None,
        }
    }

    /// Probes standard input and, when it is a terminal, moves the shell
    /// into the foreground and captures the terminal modes.
    ///
    /// Terminal-control failures downgrade the session to non-interactive;
    /// the shell never carries on believing it holds a foreground it was
    /// not granted.
    pub fn init() -> Self {
        let mut state = Self::detached();
        if io::stdin().is_terminal() {
            match claim_foreground() {
                Ok(modes) => {
                    state.is_interactive = true;
                    state.saved_modes = Some(modes);
                }
                Err(err) => {
                    log::error!("terminal unavailable, running without terminal control: {err:#}");
                }
            }
        }
        state
    }

    /// Puts the terminal back into the modes captured at startup.
    pub fn restore_terminal(&self) {
        if let Some(modes) = &self.saved_modes {
            let stdin = io::stdin();
            if let Err(err) = termios::tcsetattr(&stdin, SetArg::TCSADRAIN, modes) {
                log::warn!("cannot restore terminal modes: {err}");
            }
        }
    }
}

/// Blocks until this process group owns the terminal, then claims the
/// foreground for this process and captures the current terminal modes.
///
/// A shell started in the background stops itself with SIGTTIN on each
/// round; the supervising shell's SIGCONT resumes the loop once the
/// terminal has been handed over. There is no timeout.
fn claim_foreground() -> Result<Termios> {
    loop {
        let own = getpgrp();
        if foreground_group()? == own {
            break;
        }
        kill(Pid::from_raw(-own.as_raw()), Signal::SIGTTIN)
            .context("cannot signal own process group")?;
    }

    let shell_pgid = getpid();
    set_foreground_group(shell_pgid)?;

    let stdin = io::stdin();
    let modes = termios::tcgetattr(&stdin).context("cannot read terminal modes")?;
    log::debug!("terminal foreground acquired by process group {shell_pgid}");
    Ok(modes)
}

fn foreground_group() -> Result<Pid> {
    let pgid = unsafe { libc::tcgetpgrp(libc::STDIN_FILENO) };
    if pgid < 0 {
        return Err(Errno::last()).context("cannot query the foreground process group");
    }
    Ok(Pid::from_raw(pgid))
}

fn set_foreground_group(pgid: Pid) -> Result<()> {
    if unsafe { libc::tcsetpgrp(libc::STDIN_FILENO, pgid.as_raw()) } != 0 {
        return Err(Errno::last()).context("cannot move the shell into the foreground");
    }
    Ok(())
}
