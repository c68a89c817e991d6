use crate::builtin::CommandTable;
use crate::command::ExitCode;
use crate::resolver::DispatchDecision;
use crate::session::SessionState;
use anyhow::{Context, Result, bail};
use nix::libc;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use std::ffi::CString;
use std::io::Write;
use std::process;
use std::ptr;

/// Exit status a child reports when it cannot reach or start the program.
pub const EXEC_FAILURE: ExitCode = 127;

/// Runs one dispatch decision to completion and returns its exit status.
///
/// Built-ins run synchronously in this process; external programs run in a
/// child that is waited for before the call returns, so successive commands
/// never overlap.
pub fn execute(
    decision: DispatchDecision,
    table: &CommandTable,
    stdout: &mut dyn Write,
    session: &mut SessionState,
) -> Result<ExitCode> {
    log::debug!(
        "dispatching {:?} (interactive session: {})",
        decision,
        session.is_interactive
    );
    match decision {
        DispatchDecision::BuiltIn(command) => command.execute(table, stdout, session),
        DispatchDecision::ExternalDirect(program) => run_program(&program, &[], None),
        DispatchDecision::ExternalRedirected {
            program,
            target,
            args,
        } => run_program(&program, &args, Some(&target)),
        DispatchDecision::Unresolved => bail!("command not found"),
    }
}

/// Starts `program` in a child process and waits for it.
///
/// The child's argument vector always begins with a single empty
/// program-name placeholder; `args` follow it. With `redirect_to` set, the
/// child's stdout and stderr are rewired to that file before the program
/// image is loaded.
fn run_program(program: &str, args: &[String], redirect_to: Option<&str>) -> Result<ExitCode> {
    let program_c = CString::new(program).context("program path contains an interior NUL byte")?;

    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(c"".to_owned());
    for arg in args {
        argv.push(CString::new(arg.as_str()).context("argument contains an interior NUL byte")?);
    }

    let target_c = redirect_to
        .map(CString::new)
        .transpose()
        .context("target path contains an interior NUL byte")?;

    let child = spawn_child(&program_c, &argv, || match &target_c {
        Some(target) => unsafe { redirect_output(target.as_ptr()) },
        None => 0,
    })?;
    log::debug!("spawned {program} as pid {child}");
    await_child(child)
}

/// Forks once. The parent gets the child's pid back; the child runs
/// `prepare`, replaces its image with `program` and exits with
/// [`EXEC_FAILURE`] if the exec fails.
///
/// `prepare` runs only in the new process, before the image is replaced; a
/// non-zero return aborts the child with that status instead of exec'ing.
/// It must stay free of allocation and locks, since it runs between fork
/// and exec; everything else the child touches is prepared up front.
fn spawn_child(
    program: &CString,
    argv: &[CString],
    prepare: impl FnOnce() -> ExitCode,
) -> Result<Pid> {
    let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
    argv_ptrs.push(ptr::null());

    match unsafe { fork() }.context("cannot fork a child process")? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => {
            let status = match prepare() {
                0 => unsafe {
                    libc::execv(program.as_ptr(), argv_ptrs.as_ptr());
                    EXEC_FAILURE
                },
                failed => failed,
            };
            process::exit(status);
        }
    }
}

/// Blocks until exactly `child` terminates and maps its wait status to an
/// exit code, with death by signal reported as 128 plus the signal number.
fn await_child(child: Pid) -> Result<ExitCode> {
    match waitpid(child, None).context("cannot wait for the child process")? {
        WaitStatus::Exited(_, code) => Ok(code),
        WaitStatus::Signaled(_, signal, _) => Ok(128 + signal as i32),
        status => {
            log::warn!("unexpected wait status for {child}: {status:?}");
            Ok(-1)
        }
    }
}

/// Rewires stdout and stderr onto `target`, creating the file read-write
/// with owner-only permission bits.
///
/// Runs in the forked child; only async-signal-safe libc calls are allowed
/// here. Returns 0 on success, [`EXEC_FAILURE`] otherwise, releasing the
/// descriptor on every path once descriptors 1 and 2 hold the file open.
unsafe fn redirect_output(target: *const libc::c_char) -> ExitCode {
    unsafe {
        let fd = libc::open(
            target,
            libc::O_RDWR | libc::O_CREAT,
            libc::S_IRUSR | libc::S_IWUSR,
        );
        if fd < 0 {
            return EXEC_FAILURE;
        }
        if libc::dup2(fd, libc::STDOUT_FILENO) < 0 || libc::dup2(fd, libc::STDERR_FILENO) < 0 {
            libc::close(fd);
            return EXEC_FAILURE;
        }
        libc::close(fd);
        0
    }
}
