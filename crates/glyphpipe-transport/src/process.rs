use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// Which side of a [`fork`] the caller is on.
#[derive(Debug)]
pub enum Fork {
    /// The original process. Holds a handle for reaping the child.
    Parent(ChildProcess),
    /// The newly created process.
    Child,
}

/// How a reaped child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// Normal exit with the given status code.
    Exited(i32),
    /// Terminated by the given signal number.
    Signaled(i32),
}

impl ChildExit {
    /// Whether the child exited normally with status 0.
    pub fn success(self) -> bool {
        matches!(self, ChildExit::Exited(0))
    }
}

impl std::fmt::Display for ChildExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildExit::Exited(code) => write!(f, "exit status {code}"),
            ChildExit::Signaled(signal) => write!(f, "killed by signal {signal}"),
        }
    }
}

/// A forked child process that has not been reaped yet.
#[derive(Debug)]
pub struct ChildProcess {
    pid: libc::pid_t,
    reaped: bool,
}

/// Fork the current process.
///
/// # Safety
///
/// The child starts with a single thread. If other threads held locks at the
/// moment of the fork, those locks stay held forever in the child. Callers
/// must only fork where that cannot happen (a single-threaded driver) or where
/// the child touches nothing another thread could have locked. The child must
/// leave through [`exit_child`] rather than returning into code that expects
/// the parent's state.
pub unsafe fn fork() -> Result<Fork> {
    // SAFETY: upheld by the caller as documented above.
    let pid = unsafe { libc::fork() };
    match pid {
        -1 => Err(TransportError::Fork(std::io::Error::last_os_error())),
        0 => Ok(Fork::Child),
        pid => {
            debug!(pid, "forked child process");
            Ok(Fork::Parent(ChildProcess { pid, reaped: false }))
        }
    }
}

/// Terminate a forked child immediately with `code`.
///
/// Skips atexit handlers and stdio flushing inherited from the parent, so the
/// parent's buffered state is never replayed twice.
pub fn exit_child(code: i32) -> ! {
    // SAFETY: _exit(2) has no preconditions and never returns.
    unsafe { libc::_exit(code) }
}

impl ChildProcess {
    /// The child's process id.
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Block until the child terminates and return how it ended.
    pub fn wait(&mut self) -> Result<ChildExit> {
        let mut status: libc::c_int = 0;
        loop {
            // SAFETY: `status` is a valid writable int and `pid` is our own child.
            let rc = unsafe { libc::waitpid(self.pid, &mut status, 0) };
            if rc == -1 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(TransportError::Wait {
                    pid: self.pid,
                    source: err,
                });
            }
            break;
        }
        self.reaped = true;

        let exit = if libc::WIFEXITED(status) {
            ChildExit::Exited(libc::WEXITSTATUS(status))
        } else {
            ChildExit::Signaled(libc::WTERMSIG(status))
        };
        debug!(pid = self.pid, %exit, "reaped child process");
        Ok(exit)
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        let mut status: libc::c_int = 0;
        // SAFETY: non-blocking reap of our own child; `status` is writable.
        let rc = unsafe { libc::waitpid(self.pid, &mut status, libc::WNOHANG) };
        if rc == 0 {
            warn!(pid = self.pid, "child process still running at drop; not reaped");
        }
    }
}
