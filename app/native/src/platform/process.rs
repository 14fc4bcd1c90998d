//! Operating-system process control.
//!
//! The supervisor never touches `fork`, signals or `/proc` directly. It goes
//! through [`ProcessLauncher`] so the lifecycle logic can be exercised without
//! spawning real programs.
//!
//! [`OsLauncher`] is the production implementation:
//!
//! ```text
//! launch()      std::process::Command, own process group, DISPLAY set or removed
//! signal()      kill(-pgid, SIGTERM | SIGKILL)
//! reap()        try_wait() on every tracked child
//! parent_of()   sysinfo process table
//! ```

use std::collections::HashMap;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Everything needed to start one managed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Program name or path, looked up through `PATH`.
    pub program: String,
    /// Arguments after substitution.
    pub args: Vec<String>,
    /// Value for `DISPLAY`; `None` removes it from the environment.
    pub display: Option<String>,
    /// Working directory for the child.
    pub directory: Option<PathBuf>,
}

/// Signals the supervisor sends to a process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Polite shutdown request.
    Terminate,
    /// Forced kill.
    Kill,
}

impl Signal {
    const fn raw(self) -> libc::c_int {
        match self {
            Self::Terminate => libc::SIGTERM,
            Self::Kill => libc::SIGKILL,
        }
    }
}

/// Abstraction over process creation and control.
pub trait ProcessLauncher: Send {
    /// Starts a process as leader of a new process group.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the process cannot be created.
    fn launch(&mut self, spec: &LaunchSpec) -> io::Result<u32>;

    /// Sends `signal` to the whole process group led by `pgid`.
    ///
    /// # Errors
    ///
    /// Returns the OS error when delivery fails (for example the group is gone).
    fn signal(&mut self, pgid: u32, signal: Signal) -> io::Result<()>;

    /// Collects exited children without blocking and returns their pids.
    fn reap(&mut self) -> Vec<u32>;

    /// Returns the parent pid of `pid`, if it is known.
    fn parent_of(&mut self, pid: u32) -> Option<u32>;
}

/// Launcher backed by the real operating system.
pub struct OsLauncher {
    children: HashMap<u32, Child>,
    system: System,
}

impl OsLauncher {
    /// Creates a launcher with no tracked children.
    #[must_use]
    pub fn new() -> Self { Self { children: HashMap::new(), system: System::new() } }
}

impl Default for OsLauncher {
    fn default() -> Self { Self::new() }
}

impl ProcessLauncher for OsLauncher {
    fn launch(&mut self, spec: &LaunchSpec) -> io::Result<u32> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args).stdin(Stdio::null()).process_group(0);

        match &spec.display {
            Some(display) => command.env("DISPLAY", display),
            None => command.env_remove("DISPLAY"),
        };

        if let Some(directory) = &spec.directory {
            command.current_dir(directory);
        }

        let child = command.spawn()?;
        let pid = child.id();
        self.children.insert(pid, child);
        Ok(pid)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn signal(&mut self, pgid: u32, signal: Signal) -> io::Result<()> {
        if pgid == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "refusing to signal group 0"));
        }

        // Negative pid addresses the process group.
        // SAFETY: kill has no memory-safety preconditions.
        let result = unsafe { libc::kill(-(pgid as libc::pid_t), signal.raw()) };
        if result == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
    }

    fn reap(&mut self) -> Vec<u32> {
        let mut exited = Vec::new();

        self.children.retain(|pid, child| match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(pid, %status, "child exited");
                exited.push(*pid);
                false
            }
            Ok(None) => true,
            Err(err) => {
                tracing::warn!(pid, error = %err, "failed to poll child, dropping it");
                exited.push(*pid);
                false
            }
        });

        exited
    }

    fn parent_of(&mut self, pid: u32) -> Option<u32> {
        let target = Pid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            ProcessRefreshKind::nothing(),
        );
        self.system.process(target).and_then(sysinfo::Process::parent).map(Pid::as_u32)
    }
}
