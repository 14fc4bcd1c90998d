//! Process supervisor.
//!
//! Owns the catalog of managed entries and drives their processes through the
//! lifecycle state machine:
//!
//! ```text
//!            start()               stop(): SIGTERM
//! Stopped ───────────▶ Running ───────────────────▶ Terminated
//!    ▲                    │                             │  stop(): SIGKILL
//!    └────── reap() ──────┴─────────── reap() ──────────┘
//! ```
//!
//! Entries live in an arena indexed by [`EntryId`]. The supervisor never talks
//! to the window manager; operations that need it (fullscreen rollback after a
//! reap, frame selection before a start) are reported back to the caller.

mod entry;
mod matching;
mod restack;

use std::time::Duration;

pub use entry::{
    ArgumentKind, ArgumentSpec, EntryDefinition, EntryId, EntryKind, Lifecycle, ManagedEntry,
    WindowFilters, WindowMode, substitute,
};
pub use matching::{MatchStrategy, WindowInfo, find_owner};
pub use restack::restack;
use thiserror::Error;

use crate::automation::WindowCatalog;
use crate::platform::{LaunchSpec, ProcessLauncher, Signal};
use crate::state::{DisplayId, DisplayTable, FrameId, WindowHandle};

/// Number of rounds `teardown` waits for processes to exit before giving up.
const TEARDOWN_ROUNDS: usize = 50;

/// Errors from supervisor operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No entry with that name or id.
    #[error("unknown entry '{0}'")]
    UnknownEntry(String),

    /// Two entries of the same category share a name.
    #[error("entry '{0}' declared twice")]
    Duplicate(String),

    /// Start requested for an entry that is still running or terminating.
    #[error("'{0}' is not stopped")]
    NotStopped(String),

    /// Repatriated entries are only displayed, never controlled.
    #[error("'{0}' was adopted from the window manager and cannot be controlled")]
    NotManaged(String),

    /// The command line is empty.
    #[error("'{0}' has no command to execute")]
    EmptyCommand(String),

    /// The process could not be created.
    #[error("failed to spawn '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// An enum argument received a value outside its options.
    #[error("value '{value}' is not valid for argument '{argument}' of '{command}'")]
    InvalidArgument { command: String, argument: String, value: String },
}

/// Parameters of a start.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub display: DisplayId,
    pub frame: Option<FrameId>,
    /// Argument values in declaration order.
    pub arguments: Vec<String>,
    /// Roll back fullscreen when the process exits.
    pub restore_layout: bool,
}

/// An entry that was observed to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub entry: EntryId,
    pub display: DisplayId,
    /// The display was put into fullscreen for this entry and must be rolled back.
    pub rollback: bool,
}

/// Catalog of managed entries plus the process launcher.
pub struct Supervisor {
    entries: Vec<ManagedEntry>,
    launcher: Box<dyn ProcessLauncher>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor").field("entries", &self.entries).finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Creates an empty supervisor using `launcher` for process control.
    #[must_use]
    pub fn new(launcher: Box<dyn ProcessLauncher>) -> Self {
        Self { entries: Vec::new(), launcher }
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Registers an entry.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Duplicate`] if an entry of the same category
    /// already uses the name (compared case-insensitively).
    pub fn declare(&mut self, def: EntryDefinition) -> Result<EntryId, SupervisorError> {
        let exists = if def.kind.is_command() {
            self.find_command(&def.name).is_some()
        } else {
            self.find_window(&def.name).is_some()
        };
        if exists {
            return Err(SupervisorError::Duplicate(def.name));
        }

        let id = self.entries.len();
        tracing::debug!(entry = %def.name, id, kind = ?def.kind, "declared entry");
        self.entries.push(ManagedEntry::new(def));
        Ok(id)
    }

    #[must_use]
    pub fn entries(&self) -> &[ManagedEntry] { &self.entries }

    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&ManagedEntry> { self.entries.get(id) }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut ManagedEntry, SupervisorError> {
        self.entries.get_mut(id).ok_or_else(|| SupervisorError::UnknownEntry(id.to_string()))
    }

    /// Finds an explicit command by name, case-insensitively.
    #[must_use]
    pub fn find_command(&self, name: &str) -> Option<EntryId> {
        self.entries
            .iter()
            .position(|e| e.kind().is_command() && e.name().eq_ignore_ascii_case(name))
    }

    /// Finds an automation window by name, case-insensitively.
    #[must_use]
    pub fn find_window(&self, name: &str) -> Option<EntryId> {
        self.entries.iter().position(|e| {
            !e.kind().is_command() && !e.kind().is_repatriated() && e.name().eq_ignore_ascii_case(name)
        })
    }

    /// Names of all entries that are not stopped.
    #[must_use]
    pub fn running_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.is_active() && !e.name().is_empty())
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Number of entries that are not stopped.
    #[must_use]
    pub fn active_count(&self) -> usize { self.entries.iter().filter(|e| e.is_active()).count() }

    // ========================================================================
    // Arguments
    // ========================================================================

    /// Orders and validates request arguments for an explicit command.
    ///
    /// `provided` holds `(name, value)` pairs matched case-insensitively.
    /// Missing arguments become empty strings. Enum values are rewritten to
    /// the canonical case of the matching option.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::InvalidArgument`] for enum values outside
    /// the declared options.
    pub fn prepare_arguments(
        &self,
        id: EntryId,
        provided: &[(String, String)],
    ) -> Result<Vec<String>, SupervisorError> {
        let entry = self.entries.get(id).ok_or_else(|| SupervisorError::UnknownEntry(id.to_string()))?;

        entry
            .def
            .arguments
            .iter()
            .map(|spec| {
                let Some((_, value)) = provided.iter().find(|(n, _)| n.eq_ignore_ascii_case(&spec.name))
                else {
                    tracing::debug!(command = entry.name(), argument = %spec.name, "argument missing, using empty value");
                    return Ok(String::new());
                };

                spec.canonicalize(value).ok_or_else(|| SupervisorError::InvalidArgument {
                    command: entry.name().to_string(),
                    argument: spec.name.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn next_order(&mut self) -> u32 { restack(self.entries.iter_mut().map(|e| &mut e.order)) }

    fn launch_spec(entry: &ManagedEntry, options: &StartOptions, displays: &DisplayTable) -> Option<LaunchSpec> {
        let mut tokens = entry.def.command.split_whitespace();
        let program = tokens.next()?.to_string();

        let mut values = options.arguments.clone();
        values.resize(entry.def.arguments.len(), String::new());
        let args = tokens.map(|t| substitute(t, &entry.def.arguments, &values)).collect();

        let display = if entry.kind().owns_windows() {
            displays.display(options.display).map(|d| d.identifier.clone())
        } else {
            None
        };

        Some(LaunchSpec { program, args, display, directory: entry.def.directory.clone() })
    }

    /// Starts a stopped entry.
    ///
    /// On success the entry is `Running`, carries a fresh stacking order and
    /// its attempt counter is incremented. Window-owning explicit commands
    /// lock their display until reaped.
    ///
    /// # Errors
    ///
    /// Fails without changing state when the entry is not stopped, is
    /// repatriated, has no command, or the process cannot be spawned.
    pub fn start(
        &mut self,
        id: EntryId,
        options: &StartOptions,
        displays: &mut DisplayTable,
    ) -> Result<(), SupervisorError> {
        let entry = self.entries.get(id).ok_or_else(|| SupervisorError::UnknownEntry(id.to_string()))?;
        let name = entry.name().to_string();

        if entry.kind().is_repatriated() {
            return Err(SupervisorError::NotManaged(name));
        }
        if entry.lifecycle != Lifecycle::Stopped {
            return Err(SupervisorError::NotStopped(name));
        }

        let spec = Self::launch_spec(entry, options, displays)
            .ok_or_else(|| SupervisorError::EmptyCommand(name.clone()))?;

        let pid = self.launcher.launch(&spec).map_err(|source| {
            tracing::error!(entry = %name, error = %source, "failed to spawn process");
            SupervisorError::Spawn { name: name.clone(), source }
        })?;

        let order = self.next_order();
        let entry = self.entry_mut(id)?;
        entry.lifecycle = Lifecycle::Running;
        entry.pgid = Some(pid);
        entry.order = order;
        entry.display = options.display;
        entry.frame = options.frame;
        entry.windows.clear();
        entry.attempts += 1;
        entry.restore_layout = options.restore_layout;

        let lock = matches!(entry.kind(), EntryKind::Command { windows: true });
        entry.holds_lock = lock;
        let attempts = entry.attempts;

        if lock && let Some(display) = displays.display_mut(options.display) {
            display.lock();
        }

        tracing::info!(entry = %name, pid, display = options.display, frame = ?options.frame, order, attempts, "started");
        Ok(())
    }

    /// Stops an entry: SIGTERM when running, SIGKILL when already terminating.
    ///
    /// Stopping a stopped entry is a logged no-op. Any stop resets the stacking
    /// order and the start-attempt counter.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotManaged`] for repatriated entries.
    pub fn stop(&mut self, id: EntryId) -> Result<(), SupervisorError> {
        let entry = self.entries.get_mut(id).ok_or_else(|| SupervisorError::UnknownEntry(id.to_string()))?;

        if entry.kind().is_repatriated() {
            return Err(SupervisorError::NotManaged(entry.name().to_string()));
        }

        let signal = match entry.lifecycle {
            Lifecycle::Stopped => {
                tracing::debug!(entry = entry.name(), "not running, not stopping");
                None
            }
            Lifecycle::Running => {
                entry.lifecycle = Lifecycle::Terminated;
                Some(Signal::Terminate)
            }
            Lifecycle::Terminated => Some(Signal::Kill),
        };

        entry.order = 0;
        entry.attempts = 0;

        if let (Some(signal), Some(pgid)) = (signal, entry.pgid) {
            let name = entry.name().to_string();
            match self.launcher.signal(pgid, signal) {
                Ok(()) => tracing::debug!(entry = %name, pgid, ?signal, "signalled process group"),
                Err(err) => tracing::warn!(entry = %name, pgid, ?signal, error = %err, "failed to signal process group"),
            }
        }

        Ok(())
    }

    /// Collects exited processes and moves their entries to `Stopped`.
    ///
    /// Busy locks are released here; fullscreen rollbacks are returned for the
    /// caller to perform.
    pub fn reap(&mut self, displays: &mut DisplayTable) -> Vec<Reaped> {
        let mut reaped = Vec::new();

        for pid in self.launcher.reap() {
            let Some((id, entry)) = self
                .entries
                .iter_mut()
                .enumerate()
                .find(|(_, e)| e.is_active() && e.pgid == Some(pid))
            else {
                tracing::trace!(pid, "reaped unknown process");
                continue;
            };

            entry.lifecycle = Lifecycle::Stopped;
            entry.pgid = None;
            entry.order = 0;
            entry.frame = None;

            if entry.holds_lock {
                entry.holds_lock = false;
                if let Some(display) = displays.display_mut(entry.display) {
                    display.unlock();
                }
            }

            let rollback = std::mem::take(&mut entry.restore_layout);
            tracing::info!(entry = entry.name(), pid, "instance stopped");
            reaped.push(Reaped { entry: id, display: entry.display, rollback });
        }

        reaped
    }

    /// Stops everything and waits for it to exit, escalating to SIGKILL.
    ///
    /// Blocks the calling thread for up to `TEARDOWN_ROUNDS` polls. Async
    /// callers run it on the blocking pool.
    pub fn teardown(&mut self, displays: &mut DisplayTable, poll: Duration) {
        for round in 0..TEARDOWN_ROUNDS {
            let active: Vec<EntryId> = self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.is_active() && !e.kind().is_repatriated())
                .map(|(id, _)| id)
                .collect();

            if active.is_empty() {
                return;
            }

            tracing::debug!(round, remaining = active.len(), "stopping managed entries");
            for id in active {
                if let Err(err) = self.stop(id) {
                    tracing::warn!(error = %err, "teardown stop failed");
                }
            }

            self.reap(displays);
            std::thread::sleep(poll);
            self.reap(displays);
        }

        tracing::warn!(remaining = self.active_count(), "teardown gave up waiting for processes");
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Brings a running entry to the front of `frame`.
    ///
    /// An entry already front-most in that frame keeps its order.
    pub fn raise(&mut self, id: EntryId, frame: FrameId) {
        let Some(entry) = self.entries.get(id) else { return };
        let display = entry.display;

        let front = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_running() && e.display == display && e.frame == Some(frame))
            .max_by_key(|(_, e)| e.order)
            .map(|(i, _)| i);

        if front == Some(id) && self.entries[id].order > 0 {
            return;
        }

        let order = self.next_order();
        if let Some(entry) = self.entries.get_mut(id) {
            entry.order = order;
            entry.frame = Some(frame);
            tracing::debug!(entry = entry.name(), frame, order, "raised");
        }
    }

    /// Front-most window of a frame: the last handle of the highest-order
    /// running entry bound to it.
    #[must_use]
    pub fn frame_window(&self, display: DisplayId, frame: FrameId) -> Option<WindowHandle> {
        self.entries
            .iter()
            .filter(|e| {
                e.is_running() && e.display == display && e.frame == Some(frame) && !e.windows.is_empty()
            })
            .max_by_key(|e| e.order)
            .and_then(|e| e.windows.last().copied())
    }

    /// Clears pending fullscreen rollbacks on a display.
    pub fn discard_restores(&mut self, display: DisplayId) {
        for entry in self.entries.iter_mut().filter(|e| e.display == display) {
            entry.restore_layout = false;
        }
    }

    // ========================================================================
    // Windows
    // ========================================================================

    /// Correlates a new window with a running entry and records its handle.
    ///
    /// Matching also resets the entry's start-attempt counter: the process
    /// produced its window.
    pub fn match_window(
        &mut self,
        target: DisplayId,
        window: &WindowInfo,
    ) -> Option<(EntryId, MatchStrategy)> {
        let launcher = &mut self.launcher;
        let Some((id, strategy)) = find_owner(&self.entries, target, window, |pid| launcher.parent_of(pid))
        else {
            tracing::info!(
                window = window.handle,
                pid = ?window.pid,
                title = %window.title,
                app = %window.app_name,
                class = %window.class,
                display = target,
                "failed to match window to a running entry"
            );
            return None;
        };

        let entry = &mut self.entries[id];
        entry.windows.push(window.handle);
        entry.attempts = 0;
        tracing::debug!(
            window = window.handle,
            entry = entry.name(),
            ?strategy,
            windows = entry.windows.len(),
            "matched window"
        );
        Some((id, strategy))
    }

    /// Forgets a destroyed window. Returns the entry that held it.
    ///
    /// A repatriated entry losing its last window becomes `Stopped`.
    pub fn discard_window(&mut self, target: DisplayId, handle: WindowHandle) -> Option<EntryId> {
        let Some((id, entry)) = self
            .entries
            .iter_mut()
            .enumerate()
            .find(|(_, e)| e.display == target && e.windows.contains(&handle))
        else {
            tracing::debug!(window = handle, display = target, "unmatched window destroyed");
            return None;
        };

        entry.windows.retain(|w| *w != handle);
        tracing::debug!(window = handle, entry = entry.name(), left = entry.windows.len(), "dismissed window");

        if entry.kind().is_repatriated() && entry.windows.is_empty() {
            entry.lifecycle = Lifecycle::Stopped;
            entry.order = 0;
            entry.frame = None;
        }

        Some(id)
    }

    /// Adopts a window that already existed on the window manager.
    pub fn repatriate(&mut self, target: DisplayId, frame: FrameId, handle: WindowHandle) -> EntryId {
        let id = self.entries.len();
        let mut entry = ManagedEntry::new(EntryDefinition {
            name: String::new(),
            kind: EntryKind::Window { mode: WindowMode::Repatriated },
            description: None,
            command: String::new(),
            directory: None,
            arguments: Vec::new(),
            filters: WindowFilters::default(),
            home_display: target,
        });
        entry.lifecycle = Lifecycle::Running;
        entry.frame = Some(frame);
        entry.windows.push(handle);
        self.entries.push(entry);

        tracing::info!(window = handle, display = target, frame, "repatriated window");
        id
    }
}

impl WindowCatalog for Supervisor {
    fn automation_window(&self, name: &str) -> Option<EntryId> { self.find_window(name) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLauncher, LauncherLog};

    fn window_def(name: &str, mode: WindowMode) -> EntryDefinition {
        EntryDefinition {
            name: name.to_string(),
            kind: EntryKind::Window { mode },
            description: None,
            command: format!("/usr/bin/{name} --fullscreen"),
            directory: None,
            arguments: Vec::new(),
            filters: WindowFilters::default(),
            home_display: 0,
        }
    }

    fn command_def(name: &str, windows: bool) -> EntryDefinition {
        EntryDefinition {
            name: name.to_string(),
            kind: EntryKind::Command { windows },
            description: Some("play a clip".to_string()),
            command: "mpv --loop=%LOOP %file".to_string(),
            directory: None,
            arguments: vec![
                ArgumentSpec { name: "file".into(), kind: ArgumentKind::String, options: vec![], hint: None },
                ArgumentSpec {
                    name: "loop".into(),
                    kind: ArgumentKind::Enum,
                    options: vec!["Yes".into(), "No".into()],
                    hint: None,
                },
            ],
            filters: WindowFilters::default(),
            home_display: 0,
        }
    }

    fn setup() -> (Supervisor, LauncherLog, DisplayTable) {
        let (launcher, log) = FakeLauncher::new();
        let mut displays = DisplayTable::new();
        displays.add_display("main", ":0");
        displays.add_display("side", ":1");
        (Supervisor::new(Box::new(launcher)), log, displays)
    }

    fn start_at(sup: &mut Supervisor, displays: &mut DisplayTable, id: EntryId, frame: FrameId) {
        let options = StartOptions { display: 0, frame: Some(frame), ..StartOptions::default() };
        sup.start(id, &options, displays).unwrap();
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    #[test]
    fn test_declare_rejects_duplicates_per_category() {
        let (mut sup, _, _) = setup();
        sup.declare(window_def("clock", WindowMode::Lazy)).unwrap();
        assert!(matches!(
            sup.declare(window_def("Clock", WindowMode::Keepalive)),
            Err(SupervisorError::Duplicate(_))
        ));
        // Same name as a command is fine.
        assert!(sup.declare(command_def("clock", false)).is_ok());
    }

    #[test]
    fn test_find_is_case_insensitive_and_scoped() {
        let (mut sup, _, _) = setup();
        let clock = sup.declare(window_def("clock", WindowMode::Lazy)).unwrap();
        let play = sup.declare(command_def("play", true)).unwrap();

        assert_eq!(sup.find_window("CLOCK"), Some(clock));
        assert_eq!(sup.find_command("Play"), Some(play));
        assert_eq!(sup.find_window("play"), None);
        assert_eq!(sup.find_command("clock"), None);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[test]
    fn test_state_transitions() {
        let (mut sup, log, mut displays) = setup();
        let id = sup.declare(window_def("clock", WindowMode::Lazy)).unwrap();

        start_at(&mut sup, &mut displays, id, 1);
        assert_eq!(sup.entry(id).unwrap().lifecycle, Lifecycle::Running);

        sup.stop(id).unwrap();
        assert_eq!(sup.entry(id).unwrap().lifecycle, Lifecycle::Terminated);

        // A second stop escalates but never goes back to running.
        sup.stop(id).unwrap();
        assert_eq!(sup.entry(id).unwrap().lifecycle, Lifecycle::Terminated);

        let pid = sup.entry(id).unwrap().pgid.unwrap();
        assert_eq!(log.signals(), vec![(pid, Signal::Terminate), (pid, Signal::Kill)]);

        log.exit(pid);
        let reaped = sup.reap(&mut displays);
        assert_eq!(reaped, vec![Reaped { entry: id, display: 0, rollback: false }]);
        assert_eq!(sup.entry(id).unwrap().lifecycle, Lifecycle::Stopped);
    }

    #[test]
    fn test_stop_on_stopped_is_noop() {
        let (mut sup, log, _) = setup();
        let id = sup.declare(window_def("clock", WindowMode::Lazy)).unwrap();
        sup.stop(id).unwrap();
        assert_eq!(sup.entry(id).unwrap().lifecycle, Lifecycle::Stopped);
        assert!(log.signals().is_empty());
    }

    #[test]
    fn test_start_requires_stopped() {
        let (mut sup, log, mut displays) = setup();
        let id = sup.declare(window_def("clock", WindowMode::Lazy)).unwrap();
        start_at(&mut sup, &mut displays, id, 1);

        let err = sup.start(id, &StartOptions::default(), &mut displays).unwrap_err();
        assert!(matches!(err, SupervisorError::NotStopped(_)));
        assert_eq!(log.launches().len(), 1);
    }

    #[test]
    fn test_spawn_failure_leaves_state_unchanged() {
        let (mut sup, log, mut displays) = setup();
        let id = sup.declare(window_def("clock", WindowMode::Lazy)).unwrap();
        log.fail_next_launch();

        let err = sup.start(id, &StartOptions::default(), &mut displays).unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }));

        let entry = sup.entry(id).unwrap();
        assert_eq!(entry.lifecycle, Lifecycle::Stopped);
        assert_eq!(entry.attempts, 0);
        assert_eq!(entry.order, 0);
    }

    #[test]
    fn test_launch_spec_environment() {
        let (mut sup, log, mut displays) = setup();
        let play = sup.declare(command_def("play", true)).unwrap();
        let quiet = sup.declare(command_def("quiet", false)).unwrap();

        let arguments = sup
            .prepare_arguments(play, &[("FILE".into(), "intro.mp4".into()), ("loop".into(), "yes".into())])
            .unwrap();
        let options = StartOptions { display: 1, arguments, ..StartOptions::default() };
        sup.start(play, &options, &mut displays).unwrap();
        sup.start(quiet, &StartOptions::default(), &mut displays).unwrap();

        let launches = log.launches();
        assert_eq!(launches[0].program, "mpv");
        assert_eq!(launches[0].args, vec!["--loop=Yes", "intro.mp4"]);
        assert_eq!(launches[0].display.as_deref(), Some(":1"));
        assert_eq!(launches[1].display, None);
        assert_eq!(launches[1].args, vec!["--loop=", ""]);
    }

    #[test]
    fn test_prepare_arguments_rejects_bad_enum() {
        let (mut sup, _, _) = setup();
        let play = sup.declare(command_def("play", true)).unwrap();
        let err = sup.prepare_arguments(play, &[("loop".into(), "maybe".into())]).unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidArgument { .. }));
    }

    #[test]
    fn test_window_command_locks_display_until_reaped() {
        let (mut sup, log, mut displays) = setup();
        let play = sup.declare(command_def("play", true)).unwrap();
        let options = StartOptions { display: 0, restore_layout: true, ..StartOptions::default() };
        sup.start(play, &options, &mut displays).unwrap();
        assert!(displays.display(0).unwrap().is_busy());

        log.exit(sup.entry(play).unwrap().pgid.unwrap());
        let reaped = sup.reap(&mut displays);
        assert_eq!(reaped, vec![Reaped { entry: play, display: 0, rollback: true }]);
        assert!(!displays.display(0).unwrap().is_busy());
    }

    #[test]
    fn test_automation_window_does_not_lock() {
        let (mut sup, _, mut displays) = setup();
        let clock = sup.declare(window_def("clock", WindowMode::Lazy)).unwrap();
        start_at(&mut sup, &mut displays, clock, 2);
        assert!(!displays.display(0).unwrap().is_busy());
    }

    #[test]
    fn test_stop_resets_attempts_and_order() {
        let (mut sup, _, mut displays) = setup();
        let clock = sup.declare(window_def("clock", WindowMode::Lazy)).unwrap();
        start_at(&mut sup, &mut displays, clock, 2);
        assert_eq!(sup.entry(clock).unwrap().attempts, 1);
        assert!(sup.entry(clock).unwrap().order > 0);

        sup.stop(clock).unwrap();
        assert_eq!(sup.entry(clock).unwrap().attempts, 0);
        assert_eq!(sup.entry(clock).unwrap().order, 0);
    }

    #[test]
    fn test_teardown_escalates_until_exit() {
        let (mut sup, log, mut displays) = setup();
        let a = sup.declare(window_def("a", WindowMode::Keepalive)).unwrap();
        let b = sup.declare(window_def("b", WindowMode::Keepalive)).unwrap();
        start_at(&mut sup, &mut displays, a, 1);
        start_at(&mut sup, &mut displays, b, 2);
        log.exit_on(Signal::Kill);

        sup.teardown(&mut displays, Duration::from_millis(1));
        assert_eq!(sup.active_count(), 0);
        assert!(log.signals().iter().any(|(_, s)| *s == Signal::Kill));
    }

    // ========================================================================
    // Placement and windows
    // ========================================================================

    #[test]
    fn test_frame_window_prefers_highest_order() {
        let (mut sup, _, mut displays) = setup();
        let a = sup.declare(window_def("a", WindowMode::Lazy)).unwrap();
        let b = sup.declare(window_def("b", WindowMode::Lazy)).unwrap();
        start_at(&mut sup, &mut displays, a, 1);
        start_at(&mut sup, &mut displays, b, 1);

        let pid_a = sup.entry(a).unwrap().pgid;
        let pid_b = sup.entry(b).unwrap().pgid;
        sup.match_window(0, &WindowInfo { handle: 10, pid: pid_a, ..WindowInfo::default() });
        sup.match_window(0, &WindowInfo { handle: 20, pid: pid_b, ..WindowInfo::default() });
        sup.match_window(0, &WindowInfo { handle: 21, pid: pid_b, ..WindowInfo::default() });

        assert_eq!(sup.frame_window(0, 1), Some(21));
        sup.raise(a, 1);
        assert_eq!(sup.frame_window(0, 1), Some(10));
        assert_eq!(sup.frame_window(0, 2), None);
    }

    #[test]
    fn test_raise_front_most_keeps_order() {
        let (mut sup, _, mut displays) = setup();
        let a = sup.declare(window_def("a", WindowMode::Lazy)).unwrap();
        start_at(&mut sup, &mut displays, a, 1);
        let before = sup.entry(a).unwrap().order;
        sup.raise(a, 1);
        sup.raise(a, 1);
        assert_eq!(sup.entry(a).unwrap().order, before);
    }

    #[test]
    fn test_match_resets_attempts_and_discard_removes() {
        let (mut sup, _, mut displays) = setup();
        let a = sup.declare(window_def("a", WindowMode::Lazy)).unwrap();
        start_at(&mut sup, &mut displays, a, 1);
        let pid = sup.entry(a).unwrap().pgid;

        let matched = sup.match_window(0, &WindowInfo { handle: 7, pid, ..WindowInfo::default() });
        assert_eq!(matched, Some((a, MatchStrategy::Pid)));
        assert_eq!(sup.entry(a).unwrap().attempts, 0);

        assert_eq!(sup.discard_window(0, 7), Some(a));
        assert!(sup.entry(a).unwrap().windows.is_empty());
        assert_eq!(sup.discard_window(0, 7), None);
    }

    #[test]
    fn test_repatriated_entries_are_not_controlled() {
        let (mut sup, log, mut displays) = setup();
        let id = sup.repatriate(1, 3, 0x0060_0003);

        assert_eq!(sup.frame_window(1, 3), Some(0x0060_0003));
        assert!(matches!(sup.stop(id), Err(SupervisorError::NotManaged(_))));
        assert!(matches!(
            sup.start(id, &StartOptions::default(), &mut displays),
            Err(SupervisorError::NotManaged(_))
        ));
        assert!(log.signals().is_empty());

        sup.discard_window(1, 0x0060_0003);
        assert_eq!(sup.entry(id).unwrap().lifecycle, Lifecycle::Stopped);
        assert_eq!(sup.frame_window(1, 3), None);
    }

    #[test]
    fn test_discard_restores() {
        let (mut sup, _, mut displays) = setup();
        let play = sup.declare(command_def("play", true)).unwrap();
        let options = StartOptions { restore_layout: true, ..StartOptions::default() };
        sup.start(play, &options, &mut displays).unwrap();

        sup.discard_restores(0);
        assert!(!sup.entry(play).unwrap().restore_layout);
    }
}
