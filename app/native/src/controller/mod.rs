//! The reconciliation controller.
//!
//! [`Controller`] owns every piece of mutable state: variables, displays and
//! layouts, the entry catalog and the compiled script. It is driven by a
//! single task (see [`crate::actor`]) so all mutation is sequential.
//!
//! # Triggers
//!
//! A reconcile run is requested (not performed) by:
//! - a variable write that changes a value
//! - a reap that stopped at least one entry
//! - a window matched to an automation window
//!
//! The owning loop calls [`Controller::run_if_pending`] after each event, so a
//! burst of triggers collapses into a single run.

mod reconcile;
mod views;

use std::collections::HashMap;
use std::time::Duration;

pub use reconcile::{DisplayStatus, MAX_START_ATTEMPTS, ReconcileError, RunReport};
use serde::Deserialize;
use thiserror::Error;
pub use views::{CommandView, DisplayLayouts, DisplayView, Listing, StatusView, WindowView};

use crate::automation::{CompileContext, CompileError, Script};
use crate::platform::ProcessLauncher;
use crate::state::{DisplayId, DisplayTable, FrameId, Layout, LayoutId, WindowHandle};
use crate::supervisor::{
    EntryDefinition, EntryId, EntryKind, StartOptions, Supervisor, SupervisorError, WindowInfo,
    WindowMode,
};
use crate::variables::{SetOutcome, VariableError, VariableStore};
use crate::wm::frames::parse_frame_windows;
use crate::wm::{WindowManager, WmError};

/// Default wait between teardown rounds.
const TEARDOWN_POLL: Duration = Duration::from_millis(100);

/// Errors returned by controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("no command or window named '{0}'")]
    UnknownEntry(String),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    WindowManager(#[from] WmError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Parameters for starting an explicit command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartRequest {
    /// Argument values by name, matched case-insensitively.
    pub arguments: HashMap<String, String>,
    /// Display name or index. Unknown references fall back to display 0.
    pub display: Option<String>,
    /// Frame focused before spawning.
    pub frame: Option<FrameId>,
    /// Collapse the display to one frame until the command exits.
    pub fullscreen: bool,
}

/// Owned controller state.
pub struct Controller {
    variables: VariableStore,
    displays: DisplayTable,
    supervisor: Supervisor,
    script: Script,
    wm: Box<dyn WindowManager>,
    ready: bool,
    pending: bool,
    teardown_poll: Duration,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("displays", &self.displays)
            .field("variables", &self.variables)
            .field("operations", &self.script.len())
            .field("ready", &self.ready)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Controller {
    #[must_use]
    pub fn new(wm: Box<dyn WindowManager>, launcher: Box<dyn ProcessLauncher>) -> Self {
        Self {
            variables: VariableStore::new(),
            displays: DisplayTable::new(),
            supervisor: Supervisor::new(launcher),
            script: Script::new(),
            wm,
            ready: false,
            pending: false,
            teardown_poll: TEARDOWN_POLL,
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    pub fn add_display(&mut self, name: &str, identifier: &str, repatriate: bool) -> DisplayId {
        let id = self.displays.add_display(name, identifier);
        if let Some(display) = self.displays.display_mut(id) {
            display.repatriate = repatriate;
        }
        id
    }

    pub fn add_layout(&mut self, layout: Layout, display: DisplayId) -> LayoutId {
        self.displays.add_layout(layout, display)
    }

    pub fn set_default_layout(&mut self, display: DisplayId, layout: LayoutId) {
        self.displays.set_default_layout(display, layout);
    }

    /// # Errors
    ///
    /// Returns [`VariableError`] for malformed or duplicate names.
    pub fn declare_variable(&mut self, name: &str, value: &str) -> Result<(), VariableError> {
        self.variables.declare(name, value)
    }

    /// Registers an automation window or explicit command.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Duplicate`] for a name already in use.
    pub fn declare_entry(&mut self, def: EntryDefinition) -> Result<EntryId, SupervisorError> {
        self.supervisor.declare(def)
    }

    /// Compiles one automation line against the declarations made so far.
    ///
    /// # Errors
    ///
    /// Returns the line's [`CompileError`].
    pub fn compile_automation_line(&mut self, line: &str) -> Result<(), CompileError> {
        let ctx = CompileContext {
            variables: &self.variables,
            displays: &self.displays,
            windows: &self.supervisor,
        };
        self.script.compile_line(line, &ctx)
    }

    pub const fn set_teardown_poll(&mut self, poll: Duration) { self.teardown_poll = poll; }

    #[must_use]
    pub const fn displays(&self) -> &DisplayTable { &self.displays }

    #[must_use]
    pub const fn variables(&self) -> &VariableStore { &self.variables }

    #[must_use]
    pub const fn supervisor(&self) -> &Supervisor { &self.supervisor }

    #[must_use]
    pub const fn script(&self) -> &Script { &self.script }

    #[must_use]
    pub const fn is_ready(&self) -> bool { self.ready }

    // ========================================================================
    // Startup and shutdown
    // ========================================================================

    /// Brings the controller up.
    ///
    /// Adopts live windows on displays flagged for repatriation, records the
    /// windows already present, starts keepalive windows and runs the script
    /// once. Returns the window handles present on each display before any
    /// entry was started; window watchers start from that baseline.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the first run fails to activate a layout.
    pub fn cold_start(&mut self) -> Result<Vec<Vec<WindowHandle>>, ReconcileError> {
        for id in 0..self.displays.displays().len() {
            self.repatriate(id);
        }

        let baseline = self
            .displays
            .displays()
            .iter()
            .map(|target| match self.wm.list_windows(target) {
                Ok(windows) => windows.into_iter().map(|w| w.handle).collect(),
                Err(err) => {
                    tracing::warn!(display = %target.name, error = %err, "could not list existing windows");
                    Vec::new()
                }
            })
            .collect();

        let keepalive: Vec<EntryId> = self
            .supervisor
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind() == EntryKind::Window { mode: WindowMode::Keepalive })
            .map(|(id, _)| id)
            .collect();

        for id in keepalive {
            let Some(display) = self.supervisor.entry(id).map(|e| e.def.home_display) else { continue };
            let options = StartOptions { display, ..StartOptions::default() };
            if let Err(err) = self.supervisor.start(id, &options, &mut self.displays) {
                tracing::error!(error = %err, "failed to start keepalive window");
            }
        }

        self.ready = true;
        tracing::info!(
            displays = self.displays.displays().len(),
            entries = self.supervisor.entries().len(),
            operations = self.script.len(),
            "cold start complete"
        );
        self.run()?;
        Ok(baseline)
    }

    fn repatriate(&mut self, id: DisplayId) {
        let Some(display) = self.displays.display_mut(id) else { return };
        if !std::mem::take(&mut display.repatriate) {
            return;
        }

        let Some(target) = self.displays.display(id) else { return };
        match self.wm.fetch_live_layout(target) {
            Ok(dump) => {
                for (frame, handle) in parse_frame_windows(&dump) {
                    self.supervisor.repatriate(id, frame, handle);
                }
            }
            Err(err) => tracing::warn!(display = %target.name, error = %err, "could not read live layout"),
        }
    }

    /// Stops every managed process and waits for them to exit.
    pub fn shutdown(&mut self) {
        self.ready = false;
        self.pending = false;
        self.supervisor.teardown(&mut self.displays, self.teardown_poll);
        tracing::info!("all managed processes stopped");
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Writes a variable; a changed value requests a run.
    pub fn set_variable(&mut self, name: &str, value: &str) -> SetOutcome {
        let outcome = self.variables.set(name, value);
        match outcome {
            SetOutcome::Changed => {
                tracing::debug!(name, value, "variable changed");
                self.pending = true;
            }
            SetOutcome::Unchanged => tracing::trace!(name, "variable unchanged"),
            SetOutcome::Unknown => tracing::warn!(name, "write to unknown variable ignored"),
        }
        outcome
    }

    /// Collects exited children. Returns how many entries stopped.
    pub fn child_exited(&mut self) -> usize {
        let reaped = self.supervisor.reap(&mut self.displays);

        for exit in reaped.iter().filter(|r| r.rollback) {
            let Some(target) = self.displays.display(exit.display) else { continue };
            if let Err(err) = self.wm.rollback_fullscreen(target) {
                tracing::warn!(display = %target.name, error = %err, "failed to leave fullscreen");
            }
        }

        if !reaped.is_empty() {
            self.pending = true;
        }
        reaped.len()
    }

    /// Records a newly created window.
    pub fn window_created(&mut self, display: DisplayId, window: &WindowInfo) -> Option<EntryId> {
        let known = self
            .supervisor
            .entries()
            .iter()
            .any(|e| e.display == display && e.windows.contains(&window.handle));
        if known {
            return None;
        }

        let (id, _) = self.supervisor.match_window(display, window)?;
        if self.supervisor.entry(id).is_some_and(|e| !e.kind().is_command()) {
            self.pending = true;
        }
        Some(id)
    }

    /// Forgets a destroyed window.
    ///
    /// A repatriated entry losing its last window frees its frame, which
    /// requests a run.
    pub fn window_destroyed(&mut self, display: DisplayId, handle: WindowHandle) -> Option<EntryId> {
        let id = self.supervisor.discard_window(display, handle)?;
        if self.supervisor.entry(id).is_some_and(|e| e.kind().is_repatriated() && e.windows.is_empty()) {
            self.pending = true;
        }
        Some(id)
    }

    // ========================================================================
    // API operations
    // ========================================================================

    fn resolve_display(&self, reference: Option<&str>) -> DisplayId {
        let Some(reference) = reference else { return 0 };
        self.displays.resolve_display(reference).unwrap_or_else(|| {
            tracing::warn!(display = reference, "unknown display, using display 0");
            0
        })
    }

    /// Starts an explicit command.
    ///
    /// # Errors
    ///
    /// Fails for unknown commands, invalid enum arguments, window manager
    /// errors while preparing the display, and spawn failures.
    pub fn start_command(&mut self, name: &str, request: &StartRequest) -> Result<(), ControllerError> {
        let id = self.supervisor.find_command(name).ok_or_else(|| ControllerError::UnknownCommand(name.to_string()))?;
        let provided: Vec<(String, String)> =
            request.arguments.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let arguments = self.supervisor.prepare_arguments(id, &provided)?;

        let owns_windows = self.supervisor.entry(id).is_some_and(|e| e.kind().owns_windows());
        let display = self.resolve_display(request.display.as_deref());
        let target = self.displays.display(display).ok_or_else(|| ControllerError::UnknownEntry(name.to_string()))?;

        let mut fullscreen = false;
        if owns_windows {
            if let Some(frame) = request.frame {
                self.wm.select_frame(target, frame)?;
            }
            if request.fullscreen {
                self.wm.enter_fullscreen(target)?;
                fullscreen = true;
            }
        }

        let options = StartOptions {
            display,
            frame: request.frame.filter(|_| owns_windows),
            arguments,
            restore_layout: fullscreen,
        };

        if let Err(err) = self.supervisor.start(id, &options, &mut self.displays) {
            if fullscreen && let Some(target) = self.displays.display(display) {
                if let Err(rollback) = self.wm.rollback_fullscreen(target) {
                    tracing::warn!(display = %target.name, error = %rollback, "failed to leave fullscreen");
                }
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Stops a command or automation window by name.
    ///
    /// # Errors
    ///
    /// Fails for unknown names and repatriated entries.
    pub fn stop(&mut self, name: &str) -> Result<(), ControllerError> {
        let id = self
            .supervisor
            .find_command(name)
            .or_else(|| self.supervisor.find_window(name))
            .ok_or_else(|| ControllerError::UnknownEntry(name.to_string()))?;
        self.supervisor.stop(id)?;
        Ok(())
    }

    /// Returns every display to its default layout.
    ///
    /// Pending fullscreen rollbacks are dropped and all window-owning entries
    /// are stopped; their reaps trigger the script again.
    ///
    /// # Errors
    ///
    /// Returns the first layout activation failure.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        tracing::info!("resetting displays");
        let active: Vec<EntryId> = self
            .supervisor
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_active() && e.kind().owns_windows() && !e.kind().is_repatriated())
            .map(|(id, _)| id)
            .collect();

        for display in 0..self.displays.displays().len() {
            self.supervisor.discard_restores(display);
        }
        for id in active {
            self.supervisor.stop(id)?;
        }

        let defaults: Vec<(DisplayId, LayoutId)> = self
            .displays
            .displays()
            .iter()
            .filter_map(|d| d.default_layout.map(|l| (d.id, l)))
            .collect();
        for (display, layout) in defaults {
            self.activate(display, layout)?;
        }
        Ok(())
    }

    /// Commands and windows with their argument specs and state.
    #[must_use]
    pub fn list(&self) -> Listing {
        let mut listing = Listing::default();

        for entry in self.supervisor.entries() {
            match entry.kind() {
                EntryKind::Command { windows } => listing.commands.push(CommandView {
                    name: entry.name().to_string(),
                    description: entry.def.description.clone(),
                    windows,
                    arguments: entry.def.arguments.clone(),
                    lifecycle: entry.lifecycle,
                }),
                EntryKind::Window { mode } if mode != WindowMode::Repatriated => {
                    listing.windows.push(WindowView {
                        name: entry.name().to_string(),
                        mode,
                        lifecycle: entry.lifecycle,
                        display: self.display_name(entry.display),
                        frame: entry.frame,
                    });
                }
                EntryKind::Window { .. } => {}
            }
        }

        listing
    }

    /// Active layout per display and the names of running entries.
    #[must_use]
    pub fn status(&self) -> StatusView {
        let displays = self
            .displays
            .displays()
            .iter()
            .map(|d| DisplayView {
                name: d.name.clone(),
                identifier: d.identifier.clone(),
                layout: self.current_layout(d.id).and_then(|l| self.layout_name(l)),
                busy: d.is_busy(),
            })
            .collect();

        StatusView { displays, running: self.supervisor.running_names() }
    }

    /// Layout names declared for each display.
    #[must_use]
    pub fn layouts(&self) -> Vec<DisplayLayouts> {
        self.displays
            .displays()
            .iter()
            .map(|d| DisplayLayouts {
                display: d.name.clone(),
                layouts: self.displays.layouts_for(d.id).map(|(_, l)| l.name.clone()).collect(),
                default_layout: d.default_layout.and_then(|l| self.layout_name(l)),
                current_layout: d.current_layout.and_then(|l| self.layout_name(l)),
            })
            .collect()
    }

    /// The active layout of a display, or its default before any activation.
    #[must_use]
    pub fn current_layout(&self, display: DisplayId) -> Option<LayoutId> {
        self.displays.display(display).and_then(|d| d.current_layout.or(d.default_layout))
    }

    fn layout_name(&self, layout: LayoutId) -> Option<String> {
        self.displays.layout(layout).map(|l| l.name.clone())
    }

    fn display_name(&self, display: DisplayId) -> String {
        self.displays.display(display).map(|d| d.name.clone()).unwrap_or_default()
    }
}
