//! Applying a [`Plan`] to the world.
//!
//! The interpreter decides what should be on screen; this module makes it so
//! by starting, stopping and raising entries and then activating layouts on
//! every display that is free to change.

use serde::Serialize;
use thiserror::Error;

use super::Controller;
use crate::automation::{Plan, Termination, execute};
use crate::state::{DisplayId, LayoutId};
use crate::supervisor::{EntryId, EntryKind, Lifecycle, StartOptions, WindowMode};
use crate::wm::WmError;

/// Starts of one entry allowed without it ever producing a window.
pub const MAX_START_ATTEMPTS: u32 = 3;

/// Errors that abort the apply phase.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The window manager refused a layout.
    #[error("failed to activate layout '{layout}' on display '{display}': {source}")]
    Activation {
        display: String,
        layout: String,
        #[source]
        source: WmError,
    },
}

/// Per-display status for one apply phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    /// Free to change.
    Ready,
    /// Owned by a foreground command.
    Busy,
    /// Waiting for an assigned window to appear or an old one to go away.
    Waiting,
}

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started: Vec<EntryId>,
    pub stopped: Vec<EntryId>,
    pub raised: Vec<EntryId>,
    pub activated: Vec<(DisplayId, LayoutId)>,
    pub waiting: Vec<DisplayId>,
}

impl RunReport {
    /// Whether the run changed any process.
    #[must_use]
    pub fn changed_processes(&self) -> bool { !self.started.is_empty() || !self.stopped.is_empty() }
}

impl Controller {
    /// Runs the script and applies the result.
    ///
    /// Does nothing before cold start completes or when no script is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when a layout could not be activated; the
    /// remaining displays are left untouched.
    pub fn run(&mut self) -> Result<RunReport, ReconcileError> {
        self.pending = false;

        if !self.ready || self.script.is_empty() {
            tracing::trace!(ready = self.ready, "reconcile skipped");
            return Ok(RunReport::default());
        }

        let plan = execute(self.script.operations(), &self.variables, &self.displays);
        if plan.termination == Termination::Implicit {
            tracing::debug!("automation ran off the end, implicit done");
        }

        let report = self.apply(&plan)?;
        tracing::debug!(
            started = report.started.len(),
            stopped = report.stopped.len(),
            raised = report.raised.len(),
            activated = report.activated.len(),
            waiting = report.waiting.len(),
            "reconciled"
        );
        Ok(report)
    }

    /// Runs when a trigger arrived since the last run.
    ///
    /// # Errors
    ///
    /// See [`Controller::run`].
    pub fn run_if_pending(&mut self) -> Result<Option<RunReport>, ReconcileError> {
        if self.pending { self.run().map(Some) } else { Ok(None) }
    }

    fn apply(&mut self, plan: &Plan) -> Result<RunReport, ReconcileError> {
        let mut report = RunReport::default();
        let mut status: Vec<DisplayStatus> = self
            .displays
            .displays()
            .iter()
            .map(|d| if d.is_busy() { DisplayStatus::Busy } else { DisplayStatus::Ready })
            .collect();

        for assignment in &plan.assignments {
            let display = assignment.display;
            if status.get(display) == Some(&DisplayStatus::Busy) {
                continue;
            }
            let Some(entry) = self.supervisor.entry(assignment.window) else { continue };
            let name = entry.name().to_string();
            let (lifecycle, attempts, current, windowless) =
                (entry.lifecycle, entry.attempts, entry.display, entry.windows.is_empty());

            let waiting = match lifecycle {
                Lifecycle::Stopped if attempts >= MAX_START_ATTEMPTS => {
                    tracing::warn!(entry = %name, attempts, "start attempts exhausted, not starting");
                    false
                }
                Lifecycle::Stopped => {
                    let options =
                        StartOptions { display, frame: Some(assignment.frame), ..StartOptions::default() };
                    match self.supervisor.start(assignment.window, &options, &mut self.displays) {
                        Ok(()) => {
                            report.started.push(assignment.window);
                            true
                        }
                        Err(err) => {
                            tracing::error!(entry = %name, error = %err, "failed to start assigned window");
                            false
                        }
                    }
                }
                Lifecycle::Terminated => true,
                Lifecycle::Running if current != display => {
                    tracing::debug!(entry = %name, from = current, to = assignment.display, "moving window between displays");
                    if self.supervisor.stop(assignment.window).is_ok() {
                        report.stopped.push(assignment.window);
                    }
                    true
                }
                Lifecycle::Running if windowless => true,
                Lifecycle::Running => {
                    self.supervisor.raise(assignment.window, assignment.frame);
                    report.raised.push(assignment.window);
                    false
                }
            };

            if waiting && let Some(slot) = status.get_mut(display) {
                *slot = DisplayStatus::Waiting;
            }
        }

        self.stop_unassigned_ondemand(plan, &status, &mut report);

        for (display, desired) in plan.layouts.iter().enumerate() {
            let Some(layout) = *desired else { continue };
            if status.get(display) != Some(&DisplayStatus::Ready) {
                continue;
            }
            self.activate(display, layout)?;
            report.activated.push((display, layout));
        }

        report.waiting = status
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == DisplayStatus::Waiting)
            .map(|(d, _)| d)
            .collect();
        Ok(report)
    }

    fn stop_unassigned_ondemand(&mut self, plan: &Plan, status: &[DisplayStatus], report: &mut RunReport) {
        let idle: Vec<EntryId> = self
            .supervisor
            .entries()
            .iter()
            .enumerate()
            .filter(|(id, e)| {
                e.kind() == EntryKind::Window { mode: WindowMode::Ondemand }
                    && e.is_running()
                    && status.get(e.display) != Some(&DisplayStatus::Busy)
                    && !plan.assignments.iter().any(|a| a.window == *id)
            })
            .map(|(id, _)| id)
            .collect();

        for id in idle {
            if self.supervisor.stop(id).is_ok() {
                report.stopped.push(id);
            }
        }
    }

    /// Activates a layout, filling each frame with its front-most window.
    pub(super) fn activate(&mut self, display: DisplayId, layout: LayoutId) -> Result<(), ReconcileError> {
        let (Some(target), Some(frames)) = (self.displays.display(display), self.displays.layout(layout))
        else {
            return Ok(());
        };

        let supervisor = &self.supervisor;
        let window_for = |frame| supervisor.frame_window(display, frame);
        self.wm.activate_layout(target, frames, &window_for).map_err(|source| {
            tracing::error!(display = %target.name, layout = %frames.name, error = %source, "layout activation failed");
            ReconcileError::Activation { display: target.name.clone(), layout: frames.name.clone(), source }
        })?;

        if let Some(target) = self.displays.display_mut(display) {
            target.current_layout = Some(layout);
        }
        Ok(())
    }
}
