//! Test doubles for the process launcher and the window manager.
//!
//! Both doubles share their state with a cloneable log so a test can keep
//! inspecting and steering them after handing ownership to the controller.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::platform::{LaunchSpec, ProcessLauncher, Signal};
use crate::state::{Display, DisplayId, FrameId, Layout, WindowHandle};
use crate::supervisor::WindowInfo;
use crate::wm::{WindowManager, WmError};

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> { state.lock().unwrap_or_else(PoisonError::into_inner) }

// ============================================================================
// Process launcher
// ============================================================================

#[derive(Default)]
struct LauncherState {
    next_pid: u32,
    launches: Vec<LaunchSpec>,
    signals: Vec<(u32, Signal)>,
    exited: Vec<u32>,
    fail_next: bool,
    exit_on: Option<Signal>,
    parents: HashMap<u32, u32>,
}

/// Launcher that records requests and never spawns anything.
pub struct FakeLauncher {
    state: Arc<Mutex<LauncherState>>,
}

/// Handle for inspecting a [`FakeLauncher`].
#[derive(Clone)]
pub struct LauncherLog {
    state: Arc<Mutex<LauncherState>>,
}

impl FakeLauncher {
    pub fn new() -> (Self, LauncherLog) {
        let state = Arc::new(Mutex::new(LauncherState { next_pid: 1000, ..LauncherState::default() }));
        (Self { state: Arc::clone(&state) }, LauncherLog { state })
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&mut self, spec: &LaunchSpec) -> io::Result<u32> {
        let mut state = lock(&self.state);
        if std::mem::take(&mut state.fail_next) {
            return Err(io::Error::other("simulated spawn failure"));
        }
        state.next_pid += 1;
        state.launches.push(spec.clone());
        Ok(state.next_pid)
    }

    fn signal(&mut self, pgid: u32, signal: Signal) -> io::Result<()> {
        let mut state = lock(&self.state);
        state.signals.push((pgid, signal));
        if state.exit_on == Some(signal) {
            state.exited.push(pgid);
        }
        Ok(())
    }

    fn reap(&mut self) -> Vec<u32> { std::mem::take(&mut lock(&self.state).exited) }

    fn parent_of(&mut self, pid: u32) -> Option<u32> { lock(&self.state).parents.get(&pid).copied() }
}

impl LauncherLog {
    pub fn launches(&self) -> Vec<LaunchSpec> { lock(&self.state).launches.clone() }

    pub fn signals(&self) -> Vec<(u32, Signal)> { lock(&self.state).signals.clone() }

    /// Pid handed out by the most recent launch.
    pub fn last_pid(&self) -> u32 { lock(&self.state).next_pid }

    /// Marks a process as exited; the next reap reports it.
    pub fn exit(&self, pid: u32) { lock(&self.state).exited.push(pid); }

    pub fn fail_next_launch(&self) { lock(&self.state).fail_next = true; }

    /// Makes processes exit as soon as they receive `signal`.
    pub fn exit_on(&self, signal: Signal) { lock(&self.state).exit_on = Some(signal); }

    pub fn set_parent(&self, child: u32, parent: u32) {
        lock(&self.state).parents.insert(child, parent);
    }
}

// ============================================================================
// Window manager
// ============================================================================

/// One recorded window manager request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmCall {
    Activate { display: DisplayId, layout: String, windows: Vec<(FrameId, Option<WindowHandle>)> },
    SelectFrame(DisplayId, FrameId),
    Fullscreen(DisplayId),
    Rollback(DisplayId),
    FetchLive(DisplayId),
    ListWindows(DisplayId),
}

#[derive(Default)]
struct WmState {
    calls: Vec<WmCall>,
    fail_activate: bool,
    live_layout: HashMap<DisplayId, String>,
    windows: HashMap<DisplayId, Vec<WindowInfo>>,
}

/// Window manager that records requests.
#[derive(Clone)]
pub struct FakeWm {
    state: Arc<Mutex<WmState>>,
}

/// Handle for inspecting a [`FakeWm`].
#[derive(Clone)]
pub struct WmLog {
    state: Arc<Mutex<WmState>>,
}

impl FakeWm {
    pub fn new() -> (Self, WmLog) {
        let state = Arc::new(Mutex::new(WmState::default()));
        (Self { state: Arc::clone(&state) }, WmLog { state })
    }
}

impl WindowManager for FakeWm {
    fn activate_layout(
        &mut self,
        display: &Display,
        layout: &Layout,
        window_for: &dyn Fn(FrameId) -> Option<WindowHandle>,
    ) -> Result<(), WmError> {
        let mut state = lock(&self.state);
        let windows = layout.frames.iter().map(|f| (f.id, window_for(f.id))).collect();
        state.calls.push(WmCall::Activate { display: display.id, layout: layout.name.clone(), windows });
        if state.fail_activate {
            return Err(WmError::CommandFailed {
                command: "sfrestore".to_string(),
                message: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn select_frame(&mut self, display: &Display, frame: FrameId) -> Result<(), WmError> {
        lock(&self.state).calls.push(WmCall::SelectFrame(display.id, frame));
        Ok(())
    }

    fn enter_fullscreen(&mut self, display: &Display) -> Result<(), WmError> {
        lock(&self.state).calls.push(WmCall::Fullscreen(display.id));
        Ok(())
    }

    fn rollback_fullscreen(&mut self, display: &Display) -> Result<(), WmError> {
        lock(&self.state).calls.push(WmCall::Rollback(display.id));
        Ok(())
    }

    fn fetch_live_layout(&mut self, display: &Display) -> Result<String, WmError> {
        let mut state = lock(&self.state);
        state.calls.push(WmCall::FetchLive(display.id));
        Ok(state.live_layout.get(&display.id).cloned().unwrap_or_default())
    }

    fn list_windows(&mut self, display: &Display) -> Result<Vec<WindowInfo>, WmError> {
        let mut state = lock(&self.state);
        state.calls.push(WmCall::ListWindows(display.id));
        Ok(state.windows.get(&display.id).cloned().unwrap_or_default())
    }
}

impl WmLog {
    pub fn calls(&self) -> Vec<WmCall> { lock(&self.state).calls.clone() }

    pub fn clear(&self) { lock(&self.state).calls.clear(); }

    /// Only the layout activations, in order.
    pub fn activations(&self) -> Vec<WmCall> {
        self.calls().into_iter().filter(|c| matches!(c, WmCall::Activate { .. })).collect()
    }

    pub fn fail_activate(&self, fail: bool) { lock(&self.state).fail_activate = fail; }

    pub fn set_live_layout(&self, display: DisplayId, dump: &str) {
        lock(&self.state).live_layout.insert(display, dump.to_string());
    }

    pub fn set_windows(&self, display: DisplayId, windows: Vec<WindowInfo>) {
        lock(&self.state).windows.insert(display, windows);
    }
}
