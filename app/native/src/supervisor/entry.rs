//! Managed entry types.
//!
//! A [`ManagedEntry`] is the controller's handle on one spawnable program:
//! either an explicit command started through the control API or an
//! automation window placed by the script.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::state::{DisplayId, FrameId, WindowHandle};

/// Index of an entry in the supervisor's arena. Stable for the process lifetime.
pub type EntryId = usize;

/// Lifecycle of a managed process.
///
/// Transitions only along `Stopped → Running → Terminated → Stopped`, plus
/// `Running → Stopped` when the process exits on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Stopped,
    Running,
    Terminated,
}

/// How the script manages an automation window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Started when assigned, stopped again when no longer assigned.
    Ondemand,
    /// Started at startup and kept running.
    Keepalive,
    /// Started when first assigned, then left running.
    #[default]
    Lazy,
    /// Adopted pre-existing window; never started or stopped.
    #[serde(skip_deserializing)]
    #[schemars(skip)]
    Repatriated,
}

/// Entry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum EntryKind {
    /// Started on demand through the control API.
    Command { windows: bool },
    /// Placed into frames by the automation script.
    Window { mode: WindowMode },
}

impl EntryKind {
    /// Whether processes of this kind produce windows.
    #[must_use]
    pub const fn owns_windows(self) -> bool {
        match self {
            Self::Command { windows } => windows,
            Self::Window { .. } => true,
        }
    }

    #[must_use]
    pub const fn is_command(self) -> bool { matches!(self, Self::Command { .. }) }

    #[must_use]
    pub const fn is_repatriated(self) -> bool {
        matches!(self, Self::Window { mode: WindowMode::Repatriated })
    }
}

/// Argument value type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    #[default]
    String,
    Enum,
}

/// One named argument of an explicit command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub kind: ArgumentKind,
    /// Allowed values for enum arguments, in their canonical case.
    pub options: Vec<String>,
    /// Free-form hint shown to clients for string arguments.
    pub hint: Option<String>,
}

impl ArgumentSpec {
    /// Checks an enum value case-insensitively and returns the canonical option.
    ///
    /// String arguments accept any value unchanged.
    #[must_use]
    pub fn canonicalize(&self, value: &str) -> Option<String> {
        match self.kind {
            ArgumentKind::String => Some(value.to_string()),
            ArgumentKind::Enum => {
                self.options.iter().find(|o| o.eq_ignore_ascii_case(value)).cloned()
            }
        }
    }
}

/// Correlation filters used to recognize an entry's windows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowFilters {
    pub title: Option<String>,
    pub app_name: Option<String>,
    pub class: Option<String>,
}

impl WindowFilters {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.app_name.is_none() && self.class.is_none()
    }
}

/// Declared shape of an entry, fixed at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDefinition {
    pub name: String,
    pub kind: EntryKind,
    pub description: Option<String>,
    /// Whitespace-separated command line with `%argname` placeholders.
    pub command: String,
    pub directory: Option<std::path::PathBuf>,
    pub arguments: Vec<ArgumentSpec>,
    pub filters: WindowFilters,
    /// Display used when the entry is started without an assignment.
    pub home_display: DisplayId,
}

/// One managed entry: definition plus runtime state.
#[derive(Debug, Clone)]
pub struct ManagedEntry {
    pub def: EntryDefinition,
    pub lifecycle: Lifecycle,
    /// Process group id (the leader's pid) while not stopped.
    pub pgid: Option<u32>,
    /// Stacking rank, 0 while inactive.
    pub order: u32,
    pub display: DisplayId,
    pub frame: Option<FrameId>,
    pub windows: SmallVec<[WindowHandle; 2]>,
    pub attempts: u32,
    /// Roll the display back out of fullscreen when this process exits.
    pub restore_layout: bool,
    /// Whether this entry currently holds a busy lock on `display`.
    pub holds_lock: bool,
}

impl ManagedEntry {
    #[must_use]
    pub fn new(def: EntryDefinition) -> Self {
        let display = def.home_display;
        Self {
            def,
            lifecycle: Lifecycle::Stopped,
            pgid: None,
            order: 0,
            display,
            frame: None,
            windows: SmallVec::new(),
            attempts: 0,
            restore_layout: false,
            holds_lock: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str { &self.def.name }

    #[must_use]
    pub const fn kind(&self) -> EntryKind { self.def.kind }

    #[must_use]
    pub fn is_running(&self) -> bool { self.lifecycle == Lifecycle::Running }

    #[must_use]
    pub fn is_active(&self) -> bool { self.lifecycle != Lifecycle::Stopped }
}

/// Substitutes `%argname` placeholders in every argument token.
///
/// Matching is case-insensitive and by prefix, so `%file.txt` with an argument
/// `file` becomes `<value>.txt`. The program token itself is never rewritten.
#[must_use]
pub fn substitute(token: &str, names: &[ArgumentSpec], values: &[String]) -> String {
    if !token.contains('%') {
        return token.to_string();
    }

    let mut out = String::with_capacity(token.len());
    let mut rest = token;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let matched = names.iter().zip(values).find(|(spec, _)| {
            after.len() >= spec.name.len()
                && after.is_char_boundary(spec.name.len())
                && after[..spec.name.len()].eq_ignore_ascii_case(&spec.name)
        });

        if let Some((spec, value)) = matched {
            out.push_str(value);
            rest = &after[spec.name.len()..];
        } else {
            out.push('%');
            rest = after;
        }
    }

    out.push_str(rest);
    out
}
