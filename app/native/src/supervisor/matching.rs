//! Window-to-entry correlation.
//!
//! When the window manager reports a new window, the supervisor has to guess
//! which running entry produced it. Strategies are tried in order and the
//! first one that singles out exactly one candidate wins:
//!
//! 1. **Pid**: the window's pid is an entry's process group leader. If no
//!    entry matches, retry with the parent pid, walking up the process tree
//!    (wrappers that fork the real GUI process).
//! 2. **Title**: exact match against the entry's title filter.
//! 3. **App name**: exact match against the entry's app-name filter.
//! 4. **Class**: exact match against the entry's class filter.
//! 5. **Heuristic**: the only running window-owning entry without filters.

use serde::Serialize;

use super::entry::{EntryId, ManagedEntry};
use crate::state::{DisplayId, WindowHandle};

/// Upper bound on parent-chain steps, guards against cycles in stale data.
const MAX_PARENT_DEPTH: usize = 32;

/// Properties of a newly created window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub pid: Option<u32>,
    pub title: String,
    pub app_name: String,
    pub class: String,
}

/// Strategy that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchStrategy {
    Pid,
    Title,
    AppName,
    Class,
    Heuristic,
}

fn unique(mut candidates: impl Iterator<Item = EntryId>) -> Option<EntryId> {
    let first = candidates.next()?;
    if candidates.next().is_some() { None } else { Some(first) }
}

/// Finds the entry owning a window on `display`.
///
/// `parent_of` resolves the parent pid of a process.
pub fn find_owner(
    entries: &[ManagedEntry],
    display: DisplayId,
    window: &WindowInfo,
    mut parent_of: impl FnMut(u32) -> Option<u32>,
) -> Option<(EntryId, MatchStrategy)> {
    let candidates = || {
        entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.is_running() && e.display == display && !e.kind().is_repatriated())
    };

    if let Some(mut pid) = window.pid.filter(|p| *p > 0) {
        for _ in 0..MAX_PARENT_DEPTH {
            if let Some(id) = unique(candidates().filter(|(_, e)| e.pgid == Some(pid)).map(|(i, _)| i)) {
                return Some((id, MatchStrategy::Pid));
            }
            match parent_of(pid) {
                Some(parent) if parent > 1 && parent != pid => pid = parent,
                _ => break,
            }
        }
    }

    let by_filter = |strategy: MatchStrategy, value: &str| {
        unique(
            candidates()
                .filter(|(_, e)| {
                    let filter = match strategy {
                        MatchStrategy::Title => &e.def.filters.title,
                        MatchStrategy::AppName => &e.def.filters.app_name,
                        _ => &e.def.filters.class,
                    };
                    filter.as_deref() == Some(value)
                })
                .map(|(i, _)| i),
        )
        .map(|id| (id, strategy))
    };

    by_filter(MatchStrategy::Title, &window.title)
        .or_else(|| by_filter(MatchStrategy::AppName, &window.app_name))
        .or_else(|| by_filter(MatchStrategy::Class, &window.class))
        .or_else(|| {
            unique(
                candidates()
                    .filter(|(_, e)| e.kind().owns_windows() && e.def.filters.is_empty())
                    .map(|(i, _)| i),
            )
            .map(|id| (id, MatchStrategy::Heuristic))
        })
}
