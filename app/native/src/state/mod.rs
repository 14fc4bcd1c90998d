//! Display and layout state.
//!
//! The [`DisplayTable`] owns every display and every layout declared in the
//! configuration. Layouts never change after load; displays carry the mutable
//! busy counter and the currently active layout.

mod types;

pub use types::{
    Display, DisplayId, Frame, FrameId, Layout, LayoutId, Rect, ScreenGeometry, WindowHandle,
};

/// Owned collection of displays and their layouts.
#[derive(Debug, Clone, Default)]
pub struct DisplayTable {
    displays: Vec<Display>,
    layouts: Vec<Layout>,
}

impl DisplayTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self { Self { displays: Vec::new(), layouts: Vec::new() } }

    /// Adds a display and returns its id.
    pub fn add_display(&mut self, name: &str, identifier: &str) -> DisplayId {
        let id = self.displays.len();
        self.displays.push(Display::new(id, name, identifier));
        id
    }

    /// Adds a layout to `display` and returns its id.
    pub fn add_layout(&mut self, mut layout: Layout, display: DisplayId) -> LayoutId {
        let id = self.layouts.len();
        layout.display = display;
        self.layouts.push(layout);
        id
    }

    #[must_use]
    pub fn displays(&self) -> &[Display] { &self.displays }

    #[must_use]
    pub fn layouts(&self) -> &[Layout] { &self.layouts }

    #[must_use]
    pub fn display(&self, id: DisplayId) -> Option<&Display> { self.displays.get(id) }

    pub fn display_mut(&mut self, id: DisplayId) -> Option<&mut Display> {
        self.displays.get_mut(id)
    }

    #[must_use]
    pub fn layout(&self, id: LayoutId) -> Option<&Layout> { self.layouts.get(id) }

    /// Finds a display by its configured name.
    #[must_use]
    pub fn display_by_name(&self, name: &str) -> Option<DisplayId> {
        self.displays.iter().position(|d| d.name == name)
    }

    /// Resolves a display reference from the script or the control API.
    ///
    /// A reference is a display name or a numeric display index. Returns
    /// `None` when neither matches; callers decide on the fallback.
    #[must_use]
    pub fn resolve_display(&self, reference: &str) -> Option<DisplayId> {
        let reference = reference.trim();
        self.display_by_name(reference).or_else(|| {
            reference.parse::<DisplayId>().ok().filter(|id| *id < self.displays.len())
        })
    }

    /// Finds a layout by name on a given display.
    #[must_use]
    pub fn layout_by_name(&self, display: DisplayId, name: &str) -> Option<LayoutId> {
        self.layouts.iter().position(|l| l.display == display && l.name == name)
    }

    /// Layouts declared for `display`, in declaration order.
    pub fn layouts_for(&self, display: DisplayId) -> impl Iterator<Item = (LayoutId, &Layout)> {
        self.layouts.iter().enumerate().filter(move |(_, l)| l.display == display)
    }

    /// Sets the default layout of a display.
    pub fn set_default_layout(&mut self, display: DisplayId, layout: LayoutId) {
        if let Some(d) = self.displays.get_mut(display) {
            d.default_layout = Some(layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use smallvec::SmallVec;

    use super::*;

    fn layout(name: &str) -> Layout {
        Layout { name: name.to_string(), display: 0, frames: SmallVec::new() }
    }

    fn table() -> DisplayTable {
        let mut table = DisplayTable::new();
        let main = table.add_display("main", ":0");
        let side = table.add_display("side", ":1");
        table.add_layout(layout("full"), main);
        table.add_layout(layout("split"), main);
        table.add_layout(layout("full"), side);
        table
    }

    #[test]
    fn test_resolve_display_by_name() {
        let table = table();
        assert_eq!(table.resolve_display("main"), Some(0));
        assert_eq!(table.resolve_display("side"), Some(1));
    }

    #[test]
    fn test_resolve_display_by_index() {
        let table = table();
        assert_eq!(table.resolve_display("1"), Some(1));
        assert_eq!(table.resolve_display("2"), None);
    }

    #[test]
    fn test_resolve_unknown_display() {
        assert_eq!(table().resolve_display("ceiling"), None);
    }

    #[test]
    fn test_layout_names_are_scoped_per_display() {
        let table = table();
        assert_eq!(table.layout_by_name(0, "full"), Some(0));
        assert_eq!(table.layout_by_name(1, "full"), Some(2));
        assert_eq!(table.layout_by_name(1, "split"), None);
    }

    #[test]
    fn test_add_layout_rebinds_display() {
        let mut table = table();
        let id = table.add_layout(layout("stage"), 1);
        assert_eq!(table.layout(id).map(|l| l.display), Some(1));
        assert_eq!(table.layouts_for(1).count(), 2);
    }

    #[test]
    fn test_set_default_layout() {
        let mut table = table();
        table.set_default_layout(0, 1);
        assert_eq!(table.display(0).and_then(|d| d.default_layout), Some(1));
        table.set_default_layout(9, 0);
    }
}
