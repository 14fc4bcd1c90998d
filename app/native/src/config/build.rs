//! Turns a parsed [`RpcdConfig`] into a loaded [`Controller`].
//!
//! Order matters: displays, then layouts, then variables and entries, and
//! the automation script last, since script lines are checked against
//! everything declared before them.

use std::collections::HashSet;
use std::path::Path;

use smallvec::SmallVec;

use super::{ConfigError, RpcdConfig, WindowConfig};
use crate::automation::is_comment_or_blank;
use crate::controller::Controller;
use crate::platform::ProcessLauncher;
use crate::platform::path::expand_and_resolve;
use crate::state::{DisplayId, Frame, Layout, Rect, ScreenGeometry};
use crate::supervisor::{ArgumentKind, ArgumentSpec, EntryDefinition, EntryKind, WindowFilters};
use crate::wm::WindowManager;

/// Validates `config` and loads it into a new controller.
///
/// Relative working directories are resolved against `base_dir`, normally
/// the directory holding the configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for inconsistent declarations,
/// [`ConfigError::Variable`] or [`ConfigError::Entry`] for bad or duplicate
/// names, and [`ConfigError::Compile`] for the first script line that does
/// not compile.
pub fn build_controller(
    config: &RpcdConfig,
    base_dir: &Path,
    wm: Box<dyn WindowManager>,
    launcher: Box<dyn ProcessLauncher>,
) -> Result<Controller, ConfigError> {
    let mut controller = Controller::new(wm, launcher);

    load_displays(config, &mut controller)?;
    load_layouts(config, &mut controller)?;

    for variable in &config.variables {
        controller.declare_variable(&variable.name, &variable.value)?;
    }

    for window in &config.windows {
        let def = window_definition(window, base_dir, &controller)?;
        controller.declare_entry(def)?;
    }

    for command in &config.commands {
        if command.command.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("command '{}' has an empty command line", command.name)));
        }

        let mut arguments = Vec::with_capacity(command.arguments.len());
        for arg in &command.arguments {
            if arg.kind == ArgumentKind::Enum && arg.options.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "argument '{}' of command '{}' is an enum without options",
                    arg.name, command.name
                )));
            }
            arguments.push(ArgumentSpec {
                name: arg.name.clone(),
                kind: arg.kind,
                options: arg.options.clone(),
                hint: arg.hint.clone(),
            });
        }

        controller.declare_entry(EntryDefinition {
            name: command.name.clone(),
            kind: EntryKind::Command { windows: command.windows },
            description: command.description.clone(),
            command: command.command.clone(),
            directory: command.directory.as_deref().map(|d| expand_and_resolve(d, base_dir)),
            arguments,
            filters: WindowFilters::default(),
            home_display: 0,
        })?;
    }

    for (index, text) in config.automation.iter().enumerate() {
        if is_comment_or_blank(text) {
            continue;
        }
        controller
            .compile_automation_line(text)
            .map_err(|source| ConfigError::Compile { line: index + 1, text: text.clone(), source })?;
    }

    tracing::debug!(
        displays = controller.displays().displays().len(),
        layouts = controller.displays().layouts().len(),
        variables = controller.variables().len(),
        entries = controller.supervisor().entries().len(),
        operations = controller.script().len(),
        "configuration loaded"
    );

    Ok(controller)
}

fn load_displays(config: &RpcdConfig, controller: &mut Controller) -> Result<(), ConfigError> {
    if config.displays.is_empty() {
        return Err(ConfigError::Invalid("at least one display must be configured".to_string()));
    }

    let mut names = HashSet::new();
    for display in &config.displays {
        if display.name.trim().is_empty() {
            return Err(ConfigError::Invalid("display without a name".to_string()));
        }
        if !names.insert(display.name.as_str()) {
            return Err(ConfigError::Invalid(format!("display '{}' declared twice", display.name)));
        }
        controller.add_display(&display.name, &display.display, display.repatriate);
    }
    Ok(())
}

fn load_layouts(config: &RpcdConfig, controller: &mut Controller) -> Result<(), ConfigError> {
    for layout in &config.layouts {
        let display = resolve_display(controller, &layout.display)
            .ok_or_else(|| ConfigError::Invalid(format!("layout '{}' names unknown display '{}'", layout.name, layout.display)))?;

        if layout.frames.is_empty() {
            return Err(ConfigError::Invalid(format!("layout '{}' has no frames", layout.name)));
        }
        if controller.displays().layout_by_name(display, &layout.name).is_some() {
            return Err(ConfigError::Invalid(format!("layout '{}' declared twice", layout.name)));
        }

        let mut frames = SmallVec::new();
        for frame in &layout.frames {
            let bbox = Rect::new(frame.x, frame.y, frame.width, frame.height);
            if !bbox.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "frame {} of layout '{}' has zero size",
                    frame.id, layout.name
                )));
            }
            if frames.iter().any(|f: &Frame| f.id == frame.id) {
                return Err(ConfigError::Invalid(format!(
                    "frame {} of layout '{}' declared twice",
                    frame.id, layout.name
                )));
            }
            frames.push(Frame {
                id: frame.id,
                bbox,
                screen: ScreenGeometry {
                    width: frame.screen_width,
                    height: frame.screen_height,
                    id: frame.screen,
                },
            });
        }

        controller.add_layout(Layout { name: layout.name.clone(), display, frames }, display);
    }

    for (id, declared) in config.displays.iter().enumerate() {
        let default = match &declared.default_layout {
            Some(name) => Some(controller.displays().layout_by_name(id, name).ok_or_else(|| {
                ConfigError::Invalid(format!("default layout '{name}' of display '{}' is not declared", declared.name))
            })?),
            None => controller.displays().layouts_for(id).next().map(|(layout, _)| layout),
        };
        match default {
            Some(layout) => controller.set_default_layout(id, layout),
            None => tracing::warn!(display = %declared.name, "display has no layouts"),
        }
    }
    Ok(())
}

fn window_definition(
    window: &WindowConfig,
    base_dir: &Path,
    controller: &Controller,
) -> Result<EntryDefinition, ConfigError> {
    if window.command.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("window '{}' has an empty command line", window.name)));
    }

    let home_display = match &window.display {
        Some(reference) => resolve_display(controller, reference).ok_or_else(|| {
            ConfigError::Invalid(format!("window '{}' names unknown display '{reference}'", window.name))
        })?,
        None => 0,
    };

    Ok(EntryDefinition {
        name: window.name.clone(),
        kind: EntryKind::Window { mode: window.mode },
        description: None,
        command: window.command.clone(),
        directory: window.directory.as_deref().map(|d| expand_and_resolve(d, base_dir)),
        arguments: Vec::new(),
        filters: WindowFilters {
            title: window.title.clone(),
            app_name: window.app_name.clone(),
            class: window.class_name.clone(),
        },
        home_display,
    })
}

fn resolve_display(controller: &Controller, reference: &str) -> Option<DisplayId> {
    controller.displays().resolve_display(reference)
}
