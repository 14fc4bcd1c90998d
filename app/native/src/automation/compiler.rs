//! Lowering of parsed statements into flat operations.
//!
//! Every reference is checked here, once, against the declared variables,
//! displays, layouts and automation windows. The interpreter can therefore
//! resolve operands without failing at run time.

use super::ast::{Comparison, Condition, Operand, Predicate, Scoped, Statement};
use super::error::CompileError;
use crate::state::{DisplayId, DisplayTable, FrameId, LayoutId};
use crate::supervisor::EntryId;
use crate::variables::VariableStore;

/// Condition opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    Greater,
    Less,
    Equals,
    Empty,
}

impl From<Comparison> for ConditionOp {
    fn from(comparison: Comparison) -> Self {
        match comparison {
            Comparison::Greater => Self::Greater,
            Comparison::Less => Self::Less,
            Comparison::Equals => Self::Equals,
        }
    }
}

/// One compiled instruction. The index in the script is its program counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Noop,
    /// Request the display's default layout.
    LayoutDefault { display: DisplayId },
    /// Request a specific layout.
    Layout { display: DisplayId, layout: LayoutId },
    /// Put an automation window into a frame.
    Assign { display: DisplayId, frame: FrameId, window: EntryId },
    /// Jump over the next `n` operations.
    Skip(usize),
    /// Guard for the next `skip` operations; they are skipped when false.
    Condition { op: ConditionOp, negate: bool, a: Operand, b: Option<Operand>, skip: usize },
    /// End the run and apply.
    Stop,
}

/// Name-to-entry lookup for automation windows.
pub trait WindowCatalog {
    /// Returns the entry of the automation window called `name`.
    fn automation_window(&self, name: &str) -> Option<EntryId>;
}

/// Everything a line may refer to.
pub struct CompileContext<'a> {
    pub variables: &'a VariableStore,
    pub displays: &'a DisplayTable,
    pub windows: &'a dyn WindowCatalog,
}

impl CompileContext<'_> {
    fn display(&self, reference: Option<&str>) -> Result<DisplayId, CompileError> {
        if self.displays.displays().is_empty() {
            return Err(CompileError::NoDisplays);
        }

        let Some(reference) = reference else {
            return Ok(0);
        };

        Ok(self.displays.resolve_display(reference).unwrap_or_else(|| {
            tracing::warn!(display = reference, "unknown display, falling back to display 0");
            0
        }))
    }

    fn display_name(&self, display: DisplayId) -> String {
        self.displays.display(display).map_or_else(|| display.to_string(), |d| d.name.clone())
    }

    fn operand(&self, operand: Operand) -> Result<Operand, CompileError> {
        if let Operand::Variable(name) = &operand
            && !self.variables.contains(name)
        {
            return Err(CompileError::UndeclaredVariable(name.clone()));
        }
        Ok(operand)
    }

    fn condition(
        &self,
        condition: Condition,
        skip: usize,
    ) -> Result<Operation, CompileError> {
        let (op, a, b) = match condition.predicate {
            Predicate::Empty(a) => (ConditionOp::Empty, self.operand(a)?, None),
            Predicate::Compare(a, comparison, b) => {
                (comparison.into(), self.operand(a)?, Some(self.operand(b)?))
            }
        };
        Ok(Operation::Condition { op, negate: condition.negate, a, b, skip })
    }

    fn layout(&self, scoped: &Scoped) -> Result<Operation, CompileError> {
        let display = self.display(scoped.display.as_deref())?;
        let layout = self.displays.layout_by_name(display, &scoped.name).ok_or_else(|| {
            CompileError::UndeclaredLayout {
                display: self.display_name(display),
                layout: scoped.name.clone(),
            }
        })?;
        Ok(Operation::Layout { display, layout })
    }

    fn assign(&self, window: &str, frame: &Scoped) -> Result<Operation, CompileError> {
        let entry = self
            .windows
            .automation_window(window)
            .ok_or_else(|| CompileError::UndeclaredWindow(window.to_string()))?;
        let display = self.display(frame.display.as_deref())?;
        let frame = frame
            .name
            .parse::<FrameId>()
            .map_err(|_| CompileError::InvalidFrame(frame.name.clone()))?;
        Ok(Operation::Assign { display, frame, window: entry })
    }

    /// Lowers a statement, appending its operations to `out`.
    fn lower(&self, statement: Statement, out: &mut Vec<Operation>) -> Result<(), CompileError> {
        let operation = match statement {
            Statement::Noop => Operation::Noop,
            Statement::Done => Operation::Stop,
            Statement::Skip(n) => Operation::Skip(n),
            Statement::Default { display } => {
                let id = self.display(Some(&display))?;
                if self.displays.display(id).and_then(|d| d.default_layout).is_none() {
                    return Err(CompileError::UndeclaredLayout {
                        display: self.display_name(id),
                        layout: "default".to_string(),
                    });
                }
                Operation::LayoutDefault { display: id }
            }
            Statement::Layout(scoped) => self.layout(&scoped)?,
            Statement::Assign { window, frame } => self.assign(&window, &frame)?,
            Statement::If { condition, body } => {
                let mut guarded = Vec::new();
                self.lower(*body, &mut guarded)?;
                out.push(self.condition(condition, guarded.len())?);
                out.extend(guarded);
                return Ok(());
            }
        };

        out.push(operation);
        Ok(())
    }
}

/// Compiles one parsed statement into operations.
///
/// # Errors
///
/// Returns a [`CompileError`] when a reference cannot be resolved.
pub fn lower(statement: Statement, ctx: &CompileContext<'_>) -> Result<Vec<Operation>, CompileError> {
    let mut out = Vec::new();
    ctx.lower(statement, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::parser::parse_line;
    use crate::state::Layout;

    struct Windows(Vec<&'static str>);

    impl WindowCatalog for Windows {
        fn automation_window(&self, name: &str) -> Option<EntryId> {
            self.0.iter().position(|w| *w == name)
        }
    }

    fn fixtures() -> (VariableStore, DisplayTable, Windows) {
        let mut variables = VariableStore::new();
        variables.declare("slot", "").unwrap();

        let mut displays = DisplayTable::new();
        let main = displays.add_display("main", ":0");
        displays.add_display("side", ":1");
        let layout = Layout { name: "full".into(), display: main, frames: smallvec::SmallVec::new() };
        let full = displays.add_layout(layout, main);
        displays.set_default_layout(main, full);

        (variables, displays, Windows(vec!["clock", "player"]))
    }

    fn compile(line: &str) -> Result<Vec<Operation>, CompileError> {
        let (variables, displays, windows) = fixtures();
        let ctx = CompileContext { variables: &variables, displays: &displays, windows: &windows };
        lower(parse_line(line)?, &ctx)
    }

    #[test]
    fn test_lower_assign_resolves_window_and_display() {
        assert_eq!(
            compile("assign player side/3"),
            Ok(vec![Operation::Assign { display: 1, frame: 3, window: 1 }])
        );
        assert_eq!(
            compile("assign clock 2"),
            Ok(vec![Operation::Assign { display: 0, frame: 2, window: 0 }])
        );
    }

    #[test]
    fn test_lower_assign_errors() {
        assert_eq!(compile("assign radio 0/1"), Err(CompileError::UndeclaredWindow("radio".into())));
        assert_eq!(compile("assign clock 0/x"), Err(CompileError::InvalidFrame("x".into())));
        assert_eq!(compile("assign clock 0/-1"), Err(CompileError::InvalidFrame("-1".into())));
    }

    #[test]
    fn test_unknown_display_falls_back_to_first() {
        assert_eq!(
            compile("assign clock ceiling/1"),
            Ok(vec![Operation::Assign { display: 0, frame: 1, window: 0 }])
        );
        assert_eq!(compile("default ceiling"), Ok(vec![Operation::LayoutDefault { display: 0 }]));
    }

    #[test]
    fn test_lower_layout_is_validated_per_display() {
        assert_eq!(compile("layout full"), Ok(vec![Operation::Layout { display: 0, layout: 0 }]));
        assert_eq!(
            compile("layout side/full"),
            Err(CompileError::UndeclaredLayout { display: "side".into(), layout: "full".into() })
        );
    }

    #[test]
    fn test_default_requires_a_default_layout() {
        assert!(matches!(compile("default side"), Err(CompileError::UndeclaredLayout { .. })));
    }

    #[test]
    fn test_condition_variables_are_checked() {
        assert!(compile("if empty slot, done").is_ok());
        assert_eq!(
            compile("if missing = 1, done"),
            Err(CompileError::UndeclaredVariable("missing".into()))
        );
    }

    #[test]
    fn test_condition_lowers_before_body() {
        let ops = compile("if not slot = \"x\", assign clock 0/1").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(
            ops[0],
            Operation::Condition {
                op: ConditionOp::Equals,
                negate: true,
                a: Operand::Variable("slot".into()),
                b: Some(Operand::Literal("x".into())),
                skip: 1,
            }
        );
        assert!(matches!(ops[1], Operation::Assign { .. }));
    }

    #[test]
    fn test_nested_condition_guards_whole_body() {
        let ops = compile("if slot = 1, if slot < 5, done").unwrap();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], Operation::Condition { skip: 2, .. }));
        assert!(matches!(ops[1], Operation::Condition { op: ConditionOp::Less, skip: 1, .. }));
        assert_eq!(ops[2], Operation::Stop);
    }

    #[test]
    fn test_no_displays() {
        let variables = VariableStore::new();
        let displays = DisplayTable::new();
        let windows = Windows(vec!["clock"]);
        let ctx = CompileContext { variables: &variables, displays: &displays, windows: &windows };
        assert_eq!(
            lower(parse_line("assign clock 1").unwrap(), &ctx),
            Err(CompileError::NoDisplays)
        );
    }
}
