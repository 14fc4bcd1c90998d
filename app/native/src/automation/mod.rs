//! Automation scripts.
//!
//! A script is a list of lines compiled once at configuration load:
//!
//! ```text
//! line ──▶ parser ──▶ Statement ──▶ compiler ──▶ [Operation]
//!                                                     │
//!                      VariableStore + displays ──▶ interpreter ──▶ Plan
//! ```
//!
//! The operation index is the program counter: `skip n` and a false
//! condition both jump by counting operations.

mod ast;
mod compiler;
mod error;
mod interpreter;
mod parser;

pub use ast::{Comparison, Condition, Operand, Predicate, Scoped, Statement};
pub use compiler::{CompileContext, ConditionOp, Operation, WindowCatalog};
pub use error::CompileError;
pub use interpreter::{Assignment, Plan, Termination, evaluate, execute};
pub use parser::parse_line;

/// Compiled automation program.
#[derive(Debug, Clone, Default)]
pub struct Script {
    operations: Vec<Operation>,
}

impl Script {
    #[must_use]
    pub const fn new() -> Self { Self { operations: Vec::new() } }

    /// Compiles one line and appends its operations.
    ///
    /// # Errors
    ///
    /// Returns the [`CompileError`] for the line; the script is left unchanged.
    pub fn compile_line(&mut self, line: &str, ctx: &CompileContext<'_>) -> Result<(), CompileError> {
        let statement = parse_line(line)?;
        let operations = compiler::lower(statement, ctx)?;
        tracing::trace!(line, operations = operations.len(), "compiled automation line");
        self.operations.extend(operations);
        Ok(())
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] { &self.operations }

    #[must_use]
    pub const fn is_empty(&self) -> bool { self.operations.is_empty() }

    #[must_use]
    pub const fn len(&self) -> usize { self.operations.len() }
}

/// Whether a configuration line carries no automation (blank or comment).
#[must_use]
pub fn is_comment_or_blank(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DisplayTable;
    use crate::supervisor::EntryId;
    use crate::variables::VariableStore;

    struct NoWindows;

    impl WindowCatalog for NoWindows {
        fn automation_window(&self, _name: &str) -> Option<EntryId> { None }
    }

    #[test]
    fn test_comment_detection() {
        assert!(is_comment_or_blank(""));
        assert!(is_comment_or_blank("   "));
        assert!(is_comment_or_blank("# note"));
        assert!(is_comment_or_blank("  ; note"));
        assert!(!is_comment_or_blank("done"));
    }

    #[test]
    fn test_compile_skip_program() {
        let variables = VariableStore::new();
        let mut displays = DisplayTable::new();
        displays.add_display("main", ":0");
        let ctx = CompileContext { variables: &variables, displays: &displays, windows: &NoWindows };

        let mut script = Script::new();
        for line in ["skip 2", "noop", "noop", "done"] {
            script.compile_line(line, &ctx).unwrap();
        }
        assert_eq!(script.len(), 4);

        let plan = execute(script.operations(), &variables, &displays);
        assert_eq!(plan.termination, Termination::Explicit);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_skip_past_end_stops_implicitly() {
        let variables = VariableStore::new();
        let mut displays = DisplayTable::new();
        displays.add_display("main", ":0");
        let ctx = CompileContext { variables: &variables, displays: &displays, windows: &NoWindows };

        let mut script = Script::new();
        for line in ["noop", "skip 18446744073709551615", "done"] {
            script.compile_line(line, &ctx).unwrap();
        }

        let plan = execute(script.operations(), &variables, &displays);
        assert_eq!(plan.termination, Termination::Implicit);
    }

    #[test]
    fn test_failed_line_leaves_script_unchanged() {
        let variables = VariableStore::new();
        let displays = DisplayTable::new();
        let ctx = CompileContext { variables: &variables, displays: &displays, windows: &NoWindows };

        let mut script = Script::new();
        script.compile_line("done", &ctx).unwrap();
        assert!(script.compile_line("assign clock 1", &ctx).is_err());
        assert_eq!(script.len(), 1);
    }
}
