//! Execution of a compiled script.
//!
//! Running the script computes the desired state only. It never talks to the
//! supervisor or the window manager; the reconciler applies the [`Plan`].

use serde::Serialize;

use super::ast::Operand;
use super::compiler::{ConditionOp, Operation};
use crate::state::{DisplayId, DisplayTable, FrameId, LayoutId};
use crate::supervisor::EntryId;
use crate::variables::VariableStore;

/// One row of the assignment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub display: DisplayId,
    pub frame: FrameId,
    pub window: EntryId,
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// A `done` operation ran.
    Explicit,
    /// The program counter ran past the last operation.
    Implicit,
}

/// Desired state produced by one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Desired layout per display, indexed by display id.
    pub layouts: Vec<Option<LayoutId>>,
    /// Assignment table in insertion order.
    pub assignments: Vec<Assignment>,
    pub termination: Termination,
}

impl Plan {
    fn new(displays: usize) -> Self {
        Self {
            layouts: vec![None; displays],
            assignments: Vec::new(),
            termination: Termination::Implicit,
        }
    }

    /// Whether the run requested nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.layouts.iter().all(Option::is_none)
    }

    /// The window desired for a frame, if any.
    #[must_use]
    pub fn window_for(&self, display: DisplayId, frame: FrameId) -> Option<EntryId> {
        self.assignments
            .iter()
            .find(|a| a.display == display && a.frame == frame)
            .map(|a| a.window)
    }

    fn set_layout(&mut self, display: DisplayId, layout: Option<LayoutId>) {
        if let Some(slot) = self.layouts.get_mut(display) {
            *slot = layout;
        }
    }

    /// Upserts by (display, frame); a window occupies at most one frame.
    fn assign(&mut self, assignment: Assignment) {
        self.assignments.retain(|a| {
            let same_slot = a.display == assignment.display && a.frame == assignment.frame;
            same_slot || a.window != assignment.window
        });

        if let Some(existing) = self
            .assignments
            .iter_mut()
            .find(|a| a.display == assignment.display && a.frame == assignment.frame)
        {
            existing.window = assignment.window;
        } else {
            self.assignments.push(assignment);
        }
    }
}

/// Parses the leading integer of `text` like C `strtol`: optional whitespace,
/// optional sign, then digits. Anything unparsable counts as 0.
fn leading_integer(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits.bytes().position(|b| !b.is_ascii_digit()).unwrap_or(digits.len());
    let magnitude = digits[..end].parse::<i64>().unwrap_or(if end == 0 { 0 } else { i64::MAX });

    if negative { magnitude.saturating_neg() } else { magnitude }
}

fn resolve<'a>(operand: &'a Operand, variables: &'a VariableStore) -> &'a str {
    match operand {
        Operand::Literal(text) => text,
        Operand::Variable(name) => variables.get(name).unwrap_or_default(),
    }
}

/// Evaluates a condition operation.
#[must_use]
pub fn evaluate(
    op: ConditionOp,
    negate: bool,
    a: &Operand,
    b: Option<&Operand>,
    variables: &VariableStore,
) -> bool {
    let left = resolve(a, variables);
    let right = b.map_or("", |b| resolve(b, variables));

    let result = match op {
        ConditionOp::Greater => leading_integer(left) > leading_integer(right),
        ConditionOp::Less => leading_integer(left) < leading_integer(right),
        ConditionOp::Equals => left == right,
        ConditionOp::Empty => left.is_empty(),
    };

    result != negate
}

/// Runs the script and returns the desired state.
#[must_use]
pub fn execute(operations: &[Operation], variables: &VariableStore, displays: &DisplayTable) -> Plan {
    let mut plan = Plan::new(displays.displays().len());
    let mut pc = 0;

    while let Some(operation) = operations.get(pc) {
        pc += 1;

        match operation {
            Operation::Noop => {}
            Operation::LayoutDefault { display } => {
                let default = displays.display(*display).and_then(|d| d.default_layout);
                plan.set_layout(*display, default);
            }
            Operation::Layout { display, layout } => plan.set_layout(*display, Some(*layout)),
            Operation::Assign { display, frame, window } => {
                plan.assign(Assignment { display: *display, frame: *frame, window: *window });
            }
            Operation::Skip(n) => pc = pc.saturating_add(*n),
            Operation::Condition { op, negate, a, b, skip } => {
                if !evaluate(*op, *negate, a, b.as_ref(), variables) {
                    pc = pc.saturating_add(*skip);
                }
            }
            Operation::Stop => {
                plan.termination = Termination::Explicit;
                tracing::trace!(pc = pc - 1, "automation stopped");
                return plan;
            }
        }
    }

    tracing::trace!("automation reached end of script, implicit stop");
    plan
}
