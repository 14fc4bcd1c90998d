//! Named mutable variables.
//!
//! Variables are declared once at configuration load and afterwards only
//! change through the control channel. A write that changes a value is what
//! triggers a reconciliation run.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while declaring variables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VariableError {
    /// The name is not an ASCII identifier.
    #[error("invalid variable name '{0}'")]
    InvalidName(String),
    /// The name was declared twice.
    #[error("variable '{0}' declared twice")]
    Duplicate(String),
}

/// Outcome of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SetOutcome {
    /// The stored value changed.
    Changed,
    /// The new value equals the stored one.
    Unchanged,
    /// No variable by that name exists.
    Unknown,
}

/// One variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

/// Ordered store of variables.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    entries: Vec<Variable>,
}

/// Whether `name` is a non-empty ASCII identifier not starting with a digit.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl VariableStore {
    #[must_use]
    pub const fn new() -> Self { Self { entries: Vec::new() } }

    /// Declares a variable with its initial value.
    ///
    /// # Errors
    ///
    /// Returns [`VariableError`] for malformed or duplicate names.
    pub fn declare(&mut self, name: &str, initial: &str) -> Result<(), VariableError> {
        if !is_identifier(name) {
            return Err(VariableError::InvalidName(name.to_string()));
        }
        if self.contains(name) {
            return Err(VariableError::Duplicate(name.to_string()));
        }

        self.entries.push(Variable { name: name.to_string(), value: initial.to_string() });
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.entries.iter().any(|v| v.name == name) }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|v| v.name == name).map(|v| v.value.as_str())
    }

    /// Writes a value.
    pub fn set(&mut self, name: &str, value: &str) -> SetOutcome {
        let Some(variable) = self.entries.iter_mut().find(|v| v.name == name) else {
            return SetOutcome::Unknown;
        };

        if variable.value == value {
            return SetOutcome::Unchanged;
        }

        variable.value = value.to_string();
        SetOutcome::Changed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> { self.entries.iter() }

    #[must_use]
    pub const fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub const fn is_empty(&self) -> bool { self.entries.is_empty() }
}

// ============================================================================
// Control line parsing
// ============================================================================

/// Strips everything outside printable ASCII.
#[must_use]
pub fn sanitize_line(raw: &[u8]) -> String {
    raw.iter().filter(|b| (0x20..=0x7e).contains(*b)).map(|b| char::from(*b)).collect()
}

/// Splits a control line into `(name, value)` on the first `=`.
///
/// Returns `None` for lines without `=` or with an empty name.
#[must_use]
pub fn parse_assignment(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once('=')?;
    let name = name.trim();
    if name.is_empty() { None } else { Some((name, value)) }
}
