//! Syntax tree for one automation line.
//!
//! The parser produces a [`Statement`] per line. Conditionals own their body
//! as a nested statement; lowering flattens them into operations.

/// A value in a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Quoted string or bare number.
    Literal(String),
    /// Bare identifier naming a declared variable.
    Variable(String),
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `>`, integer comparison.
    Greater,
    /// `<`, integer comparison.
    Less,
    /// `=`, raw string comparison.
    Equals,
}

impl Comparison {
    pub(crate) const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '>' => Some(Self::Greater),
            '<' => Some(Self::Less),
            '=' => Some(Self::Equals),
            _ => None,
        }
    }
}

/// What a condition tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `empty <operand>`
    Empty(Operand),
    /// `<operand> <op> <operand>`
    Compare(Operand, Comparison, Operand),
}

/// `[not] <predicate>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub negate: bool,
    pub predicate: Predicate,
}

/// A `[<display>/]<name>` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoped {
    pub display: Option<String>,
    pub name: String,
}

/// One parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Noop,
    /// `default <display>`
    Default { display: String },
    /// `layout [<display>/]<name>`
    Layout(Scoped),
    /// `assign <window> [<display>/]<frame>`
    Assign { window: String, frame: Scoped },
    /// `skip <n>`, n > 0
    Skip(usize),
    /// `done`
    Done,
    /// `if <condition>, <body>`
    If { condition: Condition, body: Box<Statement> },
}
