//! Compile errors for automation lines.
//!
//! # Error Categories
//!
//! - **Syntax**: the line does not follow the grammar
//! - **Reference**: the line names a variable, layout or window that was not declared
//! - **Value**: a numeric argument is out of range

use thiserror::Error;

/// Why an automation line failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The first word is not a known statement.
    #[error("unknown statement '{0}'")]
    UnknownStatement(String),

    /// The line ended where more input was expected.
    #[error("unexpected end of line, expected {0}")]
    UnexpectedEnd(&'static str),

    /// A token appeared where it is not allowed.
    #[error("unexpected '{found}', expected {expected}")]
    UnexpectedToken { found: String, expected: &'static str },

    /// A double-quoted literal is missing its closing quote.
    #[error("unterminated string literal")]
    UnterminatedString,

    /// A bare word is neither a number nor an identifier.
    #[error("invalid operand '{0}'")]
    InvalidOperand(String),

    /// A binary condition is missing its operator.
    #[error("condition on '{0}' needs an operator or 'empty'")]
    MissingOperator(String),

    /// `empty` was combined with a binary operator.
    #[error("'empty' takes a single operand")]
    UnaryWithOperator,

    /// `skip` needs a positive count.
    #[error("invalid skip distance '{0}', expected a positive integer")]
    InvalidSkip(String),

    /// Frame ids are non-negative integers.
    #[error("invalid frame id '{0}'")]
    InvalidFrame(String),

    /// Operand names a variable that was never declared.
    #[error("undeclared variable '{0}'")]
    UndeclaredVariable(String),

    /// Layout does not exist on the display.
    #[error("layout '{layout}' is not declared on display '{display}'")]
    UndeclaredLayout { display: String, layout: String },

    /// Window is not a declared automation window.
    #[error("'{0}' is not a declared automation window")]
    UndeclaredWindow(String),

    /// There is no display to apply the statement to.
    #[error("no displays are configured")]
    NoDisplays,
}
