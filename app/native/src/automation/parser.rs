//! Recursive-descent parser for automation lines.
//!
//! Grammar (one line):
//!
//! ```text
//! statement := "noop"
//!            | "default" WORD
//!            | "layout" scoped
//!            | "assign" WORD scoped
//!            | "skip" NUMBER
//!            | "done"
//!            | "if" condition "," statement
//! condition := ["not"] ["empty"] operand [OP operand]
//! operand   := QUOTED | NUMBER | IDENT
//! scoped    := WORD ["/" WORD]
//! OP        := ">" | "<" | "="
//! ```
//!
//! `not` and `empty` are keywords only when another operand follows them, so
//! variables may still be called `not` or `empty`.

use super::ast::{Comparison, Condition, Operand, Predicate, Scoped, Statement};
use super::error::CompileError;
use crate::variables::is_identifier;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    Op(Comparison),
    Comma,
    Slash,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Word(word) => word.clone(),
            Self::Quoted(text) => format!("\"{text}\""),
            Self::Op(Comparison::Greater) => ">".to_string(),
            Self::Op(Comparison::Less) => "<".to_string(),
            Self::Op(Comparison::Equals) => "=".to_string(),
            Self::Comma => ",".to_string(),
            Self::Slash => "/".to_string(),
        }
    }

    const fn starts_operand(&self) -> bool { matches!(self, Self::Word(_) | Self::Quoted(_)) }
}

fn is_delimiter(c: char) -> bool { c.is_whitespace() || matches!(c, '"' | ',' | '/' | '<' | '>' | '=') }

fn tokenize(line: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if let Some(op) = Comparison::from_symbol(c) {
            chars.next();
            tokens.push(Token::Op(op));
            continue;
        }

        match c {
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '"' => {
                chars.next();
                let body_start = start + 1;
                let end = loop {
                    match chars.next() {
                        Some((index, '"')) => break index,
                        Some(_) => {}
                        None => return Err(CompileError::UnterminatedString),
                    }
                };
                tokens.push(Token::Quoted(line[body_start..end].to_string()));
            }
            _ => {
                let mut end = line.len();
                while let Some(&(index, ch)) = chars.peek() {
                    if is_delimiter(ch) {
                        end = index;
                        break;
                    }
                    chars.next();
                }
                tokens.push(Token::Word(line[start..end].to_string()));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> { self.tokens.get(self.pos) }

    fn peek_at(&self, offset: usize) -> Option<&Token> { self.tokens.get(self.pos + offset) }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn word(&mut self, expected: &'static str) -> Result<String, CompileError> {
        match self.next() {
            Some(Token::Word(word)) => Ok(word),
            Some(other) => Err(CompileError::UnexpectedToken { found: other.describe(), expected }),
            None => Err(CompileError::UnexpectedEnd(expected)),
        }
    }

    fn expect_end(&self) -> Result<(), CompileError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(CompileError::UnexpectedToken {
                found: token.describe(),
                expected: "end of line",
            }),
        }
    }

    /// Consumes `keyword` when the token after it starts an operand.
    fn keyword_before_operand(&mut self, keyword: &str) -> bool {
        let is_keyword = matches!(self.peek(), Some(Token::Word(w)) if w == keyword)
            && self.peek_at(1).is_some_and(Token::starts_operand);
        if is_keyword {
            self.pos += 1;
        }
        is_keyword
    }

    fn statement(&mut self) -> Result<Statement, CompileError> {
        let keyword = self.word("statement")?;

        let statement = match keyword.as_str() {
            "noop" => Statement::Noop,
            "done" => Statement::Done,
            "default" => Statement::Default { display: self.word("display")? },
            "layout" => Statement::Layout(self.scoped("layout name")?),
            "assign" => {
                let window = self.word("window name")?;
                let frame = self.scoped("frame id")?;
                Statement::Assign { window, frame }
            }
            "skip" => {
                let count = self.word("skip distance")?;
                match count.parse::<usize>() {
                    Ok(n) if n > 0 => Statement::Skip(n),
                    _ => return Err(CompileError::InvalidSkip(count)),
                }
            }
            "if" => {
                let condition = self.condition()?;
                let body = self.statement()?;
                return Ok(Statement::If { condition, body: Box::new(body) });
            }
            _ => return Err(CompileError::UnknownStatement(keyword)),
        };

        Ok(statement)
    }

    fn scoped(&mut self, expected: &'static str) -> Result<Scoped, CompileError> {
        let first = self.word(expected)?;
        if matches!(self.peek(), Some(Token::Slash)) {
            self.pos += 1;
            let name = self.word(expected)?;
            return Ok(Scoped { display: Some(first), name });
        }
        Ok(Scoped { display: None, name: first })
    }

    fn operand(&mut self) -> Result<Operand, CompileError> {
        match self.next() {
            Some(Token::Quoted(text)) => Ok(Operand::Literal(text)),
            Some(Token::Word(word)) => {
                if word.parse::<i64>().is_ok() {
                    Ok(Operand::Literal(word))
                } else if is_identifier(&word) {
                    Ok(Operand::Variable(word))
                } else {
                    Err(CompileError::InvalidOperand(word))
                }
            }
            Some(other) => {
                Err(CompileError::UnexpectedToken { found: other.describe(), expected: "operand" })
            }
            None => Err(CompileError::UnexpectedEnd("operand")),
        }
    }

    fn condition(&mut self) -> Result<Condition, CompileError> {
        let negate = self.keyword_before_operand("not");
        let empty = self.keyword_before_operand("empty");
        let first = self.operand()?;

        let predicate = match self.next() {
            Some(Token::Comma) if empty => return Ok(Condition { negate, predicate: Predicate::Empty(first) }),
            Some(Token::Comma) => {
                let name = match first {
                    Operand::Literal(text) | Operand::Variable(text) => text,
                };
                return Err(CompileError::MissingOperator(name));
            }
            Some(Token::Op(_)) if empty => return Err(CompileError::UnaryWithOperator),
            Some(Token::Op(op)) => Predicate::Compare(first, op, self.operand()?),
            Some(other) => {
                return Err(CompileError::UnexpectedToken {
                    found: other.describe(),
                    expected: "operator or ','",
                });
            }
            None => return Err(CompileError::UnexpectedEnd("','")),
        };

        match self.next() {
            Some(Token::Comma) => Ok(Condition { negate, predicate }),
            Some(other) => Err(CompileError::UnexpectedToken { found: other.describe(), expected: "','" }),
            None => Err(CompileError::UnexpectedEnd("','")),
        }
    }
}

/// Parses one automation line.
///
/// # Errors
///
/// Returns a [`CompileError`] describing the first syntax problem.
pub fn parse_line(line: &str) -> Result<Statement, CompileError> {
    let mut parser = Parser { tokens: tokenize(line)?, pos: 0 };
    let statement = parser.statement()?;
    parser.expect_end()?;
    Ok(statement)
}
