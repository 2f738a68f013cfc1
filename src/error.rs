//! # Error Taxonomy
//!
//! Two strictly disjoint kinds of failure:
//!
//! - **`ParseError`**: the input did not match. These flow through the
//!   failure continuations, can be merged by alternation, and surface as
//!   `Err` values from the runners.
//! - **`ParserError`**: the *grammar* is defective (repetition over a
//!   parser that accepts the empty string, a choice with no alternatives).
//!   These panic straight out of the trampoline; no combinator can catch
//!   them.
//!
//! Alternation merges errors without rebuilding lists: `either` produces a
//! `Multiple`, while `choice` chains a `Choice` head/tail pair whose flat
//! view is only computed when someone actually formats or inspects the
//! error.

use crate::state::Position;

/// A structured parse failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Failure with no further information.
    Unknown { position: Position },
    /// Something was found that nothing expected.
    Unexpect { position: Position, found: String },
    /// A specific construct was expected.
    Expect {
        position: Position,
        expected: String,
        found: Option<String>,
    },
    /// Failure with a free-form message (`fail`).
    Message { position: Position, message: String },
    /// Union of alternative failures at one position.
    Multiple {
        position: Position,
        errors: Vec<ParseError>,
    },
    /// Lazy union used by `choice`: one new failure in front of an already
    /// merged rest. Kept nested so folding n alternatives stays linear.
    Choice {
        position: Position,
        head: Box<ParseError>,
        tail: Box<ParseError>,
    },
}

impl ParseError {
    pub fn unknown(position: Position) -> Self {
        ParseError::Unknown { position }
    }

    pub fn unexpect(position: Position, found: impl Into<String>) -> Self {
        ParseError::Unexpect {
            position,
            found: found.into(),
        }
    }

    pub fn expect(position: Position, expected: impl Into<String>) -> Self {
        ParseError::Expect {
            position,
            expected: expected.into(),
            found: None,
        }
    }

    pub fn expect_found(
        position: Position,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ParseError::Expect {
            position,
            expected: expected.into(),
            found: Some(found.into()),
        }
    }

    pub fn message(position: Position, message: impl Into<String>) -> Self {
        ParseError::Message {
            position,
            message: message.into(),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            ParseError::Unknown { position }
            | ParseError::Unexpect { position, .. }
            | ParseError::Expect { position, .. }
            | ParseError::Message { position, .. }
            | ParseError::Multiple { position, .. }
            | ParseError::Choice { position, .. } => *position,
        }
    }

    /// The flat list of alternative failures this error stands for.
    ///
    /// Leaf errors yield themselves; `Multiple` yields its members; `Choice`
    /// yields its head followed by whatever its tail flattens to. This is
    /// where the deferred merge of `choice` is finally paid for.
    pub fn alternatives(&self) -> Vec<&ParseError> {
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(err) = pending.pop() {
            match err {
                ParseError::Multiple { errors, .. } => {
                    pending.extend(errors.iter().rev());
                }
                ParseError::Choice { head, tail, .. } => {
                    pending.push(tail.as_ref());
                    pending.push(head.as_ref());
                }
                leaf => out.push(leaf),
            }
        }
        out
    }

    /// Human-readable description, without the position prefix.
    pub fn describe(&self) -> String {
        match self {
            ParseError::Unknown { .. } => "unknown parse error".to_string(),
            ParseError::Unexpect { found, .. } => format!("unexpected {found}"),
            ParseError::Expect {
                expected,
                found: Some(found),
                ..
            } => format!("expected {expected}, found {found}"),
            ParseError::Expect { expected, .. } => format!("expected {expected}"),
            ParseError::Message { message, .. } => message.clone(),
            ParseError::Multiple { .. } | ParseError::Choice { .. } => {
                let parts: Vec<String> = self
                    .alternatives()
                    .iter()
                    .map(|e| e.describe())
                    .collect();
                if parts.is_empty() {
                    "no viable alternative".to_string()
                } else {
                    parts.join(" or ")
                }
            }
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error at {}: {}", self.position(), self.describe())
    }
}

impl std::error::Error for ParseError {}

/// A defect in the grammar itself, as opposed to a failure of the input.
///
/// Raised by panicking: grammar defects are programming errors and are not
/// recoverable by any combinator.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parser defect: {message}")]
pub struct ParserError {
    message: String,
}

impl ParserError {
    pub fn new(message: impl Into<String>) -> Self {
        ParserError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Abort the parse. Panics with this error's rendering so the defect
    /// propagates out of the trampoline rather than through the failure
    /// continuations.
    pub fn raise(self) -> ! {
        panic!("{self}")
    }
}
