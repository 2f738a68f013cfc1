//! # Memo Cell Chain
//!
//! A persistent cache of parser outcomes, keyed by `(parser id, state)`.
//!
//! The table is not a side table: it is a value threaded through the
//! continuation protocol alongside the parser state. Because it is an
//! immutable chain, the entries visible at any point in a parse are exactly
//! the entries valid for the states reachable from there. Backtracking into
//! an earlier alternative simply resumes with the older chain, and
//! `backtrack` can discard a speculative branch's entries by forwarding the
//! caller's chain instead of the branch's.
//!
//! Updates prepend; lookups scan from most recent to oldest. State equality
//! for keys is position equality (see [`crate::state::ParserState`]).

use std::any::Any;
use std::rc::Rc;

use crate::error::ParseError;
use crate::machine::ParserId;
use crate::state::ParserState;

/// A recorded parser outcome: which of the four continuations fired, the
/// value or error it carried, and the state it left behind.
///
/// Values are stored type-erased; `memo` is the only reader and downcasts
/// back to the output type fixed by the cell's `ParserId`.
pub(crate) enum Recorded<I, U> {
    ConsumedOk(Rc<dyn Any>, ParserState<I, U>),
    ConsumedErr(ParseError, ParserState<I, U>),
    EmptyOk(Rc<dyn Any>, ParserState<I, U>),
    EmptyErr(ParseError, ParserState<I, U>),
}

impl<I, U> Clone for Recorded<I, U> {
    fn clone(&self) -> Self {
        match self {
            Recorded::ConsumedOk(v, s) => Recorded::ConsumedOk(Rc::clone(v), s.clone()),
            Recorded::ConsumedErr(e, s) => Recorded::ConsumedErr(e.clone(), s.clone()),
            Recorded::EmptyOk(v, s) => Recorded::EmptyOk(Rc::clone(v), s.clone()),
            Recorded::EmptyErr(e, s) => Recorded::EmptyErr(e.clone(), s.clone()),
        }
    }
}

struct MemoCell<I, U> {
    id: ParserId,
    state: ParserState<I, U>,
    recorded: Recorded<I, U>,
    next: Memo<I, U>,
}

/// The memo chain. Cheap to clone; sharing is structural.
pub struct Memo<I, U> {
    head: Option<Rc<MemoCell<I, U>>>,
}

impl<I, U> Clone for Memo<I, U> {
    fn clone(&self) -> Self {
        Memo {
            head: self.head.clone(),
        }
    }
}

impl<I, U> Default for Memo<I, U> {
    fn default() -> Self {
        Memo::empty()
    }
}

impl<I, U> Memo<I, U> {
    pub fn empty() -> Self {
        Memo { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of cells in the chain. Linear; intended for diagnostics.
    pub fn len(&self) -> usize {
        let mut n = 0;
        let mut cur = self.head.as_deref();
        while let Some(cell) = cur {
            n += 1;
            cur = cell.next.head.as_deref();
        }
        n
    }

    pub(crate) fn lookup(&self, id: ParserId, state: &ParserState<I, U>) -> Option<Recorded<I, U>> {
        let mut cur = self.head.as_deref();
        while let Some(cell) = cur {
            if cell.id == id && cell.state == *state {
                return Some(cell.recorded.clone());
            }
            cur = cell.next.head.as_deref();
        }
        None
    }

    pub(crate) fn record(
        &self,
        id: ParserId,
        state: ParserState<I, U>,
        recorded: Recorded<I, U>,
    ) -> Memo<I, U> {
        Memo {
            head: Some(Rc::new(MemoCell {
                id,
                state,
                recorded,
                next: self.clone(),
            })),
        }
    }
}

// Same teardown concern as `Stream`: long chains must not drop recursively.
impl<I, U> Drop for Memo<I, U> {
    fn drop(&mut self) {
        let mut current = self.head.take();
        while let Some(rc) = current {
            match Rc::try_unwrap(rc) {
                Ok(mut cell) => current = cell.next.head.take(),
                Err(_shared) => break,
            }
        }
    }
}
