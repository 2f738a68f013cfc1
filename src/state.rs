//! # Parser State
//!
//! This module provides the immutable cursor every parser runs against:
//!
//! - **Position**: a monotonic index into the token sequence
//! - **ParserState**: the `(input, position, user state)` triple
//!
//! ## Immutability and backtracking
//!
//! Unlike a mutable cursor that saves and restores an index, every transition
//! here produces a new `ParserState` value. Backtracking is nothing more than
//! holding on to an earlier state and resuming from it:
//!
//! ```text
//! let before = state.clone();
//! // ... run a speculative parser producing `after` ...
//! // on failure, continue from `before`; nothing needs undoing
//! ```
//!
//! ## Successor caching
//!
//! `ParserState::next` caches its result in a single slot, so consuming the
//! same token from the same state twice yields the *same* successor value.
//! Repeated consumption during backtracking therefore re-uses one allocation,
//! and memo-table keys for downstream states stay consistent.
//!
//! ## Identity
//!
//! Two states are equal iff their positions are equal. Input tails are
//! expected to be consistent with the position, and user state is
//! deliberately not part of identity.

use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::stream::Stream;

/// A monotonic index into the input, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position(usize);

impl Position {
    pub fn initial() -> Self {
        Position(0)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Advance past `token`. The token is accepted so richer positions
    /// (line/column tracking) can be layered on later without changing
    /// call sites.
    pub fn increment<I>(self, _token: &I) -> Position {
        Position(self.0 + 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct StateInner<I, U> {
    input: Stream<I>,
    position: Position,
    user: U,
    // Single-slot successor cache; see module docs.
    next_cache: OnceCell<ParserState<I, U>>,
}

/// The immutable cursor: input tail, position, and user-supplied state.
pub struct ParserState<I, U> {
    inner: Rc<StateInner<I, U>>,
}

impl<I, U> Clone for ParserState<I, U> {
    fn clone(&self) -> Self {
        ParserState {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<I, U> ParserState<I, U> {
    pub fn new(input: Stream<I>, position: Position, user: U) -> Self {
        ParserState {
            inner: Rc::new(StateInner {
                input,
                position,
                user,
                next_cache: OnceCell::new(),
            }),
        }
    }

    pub fn input(&self) -> &Stream<I> {
        &self.inner.input
    }

    pub fn position(&self) -> Position {
        self.inner.position
    }

    pub fn user(&self) -> &U {
        &self.inner.user
    }
}

impl<I: Clone + 'static, U: Clone> ParserState<I, U> {
    /// The state after consuming `token`. Cached: calling this twice on one
    /// state returns the same successor value.
    pub fn next(&self, token: &I) -> ParserState<I, U> {
        self.inner
            .next_cache
            .get_or_init(|| {
                ParserState::new(
                    self.inner.input.rest(),
                    self.inner.position.increment(token),
                    self.inner.user.clone(),
                )
            })
            .clone()
    }

    pub fn with_input(&self, input: Stream<I>) -> ParserState<I, U> {
        ParserState::new(input, self.position(), self.user().clone())
    }

    pub fn with_position(&self, position: Position) -> ParserState<I, U> {
        ParserState::new(self.input().clone(), position, self.user().clone())
    }

    pub fn with_user(&self, user: U) -> ParserState<I, U> {
        ParserState::new(self.input().clone(), self.position(), user)
    }
}

impl<I, U> PartialEq for ParserState<I, U> {
    fn eq(&self, other: &Self) -> bool {
        self.position() == other.position()
    }
}

impl<I, U> Eq for ParserState<I, U> {}

impl<I, U> fmt::Debug for ParserState<I, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParserState {{ position: {} }}", self.position())
    }
}

// Successor caches chain states together, one link per consumed token; the
// derived drop would recurse down the whole chain. Unlink iteratively,
// stopping at any state something else still holds.
impl<I, U> Drop for StateInner<I, U> {
    fn drop(&mut self) {
        let mut current = self.next_cache.take();
        while let Some(state) = current {
            let ParserState { inner } = state;
            match Rc::try_unwrap(inner) {
                Ok(mut successor) => current = successor.next_cache.take(),
                Err(_shared) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(text: &str, position: usize) -> ParserState<char, ()> {
        ParserState::new(Stream::from(text), Position(position), ())
    }

    #[test]
    fn test_position_ordering() {
        let a = Position::initial();
        let b = a.increment(&'x');
        assert!(a < b);
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn test_next_advances() {
        let state = state_at("ab", 0);
        let tok = state.input().first().unwrap();
        let next = state.next(&tok);
        assert_eq!(next.position().index(), 1);
        assert_eq!(next.input().first(), Some('b'));
    }

    #[test]
    fn test_next_is_cached() {
        let state = state_at("ab", 0);
        let tok = state.input().first().unwrap();
        assert_eq!(state.next(&tok), state.next(&tok));
    }

    #[test]
    fn test_equality_is_position_only() {
        let a = state_at("abc", 2);
        let b = state_at("xyz", 2);
        assert_eq!(a, b);
        assert_ne!(a, state_at("abc", 3));
    }

    #[test]
    fn test_long_successor_chain_drops_without_overflow() {
        let mut state: ParserState<u32, ()> =
            ParserState::new((0..200_000).collect(), Position::initial(), ());
        let head = state.clone();
        while let Some(tok) = state.input().first() {
            state = state.next(&tok);
        }
        drop(state);
        drop(head);
    }
}
