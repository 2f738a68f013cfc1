//! # Runners
//!
//! Entry points that build an initial state, install terminal continuations,
//! and drive the trampoline to completion. `perform` is the primitive; the
//! `run*` and `test*` families are conveniences over it, and `run_many*`
//! turns a parser into a lazy stream of successive results.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ParseError;
use crate::machine::{trampoline, FailureCont, Parser, Step, SuccessCont};
use crate::memo::Memo;
use crate::state::{ParserState, Position};
use crate::stream::Stream;

/// Run `p` against `state`, delivering the outcome to one of two callbacks.
///
/// This is the callback-style entry: no raising, no `Result`. Whichever of
/// `ok`/`err` matches the terminal outcome is called exactly once and its
/// return value becomes the return value of `perform`.
pub fn perform<I, T, U, R, FOk, FErr>(
    p: &Parser<I, T, U>,
    state: ParserState<I, U>,
    ok: FOk,
    err: FErr,
) -> R
where
    FOk: FnOnce(T, ParserState<I, U>) -> R + 'static,
    FErr: FnOnce(ParseError, ParserState<I, U>) -> R + 'static,
    I: 'static,
    T: 'static,
    U: 'static,
    R: 'static,
{
    tracing::trace!(parser = %p.name(), position = %state.position(), "starting parse");

    let outcome: Rc<RefCell<Option<R>>> = Rc::new(RefCell::new(None));
    let ok_slot = Rc::new(RefCell::new(Some(ok)));
    let err_slot = Rc::new(RefCell::new(Some(err)));

    let success: SuccessCont<I, T, U> = {
        let outcome = Rc::clone(&outcome);
        let ok_slot = Rc::clone(&ok_slot);
        Rc::new(move |value, after, _memo| {
            let finish = ok_slot
                .borrow_mut()
                .take()
                .expect("terminal success continuation fired twice");
            *outcome.borrow_mut() = Some(finish(value, after));
            Step::Halt
        })
    };
    let failure: FailureCont<I, U> = {
        let outcome = Rc::clone(&outcome);
        let err_slot = Rc::clone(&err_slot);
        Rc::new(move |error, after, _memo| {
            let finish = err_slot
                .borrow_mut()
                .take()
                .expect("terminal failure continuation fired twice");
            *outcome.borrow_mut() = Some(finish(error, after));
            Step::Halt
        })
    };

    trampoline(p.call(
        state,
        Memo::empty(),
        Rc::clone(&success),
        Rc::clone(&failure),
        success,
        failure,
    ));

    let result = outcome
        .borrow_mut()
        .take()
        .expect("parse halted without reaching a terminal continuation");
    result
}

/// Run `p` against a prepared state.
pub fn exec<I, T, U>(p: &Parser<I, T, U>, state: ParserState<I, U>) -> Result<T, ParseError>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    perform(p, state, |value, _after| Ok(value), |err, _after| Err(err))
}

/// Run `p` against `input`, with default user state.
pub fn run<I, T, U>(p: &Parser<I, T, U>, input: impl IntoIterator<Item = I>) -> Result<T, ParseError>
where
    I: Clone + 'static,
    T: 'static,
    U: Default + 'static,
{
    run_stream(p, input.into_iter().collect(), U::default())
}

/// Run `p` against an already-built stream and user state.
pub fn run_stream<I, T, U>(
    p: &Parser<I, T, U>,
    stream: Stream<I>,
    user: U,
) -> Result<T, ParseError>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    run_state(p, ParserState::new(stream, Position::initial(), user))
}

/// Alias of [`exec`] for symmetry with the other `run` variants.
pub fn run_state<I, T, U>(p: &Parser<I, T, U>, state: ParserState<I, U>) -> Result<T, ParseError>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    exec(p, state)
}

/// Whether `p` accepts `input`.
pub fn test<I, T, U>(p: &Parser<I, T, U>, input: impl IntoIterator<Item = I>) -> bool
where
    I: Clone + 'static,
    T: 'static,
    U: Default + 'static,
{
    run(p, input).is_ok()
}

pub fn test_stream<I, T, U>(p: &Parser<I, T, U>, stream: Stream<I>, user: U) -> bool
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    run_stream(p, stream, user).is_ok()
}

pub fn test_state<I, T, U>(p: &Parser<I, T, U>, state: ParserState<I, U>) -> bool
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    exec(p, state).is_ok()
}

fn next_result<I, T, U>(p: Parser<I, T, U>, state: ParserState<I, U>) -> Stream<T>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    let resume = p.clone();
    perform(
        &p,
        state,
        move |value, after| Stream::memo_stream(value, move || next_result(resume, after)),
        |_err, _after| Stream::empty(),
    )
}

/// Parse `p` repeatedly, yielding a lazy stream of results.
///
/// Each element is parsed when first demanded, resuming from the state the
/// previous parse left behind; the stream ends at the first failure. Each
/// element runs with a fresh memo, since no earlier entry could apply at the
/// strictly later positions a later element starts from.
pub fn run_many_state<I, T, U>(p: &Parser<I, T, U>, state: ParserState<I, U>) -> Stream<T>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    let p = p.clone();
    Stream::suspend(move || next_result(p, state))
}

pub fn run_many_stream<I, T, U>(p: &Parser<I, T, U>, stream: Stream<I>, user: U) -> Stream<T>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    run_many_state(p, ParserState::new(stream, Position::initial(), user))
}

pub fn run_many<I, T, U>(p: &Parser<I, T, U>, input: impl IntoIterator<Item = I>) -> Stream<T>
where
    I: Clone + 'static,
    T: Clone + 'static,
    U: Default + 'static,
{
    run_many_stream(p, input.into_iter().collect(), U::default())
}
