//! Primitive and iterative combinators.
//!
//! Everything here is written against the six-argument continuation protocol
//! (see [`crate::machine`]): a combinator wires up its child parsers by
//! rerouting continuations, never by inspecting return values. The
//! consumed/empty distinction is what each wrapper manipulates: `attempt`
//! downgrades consumed failures, `bind` promotes empty outcomes after
//! consumption, `either` only switches branches on empty failure.

use std::any::Any;
use std::rc::Rc;

use crate::error::{ParseError, ParserError};
use crate::machine::{bounce, rec_parser, FailureCont, Parser, Step, SuccessCont};
use crate::memo::{Memo, Recorded};
use crate::state::{ParserState, Position};
use crate::stream::Stream;

// === Primitives ===

/// Succeed with `value` without consuming input.
pub fn always<I, T, U>(value: T) -> Parser<I, T, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    Parser::new("always", move |state, memo, _cok, _cerr, eok, _eerr| {
        let value = value.clone();
        bounce(move || eok(value, state, memo))
    })
}

/// Fail with `err` without consuming input.
pub fn never<I, T, U>(err: ParseError) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    Parser::new("never", move |state, memo, _cok, _cerr, _eok, eerr| {
        let err = err.clone();
        bounce(move || eerr(err, state, memo))
    })
}

/// Run `p`, then run the parser `f` builds from its value.
///
/// Consumption composes: once `p` has consumed, the continuation parser's
/// empty outcomes count as consumed for the sequence as a whole.
pub fn bind<I, T, S, U, F>(p: Parser<I, T, U>, f: F) -> Parser<I, S, U>
where
    F: Fn(T) -> Parser<I, S, U> + 'static,
    I: 'static,
    T: 'static,
    S: 'static,
    U: 'static,
{
    let f = Rc::new(f);
    Parser::new("bind", move |state, memo, cok, cerr, eok, eerr| {
        let consumed_then: SuccessCont<I, T, U> = {
            let f = Rc::clone(&f);
            let cok = cok.clone();
            let cerr = cerr.clone();
            Rc::new(move |value, after, memo_p| {
                f(value).call(
                    after,
                    memo_p,
                    cok.clone(),
                    cerr.clone(),
                    cok.clone(),
                    cerr.clone(),
                )
            })
        };
        let empty_then: SuccessCont<I, T, U> = {
            let f = Rc::clone(&f);
            let (cok, cerr, eok, eerr) = (cok.clone(), cerr.clone(), eok.clone(), eerr.clone());
            Rc::new(move |value, after, memo_p| {
                f(value).call(
                    after,
                    memo_p,
                    cok.clone(),
                    cerr.clone(),
                    eok.clone(),
                    eerr.clone(),
                )
            })
        };
        p.call(state, memo, consumed_then, cerr, empty_then, eerr)
    })
}

/// Run `p`, discard its value, then run `q`.
pub fn next<I, T, S, U>(p: Parser<I, T, U>, q: Parser<I, S, U>) -> Parser<I, S, U>
where
    I: 'static,
    T: 'static,
    S: 'static,
    U: 'static,
{
    bind(p, move |_| q.clone())
}

/// Transform the value of `p`.
pub fn map<I, T, S, U, F>(p: Parser<I, T, U>, f: F) -> Parser<I, S, U>
where
    F: Fn(T) -> S + 'static,
    I: 'static,
    T: 'static,
    S: Clone + 'static,
    U: 'static,
{
    let f = Rc::new(f);
    bind(p, move |value| always(f(value)))
}

/// Like [`bind`], but materializes a stream-valued parser's result first.
pub fn binds<I, T, S, U, F>(p: Parser<I, Stream<T>, U>, f: F) -> Parser<I, S, U>
where
    F: Fn(Vec<T>) -> Parser<I, S, U> + 'static,
    I: 'static,
    T: Clone + 'static,
    S: 'static,
    U: 'static,
{
    bind(p, move |values| f(values.to_vec()))
}

/// Consume one token satisfying `pred`.
///
/// On predicate failure the token is *not* consumed; `err` builds the error
/// from the position and the offending token (`None` at end of input).
pub fn token<I, U, P, E>(pred: P, err: E) -> Parser<I, I, U>
where
    P: Fn(&I) -> bool + 'static,
    E: Fn(Position, Option<&I>) -> ParseError + 'static,
    I: Clone + 'static,
    U: Clone + 'static,
{
    Parser::new("token", move |state: ParserState<I, U>, memo, cok, _cerr, _eok, eerr| {
        match state.input().first() {
            None => {
                let e = err(state.position(), None);
                bounce(move || eerr(e, state, memo))
            }
            Some(tok) => {
                if pred(&tok) {
                    let after = state.next(&tok);
                    bounce(move || cok(tok, after, memo))
                } else {
                    let e = err(state.position(), Some(&tok));
                    bounce(move || eerr(e, state, memo))
                }
            }
        }
    })
}

/// Consume any one token; fails only at end of input.
pub fn any_token<I, U>() -> Parser<I, I, U>
where
    I: Clone + 'static,
    U: Clone + 'static,
{
    token(|_| true, |pos, _| ParseError::unexpect(pos, "end of input")).with_name("any_token")
}

/// Make a consumed failure of `p` recoverable.
///
/// `p`'s consumed-error continuation is rewired to report an *empty* error
/// at the state from before `p` ran, so `either` can still try its
/// alternative. Memo entries accumulated inside the attempt are kept; they
/// describe pure outcomes and stay valid.
pub fn attempt<I, T, U>(p: Parser<I, T, U>) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    Parser::new("attempt", move |state: ParserState<I, U>, memo, cok, _cerr, eok, eerr| {
        let rewired: FailureCont<I, U> = {
            let eerr = eerr.clone();
            let origin = state.clone();
            Rc::new(move |err, _after, memo_p| {
                let eerr = eerr.clone();
                let origin = origin.clone();
                bounce(move || eerr(err, origin, memo_p))
            })
        };
        p.call(state, memo, cok, rewired, eok, eerr)
    })
}

/// Run `p` but report the pre-call state on success, consuming nothing.
pub fn lookahead<I, T, U>(p: Parser<I, T, U>) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    Parser::new("lookahead", move |state: ParserState<I, U>, memo, _cok, cerr, eok, eerr| {
        let restore: SuccessCont<I, T, U> = {
            let eok = eok.clone();
            let origin = state.clone();
            Rc::new(move |value, _after, memo_p| {
                let eok = eok.clone();
                let origin = origin.clone();
                bounce(move || eok(value, origin, memo_p))
            })
        };
        p.call(state, memo, restore.clone(), cerr, restore, eerr)
    })
}

type ErrorMerge = Rc<dyn Fn(Position, ParseError, ParseError) -> ParseError>;

/// Alternation with a pluggable error combiner. The second alternative only
/// runs on an empty failure of the first, at the original state, with the
/// memo the first alternative produced.
fn alt_with<I, T, U>(
    p: Parser<I, T, U>,
    q: Parser<I, T, U>,
    merge: ErrorMerge,
) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    Parser::new("either", move |state: ParserState<I, U>, memo, cok, cerr, eok, eerr| {
        let origin = state.clone();
        let q = q.clone();
        let merge = Rc::clone(&merge);
        let (cok2, cerr2, eok2, eerr2) = (cok.clone(), cerr.clone(), eok.clone(), eerr.clone());
        let first_failed: FailureCont<I, U> = Rc::new(move |err_p, _after, memo_p| {
            let merge = Rc::clone(&merge);
            let eerr3 = eerr2.clone();
            let pos = origin.position();
            let both_failed: FailureCont<I, U> = Rc::new(move |err_q, after_q, memo_q| {
                let merged = merge(pos, err_p.clone(), err_q);
                let eerr4 = eerr3.clone();
                bounce(move || eerr4(merged, after_q, memo_q))
            });
            q.call(
                origin.clone(),
                memo_p,
                cok2.clone(),
                cerr2.clone(),
                eok2.clone(),
                both_failed,
            )
        });
        p.call(state, memo, cok, cerr, eok, first_failed)
    })
}

/// Try `p`; on empty failure, try `q` from the same state. If both fail
/// empty, the errors are merged into a [`ParseError::Multiple`].
pub fn either<I, T, U>(p: Parser<I, T, U>, q: Parser<I, T, U>) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    alt_with(
        p,
        q,
        Rc::new(|position, a, b| ParseError::Multiple {
            position,
            errors: vec![a, b],
        }),
    )
}

/// Try alternatives left to right; first success wins.
///
/// Errors merge through [`ParseError::Choice`] so folding n alternatives
/// stays linear. An empty alternative list is a grammar defect and panics at
/// construction.
pub fn choice<I, T, U>(parsers: impl IntoIterator<Item = Parser<I, T, U>>) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    let parsers: Vec<_> = parsers.into_iter().collect();
    if parsers.is_empty() {
        ParserError::new("choice requires at least one alternative").raise();
    }
    let seed: Parser<I, T, U> =
        Parser::new("choice", |state: ParserState<I, U>, memo, _cok, _cerr, _eok, eerr| {
            let err = ParseError::Multiple {
                position: state.position(),
                errors: vec![],
            };
            bounce(move || eerr(err, state, memo))
        });
    let merge: ErrorMerge = Rc::new(|position, head, tail| ParseError::Choice {
        position,
        head: Box::new(head),
        tail: Box::new(tail),
    });
    parsers
        .into_iter()
        .rev()
        .fold(seed, |rest, p| alt_with(p, rest, Rc::clone(&merge)))
}

/// `p`, or `default` if `p` fails without consuming.
pub fn optional<I, T, U>(p: Parser<I, T, U>, default: T) -> Parser<I, T, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    either(p, always(default))
}

/// Replace `p`'s empty failures with "expected `label`" at the start
/// position.
pub fn expected<I, T, U>(label: impl Into<String>, p: Parser<I, T, U>) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    let label: String = label.into();
    Parser::new("expected", move |state: ParserState<I, U>, memo, cok, cerr, eok, eerr| {
        let relabeled: FailureCont<I, U> = {
            let eerr = eerr.clone();
            let label = label.clone();
            let pos = state.position();
            Rc::new(move |_err, after, memo_p| {
                let err = ParseError::expect(pos, label.clone());
                let eerr = eerr.clone();
                bounce(move || eerr(err, after, memo_p))
            })
        };
        p.call(state, memo, cok, cerr, eok, relabeled)
    })
}

/// Fail with `message` at the current position.
pub fn fail<I, T, U>(message: impl Into<String>) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    let message: String = message.into();
    Parser::new("fail", move |state: ParserState<I, U>, memo, _cok, _cerr, _eok, eerr| {
        let err = ParseError::message(state.position(), message.clone());
        bounce(move || eerr(err, state, memo))
    })
}

/// Succeed iff the input is exhausted.
pub fn eof<I, U>() -> Parser<I, (), U>
where
    I: Clone + std::fmt::Debug + 'static,
    U: 'static,
{
    Parser::new("eof", |state: ParserState<I, U>, memo, _cok, _cerr, eok, eerr| {
        match state.input().first() {
            None => bounce(move || eok((), state, memo)),
            Some(tok) => {
                let err = ParseError::expect_found(
                    state.position(),
                    "end of input",
                    format!("{tok:?}"),
                );
                bounce(move || eerr(err, state, memo))
            }
        }
    })
}

// === State accessors ===

/// Report `f(state)` without changing anything.
pub fn extract<I, T, U, F>(f: F) -> Parser<I, T, U>
where
    F: Fn(&ParserState<I, U>) -> T + 'static,
    I: 'static,
    T: 'static,
    U: 'static,
{
    Parser::new("extract", move |state, memo, _cok, _cerr, eok, _eerr| {
        let value = f(&state);
        bounce(move || eok(value, state, memo))
    })
}

/// Replace the whole parser state with `f(state)`, reporting the new state
/// as the value. The asymmetry with [`extract`] is deliberate and
/// load-bearing for code composing setters with [`bind`].
pub fn modify_parser_state<I, U, F>(f: F) -> Parser<I, ParserState<I, U>, U>
where
    F: Fn(ParserState<I, U>) -> ParserState<I, U> + 'static,
    I: 'static,
    U: 'static,
{
    Parser::new("modify_parser_state", move |state, memo, _cok, _cerr, eok, _eerr| {
        let next = f(state);
        let value = next.clone();
        bounce(move || eok(value, next, memo))
    })
}

pub fn get_parser_state<I, U>() -> Parser<I, ParserState<I, U>, U>
where
    I: 'static,
    U: 'static,
{
    extract(|state: &ParserState<I, U>| state.clone()).with_name("get_parser_state")
}

pub fn set_parser_state<I, U>(new: ParserState<I, U>) -> Parser<I, ParserState<I, U>, U>
where
    I: 'static,
    U: 'static,
{
    modify_parser_state(move |_| new.clone()).with_name("set_parser_state")
}

pub fn get_state<I, U>() -> Parser<I, U, U>
where
    I: 'static,
    U: Clone + 'static,
{
    extract(|state: &ParserState<I, U>| state.user().clone()).with_name("get_state")
}

pub fn set_state<I, U>(user: U) -> Parser<I, ParserState<I, U>, U>
where
    I: Clone + 'static,
    U: Clone + 'static,
{
    modify_parser_state(move |state: ParserState<I, U>| state.with_user(user.clone()))
        .with_name("set_state")
}

pub fn modify_state<I, U, F>(f: F) -> Parser<I, ParserState<I, U>, U>
where
    F: Fn(&U) -> U + 'static,
    I: Clone + 'static,
    U: Clone + 'static,
{
    modify_parser_state(move |state: ParserState<I, U>| {
        let user = f(state.user());
        state.with_user(user)
    })
    .with_name("modify_state")
}

pub fn get_input<I, U>() -> Parser<I, Stream<I>, U>
where
    I: 'static,
    U: 'static,
{
    extract(|state: &ParserState<I, U>| state.input().clone()).with_name("get_input")
}

pub fn set_input<I, U>(input: Stream<I>) -> Parser<I, ParserState<I, U>, U>
where
    I: Clone + 'static,
    U: Clone + 'static,
{
    modify_parser_state(move |state: ParserState<I, U>| state.with_input(input.clone()))
        .with_name("set_input")
}

pub fn get_position<I, U>() -> Parser<I, Position, U>
where
    I: 'static,
    U: 'static,
{
    extract(|state: &ParserState<I, U>| state.position()).with_name("get_position")
}

pub fn set_position<I, U>(position: Position) -> Parser<I, ParserState<I, U>, U>
where
    I: Clone + 'static,
    U: Clone + 'static,
{
    modify_parser_state(move |state: ParserState<I, U>| state.with_position(position))
        .with_name("set_position")
}

// === Iteration ===

/// Run `head` then `tail`, prepending the head's value to the tail's stream.
pub fn cons<I, T, U>(
    head: Parser<I, T, U>,
    tail: Parser<I, Stream<T>, U>,
) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    bind(head, move |value| {
        let tail = tail.clone();
        bind(tail, move |rest| always(Stream::cons(value.clone(), rest)))
    })
}

/// Run `a` then `b`, concatenating their stream values.
pub fn append<I, T, U>(
    a: Parser<I, Stream<T>, U>,
    b: Parser<I, Stream<T>, U>,
) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    bind(a, move |first| {
        let b = b.clone();
        bind(b, move |second| {
            always(Stream::append(first.clone(), second))
        })
    })
}

/// Run parsers in order, collecting their values as a stream.
pub fn sequence<I, T, U>(
    parsers: impl IntoIterator<Item = Parser<I, T, U>>,
) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    let parsers: Vec<_> = parsers.into_iter().collect();
    parsers
        .into_iter()
        .rev()
        .fold(always(Stream::empty()), |rest, p| cons(p, rest))
}

/// Materialize a stream-valued parser's result into a `Vec`.
pub fn eager<I, T, U>(p: Parser<I, Stream<T>, U>) -> Parser<I, Vec<T>, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    map(p, |stream| stream.to_vec())
}

/// Abort if `p` succeeds without consuming: repeating it would never
/// terminate, which is a defect in the grammar rather than bad input.
fn require_progress<I, T, U>(p: Parser<I, T, U>) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    Parser::new("many_item", move |state, memo, cok, cerr, _eok, eerr| {
        let fatal: SuccessCont<I, T, U> = Rc::new(move |_value, _after, _memo| {
            ParserError::new("Many parser applied to a parser that accepts an empty string")
                .raise()
        });
        p.call(state, memo, cok, cerr, fatal, eerr)
    })
}

/// Zero or more `p`, collected as a stream.
pub fn many<I, T, U>(p: Parser<I, T, U>) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    let item = require_progress(p);
    rec_parser("many", move |self_| {
        optional(cons(item, self_), Stream::empty())
    })
}

/// One or more `p`.
pub fn many1<I, T, U>(p: Parser<I, T, U>) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    cons(p.clone(), many(p))
}

// === Memoization ===

fn downcast<T: Clone + 'static>(value: &Rc<dyn Any>) -> T {
    value
        .downcast_ref::<T>()
        .expect("memo cell holds the type fixed by its parser id")
        .clone()
}

fn replay<I, T, U>(
    recorded: Recorded<I, U>,
    memo: Memo<I, U>,
    cok: SuccessCont<I, T, U>,
    cerr: FailureCont<I, U>,
    eok: SuccessCont<I, T, U>,
    eerr: FailureCont<I, U>,
) -> Step
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    match recorded {
        Recorded::ConsumedOk(value, after) => {
            let value = downcast::<T>(&value);
            bounce(move || cok(value, after, memo))
        }
        Recorded::ConsumedErr(err, after) => bounce(move || cerr(err, after, memo)),
        Recorded::EmptyOk(value, after) => {
            let value = downcast::<T>(&value);
            bounce(move || eok(value, after, memo))
        }
        Recorded::EmptyErr(err, after) => bounce(move || eerr(err, after, memo)),
    }
}

/// Cache `p`'s outcome per `(parser id, state)`.
///
/// A hit replays the recorded outcome (value or error, consumed or empty)
/// through the caller's continuations without rerunning `p`. A miss runs `p`
/// and prepends a cell on whichever continuation fires. All four outcomes
/// record symmetrically, each carrying the memo `p` produced.
pub fn memo<I, T, U>(p: Parser<I, T, U>) -> Parser<I, T, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    let id = p.id();
    Parser::new("memo", move |state: ParserState<I, U>, memo_in: Memo<I, U>, cok, cerr, eok, eerr| {
        if let Some(recorded) = memo_in.lookup(id, &state) {
            tracing::trace!(parser = ?id, position = %state.position(), "memo hit");
            return replay(recorded, memo_in, cok, cerr, eok, eerr);
        }
        let key = state.clone();
        let mcok: SuccessCont<I, T, U> = {
            let cok = cok.clone();
            let key = key.clone();
            Rc::new(move |value: T, after: ParserState<I, U>, memo_p: Memo<I, U>| {
                let updated = memo_p.record(
                    id,
                    key.clone(),
                    Recorded::ConsumedOk(Rc::new(value.clone()), after.clone()),
                );
                let cok = cok.clone();
                bounce(move || cok(value, after, updated))
            })
        };
        let mcerr: FailureCont<I, U> = {
            let cerr = cerr.clone();
            let key = key.clone();
            Rc::new(move |err: ParseError, after: ParserState<I, U>, memo_p: Memo<I, U>| {
                let updated = memo_p.record(
                    id,
                    key.clone(),
                    Recorded::ConsumedErr(err.clone(), after.clone()),
                );
                let cerr = cerr.clone();
                bounce(move || cerr(err, after, updated))
            })
        };
        let meok: SuccessCont<I, T, U> = {
            let eok = eok.clone();
            let key = key.clone();
            Rc::new(move |value: T, after: ParserState<I, U>, memo_p: Memo<I, U>| {
                let updated = memo_p.record(
                    id,
                    key.clone(),
                    Recorded::EmptyOk(Rc::new(value.clone()), after.clone()),
                );
                let eok = eok.clone();
                bounce(move || eok(value, after, updated))
            })
        };
        let meerr: FailureCont<I, U> = {
            let eerr = eerr.clone();
            let key = key.clone();
            Rc::new(move |err: ParseError, after: ParserState<I, U>, memo_p: Memo<I, U>| {
                let updated = memo_p.record(
                    id,
                    key.clone(),
                    Recorded::EmptyErr(err.clone(), after.clone()),
                );
                let eerr = eerr.clone();
                bounce(move || eerr(err, after, updated))
            })
        };
        p.call(state, memo_in, mcok, mcerr, meok, meerr)
    })
}

/// Run `p`, discarding memo entries it accumulates: every outcome forwards
/// the caller's original chain.
pub fn backtrack<I, T, U>(p: Parser<I, T, U>) -> Parser<I, T, U>
where
    I: 'static,
    T: 'static,
    U: 'static,
{
    Parser::new("backtrack", move |state, memo: Memo<I, U>, cok, cerr, eok, eerr| {
        let keep = memo.clone();
        let bcok: SuccessCont<I, T, U> = {
            let cok = cok.clone();
            let keep = keep.clone();
            Rc::new(move |value, after, _memo_p| {
                let cok = cok.clone();
                let keep = keep.clone();
                bounce(move || cok(value, after, keep))
            })
        };
        let bcerr: FailureCont<I, U> = {
            let cerr = cerr.clone();
            let keep = keep.clone();
            Rc::new(move |err, after, _memo_p| {
                let cerr = cerr.clone();
                let keep = keep.clone();
                bounce(move || cerr(err, after, keep))
            })
        };
        let beok: SuccessCont<I, T, U> = {
            let eok = eok.clone();
            let keep = keep.clone();
            Rc::new(move |value, after, _memo_p| {
                let eok = eok.clone();
                let keep = keep.clone();
                bounce(move || eok(value, after, keep))
            })
        };
        let beerr: FailureCont<I, U> = {
            let eerr = eerr.clone();
            let keep = keep.clone();
            Rc::new(move |err, after, _memo_p| {
                let eerr = eerr.clone();
                let keep = keep.clone();
                bounce(move || eerr(err, after, keep))
            })
        };
        p.call(state, memo, bcok, bcerr, beok, beerr)
    })
}
