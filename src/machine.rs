//! # The Evaluation Machine
//!
//! Parsers are continuation-passing: a parser never returns a result, it
//! invokes one of four continuations describing *how* it finished:
//!
//! | continuation | meaning |
//! |---|---|
//! | `cok`  | succeeded after consuming input |
//! | `cerr` | failed after consuming input |
//! | `eok`  | succeeded without consuming |
//! | `eerr` | failed without consuming |
//!
//! The consumed/empty split encodes commitment: alternation may only switch
//! branches on an *empty* failure. A parser that consumed input before
//! failing has committed, and its error propagates unless `attempt`
//! explicitly converts it back.
//!
//! ## Trampolining
//!
//! Nothing in this module calls a parser or a continuation directly down the
//! stack. Every hand-off is wrapped into a [`Thunk`] and returned as
//! [`Step::Cont`] to the [`trampoline`] loop, which keeps native stack use
//! constant no matter how long the input or how deeply combinators nest.
//! Terminal continuations installed by the runner return [`Step::Halt`].

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::unsync::OnceCell;

use crate::error::{ParseError, ParserError};
use crate::memo::Memo;
use crate::state::ParserState;

/// A deferred unit of work for the trampoline.
pub struct Thunk(Box<dyn FnOnce() -> Step>);

impl Thunk {
    pub fn new<F: FnOnce() -> Step + 'static>(f: F) -> Self {
        Thunk(Box::new(f))
    }

    fn invoke(self) -> Step {
        (self.0)()
    }
}

/// What the machine should do next.
pub enum Step {
    /// Keep going: run this thunk.
    Cont(Thunk),
    /// A terminal continuation fired; the run is over.
    Halt,
}

/// Defer `f` to the trampoline instead of calling it here.
pub fn bounce<F: FnOnce() -> Step + 'static>(f: F) -> Step {
    Step::Cont(Thunk::new(f))
}

/// Drive thunks until a terminal continuation halts the machine.
pub(crate) fn trampoline(mut step: Step) {
    while let Step::Cont(thunk) = step {
        step = thunk.invoke();
    }
}

/// Success continuation: receives the value, the state after the parser, and
/// the memo table after the parser.
pub type SuccessCont<I, T, U> = Rc<dyn Fn(T, ParserState<I, U>, Memo<I, U>) -> Step>;

/// Failure continuation: same shape, but carries the error.
pub type FailureCont<I, U> = Rc<dyn Fn(ParseError, ParserState<I, U>, Memo<I, U>) -> Step>;

type Body<I, T, U> = dyn Fn(
    ParserState<I, U>,
    Memo<I, U>,
    SuccessCont<I, T, U>,
    FailureCont<I, U>,
    SuccessCont<I, T, U>,
    FailureCont<I, U>,
) -> Step;

/// Identity of a parser value, used as half of the memo-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParserId(u64);

impl ParserId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ParserId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A parser over tokens `I`, producing `T`, threading user state `U`.
///
/// Cheap to clone and freely aliasable; the body is shared behind an `Rc`.
/// Every constructed parser gets a fresh [`ParserId`], so a wrapper is never
/// mistaken for the parser it wraps by the memo table.
pub struct Parser<I, T, U = ()> {
    name: Rc<str>,
    id: ParserId,
    body: Rc<Body<I, T, U>>,
}

impl<I, T, U> Clone for Parser<I, T, U> {
    fn clone(&self) -> Self {
        Parser {
            name: Rc::clone(&self.name),
            id: self.id,
            body: Rc::clone(&self.body),
        }
    }
}

impl<I, T, U> std::fmt::Debug for Parser<I, T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parser({})", self.name)
    }
}

impl<I: 'static, T: 'static, U: 'static> Parser<I, T, U> {
    /// Wrap a continuation-style body into a parser.
    ///
    /// Any function of the six-argument protocol is a valid body: it receives
    /// the state, the memo table, and the four continuations, and must hand
    /// control back through exactly one of them (via [`bounce`]).
    pub fn new<F>(name: impl Into<Rc<str>>, body: F) -> Self
    where
        F: Fn(
                ParserState<I, U>,
                Memo<I, U>,
                SuccessCont<I, T, U>,
                FailureCont<I, U>,
                SuccessCont<I, T, U>,
                FailureCont<I, U>,
            ) -> Step
            + 'static,
    {
        Parser {
            name: name.into(),
            id: ParserId::fresh(),
            body: Rc::new(body),
        }
    }

    /// A renamed thin wrapper around `self`, with its own identity.
    pub fn with_name(&self, name: impl Into<Rc<str>>) -> Self {
        let inner = self.clone();
        Parser::new(name, move |state, memo, cok, cerr, eok, eerr| {
            inner.call(state, memo, cok, cerr, eok, eerr)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ParserId {
        self.id
    }

    /// Schedule this parser on the trampoline.
    pub fn call(
        &self,
        state: ParserState<I, U>,
        memo: Memo<I, U>,
        cok: SuccessCont<I, T, U>,
        cerr: FailureCont<I, U>,
        eok: SuccessCont<I, T, U>,
        eerr: FailureCont<I, U>,
    ) -> Step {
        let body = Rc::clone(&self.body);
        bounce(move || body(state, memo, cok, cerr, eok, eerr))
    }
}

/// Build a self-referential parser.
///
/// `def` receives a forwarding handle for the parser being defined and must
/// return the completed definition. The handle is only valid once parsing
/// starts; calling it while `def` is still constructing the parser is a
/// grammar defect.
///
/// The handle holds a weak reference, so recursive definitions do not leak:
/// the returned parser owns the cell, the cell owns the definition, and the
/// definition points back only weakly.
pub fn rec<I, T, U, F>(def: F) -> Parser<I, T, U>
where
    F: FnOnce(Parser<I, T, U>) -> Parser<I, T, U>,
    I: 'static,
    T: 'static,
    U: 'static,
{
    rec_parser("rec", def)
}

/// [`rec`] with a diagnostic name for the resulting parser.
pub fn rec_parser<I, T, U, F>(name: impl Into<Rc<str>>, def: F) -> Parser<I, T, U>
where
    F: FnOnce(Parser<I, T, U>) -> Parser<I, T, U>,
    I: 'static,
    T: 'static,
    U: 'static,
{
    let cell: Rc<OnceCell<Parser<I, T, U>>> = Rc::new(OnceCell::new());
    let slot = Rc::downgrade(&cell);
    let name = name.into();

    let handle = Parser::new(
        Rc::clone(&name),
        move |state, memo, cok, cerr, eok, eerr| {
            let cell = match slot.upgrade() {
                Some(cell) => cell,
                None => ParserError::new("recursive parser used after its definition was dropped")
                    .raise(),
            };
            let inner = match cell.get() {
                Some(inner) => inner.clone(),
                None => ParserError::new("recursive parser called during its own construction")
                    .raise(),
            };
            inner.call(state, memo, cok, cerr, eok, eerr)
        },
    );

    let built = def(handle);
    if cell.set(built).is_err() {
        unreachable!("fixed-point cell initialized twice");
    }

    Parser::new(name, move |state, memo, cok, cerr, eok, eerr| {
        let inner = cell
            .get()
            .expect("fixed-point cell is initialized before any parse runs")
            .clone();
        inner.call(state, memo, cok, cerr, eok, eerr)
    })
}
