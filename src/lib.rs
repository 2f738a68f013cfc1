//! Bounce - trampolined parser combinators with explicit backtracking control
//!
//! This library provides a continuation-passing parser engine: parsers report
//! success or failure *and* whether they consumed input, alternation commits
//! once input is consumed unless wrapped in `attempt`, and a trampoline keeps
//! native stack use constant regardless of input length. A state-keyed memo
//! chain threads through the parse for packrat-style caching.

pub mod combinators;
pub mod error;
pub mod lang;
pub mod machine;
pub mod memo;
pub mod run;
pub mod state;
pub mod stream;
pub mod text;

pub use combinators::*;
pub use error::{ParseError, ParserError};
pub use lang::*;
pub use machine::{
    bounce, rec, rec_parser, FailureCont, Parser, ParserId, Step, SuccessCont, Thunk,
};
pub use memo::Memo;
pub use run::*;
pub use state::{ParserState, Position};
pub use stream::Stream;
pub use text::*;
