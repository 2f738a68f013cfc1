//! Derived language combinators: repetition with separators, delimiters,
//! and operator chains. Everything here is definable in terms of the core
//! combinators; nothing touches the continuation protocol directly.

use std::rc::Rc;

use crate::combinators::{always, bind, cons, many, many1, map, next, optional};
use crate::machine::{rec_parser, Parser};
use crate::stream::Stream;

/// A binary operator produced by an operator parser, for the `chain`
/// combinators.
pub type Binop<T> = Rc<dyn Fn(T, T) -> T>;

/// Exactly `n` occurrences of `p`.
pub fn times<I, T, U>(n: usize, p: Parser<I, T, U>) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    let mut acc = always(Stream::empty());
    for _ in 0..n {
        acc = cons(p.clone(), acc);
    }
    acc
}

/// `open`, then `p`, then `close`; yields `p`'s value.
pub fn between<I, A, B, T, U>(
    open: Parser<I, A, U>,
    close: Parser<I, B, U>,
    p: Parser<I, T, U>,
) -> Parser<I, T, U>
where
    I: 'static,
    A: 'static,
    B: 'static,
    T: Clone + 'static,
    U: 'static,
{
    bind(next(open, p), move |value| {
        next(close.clone(), always(value))
    })
}

/// `p` separated by `sep`, one or more: `p (sep p)*`.
pub fn sep_by1<I, S, T, U>(sep: Parser<I, S, U>, p: Parser<I, T, U>) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    S: 'static,
    T: Clone + 'static,
    U: 'static,
{
    cons(p.clone(), many(next(sep, p)))
}

/// `p` separated by `sep`, zero or more.
pub fn sep_by<I, S, T, U>(sep: Parser<I, S, U>, p: Parser<I, T, U>) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    S: 'static,
    T: Clone + 'static,
    U: 'static,
{
    optional(sep_by1(sep, p), Stream::empty())
}

/// `p` separated by `sep` with an optional trailing separator, one or more.
pub fn sep_end_by1<I, S, T, U>(
    sep: Parser<I, S, U>,
    p: Parser<I, T, U>,
) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    S: 'static,
    T: Clone + 'static,
    U: 'static,
{
    rec_parser("sep_end_by1", move |self_| {
        let rest = optional(
            next(sep, optional(self_, Stream::empty())),
            Stream::empty(),
        );
        cons(p, rest)
    })
}

/// `p` separated by `sep` with an optional trailing separator, zero or more.
pub fn sep_end_by<I, S, T, U>(
    sep: Parser<I, S, U>,
    p: Parser<I, T, U>,
) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    S: 'static,
    T: Clone + 'static,
    U: 'static,
{
    optional(sep_end_by1(sep, p), Stream::empty())
}

/// `p` each followed by `sep`, one or more: `(p sep)+`.
pub fn end_by1<I, S, T, U>(sep: Parser<I, S, U>, p: Parser<I, T, U>) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    S: 'static,
    T: Clone + 'static,
    U: 'static,
{
    many1(bind(p, move |value| next(sep.clone(), always(value))))
}

/// `p` each followed by `sep`, zero or more: `(p sep)*`.
pub fn end_by<I, S, T, U>(sep: Parser<I, S, U>, p: Parser<I, T, U>) -> Parser<I, Stream<T>, U>
where
    I: 'static,
    S: 'static,
    T: Clone + 'static,
    U: 'static,
{
    many(bind(p, move |value| next(sep.clone(), always(value))))
}

fn chainl_rest<I, T, U>(
    op: Parser<I, Binop<T>, U>,
    p: Parser<I, T, U>,
    acc: T,
) -> Parser<I, T, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    let step = {
        let op = op.clone();
        let p = p.clone();
        let acc = acc.clone();
        bind(op.clone(), move |f| {
            let op = op.clone();
            let p = p.clone();
            let acc = acc.clone();
            bind(p.clone(), move |y| {
                chainl_rest(op.clone(), p.clone(), f(acc.clone(), y))
            })
        })
    };
    optional(step, acc)
}

/// Left-associative operator chain: `p (op p)*`, folding as it goes.
pub fn chainl1<I, T, U>(op: Parser<I, Binop<T>, U>, p: Parser<I, T, U>) -> Parser<I, T, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    let op2 = op.clone();
    let p2 = p.clone();
    bind(p, move |x| chainl_rest(op2.clone(), p2.clone(), x))
}

/// [`chainl1`], or `default` when there is no first operand.
pub fn chainl<I, T, U>(
    op: Parser<I, Binop<T>, U>,
    p: Parser<I, T, U>,
    default: T,
) -> Parser<I, T, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    optional(chainl1(op, p), default)
}

/// Right-associative operator chain: `p (op chainr1)?`.
pub fn chainr1<I, T, U>(op: Parser<I, Binop<T>, U>, p: Parser<I, T, U>) -> Parser<I, T, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    rec_parser("chainr1", move |self_| {
        bind(p, move |x| {
            let rhs = bind(op.clone(), {
                let self_ = self_.clone();
                let x = x.clone();
                move |f| {
                    let x = x.clone();
                    map(self_.clone(), move |y| f(x.clone(), y))
                }
            });
            optional(rhs, x)
        })
    })
}

/// [`chainr1`], or `default` when there is no first operand.
pub fn chainr<I, T, U>(
    op: Parser<I, Binop<T>, U>,
    p: Parser<I, T, U>,
    default: T,
) -> Parser<I, T, U>
where
    I: 'static,
    T: Clone + 'static,
    U: 'static,
{
    optional(chainr1(op, p), default)
}
