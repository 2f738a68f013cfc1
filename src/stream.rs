//! # Lazy Input Streams
//!
//! The engine reads its input through `Stream<T>`: an immutable,
//! reference-counted cons list whose tail may be a memoized suspension.
//! Parsers never index into a buffer; they hold a stream value and ask for
//! `first`/`rest`, so backtracking is just keeping an older stream alive.
//!
//! Suspensions (`Stream::suspend`, `Stream::memo_stream`) are forced at most
//! once. This is what lets `run_many` hand back an unbounded sequence of
//! parse results without parsing ahead of the consumer.

use std::cell::RefCell;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

enum Node<T> {
    Cons(T, Stream<T>),
    Lazy(Susp<T>),
}

struct Susp<T> {
    forced: OnceCell<Stream<T>>,
    thunk: RefCell<Option<Box<dyn FnOnce() -> Stream<T>>>>,
}

/// An immutable lazy sequence of tokens.
///
/// The empty stream doubles as the end-of-input marker: where the engine
/// needs "there is nothing left", it checks `is_empty` rather than comparing
/// against a sentinel token.
pub struct Stream<T> {
    node: Option<Rc<Node<T>>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Stream {
            node: self.node.clone(),
        }
    }
}

impl<T> Stream<T> {
    /// The empty stream.
    pub fn empty() -> Self {
        Stream { node: None }
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Prepend a value to a stream.
    pub fn cons(value: T, rest: Stream<T>) -> Self {
        Stream {
            node: Some(Rc::new(Node::Cons(value, rest))),
        }
    }

    /// A stream whose contents are computed on first access and cached.
    pub fn suspend<F>(f: F) -> Self
    where
        F: FnOnce() -> Stream<T> + 'static,
    {
        Stream {
            node: Some(Rc::new(Node::Lazy(Susp {
                forced: OnceCell::new(),
                thunk: RefCell::new(Some(Box::new(f))),
            }))),
        }
    }

    /// Lazy cons: a known first element in front of a suspended rest.
    pub fn memo_stream<F>(value: T, rest: F) -> Self
    where
        F: FnOnce() -> Stream<T> + 'static,
    {
        Stream::cons(value, Stream::suspend(rest))
    }

    /// Build a stream that pulls from `iter` on demand.
    pub fn from_iter_lazy<It>(iter: It) -> Self
    where
        It: Iterator<Item = T> + 'static,
    {
        Stream::suspend(move || {
            let mut iter = iter;
            match iter.next() {
                None => Stream::empty(),
                Some(value) => Stream::memo_stream(value, move || Stream::from_iter_lazy(iter)),
            }
        })
    }

    /// Resolve suspensions until the head of the stream is concrete.
    fn force(&self) -> Stream<T> {
        let mut current = self.clone();
        loop {
            let next = match current.node.as_deref() {
                Some(Node::Lazy(susp)) => susp
                    .forced
                    .get_or_init(|| {
                        let thunk = susp
                            .thunk
                            .borrow_mut()
                            .take()
                            .expect("lazy stream forced from within its own thunk");
                        thunk()
                    })
                    .clone(),
                _ => return current,
            };
            current = next;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.force().node.is_none()
    }

    /// The head token, if any.
    pub fn first(&self) -> Option<T> {
        match self.force().node.as_deref() {
            Some(Node::Cons(value, _)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Everything after the head. The rest of an empty stream is empty.
    pub fn rest(&self) -> Stream<T> {
        match self.force().node.as_deref() {
            Some(Node::Cons(_, rest)) => rest.clone(),
            _ => Stream::empty(),
        }
    }

    /// Concatenate two streams without forcing `a` beyond its head.
    pub fn append(a: Stream<T>, b: Stream<T>) -> Stream<T> {
        let forced = a.force();
        match forced.node.as_deref() {
            None => b,
            Some(Node::Cons(value, rest)) => {
                let (value, rest) = (value.clone(), rest.clone());
                Stream::memo_stream(value, move || Stream::append(rest, b))
            }
            Some(Node::Lazy(_)) => unreachable!("force returned a suspension"),
        }
    }

    /// Materialize the whole stream, in order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::new();
        let mut current = self.clone();
        loop {
            let forced = current.force();
            match forced.node.as_deref() {
                Some(Node::Cons(value, rest)) => {
                    out.push(value.clone());
                    current = rest.clone();
                }
                _ => return out,
            }
        }
    }

    pub fn iter(&self) -> StreamIter<T> {
        StreamIter {
            current: self.clone(),
        }
    }
}

pub struct StreamIter<T> {
    current: Stream<T>,
}

impl<T: Clone + 'static> Iterator for StreamIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let value = self.current.first()?;
        self.current = self.current.rest();
        Some(value)
    }
}

impl<T: Clone + 'static> FromIterator<T> for Stream<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Stream::empty(), |rest, value| Stream::cons(value, rest))
    }
}

impl From<&str> for Stream<char> {
    fn from(s: &str) -> Self {
        s.chars().collect()
    }
}

// A long stream is a deep chain of Rc nodes; the derived drop would recurse
// once per cell. Unlink iteratively instead, stopping at any shared tail.
impl<T> Drop for Stream<T> {
    fn drop(&mut self) {
        let mut current = self.node.take();
        while let Some(rc) = current {
            match Rc::try_unwrap(rc) {
                Ok(Node::Cons(_value, mut rest)) => current = rest.node.take(),
                Ok(Node::Lazy(susp)) => {
                    current = susp.forced.into_inner().and_then(|mut s| s.node.take());
                }
                Err(_shared) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_empty_stream() {
        let s: Stream<i32> = Stream::empty();
        assert!(s.is_empty());
        assert_eq!(s.first(), None);
        assert!(s.rest().is_empty());
    }

    #[test]
    fn test_cons_and_access() {
        let s = Stream::cons(1, Stream::cons(2, Stream::empty()));
        assert!(!s.is_empty());
        assert_eq!(s.first(), Some(1));
        assert_eq!(s.rest().first(), Some(2));
    }

    #[test]
    fn test_collect_and_to_vec() {
        let s: Stream<i32> = vec![1, 2, 3].into_iter().collect();
        assert_eq!(s.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_from_str() {
        let s = Stream::from("ab");
        assert_eq!(s.to_vec(), vec!['a', 'b']);
    }

    #[test]
    fn test_suspension_forced_once() {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        let s = Stream::memo_stream(1, move || {
            seen.set(seen.get() + 1);
            Stream::cons(2, Stream::empty())
        });
        assert_eq!(s.to_vec(), vec![1, 2]);
        assert_eq!(s.to_vec(), vec![1, 2]);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_lazy_iterator_pulls_on_demand() {
        let pulled = Rc::new(Cell::new(0));
        let seen = Rc::clone(&pulled);
        let s = Stream::from_iter_lazy((0..100).inspect(move |_| seen.set(seen.get() + 1)));
        assert_eq!(s.first(), Some(0));
        assert!(pulled.get() <= 2);
    }

    #[test]
    fn test_append() {
        let a: Stream<i32> = vec![1, 2].into_iter().collect();
        let b: Stream<i32> = vec![3].into_iter().collect();
        assert_eq!(Stream::append(a, b).to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_deep_stream_drops_without_overflow() {
        let s: Stream<u32> = (0..200_000).collect();
        assert_eq!(s.first(), Some(0));
        drop(s);
    }
}
