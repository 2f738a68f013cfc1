use std::cell::Cell;
use std::rc::Rc;

use bounce::{
    attempt, backtrack, bind, character, either, get_input, get_parser_state, get_position,
    get_state, map, memo, modify_state, next, run, run_stream, set_input, set_parser_state,
    set_position, string, token, ParseError, Parser, ParserState, Position, Stream,
};

fn ch(c: char) -> Parser<char, char> {
    character(c)
}

/// A character parser whose predicate counts how often the underlying
/// parser actually runs; memo replays must not increment it.
fn counting_char(c: char, runs: Rc<Cell<usize>>) -> Parser<char, char> {
    token(
        move |tok: &char| {
            runs.set(runs.get() + 1);
            *tok == c
        },
        move |position, _found| ParseError::expect(position, format!("'{c}'")),
    )
}

#[test]
fn user_state_threads_through_the_parse() {
    let p: Parser<char, i32, i32> = next(modify_state(|n: &i32| n + 1), get_state());
    assert_eq!(run_stream(&p, Stream::from(""), 41), Ok(42));
}

#[test]
fn state_setters_report_the_new_state() {
    let target = Position::initial().increment(&'x');
    let p: Parser<char, usize, ()> =
        map(set_position(target), |state| state.position().index());
    assert_eq!(run(&p, "ab".chars()), Ok(1));
}

#[test]
fn get_position_reflects_consumption() {
    let p = next(ch('a'), get_position());
    assert_eq!(
        run(&p, "ab".chars()),
        Ok(Position::initial().increment(&'a'))
    );
}

#[test]
fn set_input_replaces_input() {
    let p = next(
        set_input(Stream::from("xy")),
        bind(get_input(), |input: Stream<char>| {
            map(get_state(), move |user: i32| (input.to_vec(), user))
        }),
    );
    assert_eq!(
        run_stream(&p, Stream::from("abc"), 7),
        Ok((vec!['x', 'y'], 7))
    );
}

#[test]
fn parser_state_can_be_captured_and_restored() {
    let p = bind(get_parser_state(), |st: ParserState<char, ()>| {
        map(set_parser_state(st.clone()), move |restored| restored == st)
    });
    assert_eq!(run(&p, "x".chars()), Ok(true));
}

#[test]
fn memo_is_observationally_transparent() {
    for input in ["ab", "a", "", "abx"] {
        let plain: Parser<char, String> = string("ab");
        let cached: Parser<char, String> = memo(string("ab"));
        assert_eq!(
            run(&plain, input.chars()),
            run(&cached, input.chars()),
            "diverged on {input:?}"
        );
    }
}

#[test]
fn memo_replays_success_without_rerunning() {
    let runs = Rc::new(Cell::new(0));
    let cached = memo(counting_char('a', Rc::clone(&runs)));
    // First branch: 'a' consumed, then 'z' fails, attempt backtracks.
    // Second branch retries the same memoized parser at position 0.
    let p = either(
        attempt(next(cached.clone(), ch('z'))),
        next(cached, ch('b')),
    );
    assert_eq!(run(&p, "ab".chars()), Ok('b'));
    assert_eq!(runs.get(), 1);
}

#[test]
fn memo_replays_failure_without_rerunning() {
    let runs = Rc::new(Cell::new(0));
    let cached = memo(counting_char('q', Rc::clone(&runs)));
    let p = either(cached.clone(), cached);
    assert!(run(&p, "a".chars()).is_err());
    assert_eq!(runs.get(), 1);
}

#[test]
fn failed_alternative_memo_survives_into_next() {
    // Entries recorded inside a failed first alternative are visible to the
    // second alternative.
    let runs = Rc::new(Cell::new(0));
    let cached = memo(counting_char('a', Rc::clone(&runs)));
    let p = either(
        attempt(next(cached.clone(), ch('z'))),
        next(cached, ch('b')),
    );
    let _ = run(&p, "ab".chars());
    assert_eq!(runs.get(), 1);
}

#[test]
fn backtrack_discards_memo_entries() {
    let runs = Rc::new(Cell::new(0));
    let cached = memo(counting_char('a', Rc::clone(&runs)));
    // backtrack forwards the caller's memo, so the entry recorded inside the
    // failed first branch is gone and the second branch runs the parser
    // again.
    let p = either(
        backtrack(attempt(next(cached.clone(), ch('z')))),
        next(cached, ch('b')),
    );
    assert_eq!(run(&p, "ab".chars()), Ok('b'));
    assert_eq!(runs.get(), 2);
}

#[test]
fn memo_keys_by_position() {
    let runs = Rc::new(Cell::new(0));
    let cached = memo(counting_char('a', Rc::clone(&runs)));
    // Two uses at different positions are two distinct keys.
    let p = next(cached.clone(), cached);
    assert_eq!(run(&p, "aa".chars()), Ok('a'));
    assert_eq!(runs.get(), 2);
}
