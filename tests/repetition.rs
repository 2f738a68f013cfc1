use bounce::{
    always, any_token, append, binds, character, eager, many, many1, run, sequence, times, Parser,
};

fn ch(c: char) -> Parser<char, char> {
    character(c)
}

#[test]
fn sequence_collects_in_order() {
    let p = eager(sequence([ch('a'), ch('b'), ch('c')]));
    assert_eq!(run(&p, "abc".chars()), Ok(vec!['a', 'b', 'c']));
}

#[test]
fn sequence_fails_if_any_element_fails() {
    let p = eager(sequence([ch('a'), ch('b')]));
    assert!(run(&p, "ax".chars()).is_err());
}

#[test]
fn empty_sequence_accepts_anything() {
    let p = eager(sequence(Vec::<Parser<char, char>>::new()));
    assert_eq!(run(&p, "xyz".chars()), Ok(vec![]));
}

#[test]
fn many_accepts_zero() {
    let p = eager(many(ch('a')));
    assert_eq!(run(&p, "".chars()), Ok(vec![]));
    assert_eq!(run(&p, "b".chars()), Ok(vec![]));
}

#[test]
fn many_collects_all_matches() {
    let p = eager(many(ch('a')));
    assert_eq!(run(&p, "aaa".chars()), Ok(vec!['a', 'a', 'a']));
    assert_eq!(run(&p, "aab".chars()), Ok(vec!['a', 'a']));
}

#[test]
fn many1_requires_at_least_one() {
    let p = eager(many1(ch('a')));
    assert_eq!(run(&p, "aa".chars()), Ok(vec!['a', 'a']));
    assert!(run(&p, "".chars()).is_err());
    assert!(run(&p, "b".chars()).is_err());
}

#[test]
#[should_panic(expected = "accepts an empty string")]
fn many_over_empty_accepting_parser_is_a_defect() {
    let p = eager(many(always::<char, char, ()>('x')));
    let _ = run(&p, "abc".chars());
}

#[test]
fn append_concatenates_results() {
    let p = eager(append(
        sequence([ch('a'), ch('b')]),
        sequence([ch('c')]),
    ));
    assert_eq!(run(&p, "abc".chars()), Ok(vec!['a', 'b', 'c']));
}

#[test]
fn times_takes_exactly_n() {
    let p: Parser<char, Vec<char>> = eager(times(3, any_token()));
    assert_eq!(run(&p, "abcd".chars()), Ok(vec!['a', 'b', 'c']));
    assert!(run(&p, "ab".chars()).is_err());
}

#[test]
fn binds_hands_over_materialized_results() {
    let p = binds(sequence([ch('a'), ch('b')]), |values| always(values.len()));
    assert_eq!(run(&p, "ab".chars()), Ok(2));
}

#[test]
fn deep_repetition_does_not_overflow_the_stack() {
    let input: String = "a".repeat(100_000);
    let p = eager(many(ch('a')));
    let parsed = run(&p, input.chars()).unwrap();
    assert_eq!(parsed.len(), 100_000);
}
