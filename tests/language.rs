use std::rc::Rc;

use rstest::rstest;

use bounce::{
    between, chainl, chainl1, chainr1, character, digit, eager, end_by, letter, map, next, one_of,
    run, sep_by, sep_by1, sep_end_by, sep_end_by1, spaces, string, trie, Binop, Parser,
};

fn ch(c: char) -> Parser<char, char> {
    character(c)
}

fn comma() -> Parser<char, char> {
    character(',')
}

#[rstest]
#[case("a,a,", vec!['a', 'a'])]
#[case("a,a", vec!['a', 'a'])]
#[case("a", vec!['a'])]
#[case("", vec![])]
fn sep_end_by_accepts_optional_trailing_separator(
    #[case] input: &str,
    #[case] expected: Vec<char>,
) {
    let p = eager(sep_end_by(comma(), ch('a')));
    assert_eq!(run(&p, input.chars()), Ok(expected));
}

#[test]
fn sep_end_by_leaves_following_input() {
    let p = next(eager(sep_end_by(comma(), ch('a'))), ch('z'));
    assert_eq!(run(&p, "a,a,z".chars()), Ok('z'));
}

#[test]
fn sep_end_by1_rejects_empty_input() {
    let p = eager(sep_end_by1(comma(), ch('a')));
    assert!(run(&p, "".chars()).is_err());
    assert_eq!(run(&p, "a,".chars()), Ok(vec!['a']));
}

#[test]
fn sep_by_accepts_empty_input() {
    let p = eager(sep_by(comma(), ch('a')));
    assert_eq!(run(&p, "".chars()), Ok(vec![]));
}

#[test]
fn sep_by_commits_after_a_separator() {
    // Consuming a separator commits to another element; a trailing
    // separator is a consumed failure, unlike sep_end_by.
    let p = eager(sep_by(comma(), ch('a')));
    assert!(run(&p, "a,".chars()).is_err());
    assert_eq!(run(&p, "a,a".chars()), Ok(vec!['a', 'a']));
}

#[test]
fn sep_by1_requires_first_element() {
    let p = eager(sep_by1(comma(), ch('a')));
    assert!(run(&p, ",a".chars()).is_err());
    assert_eq!(run(&p, "a,a".chars()), Ok(vec!['a', 'a']));
}

#[test]
fn end_by_requires_each_terminating_separator() {
    let p = eager(end_by(comma(), ch('a')));
    assert_eq!(run(&p, "a,a,".chars()), Ok(vec!['a', 'a']));
    assert_eq!(run(&p, "".chars()), Ok(vec![]));
    // An element without its separator is a consumed failure.
    assert!(run(&p, "a".chars()).is_err());
}

#[test]
fn chain_defaults_when_no_operand() {
    let minus: Parser<char, Binop<i64>> =
        map(character('-'), |_| Rc::new(|a, b| a - b) as Binop<i64>);
    let p = chainl(minus, number(), 0);
    assert_eq!(run(&p, "".chars()), Ok(0));
}

#[test]
fn between_yields_inner_value() {
    let p = between(ch('('), ch(')'), ch('x'));
    assert_eq!(run(&p, "(x)".chars()), Ok('x'));
    assert!(run(&p, "(x".chars()).is_err());
}

fn number() -> Parser<char, i64> {
    map(eager(bounce::many1(digit())), |digits| {
        digits
            .into_iter()
            .collect::<String>()
            .parse()
            .expect("digits form a number")
    })
}

#[test]
fn chainl1_folds_left() {
    let minus: Parser<char, Binop<i64>> =
        map(character('-'), |_| Rc::new(|a, b| a - b) as Binop<i64>);
    let p = chainl1(minus, number());
    // (10 - 3) - 2, not 10 - (3 - 2)
    assert_eq!(run(&p, "10-3-2".chars()), Ok(5));
}

#[test]
fn chainr1_folds_right() {
    let pow: Parser<char, Binop<i64>> =
        map(character('^'), |_| Rc::new(|a: i64, b: i64| a.pow(b as u32)) as Binop<i64>);
    let p = chainr1(pow, number());
    // 2 ^ (3 ^ 2), not (2 ^ 3) ^ 2
    assert_eq!(run(&p, "2^3^2".chars()), Ok(512));
}

#[test]
fn spaces_and_classes() {
    let word: Parser<char, Vec<char>> = eager(bounce::many1(letter()));
    let p = next(spaces(), map(word, |cs| cs.into_iter().collect::<String>()));
    assert_eq!(run(&p, "   hello".chars()), Ok("hello".to_string()));
}

#[test]
fn one_of_matches_any_listed_character() {
    let p: Parser<char, char> = one_of("+-*");
    assert_eq!(run(&p, "-".chars()), Ok('-'));
    assert!(run(&p, "/".chars()).is_err());
}

#[rstest]
#[case("do", "do")]
#[case("dog", "dog")]
#[case("done", "done")]
fn trie_prefers_longest_match(#[case] input: &str, #[case] expected: &str) {
    let p: Parser<char, String> = trie(&["do", "dog", "done"]);
    assert_eq!(run(&p, input.chars()), Ok(expected.to_string()));
}

#[test]
fn trie_backtracks_between_branches() {
    // "don" shares a prefix with "done" but only "do" matches here.
    let p: Parser<char, String> = trie(&["do", "done"]);
    assert_eq!(run(&p, "don".chars()), Ok("do".to_string()));
}

#[test]
fn string_requires_full_match() {
    let p: Parser<char, String> = string("abc");
    assert_eq!(run(&p, "abc".chars()), Ok("abc".to_string()));
    assert!(run(&p, "abx".chars()).is_err());
}
