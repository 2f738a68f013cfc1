//! Character-level helpers: single characters, literal strings, character
//! classes, and a prefix-tree matcher for sets of keywords.

use std::collections::BTreeMap;

use crate::combinators::{always, attempt, choice, many, map, next, token};
use crate::error::{ParseError, ParserError};
use crate::machine::Parser;
use crate::state::Position;

fn class_error(label: String, position: Position, found: Option<&char>) -> ParseError {
    match found {
        Some(tok) => ParseError::expect_found(position, label, format!("'{tok}'")),
        None => ParseError::expect_found(position, label, "end of input"),
    }
}

/// Match exactly the character `expected`.
pub fn character<U>(expected: char) -> Parser<char, char, U>
where
    U: Clone + 'static,
{
    token(
        move |tok: &char| *tok == expected,
        move |position, found| class_error(format!("'{expected}'"), position, found),
    )
}

/// Match any character in `options`.
pub fn one_of<U>(options: &str) -> Parser<char, char, U>
where
    U: Clone + 'static,
{
    let set: String = options.to_string();
    let label = format!("one of {options:?}");
    token(
        move |tok: &char| set.contains(*tok),
        move |position, found| class_error(label.clone(), position, found),
    )
}

pub fn letter<U>() -> Parser<char, char, U>
where
    U: Clone + 'static,
{
    token(
        |tok: &char| tok.is_alphabetic(),
        |position, found| class_error("letter".to_string(), position, found),
    )
}

pub fn digit<U>() -> Parser<char, char, U>
where
    U: Clone + 'static,
{
    token(
        |tok: &char| tok.is_ascii_digit(),
        |position, found| class_error("digit".to_string(), position, found),
    )
}

pub fn space<U>() -> Parser<char, char, U>
where
    U: Clone + 'static,
{
    token(
        |tok: &char| tok.is_whitespace(),
        |position, found| class_error("whitespace".to_string(), position, found),
    )
}

/// Skip any amount of whitespace.
pub fn spaces<U>() -> Parser<char, (), U>
where
    U: Clone + 'static,
{
    map(many(space()), |_| ())
}

/// Match the literal `word`, character by character.
///
/// Commits as soon as the first character matches: failing midway is a
/// consumed error, recoverable only through `attempt`.
pub fn string<U>(word: impl Into<String>) -> Parser<char, String, U>
where
    U: Clone + 'static,
{
    let word: String = word.into();
    let mut seq: Parser<char, (), U> = always(());
    for c in word.chars() {
        seq = next(seq, map(character(c), |_| ()));
    }
    let value = word.clone();
    map(seq, move |_| value.clone()).with_name(format!("string({word:?})"))
}

fn trie_node<U>(prefix: String, suffixes: Vec<String>) -> Parser<char, String, U>
where
    U: Clone + 'static,
{
    let mut branches: BTreeMap<char, Vec<String>> = BTreeMap::new();
    let mut terminal = false;
    for suffix in suffixes {
        match suffix.chars().next() {
            None => terminal = true,
            Some(c) => branches
                .entry(c)
                .or_default()
                .push(suffix[c.len_utf8()..].to_string()),
        }
    }
    let mut alternatives: Vec<Parser<char, String, U>> = branches
        .into_iter()
        .map(|(c, rest)| {
            let mut deeper = prefix.clone();
            deeper.push(c);
            attempt(next(character(c), trie_node(deeper, rest)))
        })
        .collect();
    // Terminal comes last so longer words win over their prefixes.
    if terminal {
        alternatives.push(always(prefix));
    }
    choice(alternatives)
}

/// Match any of `words`, sharing common prefixes and preferring the longest
/// match. Branches backtrack against each other, so words may overlap
/// freely.
pub fn trie<U>(words: &[&str]) -> Parser<char, String, U>
where
    U: Clone + 'static,
{
    if words.is_empty() {
        ParserError::new("trie requires at least one word").raise();
    }
    let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    trie_node(String::new(), words).with_name("trie")
}
