use std::process;
use std::rc::Rc;

use bounce::{
    always, bind, chainl1, character, choice, digit, eager, eof, many1, map, next, run, Binop,
    Parser,
};

const INPUT: &str = "1+2*3-4";

fn number() -> Parser<char, i64> {
    map(eager(many1(digit())), |digits| {
        digits
            .into_iter()
            .collect::<String>()
            .parse()
            .expect("digits form a number")
    })
}

fn add_op() -> Parser<char, Binop<i64>> {
    choice([
        map(character('+'), |_| Rc::new(|a, b| a + b) as Binop<i64>),
        map(character('-'), |_| Rc::new(|a, b| a - b) as Binop<i64>),
    ])
}

fn mul_op() -> Parser<char, Binop<i64>> {
    map(character('*'), |_| Rc::new(|a, b| a * b) as Binop<i64>)
}

fn expression() -> Parser<char, i64> {
    let term = chainl1(mul_op(), number());
    let sum = chainl1(add_op(), term);
    bind(sum, |value| next(eof(), always(value)))
}

fn main() -> anyhow::Result<()> {
    let parser = expression();

    let value = match run(&parser, INPUT.chars()) {
        Ok(value) => value,
        Err(e) => {
            println!("{e}");
            process::exit(-1);
        }
    };

    println!("{INPUT} = {value}");

    Ok(())
}
