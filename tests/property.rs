//! Property tests over the public front end: the lexer never panics, and
//! the printer is a fixed point of parse-then-print.

use mino::parser::ast::Ast;
use mino::{lexer, parser, pretty};
use proptest::prelude::*;
use std::path::Path;

fn print_fixed_point(src: &str) {
    let mut ast = Ast::new();
    let fid = parser::parse_file(&mut ast, src, Path::new("t.mino"), 0).unwrap();
    let once = pretty::file_to_string(&ast, fid, pretty::Mode::Raw);
    let mut ast2 = Ast::new();
    let fid2 = parser::parse_file(&mut ast2, &once, Path::new("t.mino"), 0)
        .unwrap_or_else(|e| panic!("printed output failed to parse: {:?}\n{}", e, once));
    let twice = pretty::file_to_string(&ast2, fid2, pretty::Mode::Raw);
    assert_eq!(once, twice);
}

proptest! {
    #[test]
    fn lexer_never_panics(src in "[ -~\t\n]{0,120}") {
        let _ = lexer::lex(&src);
    }

    #[test]
    fn printed_composites_round_trip(elems in proptest::collection::vec(-100i64..100, 0..6)) {
        let list = elems
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let src = format!(
            "package main\n\nfunc main() {{\n\ta := []int{{{}}}\n\tprint(len(a))\n}}\n",
            list
        );
        print_fixed_point(&src);
    }

    #[test]
    fn printed_arithmetic_round_trips(a in -100i64..100, b in -100i64..100, c in -100i64..100) {
        let src = format!(
            "package main\n\nfunc main() {{\n\tprint({} + {}*({} - 1))\n}}\n",
            a, b, c
        );
        print_fixed_point(&src);
    }
}
