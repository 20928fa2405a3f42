pub mod token;

use crate::diagnostics::CompileError;
use crate::span::{Span, Spanned};
use logos::Logos;
use token::Token;

/// Tokenize `source`, applying automatic semicolon insertion: a newline
/// following a token that can end a statement becomes an explicit `;`, and
/// all other newlines are dropped. The parser only ever sees `Semi`.
pub fn lex(source: &str) -> Result<Vec<Spanned<Token>>, CompileError> {
    let mut out: Vec<Spanned<Token>> = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(res) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start, range.end);
        let tok = res.map_err(|()| {
            CompileError::syntax(
                format!("unrecognized token {:?}", &source[range.clone()]),
                span,
            )
        })?;
        if tok == Token::Newline {
            if out.last().is_some_and(|t| t.node.ends_statement()) {
                out.push(Spanned::new(Token::Semi, span));
            }
            continue;
        }
        out.push(Spanned::new(tok, span));
    }
    // A file that does not end in a newline still terminates its last statement.
    if out.last().is_some_and(|t| t.node.ends_statement()) {
        let end = source.len();
        out.push(Spanned::new(Token::Semi, Span::new(end, end)));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        lex(src).unwrap().into_iter().map(|t| t.node).collect()
    }

    #[test]
    fn semicolons_inserted_after_statement_enders() {
        assert_eq!(
            kinds("x := 1\ny := 2\n"),
            vec![
                Token::Ident,
                Token::ColonEq,
                Token::Int,
                Token::Semi,
                Token::Ident,
                Token::ColonEq,
                Token::Int,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn no_semicolon_after_operators() {
        // A binary expression may continue on the next line.
        assert_eq!(
            kinds("x +\n1\n"),
            vec![Token::Ident, Token::Plus, Token::Int, Token::Semi]
        );
    }

    #[test]
    fn close_brace_gets_semicolon() {
        assert_eq!(
            kinds("if x {\n}\n"),
            vec![
                Token::If,
                Token::Ident,
                Token::LBrace,
                Token::RBrace,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn brace_else_same_line_keeps_flowing() {
        let toks = kinds("if x {\n} else {\n}\n");
        assert!(!toks
            .windows(2)
            .any(|w| w[0] == Token::Semi && w[1] == Token::Else));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("x // trailing\n/* block */ y\n"),
            vec![Token::Ident, Token::Semi, Token::Ident, Token::Semi]
        );
    }

    #[test]
    fn eof_terminates_last_statement() {
        assert_eq!(kinds("x := 1"), kinds("x := 1\n"));
    }

    #[test]
    fn bad_token_is_an_error() {
        assert!(lex("x := @").is_err());
    }
}
