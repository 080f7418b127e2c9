//! Lexer edge cases and error tests.

use tokimun::{LexErrorKind, TokenKind, tokenize};

fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
        .expect("tokenize")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

// -----------------------------------------------------------
// Basic lexer behaviour.
// -----------------------------------------------------------

#[test]
fn lex_empty_input() {
    assert_eq!(kinds(""), [TokenKind::Eof]);
}

#[test]
fn lex_only_whitespace_and_comments() {
    assert_eq!(
        kinds("  \t\n-- note\n--[==[ long\n]] still ]==]\n"),
        [TokenKind::Eof]
    );
}

#[test]
fn lex_eof_span_after_last_line() {
    let tokens = tokenize("x\n").expect("tokenize");
    let eof = tokens.last().expect("eof");
    assert_eq!(eof.kind, TokenKind::Eof);
    assert_eq!(eof.span.line, 2);
}

#[test]
fn lex_statement_mix() {
    assert_eq!(
        kinds("local t = {a = 1}\nt.a += #t"),
        [
            TokenKind::Local,
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::LBrace,
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::Number,
            TokenKind::RBrace,
            TokenKind::Identifier,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::PlusAssign,
            TokenKind::Hash,
            TokenKind::Identifier,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lex_labels_and_goto() {
    assert_eq!(
        kinds("::top:: goto top"),
        [
            TokenKind::DoubleColon,
            TokenKind::Identifier,
            TokenKind::DoubleColon,
            TokenKind::Goto,
            TokenKind::Identifier,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lex_template_with_nested_braces() {
    let tokens = tokenize("`n = ${ {1, 2}[1] }`").expect("tokenize");
    assert_eq!(tokens[0].kind, TokenKind::TemplateString);
    assert_eq!(tokens[0].text, "`n = ${ {1, 2}[1] }`");
    assert_eq!(tokens[1].kind, TokenKind::Eof);
}

#[test]
fn lex_template_escaped_backtick() {
    let tokens = tokenize(r"`a\`b`").expect("tokenize");
    assert_eq!(tokens[0].text, r"`a\`b`");
}

#[test]
fn lex_long_string_spans_lines() {
    let tokens = tokenize("s = [==[\nline ]] one\n]==] x").expect("tokenize");
    assert_eq!(tokens[2].kind, TokenKind::String);
    assert_eq!(tokens[2].text, "[==[\nline ]] one\n]==]");
    assert_eq!(tokens[3].span.line, 3);
}

#[test]
fn lex_number_forms() {
    for numeral in ["0", "42", "3.25", ".5", "1e10", "2E-3", "0xff", "0b11", "0o777"] {
        let tokens = tokenize(numeral).expect("tokenize");
        assert_eq!(tokens[0].kind, TokenKind::Number, "{numeral}");
        assert_eq!(tokens[0].text, numeral);
    }
}

#[test]
fn lex_concat_after_number() {
    assert_eq!(
        kinds("1 .. 2"),
        [
            TokenKind::Number,
            TokenKind::DotDot,
            TokenKind::Number,
            TokenKind::Eof
        ]
    );
}

// -----------------------------------------------------------
// Errors.
// -----------------------------------------------------------

#[test]
fn lex_unterminated_string_at_newline() {
    let err = tokenize("x = 'abc\ny = 1").unwrap_err();
    assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    assert_eq!((err.span.line, err.span.column), (1, 5));
}

#[test]
fn lex_unterminated_string_reports_its_own_line() {
    let mut input = String::from("a = 1\nb = 2\nc = 3\nd = 4\ne = \"open\n");
    for i in 0..50 {
        input.push_str(&format!("x{i} = {i}\n"));
    }
    let err = tokenize(&input).unwrap_err();
    assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    assert_eq!(err.span.line, 5);
}

#[test]
fn lex_unterminated_long_string() {
    let err = tokenize("s = [[ never").unwrap_err();
    assert_eq!(err.kind, LexErrorKind::UnterminatedLongString);
}

#[test]
fn lex_unterminated_long_comment() {
    let err = tokenize("x = 1\n--[[ open").unwrap_err();
    assert_eq!(err.kind, LexErrorKind::UnterminatedLongComment);
    assert_eq!(err.span.line, 2);
}

#[test]
fn lex_unterminated_template() {
    let err = tokenize("s = `abc").unwrap_err();
    assert_eq!(err.kind, LexErrorKind::UnterminatedTemplate);
}

#[test]
fn lex_malformed_octal() {
    let err = tokenize("x = 0o8").unwrap_err();
    assert_eq!(err.kind, LexErrorKind::MalformedNumber("0o8".to_string()));
}

#[test]
fn lex_tilde_alone_suggests_not_equal() {
    let err = tokenize("a ~ b").unwrap_err();
    assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('~'));
    assert!(err.to_string().contains("~="));
}

#[test]
fn lex_unknown_character() {
    let err = tokenize("x = 1 @ 2").unwrap_err();
    assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('@'));
    assert_eq!((err.span.line, err.span.column), (1, 7));
    assert_eq!(
        err.to_string(),
        "unexpected character: @ at line 1, column 7"
    );
}
