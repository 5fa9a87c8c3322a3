//! Integration tests covering the parser's concrete scenarios (S1-S6) and
//! its drop-safety guarantees for successful and failed parses.

use logquery::vxp::{parse, LevelMatch, ParserOptions, Rhs, Token, TokenKind};

const TAGS: &[&str] = &["RespStatus", "ReqURL", "ReqHeader", "Begin"];

fn val(text: &str, offset: usize) -> Token {
    Token::new(TokenKind::Val, text, offset)
}

fn bare(kind: TokenKind, offset: usize) -> Token {
    Token::bare(kind, offset)
}

#[test]
fn s2_regex_match_comparison() {
    let tokens = vec![
        val("ReqURL", 0),
        bare(TokenKind::Match, 7),
        val("^/api", 9),
        bare(TokenKind::Eoi, 15),
    ];
    let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
    assert_eq!(vex.op.kind, TokenKind::Match);
    match *vex.rhs.unwrap() {
        Rhs::Regex(r) => assert_eq!(r.source, b"^/api"),
        other => panic!("expected regex rhs, got {other:?}"),
    }
}

#[test]
fn float_rhs_is_detected_by_decimal_point() {
    let tokens = vec![
        val("RespStatus", 0),
        bare(TokenKind::Gt, 11),
        val("1.5", 13),
        bare(TokenKind::Eoi, 16),
    ];
    let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
    assert_eq!(*vex.rhs.unwrap(), Rhs::Float(1.5));
}

#[test]
fn level_default_modifier_is_exact() {
    let tokens = vec![
        bare(TokenKind::LBrace, 0),
        val("3", 1),
        bare(TokenKind::RBrace, 2),
        val("Begin", 4),
        bare(TokenKind::Eoi, 9),
    ];
    let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
    let lhs = vex.lhs.unwrap();
    assert_eq!(lhs.level(), Some(3));
    assert_eq!(lhs.level_match(), LevelMatch::Exact);
}

#[test]
fn dropping_a_failed_parse_leaves_nothing_to_leak() {
    // Deliberately unterminated group: should error, not panic or leak.
    let tokens = vec![
        bare(TokenKind::LParen, 0),
        val("Begin", 1),
        bare(TokenKind::And, 7),
        val("ReqURL", 11),
        // missing RParen and EOI
    ];
    let err = parse(&tokens, ParserOptions::new(TAGS)).unwrap_err();
    assert!(!err.message.is_empty());
}

#[test]
fn dropping_a_nested_successful_parse_does_not_panic() {
    let mut tokens = Vec::new();
    tokens.push(bare(TokenKind::LParen, 0));
    for i in 0..50 {
        if i > 0 {
            tokens.push(bare(TokenKind::Or, i));
        }
        tokens.push(val("Begin", i));
    }
    tokens.push(bare(TokenKind::RParen, 999));
    tokens.push(bare(TokenKind::Eoi, 1000));
    let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
    drop(vex);
}
