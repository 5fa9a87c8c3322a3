//! Recursive-descent parser: turns a token slice into a [`Vex`] tree.

use std::num::NonZeroU32;

use tracing::trace;

use crate::config::ParserOptions;
use crate::error::ParseError;

use super::glob::{self, GlobError};
use super::lhs::{Lhs, LevelMatch};
use super::rhs::{Rhs, RegexRhs};
use super::token::{Token, TokenKind};
use super::vex::Vex;

const NUMERIC_OPS: &[TokenKind] = &[
    TokenKind::Eq,
    TokenKind::Lt,
    TokenKind::Gt,
    TokenKind::Geq,
    TokenKind::Leq,
    TokenKind::Neq,
];

/// Parses `tokens` into a query AST.
///
/// Multiple `EOI`-terminated sub-queries at the outermost level (as
/// produced by incremental query composition) are combined with `or`; see
/// the parser's top-level chaining note below for the exact associativity.
pub fn parse<'a>(tokens: &'a [Token], options: ParserOptions<'a>) -> Result<Vex, ParseError> {
    trace!(tokens = tokens.len(), "vxp: parse entry");
    let mut parser = Parser {
        tokens,
        pos: 0,
        options,
        sb: String::new(),
    };
    let result = parser.parse_top_level();
    match &result {
        Ok(_) => trace!("vxp: parse exit, ok"),
        Err(e) => trace!(offset = e.offset, "vxp: parse exit, error"),
    }
    result
}

/// Cursor over a token slice with one-token lookahead.
///
/// `sb` plays the role of the original's diagnostic string builder: errors
/// are assembled into it before being wrapped into a [`ParseError`].
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    options: ParserOptions<'a>,
    sb: String,
}

impl<'a> Parser<'a> {
    fn err(&mut self, message: impl Into<String>, offset: usize) -> ParseError {
        self.sb.clear();
        self.sb.push_str(&message.into());
        ParseError::new(self.sb.clone(), offset)
    }

    fn err_eof(&mut self, message: impl Into<String>) -> ParseError {
        let offset = self.tokens.last().map(|t| t.offset).unwrap_or(0);
        self.err(message, offset)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn current_offset(&self) -> usize {
        self.peek().map(|t| t.offset).unwrap_or(0)
    }

    fn advance(&mut self) -> &'a Token {
        let tok = &self.tokens[self.pos];
        self.pos += 1;
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token, ParseError> {
        match self.peek() {
            Some(tok) if tok.kind == kind => Ok(self.advance()),
            Some(tok) => {
                let (kind_found, offset) = (tok.kind, tok.offset);
                Err(self.err(format!("expected {kind:?} but got {kind_found:?}"), offset))
            }
            None => Err(self.err_eof(format!("expected {kind:?} but input ended"))),
        }
    }

    fn expect_val(&mut self) -> Result<(String, usize), ParseError> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Val => {
                let tok = self.advance();
                Ok((tok.text.clone(), tok.offset))
            }
            Some(tok) => {
                let (kind, offset) = (tok.kind, tok.offset);
                Err(self.err(format!("expected a value but got {kind:?}"), offset))
            }
            None => Err(self.err_eof("expected a value but input ended")),
        }
    }

    /// `query := { EOI } expr_or EOI { { EOI } expr_or EOI }*`
    ///
    /// Each new sub-query becomes the left child of a fresh `Or`, and the
    /// previously accumulated tree becomes the right child — i.e. parsing
    /// `q1 <EOI> q2 <EOI> q3 <EOI>` yields `Or(a: q3, b: Or(a: q2, b: q1))`.
    /// This is preserved exactly rather than simplified to a left-fold.
    fn parse_top_level(&mut self) -> Result<Vex, ParseError> {
        let mut acc: Option<Vex> = None;
        loop {
            while self.peek_kind() == Some(TokenKind::Eoi) {
                self.advance();
            }
            if self.peek().is_none() {
                break;
            }
            let sub = self.expr_or()?;
            let eoi_offset = self.current_offset();
            self.expect(TokenKind::Eoi)?;
            acc = Some(match acc {
                None => sub,
                Some(prev) => Vex::binary(
                    Token::bare(TokenKind::Or, eoi_offset),
                    sub,
                    prev,
                    self.options.vex_options,
                ),
            });
            if self.peek().is_none() {
                break;
            }
        }
        acc.ok_or_else(|| self.err_eof("empty query"))
    }

    /// `expr_or := expr_and { 'or' expr_and }*`
    fn expr_or(&mut self) -> Result<Vex, ParseError> {
        let mut node = self.expr_and()?;
        while self.peek_kind() == Some(TokenKind::Or) {
            let op = self.advance().clone();
            let rhs = self.expr_and()?;
            node = Vex::binary(op, node, rhs, self.options.vex_options);
        }
        Ok(node)
    }

    /// `expr_and := expr_not { 'and' expr_not }*`
    fn expr_and(&mut self) -> Result<Vex, ParseError> {
        let mut node = self.expr_not()?;
        while self.peek_kind() == Some(TokenKind::And) {
            let op = self.advance().clone();
            let rhs = self.expr_not()?;
            node = Vex::binary(op, node, rhs, self.options.vex_options);
        }
        Ok(node)
    }

    /// `expr_not := [ 'not' ] expr_group`
    fn expr_not(&mut self) -> Result<Vex, ParseError> {
        if self.peek_kind() == Some(TokenKind::Not) {
            let op = self.advance().clone();
            let inner = self.expr_group()?;
            Ok(Vex::unary(op, inner, self.options.vex_options))
        } else {
            self.expr_group()
        }
    }

    /// `expr_group := '(' expr_or ')' | expr_cmp`
    fn expr_group(&mut self) -> Result<Vex, ParseError> {
        if self.peek_kind() == Some(TokenKind::LParen) {
            self.advance();
            let inner = self.expr_or()?;
            self.expect(TokenKind::RParen)?;
            Ok(inner)
        } else {
            self.expr_cmp()
        }
    }

    /// `expr_cmp := lhs [ op rhs ]`
    ///
    /// The bare-LHS shorthand (defaulting to a `Token::True` tag-presence
    /// node) only applies to a non-vxid LHS. A vxid selector always
    /// requires an operator, matching the original calling its vxid
    /// comparator unconditionally once the LHS is a vxid.
    fn expr_cmp(&mut self) -> Result<Vex, ParseError> {
        let lhs = self.parse_lhs()?;

        if !lhs.is_vxid() {
            match self.peek_kind() {
                Some(TokenKind::Eoi) | Some(TokenKind::And) | Some(TokenKind::Or) | Some(TokenKind::RParen) | None => {
                    let offset = self.current_offset();
                    return Ok(Vex::leaf(Token::bare(TokenKind::True, offset), lhs, None, self.options.vex_options));
                }
                _ => {}
            }
        }

        let op = self.expect_operator(lhs.is_vxid())?;
        let rhs = match op.kind {
            TokenKind::Eq | TokenKind::Lt | TokenKind::Gt | TokenKind::Geq | TokenKind::Leq | TokenKind::Neq => {
                let (text, offset) = self.expect_val()?;
                let value = Rhs::parse_numeric(&text, offset)?;
                if lhs.is_vxid() && !matches!(value, Rhs::Int(_)) {
                    return Err(self.err("vxid comparison requires an integer right-hand side", offset));
                }
                value
            }
            TokenKind::SEq | TokenKind::SNeq => {
                let (text, _offset) = self.expect_val()?;
                Rhs::Str(text.into_bytes())
            }
            TokenKind::Match | TokenKind::NoMatch => {
                let (text, offset) = self.expect_val()?;
                Rhs::Regex(RegexRhs::compile(&text, self.options.regex, offset)?)
            }
            _ => unreachable!("expect_operator only returns operator token kinds"),
        };

        Ok(Vex::leaf(op, lhs, Some(rhs), self.options.vex_options))
    }

    fn expect_operator(&mut self, is_vxid: bool) -> Result<Token, ParseError> {
        let expected = if is_vxid { "a vxid operator" } else { "an operator" };
        let tok = match self.peek() {
            Some(tok) => tok.clone(),
            None => return Err(self.err_eof(format!("expected {expected} but input ended"))),
        };
        let is_operator = matches!(
            tok.kind,
            TokenKind::Eq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Geq
                | TokenKind::Leq
                | TokenKind::Neq
                | TokenKind::SEq
                | TokenKind::SNeq
                | TokenKind::Match
                | TokenKind::NoMatch
        );
        if !is_operator || (is_vxid && !NUMERIC_OPS.contains(&tok.kind)) {
            return Err(self.err(format!("expected {expected} but got {:?}", tok.kind), tok.offset));
        }
        self.advance();
        Ok(tok)
    }

    /// `lhs := [ '{' INT [ '+' | '-' ] '}' ] tag { ',' tag }* [ ':' STRING ] [ '[' INT ']' ]`
    fn parse_lhs(&mut self) -> Result<Lhs, ParseError> {
        let mut lhs = Lhs::empty(self.options.tags.len());

        if self.peek_kind() == Some(TokenKind::LBrace) {
            self.advance();
            let (text, offset) = self.expect_val()?;
            let (level, level_match) = parse_level(&text, offset)?;
            lhs.set_level(level, level_match);
            self.expect(TokenKind::RBrace)?;
        }

        loop {
            match self.peek_kind() {
                Some(TokenKind::Vxid) => {
                    self.advance();
                    lhs.mark_vxid();
                }
                Some(TokenKind::Val) => {
                    let tok = self.advance();
                    let (glob, offset) = (tok.text.clone(), tok.offset);
                    match glob::expand(self.options.tags, &glob) {
                        Ok(indices) => {
                            let mut set = fixedbitset::FixedBitSet::with_capacity(self.options.tags.len());
                            for i in indices {
                                set.insert(i);
                            }
                            lhs.union_tags(&set);
                        }
                        Err(GlobError::ZeroMatches) => {
                            return Err(self.err(format!("tag name '{glob}' matches zero tags"), offset))
                        }
                        Err(GlobError::Ambiguous) => {
                            return Err(self.err(format!("tag name '{glob}' is ambiguous"), offset))
                        }
                        Err(GlobError::Malformed) => {
                            return Err(self.err(format!("syntax error in tag name '{glob}'"), offset))
                        }
                    }
                }
                Some(kind) => {
                    let offset = self.current_offset();
                    return Err(self.err(format!("expected a tag name but got {kind:?}"), offset));
                }
                None => return Err(self.err_eof("expected a tag name but input ended")),
            }
            if self.peek_kind() == Some(TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }

        if self.peek_kind() == Some(TokenKind::Colon) {
            self.advance();
            let (text, _offset) = self.expect_val()?;
            lhs.set_prefix(text.into_bytes());
        }

        if self.peek_kind() == Some(TokenKind::LBracket) {
            self.advance();
            let (text, offset) = self.expect_val()?;
            let field = parse_field(&text, offset)?;
            lhs.set_field(field);
            self.expect(TokenKind::RBracket)?;
        }

        if lhs.vxid_count() > 0
            && (lhs.vxid_count() > 1
                || lhs.level().is_some()
                || lhs.field().is_some()
                || lhs.prefix().is_some()
                || lhs.taglist_count() > 0)
        {
            let offset = self.current_offset();
            return Err(self.err("unexpected taglist selection for vxid", offset));
        }

        Ok(lhs)
    }
}

fn parse_level(text: &str, offset: usize) -> Result<(u32, LevelMatch), ParseError> {
    let negative = text.starts_with('-');
    let digits_start = usize::from(negative);
    let digits_end = text[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| digits_start + i)
        .unwrap_or(text.len());
    if digits_end == digits_start {
        return Err(ParseError::new(format!("expected integer got '{text}'"), offset));
    }
    let value: i64 = text[..digits_end]
        .parse()
        .map_err(|_| ParseError::new(format!("invalid level '{text}'"), offset))?;
    if value < 0 {
        return Err(ParseError::new("expected positive integer for level", offset));
    }
    let level_match = match &text[digits_end..] {
        "" => LevelMatch::Exact,
        "-" => LevelMatch::AtMost,
        "+" => LevelMatch::AtLeast,
        _ => return Err(ParseError::new(format!("syntax error in level limit '{text}'"), offset)),
    };
    Ok((value as u32, level_match))
}

fn parse_field(text: &str, offset: usize) -> Result<NonZeroU32, ParseError> {
    let value: i64 = text
        .parse()
        .map_err(|_| ParseError::new(format!("expected positive integer got '{text}'"), offset))?;
    if value <= 0 {
        return Err(ParseError::new("expected positive integer for field index", offset));
    }
    NonZeroU32::new(value as u32).ok_or_else(|| ParseError::new("field index out of range", offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserOptions;

    const TAGS: &[&str] = &["RespStatus", "ReqURL", "ReqHeader", "Begin"];

    fn tok(kind: TokenKind, text: &str, offset: usize) -> Token {
        Token::new(kind, text, offset)
    }

    fn eoi(offset: usize) -> Token {
        Token::bare(TokenKind::Eoi, offset)
    }

    // RespStatus == 200
    fn s1_tokens() -> Vec<Token> {
        vec![
            tok(TokenKind::Val, "RespStatus", 0),
            tok(TokenKind::Eq, "", 11),
            tok(TokenKind::Val, "200", 14),
            eoi(17),
        ]
    }

    #[test]
    fn s1_simple_numeric_comparison() {
        let tokens = s1_tokens();
        let options = ParserOptions::new(TAGS);
        let vex = parse(&tokens, options).unwrap();
        assert_eq!(vex.op.kind, TokenKind::Eq);
        assert!(vex.lhs.as_ref().unwrap().has_tag(0));
        assert_eq!(*vex.rhs.unwrap(), Rhs::Int(200));
    }

    #[test]
    fn s3_level_qualifier_at_least() {
        let tokens = vec![
            tok(TokenKind::LBrace, "", 0),
            tok(TokenKind::Val, "2+", 1),
            tok(TokenKind::RBrace, "", 3),
            tok(TokenKind::Val, "RespStatus", 5),
            tok(TokenKind::Geq, "", 16),
            tok(TokenKind::Val, "500", 19),
            eoi(22),
        ];
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        let lhs = vex.lhs.unwrap();
        assert_eq!(lhs.level(), Some(2));
        assert_eq!(lhs.level_match(), LevelMatch::AtLeast);
        assert_eq!(*vex.rhs.unwrap(), Rhs::Int(500));
    }

    #[test]
    fn s4_prefix_and_string_comparison() {
        let tokens = vec![
            tok(TokenKind::Val, "ReqHeader", 0),
            tok(TokenKind::Colon, "", 9),
            tok(TokenKind::Val, "Host", 10),
            tok(TokenKind::SEq, "", 15),
            tok(TokenKind::Val, "example.com", 18),
            eoi(29),
        ];
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        let lhs = vex.lhs.unwrap();
        assert_eq!(lhs.prefix(), Some(b"Host".as_slice()));
        assert_eq!(*vex.rhs.unwrap(), Rhs::Str(b"example.com".to_vec()));
    }

    #[test]
    fn s5_vxid_comparison() {
        let tokens = vec![
            tok(TokenKind::Vxid, "", 0),
            tok(TokenKind::Eq, "", 5),
            tok(TokenKind::Val, "42", 8),
            eoi(10),
        ];
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        assert!(vex.lhs.unwrap().is_vxid());
        assert_eq!(*vex.rhs.unwrap(), Rhs::Int(42));
    }

    #[test]
    fn s6_and_or_grouping() {
        // Begin and (RespStatus == 200 or RespStatus == 204)
        let tokens = vec![
            tok(TokenKind::Val, "Begin", 0),
            tok(TokenKind::And, "", 6),
            tok(TokenKind::LParen, "", 10),
            tok(TokenKind::Val, "RespStatus", 11),
            tok(TokenKind::Eq, "", 22),
            tok(TokenKind::Val, "200", 25),
            tok(TokenKind::Or, "", 29),
            tok(TokenKind::Val, "RespStatus", 32),
            tok(TokenKind::Eq, "", 43),
            tok(TokenKind::Val, "204", 46),
            tok(TokenKind::RParen, "", 49),
            eoi(50),
        ];
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        assert_eq!(vex.op.kind, TokenKind::And);
        assert_eq!(vex.a.as_ref().unwrap().op.kind, TokenKind::True);
        let or_node = vex.b.unwrap();
        assert_eq!(or_node.op.kind, TokenKind::Or);
    }

    #[test]
    fn precedence_or_binds_looser_than_and() {
        // a or b and c
        let tokens = vec![
            tok(TokenKind::Val, "Begin", 0),
            tok(TokenKind::Or, "", 2),
            tok(TokenKind::Val, "ReqURL", 5),
            tok(TokenKind::And, "", 12),
            tok(TokenKind::Val, "ReqHeader", 16),
            eoi(26),
        ];
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        assert_eq!(vex.op.kind, TokenKind::Or);
        assert_eq!(vex.b.as_ref().unwrap().op.kind, TokenKind::And);
    }

    #[test]
    fn and_is_left_associative() {
        // a and b and c
        let tokens = vec![
            tok(TokenKind::Val, "Begin", 0),
            tok(TokenKind::And, "", 2),
            tok(TokenKind::Val, "ReqURL", 6),
            tok(TokenKind::And, "", 13),
            tok(TokenKind::Val, "ReqHeader", 17),
            eoi(27),
        ];
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        assert_eq!(vex.op.kind, TokenKind::And);
        assert_eq!(vex.a.as_ref().unwrap().op.kind, TokenKind::And);
    }

    #[test]
    fn grouping_overrides_precedence() {
        // (a or b) and c
        let tokens = vec![
            tok(TokenKind::LParen, "", 0),
            tok(TokenKind::Val, "Begin", 1),
            tok(TokenKind::Or, "", 7),
            tok(TokenKind::Val, "ReqURL", 10),
            tok(TokenKind::RParen, "", 17),
            tok(TokenKind::And, "", 19),
            tok(TokenKind::Val, "ReqHeader", 23),
            eoi(33),
        ];
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        assert_eq!(vex.op.kind, TokenKind::And);
        assert_eq!(vex.a.as_ref().unwrap().op.kind, TokenKind::Or);
    }

    #[test]
    fn not_binds_tighter_than_and() {
        // not a and b
        let tokens = vec![
            tok(TokenKind::Not, "", 0),
            tok(TokenKind::Val, "Begin", 4),
            tok(TokenKind::And, "", 10),
            tok(TokenKind::Val, "ReqURL", 14),
            eoi(21),
        ];
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        assert_eq!(vex.op.kind, TokenKind::And);
        assert_eq!(vex.a.as_ref().unwrap().op.kind, TokenKind::Not);
    }

    #[test]
    fn top_level_chaining_associativity() {
        // q1 <EOI> q2 <EOI> q3 <EOI>
        let mut tokens = Vec::new();
        for (i, name) in ["Begin", "ReqURL", "ReqHeader"].iter().enumerate() {
            tokens.push(tok(TokenKind::Val, name, i * 10));
            tokens.push(eoi(i * 10 + 6));
        }
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        assert_eq!(vex.op.kind, TokenKind::Or);
        let a = vex.a.as_ref().unwrap();
        assert_eq!(a.op.kind, TokenKind::True);
        assert_eq!(a.lhs.as_ref().unwrap().tag_indices().next(), Some(2)); // ReqHeader is q3
        let b = vex.b.as_ref().unwrap();
        assert_eq!(b.op.kind, TokenKind::Or);
    }

    #[test]
    fn zero_match_tag_glob_is_an_error() {
        let tokens = vec![tok(TokenKind::Val, "NoSuchTag", 0), eoi(9)];
        let err = parse(&tokens, ParserOptions::new(TAGS)).unwrap_err();
        assert!(err.message.contains("zero tags"));
    }

    #[test]
    fn vxid_with_taglist_is_rejected() {
        let tokens = vec![
            tok(TokenKind::Vxid, "", 0),
            tok(TokenKind::Comma, "", 5),
            tok(TokenKind::Val, "Begin", 6),
            tok(TokenKind::Eq, "", 12),
            tok(TokenKind::Val, "1", 15),
            eoi(16),
        ];
        let err = parse(&tokens, ParserOptions::new(TAGS)).unwrap_err();
        assert!(err.message.contains("vxid"));
    }

    #[test]
    fn vxid_with_string_operator_is_rejected() {
        let tokens = vec![
            tok(TokenKind::Vxid, "", 0),
            tok(TokenKind::SEq, "", 5),
            tok(TokenKind::Val, "42", 8),
            eoi(10),
        ];
        let err = parse(&tokens, ParserOptions::new(TAGS)).unwrap_err();
        assert!(err.message.contains("vxid operator"));
    }

    #[test]
    fn bare_vxid_without_operator_is_rejected() {
        // A standalone `vxid` selector has no bare-tag-presence shorthand:
        // an operator is always required.
        let tokens = vec![tok(TokenKind::Vxid, "", 0), eoi(5)];
        let err = parse(&tokens, ParserOptions::new(TAGS)).unwrap_err();
        assert!(err.message.contains("vxid operator"));
    }

    #[test]
    fn non_positive_field_index_is_rejected() {
        let tokens = vec![
            tok(TokenKind::Val, "Begin", 0),
            tok(TokenKind::LBracket, "", 5),
            tok(TokenKind::Val, "0", 6),
            tok(TokenKind::RBracket, "", 7),
            eoi(8),
        ];
        let err = parse(&tokens, ParserOptions::new(TAGS)).unwrap_err();
        assert!(err.message.contains("positive integer"));
    }

    #[test]
    fn dropping_a_large_tree_does_not_panic() {
        let mut tokens = Vec::new();
        for i in 0..200 {
            if i > 0 {
                tokens.push(tok(TokenKind::And, "", i * 10));
            }
            tokens.push(tok(TokenKind::Val, "Begin", i * 10 + 4));
        }
        tokens.push(eoi(tokens.len() * 10));
        let vex = parse(&tokens, ParserOptions::new(TAGS)).unwrap();
        drop(vex);
    }

    #[test]
    fn broken_inputs_return_err_without_leaking() {
        let inputs: Vec<Vec<Token>> = vec![
            vec![tok(TokenKind::And, "", 0), eoi(1)],
            vec![tok(TokenKind::Val, "Begin", 0), tok(TokenKind::Eq, "", 5)],
            vec![tok(TokenKind::LParen, "", 0), tok(TokenKind::Val, "Begin", 1)],
        ];
        for tokens in inputs {
            assert!(parse(&tokens, ParserOptions::new(TAGS)).is_err());
        }
    }
}
