//! Source text → token stream.
//!
//! Ported from `original_source/musique/lexer/lexer.cc`, restructured in the
//! shape of a hand-rolled character-at-a-time scanner the way the teacher's
//! `lexer.rs` is built: a `Lexer` struct owning a `Peekable` char iterator
//! plus position bookkeeping, and a `tokenize()` entry point producing the
//! full token vector up front.

use crate::error::{Error, MusiqueError, Result};
use crate::token::{Token, Token_Type, KEYWORDS};
use crate::unicode;
use log::trace;
use std::iter::Peekable;
use std::rc::Rc;
use std::str::CharIndices;

const NOTE_BASE_LETTERS: &str = "abcdefghp";
const ACCIDENTAL_LETTERS: &str = "#sfb";
const OPERATOR_CHARS: &str = "+-*/:%&^<>=!.";

pub struct Lexer<'a> {
    filename: Rc<str>,
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(filename: impl Into<Rc<str>>, input: &'a str) -> Self {
        Lexer {
            filename: filename.into(),
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input[offset..].chars().next()
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.input.len())
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn err(&mut self, details: MusiqueError) -> Error {
        let start = self.pos();
        Error::new(details).with(crate::location::FileRange::new(
            self.filename.clone(),
            start,
            start,
        ))
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c != '\n' && unicode::is_space(c) => {
                    self.advance();
                }
                Some('-') if self.input[self.pos()..].starts_with("---") => {
                    self.skip_block_comment();
                }
                Some('-') if self.input[self.pos()..].starts_with("--") => {
                    self.skip_line_comment();
                }
                Some('#') if self.input[self.pos()..].starts_with("#!") => {
                    self.skip_line_comment();
                }
                _ => break,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        // Consume the opening run of 3+ dashes.
        while self.peek() == Some('-') {
            self.advance();
        }
        loop {
            match self.peek() {
                None => break,
                Some('-') => {
                    let mut run = 0;
                    while self.peek() == Some('-') {
                        self.advance();
                        run += 1;
                    }
                    if run >= 3 {
                        break;
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn lex_numeric(&mut self) -> Token {
        let start = self.pos();
        while matches!(self.peek(), Some(c) if unicode::is_digit(c)) {
            self.advance();
        }
        if self.peek() == Some('.') {
            let dot_pos = self.pos();
            if matches!(self.peek_at(dot_pos + 1), Some(c) if unicode::is_digit(c)) {
                self.advance(); // consume '.'
                while matches!(self.peek(), Some(c) if unicode::is_digit(c)) {
                    self.advance();
                }
            }
            // Trailing '.' with no following digit is rewound: simply don't consume it.
        }
        let end = self.pos();
        Token::new(Token_Type::Numeric, &self.input[start..end], start)
    }

    fn lex_symbol(&mut self) -> Token {
        let start = self.pos();
        self.advance(); // first rune already validated by caller
        while matches!(self.peek(), Some(c) if unicode::is_identifier_continuation(c)) {
            self.advance();
        }
        let end = self.pos();
        let source = &self.input[start..end];
        let r#type = if KEYWORDS.contains(&source) {
            Token_Type::Keyword
        } else {
            Token_Type::Symbol
        };
        Token::new(r#type, source, start)
    }

    fn lex_chord(&mut self) -> Token {
        let start = self.pos();
        self.advance(); // base letter
        while matches!(self.peek(), Some(c) if ACCIDENTAL_LETTERS.contains(c)) {
            self.advance();
        }
        while matches!(self.peek(), Some(c) if unicode::is_digit(c)) {
            self.advance();
        }
        let end = self.pos();

        // If what follows continues an identifier, this was actually a symbol.
        if matches!(self.peek(), Some(c) if unicode::is_identifier_continuation(c)) {
            while matches!(self.peek(), Some(c) if unicode::is_identifier_continuation(c)) {
                self.advance();
            }
            let full_end = self.pos();
            let source = &self.input[start..full_end];
            let r#type = if KEYWORDS.contains(&source) {
                Token_Type::Keyword
            } else {
                Token_Type::Symbol
            };
            return Token::new(r#type, source, start);
        }

        Token::new(Token_Type::Chord, &self.input[start..end], start)
    }

    fn lex_operator(&mut self) -> Token {
        let start = self.pos();
        while matches!(self.peek(), Some(c) if OPERATOR_CHARS.contains(c)) {
            self.advance();
        }
        let end = self.pos();
        Token::new(Token_Type::Operator, &self.input[start..end], start)
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace_and_comments();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let single = |t: Token_Type, lx: &mut Self| {
            let start = lx.pos();
            lx.advance();
            Token::new(t, &lx.input[start..start + c.len_utf8()], start)
        };

        let token = match c {
            '(' => single(Token_Type::Open_Paren, self),
            ')' => single(Token_Type::Close_Paren, self),
            '[' => single(Token_Type::Open_Bracket, self),
            ']' => single(Token_Type::Close_Bracket, self),
            ',' => single(Token_Type::Comma, self),
            '\n' => single(Token_Type::Newline, self),
            '|' => single(Token_Type::Parameter_Separator, self),
            c if unicode::is_digit(c) => self.lex_numeric(),
            c if NOTE_BASE_LETTERS.contains(c) => self.lex_chord(),
            c if unicode::is_identifier_start(c) => self.lex_symbol(),
            c if OPERATOR_CHARS.contains(c) => self.lex_operator(),
            c => return Err(self.err(MusiqueError::Unrecognized_Character { ch: c })),
        };

        Ok(Some(token))
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            trace!("token {:?} {:?}", token.r#type, token.source);
            tokens.push(token);
        }
        trace!("lexed {} tokens from {}", tokens.len(), self.filename);
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(src: &str) -> Vec<Token_Type> {
        Lexer::new("t.mq", src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.r#type)
            .collect()
    }

    fn sources(src: &str) -> Vec<String> {
        Lexer::new("t.mq", src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.source)
            .collect()
    }

    #[test]
    fn test_simple_note_and_symbol() {
        assert_eq!(types("c foo"), vec![Token_Type::Chord, Token_Type::Symbol]);
    }

    #[test]
    fn test_chord_with_accidental_and_octave() {
        assert_eq!(sources("c#4"), vec!["c#4"]);
        assert_eq!(types("c#4"), vec![Token_Type::Chord]);
    }

    #[test]
    fn test_h_note_letter_lexes_as_chord() {
        assert_eq!(types("h4"), vec![Token_Type::Chord]);
        assert_eq!(sources("h4"), vec!["h4"]);
    }

    #[test]
    fn test_chord_reclassified_as_symbol() {
        // "chord_thing" continues past what a chord literal can consume, so the
        // whole run becomes one Symbol token instead of Chord + Symbol.
        assert_eq!(types("chord_thing"), vec![Token_Type::Symbol]);
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(sources("120"), vec!["120"]);
        assert_eq!(sources("1.5"), vec!["1.5"]);
        assert_eq!(sources("120."), vec!["120", "."]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(types("if end while"), vec![Token_Type::Keyword; 3]);
    }

    #[test]
    fn test_operators_maximal_munch() {
        assert_eq!(sources("+="), vec!["+="]);
        assert_eq!(sources("<=>"), vec!["<=>"]);
    }

    #[test]
    fn test_single_char_tokens() {
        assert_eq!(
            types("(,)[]\n|"),
            vec![
                Token_Type::Open_Paren,
                Token_Type::Comma,
                Token_Type::Close_Paren,
                Token_Type::Open_Bracket,
                Token_Type::Close_Bracket,
                Token_Type::Newline,
                Token_Type::Parameter_Separator,
            ]
        );
    }

    #[test]
    fn test_line_comment_skipped() {
        assert_eq!(
            types("1 -- comment\n2"),
            vec![Token_Type::Numeric, Token_Type::Newline, Token_Type::Numeric]
        );
    }

    #[test]
    fn test_block_comment_skipped() {
        assert_eq!(
            types("1 --- this is a\nmultiline comment --- 2"),
            vec![Token_Type::Numeric, Token_Type::Numeric]
        );
    }

    #[test]
    fn test_unrecognized_character_errors() {
        assert!(Lexer::new("t.mq", "1 ~ 2").tokenize().is_err());
    }

    #[test]
    fn test_quoted_symbol() {
        assert_eq!(types("'+"), vec![Token_Type::Symbol]);
    }
}
