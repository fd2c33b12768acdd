//! A token scanner for looking at JavaScript without parsing it.
//!
//! Yields words, punctuation and opaque literals while skipping whitespace
//! and comments. String, template, number and regular expression literals
//! each come out as one token; code inside template interpolations is
//! scanned like any other code. A `/` is read as a regular expression after
//! punctuation and after keywords that precede an operand.

use super::Span;

/// The shape of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier or keyword.
    Word,
    /// A single punctuation byte.
    Punct(u8),
    /// A string, template, number or regular expression.
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text(self, source: &str) -> &str {
        self.span.text(source)
    }

    pub fn is_punct(self, byte: u8) -> bool {
        self.kind == TokenKind::Punct(byte)
    }

    pub fn is_word(self, source: &str, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text(source) == word
    }
}

/// Keywords after which `/` starts a regular expression.
const OPERAND_KEYWORDS: &[&str] = &[
    "await", "case", "delete", "do", "else", "in", "instanceof", "new", "of", "return", "throw",
    "typeof", "void", "yield",
];

pub struct Scanner<'s> {
    source: &'s str,
    pos: usize,
    /// Open `{` count at which each enclosing template interpolation closes.
    templates: Vec<usize>,
    braces: usize,
    depth: usize,
    regex_allowed: bool,
}

impl<'s> Scanner<'s> {
    pub fn new(source: &'s str) -> Self {
        Self::at(source, 0)
    }

    /// Scan `source` from byte offset `pos`, in code position.
    pub fn at(source: &'s str, pos: usize) -> Self {
        Self {
            source,
            pos: pos.min(source.len()),
            templates: Vec::new(),
            braces: 0,
            depth: 0,
            regex_allowed: true,
        }
    }

    /// Current bracket nesting, counting template interpolations.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn byte(&self, pos: usize) -> Option<u8> {
        self.source.as_bytes().get(pos).copied()
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.source.len());
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: Span::new(start, self.pos),
        }
    }

    fn open(&mut self) {
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Skip template text after a backtick or a closing interpolation brace.
    fn skip_template(&mut self) {
        while let Some(byte) = self.byte(self.pos) {
            match byte {
                b'\\' => self.advance(2),
                b'`' => {
                    self.advance(1);
                    self.regex_allowed = false;
                    return;
                }
                b'$' if self.byte(self.pos + 1) == Some(b'{') => {
                    self.advance(2);
                    self.templates.push(self.braces);
                    self.braces += 1;
                    self.open();
                    self.regex_allowed = true;
                    return;
                }
                _ => self.advance(1),
            }
        }
    }

    fn skip_string(&mut self, quote: u8) {
        self.advance(1);
        while let Some(byte) = self.byte(self.pos) {
            match byte {
                b'\\' => self.advance(2),
                b'\n' => return,
                _ if byte == quote => {
                    self.advance(1);
                    return;
                }
                _ => self.advance(1),
            }
        }
    }

    fn skip_regex(&mut self) {
        self.advance(1);
        let mut in_class = false;
        while let Some(byte) = self.byte(self.pos) {
            match byte {
                b'\\' => self.advance(2),
                b'\n' => return,
                b'[' => {
                    in_class = true;
                    self.advance(1);
                }
                b']' => {
                    in_class = false;
                    self.advance(1);
                }
                b'/' if !in_class => {
                    self.advance(1);
                    break;
                }
                _ => self.advance(1),
            }
        }
        while self.byte(self.pos).is_some_and(is_word_byte) {
            self.advance(1);
        }
    }

    fn skip_number(&mut self) {
        while self
            .byte(self.pos)
            .is_some_and(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'.')
        {
            self.advance(1);
        }
    }
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let byte = self.byte(self.pos)?;
            let start = self.pos;
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c' => self.advance(1),
                b'/' if self.byte(self.pos + 1) == Some(b'/') => {
                    let rest = &self.source[self.pos..];
                    self.advance(rest.find('\n').unwrap_or(rest.len()));
                }
                b'/' if self.byte(self.pos + 1) == Some(b'*') => {
                    let rest = &self.source[self.pos + 2..];
                    self.advance(rest.find("*/").map_or(rest.len() + 2, |end| end + 4));
                }
                b'\'' | b'"' => {
                    self.skip_string(byte);
                    self.regex_allowed = false;
                    return Some(self.token(TokenKind::Literal, start));
                }
                b'`' => {
                    self.advance(1);
                    self.skip_template();
                    return Some(self.token(TokenKind::Literal, start));
                }
                b'/' if self.regex_allowed => {
                    self.skip_regex();
                    self.regex_allowed = false;
                    return Some(self.token(TokenKind::Literal, start));
                }
                b'0'..=b'9' => {
                    self.skip_number();
                    self.regex_allowed = false;
                    return Some(self.token(TokenKind::Literal, start));
                }
                b'.' if self.byte(self.pos + 1).is_some_and(|b| b.is_ascii_digit()) => {
                    self.skip_number();
                    self.regex_allowed = false;
                    return Some(self.token(TokenKind::Literal, start));
                }
                _ if is_word_byte(byte) => {
                    while self.byte(self.pos).is_some_and(is_word_byte) {
                        self.advance(1);
                    }
                    let word = &self.source[start..self.pos];
                    self.regex_allowed = OPERAND_KEYWORDS.contains(&word);
                    return Some(self.token(TokenKind::Word, start));
                }
                b'}' if self.templates.last() == Some(&(self.braces.saturating_sub(1))) => {
                    // Closes an interpolation; the template continues.
                    self.braces -= 1;
                    self.templates.pop();
                    self.close();
                    self.advance(1);
                    self.skip_template();
                    return Some(self.token(TokenKind::Literal, start));
                }
                _ => {
                    self.advance(1);
                    match byte {
                        b'(' | b'[' => self.open(),
                        b'{' => {
                            self.braces += 1;
                            self.open();
                        }
                        b')' | b']' => self.close(),
                        b'}' => {
                            self.braces = self.braces.saturating_sub(1);
                            self.close();
                        }
                        _ => {}
                    }
                    self.regex_allowed = !matches!(byte, b')' | b']');
                    return Some(self.token(TokenKind::Punct(byte), start));
                }
            }
        }
    }
}
