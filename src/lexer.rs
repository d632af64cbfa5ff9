// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::errors::{Error, Result};

use core::cmp;
use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;
use std::rc::Rc;

#[derive(Clone)]
struct SourceInternal {
    pub file: String,
    pub contents: String,
}

/// One expression string, as supplied by the policy document.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl cmp::PartialEq for Source {
    fn eq(&self, other: &Source) -> bool {
        Rc::as_ptr(&self.src) == Rc::as_ptr(&other.src)
    }
}

impl cmp::Eq for Source {}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::result::Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        let max_size = u32::MAX as usize - 2;
        if contents.len() > max_size {
            return Err(Error::Parse(format!(
                "{file} exceeds maximum allowed expression size {max_size}"
            )));
        }
        Ok(Self {
            src: Rc::new(SourceInternal { file, contents }),
        })
    }

    pub fn new(contents: String) -> Source {
        Self {
            src: Rc::new(SourceInternal {
                file: "<expr>".to_string(),
                contents,
            }),
        }
    }

    pub fn file(&self) -> &String {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn message(&self, col: u32, kind: &str, msg: &str) -> String {
        let col_spaces = col.saturating_sub(1) as usize;
        format!(
            "\n--> {}:{}\n | {}\n | {:<col_spaces$}^\n{}: {}",
            self.src.file, col, self.src.contents, "", kind, msg
        )
    }

    pub fn error(&self, col: u32, msg: &str) -> Error {
        Error::Parse(self.message(col, "error", msg))
    }
}

/// A subslice of a source expression.
#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.col, kind, msg)
    }

    pub fn error(&self, msg: &str) -> Error {
        self.source.error(self.col, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::result::Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = if t.len() > max {
            (&t[0..max], "...")
        } else {
            (t.as_str(), "")
        };

        f.write_fmt(format_args!(
            "{}:{}:{}, \"{}{}\"",
            self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    String,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    col: u32,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            col: 1,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    // Identifiers may carry a leading `$` which marks a built-in call or a
    // bound variable; the sigil is part of the token text.
    fn read_ident(&mut self) -> Result<Token> {
        let start = self.peek().0;
        let col = self.col;
        let sigil = self.peek().1 == '$';
        if sigil {
            self.iter.next();
        }
        loop {
            let ch = self.peek().1;
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        if sigil && end - start <= 1 {
            return Err(self.source.error(col, "`$` must be followed by a name"));
        }
        self.col += (end - start) as u32;
        Ok(Token(
            TokenKind::Ident,
            Span {
                source: self.source.clone(),
                col,
                start: start as u32,
                end: end as u32,
            },
        ))
    }

    // Aladino numbers are decimal integers.
    fn read_number(&mut self) -> Result<Token> {
        let (start, _) = self.peek();
        let col = self.col;
        self.iter.next();

        while self.peek().1.is_ascii_digit() {
            self.iter.next();
        }

        let end = self.peek().0;
        self.col += (end - start) as u32;

        let ch = self.peek().1;
        if ch == '_' || ch == '.' || ch.is_ascii_alphanumeric() {
            return Err(self.source.error(self.col, "invalid number"));
        }

        Ok(Token(
            TokenKind::Number,
            Span {
                source: self.source.clone(),
                col,
                start: start as u32,
                end: end as u32,
            },
        ))
    }

    fn read_string(&mut self) -> Result<Token> {
        let col = self.col;
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        loop {
            let (offset, ch) = self.peek();
            match ch {
                '"' | '\x00' => break,
                '\\' => {
                    self.iter.next();
                    let (_, esc) = self.peek();
                    self.iter.next();
                    match esc {
                        '"' | '\\' | '/' | 'n' | 'r' | 't' => (),
                        _ => {
                            let col = self.col + (offset - start) as u32;
                            return Err(self.source.error(col, "invalid escape sequence"));
                        }
                    }
                }
                _ => {
                    self.iter.next();
                }
            }
        }

        if self.peek().1 != '"' {
            return Err(self.source.error(col, "unmatched \""));
        }

        self.iter.next();
        let end = self.peek().0;
        self.col += (end - start) as u32;

        Ok(Token(
            TokenKind::String,
            Span {
                source: self.source.clone(),
                col: col + 1,
                start: start as u32,
                end: end as u32 - 1,
            },
        ))
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek().1 {
                ' ' => self.col += 1,
                '\t' => self.col += 4,
                '\r' | '\n' => self.col = 1,
                _ => break,
            }
            self.iter.next();
        }
    }

    fn symbol(&self, col: u32, start: usize, len: u32) -> Token {
        Token(
            TokenKind::Symbol,
            Span {
                source: self.source.clone(),
                col,
                start: start as u32,
                end: start as u32 + len,
            },
        )
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws();

        let (start, chr) = self.peek();
        let col = self.col;

        match chr {
            // grouping characters, separators, single-char operators
            // (`-` is always a symbol; negation is handled by the parser)
            '(' | ')' | '[' | ']' | ',' | ':' | '+' | '-' | '*' | '/' | '%' => {
                self.col += 1;
                self.iter.next();
                Ok(self.symbol(col, start, 1))
            }
            // < <= > >= = == ! !=
            '<' | '>' | '=' | '!' => {
                self.col += 1;
                self.iter.next();
                let mut len = 1;
                if self.peek().1 == '=' {
                    self.col += 1;
                    self.iter.next();
                    len = 2;
                }
                Ok(self.symbol(col, start, len))
            }
            '&' | '|' => {
                if self.peekahead(1).1 != chr {
                    return Err(self.source.error(
                        col,
                        &format!("expecting `{chr}{chr}`, found a single `{chr}`"),
                    ));
                }
                self.col += 2;
                self.iter.next();
                self.iter.next();
                Ok(self.symbol(col, start, 2))
            }
            '"' => self.read_string(),
            '\x00' => Ok(Token(
                TokenKind::Eof,
                Span {
                    source: self.source.clone(),
                    col,
                    start: start as u32,
                    end: start as u32,
                },
            )),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_alphabetic() || chr == '_' || chr == '$' => self.read_ident(),
            _ => Err(self.source.error(self.col, "invalid character")),
        }
    }
}
