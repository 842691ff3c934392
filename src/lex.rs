use std::{fmt::Display, ops::Range};

use crate::error::{EvalError, source, span};

/// Reserved character standing in for `sqrt` once an expression is normalized.
pub const ROOT_MARKER: char = '√';

/// Strips whitespace and rewrites every `sqrt(` into the root marker.
pub fn normalize(input: &str) -> String {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    compact.replace("sqrt(", "√(")
}

fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '^')
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    pub offset: usize,
}

impl Token<'_> {
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + self.literal.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    /// A literal, already negated for a unary minus and scaled for a trailing `%`.
    Number(f64),
    /// `√(...)`; `body` is the byte range strictly between the parentheses.
    Root { body: Range<usize> },
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match &self.kind {
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit}"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit}"),
            TokenKind::Plus => write!(f, "PLUS {lit}"),
            TokenKind::Minus => write!(f, "MINUS {lit}"),
            TokenKind::Star => write!(f, "STAR {lit}"),
            TokenKind::Slash => write!(f, "SLASH {lit}"),
            TokenKind::Caret => write!(f, "CARET {lit}"),
            TokenKind::Number(n) => write!(f, "NUMBER {lit} {n}"),
            TokenKind::Root { body } => write!(f, "ROOT {lit} {}..{}", body.start, body.end),
        }
    }
}

/// Left-to-right scanner over a normalized expression.
///
/// All offsets are byte offsets into `whole`, also when the lexer only
/// covers a sub-range of it (the body of a square root).
pub struct Lexer<'de> {
    whole: &'de str,
    rest: &'de str,
    byte: usize,
    prev: Option<char>,
}

impl<'de> Lexer<'de> {
    pub fn new(whole: &'de str) -> Self {
        Self::within(whole, 0..whole.len())
    }

    pub(crate) fn within(whole: &'de str, range: Range<usize>) -> Self {
        Lexer {
            whole,
            rest: &whole[range.clone()],
            byte: range.start,
            prev: None,
        }
    }

    pub fn whole(&self) -> &'de str {
        self.whole
    }

    /// A `-` is a sign when nothing, `(` or another operator precedes it.
    fn minus_is_unary(&self) -> bool {
        match self.prev {
            None => true,
            Some(prev) => prev == '(' || is_operator(prev),
        }
    }

    fn advance(&mut self, len: usize) -> (&'de str, usize) {
        let offset = self.byte;
        let literal = &self.rest[..len];
        self.rest = &self.rest[len..];
        self.byte += len;
        self.prev = literal.chars().next_back();
        (literal, offset)
    }

    fn number(&mut self, signed: bool) -> Result<Token<'de>, EvalError> {
        let skip = usize::from(signed);
        let digits = self.rest[skip..]
            .find(|c: char| !matches!(c, '0'..='9' | '.'))
            .unwrap_or(self.rest.len() - skip);
        let (literal, offset) = self.advance(skip + digits);

        let Ok(mut n) = literal.parse::<f64>() else {
            return Err(EvalError::InvalidNumber {
                literal: literal.to_string(),
                src: source(self.whole),
                span: span(offset..offset + literal.len()),
            });
        };

        if self.rest.starts_with('%') {
            n /= 100.0;
            self.advance(1);
        }

        Ok(Token {
            kind: TokenKind::Number(n),
            literal: &self.whole[offset..self.byte],
            offset,
        })
    }

    fn root(&mut self) -> Result<Token<'de>, EvalError> {
        let marker = ROOT_MARKER.len_utf8();
        let start = self.byte;
        if !self.rest[marker..].starts_with('(') {
            return Err(EvalError::MissingRootParen {
                src: source(self.whole),
                span: span(start..start + marker),
            });
        }

        let mut balance = 1usize;
        let mut close = None;
        for (i, c) in self.rest[marker + 1..].char_indices() {
            match c {
                '(' => balance += 1,
                ')' => balance -= 1,
                _ => {}
            }
            if balance == 0 {
                close = Some(marker + 1 + i);
                break;
            }
        }
        let Some(close) = close else {
            return Err(EvalError::UnterminatedRoot {
                src: source(self.whole),
                span: span(start..start + self.rest.len()),
            });
        };

        let body = start + marker + 1..start + close;
        let (literal, offset) = self.advance(close + 1);
        Ok(Token {
            kind: TokenKind::Root { body },
            literal,
            offset,
        })
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, EvalError>;

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.rest.chars().next()?;

        enum Start {
            Number { signed: bool },
            Root,
        }

        let started = match c {
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            '+' => Some(TokenKind::Plus),
            '-' if !self.minus_is_unary() => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '^' => Some(TokenKind::Caret),
            _ => None,
        };
        if let Some(kind) = started {
            let (literal, offset) = self.advance(1);
            return Some(Ok(Token {
                kind,
                literal,
                offset,
            }));
        }

        let started = match c {
            '-' => Start::Number { signed: true },
            '0'..='9' | '.' => Start::Number { signed: false },
            ROOT_MARKER => Start::Root,
            c => {
                let offset = self.byte;
                // stop scanning after the first bad character
                self.rest = "";
                return Some(Err(EvalError::UnexpectedCharacter {
                    token: c,
                    src: source(self.whole),
                    span: span(offset..offset + c.len_utf8()),
                }));
            }
        };

        let token = match started {
            Start::Number { signed } => self.number(signed),
            Start::Root => self.root(),
        };
        if token.is_err() {
            self.rest = "";
        }
        Some(token)
    }
}
