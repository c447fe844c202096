//! Hand-written lexer over the source language (§SPEC_FULL 2): declarations,
//! assignment, `IF`/`WHILE`/`FOR`, arithmetic, `READ`/`WRITE`.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use util::SourcePos;
use util::{EnumFromStr, Mnemonic};
use util_derive::{EnumFromStr, Mnemonic};

/// The source language's reserved words. Matched case-insensitively by the
/// lexer (§SPEC_FULL 2: "a hand-written lexer"); variant identifiers are the
/// canonical capitalized spelling the [`EnumFromStr`] derive matches
/// against once a raw identifier is normalized.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Mnemonic, EnumFromStr)]
pub enum Keyword {
    Array,
    Read,
    Write,
    If,
    Then,
    Else,
    Endif,
    While,
    Do,
    Endwhile,
    For,
    From,
    To,
    Downto,
    Endfor,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Ident(String),
    Number(String),
    Keyword(Keyword),
    Assign,
    Semicolon,
    Colon,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Eof,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: SourcePos,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LexError {
    pub pos: SourcePos,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

impl std::error::Error for LexError {}

/// Normalizes a raw identifier to the capitalization [`Keyword`]'s
/// `EnumFromStr` derive matches (`"WRITE"`/`"write"`/`"Write"` all become
/// `"Write"`), so keyword matching is case-insensitive without needing a
/// hand-maintained lookup table.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer { chars: source.chars().peekable(), line: 1, column: 1 }
    }

    fn pos(&self) -> SourcePos {
        SourcePos::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let pos = self.pos();
            let kind = match self.peek() {
                None => {
                    tokens.push(Token { kind: TokenKind::Eof, pos });
                    break;
                }
                Some(c) if c.is_ascii_digit() => self.lex_number(),
                Some(c) if c.is_alphabetic() || c == '_' => self.lex_ident_or_keyword(),
                Some(':') => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        TokenKind::Assign
                    } else {
                        TokenKind::Colon
                    }
                }
                Some(';') => {
                    self.bump();
                    TokenKind::Semicolon
                }
                Some('(') => {
                    self.bump();
                    TokenKind::LParen
                }
                Some(')') => {
                    self.bump();
                    TokenKind::RParen
                }
                Some('+') => {
                    self.bump();
                    TokenKind::Plus
                }
                Some('-') => {
                    self.bump();
                    TokenKind::Minus
                }
                Some('*') => {
                    self.bump();
                    TokenKind::Star
                }
                Some('/') => {
                    self.bump();
                    TokenKind::Slash
                }
                Some('%') => {
                    self.bump();
                    TokenKind::Percent
                }
                Some('=') => {
                    self.bump();
                    TokenKind::Eq
                }
                Some('<') => {
                    self.bump();
                    match self.peek() {
                        Some('>') => {
                            self.bump();
                            TokenKind::Ne
                        }
                        Some('=') => {
                            self.bump();
                            TokenKind::Le
                        }
                        _ => TokenKind::Lt,
                    }
                }
                Some('>') => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }
                Some(other) => {
                    return Err(LexError { pos, message: format!("unexpected character '{}'", other) });
                }
            };
            tokens.push(Token { kind, pos });
        }
        Ok(tokens)
    }

    fn lex_number(&mut self) -> TokenKind {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Number(digits)
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match Keyword::from_str(&capitalize(&name)) {
            Ok(keyword) => TokenKind::Keyword(keyword),
            Err(_) => TokenKind::Ident(name),
        }
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_insensitive() {
        let tokens = tokenize("for FOR For").unwrap();
        assert_eq!(
            tokens[..3].iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![TokenKind::Keyword(Keyword::For); 3]
        );
    }

    #[test]
    fn distinguishes_assign_from_colon() {
        let tokens = tokenize("a(0:2) b:=1").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert!(kinds.contains(&TokenKind::Colon));
        assert!(kinds.contains(&TokenKind::Assign));
    }

    #[test]
    fn relational_operators_lex_correctly() {
        let tokens = tokenize("<= >= <> < >").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Le, TokenKind::Ge, TokenKind::Ne, TokenKind::Lt, TokenKind::Gt, TokenKind::Eof]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("a\nb").unwrap();
        assert_eq!(tokens[0].pos, SourcePos::new(1, 1));
        assert_eq!(tokens[1].pos, SourcePos::new(2, 1));
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = tokenize("a # comment\n:= 1").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(kinds[1], TokenKind::Assign);
    }
}
