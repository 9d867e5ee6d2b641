use tabsql_core::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// A double-quoted or bracketed identifier: case is preserved exactly
    /// and it is never treated as a keyword.
    QuotedIdent(String),
    /// `@name` — a scalar variable reference.
    Variable(String),
    StringLit(String),
    IntLit(i64),
    FloatLit(f64),
    LParen,
    RParen,
    Comma,
    Dot,
    Semicolon,
    Star,
    /// Operators and punctuation: `= <> < <= > >= + - / % || :=`.
    Op(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

impl Token {
    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s.eq_ignore_ascii_case(word))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
