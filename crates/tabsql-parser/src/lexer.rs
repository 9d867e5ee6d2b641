use std::iter::Peekable;
use std::str::Chars;

use tabsql_core::Position;

use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    iter: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            iter: input.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.iter.next()?;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') => {
                    let mut lookahead = self.iter.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'-') {
                        while let Some(c) = self.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.bump();
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments();
        let pos = self.pos();
        let Some(ch) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                pos,
            });
        };

        let kind = match ch {
            '(' => {
                self.bump();
                TokenKind::LParen
            }
            ')' => {
                self.bump();
                TokenKind::RParen
            }
            ',' => {
                self.bump();
                TokenKind::Comma
            }
            '.' => {
                self.bump();
                TokenKind::Dot
            }
            ';' => {
                self.bump();
                TokenKind::Semicolon
            }
            '*' => {
                self.bump();
                TokenKind::Star
            }
            '@' => {
                self.bump();
                TokenKind::Variable(self.read_ident_tail())
            }
            // `#1` references a column positionally (1-based), used when a
            // view has no header row.
            '#' => TokenKind::Ident(self.read_ident_tail_from('#')),
            '\'' => TokenKind::StringLit(self.read_quoted('\'')?),
            '"' => TokenKind::QuotedIdent(self.read_quoted('"')?),
            '[' => TokenKind::QuotedIdent(self.read_bracketed()?),
            '+' | '-' | '/' | '%' | '=' | '<' | '>' | '|' | ':' => self.read_operator(pos)?,
            c if c.is_ascii_digit() => self.read_number(),
            c if is_ident_start(c) => TokenKind::Ident(self.read_ident_tail_from(c)),
            other => {
                return Err(ParseError::new(pos, format!("unexpected character '{other}'")));
            }
        };

        Ok(Token { kind, pos })
    }

    fn read_operator(&mut self, pos: Position) -> Result<TokenKind, ParseError> {
        let first = self.bump().expect("checked by caller");
        let second = self.peek();
        let op: &'static str = match (first, second) {
            ('<', Some('=')) => {
                self.bump();
                "<="
            }
            ('>', Some('=')) => {
                self.bump();
                ">="
            }
            ('<', Some('>')) => {
                self.bump();
                "<>"
            }
            ('!', Some('=')) => {
                self.bump();
                "<>"
            }
            (':', Some('=')) => {
                self.bump();
                ":="
            }
            ('|', Some('|')) => {
                self.bump();
                "||"
            }
            ('+', _) => "+",
            ('-', _) => "-",
            ('/', _) => "/",
            ('%', _) => "%",
            ('=', _) => "=",
            ('<', _) => "<",
            ('>', _) => ">",
            _ => return Err(ParseError::new(pos, format!("unexpected operator starting with '{first}'"))),
        };
        Ok(TokenKind::Op(op))
    }

    fn read_ident_tail(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn read_ident_tail_from(&mut self, first: char) -> String {
        self.bump();
        let mut s = String::new();
        s.push(first);
        s.push_str(&self.read_ident_tail());
        s
    }

    fn read_quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let pos = self.pos();
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        s.push(quote);
                    } else {
                        return Ok(s);
                    }
                }
                Some(c) => s.push(c),
                None => return Err(ParseError::new(pos, "unterminated quoted literal")),
            }
        }
    }

    fn read_bracketed(&mut self) -> Result<String, ParseError> {
        let pos = self.pos();
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                Some(']') => return Ok(s),
                Some(c) => s.push(c),
                None => return Err(ParseError::new(pos, "unterminated bracketed identifier")),
            }
        }
    }

    fn read_number(&mut self) -> TokenKind {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.peek() == Some('.') {
            let mut lookahead = self.iter.clone();
            lookahead.next();
            if lookahead.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                is_float = true;
                s.push('.');
                self.bump();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        s.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        if is_float {
            TokenKind::FloatLit(s.parse().unwrap_or(0.0))
        } else {
            TokenKind::IntLit(s.parse().unwrap_or(0))
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_select_1() {
        let k = kinds("SELECT 1 FROM dual");
        assert_eq!(
            k,
            vec![
                TokenKind::Ident("SELECT".into()),
                TokenKind::IntLit(1),
                TokenKind::Ident("FROM".into()),
                TokenKind::Ident("dual".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_variable_and_assign() {
        let k = kinds("@a := 1");
        assert_eq!(
            k,
            vec![
                TokenKind::Variable("a".into()),
                TokenKind::Op(":="),
                TokenKind::IntLit(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_comments() {
        let k = kinds("1 -- comment\n+ 2");
        assert_eq!(
            k,
            vec![
                TokenKind::IntLit(1),
                TokenKind::Op("+"),
                TokenKind::IntLit(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reads_float_literal() {
        let k = kinds("3.14");
        assert_eq!(k, vec![TokenKind::FloatLit(3.14), TokenKind::Eof]);
    }

    #[test]
    fn reads_column_number_reference() {
        let k = kinds("#1");
        assert_eq!(k, vec![TokenKind::Ident("#1".into()), TokenKind::Eof]);
    }
}
