//! Turns SQL source text into [`tabsql_ast::Statement`] trees: a hand-rolled
//! lexer followed by a recursive-descent, precedence-climbing parser. Neither
//! stage knows anything about evaluation — that is `tabsql-engine`'s job.

mod error;
mod lexer;
mod parser;
mod token;

pub use error::ParseError;
pub use parser::{parse_script, Parser};
pub use token::{Token, TokenKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_script_reports_position_on_error() {
        let err = parse_script("SELECT * FROM t WHERE").unwrap_err();
        assert!(err.pos.line >= 1);
    }
}
