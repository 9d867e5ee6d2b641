use tabsql_core::Position;

#[derive(Debug, thiserror::Error)]
#[error("{pos} {message}")]
pub struct ParseError {
    pub pos: Position,
    pub message: String,
}

impl ParseError {
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }
}

impl From<ParseError> for tabsql_core::EngineError {
    fn from(value: ParseError) -> Self {
        tabsql_core::EngineError::Syntax {
            pos: value.pos,
            message: value.message,
        }
    }
}
