use std::fmt;

/// Source position for an error, when one is available. Programmatic errors
/// (no originating token) use [`Position::UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub const UNKNOWN: Position = Position { line: 0, col: 0 };

    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Position::UNKNOWN {
            write!(f, "[L:- C:-]")
        } else {
            write!(f, "[L:{} C:{}]", self.line, self.col)
        }
    }
}

/// The error taxonomy of the engine: every error that can abort a statement.
/// Variant families correspond to the kinds named in the design (Syntax,
/// Semantic resolution, Evaluation, I/O, Resource); each carries the
/// position it was raised at so `Display` produces the `[L:x C:y] msg`
/// shape callers surface to the user.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{pos} {message}")]
    Syntax { pos: Position, message: String },

    #[error("{pos} field {name} does not exist")]
    FieldNotFound { pos: Position, name: String },

    #[error("{pos} field {name} is ambiguous")]
    FieldAmbiguous { pos: Position, name: String },

    #[error("{pos} variable {name} is undefined")]
    VariableUndefined { pos: Position, name: String },

    #[error("{pos} cursor {name} is undefined")]
    CursorUndefined { pos: Position, name: String },

    #[error("{pos} function {name} is undefined")]
    FunctionUndefined { pos: Position, name: String },

    #[error("{pos} table {name} is undefined")]
    TableUndefined { pos: Position, name: String },

    #[error("{pos} {name} is redeclared")]
    Redeclared { pos: Position, name: String },

    #[error("{pos} field name {name} is a duplicate")]
    DuplicateFieldName { pos: Position, name: String },

    #[error("{pos} result set to be combined should contain exactly {expected} field(s)")]
    SetOperationWidthMismatch { pos: Position, expected: usize },

    #[error("{pos} select query should return exactly {expected} field(s)")]
    SelectWidthMismatch { pos: Position, expected: usize },

    #[error("{pos} fetching from cursor {name} returns {actual} values, expected {expected}")]
    CursorFetchArity {
        pos: Position,
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("{pos} fetching position {value} is not an integer value")]
    CursorPositionNotInteger { pos: Position, value: String },

    #[error("{pos} value {value} to set in the field {field} is ambiguous")]
    UpdateAmbiguous {
        pos: Position,
        value: String,
        field: String,
    },

    #[error("{pos} field {name} does not exist in the tables to update")]
    UpdateFieldUnresolved { pos: Position, name: String },

    #[error("{pos} tables to delete records are not specified")]
    DeleteTargetsUnspecified { pos: Position },

    #[error("{pos} {message}")]
    Evaluation { pos: Position, message: String },

    #[error("{pos} division by zero")]
    DivisionByZero { pos: Position },

    #[error("{pos} file {path} does not exist")]
    FileNotFound { pos: Position, path: String },

    #[error("{pos} file {path} already exists")]
    FileAlreadyExists { pos: Position, path: String },

    #[error("{pos} {message}")]
    Io { pos: Position, message: String },

    #[error("{pos} recursion limit of {limit} iterations exceeded")]
    RecursionLimitExceeded { pos: Position, limit: usize },

    #[error("{pos} aggregate function {name} is not allowed outside a grouped context")]
    AggregateOutsideGroup { pos: Position, name: String },
}

impl EngineError {
    pub fn position(&self) -> Position {
        match self {
            EngineError::Syntax { pos, .. }
            | EngineError::FieldNotFound { pos, .. }
            | EngineError::FieldAmbiguous { pos, .. }
            | EngineError::VariableUndefined { pos, .. }
            | EngineError::CursorUndefined { pos, .. }
            | EngineError::FunctionUndefined { pos, .. }
            | EngineError::TableUndefined { pos, .. }
            | EngineError::Redeclared { pos, .. }
            | EngineError::DuplicateFieldName { pos, .. }
            | EngineError::SetOperationWidthMismatch { pos, .. }
            | EngineError::SelectWidthMismatch { pos, .. }
            | EngineError::CursorFetchArity { pos, .. }
            | EngineError::CursorPositionNotInteger { pos, .. }
            | EngineError::UpdateAmbiguous { pos, .. }
            | EngineError::UpdateFieldUnresolved { pos, .. }
            | EngineError::DeleteTargetsUnspecified { pos }
            | EngineError::Evaluation { pos, .. }
            | EngineError::DivisionByZero { pos }
            | EngineError::FileNotFound { pos, .. }
            | EngineError::FileAlreadyExists { pos, .. }
            | EngineError::Io { pos, .. }
            | EngineError::RecursionLimitExceeded { pos, .. }
            | EngineError::AggregateOutsideGroup { pos, .. } => *pos,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_position_renders_dashes() {
        assert_eq!(Position::UNKNOWN.to_string(), "[L:- C:-]");
    }

    #[test]
    fn known_position_renders_line_col() {
        assert_eq!(Position::new(3, 7).to_string(), "[L:3 C:7]");
    }

    #[test]
    fn error_display_includes_position_prefix() {
        let err = EngineError::FieldNotFound {
            pos: Position::new(1, 1),
            name: "col1".into(),
        };
        assert_eq!(err.to_string(), "[L:1 C:1] field col1 does not exist");
    }
}
