use crate::ast_types::AstTypes;
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    BeforeFirst,
    At(usize),
    AfterLast,
}

/// (query, fetched records materialized on first open, current index, open
/// flag) per §3. `DECLARE` registers a `Cursor`; `OPEN` materializes `rows`;
/// `FETCH` advances `position`; `CLOSE` discards `rows` but keeps `query`.
#[derive(Debug, Clone)]
pub struct Cursor<A: AstTypes> {
    pub name: String,
    pub query: A::Query,
    pub rows: Option<Vec<Record>>,
    pub position: CursorPosition,
}

impl<A: AstTypes> Cursor<A> {
    pub fn new(name: impl Into<String>, query: A::Query) -> Self {
        Self {
            name: name.into(),
            query,
            rows: None,
            position: CursorPosition::BeforeFirst,
        }
    }

    pub fn is_open(&self) -> bool {
        self.rows.is_some()
    }

    pub fn open(&mut self, rows: Vec<Record>) {
        self.rows = Some(rows);
        self.position = CursorPosition::BeforeFirst;
    }

    pub fn close(&mut self) {
        self.rows = None;
        self.position = CursorPosition::BeforeFirst;
    }

    pub fn width(&self) -> Option<usize> {
        self.rows.as_ref().and_then(|r| r.first()).map(|r| r.len())
    }
}
