use crate::relation::Relation;

/// What one executed statement hands back to the caller (the CLI, or a test):
/// a rendered row set for `SELECT`, a plain message for `PRINT`/COMMIT/etc.,
/// or an affected-row count for DML/DDL (§6, "Output from the core").
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    Rows { header: Vec<String>, rows: Vec<Vec<String>> },
    Message(String),
    Affected(usize),
}

impl StatementResult {
    pub fn from_relation(relation: &Relation) -> Self {
        let header = relation.header.column_names();
        let rows = relation
            .rows
            .iter()
            .map(|row| row.values().iter().map(|v| v.as_str_display()).collect())
            .collect();
        StatementResult::Rows { header, rows }
    }
}
