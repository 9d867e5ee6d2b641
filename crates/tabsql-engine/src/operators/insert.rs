use tabsql_ast::{InsertSource, InsertStmt};
use tabsql_core::{EngineError, Header, Position, Primary, Record, Result};

use crate::context::RowContext;
use crate::engine::Engine;

impl Engine {
    /// `INSERT INTO target [(columns)] VALUES (...), ... | SELECT ...`.
    /// Columns not named in an explicit column list default to `NULL`,
    /// matching a CSV row with missing trailing fields.
    pub fn execute_insert(&mut self, insert: &InsertStmt, pos: Position) -> Result<usize> {
        let header = self.target_header(&insert.target, pos)?;
        let width = header.len();
        let column_names = header.column_names();

        let target_columns: Vec<usize> = match &insert.columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    column_names
                        .iter()
                        .position(|c| c.eq_ignore_ascii_case(name))
                        .ok_or_else(|| EngineError::FieldNotFound {
                            pos,
                            name: name.clone(),
                        })
                })
                .collect::<Result<_>>()?,
            None => (0..width).collect(),
        };

        let empty_header = Header::default();
        let empty_row = Record::new(Vec::new());

        let rows: Vec<Vec<Primary>> = match &insert.source {
            InsertSource::Values(value_rows) => {
                let mut out = Vec::with_capacity(value_rows.len());
                for value_row in value_rows {
                    if value_row.len() != target_columns.len() {
                        return Err(EngineError::SelectWidthMismatch {
                            pos,
                            expected: target_columns.len(),
                        });
                    }
                    let mut values = Vec::with_capacity(value_row.len());
                    for expr in value_row {
                        values.push(self.eval_expr(expr, RowContext::single(&empty_header, &empty_row))?);
                    }
                    out.push(values);
                }
                out
            }
            InsertSource::Select(query) => {
                let relation = self.execute_select_query(query)?;
                if relation.width() != target_columns.len() {
                    return Err(EngineError::SelectWidthMismatch {
                        pos,
                        expected: target_columns.len(),
                    });
                }
                relation.rows.into_iter().map(|row| row.into_values()).collect()
            }
        };

        let affected = rows.len();
        self.with_target_view_mut(&insert.target, pos, |view| {
            for row_values in rows {
                let mut full = vec![Primary::Null; width];
                for (slot, value) in target_columns.iter().zip(row_values) {
                    full[*slot] = value;
                }
                view.push_own_row(Record::new(full));
            }
            view.operated_records += affected;
            Ok(())
        })?;

        Ok(affected)
    }
}
