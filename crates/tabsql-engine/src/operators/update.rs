use tabsql_ast::{TableFactor, TableWithJoins, UpdateStmt};
use tabsql_core::{EngineError, Position, Primary, Result};

use crate::context::RowContext;
use crate::engine::Engine;

struct Edit {
    view: String,
    row_index: usize,
    column: usize,
    value: Primary,
    field: String,
}

fn implicit_from(targets: &[String]) -> Vec<TableWithJoins> {
    targets
        .iter()
        .map(|name| TableWithJoins {
            table: TableFactor::Named {
                name: name.clone(),
                alias: None,
            },
            joins: Vec::new(),
        })
        .collect()
}

impl Engine {
    /// `UPDATE targets SET col = expr, ... [FROM ...] [WHERE ...]`. The
    /// working relation is the (possibly joined) `FROM` clause, or the
    /// target tables themselves when no `FROM` is given; each matching row's
    /// provenance maps an assignment back onto exactly one base row of the
    /// table it targets, or fails as ambiguous (§4.4) when it maps to more
    /// than one.
    pub fn execute_update(&mut self, update: &UpdateStmt, pos: Position) -> Result<usize> {
        let from = if update.from.is_empty() {
            implicit_from(&update.targets)
        } else {
            update.from.clone()
        };

        let relation = self.resolve_from(&from)?;

        let mut edits: Vec<Edit> = Vec::new();
        let mut affected = 0usize;

        for (row, prov) in relation.rows.iter().zip(relation.provenance.iter()) {
            let matches = match &update.selection {
                Some(expr) => self
                    .eval_expr(expr, RowContext::single(&relation.header, row))?
                    .as_ternary()
                    .is_true(),
                None => true,
            };
            if !matches {
                continue;
            }
            affected += 1;

            for (field_ref, expr) in &update.assignments {
                let header_idx = relation
                    .header
                    .resolve(field_ref.view.as_deref(), &field_ref.column)
                    .map_err(|_| EngineError::UpdateFieldUnresolved {
                        pos,
                        name: field_ref.column.clone(),
                    })?;
                let target_view = relation
                    .header
                    .get(header_idx)
                    .expect("resolved index is in bounds")
                    .view
                    .to_string();

                if !update.targets.iter().any(|t| t.eq_ignore_ascii_case(&target_view)) {
                    return Err(EngineError::UpdateFieldUnresolved {
                        pos,
                        name: field_ref.column.clone(),
                    });
                }

                let value = self.eval_expr(expr, RowContext::single(&relation.header, row))?;

                let matching: Vec<&(String, usize)> = prov.iter().filter(|(v, _)| v.eq_ignore_ascii_case(&target_view)).collect();
                if matching.len() > 1 {
                    return Err(EngineError::UpdateAmbiguous {
                        pos,
                        value: value.as_str_display(),
                        field: field_ref.column.clone(),
                    });
                }
                let (_, base_row_index) = *matching.first().ok_or_else(|| EngineError::UpdateFieldUnresolved {
                    pos,
                    name: field_ref.column.clone(),
                })?;

                let view_header = self.target_header(&target_view, pos)?;
                let column = view_header
                    .resolve(None, &field_ref.column)
                    .map_err(|_| EngineError::UpdateFieldUnresolved {
                        pos,
                        name: field_ref.column.clone(),
                    })?;

                edits.push(Edit {
                    view: target_view,
                    row_index: *base_row_index,
                    column,
                    value,
                    field: field_ref.column.clone(),
                });
            }
        }

        for (i, edit) in edits.iter().enumerate() {
            for other in &edits[i + 1..] {
                if edit.view.eq_ignore_ascii_case(&other.view)
                    && edit.row_index == other.row_index
                    && edit.column == other.column
                    && edit.value != other.value
                {
                    return Err(EngineError::UpdateAmbiguous {
                        pos,
                        value: other.value.as_str_display(),
                        field: edit.field.clone(),
                    });
                }
            }
        }

        let mut target_views: Vec<String> = Vec::new();
        for edit in &edits {
            if !target_views.iter().any(|v| v.eq_ignore_ascii_case(&edit.view)) {
                target_views.push(edit.view.clone());
            }
        }

        for view_name in &target_views {
            self.with_target_view_mut(view_name, pos, |view| {
                let mut touched = 0usize;
                for edit in edits.iter().filter(|e| e.view.eq_ignore_ascii_case(view_name)) {
                    if let Some(record) = view.records.get_mut(edit.row_index) {
                        record.set(edit.column, edit.value.clone());
                        touched += 1;
                    }
                }
                view.operated_fields += touched;
                Ok(())
            })?;
        }

        Ok(affected)
    }
}
