use std::collections::{HashMap, HashSet};

use tabsql_ast::{DeleteStmt, TableFactor, TableWithJoins};
use tabsql_core::{EngineError, Position, Result};

use crate::context::RowContext;
use crate::engine::Engine;

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

/// The table a target-less `DELETE FROM t WHERE ...` implicitly targets:
/// valid only when `from` is a single, unjoined, named table (§4.5).
fn implicit_target(from: &[TableWithJoins], pos: Position) -> Result<String> {
    if from.len() == 1 && from[0].joins.is_empty() {
        match &from[0].table {
            TableFactor::Named { name, .. } | TableFactor::TempView { name, .. } => return Ok(name.clone()),
            _ => {}
        }
    }
    Err(EngineError::DeleteTargetsUnspecified { pos })
}

impl Engine {
    /// `DELETE targets [FROM ...] [WHERE ...]`. The target list may be
    /// empty only when FROM names exactly one table, which is then the
    /// implicit target (§4.5); rows are removed from each target's own
    /// records via the provenance of every matching working row, so a join
    /// deletes the correct base rows on each side independently.
    pub fn execute_delete(&mut self, delete: &DeleteStmt, pos: Position) -> Result<usize> {
        let targets: Vec<String> = if delete.targets.is_empty() {
            vec![implicit_target(&delete.from, pos)?]
        } else {
            delete.targets.clone()
        };

        let from = if delete.from.is_empty() {
            implicit_from(&targets)
        } else {
            delete.from.clone()
        };

        let relation = self.resolve_from(&from)?;

        let mut removals: HashMap<String, HashSet<usize>> = HashMap::new();
        for (row, prov) in relation.rows.iter().zip(relation.provenance.iter()) {
            let matches = match &delete.selection {
                Some(expr) => self
                    .eval_expr(expr, RowContext::single(&relation.header, row))?
                    .as_ternary()
                    .is_true(),
                None => true,
            };
            if !matches {
                continue;
            }
            for (view_name, row_index) in prov {
                if targets.iter().any(|t| t.eq_ignore_ascii_case(view_name)) {
                    removals.entry(view_name.clone()).or_default().insert(*row_index);
                }
            }
        }

        let affected = removals.values().map(HashSet::len).sum();

        for (view_name, indices) in &removals {
            self.with_target_view_mut(view_name, pos, |view| {
                let mut kept_records = Vec::with_capacity(view.records.len());
                let mut kept_provenance = Vec::with_capacity(view.provenance.len());
                for (i, (record, prov)) in view.records.iter().zip(view.provenance.iter()).enumerate() {
                    if !indices.contains(&i) {
                        kept_records.push(record.clone());
                        kept_provenance.push(prov.clone());
                    }
                }
                view.operated_records += view.records.len() - kept_records.len();
                view.records = kept_records;
                view.provenance = kept_provenance;
                Ok(())
            })?;
        }

        Ok(affected)
    }
}
