use tabsql_ast::{AlterAction, AlterTableStmt, CreateTableStmt, DeclareTableStmt, Placement};
use tabsql_core::{EngineError, FileInfo, Header, HeaderField, Position, Primary, Record, Result, View};

use crate::context::RowContext;
use crate::engine::Engine;

impl Engine {
    /// `CREATE TABLE name (columns...)`: declares a new, empty persistent
    /// view at the name's resolved file path. Fails if a file already
    /// exists there (§4.7) — this never overwrites.
    pub fn execute_create_table(&mut self, create: &CreateTableStmt, pos: Position) -> Result<()> {
        if let Some((path, _)) = self.resolve_table_path(&create.name) {
            if path.is_file() {
                return Err(EngineError::FileAlreadyExists {
                    pos,
                    path: path.display().to_string(),
                });
            }
        }

        let path = self.new_table_path(&create.name);
        let delimiter = Engine::delimiter_for(&path, self.config.default_delimiter);
        let fields = create
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| HeaderField::new(create.name.clone(), name.clone(), i + 1))
            .collect();
        let header = Header::new(fields);

        let mut view = View::new(create.name.clone(), FileInfo::persistent(path.clone(), delimiter), header, Vec::new());
        view.mark_dirty();
        self.views.insert(&path, view);
        Ok(())
    }

    /// `ALTER TABLE name ADD/DROP/RENAME COLUMN`. Adding a column fills
    /// every existing row with its default (or `NULL`); dropping removes
    /// the column's value from every row; both renumber ordinals so `#n`
    /// keeps working afterward.
    pub fn execute_alter_table(&mut self, alter: &AlterTableStmt, pos: Position) -> Result<()> {
        match &alter.action {
            AlterAction::AddColumns(specs) => {
                let empty_header = Header::default();
                let empty_row = Record::new(Vec::new());
                let mut computed: Vec<(String, Placement, Primary)> = Vec::with_capacity(specs.len());
                for spec in specs {
                    let value = match &spec.default {
                        Some(expr) => self.eval_expr(expr, RowContext::single(&empty_header, &empty_row))?,
                        None => Primary::Null,
                    };
                    computed.push((spec.name.clone(), spec.placement.clone(), value));
                }

                self.with_target_view_mut(&alter.name, pos, |view| {
                    for (name, placement, value) in &computed {
                        let insert_at = match placement {
                            Placement::Default => view.header.len(),
                            Placement::First => 0,
                            Placement::After(anchor) => view
                                .header
                                .fields()
                                .iter()
                                .position(|f| f.column.eq_ignore_ascii_case(anchor))
                                .map(|i| i + 1)
                                .unwrap_or(view.header.len()),
                            Placement::Before(anchor) => view
                                .header
                                .fields()
                                .iter()
                                .position(|f| f.column.eq_ignore_ascii_case(anchor))
                                .unwrap_or(view.header.len()),
                        };
                        view.header.insert(insert_at, HeaderField::new(view.name.clone(), name.clone(), 0));
                        for record in &mut view.records {
                            record.insert(insert_at, value.clone());
                        }
                    }
                    view.operated_fields += computed.len();
                    Ok(())
                })?;
            }
            AlterAction::DropColumns(names) => {
                self.with_target_view_mut(&alter.name, pos, |view| {
                    for name in names {
                        let idx = view
                            .header
                            .fields()
                            .iter()
                            .position(|f| f.column.eq_ignore_ascii_case(name))
                            .ok_or_else(|| EngineError::FieldNotFound {
                                pos,
                                name: name.clone(),
                            })?;
                        view.header.remove(idx);
                        for record in &mut view.records {
                            record.remove(idx);
                        }
                    }
                    view.operated_fields += names.len();
                    Ok(())
                })?;
            }
            AlterAction::RenameColumn { old, new } => {
                self.with_target_view_mut(&alter.name, pos, |view| {
                    let field = view
                        .header
                        .fields_mut()
                        .iter_mut()
                        .find(|f| f.column.eq_ignore_ascii_case(old))
                        .ok_or_else(|| EngineError::FieldNotFound {
                            pos,
                            name: old.clone(),
                        })?;
                    field.column = new.clone().into();
                    view.operated_fields += 1;
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    /// `DECLARE TABLE name (columns...) [AS query]`: declares a temp view,
    /// either empty with the given columns or seeded from a query's result.
    pub fn execute_declare_table(&mut self, decl: &DeclareTableStmt, pos: Position) -> Result<()> {
        let _ = pos;
        let view = match &decl.as_query {
            Some(query) => {
                let relation = self.execute_select_query(query)?;
                self.relation_to_temp_view(&decl.name, &decl.columns, relation)
            }
            None => {
                let fields = decl
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, name)| HeaderField::new(decl.name.clone(), name.clone(), i + 1))
                    .collect();
                View::empty_temporary(decl.name.clone(), Header::new(fields))
            }
        };
        self.filter.declare_temp_view(view)?;
        Ok(())
    }
}
