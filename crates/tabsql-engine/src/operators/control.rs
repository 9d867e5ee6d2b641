use tabsql_ast::{FetchStmt, Statement, StatementKind};
use tabsql_core::{EngineError, Header, Position, Primary, Record, Result};

use crate::context::RowContext;
use crate::engine::Engine;
use crate::result::StatementResult;
use crate::types::{Cursor, Filter, FunctionBody, UserFunction};

/// What a statement or block finished with: fell off the end normally, or
/// unwound carrying a `BREAK`/`CONTINUE`/`RETURN` signal that an enclosing
/// `WHILE`/`LOOP` or function body must intercept.
pub enum Signal {
    Normal,
    Break,
    Continue,
    Return(Option<Primary>),
}

fn empty_row() -> (Header, Record) {
    (Header::default(), Record::new(Vec::new()))
}

impl Engine {
    pub fn execute_script(&mut self, statements: &[Statement]) -> Result<Vec<StatementResult>> {
        let mut out = Vec::new();
        let signal = self.execute_block(statements, &mut out)?;
        if let Signal::Return(_) = signal {
            log::warn!("top-level RETURN outside any function body is ignored");
        }
        self.commit()?;
        Ok(out)
    }

    pub fn execute_block(&mut self, statements: &[Statement], out: &mut Vec<StatementResult>) -> Result<Signal> {
        for stmt in statements {
            match self.execute_statement(stmt, out)? {
                Signal::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Signal::Normal)
    }

    fn execute_statement(&mut self, stmt: &Statement, out: &mut Vec<StatementResult>) -> Result<Signal> {
        match &stmt.kind {
            StatementKind::Select(query) => {
                let relation = self.execute_select_query(query)?;
                out.push(StatementResult::from_relation(&relation));
                Ok(Signal::Normal)
            }
            StatementKind::Insert(insert) => {
                let affected = self.execute_insert(insert, stmt.pos)?;
                out.push(StatementResult::Affected(affected));
                Ok(Signal::Normal)
            }
            StatementKind::Update(update) => {
                let affected = self.execute_update(update, stmt.pos)?;
                out.push(StatementResult::Affected(affected));
                Ok(Signal::Normal)
            }
            StatementKind::Delete(delete) => {
                let affected = self.execute_delete(delete, stmt.pos)?;
                out.push(StatementResult::Affected(affected));
                Ok(Signal::Normal)
            }
            StatementKind::CreateTable(create) => {
                self.execute_create_table(create, stmt.pos)?;
                out.push(StatementResult::Message(format!("table {} created", create.name)));
                Ok(Signal::Normal)
            }
            StatementKind::AlterTable(alter) => {
                self.execute_alter_table(alter, stmt.pos)?;
                out.push(StatementResult::Message(format!("table {} altered", alter.name)));
                Ok(Signal::Normal)
            }
            StatementKind::DeclareVariable { name, default } => {
                let value = self.eval_default(default.as_ref())?;
                self.filter.declare_variable_in_current_scope(name, value);
                Ok(Signal::Normal)
            }
            StatementKind::DeclareTable(decl) => {
                self.execute_declare_table(decl, stmt.pos)?;
                Ok(Signal::Normal)
            }
            StatementKind::DeclareCursor { name, query } => {
                self.filter.declare_cursor(Cursor::new(name.clone(), query.clone()))?;
                Ok(Signal::Normal)
            }
            StatementKind::DeclareFunction(decl) => {
                self.filter.declare_function(UserFunction {
                    name: decl.name.clone(),
                    params: decl
                        .params
                        .iter()
                        .map(|p| crate::types::Parameter {
                            name: p.name.clone(),
                            default: p.default.clone(),
                        })
                        .collect(),
                    body: match &decl.body {
                        tabsql_ast::FunctionBodyAst::Statements(stmts) => FunctionBody::Statements(stmts.clone()),
                        tabsql_ast::FunctionBodyAst::Expression(expr) => FunctionBody::Expression(expr.clone()),
                    },
                    is_aggregate: decl.is_aggregate,
                    uses_cursor: decl.uses_cursor,
                })?;
                Ok(Signal::Normal)
            }
            StatementKind::OpenCursor(name) => {
                self.open_cursor(name, stmt.pos)?;
                Ok(Signal::Normal)
            }
            StatementKind::FetchCursor(fetch) => {
                self.fetch_cursor(fetch, stmt.pos)?;
                Ok(Signal::Normal)
            }
            StatementKind::CloseCursor(name) => {
                self.filter.get_cursor_mut(name)?.close();
                Ok(Signal::Normal)
            }
            StatementKind::DisposeCursor(name) => {
                self.filter.dispose_cursor(name);
                Ok(Signal::Normal)
            }
            StatementKind::SetVariable { name, value } => {
                let (header, row) = empty_row();
                let evaluated = self.eval_expr(value, RowContext::single(&header, &row))?;
                self.filter.set_variable(name, evaluated);
                Ok(Signal::Normal)
            }
            StatementKind::If { branches, else_branch } => {
                let (header, row) = empty_row();
                for (condition, body) in branches {
                    if self.eval_expr(condition, RowContext::single(&header, &row))?.as_ternary().is_true() {
                        self.filter.push_block();
                        let signal = self.execute_block(body, out);
                        self.filter.pop_block();
                        return signal;
                    }
                }
                if let Some(body) = else_branch {
                    self.filter.push_block();
                    let signal = self.execute_block(body, out);
                    self.filter.pop_block();
                    return signal;
                }
                Ok(Signal::Normal)
            }
            StatementKind::While { condition, body } => {
                loop {
                    let (header, row) = empty_row();
                    if !self.eval_expr(condition, RowContext::single(&header, &row))?.as_ternary().is_true() {
                        break;
                    }
                    self.filter.push_block();
                    let signal = self.execute_block(body, out);
                    self.filter.pop_block();
                    match signal? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal => {}
                        returned @ Signal::Return(_) => return Ok(returned),
                    }
                }
                Ok(Signal::Normal)
            }
            StatementKind::Loop { body } => {
                loop {
                    self.filter.push_block();
                    let signal = self.execute_block(body, out);
                    self.filter.pop_block();
                    match signal? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal => {}
                        returned @ Signal::Return(_) => return Ok(returned),
                    }
                }
                Ok(Signal::Normal)
            }
            StatementKind::Continue => Ok(Signal::Continue),
            StatementKind::Break => Ok(Signal::Break),
            StatementKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => {
                        let (header, row) = empty_row();
                        Some(self.eval_expr(expr, RowContext::single(&header, &row))?)
                    }
                    None => None,
                };
                Ok(Signal::Return(value))
            }
            StatementKind::Print(exprs) => {
                let (header, row) = empty_row();
                let mut parts = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    parts.push(self.eval_expr(expr, RowContext::single(&header, &row))?.as_str_display());
                }
                let message = parts.join(" ");
                log::info!("{message}");
                out.push(StatementResult::Message(message));
                Ok(Signal::Normal)
            }
            StatementKind::Commit => {
                self.commit()?;
                out.push(StatementResult::Message("COMMIT".to_string()));
                Ok(Signal::Normal)
            }
            StatementKind::Rollback => {
                self.rollback();
                out.push(StatementResult::Message("ROLLBACK".to_string()));
                Ok(Signal::Normal)
            }
        }
    }

    fn eval_default(&mut self, default: Option<&tabsql_ast::Expr>) -> Result<Primary> {
        match default {
            Some(expr) => {
                let (header, row) = empty_row();
                self.eval_expr(expr, RowContext::single(&header, &row))
            }
            None => Ok(Primary::Null),
        }
    }

    /// Invokes a declared user function/aggregate: a fresh scope seeded with
    /// bound parameters (defaults fill missing trailing arguments), running
    /// its body to either an expression result or the value of its first
    /// `RETURN`.
    pub fn call_user_function(&mut self, name: &str, args: Vec<Primary>, pos: Position) -> Result<Primary> {
        let function = self
            .filter
            .get_function(name)
            .cloned()
            .ok_or_else(|| EngineError::FunctionUndefined {
                pos,
                name: name.to_string(),
            })?;

        if args.len() > function.arity() || args.len() < function.required_arity() {
            return Err(EngineError::Evaluation {
                pos,
                message: format!(
                    "function {name} expects between {} and {} arguments, got {}",
                    function.required_arity(),
                    function.arity(),
                    args.len()
                ),
            });
        }

        self.filter.push_block();
        let mut bind_error = None;
        for (i, param) in function.params.iter().enumerate() {
            let value = match args.get(i) {
                Some(v) => v.clone(),
                None => match &param.default {
                    Some(expr) => match self.eval_default(Some(expr)) {
                        Ok(v) => v,
                        Err(e) => {
                            bind_error = Some(e);
                            Primary::Null
                        }
                    },
                    None => Primary::Null,
                },
            };
            self.filter.declare_variable_in_current_scope(&param.name, value);
        }

        let result = if let Some(err) = bind_error {
            Err(err)
        } else {
            match &function.body {
                FunctionBody::Expression(expr) => {
                    let (header, row) = empty_row();
                    self.eval_expr(expr, RowContext::single(&header, &row))
                }
                FunctionBody::Statements(stmts) => {
                    let mut out = Vec::new();
                    match self.execute_block(stmts, &mut out) {
                        Ok(Signal::Return(value)) => Ok(value.unwrap_or(Primary::Null)),
                        Ok(_) => Ok(Primary::Null),
                        Err(e) => Err(e),
                    }
                }
            }
        };

        self.filter.pop_block();
        result
    }

    fn open_cursor(&mut self, name: &str, pos: Position) -> Result<()> {
        let query = self.filter.get_cursor(name)?.query.clone();
        let relation = self.execute_select_query(&query)?;
        let cursor = self.filter.get_cursor_mut(name)?;
        let _ = pos;
        cursor.open(relation.rows);
        Ok(())
    }

    fn fetch_cursor(&mut self, fetch: &FetchStmt, pos: Position) -> Result<()> {
        self.advance_cursor(&fetch.cursor, &fetch.position, pos)?;
        let cursor = self.filter.get_cursor(&fetch.cursor)?;
        let rows = cursor.rows.as_ref().ok_or_else(|| EngineError::CursorUndefined {
            pos,
            name: fetch.cursor.clone(),
        })?;
        let row = match cursor.position {
            tabsql_core::CursorPosition::At(idx) => rows.get(idx),
            _ => None,
        };

        if let Some(row) = row {
            if row.len() != fetch.targets.len() {
                return Err(EngineError::CursorFetchArity {
                    pos,
                    name: fetch.cursor.clone(),
                    expected: fetch.targets.len(),
                    actual: row.len(),
                });
            }
            let values: Vec<Primary> = row.values().to_vec();
            for (target, value) in fetch.targets.iter().zip(values) {
                self.filter.set_variable(target, value);
            }
        } else {
            for target in &fetch.targets {
                self.filter.set_variable(target, Primary::Null);
            }
        }
        Ok(())
    }

    fn advance_cursor(&mut self, name: &str, position: &tabsql_ast::FetchPosition, pos: Position) -> Result<()> {
        use tabsql_ast::FetchPosition;
        use tabsql_core::CursorPosition;

        let cursor = self.filter.get_cursor_mut(name)?;
        let len = cursor.rows.as_ref().map(Vec::len).unwrap_or(0);
        let current = match cursor.position {
            CursorPosition::BeforeFirst => -1i64,
            CursorPosition::At(i) => i as i64,
            CursorPosition::AfterLast => len as i64,
        };

        let next = match position {
            FetchPosition::Next => current + 1,
            FetchPosition::Prior => current - 1,
            FetchPosition::First => 0,
            FetchPosition::Last => len as i64 - 1,
            FetchPosition::Absolute(expr) => {
                let (header, row) = empty_row();
                let value = self.eval_expr(expr, RowContext::single(&header, &row))?;
                value.as_i64().ok_or_else(|| EngineError::CursorPositionNotInteger {
                    pos,
                    value: value.as_str_display(),
                })?
            }
            FetchPosition::Relative(expr) => {
                let (header, row) = empty_row();
                let value = self.eval_expr(expr, RowContext::single(&header, &row))?;
                let delta = value.as_i64().ok_or_else(|| EngineError::CursorPositionNotInteger {
                    pos,
                    value: value.as_str_display(),
                })?;
                current + delta
            }
        };

        let cursor = self.filter.get_cursor_mut(name)?;
        cursor.position = if next < 0 {
            CursorPosition::BeforeFirst
        } else if next as usize >= len {
            CursorPosition::AfterLast
        } else {
            CursorPosition::At(next as usize)
        };
        Ok(())
    }
}
