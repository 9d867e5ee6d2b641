use indexmap::IndexMap;

use crate::ast_types::AstTypes;
use crate::cursor::Cursor;
use crate::error::{EngineError, Position, Result};
use crate::function::UserFunction;
use crate::primary::Primary;
use crate::view::View;

#[derive(Debug, Default)]
pub struct VariableScope {
    vars: IndexMap<String, Primary>,
}

impl VariableScope {
    fn key(name: &str) -> String {
        name.trim_start_matches('@').to_uppercase()
    }

    pub fn get(&self, name: &str) -> Option<&Primary> {
        self.vars.get(&Self::key(name))
    }

    pub fn set(&mut self, name: &str, value: Primary) {
        self.vars.insert(Self::key(name), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(&Self::key(name))
    }
}

#[derive(Debug, Default)]
pub struct TempViewScope {
    views: IndexMap<String, View>,
}

impl TempViewScope {
    fn key(name: &str) -> String {
        name.to_uppercase()
    }

    pub fn get(&self, name: &str) -> Option<&View> {
        self.views.get(&Self::key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut View> {
        self.views.get_mut(&Self::key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.views.contains_key(&Self::key(name))
    }

    pub fn declare(&mut self, view: View) -> Result<()> {
        let key = Self::key(&view.name);
        if self.views.contains_key(&key) {
            return Err(EngineError::Redeclared {
                pos: Position::UNKNOWN,
                name: view.name.clone(),
            });
        }
        self.views.insert(key, view);
        Ok(())
    }

    /// Replaces a declared temp view's contents in place, used by recursive
    /// CTE fixpoint iteration to rebind the working name to each round's
    /// frontier (§4.6) without touching outer scopes.
    pub fn rebind(&mut self, name: &str, view: View) {
        self.views.insert(Self::key(name), view);
    }
}

#[derive(Debug, Default)]
pub struct CursorScope<A: AstTypes> {
    cursors: IndexMap<String, Cursor<A>>,
}

impl<A: AstTypes> CursorScope<A> {
    fn key(name: &str) -> String {
        name.to_uppercase()
    }

    pub fn get(&self, name: &str) -> Option<&Cursor<A>> {
        self.cursors.get(&Self::key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Cursor<A>> {
        self.cursors.get_mut(&Self::key(name))
    }

    pub fn declare(&mut self, cursor: Cursor<A>) -> Result<()> {
        let key = Self::key(&cursor.name);
        if self.cursors.contains_key(&key) {
            return Err(EngineError::Redeclared {
                pos: Position::UNKNOWN,
                name: cursor.name.clone(),
            });
        }
        self.cursors.insert(key, cursor);
        Ok(())
    }

    pub fn dispose(&mut self, name: &str) -> Option<Cursor<A>> {
        self.cursors.shift_remove(&Self::key(name))
    }
}

#[derive(Debug, Default)]
pub struct FunctionScope<A: AstTypes> {
    functions: IndexMap<String, UserFunction<A>>,
}

impl<A: AstTypes> FunctionScope<A> {
    fn key(name: &str) -> String {
        name.to_uppercase()
    }

    pub fn get(&self, name: &str) -> Option<&UserFunction<A>> {
        self.functions.get(&Self::key(name))
    }

    pub fn declare(&mut self, function: UserFunction<A>) -> Result<()> {
        let key = Self::key(&function.name);
        if self.functions.contains_key(&key) {
            return Err(EngineError::Redeclared {
                pos: Position::UNKNOWN,
                name: function.name.clone(),
            });
        }
        self.functions.insert(key, function);
        Ok(())
    }
}

/// The procedural evaluation environment: stacked scopes for variables,
/// temporary views, cursors, and user-defined functions. A scope is pushed
/// on entering a block (user function body, IF/WHILE body, inline-table
/// scope) and popped on exit; lookups walk innermost-to-outermost.
#[derive(Debug)]
pub struct Filter<A: AstTypes> {
    variables: Vec<VariableScope>,
    temp_views: Vec<TempViewScope>,
    cursors: Vec<CursorScope<A>>,
    functions: Vec<FunctionScope<A>>,
}

impl<A: AstTypes> Default for Filter<A> {
    fn default() -> Self {
        Self {
            variables: vec![VariableScope::default()],
            temp_views: vec![TempViewScope::default()],
            cursors: vec![CursorScope::default()],
            functions: vec![FunctionScope::default()],
        }
    }
}

impl<A: AstTypes> Filter<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_block(&mut self) {
        self.variables.push(VariableScope::default());
        self.temp_views.push(TempViewScope::default());
        self.cursors.push(CursorScope::default());
        self.functions.push(FunctionScope::default());
    }

    pub fn pop_block(&mut self) {
        debug_assert!(self.variables.len() > 1, "popping the root scope");
        self.variables.pop();
        self.temp_views.pop();
        self.cursors.pop();
        self.functions.pop();
    }

    pub fn get_variable(&self, name: &str) -> Result<&Primary> {
        self.variables
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .ok_or_else(|| EngineError::VariableUndefined {
                pos: Position::UNKNOWN,
                name: name.to_string(),
            })
    }

    /// Writes to the innermost scope that already declares `name`, or
    /// declares it fresh in the innermost scope when it is not yet bound
    /// anywhere (the usual `SET @x = ...`/`VAR := expr` case).
    pub fn set_variable(&mut self, name: &str, value: Primary) {
        for scope in self.variables.iter_mut().rev() {
            if scope.contains(name) {
                scope.set(name, value);
                return;
            }
        }
        self.variables
            .last_mut()
            .expect("root scope always present")
            .set(name, value);
    }

    pub fn declare_variable_in_current_scope(&mut self, name: &str, value: Primary) {
        self.variables
            .last_mut()
            .expect("root scope always present")
            .set(name, value);
    }

    pub fn get_temp_view(&self, name: &str) -> Option<&View> {
        self.temp_views.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn get_temp_view_mut(&mut self, name: &str) -> Option<&mut View> {
        self.temp_views.iter_mut().rev().find_map(|scope| scope.get_mut(name))
    }

    pub fn declare_temp_view(&mut self, view: View) -> Result<()> {
        self.temp_views
            .last_mut()
            .expect("root scope always present")
            .declare(view)
    }

    pub fn rebind_temp_view(&mut self, name: &str, view: View) {
        self.temp_views
            .last_mut()
            .expect("root scope always present")
            .rebind(name, view);
    }

    pub fn get_cursor(&self, name: &str) -> Result<&Cursor<A>> {
        self.cursors
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .ok_or_else(|| EngineError::CursorUndefined {
                pos: Position::UNKNOWN,
                name: name.to_string(),
            })
    }

    pub fn get_cursor_mut(&mut self, name: &str) -> Result<&mut Cursor<A>> {
        self.cursors
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
            .ok_or_else(|| EngineError::CursorUndefined {
                pos: Position::UNKNOWN,
                name: name.to_string(),
            })
    }

    pub fn declare_cursor(&mut self, cursor: Cursor<A>) -> Result<()> {
        self.cursors
            .last_mut()
            .expect("root scope always present")
            .declare(cursor)
    }

    pub fn dispose_cursor(&mut self, name: &str) -> Option<Cursor<A>> {
        self.cursors
            .last_mut()
            .expect("root scope always present")
            .dispose(name)
    }

    pub fn get_function(&self, name: &str) -> Option<&UserFunction<A>> {
        self.functions.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn declare_function(&mut self, function: UserFunction<A>) -> Result<()> {
        self.functions
            .last_mut()
            .expect("root scope always present")
            .declare(function)
    }

    pub fn scope_depth(&self) -> usize {
        self.variables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestTypes;
    impl AstTypes for TestTypes {
        type Query = ();
        type Statement = ();
        type Expr = ();
    }

    #[test]
    fn pop_restores_outer_visibility() {
        let mut filter: Filter<TestTypes> = Filter::new();
        filter.declare_variable_in_current_scope("x", Primary::Integer(1));
        let before = filter.get_variable("x").is_ok();

        filter.push_block();
        filter.declare_variable_in_current_scope("y", Primary::Integer(2));
        assert!(filter.get_variable("y").is_ok());
        assert!(filter.get_variable("x").is_ok());
        filter.pop_block();

        assert_eq!(before, filter.get_variable("x").is_ok());
        assert!(filter.get_variable("y").is_err());
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut filter: Filter<TestTypes> = Filter::new();
        filter.declare_variable_in_current_scope("x", Primary::Integer(1));
        filter.push_block();
        filter.declare_variable_in_current_scope("x", Primary::Integer(2));
        assert_eq!(filter.get_variable("x").unwrap().as_i64(), Some(2));
        filter.pop_block();
        assert_eq!(filter.get_variable("x").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn lookup_walks_innermost_first_and_writes_existing_binding() {
        let mut filter: Filter<TestTypes> = Filter::new();
        filter.declare_variable_in_current_scope("x", Primary::Integer(1));
        filter.push_block();
        filter.set_variable("x", Primary::Integer(9));
        filter.pop_block();
        assert_eq!(filter.get_variable("x").unwrap().as_i64(), Some(9));
    }
}
