use tabsql_ast::{Expr, SelectQuery, Statement};
use tabsql_core::AstTypes;

/// The concrete instantiation of [`tabsql_core::AstTypes`]: cursors, user
/// functions and the procedural `Filter` all close over `tabsql-ast` nodes
/// through this marker.
#[derive(Debug, Clone, Copy)]
pub struct Types;

impl AstTypes for Types {
    type Query = SelectQuery;
    type Statement = Statement;
    type Expr = Expr;
}

pub type Cursor = tabsql_core::Cursor<Types>;
pub type UserFunction = tabsql_core::UserFunction<Types>;
pub type FunctionBody = tabsql_core::FunctionBody<Types>;
pub type Parameter = tabsql_core::Parameter<Types>;
pub type Filter = tabsql_core::Filter<Types>;
