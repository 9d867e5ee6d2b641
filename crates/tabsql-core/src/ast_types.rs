/// Associates the three AST node families the procedural environment needs
/// to hold onto (a query, a statement, an expression) without `tabsql-core`
/// depending on `tabsql-ast` directly — that dependency would be circular,
/// since AST literals hold [`crate::primary::Primary`] values. `tabsql-engine`
/// provides the concrete instantiation.
pub trait AstTypes: Sized {
    type Query: Clone;
    type Statement: Clone;
    type Expr: Clone;
}
