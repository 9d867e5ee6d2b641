use crate::ast_types::AstTypes;

#[derive(Debug, Clone)]
pub struct Parameter<A: AstTypes> {
    pub name: String,
    pub default: Option<A::Expr>,
}

#[derive(Debug, Clone)]
pub enum FunctionBody<A: AstTypes> {
    Statements(Vec<A::Statement>),
    Expression(A::Expr),
}

/// (name, parameter list, defaults, body statements or expression, cursor
/// usage) per §3.
#[derive(Debug, Clone)]
pub struct UserFunction<A: AstTypes> {
    pub name: String,
    pub params: Vec<Parameter<A>>,
    pub body: FunctionBody<A>,
    pub is_aggregate: bool,
    pub uses_cursor: bool,
}

impl<A: AstTypes> UserFunction<A> {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn required_arity(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }
}
