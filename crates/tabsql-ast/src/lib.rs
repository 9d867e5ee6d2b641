//! AST node shapes produced by the parser collaborator and consumed by the
//! query execution engine (§6 of the design). None of these types know how
//! to evaluate themselves — that is `tabsql-engine`'s job.

use tabsql_core::{Position, Primary};

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Position,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Primary),
    Variable(String),
    Field {
        view: Option<String>,
        column: String,
    },
    ColumnNumber(usize),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    Aggregate {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
        /// `true` for `count(*)`.
        star: bool,
    },
    Subquery(Box<SelectQuery>),
    Exists {
        query: Box<SelectQuery>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        query: Box<SelectQuery>,
        negated: bool,
    },
    AnyAll {
        expr: Box<Expr>,
        op: BinaryOp,
        quantifier: Quantifier,
        query: Box<SelectQuery>,
    },
    Case {
        operand: Option<Box<Expr>>,
        whens: Vec<(Expr, Expr)>,
        else_branch: Option<Box<Expr>>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Coalesce(Vec<Expr>),
    NullIf(Box<Expr>, Box<Expr>),
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Cast {
        expr: Box<Expr>,
        target: CastTarget,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTarget {
    String,
    Integer,
    Float,
    Datetime,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Projection {
    Wildcard,
    QualifiedWildcard(String),
    Item(SelectItem),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
    NaturalInner,
    NaturalLeftOuter,
    NaturalRightOuter,
    NaturalFullOuter,
}

#[derive(Debug, Clone)]
pub enum JoinCondition {
    On(Expr),
    Using(Vec<String>),
    None,
}

#[derive(Debug, Clone)]
pub enum TableFactor {
    Named {
        name: String,
        alias: Option<String>,
    },
    TempView {
        name: String,
        alias: Option<String>,
    },
    InlineTableRef {
        name: String,
        alias: Option<String>,
    },
    Subquery {
        query: Box<SelectQuery>,
        alias: String,
    },
    FunctionTable {
        name: String,
        args: Vec<Expr>,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableFactor,
    pub condition: JoinCondition,
}

#[derive(Debug, Clone)]
pub struct TableWithJoins {
    pub table: TableFactor,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone)]
pub struct SelectCore {
    pub distinct: bool,
    pub projection: Vec<Projection>,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone)]
pub enum SetExpr {
    Select(Box<SelectCore>),
    SetOperation {
        op: SetOp,
        all: bool,
        left: Box<SetExpr>,
        right: Box<SetExpr>,
    },
}

#[derive(Debug, Clone)]
pub struct OrderKey {
    pub expr: Expr,
    pub descending: bool,
    pub nulls_first: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum Limit {
    RowCount(Expr),
    Percent(Expr),
}

#[derive(Debug, Clone)]
pub enum InlineTableDef {
    Query(Box<SelectQuery>),
    Recursive {
        anchor: Box<SelectQuery>,
        union_all: bool,
        recursive_term: Box<SelectQuery>,
    },
}

#[derive(Debug, Clone)]
pub struct InlineTable {
    pub name: String,
    pub columns: Vec<String>,
    pub definition: InlineTableDef,
}

#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub with: Vec<InlineTable>,
    pub body: SetExpr,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<Limit>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Select(Box<SelectQuery>),
}

#[derive(Debug, Clone)]
pub struct InsertStmt {
    pub target: String,
    pub columns: Option<Vec<String>>,
    pub source: InsertSource,
}

#[derive(Debug, Clone)]
pub struct FieldRef {
    pub view: Option<String>,
    pub column: String,
}

#[derive(Debug, Clone)]
pub struct UpdateStmt {
    pub targets: Vec<String>,
    pub assignments: Vec<(FieldRef, Expr)>,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct DeleteStmt {
    pub targets: Vec<String>,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct CreateTableStmt {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Placement {
    Default,
    First,
    After(String),
    Before(String),
}

#[derive(Debug, Clone)]
pub struct AddColumnSpec {
    pub name: String,
    pub default: Option<Expr>,
    pub placement: Placement,
}

#[derive(Debug, Clone)]
pub enum AlterAction {
    AddColumns(Vec<AddColumnSpec>),
    DropColumns(Vec<String>),
    RenameColumn { old: String, new: String },
}

#[derive(Debug, Clone)]
pub struct AlterTableStmt {
    pub name: String,
    pub action: AlterAction,
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum FunctionBodyAst {
    Statements(Vec<Statement>),
    Expression(Expr),
}

#[derive(Debug, Clone)]
pub struct DeclareFunctionStmt {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub body: FunctionBodyAst,
    pub is_aggregate: bool,
    pub uses_cursor: bool,
}

#[derive(Debug, Clone)]
pub struct DeclareTableStmt {
    pub name: String,
    pub columns: Vec<String>,
    pub as_query: Option<SelectQuery>,
}

#[derive(Debug, Clone)]
pub enum FetchPosition {
    Next,
    Prior,
    Absolute(Expr),
    Relative(Expr),
    First,
    Last,
}

#[derive(Debug, Clone)]
pub struct FetchStmt {
    pub cursor: String,
    pub position: FetchPosition,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub pos: Position,
}

impl Statement {
    pub fn new(kind: StatementKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Select(SelectQuery),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    CreateTable(CreateTableStmt),
    AlterTable(AlterTableStmt),
    DeclareVariable {
        name: String,
        default: Option<Expr>,
    },
    DeclareTable(DeclareTableStmt),
    DeclareCursor {
        name: String,
        query: SelectQuery,
    },
    DeclareFunction(DeclareFunctionStmt),
    OpenCursor(String),
    FetchCursor(FetchStmt),
    CloseCursor(String),
    DisposeCursor(String),
    SetVariable {
        name: String,
        value: Expr,
    },
    If {
        branches: Vec<(Expr, Vec<Statement>)>,
        else_branch: Option<Vec<Statement>>,
    },
    While {
        condition: Expr,
        body: Vec<Statement>,
    },
    Loop {
        body: Vec<Statement>,
    },
    Continue,
    Break,
    Return(Option<Expr>),
    Print(Vec<Expr>),
    Commit,
    Rollback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_carries_position() {
        let stmt = Statement::new(StatementKind::Commit, Position::new(4, 1));
        assert_eq!(stmt.pos, Position::new(4, 1));
    }
}
