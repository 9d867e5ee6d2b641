use tabsql_ast::*;
use tabsql_core::{Position, Primary};

use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

pub fn parse_script(src: &str) -> Result<Vec<Statement>, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens).parse_script()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn cur_pos(&self) -> Position {
        self.cur().pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn is_eof(&self) -> bool {
        self.cur().is_eof()
    }

    fn at_kw(&self, word: &str) -> bool {
        self.cur().is_keyword(word)
    }

    fn at_any_kw(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.at_kw(w))
    }

    fn eat_kw(&mut self, word: &str) -> bool {
        if self.at_kw(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, word: &str) -> PResult<()> {
        if self.eat_kw(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{word}'")))
        }
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(&self.cur().kind, TokenKind::Op(o) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> PResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{op}'")))
        }
    }

    fn eat_punct(&mut self, kind: &TokenKind) -> bool {
        if &self.cur().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, kind: TokenKind, what: &str) -> PResult<()> {
        if self.eat_punct(&kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {what}")))
        }
    }

    fn unexpected(&self, message: &str) -> ParseError {
        ParseError::new(self.cur_pos(), format!("{message}, found {:?}", self.cur().kind))
    }

    /// Reads a plain or quoted identifier as a `String`.
    fn ident(&mut self) -> PResult<String> {
        match self.cur().kind.clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Ok(s)
            }
            TokenKind::QuotedIdent(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("expected an identifier")),
        }
    }

    /// Reads a table name. Table names double as file names (`t.csv`), so
    /// unlike `ident` this folds a trailing `.ext` back onto the name —
    /// there is no qualifier syntax in any of the contexts this is used
    /// (CREATE/ALTER/DECLARE TABLE, and FROM/INSERT/UPDATE/DELETE targets).
    fn table_name(&mut self) -> PResult<String> {
        let mut name = self.ident()?;
        while self.at_punct(&TokenKind::Dot) {
            if let TokenKind::Ident(_) | TokenKind::QuotedIdent(_) = self.peek_next_kind() {
                self.advance();
                name.push('.');
                name.push_str(&self.ident()?);
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn peek_next_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    // ---- script / statements ----------------------------------------

    pub fn parse_script(&mut self) -> PResult<Vec<Statement>> {
        let mut stmts = Vec::new();
        while self.eat_punct(&TokenKind::Semicolon) {}
        while !self.is_eof() {
            stmts.push(self.parse_statement()?);
            while self.eat_punct(&TokenKind::Semicolon) {}
        }
        Ok(stmts)
    }

    fn parse_block_until(&mut self, terminators: &[&str]) -> PResult<Vec<Statement>> {
        let mut stmts = Vec::new();
        while self.eat_punct(&TokenKind::Semicolon) {}
        while !self.is_eof() && !self.at_any_kw(terminators) {
            stmts.push(self.parse_statement()?);
            while self.eat_punct(&TokenKind::Semicolon) {}
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> PResult<Statement> {
        let pos = self.cur_pos();
        let kind = if self.at_kw("SELECT") || self.at_kw("WITH") {
            StatementKind::Select(self.parse_select_query()?)
        } else if self.eat_kw("INSERT") {
            StatementKind::Insert(self.parse_insert()?)
        } else if self.eat_kw("UPDATE") {
            StatementKind::Update(self.parse_update()?)
        } else if self.eat_kw("DELETE") {
            StatementKind::Delete(self.parse_delete()?)
        } else if self.eat_kw("CREATE") {
            self.expect_kw("TABLE")?;
            StatementKind::CreateTable(self.parse_create_table()?)
        } else if self.eat_kw("ALTER") {
            self.expect_kw("TABLE")?;
            StatementKind::AlterTable(self.parse_alter_table()?)
        } else if self.eat_kw("DECLARE") {
            self.parse_declare()?
        } else if self.eat_kw("OPEN") {
            StatementKind::OpenCursor(self.ident()?)
        } else if self.eat_kw("FETCH") {
            StatementKind::FetchCursor(self.parse_fetch()?)
        } else if self.eat_kw("CLOSE") {
            StatementKind::CloseCursor(self.ident()?)
        } else if self.eat_kw("DISPOSE") {
            StatementKind::DisposeCursor(self.ident()?)
        } else if self.eat_kw("SET") {
            self.parse_set_variable()?
        } else if self.eat_kw("IF") {
            self.parse_if()?
        } else if self.eat_kw("WHILE") {
            self.parse_while()?
        } else if self.eat_kw("LOOP") {
            let body = self.parse_block_until(&["END"])?;
            self.expect_kw("END")?;
            self.expect_kw("LOOP")?;
            StatementKind::Loop { body }
        } else if self.eat_kw("CONTINUE") {
            StatementKind::Continue
        } else if self.eat_kw("BREAK") {
            StatementKind::Break
        } else if self.eat_kw("RETURN") {
            if self.at_statement_end() {
                StatementKind::Return(None)
            } else {
                StatementKind::Return(Some(self.parse_expr()?))
            }
        } else if self.eat_kw("PRINT") {
            let mut args = vec![self.parse_expr()?];
            while self.eat_punct(&TokenKind::Comma) {
                args.push(self.parse_expr()?);
            }
            StatementKind::Print(args)
        } else if self.eat_kw("COMMIT") {
            StatementKind::Commit
        } else if self.eat_kw("ROLLBACK") {
            StatementKind::Rollback
        } else if matches!(self.cur().kind, TokenKind::Variable(_)) {
            self.parse_variable_assignment()?
        } else {
            return Err(self.unexpected("expected a statement"));
        };
        Ok(Statement::new(kind, pos))
    }

    fn at_statement_end(&self) -> bool {
        self.is_eof() || self.cur().kind == TokenKind::Semicolon || self.at_any_kw(["END", "ELSE", "ELSEIF"].as_slice())
    }

    fn parse_variable_assignment(&mut self) -> PResult<StatementKind> {
        let name = match self.advance().kind {
            TokenKind::Variable(name) => name,
            _ => unreachable!("checked by caller"),
        };
        if !(self.eat_op(":=") || self.eat_op("=")) {
            return Err(self.unexpected("expected ':=' in variable assignment"));
        }
        let value = self.parse_expr()?;
        Ok(StatementKind::SetVariable { name, value })
    }

    fn parse_set_variable(&mut self) -> PResult<StatementKind> {
        let name = match self.advance().kind {
            TokenKind::Variable(name) => name,
            _ => return Err(self.unexpected("expected a variable after SET")),
        };
        if !(self.eat_op(":=") || self.eat_op("=")) {
            return Err(self.unexpected("expected '=' in SET"));
        }
        let value = self.parse_expr()?;
        Ok(StatementKind::SetVariable { name, value })
    }

    fn parse_if(&mut self) -> PResult<StatementKind> {
        let mut branches = Vec::new();
        let cond = self.parse_expr()?;
        self.expect_kw("THEN")?;
        let body = self.parse_block_until(&["ELSEIF", "ELSE", "END"])?;
        branches.push((cond, body));
        while self.eat_kw("ELSEIF") {
            let cond = self.parse_expr()?;
            self.expect_kw("THEN")?;
            let body = self.parse_block_until(&["ELSEIF", "ELSE", "END"])?;
            branches.push((cond, body));
        }
        let else_branch = if self.eat_kw("ELSE") {
            Some(self.parse_block_until(&["END"])?)
        } else {
            None
        };
        self.expect_kw("END")?;
        self.eat_kw("IF");
        Ok(StatementKind::If { branches, else_branch })
    }

    fn parse_while(&mut self) -> PResult<StatementKind> {
        let condition = self.parse_expr()?;
        self.expect_kw("LOOP")?;
        let body = self.parse_block_until(&["END"])?;
        self.expect_kw("END")?;
        self.expect_kw("LOOP")?;
        Ok(StatementKind::While { condition, body })
    }

    fn parse_fetch(&mut self) -> PResult<FetchStmt> {
        let position = if self.eat_kw("NEXT") {
            FetchPosition::Next
        } else if self.eat_kw("PRIOR") {
            FetchPosition::Prior
        } else if self.eat_kw("FIRST") {
            FetchPosition::First
        } else if self.eat_kw("LAST") {
            FetchPosition::Last
        } else if self.eat_kw("ABSOLUTE") {
            FetchPosition::Absolute(self.parse_expr()?)
        } else if self.eat_kw("RELATIVE") {
            FetchPosition::Relative(self.parse_expr()?)
        } else {
            FetchPosition::Next
        };
        let cursor = self.ident()?;
        self.expect_kw("INTO")?;
        let mut targets = vec![self.variable_name()?];
        while self.eat_punct(&TokenKind::Comma) {
            targets.push(self.variable_name()?);
        }
        Ok(FetchStmt {
            cursor,
            position,
            targets,
        })
    }

    fn variable_name(&mut self) -> PResult<String> {
        match self.advance().kind {
            TokenKind::Variable(name) => Ok(name),
            _ => Err(self.unexpected("expected a variable")),
        }
    }

    fn parse_declare(&mut self) -> PResult<StatementKind> {
        if self.eat_kw("TABLE") {
            let name = self.table_name()?;
            self.expect_punct(TokenKind::LParen, "'('")?;
            let mut columns = vec![self.ident()?];
            while self.eat_punct(&TokenKind::Comma) {
                columns.push(self.ident()?);
            }
            self.expect_punct(TokenKind::RParen, "')'")?;
            let as_query = if self.eat_kw("AS") {
                Some(self.parse_select_query()?)
            } else {
                None
            };
            Ok(StatementKind::DeclareTable(DeclareTableStmt {
                name,
                columns,
                as_query,
            }))
        } else if self.eat_kw("CURSOR") {
            let name = self.ident()?;
            self.expect_kw("FOR")?;
            let query = self.parse_select_query()?;
            Ok(StatementKind::DeclareCursor { name, query })
        } else if self.at_kw("FUNCTION") || self.at_kw("AGGREGATE") {
            let is_aggregate = self.eat_kw("AGGREGATE");
            if !is_aggregate {
                self.expect_kw("FUNCTION")?;
            }
            let name = self.ident()?;
            self.expect_punct(TokenKind::LParen, "'('")?;
            let mut params = Vec::new();
            if !self.at_punct(&TokenKind::RParen) {
                params.push(self.parse_param_decl()?);
                while self.eat_punct(&TokenKind::Comma) {
                    params.push(self.parse_param_decl()?);
                }
            }
            self.expect_punct(TokenKind::RParen, "')'")?;
            let uses_cursor = self.at_kw("USING") && {
                self.advance();
                self.expect_kw("CURSOR")?;
                true
            };
            self.expect_kw("AS")?;
            let body = if self.eat_kw("BEGIN") {
                let stmts = self.parse_block_until(&["END"])?;
                self.expect_kw("END")?;
                FunctionBodyAst::Statements(stmts)
            } else {
                FunctionBodyAst::Expression(self.parse_expr()?)
            };
            Ok(StatementKind::DeclareFunction(DeclareFunctionStmt {
                name,
                params,
                body,
                is_aggregate,
                uses_cursor,
            }))
        } else {
            let name = self.variable_name()?;
            let default = if self.eat_kw("AS") || self.eat_op(":=") || self.eat_op("=") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            Ok(StatementKind::DeclareVariable { name, default })
        }
    }

    fn parse_param_decl(&mut self) -> PResult<ParamDecl> {
        let name = self.variable_name()?;
        let default = if self.eat_op("=") || self.eat_op(":=") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(ParamDecl { name, default })
    }

    fn at_punct(&self, kind: &TokenKind) -> bool {
        &self.cur().kind == kind
    }

    // ---- INSERT / UPDATE / DELETE ------------------------------------

    fn parse_insert(&mut self) -> PResult<InsertStmt> {
        self.expect_kw("INTO")?;
        let target = self.table_name()?;
        let columns = if self.at_punct(&TokenKind::LParen) {
            self.advance();
            let mut cols = vec![self.ident()?];
            while self.eat_punct(&TokenKind::Comma) {
                cols.push(self.ident()?);
            }
            self.expect_punct(TokenKind::RParen, "')'")?;
            Some(cols)
        } else {
            None
        };
        let source = if self.eat_kw("VALUES") {
            let mut rows = vec![self.parse_value_row()?];
            while self.eat_punct(&TokenKind::Comma) {
                rows.push(self.parse_value_row()?);
            }
            InsertSource::Values(rows)
        } else {
            InsertSource::Select(Box::new(self.parse_select_query()?))
        };
        Ok(InsertStmt {
            target,
            columns,
            source,
        })
    }

    fn parse_value_row(&mut self) -> PResult<Vec<Expr>> {
        self.expect_punct(TokenKind::LParen, "'('")?;
        let mut values = vec![self.parse_expr()?];
        while self.eat_punct(&TokenKind::Comma) {
            values.push(self.parse_expr()?);
        }
        self.expect_punct(TokenKind::RParen, "')'")?;
        Ok(values)
    }

    fn parse_update(&mut self) -> PResult<UpdateStmt> {
        let mut targets = vec![self.table_name()?];
        while self.eat_punct(&TokenKind::Comma) {
            targets.push(self.table_name()?);
        }
        self.expect_kw("SET")?;
        let mut assignments = vec![self.parse_assignment()?];
        while self.eat_punct(&TokenKind::Comma) {
            assignments.push(self.parse_assignment()?);
        }
        let from = if self.eat_kw("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };
        let selection = if self.eat_kw("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(UpdateStmt {
            targets,
            assignments,
            from,
            selection,
        })
    }

    fn parse_assignment(&mut self) -> PResult<(FieldRef, Expr)> {
        let field = self.parse_field_ref()?;
        if !(self.eat_op("=") || self.eat_op(":=")) {
            return Err(self.unexpected("expected '=' in SET assignment"));
        }
        let value = self.parse_expr()?;
        Ok((field, value))
    }

    fn parse_field_ref(&mut self) -> PResult<FieldRef> {
        let first = self.ident()?;
        if self.eat_punct(&TokenKind::Dot) {
            let column = self.ident()?;
            Ok(FieldRef {
                view: Some(first),
                column,
            })
        } else {
            Ok(FieldRef {
                view: None,
                column: first,
            })
        }
    }

    fn parse_delete(&mut self) -> PResult<DeleteStmt> {
        let mut targets = Vec::new();
        if !self.at_kw("FROM") {
            targets.push(self.table_name()?);
            while self.eat_punct(&TokenKind::Comma) {
                targets.push(self.table_name()?);
            }
        }
        self.expect_kw("FROM")?;
        let from = self.parse_from_list()?;
        let selection = if self.eat_kw("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(DeleteStmt {
            targets,
            from,
            selection,
        })
    }

    // ---- DDL ----------------------------------------------------------

    fn parse_create_table(&mut self) -> PResult<CreateTableStmt> {
        let name = self.table_name()?;
        self.expect_punct(TokenKind::LParen, "'('")?;
        let mut columns = vec![self.ident()?];
        while self.eat_punct(&TokenKind::Comma) {
            columns.push(self.ident()?);
        }
        self.expect_punct(TokenKind::RParen, "')'")?;
        Ok(CreateTableStmt { name, columns })
    }

    fn parse_alter_table(&mut self) -> PResult<AlterTableStmt> {
        let name = self.table_name()?;
        let action = if self.eat_kw("ADD") {
            self.eat_kw("COLUMN");
            self.eat_kw("COLUMNS");
            let mut specs = vec![self.parse_add_column_spec()?];
            while self.eat_punct(&TokenKind::Comma) {
                specs.push(self.parse_add_column_spec()?);
            }
            AlterAction::AddColumns(specs)
        } else if self.eat_kw("DROP") {
            self.eat_kw("COLUMN");
            self.eat_kw("COLUMNS");
            let mut cols = vec![self.ident()?];
            while self.eat_punct(&TokenKind::Comma) {
                cols.push(self.ident()?);
            }
            AlterAction::DropColumns(cols)
        } else if self.eat_kw("RENAME") {
            self.eat_kw("COLUMN");
            let old = self.ident()?;
            self.expect_kw("TO")?;
            let new = self.ident()?;
            AlterAction::RenameColumn { old, new }
        } else {
            return Err(self.unexpected("expected ADD, DROP or RENAME"));
        };
        Ok(AlterTableStmt { name, action })
    }

    fn parse_add_column_spec(&mut self) -> PResult<AddColumnSpec> {
        let name = self.ident()?;
        let default = if self.eat_kw("DEFAULT") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let placement = if self.eat_kw("FIRST") {
            Placement::First
        } else if self.eat_kw("AFTER") {
            Placement::After(self.ident()?)
        } else if self.eat_kw("BEFORE") {
            Placement::Before(self.ident()?)
        } else {
            Placement::Default
        };
        Ok(AddColumnSpec {
            name,
            default,
            placement,
        })
    }

    // ---- SELECT ---------------------------------------------------------

    fn parse_select_query(&mut self) -> PResult<SelectQuery> {
        let with = if self.eat_kw("WITH") {
            self.parse_with_list()?
        } else {
            Vec::new()
        };
        let body = self.parse_set_expr()?;
        let order_by = if self.eat_kw("ORDER") {
            self.expect_kw("BY")?;
            let mut keys = vec![self.parse_order_key()?];
            while self.eat_punct(&TokenKind::Comma) {
                keys.push(self.parse_order_key()?);
            }
            keys
        } else {
            Vec::new()
        };
        let mut limit = None;
        let mut offset = None;
        if self.eat_kw("LIMIT") {
            let expr = self.parse_expr()?;
            if self.eat_op("%") {
                limit = Some(Limit::Percent(expr));
            } else {
                limit = Some(Limit::RowCount(expr));
            }
        }
        if self.eat_kw("OFFSET") {
            offset = Some(self.parse_expr()?);
        }
        Ok(SelectQuery {
            with,
            body,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_with_list(&mut self) -> PResult<Vec<InlineTable>> {
        self.eat_kw("RECURSIVE");
        let mut tables = vec![self.parse_inline_table()?];
        while self.eat_punct(&TokenKind::Comma) {
            tables.push(self.parse_inline_table()?);
        }
        Ok(tables)
    }

    fn parse_inline_table(&mut self) -> PResult<InlineTable> {
        let name = self.ident()?;
        let mut columns = Vec::new();
        if self.eat_punct(&TokenKind::LParen) {
            columns.push(self.ident()?);
            while self.eat_punct(&TokenKind::Comma) {
                columns.push(self.ident()?);
            }
            self.expect_punct(TokenKind::RParen, "')'")?;
        }
        self.expect_kw("AS")?;
        self.expect_punct(TokenKind::LParen, "'('")?;
        let anchor = self.parse_set_expr_as_query()?;
        let definition = if self.at_kw("UNION") {
            self.advance();
            let all = self.eat_kw("ALL");
            let recursive_term = self.parse_select_query()?;
            InlineTableDef::Recursive {
                anchor: Box::new(anchor),
                union_all: all,
                recursive_term: Box::new(recursive_term),
            }
        } else {
            InlineTableDef::Query(Box::new(anchor))
        };
        self.expect_punct(TokenKind::RParen, "')'")?;
        Ok(InlineTable {
            name,
            columns,
            definition,
        })
    }

    fn parse_set_expr_as_query(&mut self) -> PResult<SelectQuery> {
        let core = self.parse_select_core()?;
        Ok(SelectQuery {
            with: Vec::new(),
            body: SetExpr::Select(Box::new(core)),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        })
    }

    fn parse_set_expr(&mut self) -> PResult<SetExpr> {
        let mut left = SetExpr::Select(Box::new(self.parse_select_core()?));
        loop {
            let op = if self.at_kw("UNION") {
                self.advance();
                SetOp::Union
            } else if self.at_kw("INTERSECT") {
                self.advance();
                SetOp::Intersect
            } else if self.at_kw("EXCEPT") {
                self.advance();
                SetOp::Except
            } else {
                break;
            };
            let all = self.eat_kw("ALL");
            let right = SetExpr::Select(Box::new(self.parse_select_core()?));
            left = SetExpr::SetOperation {
                op,
                all,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_select_core(&mut self) -> PResult<SelectCore> {
        self.expect_kw("SELECT")?;
        let distinct = self.eat_kw("DISTINCT");
        self.eat_kw("ALL");
        let mut projection = vec![self.parse_projection()?];
        while self.eat_punct(&TokenKind::Comma) {
            projection.push(self.parse_projection()?);
        }
        let from = if self.eat_kw("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };
        let selection = if self.eat_kw("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let group_by = if self.eat_kw("GROUP") {
            self.expect_kw("BY")?;
            let mut keys = vec![self.parse_expr()?];
            while self.eat_punct(&TokenKind::Comma) {
                keys.push(self.parse_expr()?);
            }
            keys
        } else {
            Vec::new()
        };
        let having = if self.eat_kw("HAVING") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(SelectCore {
            distinct,
            projection,
            from,
            selection,
            group_by,
            having,
        })
    }

    fn parse_projection(&mut self) -> PResult<Projection> {
        if self.at_punct(&TokenKind::Star) {
            self.advance();
            return Ok(Projection::Wildcard);
        }
        // `t.*`
        if let TokenKind::Ident(name) = self.cur().kind.clone() {
            let save = self.pos;
            self.advance();
            if self.eat_punct(&TokenKind::Dot) && self.at_punct(&TokenKind::Star) {
                self.advance();
                return Ok(Projection::QualifiedWildcard(name));
            }
            self.pos = save;
        }
        let expr = self.parse_expr()?;
        let alias = if self.eat_kw("AS") {
            Some(self.ident()?)
        } else if let TokenKind::Ident(name) = self.cur().kind.clone() {
            if !self.at_any_kw(STATEMENT_BOUNDARY_KEYWORDS) {
                self.advance();
                Some(name)
            } else {
                None
            }
        } else {
            None
        };
        Ok(Projection::Item(SelectItem { expr, alias }))
    }

    fn parse_from_list(&mut self) -> PResult<Vec<TableWithJoins>> {
        let mut list = vec![self.parse_table_with_joins()?];
        while self.eat_punct(&TokenKind::Comma) {
            list.push(self.parse_table_with_joins()?);
        }
        Ok(list)
    }

    fn parse_table_with_joins(&mut self) -> PResult<TableWithJoins> {
        let table = self.parse_table_factor()?;
        let mut joins = Vec::new();
        loop {
            let kind = if self.eat_kw("CROSS") {
                self.expect_kw("JOIN")?;
                JoinKind::Cross
            } else if self.eat_kw("NATURAL") {
                let inner = self.parse_join_side_kind()?;
                match inner {
                    JoinKind::Inner => JoinKind::NaturalInner,
                    JoinKind::LeftOuter => JoinKind::NaturalLeftOuter,
                    JoinKind::RightOuter => JoinKind::NaturalRightOuter,
                    JoinKind::FullOuter => JoinKind::NaturalFullOuter,
                    other => other,
                }
            } else if self.at_any_kw(&["INNER", "LEFT", "RIGHT", "FULL", "JOIN"]) {
                self.parse_join_side_kind()?
            } else {
                break;
            };
            let table_factor = self.parse_table_factor()?;
            let condition = if kind == JoinKind::Cross
                || matches!(
                    kind,
                    JoinKind::NaturalInner | JoinKind::NaturalLeftOuter | JoinKind::NaturalRightOuter | JoinKind::NaturalFullOuter
                ) {
                JoinCondition::None
            } else if self.eat_kw("ON") {
                JoinCondition::On(self.parse_expr()?)
            } else if self.eat_kw("USING") {
                self.expect_punct(TokenKind::LParen, "'('")?;
                let mut cols = vec![self.ident()?];
                while self.eat_punct(&TokenKind::Comma) {
                    cols.push(self.ident()?);
                }
                self.expect_punct(TokenKind::RParen, "')'")?;
                JoinCondition::Using(cols)
            } else {
                JoinCondition::None
            };
            joins.push(Join {
                kind,
                table: table_factor,
                condition,
            });
        }
        Ok(TableWithJoins { table, joins })
    }

    fn parse_join_side_kind(&mut self) -> PResult<JoinKind> {
        let kind = if self.eat_kw("INNER") {
            JoinKind::Inner
        } else if self.eat_kw("LEFT") {
            self.eat_kw("OUTER");
            JoinKind::LeftOuter
        } else if self.eat_kw("RIGHT") {
            self.eat_kw("OUTER");
            JoinKind::RightOuter
        } else if self.eat_kw("FULL") {
            self.eat_kw("OUTER");
            JoinKind::FullOuter
        } else {
            JoinKind::Inner
        };
        self.expect_kw("JOIN")?;
        Ok(kind)
    }

    fn parse_table_factor(&mut self) -> PResult<TableFactor> {
        if self.eat_punct(&TokenKind::LParen) {
            let query = self.parse_select_query()?;
            self.expect_punct(TokenKind::RParen, "')'")?;
            self.eat_kw("AS");
            let alias = self.ident()?;
            return Ok(TableFactor::Subquery {
                query: Box::new(query),
                alias,
            });
        }
        let name = self.table_name()?;
        if self.at_punct(&TokenKind::LParen) {
            self.advance();
            let mut args = Vec::new();
            if !self.at_punct(&TokenKind::RParen) {
                args.push(self.parse_expr()?);
                while self.eat_punct(&TokenKind::Comma) {
                    args.push(self.parse_expr()?);
                }
            }
            self.expect_punct(TokenKind::RParen, "')'")?;
            let alias = self.parse_optional_alias()?;
            return Ok(TableFactor::FunctionTable { name, args, alias });
        }
        let alias = self.parse_optional_alias()?;
        Ok(TableFactor::Named { name, alias })
    }

    fn parse_optional_alias(&mut self) -> PResult<Option<String>> {
        if self.eat_kw("AS") {
            return Ok(Some(self.ident()?));
        }
        if let TokenKind::Ident(name) = self.cur().kind.clone() {
            if !self.at_any_kw(TABLE_BOUNDARY_KEYWORDS) {
                self.advance();
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    fn parse_order_key(&mut self) -> PResult<OrderKey> {
        let expr = self.parse_expr()?;
        let descending = if self.eat_kw("ASC") {
            false
        } else {
            self.eat_kw("DESC")
        };
        let nulls_first = if self.eat_kw("NULLS") {
            if self.eat_kw("FIRST") {
                Some(true)
            } else {
                self.expect_kw("LAST")?;
                Some(false)
            }
        } else {
            None
        };
        Ok(OrderKey {
            expr,
            descending,
            nulls_first,
        })
    }

    // ---- expressions ------------------------------------------------------

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        let mut lhs = self.parse_and_expr()?;
        while self.eat_kw("OR") {
            let rhs = self.parse_and_expr()?;
            lhs = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                pos,
            );
        }
        Ok(lhs)
    }

    fn parse_and_expr(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        let mut lhs = self.parse_not_expr()?;
        while self.eat_kw("AND") {
            let rhs = self.parse_not_expr()?;
            lhs = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::And,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                pos,
            );
        }
        Ok(lhs)
    }

    fn parse_not_expr(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        if self.eat_kw("NOT") {
            let expr = self.parse_not_expr()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(expr),
                },
                pos,
            ));
        }
        self.parse_predicate_expr()
    }

    fn parse_predicate_expr(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        let expr = self.parse_comparison_expr()?;
        self.parse_predicate_suffix(expr, pos)
    }

    fn parse_predicate_suffix(&mut self, expr: Expr, pos: Position) -> PResult<Expr> {
        let negated = self.eat_kw("NOT");
        if self.eat_kw("BETWEEN") {
            let low = self.parse_comparison_expr()?;
            self.expect_kw("AND")?;
            let high = self.parse_comparison_expr()?;
            return Ok(Expr::new(
                ExprKind::Between {
                    expr: Box::new(expr),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                },
                pos,
            ));
        }
        if self.eat_kw("LIKE") {
            let pattern = self.parse_comparison_expr()?;
            return Ok(Expr::new(
                ExprKind::Like {
                    expr: Box::new(expr),
                    pattern: Box::new(pattern),
                    negated,
                },
                pos,
            ));
        }
        if self.eat_kw("IN") {
            self.expect_punct(TokenKind::LParen, "'('")?;
            if self.at_kw("SELECT") {
                let query = self.parse_select_query()?;
                self.expect_punct(TokenKind::RParen, "')'")?;
                return Ok(Expr::new(
                    ExprKind::InSubquery {
                        expr: Box::new(expr),
                        query: Box::new(query),
                        negated,
                    },
                    pos,
                ));
            }
            let mut list = vec![self.parse_expr()?];
            while self.eat_punct(&TokenKind::Comma) {
                list.push(self.parse_expr()?);
            }
            self.expect_punct(TokenKind::RParen, "')'")?;
            return Ok(Expr::new(
                ExprKind::InList {
                    expr: Box::new(expr),
                    list,
                    negated,
                },
                pos,
            ));
        }
        if negated {
            return Err(self.unexpected("expected BETWEEN, LIKE or IN after NOT"));
        }
        if self.eat_kw("IS") {
            let negated = self.eat_kw("NOT");
            self.expect_kw("NULL")?;
            return Ok(Expr::new(
                ExprKind::IsNull {
                    expr: Box::new(expr),
                    negated,
                },
                pos,
            ));
        }
        Ok(expr)
    }

    fn parse_comparison_expr(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        let lhs = self.parse_additive_expr()?;
        let op = if self.eat_op("=") {
            BinaryOp::Eq
        } else if self.eat_op("<>") {
            BinaryOp::NotEq
        } else if self.eat_op("<=") {
            BinaryOp::LtEq
        } else if self.eat_op(">=") {
            BinaryOp::GtEq
        } else if self.eat_op("<") {
            BinaryOp::Lt
        } else if self.eat_op(">") {
            BinaryOp::Gt
        } else {
            return Ok(lhs);
        };

        if self.eat_kw("ANY") || self.eat_kw("SOME") {
            self.expect_punct(TokenKind::LParen, "'('")?;
            let query = self.parse_select_query()?;
            self.expect_punct(TokenKind::RParen, "')'")?;
            return Ok(Expr::new(
                ExprKind::AnyAll {
                    expr: Box::new(lhs),
                    op,
                    quantifier: Quantifier::Any,
                    query: Box::new(query),
                },
                pos,
            ));
        }
        if self.eat_kw("ALL") {
            self.expect_punct(TokenKind::LParen, "'('")?;
            let query = self.parse_select_query()?;
            self.expect_punct(TokenKind::RParen, "')'")?;
            return Ok(Expr::new(
                ExprKind::AnyAll {
                    expr: Box::new(lhs),
                    op,
                    quantifier: Quantifier::All,
                    query: Box::new(query),
                },
                pos,
            ));
        }

        let rhs = self.parse_additive_expr()?;
        Ok(Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            pos,
        ))
    }

    fn parse_additive_expr(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        let mut lhs = self.parse_multiplicative_expr()?;
        loop {
            let op = if self.eat_op("+") {
                BinaryOp::Add
            } else if self.eat_op("-") {
                BinaryOp::Sub
            } else if self.eat_op("||") {
                BinaryOp::Concat
            } else {
                break;
            };
            let rhs = self.parse_multiplicative_expr()?;
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                pos,
            );
        }
        Ok(lhs)
    }

    fn parse_multiplicative_expr(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let op = if self.at_punct(&TokenKind::Star) {
                self.advance();
                BinaryOp::Mul
            } else if self.eat_op("/") {
                BinaryOp::Div
            } else if self.eat_op("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_unary_expr()?;
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                pos,
            );
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        if self.eat_op("-") {
            let expr = self.parse_unary_expr()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                },
                pos,
            ));
        }
        if self.eat_op("+") {
            return self.parse_unary_expr();
        }
        self.parse_primary_expr()
    }

    fn parse_primary_expr(&mut self) -> PResult<Expr> {
        let pos = self.cur_pos();
        match self.cur().kind.clone() {
            TokenKind::IntLit(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Primary::Integer(n)), pos))
            }
            TokenKind::FloatLit(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Primary::Float(n)), pos))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Primary::String(s)), pos))
            }
            TokenKind::Variable(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Variable(name), pos))
            }
            TokenKind::LParen => {
                self.advance();
                if self.at_kw("SELECT") || self.at_kw("WITH") {
                    let query = self.parse_select_query()?;
                    self.expect_punct(TokenKind::RParen, "')'")?;
                    Ok(Expr::new(ExprKind::Subquery(Box::new(query)), pos))
                } else {
                    let expr = self.parse_expr()?;
                    self.expect_punct(TokenKind::RParen, "')'")?;
                    Ok(expr)
                }
            }
            TokenKind::QuotedIdent(name) => {
                self.advance();
                self.parse_field_tail(name, pos)
            }
            TokenKind::Ident(name) => self.parse_keyword_or_ident(name, pos),
            _ => Err(self.unexpected("expected an expression")),
        }
    }

    fn parse_keyword_or_ident(&mut self, name: String, pos: Position) -> PResult<Expr> {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "NULL" => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Primary::Null), pos))
            }
            "TRUE" => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Literal(Primary::Boolean(tabsql_core::Ternary::True)),
                    pos,
                ))
            }
            "FALSE" => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Literal(Primary::Boolean(tabsql_core::Ternary::False)),
                    pos,
                ))
            }
            "UNKNOWN" => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Literal(Primary::Boolean(tabsql_core::Ternary::Unknown)),
                    pos,
                ))
            }
            "CASE" => {
                self.advance();
                self.parse_case(pos)
            }
            "IF" => {
                self.advance();
                self.expect_punct(TokenKind::LParen, "'('")?;
                let cond = self.parse_expr()?;
                self.expect_punct(TokenKind::Comma, "','")?;
                let then_branch = self.parse_expr()?;
                self.expect_punct(TokenKind::Comma, "','")?;
                let else_branch = self.parse_expr()?;
                self.expect_punct(TokenKind::RParen, "')'")?;
                Ok(Expr::new(
                    ExprKind::If {
                        cond: Box::new(cond),
                        then_branch: Box::new(then_branch),
                        else_branch: Box::new(else_branch),
                    },
                    pos,
                ))
            }
            "COALESCE" => {
                self.advance();
                self.expect_punct(TokenKind::LParen, "'('")?;
                let mut args = vec![self.parse_expr()?];
                while self.eat_punct(&TokenKind::Comma) {
                    args.push(self.parse_expr()?);
                }
                self.expect_punct(TokenKind::RParen, "')'")?;
                Ok(Expr::new(ExprKind::Coalesce(args), pos))
            }
            "NULLIF" => {
                self.advance();
                self.expect_punct(TokenKind::LParen, "'('")?;
                let a = self.parse_expr()?;
                self.expect_punct(TokenKind::Comma, "','")?;
                let b = self.parse_expr()?;
                self.expect_punct(TokenKind::RParen, "')'")?;
                Ok(Expr::new(ExprKind::NullIf(Box::new(a), Box::new(b)), pos))
            }
            "CAST" => {
                self.advance();
                self.expect_punct(TokenKind::LParen, "'('")?;
                let expr = self.parse_expr()?;
                self.expect_kw("AS")?;
                let target_name = self.ident()?.to_ascii_uppercase();
                let target = match target_name.as_str() {
                    "STRING" | "VARCHAR" | "TEXT" => CastTarget::String,
                    "INTEGER" | "INT" => CastTarget::Integer,
                    "FLOAT" | "DOUBLE" => CastTarget::Float,
                    "DATETIME" | "TIMESTAMP" | "DATE" => CastTarget::Datetime,
                    "BOOLEAN" | "BOOL" => CastTarget::Boolean,
                    other => return Err(self.unexpected(&format!("unknown cast target '{other}'"))),
                };
                self.expect_punct(TokenKind::RParen, "')'")?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        expr: Box::new(expr),
                        target,
                    },
                    pos,
                ))
            }
            "EXISTS" => {
                self.advance();
                self.expect_punct(TokenKind::LParen, "'('")?;
                let query = self.parse_select_query()?;
                self.expect_punct(TokenKind::RParen, "')'")?;
                Ok(Expr::new(
                    ExprKind::Exists {
                        query: Box::new(query),
                        negated: false,
                    },
                    pos,
                ))
            }
            "COUNT" | "SUM" | "AVG" | "MIN" | "MAX" | "LISTAGG" | "MEDIAN" | "STDEV" | "VAR" => {
                self.advance();
                self.parse_aggregate_call(name, pos)
            }
            _ => {
                self.advance();
                if self.at_punct(&TokenKind::LParen) {
                    self.parse_function_call(name, pos)
                } else {
                    self.parse_field_tail(name, pos)
                }
            }
        }
    }

    fn parse_aggregate_call(&mut self, name: String, pos: Position) -> PResult<Expr> {
        self.expect_punct(TokenKind::LParen, "'('")?;
        let distinct = self.eat_kw("DISTINCT");
        if self.at_punct(&TokenKind::Star) {
            self.advance();
            self.expect_punct(TokenKind::RParen, "')'")?;
            return Ok(Expr::new(
                ExprKind::Aggregate {
                    name,
                    args: Vec::new(),
                    distinct,
                    star: true,
                },
                pos,
            ));
        }
        let mut args = Vec::new();
        if !self.at_punct(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.eat_punct(&TokenKind::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        self.expect_punct(TokenKind::RParen, "')'")?;
        Ok(Expr::new(
            ExprKind::Aggregate {
                name,
                args,
                distinct,
                star: false,
            },
            pos,
        ))
    }

    fn parse_function_call(&mut self, name: String, pos: Position) -> PResult<Expr> {
        self.expect_punct(TokenKind::LParen, "'('")?;
        let distinct = self.eat_kw("DISTINCT");
        let mut args = Vec::new();
        if !self.at_punct(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.eat_punct(&TokenKind::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        self.expect_punct(TokenKind::RParen, "')'")?;
        Ok(Expr::new(
            ExprKind::FunctionCall { name, args, distinct },
            pos,
        ))
    }

    fn parse_case(&mut self, pos: Position) -> PResult<Expr> {
        let operand = if !self.at_kw("WHEN") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let mut whens = Vec::new();
        while self.eat_kw("WHEN") {
            let cond = self.parse_expr()?;
            self.expect_kw("THEN")?;
            let result = self.parse_expr()?;
            whens.push((cond, result));
        }
        let else_branch = if self.eat_kw("ELSE") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect_kw("END")?;
        Ok(Expr::new(
            ExprKind::Case {
                operand,
                whens,
                else_branch,
            },
            pos,
        ))
    }

    /// `name` has already been consumed as a plain identifier; this handles
    /// `name.column` and the `#1`-style positional column reference.
    fn parse_field_tail(&mut self, name: String, pos: Position) -> PResult<Expr> {
        if let Some(n) = name.strip_prefix('#') {
            if let Ok(n) = n.parse::<usize>() {
                return Ok(Expr::new(ExprKind::ColumnNumber(n), pos));
            }
        }
        if self.eat_punct(&TokenKind::Dot) {
            let column = self.ident()?;
            Ok(Expr::new(
                ExprKind::Field {
                    view: Some(name),
                    column,
                },
                pos,
            ))
        } else {
            Ok(Expr::new(
                ExprKind::Field {
                    view: None,
                    column: name,
                },
                pos,
            ))
        }
    }
}

const STATEMENT_BOUNDARY_KEYWORDS: &[&str] = &[
    "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "OFFSET", "UNION", "INTERSECT", "EXCEPT",
];

const TABLE_BOUNDARY_KEYWORDS: &[&str] = &[
    "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "OFFSET", "UNION", "INTERSECT", "EXCEPT", "ON",
    "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "JOIN", "USING",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_one_from_dual() {
        let stmts = parse_script("SELECT 1 FROM dual").unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0].kind, StatementKind::Select(_)));
    }

    #[test]
    fn parses_insert_values() {
        let stmts = parse_script("INSERT INTO t VALUES (4,'str4'),(5,'str5')").unwrap();
        match &stmts[0].kind {
            StatementKind::Insert(ins) => match &ins.source {
                InsertSource::Values(rows) => assert_eq!(rows.len(), 2),
                _ => panic!("expected VALUES"),
            },
            _ => panic!("expected insert"),
        }
    }

    #[test]
    fn parses_recursive_cte() {
        let stmts =
            parse_script("WITH RECURSIVE it(n) AS (SELECT 1 UNION SELECT n+1 FROM it WHERE n<3) SELECT n FROM it")
                .unwrap();
        match &stmts[0].kind {
            StatementKind::Select(q) => {
                assert_eq!(q.with.len(), 1);
                assert!(matches!(q.with[0].definition, InlineTableDef::Recursive { .. }));
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn table_name_folds_file_extension() {
        let stmts = parse_script("CREATE TABLE create_table.csv (column1, column2)").unwrap();
        match &stmts[0].kind {
            StatementKind::CreateTable(ct) => assert_eq!(ct.name, "create_table.csv"),
            _ => panic!("expected create table"),
        }
    }

    #[test]
    fn parses_update_with_where() {
        let stmts = parse_script("UPDATE t SET column2='update' WHERE column1=2").unwrap();
        assert!(matches!(stmts[0].kind, StatementKind::Update(_)));
    }

    #[test]
    fn parses_fetch_absolute() {
        let stmts = parse_script("FETCH ABSOLUTE 1 cur INTO @a, @b").unwrap();
        match &stmts[0].kind {
            StatementKind::FetchCursor(f) => {
                assert!(matches!(f.position, FetchPosition::Absolute(_)));
                assert_eq!(f.targets, vec!["a".to_string(), "b".to_string()]);
            }
            _ => panic!("expected fetch"),
        }
    }
}
