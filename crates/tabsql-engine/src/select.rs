use tabsql_ast::{
    Expr, ExprKind, InlineTable, InlineTableDef, Join, JoinCondition, JoinKind, Limit, OrderKey,
    Projection, SelectCore, SelectQuery, SetExpr, SetOp, TableFactor, TableWithJoins,
};
use tabsql_core::{compare, order, EngineError, FileInfo, Header, HeaderField, Position, Primary, Provenance, Record, Result, View};

use crate::context::RowContext;
use crate::engine::Engine;
use crate::json_table::eval_json_row;
use crate::relation::Relation;

impl Engine {
    /// Runs a full `SELECT` (WITH, body, ORDER BY, LIMIT/OFFSET) in its own
    /// procedural scope, so CTEs it declares don't leak to the caller.
    pub fn execute_select_query(&mut self, query: &SelectQuery) -> Result<Relation> {
        self.filter.push_block();
        let result = self.execute_select_query_inner(query);
        self.filter.pop_block();
        result
    }

    fn execute_select_query_inner(&mut self, query: &SelectQuery) -> Result<Relation> {
        for table in &query.with {
            self.materialize_inline_table(table)?;
        }
        let mut relation = self.execute_set_expr(&query.body)?;
        if !query.order_by.is_empty() {
            self.apply_order_by(&mut relation, &query.order_by)?;
        }
        self.apply_limit_offset(&mut relation, query.limit.as_ref(), query.offset.as_ref())?;
        Ok(relation)
    }

    fn materialize_inline_table(&mut self, table: &InlineTable) -> Result<()> {
        match &table.definition {
            InlineTableDef::Query(query) => {
                let relation = self.execute_select_query(query)?;
                let view = self.relation_to_temp_view(&table.name, &table.columns, relation);
                self.filter.declare_temp_view(view)?;
            }
            InlineTableDef::Recursive {
                anchor,
                union_all,
                recursive_term,
            } => self.materialize_recursive(table, anchor, *union_all, recursive_term)?,
        }
        Ok(())
    }

    fn materialize_recursive(
        &mut self,
        table: &InlineTable,
        anchor: &SelectQuery,
        union_all: bool,
        recursive_term: &SelectQuery,
    ) -> Result<()> {
        let anchor_relation = self.execute_select_query(anchor)?;
        let header = anchor_relation.header.clone();
        let mut cumulative_rows = anchor_relation.rows.clone();
        let mut cumulative_provenance = anchor_relation.provenance.clone();
        let mut frontier = anchor_relation;

        self.filter.declare_temp_view(self.relation_to_temp_view(
            &table.name,
            &table.columns,
            Relation::new(header.clone(), cumulative_rows.clone(), cumulative_provenance.clone()),
        ))?;

        let mut iterations = 0usize;
        loop {
            iterations += 1;
            if iterations > self.config.recursion_limit {
                return Err(EngineError::RecursionLimitExceeded {
                    pos: Position::UNKNOWN,
                    limit: self.config.recursion_limit,
                });
            }

            self.filter.rebind_temp_view(
                &table.name,
                self.relation_to_temp_view(&table.name, &table.columns, frontier.clone()),
            );

            let next = self.execute_select_query(recursive_term)?;
            let new_rows: Vec<(Record, Provenance)> = if union_all {
                next.rows.into_iter().zip(next.provenance).collect()
            } else {
                next.rows
                    .into_iter()
                    .zip(next.provenance)
                    .filter(|(row, _)| !cumulative_rows.iter().any(|existing| rows_equal(existing, row)))
                    .collect()
            };

            if new_rows.is_empty() {
                break;
            }

            let (rows, provenance): (Vec<Record>, Vec<Provenance>) = new_rows.into_iter().unzip();
            cumulative_rows.extend(rows.iter().cloned());
            cumulative_provenance.extend(provenance.iter().cloned());
            frontier = Relation::new(header.clone(), rows, provenance);

            self.filter.rebind_temp_view(
                &table.name,
                self.relation_to_temp_view(
                    &table.name,
                    &table.columns,
                    Relation::new(header.clone(), cumulative_rows.clone(), cumulative_provenance.clone()),
                ),
            );
        }

        Ok(())
    }

    pub(crate) fn relation_to_temp_view(&self, name: &str, columns: &[String], mut relation: Relation) -> View {
        if !columns.is_empty() {
            let fields = columns
                .iter()
                .enumerate()
                .map(|(i, column)| HeaderField::new(name, column.clone(), i + 1))
                .collect();
            relation.header = Header::new(fields);
        } else {
            relation.header.rename_view(name);
        }
        View::new(name, FileInfo::temporary(), relation.header, relation.rows)
    }

    fn execute_set_expr(&mut self, expr: &SetExpr) -> Result<Relation> {
        match expr {
            SetExpr::Select(core) => self.execute_select_core(core),
            SetExpr::SetOperation { op, all, left, right } => {
                let left_relation = self.execute_set_expr(left)?;
                let right_relation = self.execute_set_expr(right)?;
                if left_relation.width() != right_relation.width() {
                    return Err(EngineError::SetOperationWidthMismatch {
                        pos: Position::UNKNOWN,
                        expected: left_relation.width(),
                    });
                }
                Ok(combine_set_operation(*op, *all, left_relation, right_relation))
            }
        }
    }

    fn execute_select_core(&mut self, core: &SelectCore) -> Result<Relation> {
        let mut relation = self.resolve_from(&core.from)?;

        if let Some(selection) = &core.selection {
            relation = self.filter_relation(relation, selection)?;
        }

        let needs_group = !core.group_by.is_empty()
            || core.projection.iter().any(projection_has_aggregate)
            || core.having.as_ref().is_some_and(contains_aggregate);

        let groups = self.partition_groups(&relation, &core.group_by, needs_group)?;

        let mut projected_rows = Vec::with_capacity(groups.len());
        for (rows, provenance) in &groups {
            let ctx = if needs_group {
                RowContext::group(&relation.header, rows)
            } else {
                RowContext::single(&relation.header, &rows[0])
            };

            if let Some(having) = &core.having {
                if !self.eval_expr(having, ctx)?.as_ternary().is_true() {
                    continue;
                }
            }

            let values = self.project_row_values(&relation.header, ctx, &core.projection)?;
            projected_rows.push((Record::new(values), provenance.first().cloned().unwrap_or_default()));
        }

        let header = build_projection_header(&relation.header, &core.projection);
        let (rows, provenance): (Vec<Record>, Vec<Provenance>) = projected_rows.into_iter().unzip();
        let mut result = Relation::new(header, rows, provenance);

        if core.distinct {
            dedup_rows(&mut result);
        }

        Ok(result)
    }

    fn partition_groups(
        &mut self,
        relation: &Relation,
        group_by: &[Expr],
        needs_group: bool,
    ) -> Result<Vec<(Vec<Record>, Vec<Provenance>)>> {
        if group_by.is_empty() {
            if needs_group {
                return Ok(vec![(relation.rows.clone(), relation.provenance.clone())]);
            }
            return Ok(relation
                .rows
                .iter()
                .cloned()
                .zip(relation.provenance.iter().cloned())
                .map(|(row, prov)| (vec![row], vec![prov]))
                .collect());
        }

        let mut groups: Vec<(Vec<Primary>, Vec<Record>, Vec<Provenance>)> = Vec::new();
        for (row, prov) in relation.rows.iter().zip(relation.provenance.iter()) {
            let ctx = RowContext::single(&relation.header, row);
            let mut key = Vec::with_capacity(group_by.len());
            for expr in group_by {
                key.push(self.eval_expr(expr, ctx)?);
            }
            match groups.iter_mut().find(|(existing_key, _, _)| group_key_eq(existing_key, &key)) {
                Some(existing) => {
                    existing.1.push(row.clone());
                    existing.2.push(prov.clone());
                }
                None => groups.push((key, vec![row.clone()], vec![prov.clone()])),
            }
        }
        Ok(groups.into_iter().map(|(_, rows, prov)| (rows, prov)).collect())
    }

    fn filter_relation(&mut self, relation: Relation, selection: &Expr) -> Result<Relation> {
        let mut rows = Vec::new();
        let mut provenance = Vec::new();
        for (row, prov) in relation.rows.iter().zip(relation.provenance.iter()) {
            let ctx = RowContext::single(&relation.header, row);
            if self.eval_expr(selection, ctx)?.as_ternary().is_true() {
                rows.push(row.clone());
                provenance.push(prov.clone());
            }
        }
        Ok(Relation::new(relation.header, rows, provenance))
    }

    fn project_row_values(&mut self, header: &Header, ctx: RowContext<'_>, projection: &[Projection]) -> Result<Vec<Primary>> {
        let representative = ctx.representative();
        let mut values = Vec::new();
        for proj in projection {
            match proj {
                Projection::Wildcard => {
                    for idx in header.expand(None) {
                        values.push(representative.and_then(|r| r.get(idx).cloned()).unwrap_or(Primary::Null));
                    }
                }
                Projection::QualifiedWildcard(view) => {
                    for idx in header.expand(Some(view)) {
                        values.push(representative.and_then(|r| r.get(idx).cloned()).unwrap_or(Primary::Null));
                    }
                }
                Projection::Item(item) => {
                    values.push(self.eval_expr(&item.expr, ctx)?);
                }
            }
        }
        Ok(values)
    }

    /// Resolves a `FROM` clause (cross-joining top-level comma items) into a
    /// working relation. Shared with UPDATE/DELETE, whose own `FROM`
    /// defaults to their target tables when not given explicitly.
    pub(crate) fn resolve_from(&mut self, from: &[TableWithJoins]) -> Result<Relation> {
        if from.is_empty() {
            return Ok(dual_relation());
        }
        let mut iter = from.iter();
        let first = iter.next().expect("checked non-empty");
        let mut relation = self.resolve_table_with_joins(first)?;
        for rest in iter {
            let next = self.resolve_table_with_joins(rest)?;
            relation = relation.cross_join(&next);
        }
        Ok(relation)
    }

    fn resolve_table_with_joins(&mut self, table: &TableWithJoins) -> Result<Relation> {
        let mut relation = self.resolve_table_factor(&table.table)?;
        for join in &table.joins {
            relation = self.apply_join(relation, join)?;
        }
        Ok(relation)
    }

    fn apply_join(&mut self, left: Relation, join: &Join) -> Result<Relation> {
        let right = self.resolve_table_factor(&join.table)?;
        let (kind, condition) = natural_join_condition(join.kind, &join.condition, &left.header, &right.header);

        match kind {
            JoinKind::Cross => Ok(left.cross_join(&right)),
            JoinKind::Inner => self.inner_join(&left, &right, condition.as_ref()),
            JoinKind::LeftOuter => self.outer_join(&left, &right, condition.as_ref(), true),
            JoinKind::RightOuter => {
                let swapped = self.outer_join(&right, &left, condition.as_ref(), true)?;
                Ok(swapped)
            }
            JoinKind::FullOuter => self.full_outer_join(&left, &right, condition.as_ref()),
            JoinKind::NaturalInner | JoinKind::NaturalLeftOuter | JoinKind::NaturalRightOuter | JoinKind::NaturalFullOuter => {
                unreachable!("normalized to a non-natural kind above")
            }
        }
    }

    fn matches_condition(&mut self, header: &Header, row: &Record, condition: Option<&Expr>) -> Result<bool> {
        match condition {
            None => Ok(true),
            Some(expr) => Ok(self.eval_expr(expr, RowContext::single(header, row))?.as_ternary().is_true()),
        }
    }

    fn inner_join(&mut self, left: &Relation, right: &Relation, condition: Option<&Expr>) -> Result<Relation> {
        let header = Relation::concat_headers(&left.header, &right.header);
        let mut rows = Vec::new();
        let mut provenance = Vec::new();
        for (li, lrow) in left.rows.iter().enumerate() {
            for (ri, rrow) in right.rows.iter().enumerate() {
                let mut values = lrow.values().to_vec();
                values.extend(rrow.values().iter().cloned());
                let candidate = Record::new(values);
                if self.matches_condition(&header, &candidate, condition)? {
                    rows.push(candidate);
                    let mut prov = left.provenance[li].clone();
                    prov.extend(right.provenance[ri].iter().cloned());
                    provenance.push(prov);
                }
            }
        }
        Ok(Relation::new(header, rows, provenance))
    }

    fn outer_join(&mut self, left: &Relation, right: &Relation, condition: Option<&Expr>, pad_right: bool) -> Result<Relation> {
        let header = Relation::concat_headers(&left.header, &right.header);
        let mut rows = Vec::new();
        let mut provenance = Vec::new();
        for (li, lrow) in left.rows.iter().enumerate() {
            let mut matched = false;
            for (ri, rrow) in right.rows.iter().enumerate() {
                let mut values = lrow.values().to_vec();
                values.extend(rrow.values().iter().cloned());
                let candidate = Record::new(values);
                if self.matches_condition(&header, &candidate, condition)? {
                    matched = true;
                    rows.push(candidate);
                    let mut prov = left.provenance[li].clone();
                    prov.extend(right.provenance[ri].iter().cloned());
                    provenance.push(prov);
                }
            }
            if !matched {
                let mut values = lrow.values().to_vec();
                let padding = if pad_right {
                    Relation::null_padding(right)
                } else {
                    Relation::null_padding(left)
                };
                values.extend(padding.values().iter().cloned());
                rows.push(Record::new(values));
                provenance.push(left.provenance[li].clone());
            }
        }
        Ok(Relation::new(header, rows, provenance))
    }

    fn full_outer_join(&mut self, left: &Relation, right: &Relation, condition: Option<&Expr>) -> Result<Relation> {
        let header = Relation::concat_headers(&left.header, &right.header);
        let mut rows = Vec::new();
        let mut provenance = Vec::new();
        let mut right_matched = vec![false; right.len()];

        for (li, lrow) in left.rows.iter().enumerate() {
            let mut matched = false;
            for (ri, rrow) in right.rows.iter().enumerate() {
                let mut values = lrow.values().to_vec();
                values.extend(rrow.values().iter().cloned());
                let candidate = Record::new(values);
                if self.matches_condition(&header, &candidate, condition)? {
                    matched = true;
                    right_matched[ri] = true;
                    rows.push(candidate);
                    let mut prov = left.provenance[li].clone();
                    prov.extend(right.provenance[ri].iter().cloned());
                    provenance.push(prov);
                }
            }
            if !matched {
                let mut values = lrow.values().to_vec();
                values.extend(Relation::null_padding(right).values().iter().cloned());
                rows.push(Record::new(values));
                provenance.push(left.provenance[li].clone());
            }
        }

        for (ri, rrow) in right.rows.iter().enumerate() {
            if !right_matched[ri] {
                let mut values = Relation::null_padding(left).values().to_vec();
                values.extend(rrow.values().iter().cloned());
                rows.push(Record::new(values));
                provenance.push(right.provenance[ri].clone());
            }
        }

        Ok(Relation::new(header, rows, provenance))
    }

    fn resolve_table_factor(&mut self, factor: &TableFactor) -> Result<Relation> {
        match factor {
            TableFactor::Named { name, alias } => {
                let mut relation = self.resolve_named_relation(name, Position::UNKNOWN)?;
                relation.header.rename_view(alias.clone().unwrap_or_else(|| name.clone()));
                Ok(relation)
            }
            TableFactor::TempView { name, alias } | TableFactor::InlineTableRef { name, alias } => {
                let view = self
                    .filter
                    .get_temp_view(name)
                    .ok_or_else(|| EngineError::TableUndefined {
                        pos: Position::UNKNOWN,
                        name: name.clone(),
                    })?;
                let mut relation = Relation::from_view(view);
                relation.header.rename_view(alias.clone().unwrap_or_else(|| name.clone()));
                Ok(relation)
            }
            TableFactor::Subquery { query, alias } => {
                let mut relation = self.execute_select_query(query)?;
                relation.header.rename_view(alias.clone());
                Ok(relation)
            }
            TableFactor::FunctionTable { name, args, alias } => {
                let mut relation = self.resolve_function_table(name, args, Position::UNKNOWN)?;
                if let Some(alias) = alias {
                    relation.header.rename_view(alias.clone());
                }
                Ok(relation)
            }
        }
    }

    fn resolve_named_relation(&mut self, name: &str, pos: Position) -> Result<Relation> {
        if name.eq_ignore_ascii_case("dual") {
            return Ok(dual_relation());
        }
        if let Some(view) = self.filter.get_temp_view(name) {
            return Ok(Relation::from_view(view));
        }
        let view = self.require_persistent(name, pos)?;
        Ok(Relation::from_view(view))
    }

    fn resolve_function_table(&mut self, name: &str, args: &[Expr], pos: Position) -> Result<Relation> {
        if name.eq_ignore_ascii_case("json_row") {
            let arg = args.first().ok_or_else(|| EngineError::Evaluation {
                pos,
                message: "JSON_ROW requires one argument".to_string(),
            })?;
            let value = self.eval_expr(arg, RowContext::single(&Header::default(), &Record::new(Vec::new())))?;
            return eval_json_row(&value.as_str_display(), pos);
        }
        Err(EngineError::FunctionUndefined {
            pos,
            name: name.to_string(),
        })
    }

    fn apply_order_by(&mut self, relation: &mut Relation, order_by: &[OrderKey]) -> Result<()> {
        let mut keyed: Vec<(Vec<Primary>, Record, Provenance)> = Vec::with_capacity(relation.len());
        for (row, prov) in relation.rows.iter().zip(relation.provenance.iter()) {
            let ctx = RowContext::single(&relation.header, row);
            let mut keys = Vec::with_capacity(order_by.len());
            for key in order_by {
                keys.push(self.eval_expr(&key.expr, ctx)?);
            }
            keyed.push((keys, row.clone(), prov.clone()));
        }

        keyed.sort_by(|a, b| {
            for (i, key) in order_by.iter().enumerate() {
                let cmp = compare_order_key(&a.0[i], &b.0[i], key);
                if cmp != std::cmp::Ordering::Equal {
                    return cmp;
                }
            }
            std::cmp::Ordering::Equal
        });

        relation.rows = keyed.iter().map(|(_, row, _)| row.clone()).collect();
        relation.provenance = keyed.into_iter().map(|(_, _, prov)| prov).collect();
        Ok(())
    }

    fn apply_limit_offset(&mut self, relation: &mut Relation, limit: Option<&Limit>, offset: Option<&Expr>) -> Result<()> {
        let offset_count = match offset {
            Some(expr) => self
                .eval_expr(expr, RowContext::single(&relation.header, relation.rows.first().unwrap_or(&Record::new(Vec::new()))))?
                .as_i64()
                .unwrap_or(0)
                .max(0) as usize,
            None => 0,
        };

        if offset_count > 0 {
            relation.rows = relation.rows.split_off(offset_count.min(relation.rows.len()));
            let remaining = relation.provenance.split_off(offset_count.min(relation.provenance.len()));
            relation.provenance = remaining;
        }

        let Some(limit) = limit else {
            return Ok(());
        };

        let empty_row = Record::new(Vec::new());
        let take = match limit {
            Limit::RowCount(expr) => self
                .eval_expr(expr, RowContext::single(&relation.header, relation.rows.first().unwrap_or(&empty_row)))?
                .as_i64()
                .unwrap_or(0)
                .max(0) as usize,
            Limit::Percent(expr) => {
                let percent = self
                    .eval_expr(expr, RowContext::single(&relation.header, relation.rows.first().unwrap_or(&empty_row)))?
                    .as_f64()
                    .unwrap_or(100.0);
                ((relation.rows.len() as f64 * percent / 100.0).ceil() as i64).max(0) as usize
            }
        };

        relation.rows.truncate(take);
        relation.provenance.truncate(take);
        Ok(())
    }
}

fn dual_relation() -> Relation {
    Relation::new(Header::default(), vec![Record::new(Vec::new())], vec![Vec::new()])
}

fn natural_join_condition(
    kind: JoinKind,
    condition: &JoinCondition,
    left: &Header,
    right: &Header,
) -> (JoinKind, Option<Expr>) {
    let is_natural = matches!(
        kind,
        JoinKind::NaturalInner | JoinKind::NaturalLeftOuter | JoinKind::NaturalRightOuter | JoinKind::NaturalFullOuter
    );

    let normalized = match kind {
        JoinKind::NaturalInner => JoinKind::Inner,
        JoinKind::NaturalLeftOuter => JoinKind::LeftOuter,
        JoinKind::NaturalRightOuter => JoinKind::RightOuter,
        JoinKind::NaturalFullOuter => JoinKind::FullOuter,
        other => other,
    };

    if is_natural {
        let shared = common_columns(left, right);
        return (normalized, shared_columns_condition(&shared, left, right));
    }

    match condition {
        JoinCondition::On(expr) => (normalized, Some(expr.clone())),
        JoinCondition::Using(columns) => (normalized, shared_columns_condition(columns, left, right)),
        JoinCondition::None => (normalized, None),
    }
}

fn common_columns(left: &Header, right: &Header) -> Vec<String> {
    let left_names: Vec<String> = left.column_names();
    let right_names: Vec<String> = right.column_names();
    left_names
        .into_iter()
        .filter(|name| right_names.iter().any(|r| r.eq_ignore_ascii_case(name)))
        .collect()
}

/// Builds the `lhs.column = rhs.column` equality for each shared column,
/// qualified by each side's own view so the combined header (which holds
/// both occurrences of the shared name) resolves each half to exactly one
/// field instead of raising `FieldAmbiguous`.
fn shared_columns_condition(columns: &[String], left: &Header, right: &Header) -> Option<Expr> {
    columns
        .iter()
        .map(|column| {
            let left_view = left.fields().iter().find(|f| f.column.eq_ignore_ascii_case(column)).map(|f| f.view.to_string());
            let right_view = right.fields().iter().find(|f| f.column.eq_ignore_ascii_case(column)).map(|f| f.view.to_string());
            Expr::new(
                ExprKind::Binary {
                    op: tabsql_ast::BinaryOp::Eq,
                    lhs: Box::new(Expr::new(
                        ExprKind::Field {
                            view: left_view,
                            column: column.clone(),
                        },
                        Position::UNKNOWN,
                    )),
                    rhs: Box::new(Expr::new(
                        ExprKind::Field {
                            view: right_view,
                            column: column.clone(),
                        },
                        Position::UNKNOWN,
                    )),
                },
                Position::UNKNOWN,
            )
        })
        .reduce(|a, b| {
            Expr::new(
                ExprKind::Binary {
                    op: tabsql_ast::BinaryOp::And,
                    lhs: Box::new(a),
                    rhs: Box::new(b),
                },
                Position::UNKNOWN,
            )
        })
}

fn projection_has_aggregate(proj: &Projection) -> bool {
    matches!(proj, Projection::Item(item) if contains_aggregate(&item.expr))
}

fn contains_aggregate(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Aggregate { .. } => true,
        ExprKind::Unary { expr, .. } => contains_aggregate(expr),
        ExprKind::Binary { lhs, rhs, .. } => contains_aggregate(lhs) || contains_aggregate(rhs),
        ExprKind::FunctionCall { args, .. } => args.iter().any(contains_aggregate),
        ExprKind::Case { operand, whens, else_branch } => {
            operand.as_deref().is_some_and(contains_aggregate)
                || whens.iter().any(|(w, t)| contains_aggregate(w) || contains_aggregate(t))
                || else_branch.as_deref().is_some_and(contains_aggregate)
        }
        ExprKind::If { cond, then_branch, else_branch } => {
            contains_aggregate(cond) || contains_aggregate(then_branch) || contains_aggregate(else_branch)
        }
        ExprKind::Coalesce(items) => items.iter().any(contains_aggregate),
        ExprKind::NullIf(a, b) => contains_aggregate(a) || contains_aggregate(b),
        ExprKind::Between { expr, low, high, .. } => contains_aggregate(expr) || contains_aggregate(low) || contains_aggregate(high),
        ExprKind::Like { expr, pattern, .. } => contains_aggregate(expr) || contains_aggregate(pattern),
        ExprKind::IsNull { expr, .. } => contains_aggregate(expr),
        ExprKind::Cast { expr, .. } => contains_aggregate(expr),
        _ => false,
    }
}

fn build_projection_header(header: &Header, projection: &[Projection]) -> Header {
    let mut fields = Vec::new();
    for proj in projection {
        match proj {
            Projection::Wildcard => {
                for idx in header.expand(None) {
                    if let Some(field) = header.get(idx) {
                        fields.push(field.clone());
                    }
                }
            }
            Projection::QualifiedWildcard(view) => {
                for idx in header.expand(Some(view)) {
                    if let Some(field) = header.get(idx) {
                        fields.push(field.clone());
                    }
                }
            }
            Projection::Item(item) => {
                let name = item.alias.clone().unwrap_or_else(|| derive_column_name(&item.expr));
                fields.push(HeaderField::computed(name, 0));
            }
        }
    }
    for (i, field) in fields.iter_mut().enumerate() {
        field.ordinal = i + 1;
    }
    Header::new(fields)
}

fn derive_column_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Field { column, .. } => column.clone(),
        ExprKind::ColumnNumber(n) => format!("#{n}"),
        ExprKind::Variable(name) => name.trim_start_matches('@').to_string(),
        ExprKind::FunctionCall { name, .. } | ExprKind::Aggregate { name, .. } => name.clone(),
        _ => "expr".to_string(),
    }
}

fn group_key_eq(a: &[Primary], b: &[Primary]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| match (x.is_null(), y.is_null()) {
            (true, true) => true,
            (true, false) | (false, true) => false,
            _ => compare(x, y).is_true(),
        })
}

fn rows_equal(a: &Record, b: &Record) -> bool {
    a.len() == b.len() && a.values().iter().zip(b.values()).all(|(x, y)| group_key_eq(&[x.clone()], &[y.clone()]))
}

fn dedup_rows(relation: &mut Relation) {
    let mut seen: Vec<Record> = Vec::new();
    let mut kept_rows = Vec::new();
    let mut kept_provenance = Vec::new();
    for (row, prov) in relation.rows.iter().zip(relation.provenance.iter()) {
        if seen.iter().any(|existing| rows_equal(existing, row)) {
            continue;
        }
        seen.push(row.clone());
        kept_rows.push(row.clone());
        kept_provenance.push(prov.clone());
    }
    relation.rows = kept_rows;
    relation.provenance = kept_provenance;
}

fn compare_order_key(a: &Primary, b: &Primary, key: &OrderKey) -> std::cmp::Ordering {
    let nulls_first = key.nulls_first.unwrap_or(!key.descending);
    let ordering = match (a.is_null(), b.is_null()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => {
            return if nulls_first {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        }
        (false, true) => {
            return if nulls_first {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Less
            }
        }
        (false, false) => order(a, b).unwrap_or(std::cmp::Ordering::Equal),
    };
    if key.descending {
        ordering.reverse()
    } else {
        ordering
    }
}

fn combine_set_operation(op: SetOp, all: bool, left: Relation, right: Relation) -> Relation {
    let mut rows = left.rows;
    let mut provenance = left.provenance;

    match op {
        SetOp::Union => {
            rows.extend(right.rows);
            provenance.extend(right.provenance);
        }
        SetOp::Intersect => {
            let kept: Vec<(Record, Provenance)> = rows
                .into_iter()
                .zip(provenance)
                .filter(|(row, _)| right.rows.iter().any(|r| rows_equal(r, row)))
                .collect();
            (rows, provenance) = kept.into_iter().unzip();
        }
        SetOp::Except => {
            let kept: Vec<(Record, Provenance)> = rows
                .into_iter()
                .zip(provenance)
                .filter(|(row, _)| !right.rows.iter().any(|r| rows_equal(r, row)))
                .collect();
            (rows, provenance) = kept.into_iter().unzip();
        }
    }

    let mut result = Relation::new(left.header, rows, provenance);
    if !all {
        dedup_rows(&mut result);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default())
    }

    #[test]
    fn select_one_from_dual_returns_single_row() {
        let mut eng = engine();
        let stmts = tabsql_parser::parse_script("SELECT 1 FROM dual").unwrap();
        let query = match &stmts[0].kind {
            tabsql_ast::StatementKind::Select(q) => q.clone(),
            _ => panic!("expected select"),
        };
        let relation = eng.execute_select_query(&query).unwrap();
        assert_eq!(relation.len(), 1);
        assert_eq!(relation.rows[0].get(0), Some(&Primary::Integer(1)));
    }
}
