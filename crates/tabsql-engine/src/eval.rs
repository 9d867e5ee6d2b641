use tabsql_ast::{BinaryOp, CastTarget, Expr, ExprKind, Quantifier, UnaryOp};
use tabsql_core::{coerce_numeric, compare, order, EngineError, Numeric, Position, Primary, Record, Result, Ternary};

use crate::aggregate::{dedup_distinct, eval_aggregate, is_builtin_aggregate};
use crate::context::RowContext;
use crate::engine::Engine;
use crate::functions::call_builtin;

impl Engine {
    pub fn eval_expr(&mut self, expr: &Expr, ctx: RowContext<'_>) -> Result<Primary> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Variable(name) => self.filter.get_variable(name).cloned().map_err(|_| EngineError::VariableUndefined {
                pos: expr.pos,
                name: name.clone(),
            }),
            ExprKind::Field { view, column } => self.eval_field(view.as_deref(), column, ctx, expr.pos),
            ExprKind::ColumnNumber(n) => self.eval_column_number(*n, ctx, expr.pos),
            ExprKind::Unary { op, expr: inner } => self.eval_unary(*op, inner, ctx),
            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, ctx),
            ExprKind::FunctionCall { name, args, distinct } => self.eval_function_call(name, args, *distinct, ctx, expr.pos),
            ExprKind::Aggregate { name, args, distinct, star } => self.eval_aggregate_call(name, args, *distinct, *star, ctx, expr.pos),
            ExprKind::Subquery(query) => self.eval_scalar_subquery(query, ctx, expr.pos),
            ExprKind::Exists { query, negated } => {
                let relation = self.eval_correlated_subquery(query, ctx)?;
                let exists = !relation.is_empty();
                Ok(Primary::Boolean(Ternary::from_bool(exists != *negated)))
            }
            ExprKind::InList { expr: lhs, list, negated } => {
                let value = self.eval_expr(lhs, ctx)?;
                let mut items = Vec::with_capacity(list.len());
                for item in list {
                    items.push(self.eval_expr(item, ctx)?);
                }
                let result = eval_in_list(&value, &items);
                Ok(Primary::Boolean(if *negated { result.not() } else { result }))
            }
            ExprKind::InSubquery { expr: lhs, query, negated } => {
                let value = self.eval_expr(lhs, ctx)?;
                let relation = self.eval_correlated_subquery(query, ctx)?;
                let items = first_column(&relation);
                let result = eval_in_list(&value, &items);
                Ok(Primary::Boolean(if *negated { result.not() } else { result }))
            }
            ExprKind::AnyAll { expr: lhs, op, quantifier, query } => {
                let value = self.eval_expr(lhs, ctx)?;
                let relation = self.eval_correlated_subquery(query, ctx)?;
                let items = first_column(&relation);
                Ok(Primary::Boolean(eval_any_all(&value, *op, *quantifier, &items)))
            }
            ExprKind::Case { operand, whens, else_branch } => self.eval_case(operand.as_deref(), whens, else_branch.as_deref(), ctx),
            ExprKind::If { cond, then_branch, else_branch } => {
                if self.eval_expr(cond, ctx)?.as_ternary().is_true() {
                    self.eval_expr(then_branch, ctx)
                } else {
                    self.eval_expr(else_branch, ctx)
                }
            }
            ExprKind::Coalesce(items) => {
                for item in items {
                    let value = self.eval_expr(item, ctx)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Ok(Primary::Null)
            }
            ExprKind::NullIf(lhs, rhs) => {
                let a = self.eval_expr(lhs, ctx)?;
                let b = self.eval_expr(rhs, ctx)?;
                if compare(&a, &b).is_true() {
                    Ok(Primary::Null)
                } else {
                    Ok(a)
                }
            }
            ExprKind::Between { expr: target, low, high, negated } => {
                let value = self.eval_expr(target, ctx)?;
                let low = self.eval_expr(low, ctx)?;
                let high = self.eval_expr(high, ctx)?;
                let in_range = ternary_order(&value, &low, |o| o != std::cmp::Ordering::Less)
                    .and(ternary_order(&value, &high, |o| o != std::cmp::Ordering::Greater));
                Ok(Primary::Boolean(if *negated { in_range.not() } else { in_range }))
            }
            ExprKind::Like { expr: target, pattern, negated } => {
                let value = self.eval_expr(target, ctx)?;
                let pattern = self.eval_expr(pattern, ctx)?;
                if value.is_null() || pattern.is_null() {
                    return Ok(Primary::Boolean(Ternary::Unknown));
                }
                let matched = sql_like(&value.as_str_display(), &pattern.as_str_display());
                Ok(Primary::Boolean(Ternary::from_bool(matched != *negated)))
            }
            ExprKind::IsNull { expr: target, negated } => {
                let value = self.eval_expr(target, ctx)?;
                Ok(Primary::Boolean(Ternary::from_bool(value.is_null() != *negated)))
            }
            ExprKind::Cast { expr: target, target: cast_target } => {
                let value = self.eval_expr(target, ctx)?;
                eval_cast(&value, *cast_target, expr.pos)
            }
        }
    }

    fn eval_field(&self, view: Option<&str>, column: &str, ctx: RowContext<'_>, pos: Position) -> Result<Primary> {
        if let Ok(idx) = ctx.header.resolve(view, column) {
            let row = ctx.representative().ok_or_else(|| EngineError::FieldNotFound {
                pos,
                name: column.to_string(),
            })?;
            return Ok(row.get(idx).cloned().unwrap_or(Primary::Null));
        }
        for (header, row) in self.correlated.iter().rev() {
            if let Ok(idx) = header.resolve(view, column) {
                return Ok(row.get(idx).cloned().unwrap_or(Primary::Null));
            }
        }
        Err(EngineError::FieldNotFound {
            pos,
            name: qualified(view, column),
        })
    }

    fn eval_column_number(&self, n: usize, ctx: RowContext<'_>, pos: Position) -> Result<Primary> {
        let idx = ctx.header.resolve_ordinal(n).ok_or_else(|| EngineError::FieldNotFound {
            pos,
            name: format!("#{n}"),
        })?;
        let row = ctx.representative().ok_or_else(|| EngineError::FieldNotFound {
            pos,
            name: format!("#{n}"),
        })?;
        Ok(row.get(idx).cloned().unwrap_or(Primary::Null))
    }

    fn eval_unary(&mut self, op: UnaryOp, inner: &Expr, ctx: RowContext<'_>) -> Result<Primary> {
        let value = self.eval_expr(inner, ctx)?;
        match op {
            UnaryOp::Not => Ok(Primary::Boolean(value.as_ternary().not())),
            UnaryOp::Neg => match value {
                Primary::Integer(i) => Ok(Primary::Integer(-i)),
                Primary::Float(f) => Ok(Primary::Float(-f)),
                Primary::Null => Ok(Primary::Null),
                other => match other.as_f64() {
                    Some(f) => Ok(Primary::Float(-f)),
                    None => Err(EngineError::Evaluation {
                        pos: inner.pos,
                        message: format!("cannot negate a {}", other.type_name()),
                    }),
                },
            },
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, ctx: RowContext<'_>) -> Result<Primary> {
        if op == BinaryOp::And || op == BinaryOp::Or {
            let left = self.eval_expr(lhs, ctx)?.as_ternary();
            let right = self.eval_expr(rhs, ctx)?.as_ternary();
            let result = if op == BinaryOp::And { left.and(right) } else { left.or(right) };
            return Ok(Primary::Boolean(result));
        }

        let left = self.eval_expr(lhs, ctx)?;
        let right = self.eval_expr(rhs, ctx)?;

        match op {
            BinaryOp::Concat => Ok(Primary::String(format!("{}{}", left.as_str_display(), right.as_str_display()))),
            BinaryOp::Eq => Ok(Primary::Boolean(compare(&left, &right))),
            BinaryOp::NotEq => Ok(Primary::Boolean(compare(&left, &right).not())),
            BinaryOp::Lt => Ok(Primary::Boolean(ternary_order_direct(&left, &right, |o| o == std::cmp::Ordering::Less))),
            BinaryOp::LtEq => Ok(Primary::Boolean(ternary_order_direct(&left, &right, |o| o != std::cmp::Ordering::Greater))),
            BinaryOp::Gt => Ok(Primary::Boolean(ternary_order_direct(&left, &right, |o| o == std::cmp::Ordering::Greater))),
            BinaryOp::GtEq => Ok(Primary::Boolean(ternary_order_direct(&left, &right, |o| o != std::cmp::Ordering::Less))),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                eval_arithmetic(op, &left, &right, lhs.pos)
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_function_call(&mut self, name: &str, args: &[Expr], distinct: bool, ctx: RowContext<'_>, pos: Position) -> Result<Primary> {
        let _ = distinct; // DISTINCT only affects aggregate calls
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg, ctx)?);
        }
        if let Some(result) = call_builtin(name, &values, pos)? {
            return Ok(result);
        }
        self.call_user_function(name, values, pos)
    }

    fn eval_aggregate_call(
        &mut self,
        name: &str,
        args: &[Expr],
        distinct: bool,
        star: bool,
        ctx: RowContext<'_>,
        pos: Position,
    ) -> Result<Primary> {
        let rows = ctx.group_rows().ok_or_else(|| EngineError::AggregateOutsideGroup {
            pos,
            name: name.to_string(),
        })?;
        let group_len = rows.len();

        if star {
            return eval_aggregate(name, &[], true, group_len, pos);
        }

        if is_builtin_aggregate(name) {
            let arg = args.first().ok_or_else(|| EngineError::Evaluation {
                pos,
                message: format!("{name} requires an argument"),
            })?;
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                let value = self.eval_expr(arg, RowContext::single(ctx.header, row))?;
                if !value.is_null() {
                    values.push(value);
                }
            }
            if distinct {
                values = dedup_distinct(values);
            }
            return eval_aggregate(name, &values, false, group_len, pos);
        }

        let Some(first_row) = ctx.representative() else {
            return Ok(Primary::Null);
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg, RowContext::single(ctx.header, first_row))?);
        }
        self.call_user_function(name, values, pos)
    }

    fn eval_case(&mut self, operand: Option<&Expr>, whens: &[(Expr, Expr)], else_branch: Option<&Expr>, ctx: RowContext<'_>) -> Result<Primary> {
        let operand_value = match operand {
            Some(expr) => Some(self.eval_expr(expr, ctx)?),
            None => None,
        };
        for (when, then) in whens {
            let matched = match &operand_value {
                Some(lhs) => {
                    let rhs = self.eval_expr(when, ctx)?;
                    compare(lhs, &rhs).is_true()
                }
                None => self.eval_expr(when, ctx)?.as_ternary().is_true(),
            };
            if matched {
                return self.eval_expr(then, ctx);
            }
        }
        match else_branch {
            Some(expr) => self.eval_expr(expr, ctx),
            None => Ok(Primary::Null),
        }
    }

    fn eval_scalar_subquery(&mut self, query: &tabsql_ast::SelectQuery, ctx: RowContext<'_>, pos: Position) -> Result<Primary> {
        let relation = self.eval_correlated_subquery(query, ctx)?;
        match relation.rows.first() {
            None => Ok(Primary::Null),
            Some(row) => row.get(0).cloned().ok_or(EngineError::SelectWidthMismatch { pos, expected: 1 }),
        }
    }

    fn eval_correlated_subquery(&mut self, query: &tabsql_ast::SelectQuery, ctx: RowContext<'_>) -> Result<crate::relation::Relation> {
        let pushed = ctx.representative().map(|row| (ctx.header.clone(), row.clone()));
        if let Some(entry) = pushed {
            self.correlated.push(entry);
        }
        let result = self.execute_select_query(query);
        if pushed.is_some() {
            self.correlated.pop();
        }
        result
    }
}

fn qualified(view: Option<&str>, column: &str) -> String {
    match view {
        Some(v) => format!("{v}.{column}"),
        None => column.to_string(),
    }
}

fn first_column(relation: &crate::relation::Relation) -> Vec<Primary> {
    relation.rows.iter().filter_map(|r| r.get(0).cloned()).collect()
}

fn ternary_order(value: &Primary, bound: &Primary, accept: impl Fn(std::cmp::Ordering) -> bool) -> Ternary {
    match order(value, bound) {
        Some(o) => Ternary::from_bool(accept(o)),
        None => Ternary::Unknown,
    }
}

fn ternary_order_direct(lhs: &Primary, rhs: &Primary, accept: impl Fn(std::cmp::Ordering) -> bool) -> Ternary {
    ternary_order(lhs, rhs, accept)
}

fn eval_in_list(value: &Primary, items: &[Primary]) -> Ternary {
    let mut any_unknown = false;
    for item in items {
        match compare(value, item) {
            Ternary::True => return Ternary::True,
            Ternary::Unknown => any_unknown = true,
            Ternary::False => {}
        }
    }
    if any_unknown {
        Ternary::Unknown
    } else {
        Ternary::False
    }
}

fn eval_any_all(value: &Primary, op: BinaryOp, quantifier: Quantifier, items: &[Primary]) -> Ternary {
    let compare_one = |item: &Primary| -> Ternary {
        match op {
            BinaryOp::Eq => compare(value, item),
            BinaryOp::NotEq => compare(value, item).not(),
            BinaryOp::Lt => ternary_order(value, item, |o| o == std::cmp::Ordering::Less),
            BinaryOp::LtEq => ternary_order(value, item, |o| o != std::cmp::Ordering::Greater),
            BinaryOp::Gt => ternary_order(value, item, |o| o == std::cmp::Ordering::Greater),
            BinaryOp::GtEq => ternary_order(value, item, |o| o != std::cmp::Ordering::Less),
            _ => Ternary::Unknown,
        }
    };

    if items.is_empty() {
        return match quantifier {
            Quantifier::Any => Ternary::False,
            Quantifier::All => Ternary::True,
        };
    }

    match quantifier {
        Quantifier::Any => {
            let mut any_unknown = false;
            for item in items {
                match compare_one(item) {
                    Ternary::True => return Ternary::True,
                    Ternary::Unknown => any_unknown = true,
                    Ternary::False => {}
                }
            }
            if any_unknown {
                Ternary::Unknown
            } else {
                Ternary::False
            }
        }
        Quantifier::All => {
            let mut any_unknown = false;
            for item in items {
                match compare_one(item) {
                    Ternary::False => return Ternary::False,
                    Ternary::Unknown => any_unknown = true,
                    Ternary::True => {}
                }
            }
            if any_unknown {
                Ternary::Unknown
            } else {
                Ternary::True
            }
        }
    }
}

fn eval_arithmetic(op: BinaryOp, lhs: &Primary, rhs: &Primary, pos: Position) -> Result<Primary> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Primary::Null);
    }
    let numeric = coerce_numeric(lhs, rhs).ok_or_else(|| EngineError::Evaluation {
        pos,
        message: format!("cannot apply arithmetic to a {} and a {}", lhs.type_name(), rhs.type_name()),
    })?;
    match numeric {
        Numeric::Integer(a, b) => match op {
            BinaryOp::Add => Ok(Primary::Integer(a + b)),
            BinaryOp::Sub => Ok(Primary::Integer(a - b)),
            BinaryOp::Mul => Ok(Primary::Integer(a * b)),
            BinaryOp::Div => {
                if b == 0 {
                    Err(EngineError::DivisionByZero { pos })
                } else {
                    Ok(Primary::Float(a as f64 / b as f64))
                }
            }
            BinaryOp::Mod => {
                if b == 0 {
                    Err(EngineError::DivisionByZero { pos })
                } else {
                    Ok(Primary::Integer(a % b))
                }
            }
            _ => unreachable!(),
        },
        Numeric::Float(a, b) => match op {
            BinaryOp::Add => Ok(Primary::Float(a + b)),
            BinaryOp::Sub => Ok(Primary::Float(a - b)),
            BinaryOp::Mul => Ok(Primary::Float(a * b)),
            BinaryOp::Div => {
                if b == 0.0 {
                    Err(EngineError::DivisionByZero { pos })
                } else {
                    Ok(Primary::Float(a / b))
                }
            }
            BinaryOp::Mod => {
                if b == 0.0 {
                    Err(EngineError::DivisionByZero { pos })
                } else {
                    Ok(Primary::Float(a % b))
                }
            }
            _ => unreachable!(),
        },
    }
}

fn eval_cast(value: &Primary, target: CastTarget, pos: Position) -> Result<Primary> {
    if value.is_null() {
        return Ok(Primary::Null);
    }
    let fail = || EngineError::Evaluation {
        pos,
        message: format!("cannot cast a {} to {:?}", value.type_name(), target),
    };
    match target {
        CastTarget::String => Ok(Primary::String(value.as_str_display())),
        CastTarget::Integer => value.as_i64().map(Primary::Integer).ok_or_else(fail),
        CastTarget::Float => value.as_f64().map(Primary::Float).ok_or_else(fail),
        CastTarget::Datetime => match value {
            Primary::Datetime(d) => Ok(Primary::Datetime(*d)),
            Primary::String(s) => parse_datetime(s).map(Primary::Datetime).ok_or_else(fail),
            _ => Err(fail()),
        },
        CastTarget::Boolean => match value {
            Primary::Boolean(t) => Ok(Primary::Boolean(*t)),
            Primary::String(s) => match s.to_ascii_uppercase().as_str() {
                "TRUE" => Ok(Primary::Boolean(Ternary::True)),
                "FALSE" => Ok(Primary::Boolean(Ternary::False)),
                "UNKNOWN" => Ok(Primary::Boolean(Ternary::Unknown)),
                _ => Err(fail()),
            },
            Primary::Integer(i) => Ok(Primary::Boolean(Ternary::from_bool(*i != 0))),
            _ => Err(fail()),
        },
    }
}

fn parse_datetime(s: &str) -> Option<chrono::NaiveDateTime> {
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d"];
    FORMATS.iter().find_map(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).ok().or_else(|| {
        chrono::NaiveDate::parse_from_str(s, fmt).ok().map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is valid"))
    }))
}

/// Minimal `%`/`_` glob matcher (no escaping): `%` matches any run of
/// characters, `_` matches exactly one.
fn sql_like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match(&text, &pattern)
}

fn like_match(text: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('%') => like_match(text, &pattern[1..]) || (!text.is_empty() && like_match(&text[1..], pattern)),
        Some('_') => !text.is_empty() && like_match(&text[1..], &pattern[1..]),
        Some(c) => text.first() == Some(c) && like_match(&text[1..], &pattern[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_matches_percent_wildcard() {
        assert!(sql_like("hello world", "hello%"));
        assert!(!sql_like("hello world", "world%"));
    }

    #[test]
    fn like_matches_underscore_single_char() {
        assert!(sql_like("cat", "c_t"));
        assert!(!sql_like("ct", "c_t"));
    }

    #[test]
    fn in_list_is_unknown_when_no_match_but_null_present() {
        let items = vec![Primary::Integer(2), Primary::Null];
        assert_eq!(eval_in_list(&Primary::Integer(1), &items), Ternary::Unknown);
    }

    #[test]
    fn in_list_is_false_with_no_null_and_no_match() {
        let items = vec![Primary::Integer(2), Primary::Integer(3)];
        assert_eq!(eval_in_list(&Primary::Integer(1), &items), Ternary::False);
    }
}
