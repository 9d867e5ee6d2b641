use tabsql_engine::StatementResult;

/// Renders one statement's result the way a script runner's stdout is
/// expected to read: a pipe-delimited table for rows, a bare line for a
/// message, and an affected-row count for DML/DDL.
pub(crate) fn render(result: &StatementResult, stats: bool) -> String {
    match result {
        StatementResult::Rows { header, rows } => render_table(header, rows),
        StatementResult::Message(message) => message.clone(),
        StatementResult::Affected(count) => {
            if stats {
                format!("{count} record(s) affected")
            } else {
                String::new()
            }
        }
    }
}

fn render_table(header: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&header.join("|"));
    for row in rows {
        out.push('\n');
        out.push_str(&row.join("|"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_rows_as_pipe_delimited_table() {
        let result = StatementResult::Rows {
            header: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec!["1".to_string(), "2".to_string()]],
        };
        assert_eq!(render(&result, false), "a|b\n1|2");
    }

    #[test]
    fn affected_count_only_shown_with_stats() {
        let result = StatementResult::Affected(3);
        assert_eq!(render(&result, false), "");
        assert_eq!(render(&result, true), "3 record(s) affected");
    }

    #[test]
    fn message_passes_through_unchanged() {
        let result = StatementResult::Message("hello".to_string());
        assert_eq!(render(&result, false), "hello");
    }
}
