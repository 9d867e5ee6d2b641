use tabsql_core::{EngineError, Position, Primary, Result};

/// Evaluates a built-in aggregate over one group's already-projected column
/// values. `values` has had Null skipped and DISTINCT deduplication applied
/// by the caller already, except for `count(*)` (`star = true`), which
/// ignores `values` and counts `group_len` directly.
pub fn eval_aggregate(name: &str, values: &[Primary], star: bool, group_len: usize, pos: Position) -> Result<Primary> {
    if star {
        return Ok(Primary::Integer(group_len as i64));
    }
    match name.to_ascii_uppercase().as_str() {
        "COUNT" => Ok(Primary::Integer(values.len() as i64)),
        "SUM" => Ok(sum(values)),
        "AVG" => avg(values),
        "MIN" => Ok(extreme(values, std::cmp::Ordering::Less)),
        "MAX" => Ok(extreme(values, std::cmp::Ordering::Greater)),
        "LISTAGG" => Ok(listagg(values)),
        "MEDIAN" => median(values),
        "STDEV" => stdev(values, false),
        "VAR" => stdev(values, true),
        other => Err(EngineError::FunctionUndefined {
            pos,
            name: other.to_string(),
        }),
    }
}

pub fn is_builtin_aggregate(name: &str) -> bool {
    matches!(
        name.to_ascii_uppercase().as_str(),
        "COUNT" | "SUM" | "AVG" | "MIN" | "MAX" | "LISTAGG" | "MEDIAN" | "STDEV" | "VAR"
    )
}

fn numeric(values: &[Primary]) -> Vec<f64> {
    values.iter().filter_map(|v| v.as_f64()).collect()
}

fn sum(values: &[Primary]) -> Primary {
    if values.iter().all(|v| matches!(v, Primary::Integer(_))) {
        let total: i64 = values.iter().filter_map(|v| v.as_i64()).sum();
        return Primary::Integer(total);
    }
    let total: f64 = numeric(values).iter().sum();
    Primary::Float(total)
}

fn avg(values: &[Primary]) -> Result<Primary> {
    let nums = numeric(values);
    if nums.is_empty() {
        return Ok(Primary::Null);
    }
    Ok(Primary::Float(nums.iter().sum::<f64>() / nums.len() as f64))
}

fn extreme(values: &[Primary], want: std::cmp::Ordering) -> Primary {
    values
        .iter()
        .cloned()
        .reduce(|a, b| match tabsql_core::order(&a, &b) {
            Some(o) if o == want => a,
            Some(_) => b,
            None => a,
        })
        .unwrap_or(Primary::Null)
}

fn listagg(values: &[Primary]) -> Primary {
    let joined = values.iter().map(|v| v.as_str_display()).collect::<Vec<_>>().join(",");
    Primary::String(joined)
}

fn median(values: &[Primary]) -> Result<Primary> {
    let mut nums = numeric(values);
    if nums.is_empty() {
        return Ok(Primary::Null);
    }
    nums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = nums.len() / 2;
    let value = if nums.len() % 2 == 0 {
        (nums[mid - 1] + nums[mid]) / 2.0
    } else {
        nums[mid]
    };
    Ok(Primary::Float(value))
}

fn stdev(values: &[Primary], variance_only: bool) -> Result<Primary> {
    let nums = numeric(values);
    if nums.len() < 2 {
        return Ok(Primary::Null);
    }
    let mean = nums.iter().sum::<f64>() / nums.len() as f64;
    let variance = nums.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (nums.len() - 1) as f64;
    Ok(Primary::Float(if variance_only { variance } else { variance.sqrt() }))
}

pub fn dedup_distinct(mut values: Vec<Primary>) -> Vec<Primary> {
    let mut seen: Vec<Primary> = Vec::new();
    values.retain(|v| {
        if seen.iter().any(|s| s == v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_skips_nothing_nulls_already_filtered_by_caller() {
        let values = vec![Primary::Integer(1), Primary::Integer(2), Primary::Integer(3)];
        assert_eq!(sum(&values), Primary::Integer(6));
    }

    #[test]
    fn avg_of_empty_is_null() {
        assert_eq!(avg(&[]).unwrap(), Primary::Null);
    }

    #[test]
    fn distinct_dedups_preserving_first_occurrence_order() {
        let values = vec![Primary::Integer(1), Primary::Integer(1), Primary::Integer(2)];
        let deduped = dedup_distinct(values);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn median_of_even_count_averages_middle_two() {
        let values = vec![Primary::Integer(1), Primary::Integer(2), Primary::Integer(3), Primary::Integer(4)];
        assert_eq!(median(&values).unwrap(), Primary::Float(2.5));
    }
}
