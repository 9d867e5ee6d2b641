use chrono::{Local, NaiveDateTime};
use tabsql_core::{EngineError, Position, Primary, Result};

/// Case-insensitive built-in scalar function registry, tried before user
/// function scopes (§3's function-call resolution order).
pub fn call_builtin(name: &str, args: &[Primary], pos: Position) -> Result<Option<Primary>> {
    let upper = name.to_ascii_uppercase();
    let result = match upper.as_str() {
        "UPPER" => Primary::String(string_arg(args, 0, pos)?.to_uppercase()),
        "LOWER" => Primary::String(string_arg(args, 0, pos)?.to_lowercase()),
        "TRIM" => Primary::String(string_arg(args, 0, pos)?.trim().to_string()),
        "LTRIM" => Primary::String(string_arg(args, 0, pos)?.trim_start().to_string()),
        "RTRIM" => Primary::String(string_arg(args, 0, pos)?.trim_end().to_string()),
        "LENGTH" | "LEN" => Primary::Integer(string_arg(args, 0, pos)?.chars().count() as i64),
        "SUBSTR" | "SUBSTRING" => substr(args, pos)?,
        "REPLACE" => Primary::String(
            string_arg(args, 0, pos)?.replace(&string_arg(args, 1, pos)?, &string_arg(args, 2, pos)?),
        ),
        "CONCAT" => Primary::String(args.iter().map(|a| a.as_str_display()).collect()),
        "ROUND" => round(args, pos)?,
        "CEIL" | "CEILING" => Primary::Float(number_arg(args, 0, pos)?.ceil()),
        "FLOOR" => Primary::Float(number_arg(args, 0, pos)?.floor()),
        "ABS" => abs(args, pos)?,
        "POWER" | "POW" => Primary::Float(number_arg(args, 0, pos)?.powf(number_arg(args, 1, pos)?)),
        "SQRT" => Primary::Float(number_arg(args, 0, pos)?.sqrt()),
        "NOW" => Primary::Datetime(now()),
        "DATETIME_FORMAT" => Primary::String(datetime_arg(args, 0, pos)?.format(&string_arg(args, 1, pos)?).to_string()),
        "STRING" => Primary::String(args.first().map(|a| a.as_str_display()).unwrap_or_default()),
        "INTEGER" => Primary::Integer(args.first().and_then(|a| a.as_i64()).ok_or_else(|| not_convertible(pos))?),
        "FLOAT" => Primary::Float(args.first().and_then(|a| a.as_f64()).ok_or_else(|| not_convertible(pos))?),
        "ISNULL" | "IS_NULL" => Primary::Boolean(tabsql_core::Ternary::from_bool(args.first().map(Primary::is_null).unwrap_or(true))),
        "JSON_ROW" => return Ok(None), // handled as a function-table, not a scalar call
        _ => return Ok(None),
    };
    Ok(Some(result))
}

pub fn is_builtin_scalar(name: &str) -> bool {
    matches!(
        name.to_ascii_uppercase().as_str(),
        "UPPER"
            | "LOWER"
            | "TRIM"
            | "LTRIM"
            | "RTRIM"
            | "LENGTH"
            | "LEN"
            | "SUBSTR"
            | "SUBSTRING"
            | "REPLACE"
            | "CONCAT"
            | "ROUND"
            | "CEIL"
            | "CEILING"
            | "FLOOR"
            | "ABS"
            | "POWER"
            | "POW"
            | "SQRT"
            | "NOW"
            | "DATETIME_FORMAT"
            | "STRING"
            | "INTEGER"
            | "FLOAT"
            | "ISNULL"
            | "IS_NULL"
    )
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn string_arg(args: &[Primary], idx: usize, pos: Position) -> Result<String> {
    args.get(idx)
        .map(Primary::as_str_display)
        .ok_or_else(|| arity_error(pos))
}

fn number_arg(args: &[Primary], idx: usize, pos: Position) -> Result<f64> {
    args.get(idx).and_then(Primary::as_f64).ok_or_else(|| not_convertible(pos))
}

fn datetime_arg(args: &[Primary], idx: usize, pos: Position) -> Result<NaiveDateTime> {
    match args.get(idx) {
        Some(Primary::Datetime(d)) => Ok(*d),
        _ => Err(not_convertible(pos)),
    }
}

fn substr(args: &[Primary], pos: Position) -> Result<Primary> {
    let s = string_arg(args, 0, pos)?;
    let start = args.get(1).and_then(Primary::as_i64).ok_or_else(|| not_convertible(pos))?;
    let chars: Vec<char> = s.chars().collect();
    let start_idx = (start.max(1) as usize).saturating_sub(1);
    let len = args.get(2).and_then(Primary::as_i64).map(|n| n.max(0) as usize).unwrap_or(chars.len());
    let end_idx = (start_idx + len).min(chars.len());
    if start_idx >= chars.len() {
        return Ok(Primary::String(String::new()));
    }
    Ok(Primary::String(chars[start_idx..end_idx].iter().collect()))
}

fn round(args: &[Primary], pos: Position) -> Result<Primary> {
    let value = number_arg(args, 0, pos)?;
    let digits = args.get(1).and_then(Primary::as_i64).unwrap_or(0);
    let factor = 10f64.powi(digits as i32);
    Ok(Primary::Float((value * factor).round() / factor))
}

fn abs(args: &[Primary], pos: Position) -> Result<Primary> {
    match args.first() {
        Some(Primary::Integer(i)) => Ok(Primary::Integer(i.abs())),
        _ => Ok(Primary::Float(number_arg(args, 0, pos)?.abs())),
    }
}

fn arity_error(pos: Position) -> EngineError {
    EngineError::Evaluation {
        pos,
        message: "wrong number of arguments to function call".to_string(),
    }
}

fn not_convertible(pos: Position) -> EngineError {
    EngineError::Evaluation {
        pos,
        message: "argument cannot be converted to the required type".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_uppercases_ascii() {
        let result = call_builtin("upper", &[Primary::String("abc".into())], Position::UNKNOWN).unwrap();
        assert_eq!(result, Some(Primary::String("ABC".into())));
    }

    #[test]
    fn substr_is_one_based() {
        let args = vec![Primary::String("hello".into()), Primary::Integer(2), Primary::Integer(3)];
        let result = call_builtin("substr", &args, Position::UNKNOWN).unwrap();
        assert_eq!(result, Some(Primary::String("ell".into())));
    }

    #[test]
    fn unknown_function_returns_none() {
        let result = call_builtin("not_a_function", &[], Position::UNKNOWN).unwrap();
        assert_eq!(result, None);
    }
}
