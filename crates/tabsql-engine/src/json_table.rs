use tabsql_core::{EngineError, Header, HeaderField, Position, Primary, Record, Result};

use crate::relation::Relation;

/// Minimal JSON reader backing `JSON_ROW(json_expr)`: a top-level object
/// becomes one row, a top-level array of objects becomes one row per
/// element, and the union of keys (in first-seen order) becomes the header.
/// Anything else at the top level is an evaluation error.
pub fn eval_json_row(json_text: &str, pos: Position) -> Result<Relation> {
    let value = parse_json(json_text, pos)?;
    let objects: Vec<Vec<(String, JsonValue)>> = match value {
        JsonValue::Object(fields) => vec![fields],
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                JsonValue::Object(fields) => Ok(fields),
                _ => Err(json_error(pos, "JSON_ROW array elements must be objects")),
            })
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(json_error(pos, "JSON_ROW requires a JSON object or array of objects")),
    };

    let mut column_order: Vec<String> = Vec::new();
    for object in &objects {
        for (key, _) in object {
            if !column_order.iter().any(|k| k == key) {
                column_order.push(key.clone());
            }
        }
    }

    let fields = column_order
        .iter()
        .enumerate()
        .map(|(i, name)| HeaderField::computed(name.clone(), i + 1))
        .collect();
    let header = Header::new(fields);

    let mut rows = Vec::with_capacity(objects.len());
    for object in objects {
        let values = column_order
            .iter()
            .map(|key| {
                object
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| json_to_primary(v))
                    .unwrap_or(Primary::Null)
            })
            .collect();
        rows.push(Record::new(values));
    }
    let provenance = rows.iter().map(|_| Vec::new()).collect();
    Ok(Relation::new(header, rows, provenance))
}

fn json_to_primary(value: &JsonValue) -> Primary {
    match value {
        JsonValue::Null => Primary::Null,
        JsonValue::Bool(b) => Primary::Boolean(tabsql_core::Ternary::from_bool(*b)),
        JsonValue::Integer(i) => Primary::Integer(*i),
        JsonValue::Float(f) => Primary::Float(*f),
        JsonValue::String(s) => Primary::String(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => Primary::String(render_json(value)),
    }
}

fn render_json(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Integer(i) => i.to_string(),
        JsonValue::Float(f) => f.to_string(),
        JsonValue::String(s) => format!("\"{s}\""),
        JsonValue::Array(items) => format!("[{}]", items.iter().map(render_json).collect::<Vec<_>>().join(",")),
        JsonValue::Object(fields) => format!(
            "{{{}}}",
            fields
                .iter()
                .map(|(k, v)| format!("\"{k}\":{}", render_json(v)))
                .collect::<Vec<_>>()
                .join(",")
        ),
    }
}

#[derive(Debug, Clone)]
enum JsonValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<JsonValue>),
    Object(Vec<(String, JsonValue)>),
}

struct JsonParser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

fn parse_json(text: &str, pos: Position) -> Result<JsonValue> {
    let mut parser = JsonParser {
        chars: text.chars().collect(),
        pos: 0,
        source: text,
    };
    parser.skip_whitespace();
    let value = parser.parse_value(pos)?;
    parser.skip_whitespace();
    Ok(value)
}

impl<'a> JsonParser<'a> {
    fn skip_whitespace(&mut self) {
        while matches!(self.chars.get(self.pos), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn parse_value(&mut self, pos: Position) -> Result<JsonValue> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.parse_object(pos),
            Some('[') => self.parse_array(pos),
            Some('"') => Ok(JsonValue::String(self.parse_string(pos)?)),
            Some('t') => self.parse_literal("true", JsonValue::Bool(true), pos),
            Some('f') => self.parse_literal("false", JsonValue::Bool(false), pos),
            Some('n') => self.parse_literal("null", JsonValue::Null, pos),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(pos),
            _ => Err(json_error(pos, &format!("unexpected character in JSON: {}", self.source))),
        }
    }

    fn parse_literal(&mut self, literal: &str, value: JsonValue, pos: Position) -> Result<JsonValue> {
        for expected in literal.chars() {
            if self.peek() != Some(expected) {
                return Err(json_error(pos, "invalid JSON literal"));
            }
            self.pos += 1;
        }
        Ok(value)
    }

    fn parse_object(&mut self, pos: Position) -> Result<JsonValue> {
        self.pos += 1; // {
        let mut fields = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(JsonValue::Object(fields));
        }
        loop {
            self.skip_whitespace();
            let key = self.parse_string(pos)?;
            self.skip_whitespace();
            if self.peek() != Some(':') {
                return Err(json_error(pos, "expected ':' in JSON object"));
            }
            self.pos += 1;
            let value = self.parse_value(pos)?;
            fields.push((key, value));
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(json_error(pos, "expected ',' or '}' in JSON object")),
            }
        }
        Ok(JsonValue::Object(fields))
    }

    fn parse_array(&mut self, pos: Position) -> Result<JsonValue> {
        self.pos += 1; // [
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(JsonValue::Array(items));
        }
        loop {
            let value = self.parse_value(pos)?;
            items.push(value);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(json_error(pos, "expected ',' or ']' in JSON array")),
            }
        }
        Ok(JsonValue::Array(items))
    }

    fn parse_string(&mut self, pos: Position) -> Result<String> {
        if self.peek() != Some('"') {
            return Err(json_error(pos, "expected a JSON string"));
        }
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(json_error(pos, "unterminated JSON string")),
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some(c) => out.push(c),
                        None => return Err(json_error(pos, "unterminated JSON escape")),
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
        Ok(out)
    }

    fn parse_number(&mut self, pos: Position) -> Result<JsonValue> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-' {
                is_float = is_float || c == '.' || c == 'e' || c == 'E';
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>().map(JsonValue::Float).map_err(|_| json_error(pos, "invalid JSON number"))
        } else {
            text.parse::<i64>().map(JsonValue::Integer).map_err(|_| json_error(pos, "invalid JSON number"))
        }
    }
}

fn json_error(pos: Position, message: &str) -> EngineError {
    EngineError::Evaluation {
        pos,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_becomes_one_row() {
        let relation = eval_json_row(r#"{"a": 1, "b": "x"}"#, Position::UNKNOWN).unwrap();
        assert_eq!(relation.len(), 1);
        assert_eq!(relation.width(), 2);
    }

    #[test]
    fn array_of_objects_unions_keys() {
        let relation = eval_json_row(r#"[{"a": 1}, {"b": 2}]"#, Position::UNKNOWN).unwrap();
        assert_eq!(relation.len(), 2);
        assert_eq!(relation.width(), 2);
        assert!(relation.rows[0].get(1).unwrap().is_null());
    }
}
