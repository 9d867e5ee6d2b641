use std::path::Path;

use tabsql_core::{Encoding, FileInfo, Header, HeaderField, Primary, Record, View};

use crate::error::{IoError, Result};
use crate::options::LoadOptions;

/// Reads a delimited file into a [`View`]. The view's name is the caller's
/// choice (the table name it was referenced by in the script), independent
/// of the file's base name.
pub fn load_view(name: &str, path: &Path, options: &LoadOptions) -> tabsql_core::Result<View> {
    load_view_inner(name, path, options).map_err(Into::into)
}

fn load_view_inner(name: &str, path: &Path, options: &LoadOptions) -> Result<View> {
    if !path.is_file() {
        return Err(IoError::NotFound {
            path: path.display().to_string(),
        });
    }
    let bytes = std::fs::read(path)?;
    let text = decode(&bytes, options.encoding, path)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = reader.records();
    let header = if options.no_header {
        None
    } else {
        rows.next().transpose()?
    };

    let width = header.as_ref().map(|h| h.len());
    let mut records = Vec::new();
    let mut max_width = width.unwrap_or(0);
    let mut raw_rows = Vec::new();
    for row in rows {
        let row = row?;
        max_width = max_width.max(row.len());
        raw_rows.push(row);
    }

    let header = build_header(name, header, max_width);
    for row in raw_rows {
        if row.len() != header.len() {
            return Err(IoError::RowArityMismatch {
                row: records.len() + 1,
                expected: header.len(),
                actual: row.len(),
            });
        }
        let values = row
            .iter()
            .map(|field| infer_primary(field, options.without_null))
            .collect();
        records.push(Record::new(values));
    }

    let mut file_info = FileInfo::persistent(path.to_path_buf(), options.delimiter);
    file_info.no_header = options.no_header;
    file_info.encoding = options.encoding;
    file_info.line_break = options.line_break;
    file_info.without_null = options.without_null;

    Ok(View::new(name, file_info, header, records))
}

fn build_header(name: &str, header_row: Option<csv::StringRecord>, width: usize) -> Header {
    let fields = match header_row {
        Some(row) => row
            .iter()
            .enumerate()
            .map(|(i, col)| HeaderField::new(name, col, i + 1))
            .collect(),
        None => (0..width)
            .map(|i| HeaderField::new(name, format!("c{}", i + 1), i + 1))
            .collect(),
    };
    Header::new(fields)
}

/// Parses an unquoted/raw CSV field into a typed [`Primary`]. An empty field
/// becomes `Null` unless `without_null` is set, in which case it is kept as
/// an empty string — the `csv` crate does not expose whether a field was
/// quoted in the source text, so quoted-vs-unquoted empty strings are not
/// distinguished.
fn infer_primary(field: &str, without_null: bool) -> Primary {
    if field.is_empty() {
        return if without_null {
            Primary::String(String::new())
        } else {
            Primary::Null
        };
    }
    if let Ok(i) = field.parse::<i64>() {
        return Primary::Integer(i);
    }
    if let Ok(f) = field.parse::<f64>() {
        return Primary::Float(f);
    }
    Primary::String(field.to_string())
}

fn decode(bytes: &[u8], encoding: Encoding, path: &Path) -> Result<String> {
    let (decoded, had_errors) = match encoding {
        Encoding::Utf8 | Encoding::Utf8Bom => {
            let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
            let (cow, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
            (cow, had_errors)
        }
        Encoding::Sjis => {
            let (cow, _, had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
            (cow, had_errors)
        }
    };
    if had_errors {
        return Err(IoError::Decode {
            path: path.display().to_string(),
            encoding: encoding_name(encoding),
        });
    }
    Ok(decoded.into_owned())
}

fn encoding_name(encoding: Encoding) -> &'static str {
    match encoding {
        Encoding::Utf8 => "UTF-8",
        Encoding::Utf8Bom => "UTF-8 with BOM",
        Encoding::Sjis => "Shift_JIS",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_header_and_infers_types() {
        let file = write_temp("column1,column2\n1,str1\n2,str2\n");
        let view = load_view("t", file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(view.header.column_names(), vec!["column1", "column2"]);
        assert_eq!(view.records.len(), 2);
        assert_eq!(view.records[0].get(0), Some(&Primary::Integer(1)));
    }

    #[test]
    fn empty_field_becomes_null_by_default() {
        let file = write_temp("a,b\n1,\n");
        let view = load_view("t", file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(view.records[0].get(1), Some(&Primary::Null));
    }

    #[test]
    fn without_null_keeps_empty_string() {
        let file = write_temp("a,b\n1,\n");
        let options = LoadOptions {
            without_null: true,
            ..LoadOptions::default()
        };
        let view = load_view("t", file.path(), &options).unwrap();
        assert_eq!(view.records[0].get(1), Some(&Primary::String(String::new())));
    }

    #[test]
    fn no_header_synthesizes_column_names() {
        let file = write_temp("1,str1\n2,str2\n");
        let options = LoadOptions {
            no_header: true,
            ..LoadOptions::default()
        };
        let view = load_view("t", file.path(), &options).unwrap();
        assert_eq!(view.header.column_names(), vec!["c1", "c2"]);
        assert_eq!(view.records.len(), 2);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_view("t", Path::new("/no/such/file.csv"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, tabsql_core::EngineError::FileNotFound { .. }));
    }
}
