use tabsql_core::{LineBreak, View};

use crate::error::{IoError, Result};
use crate::options::SaveOptions;

/// Writes a view back to its `file_info.path`. Temporary views have no
/// path and are never saved — callers check `file_info.temporary` first.
pub fn save_view(view: &View, options: &SaveOptions) -> tabsql_core::Result<()> {
    save_view_inner(view, options).map_err(Into::into)
}

fn save_view_inner(view: &View, options: &SaveOptions) -> Result<()> {
    let path = view.file_info.path.as_ref().expect("temporary views are not saved");
    let terminator = match options.line_break {
        LineBreak::Lf => csv::Terminator::Any(b'\n'),
        LineBreak::Crlf => csv::Terminator::CRLF,
        LineBreak::Cr => csv::Terminator::Any(b'\r'),
    };
    let quote_style = if options.quote_all {
        csv::QuoteStyle::Always
    } else {
        csv::QuoteStyle::Necessary
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .terminator(terminator)
        .quote_style(quote_style)
        .has_headers(false)
        .from_path(path)?;

    if !options.no_header {
        writer.write_record(view.header.column_names())?;
    }
    for record in &view.records {
        let fields: Vec<String> = record.values().iter().map(|v| v.as_str_display()).collect();
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabsql_core::{FileInfo, Header, HeaderField, Primary, Record};

    #[test]
    fn round_trips_header_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let header = Header::new(vec![
            HeaderField::new("t", "a", 1),
            HeaderField::new("t", "b", 2),
        ]);
        let records = vec![Record::new(vec![Primary::Integer(1), Primary::String("x".into())])];
        let file_info = FileInfo::persistent(path.clone(), b',');
        let view = View::new("t", file_info, header, records);

        save_view(&view, &SaveOptions::default()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "a,b\n1,x\n");
    }
}
