use crate::header::Header;
use crate::record::{Provenance, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf8Bom,
    Sjis,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Utf8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreak {
    Lf,
    Crlf,
    Cr,
}

impl Default for LineBreak {
    fn default() -> Self {
        LineBreak::Lf
    }
}

/// Everything the I/O collaborator needs to read back and rewrite a
/// persistent view, plus the bookkeeping a temporary view needs instead.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: Option<std::path::PathBuf>,
    pub delimiter: u8,
    pub no_header: bool,
    pub encoding: Encoding,
    pub line_break: LineBreak,
    pub without_null: bool,
    pub temporary: bool,
    /// Snapshot of records captured when a temporary table was declared;
    /// `DECLARE TABLE ... AS query` callers may diff against this, and it
    /// lets a correlated recursive reference rebind to "just this round's
    /// rows" without mutating the cumulative set in place.
    pub initial_records: Vec<Record>,
}

impl FileInfo {
    pub fn temporary() -> Self {
        Self {
            path: None,
            delimiter: b',',
            no_header: false,
            encoding: Encoding::Utf8,
            line_break: LineBreak::Lf,
            without_null: false,
            temporary: true,
            initial_records: Vec::new(),
        }
    }

    pub fn persistent(path: std::path::PathBuf, delimiter: u8) -> Self {
        Self {
            path: Some(path),
            delimiter,
            no_header: false,
            encoding: Encoding::Utf8,
            line_break: LineBreak::Lf,
            without_null: false,
            temporary: false,
            initial_records: Vec::new(),
        }
    }
}

/// In-memory relation: a header plus records plus the metadata needed to
/// write it back. `operated_records`/`operated_fields` are the counters
/// reported in DML/DDL log lines (§4.10, §6).
#[derive(Debug, Clone)]
pub struct View {
    pub name: String,
    pub file_info: FileInfo,
    pub header: Header,
    pub records: Vec<Record>,
    /// Parallel to `records`: provenance of each row, for views produced by
    /// joins/filters/projections that need to trace back to base rows.
    pub provenance: Vec<Provenance>,
    pub operated_records: usize,
    pub operated_fields: usize,
    pub dirty: bool,
}

impl View {
    pub fn new(name: impl Into<String>, file_info: FileInfo, header: Header, records: Vec<Record>) -> Self {
        let name = name.into();
        let provenance = (0..records.len())
            .map(|i| crate::record::base_provenance(&name, i))
            .collect();
        Self {
            name,
            file_info,
            header,
            records,
            provenance,
            operated_records: 0,
            operated_fields: 0,
            dirty: false,
        }
    }

    pub fn empty_temporary(name: impl Into<String>, header: Header) -> Self {
        Self::new(name, FileInfo::temporary(), header, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn mark_dirty(&mut self) {
        if !self.file_info.temporary {
            self.dirty = true;
        }
    }

    pub fn rename(&mut self, new_name: impl Into<String>) {
        let new_name = new_name.into();
        self.header.rename_view(new_name.clone());
        self.name = new_name;
    }

    /// Appends a row with freshly assigned provenance pointing at itself
    /// (used by INSERT and by CREATE TABLE's default-fill).
    pub fn push_own_row(&mut self, record: Record) {
        let idx = self.records.len();
        self.provenance.push(crate::record::base_provenance(&self.name, idx));
        self.records.push(record);
    }

    pub fn assert_arity_invariant(&self) -> bool {
        self.records.iter().all(|r| r.len() == self.header.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderField;

    #[test]
    fn new_view_upholds_arity_invariant() {
        use crate::primary::Primary;
        let header = Header::new(vec![HeaderField::new("t", "c1", 1)]);
        let records = vec![Record::new(vec![Primary::Integer(1)])];
        let view = View::new("t", FileInfo::temporary(), header, records);
        assert!(view.assert_arity_invariant());
    }
}
