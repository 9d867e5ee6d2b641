use tabsql_core::{Header, Record};

/// What a field/aggregate expression is being evaluated against: a single
/// row (the common case), or a group of rows (inside a grouped SELECT,
/// where aggregate calls see every member and bare field references fall
/// back to the group's first row — see the grouping decision in DESIGN.md).
#[derive(Clone, Copy)]
pub enum RowSource<'a> {
    Row(&'a Record),
    Group(&'a [Record]),
}

#[derive(Clone, Copy)]
pub struct RowContext<'a> {
    pub header: &'a Header,
    pub source: RowSource<'a>,
}

impl<'a> RowContext<'a> {
    pub fn single(header: &'a Header, row: &'a Record) -> Self {
        Self {
            header,
            source: RowSource::Row(row),
        }
    }

    pub fn group(header: &'a Header, rows: &'a [Record]) -> Self {
        Self {
            header,
            source: RowSource::Group(rows),
        }
    }

    pub fn representative(&self) -> Option<&'a Record> {
        match self.source {
            RowSource::Row(r) => Some(r),
            RowSource::Group(rows) => rows.first(),
        }
    }

    pub fn group_rows(&self) -> Option<&'a [Record]> {
        match self.source {
            RowSource::Group(rows) => Some(rows),
            RowSource::Row(_) => None,
        }
    }
}
