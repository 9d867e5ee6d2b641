use tabsql_core::{Encoding, LineBreak};

/// Everything the loader needs beyond the path: these mirror the CLI's
/// `-e`/`-t`/`--no-header`/`--without-null` flags (and per-table overrides
/// declared inline in a script), carried alongside the [`tabsql_core::FileInfo`]
/// the loaded view is stamped with so a later save can round-trip them.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub encoding: Encoding,
    pub line_break: LineBreak,
    pub no_header: bool,
    pub without_null: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: Encoding::Utf8,
            line_break: LineBreak::Lf,
            no_header: false,
            without_null: false,
        }
    }
}

impl LoadOptions {
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub delimiter: u8,
    pub encoding: Encoding,
    pub line_break: LineBreak,
    pub no_header: bool,
    /// Quote every field, not just the ones that need it. Useful when the
    /// output is re-read by a tool that doesn't sniff value types.
    pub quote_all: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: Encoding::Utf8,
            line_break: LineBreak::Lf,
            no_header: false,
            quote_all: false,
        }
    }
}
