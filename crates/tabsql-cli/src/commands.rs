use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "tabsql")]
#[command(
    about = "tabsql runs SQL-style scripts against CSV/TSV files",
    long_about = None,
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Script file to run, or `-` to read the script from stdin.
    pub script: PathBuf,
    /// Directory table identifiers resolve against. Defaults to the
    /// current directory.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,
    /// Default field delimiter for files with no recognized extension.
    #[arg(short = 'd', long, default_value = ",")]
    pub delimiter: String,
    /// Character encoding to read/write files with.
    #[arg(short = 'e', long, value_enum, default_value_t = Encoding::Utf8)]
    pub encoding: Encoding,
    /// Treat the first record of every file as data, not a header.
    #[arg(long, default_value_t = false)]
    pub no_header: bool,
    /// Treat unquoted empty fields as empty strings rather than Null.
    #[arg(long, default_value_t = false)]
    pub without_null: bool,
    /// Use CRLF line endings when writing files back on commit.
    #[arg(long, conflicts_with_all = ["lf", "cr"])]
    pub crlf: bool,
    /// Use LF line endings when writing files back on commit (default).
    #[arg(long, conflicts_with_all = ["crlf", "cr"])]
    pub lf: bool,
    /// Use CR line endings when writing files back on commit.
    #[arg(long, conflicts_with_all = ["crlf", "lf"])]
    pub cr: bool,
    /// Write rendered results to a file instead of stdout.
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,
    /// Print OperatedRecords/OperatedFields counters for each statement.
    #[arg(long, default_value_t = false)]
    pub stats: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    Utf8,
    #[value(name = "utf8-bom")]
    Utf8Bom,
    Sjis,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Encoding::Utf8 => "utf8",
            Encoding::Utf8Bom => "utf8-bom",
            Encoding::Sjis => "sjis",
        };
        write!(f, "{s}")
    }
}

impl From<Encoding> for tabsql_core::Encoding {
    fn from(value: Encoding) -> Self {
        match value {
            Encoding::Utf8 => tabsql_core::Encoding::Utf8,
            Encoding::Utf8Bom => tabsql_core::Encoding::Utf8Bom,
            Encoding::Sjis => tabsql_core::Encoding::Sjis,
        }
    }
}

impl Cli {
    pub fn line_break(&self) -> tabsql_core::LineBreak {
        if self.crlf {
            tabsql_core::LineBreak::Crlf
        } else if self.cr {
            tabsql_core::LineBreak::Cr
        } else {
            tabsql_core::LineBreak::Lf
        }
    }

    pub fn delimiter_byte(&self) -> Result<u8, String> {
        let mut bytes = self.delimiter.bytes();
        match (bytes.next(), bytes.next()) {
            (Some(b), None) => Ok(b),
            _ => Err(format!("--delimiter must be a single byte, got {:?}", self.delimiter)),
        }
    }
}
