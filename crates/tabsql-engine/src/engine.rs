use std::path::{Path, PathBuf};

use tabsql_core::{EngineError, Encoding, Header, LineBreak, Position, Record, Result, View, ViewCache};

use crate::types::Filter;

/// Runtime configuration: where table identifiers resolve to on disk, the
/// read/write options newly-loaded files fall back to, and the guards
/// against runaway recursion (recursive CTEs, nested user-function calls).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_dir: PathBuf,
    pub default_delimiter: u8,
    pub default_encoding: Encoding,
    pub default_line_break: LineBreak,
    pub default_no_header: bool,
    pub recursion_limit: usize,
    pub without_null: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            default_delimiter: b',',
            default_encoding: Encoding::Utf8,
            default_line_break: LineBreak::Lf,
            default_no_header: false,
            recursion_limit: 10_000,
            without_null: false,
        }
    }
}

/// Ties together the view cache, the procedural `Filter` environment and
/// configuration, and is the receiver for every statement-execution and
/// expression-evaluation method (split across `eval.rs`, `select/`,
/// `operators/`).
pub struct Engine {
    pub views: ViewCache,
    pub filter: Filter,
    pub config: EngineConfig,
    /// Rows of the enclosing query, innermost last, visible to a correlated
    /// subquery when a field reference doesn't resolve against its own FROM.
    pub correlated: Vec<(Header, Record)>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            views: ViewCache::new(),
            filter: Filter::new(),
            config,
            correlated: Vec::new(),
        }
    }

    /// Resolves a bare table identifier to a file path and the delimiter to
    /// read/write it with. Table names double as file names: an identifier
    /// that already carries a recognized extension (`t.csv`, `t.tsv`) is
    /// used as-is; otherwise `.csv` then `.tsv` are tried against
    /// `base_dir`, in that order.
    pub fn resolve_table_path(&self, name: &str) -> Option<(PathBuf, u8)> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tsv") {
            return Some((self.config.base_dir.join(name), b'\t'));
        }
        if lower.ends_with(".csv") || lower.ends_with(".txt") {
            return Some((self.config.base_dir.join(name), b','));
        }
        let csv_path = self.config.base_dir.join(format!("{name}.csv"));
        if csv_path.is_file() {
            return Some((csv_path, b','));
        }
        let tsv_path = self.config.base_dir.join(format!("{name}.tsv"));
        if tsv_path.is_file() {
            return Some((tsv_path, b'\t'));
        }
        None
    }

    /// The path a CREATE TABLE with no extension should create — `.csv` by
    /// convention, matching `resolve_table_path`'s read-side preference.
    pub fn new_table_path(&self, name: &str) -> PathBuf {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".csv") || lower.ends_with(".tsv") || lower.ends_with(".txt") {
            self.config.base_dir.join(name)
        } else {
            self.config.base_dir.join(format!("{name}.csv"))
        }
    }

    pub fn delimiter_for(path: &Path, fallback: u8) -> u8 {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
            _ => fallback,
        }
    }

    pub fn load_options(&self, delimiter: u8) -> tabsql_io::LoadOptions {
        tabsql_io::LoadOptions {
            delimiter,
            encoding: self.config.default_encoding,
            line_break: self.config.default_line_break,
            no_header: self.config.default_no_header,
            without_null: self.config.without_null,
        }
    }

    /// Loads (or returns the already-cached) persistent view backing
    /// `name`, or `None` if `name` is not a temp view and no file resolves.
    pub fn load_persistent(&mut self, name: &str) -> Result<Option<&mut View>> {
        let Some((path, delimiter)) = self.resolve_table_path(name) else {
            return Ok(None);
        };
        let options = self.load_options(delimiter);
        let view_name = name.to_string();
        let view = self
            .views
            .get_or_load(&path, || tabsql_io::load_view(&view_name, &path, &options))?;
        Ok(Some(view))
    }

    pub fn require_persistent(&mut self, name: &str, pos: Position) -> Result<&mut View> {
        match self.load_persistent(name)? {
            Some(view) => Ok(view),
            None => Err(EngineError::TableUndefined {
                pos,
                name: name.to_string(),
            }),
        }
    }

    /// The header of a named target, temp view first. Used ahead of a
    /// mutation to validate column lists/arity before touching any rows.
    pub fn target_header(&mut self, name: &str, pos: Position) -> Result<Header> {
        if let Some(view) = self.filter.get_temp_view(name) {
            return Ok(view.header.clone());
        }
        Ok(self.require_persistent(name, pos)?.header.clone())
    }

    /// Runs `f` against the named target (temp view takes priority over a
    /// persistent file), marking it dirty afterward. Used by INSERT/UPDATE/
    /// DELETE/ALTER TABLE, all of which mutate exactly one named target.
    pub fn with_target_view_mut<R>(
        &mut self,
        name: &str,
        pos: Position,
        f: impl FnOnce(&mut View) -> Result<R>,
    ) -> Result<R> {
        if self.filter.get_temp_view(name).is_some() {
            let view = self
                .filter
                .get_temp_view_mut(name)
                .expect("checked present above");
            let result = f(view)?;
            view.mark_dirty();
            return Ok(result);
        }
        let view = self.require_persistent(name, pos)?;
        let result = f(view)?;
        view.mark_dirty();
        Ok(result)
    }
}
