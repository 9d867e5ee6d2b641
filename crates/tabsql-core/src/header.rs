use smol_str::SmolStr;

use crate::error::{EngineError, Position, Result};

/// Metadata for one column of a [`crate::view::View`]: which view it
/// belongs to (post-alias), its name, its 1-based ordinal within the view,
/// whether it came straight from a table (as opposed to a computed
/// expression), and whether it is itself an alias.
#[derive(Debug, Clone)]
pub struct HeaderField {
    pub view: SmolStr,
    pub column: SmolStr,
    pub ordinal: usize,
    pub from_table: bool,
    pub is_alias: bool,
}

impl HeaderField {
    pub fn new(view: impl Into<SmolStr>, column: impl Into<SmolStr>, ordinal: usize) -> Self {
        Self {
            view: view.into(),
            column: column.into(),
            ordinal,
            from_table: true,
            is_alias: false,
        }
    }

    pub fn computed(column: impl Into<SmolStr>, ordinal: usize) -> Self {
        Self {
            view: SmolStr::default(),
            column: column.into(),
            ordinal,
            from_table: false,
            is_alias: false,
        }
    }

    fn view_matches(&self, view: &str) -> bool {
        self.view.eq_ignore_ascii_case(view)
    }

    fn column_matches(&self, column: &str) -> bool {
        self.column.eq_ignore_ascii_case(column)
    }
}

/// Ordered sequence of [`HeaderField`]. Case-insensitive lookup is the
/// system-wide rule for both view and column names; the stored form
/// preserves user-entered case for display.
#[derive(Debug, Clone, Default)]
pub struct Header {
    fields: Vec<HeaderField>,
}

impl Header {
    pub fn new(fields: Vec<HeaderField>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderField> {
        self.fields.iter()
    }

    pub fn push(&mut self, field: HeaderField) {
        self.fields.push(field);
    }

    /// Inserts a field at a specific position (ALTER TABLE ADD COLUMN with a
    /// `FIRST`/`BEFORE`/`AFTER` placement) and renumbers every ordinal to
    /// match its new position.
    pub fn insert(&mut self, idx: usize, field: HeaderField) {
        self.fields.insert(idx, field);
        self.renumber();
    }

    /// Removes the field at `idx` (ALTER TABLE DROP COLUMN) and renumbers
    /// the remaining ordinals.
    pub fn remove(&mut self, idx: usize) -> HeaderField {
        let field = self.fields.remove(idx);
        self.renumber();
        field
    }

    fn renumber(&mut self) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.ordinal = i + 1;
        }
    }

    pub fn get(&self, idx: usize) -> Option<&HeaderField> {
        self.fields.get(idx)
    }

    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [HeaderField] {
        &mut self.fields
    }

    /// 1-based positional resolution, as used by `ColumnNumber` expression
    /// nodes (`#1`, `#2`, ...).
    pub fn resolve_ordinal(&self, n: usize) -> Option<usize> {
        self.fields.iter().position(|f| f.ordinal == n)
    }

    /// Resolves `view?.column` to exactly one index, or fails with "does not
    /// exist" / "is ambiguous" per the §3 Header invariant.
    pub fn resolve(&self, view: Option<&str>, column: &str) -> Result<usize> {
        let mut matches: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                f.column_matches(column) && view.map(|v| f.view_matches(v)).unwrap_or(true)
            })
            .map(|(i, _)| i)
            .collect();

        match matches.len() {
            0 => Err(EngineError::FieldNotFound {
                pos: Position::UNKNOWN,
                name: qualified_name(view, column),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(EngineError::FieldAmbiguous {
                pos: Position::UNKNOWN,
                name: qualified_name(view, column),
            }),
        }
    }

    /// Expands `*` (all fields) or `view.*` (fields belonging to `view`).
    pub fn expand(&self, view: Option<&str>) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| view.map(|v| f.view_matches(v)).unwrap_or(true))
            .map(|(i, _)| i)
            .collect()
    }

    /// Renames every field's `view` component, used when a `FROM` clause
    /// applies an alias to a table or subquery.
    pub fn rename_view(&mut self, new_view: impl Into<SmolStr>) {
        let new_view = new_view.into();
        for f in &mut self.fields {
            f.view = new_view.clone();
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.column.to_string()).collect()
    }
}

fn qualified_name(view: Option<&str>, column: &str) -> String {
    match view {
        Some(v) => format!("{v}.{column}"),
        None => column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header::new(vec![
            HeaderField::new("t", "column1", 1),
            HeaderField::new("t", "column2", 2),
        ])
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let h = sample();
        assert_eq!(h.resolve(None, "COLUMN1").unwrap(), 0);
    }

    #[test]
    fn resolve_missing_errors() {
        let h = sample();
        assert!(h.resolve(None, "column3").is_err());
    }

    #[test]
    fn resolve_ambiguous_errors() {
        let mut h = sample();
        h.push(HeaderField::new("u", "column1", 3));
        assert!(matches!(
            h.resolve(None, "column1"),
            Err(EngineError::FieldAmbiguous { .. })
        ));
    }

    #[test]
    fn qualified_resolve_disambiguates() {
        let mut h = sample();
        h.push(HeaderField::new("u", "column1", 3));
        assert_eq!(h.resolve(Some("u"), "column1").unwrap(), 2);
    }
}
