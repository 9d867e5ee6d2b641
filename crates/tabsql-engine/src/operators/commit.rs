use tabsql_core::Result;
use tabsql_io::SaveOptions;

use crate::engine::Engine;

impl Engine {
    /// Writes every dirty persistent view back to its file (§4.10). Runs at
    /// the end of a script and on an explicit `COMMIT`; a script that errors
    /// partway through still commits whatever ran before the error, matching
    /// the no-transaction model described for DML/DDL statements.
    pub fn commit(&mut self) -> Result<()> {
        let mut written = Vec::new();
        for view in self.views.dirty_views_mut() {
            let options = SaveOptions {
                delimiter: view.file_info.delimiter,
                encoding: view.file_info.encoding,
                line_break: view.file_info.line_break,
                no_header: view.file_info.no_header,
                quote_all: false,
            };
            tabsql_io::save_view(view, &options)?;
            written.push((view.name.clone(), view.operated_records, view.operated_fields));
            view.dirty = false;
            view.operated_records = 0;
            view.operated_fields = 0;
        }
        for (name, records, fields) in written {
            log::info!("committed {name}: {records} record(s), {fields} field(s) changed");
        }
        Ok(())
    }

    /// Discards every loaded view without writing it back, so the next
    /// reference to a table re-reads it fresh from disk.
    pub fn rollback(&mut self) {
        self.views.clear();
    }
}
