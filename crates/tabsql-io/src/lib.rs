//! Loads and saves the delimited files that back persistent views: delimiter,
//! encoding, line-break and quoting are all handled here so `tabsql-engine`
//! only ever deals with typed [`tabsql_core::View`]s.

mod error;
mod load;
mod options;
mod save;

pub use error::IoError;
pub use load::load_view;
pub use options::{LoadOptions, SaveOptions};
pub use save::save_view;
