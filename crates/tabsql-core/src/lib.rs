pub mod ast_types;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod function;
pub mod header;
pub mod primary;
pub mod record;
pub mod view;
pub mod view_cache;

pub use ast_types::AstTypes;
pub use cursor::{Cursor, CursorPosition};
pub use error::{EngineError, Position, Result};
pub use filter::{CursorScope, Filter, FunctionScope, TempViewScope, VariableScope};
pub use function::{FunctionBody, Parameter, UserFunction};
pub use header::{Header, HeaderField};
pub use primary::{compare, coerce_numeric, order, Numeric, Primary, Ternary};
pub use record::{base_provenance, Provenance, Record};
pub use view::{Encoding, FileInfo, LineBreak, View};
pub use view_cache::{canonical_key, ViewCache};
