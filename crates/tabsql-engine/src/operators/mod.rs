//! Statement execution: everything past expression evaluation and `SELECT`.
//! `control` is the dispatcher and procedural-flow handler (and where
//! `Engine::call_user_function` lives); the rest are one module per
//! statement family, each implemented directly on `Engine`.
mod commit;
mod control;
mod ddl;
mod delete;
mod insert;
mod update;

pub use control::Signal;
