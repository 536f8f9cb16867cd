//! Modules a manifest can name from the command line
//!
//! - `builtin` - the `mortar/*` catalogue
//! - `route_table` - plugins declared as `.toml` route tables
//! - `source` - the [`mortar::ModuleSource`] tying aliases, built-ins and files together

pub mod builtin;
pub mod route_table;
pub mod source;

pub use route_table::RouteTable;
pub use source::CliModules;
