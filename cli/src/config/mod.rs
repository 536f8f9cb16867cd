//! Configuration management for the mortar CLI
//!
//! - `schema` - Configuration data structures
//! - `io` - Reading, writing, and updating the config file
//! - `paths` - Directory path management
//! - `utils` - Specifier classification and path helpers
//!
//! ```rust,no_run
//! use mortar_cli::config;
//!
//! # fn example() -> anyhow::Result<()> {
//! // Load config (returns default if file doesn't exist)
//! let config = config::load_config()?;
//!
//! // Register a module alias
//! config::add_alias("echo", "mortar/echo")?;
//! # Ok(())
//! # }
//! ```

pub mod io;
pub mod paths;
pub mod schema;
pub mod utils;

pub use io::{add_alias, load_config, remove_alias, save_config, update_config};
pub use paths::{get_config_path, get_mortar_dir};
pub use schema::MortarConfig;
