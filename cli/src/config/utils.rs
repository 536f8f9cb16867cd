//! Utility functions for specifier classification and path handling
//!
//! The CLI accepts module specifiers in three forms:
//!
//! 1. **File paths** (`./plugins/hello.toml`, `/srv/app/hello`, `~/hello.toml`)
//!    - Have explicit path indicators: `.`, `/`, `~/`
//!    - Relative ones are joined to the manifest's directory by the composer
//!
//! 2. **Aliases** (`hello`, `my-cache`)
//!    - Simple identifiers made of alphanumerics, `-` and `_`
//!    - Resolved through the configuration file's `aliases` table
//!    - Can point to paths, packages, or other aliases
//!
//! 3. **Packages** (`mortar/memory`, `mortar/status`)
//!    - Anything else, looked up in the built-in catalogue
//!
//! ```text
//!     ┌───────────────────┐
//!     │ Path indicators?  │──Yes──> File Path
//!     │ (., /, ~/)        │
//!     └───────┬───────────┘
//!             │ No
//!             ▼
//!     ┌───────────────────┐
//!     │ Identifier only?  │──Yes──> Alias (if configured), else Package
//!     └───────┬───────────┘
//!             │ No
//!             ▼
//!          Package
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use mortar_cli::config::utils;
//!
//! assert!(utils::is_path_spec("./hello.toml"));
//! assert!(utils::is_path_spec("/srv/app/hello"));
//! assert!(utils::is_path_spec("~/hello.toml"));
//! assert!(!utils::is_path_spec("mortar/memory"));
//!
//! assert!(utils::is_identifier("hello"));
//! assert!(!utils::is_identifier("mortar/memory"));
//! ```

use std::path::PathBuf;

/// Determine if a spec names a local file
pub fn is_path_spec(spec: &str) -> bool {
    spec.starts_with('.') || spec.starts_with('/') || spec.starts_with("~/")
}

/// Determine if a spec is a bare identifier, the only form an alias can take
pub fn is_identifier(spec: &str) -> bool {
    !spec.is_empty()
        && spec
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Expand a leading `~/` to the home directory
///
/// Other specs are returned as paths unchanged.
pub fn expand_home(spec: &str) -> anyhow::Result<PathBuf> {
    match spec.strip_prefix("~/") {
        Some(stripped) => {
            let home = dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
            Ok(home.join(stripped))
        }
        None => Ok(PathBuf::from(spec)),
    }
}

/// Canonicalize a path spec to an absolute path
///
/// This function:
/// 1. Expands ~ to home directory
/// 2. Resolves relative paths (. and ..)
/// 3. Converts to absolute path
/// 4. Validates that the path exists
///
/// Symlinks are followed to their target.
pub fn canonicalize_path(spec: &str) -> anyhow::Result<PathBuf> {
    let path = expand_home(spec)?;

    path.canonicalize().map_err(|e| {
        anyhow::anyhow!(
            "path does not exist or cannot be resolved: '{}'\nerror: {}",
            spec,
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_path_spec() {
        assert!(is_path_spec("./hello.toml"));
        assert!(is_path_spec("../plugins/hello"));
        assert!(is_path_spec("/abs/path/hello.toml"));
        assert!(is_path_spec("~/hello.toml"));

        assert!(!is_path_spec("mortar/memory"));
        assert!(!is_path_spec("hello"));
        assert!(!is_path_spec("hello.toml"));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("hello"));
        assert!(is_identifier("my_cache"));
        assert!(is_identifier("my-cache2"));

        assert!(!is_identifier(""));
        assert!(!is_identifier("mortar/memory"));
        assert!(!is_identifier("./hello"));
        assert!(!is_identifier("a b"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs").unwrap(), PathBuf::from("/abs"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x.toml").unwrap(), home.join("x.toml"));
        }
    }

    #[test]
    fn test_canonicalize_path_errors() {
        let result = canonicalize_path("/this/path/definitely/does/not/exist.toml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("does not exist or cannot be resolved")
        );
    }

    #[test]
    fn test_canonicalize_path_with_tempfile() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("hello.toml");
        std::fs::write(&file, "name = \"hello\"").unwrap();

        let canonical = canonicalize_path(file.to_str().unwrap()).unwrap();
        assert!(canonical.is_absolute());
        assert!(canonical.ends_with("hello.toml"));
    }
}
