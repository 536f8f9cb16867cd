//! Configuration file I/O operations
//!
//! This module handles reading, writing, and updating the mortar configuration file.
//! All operations include automatic validation.

use super::paths::get_config_path;
use super::schema::MortarConfig;
use anyhow::{Context, Result};
use std::fs;

/// Load configuration from disk
///
/// Returns a default (empty) config if the file doesn't exist.
/// Validates the config after loading.
pub fn load_config() -> Result<MortarConfig> {
    let path = get_config_path()?;

    if !path.exists() {
        return Ok(MortarConfig::default());
    }

    let content =
        fs::read_to_string(&path).context(format!("Failed to read config: {}", path.display()))?;

    let config: MortarConfig =
        toml::from_str(&content).context(format!("Failed to parse config: {}", path.display()))?;

    if let Err(errors) = config.validate() {
        anyhow::bail!(
            "Config validation failed in {}:\n  {}",
            path.display(),
            errors.join("\n  ")
        );
    }

    Ok(config)
}

/// Save configuration to disk
///
/// Creates parent directories if needed.
/// Validates the config before saving.
pub fn save_config(config: &MortarConfig) -> Result<()> {
    if let Err(errors) = config.validate() {
        anyhow::bail!("cannot save invalid config:\n  {}", errors.join("\n  "));
    }

    let path = get_config_path()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(format!(
            "Failed to create config directory: {}",
            parent.display()
        ))?;
    }

    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&path, content).context(format!("Failed to write config: {}", path.display()))?;

    Ok(())
}

/// Update config with a modification function
///
/// This handles the load → modify → validate → save cycle.
pub fn update_config<F>(f: F) -> Result<()>
where
    F: FnOnce(&mut MortarConfig) -> Result<()>,
{
    let mut config = load_config()?;
    f(&mut config)?;
    save_config(&config)?;
    Ok(())
}

/// Names that would read as CLI words or clash with built-in packages
const RESERVED: &[&str] = &[
    "help", "version", "compose", "serve", "alias", "add", "remove", "list", "mortar",
];

/// Validate an alias name
///
/// Names must:
/// - Not be empty
/// - Contain only alphanumeric characters, hyphens, or underscores
/// - Not be reserved words
fn validate_identifier(name: &str, kind: &str) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("{} name cannot be empty", kind);
    }

    if !super::utils::is_identifier(name) {
        anyhow::bail!(
            "{} name '{}' must contain only alphanumeric characters, hyphens, or underscores",
            kind,
            name
        );
    }

    if RESERVED.contains(&name) {
        anyhow::bail!("{} name '{}' is reserved", kind, name);
    }

    Ok(())
}

/// Add or update a module alias
///
/// If the spec looks like a local path, it is canonicalized to an absolute
/// path so the alias works from any manifest directory.
pub fn add_alias(alias: &str, spec: &str) -> Result<String> {
    use super::utils;

    validate_identifier(alias, "alias")?;

    let final_spec = if utils::is_path_spec(spec) {
        utils::canonicalize_path(spec)?
            .to_string_lossy()
            .to_string()
    } else {
        spec.to_string()
    };

    let saved = final_spec.clone();
    update_config(|config| {
        config.aliases.insert(alias.to_string(), final_spec);
        Ok(())
    })?;
    Ok(saved)
}

/// Remove a module alias
///
/// Returns an error if the alias doesn't exist.
pub fn remove_alias(alias: &str) -> Result<()> {
    update_config(|config| {
        if config.aliases.remove(alias).is_none() {
            anyhow::bail!("alias '{}' not found", alias);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = MortarConfig::default();
        config
            .aliases
            .insert("echo".to_string(), "mortar/echo".to_string());
        config.log_dir = Some(temp_dir.path().join("logs"));

        let content = toml::to_string_pretty(&config).unwrap();
        fs::write(&config_path, content).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        let loaded: MortarConfig = toml::from_str(&content).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_identifier_valid_names() {
        assert!(validate_identifier("hello", "alias").is_ok());
        assert!(validate_identifier("my_cache", "alias").is_ok());
        assert!(validate_identifier("my-cache", "alias").is_ok());
        assert!(validate_identifier("ABC_123", "alias").is_ok());
    }

    #[test]
    fn test_validate_identifier_empty_name() {
        let result = validate_identifier("", "alias");
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_identifier_invalid_characters() {
        for name in ["my hello", "my.hello", "mortar/echo", "./hello", "hello!"] {
            let result = validate_identifier(name, "alias");
            assert!(
                result.is_err(),
                "Expected '{}' to be invalid, but it was accepted",
                name
            );
            assert!(
                result
                    .unwrap_err()
                    .to_string()
                    .contains("must contain only alphanumeric")
            );
        }
    }

    #[test]
    fn test_validate_identifier_reserved_names() {
        for name in RESERVED {
            let result = validate_identifier(name, "alias");
            assert!(result.unwrap_err().to_string().contains("is reserved"));
        }
    }
}
