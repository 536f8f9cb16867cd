//! Configuration schema for the mortar CLI
//!
//! All fields use `#[serde(default)]` so partial configs load, and are
//! skipped when empty so saved files stay small.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MortarConfig {
    /// Module aliases: short name → specifier (path, package, or alias)
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,

    /// Directory for daily-rotated log files; no file logging when unset
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl MortarConfig {
    /// Validate the configuration for common errors
    ///
    /// Returns Ok(()) if valid, or Err with a list of error messages
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for alias in self.aliases.keys() {
            if let Err(e) = self.validate_alias_chain(alias) {
                errors.push(e);
            }
        }

        if let Some(dir) = &self.log_dir
            && dir.as_os_str().is_empty()
        {
            errors.push("log_dir must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Follow `alias` to the specifier it finally names.
    ///
    /// Returns `None` for names that are not aliases, and an error naming
    /// the chain when aliases form a cycle.
    pub fn resolve_alias(&self, alias: &str) -> Result<Option<&str>, String> {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut current = alias;
        let mut resolved = None;

        while let Some(target) = self.aliases.get(current) {
            chain.push(current);
            if !visited.insert(current) {
                return Err(format!(
                    "Circular alias dependency detected: {}",
                    chain.join(" → ")
                ));
            }
            resolved = Some(target.as_str());
            current = target;
        }
        Ok(resolved)
    }

    fn validate_alias_chain(&self, alias: &str) -> Result<(), String> {
        self.resolve_alias(alias).map(|_| ())
    }
}
