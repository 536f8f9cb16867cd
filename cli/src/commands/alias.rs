//! `mortar alias`: manage module aliases in the user config

use anyhow::{Context, Result};

use crate::config::{self, MortarConfig};

pub fn add(alias: &str, spec: &str) -> Result<()> {
    let saved = config::add_alias(alias, spec).context("Failed to add alias")?;
    println!("✅ Added alias: {} → {}", alias, saved);
    Ok(())
}

pub fn remove(alias: &str) -> Result<()> {
    config::remove_alias(alias).context("Failed to remove alias")?;
    println!("✅ Removed alias: {}", alias);
    Ok(())
}

pub fn list() -> Result<()> {
    let cfg = config::load_config().context("Failed to load config")?;
    print!("{}", render_list(&cfg));
    Ok(())
}

/// Alias listing, or the empty-state hint
fn render_list(cfg: &MortarConfig) -> String {
    if cfg.aliases.is_empty() {
        return [
            "No aliases registered.",
            "",
            "To register aliases, use:",
            "  # A route table next to you:",
            "  mortar alias add hello ./plugins/hello.toml",
            "",
            "  # A built-in module:",
            "  mortar alias add stats mortar/status",
            "",
        ]
        .join("\n");
    }

    let mut out = String::from("Aliases:\n");
    // BTreeMap iterates in name order
    for (alias, spec) in &cfg.aliases {
        out.push_str(&format!("  {} → {}\n", alias, spec));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_list() {
        let rendered = render_list(&MortarConfig::default());
        assert!(rendered.starts_with("No aliases registered."));
        assert!(rendered.contains("mortar alias add"));
    }

    #[test]
    fn test_render_list_sorted() {
        let mut cfg = MortarConfig::default();
        cfg.aliases.insert("stats".to_string(), "mortar/status".to_string());
        cfg.aliases.insert("hello".to_string(), "/srv/hello.toml".to_string());

        let rendered = render_list(&cfg);
        assert_eq!(
            rendered,
            "Aliases:\n  hello → /srv/hello.toml\n  stats → mortar/status\n"
        );
    }
}
