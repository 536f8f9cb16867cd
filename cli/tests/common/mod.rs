//! Common test utilities and fixtures
//!
//! Every command runs with `MORTAR_CONFIG_DIR` pointing at its own
//! temporary directory, so tests never see the user's aliases.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const HELLO_TABLE: &str = r#"
name = "hello"
version = "1.0.0"

[[routes]]
path = "/hello"
body = "world"
"#;

/// A workspace with a config dir and a project dir holding fixtures
pub struct Workspace {
    pub config: TempDir,
    pub project: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let workspace = Self {
            config: TempDir::new().expect("Failed to create config dir"),
            project: TempDir::new().expect("Failed to create project dir"),
        };
        workspace.write("plugins/hello.toml", HELLO_TABLE);
        workspace
    }

    /// Write `content` to `name` under the project dir.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.project.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        std::fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.project.path().join(name)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config.path().join("config.toml")
    }

    /// `mortar` running inside the project dir
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("mortar").expect("mortar binary");
        cmd.env("MORTAR_CONFIG_DIR", self.config.path())
            .env_remove("RUST_LOG")
            .current_dir(self.project.path());
        cmd
    }
}

pub fn display(path: &Path) -> String {
    path.display().to_string()
}
