//! Specifier resolution against a base directory
//!
//! Manifests name modules with plain strings. Three forms are accepted:
//!
//! 1. **Relative paths** (`./plugin`, `../shared/cache`, anything with a
//!    leading `.`), joined to a base directory.
//! 2. **Absolute paths** (`/srv/app/plugin`), used as-is.
//! 3. **Package names** (`mortar/memory`, `acme-auth`), used as-is and
//!    looked up by the module source.
//!
//! Only the first form depends on a base. The base is the caller's
//! `relative_to` when given, otherwise the resolver's fallback directory.
//!
//! ```text
//! ./pluginA  + /app   → /app/pluginA
//! ../cache   + /app/x → /app/cache
//! /abs/mod   + /app   → /abs/mod
//! acme-auth  + /app   → acme-auth
//! ```
//!
//! Joining is purely lexical: no file system access, symlinks are not
//! followed, and the function cannot fail.

use std::path::{Component, Path, PathBuf};

/// Whether a specifier must be joined to a base directory before lookup.
pub fn is_relative_spec(spec: &str) -> bool {
    spec.starts_with('.')
}

/// Join `spec` onto `base`, collapsing `.` and `..` segments.
pub fn join_spec(base: &Path, spec: &str) -> PathBuf {
    normalize(&base.join(spec))
}

/// Collapse `.` and `..` segments without touching the file system.
///
/// `..` at the root stays at the root; leading `..` on a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Resolves manifest specifiers against a base directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    fallback: PathBuf,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver {
    /// Resolver whose fallback base is the current working directory.
    pub fn new() -> Self {
        let fallback = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { fallback }
    }

    pub fn with_fallback(fallback: impl Into<PathBuf>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    pub fn fallback(&self) -> &Path {
        &self.fallback
    }

    /// Resolve `spec` against `base`, or against the fallback when `base` is `None`.
    ///
    /// Non-relative specifiers come back unchanged.
    pub fn resolve(&self, spec: &str, base: Option<&Path>) -> String {
        if !is_relative_spec(spec) {
            return spec.to_string();
        }

        let base = base.unwrap_or(&self.fallback);
        let joined = join_spec(base, spec);
        let rendered = joined.to_string_lossy().into_owned();

        // A relative fallback can collapse `./x` to `x`, which would read as a package name.
        if joined.is_relative() && !rendered.starts_with('.') {
            format!("./{}", rendered)
        } else {
            rendered
        }
    }
}
