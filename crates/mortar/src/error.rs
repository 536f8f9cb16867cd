use thiserror::Error;

/// Error type returned by plugin, hook and module initialisation code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ComposeError {
    /// Options or manifest failed shape checks. Raised before any side effect.
    #[error("{context}: {}", errors.join("; "))]
    Validation {
        context: &'static str,
        errors: Vec<String>,
    },

    /// A declared specifier could not be located by the module source.
    #[error("could not resolve a module at '{specifier}'")]
    Resolution { specifier: String },

    /// The module was located but its own initialisation failed.
    #[error(transparent)]
    Module(BoxError),

    /// The value extracted from a module is not usable in the slot that named it.
    #[error("module at '{specifier}' does not export a {expected}")]
    InvalidExport {
        specifier: String,
        expected: &'static str,
    },

    /// The server factory rejected the construction options.
    #[error(transparent)]
    Server(BoxError),

    /// The pre-register hook failed.
    #[error(transparent)]
    Hook(BoxError),

    /// The framework's batch registration failed.
    #[error(transparent)]
    Registration(BoxError),
}

impl ComposeError {
    pub(crate) fn invalid_options(errors: Vec<String>) -> Self {
        Self::Validation {
            context: "Invalid options",
            errors,
        }
    }

    pub(crate) fn invalid_manifest(errors: Vec<String>) -> Self {
        Self::Validation {
            context: "Invalid manifest",
            errors,
        }
    }

    /// Recover the caller-visible error of a pass-through variant.
    ///
    /// Returns `Err(self)` for errors raised by the composer itself.
    pub fn into_inner(self) -> Result<BoxError, Self> {
        match self {
            Self::Module(e) | Self::Server(e) | Self::Hook(e) | Self::Registration(e) => Ok(e),
            other => Err(other),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }
}
