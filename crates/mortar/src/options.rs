use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::BoxError;

type HookFn<S> = dyn Fn(&S) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync;

/// Hook run with the constructed server before any plugin is registered.
pub enum PreRegister<S> {
    /// No hook configured
    Absent,
    /// Explicitly switched off; behaves like `Absent`
    Disabled,
    Hook(Arc<HookFn<S>>),
}

impl<S> PreRegister<S> {
    /// An asynchronous hook. The returned future must own what it uses,
    /// so clone the server handle into it when it needs the server.
    pub fn hook<F, Fut>(hook: F) -> Self
    where
        F: Fn(&S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        PreRegister::Hook(Arc::new(
            move |server: &S| -> BoxFuture<'static, Result<(), BoxError>> { Box::pin(hook(server)) },
        ))
    }

    /// A synchronous hook, run to completion before registration starts.
    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn(&S) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        PreRegister::Hook(Arc::new(
            move |server: &S| -> BoxFuture<'static, Result<(), BoxError>> {
                let result = hook(server);
                Box::pin(async move { result })
            },
        ))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, PreRegister::Hook(_))
    }

    pub(crate) async fn run(&self, server: &S) -> Result<(), BoxError> {
        match self {
            PreRegister::Hook(hook) => hook(server).await,
            PreRegister::Absent | PreRegister::Disabled => Ok(()),
        }
    }
}

impl<S> Default for PreRegister<S> {
    fn default() -> Self {
        PreRegister::Absent
    }
}

impl<S> Clone for PreRegister<S> {
    fn clone(&self) -> Self {
        match self {
            PreRegister::Absent => PreRegister::Absent,
            PreRegister::Disabled => PreRegister::Disabled,
            PreRegister::Hook(hook) => PreRegister::Hook(hook.clone()),
        }
    }
}

impl<S> fmt::Debug for PreRegister<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreRegister::Absent => f.write_str("Absent"),
            PreRegister::Disabled => f.write_str("Disabled"),
            PreRegister::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

/// Per-call options for `compose`.
pub struct ComposeOptions<S> {
    /// Base directory for relative specifiers
    pub relative_to: Option<PathBuf>,
    pub pre_register: PreRegister<S>,
}

impl<S> ComposeOptions<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relative_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.relative_to = Some(dir.into());
        self
    }

    pub fn pre_register(mut self, pre_register: PreRegister<S>) -> Self {
        self.pre_register = pre_register;
        self
    }

    /// Validate the options
    ///
    /// Returns Ok(()) if valid, or Err with a list of error messages
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(dir) = &self.relative_to
            && dir.as_os_str().is_empty()
        {
            errors.push("relative_to: must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl<S> Default for ComposeOptions<S> {
    fn default() -> Self {
        Self {
            relative_to: None,
            pre_register: PreRegister::Absent,
        }
    }
}

impl<S> Clone for ComposeOptions<S> {
    fn clone(&self) -> Self {
        Self {
            relative_to: self.relative_to.clone(),
            pre_register: self.pre_register.clone(),
        }
    }
}

impl<S> fmt::Debug for ComposeOptions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposeOptions")
            .field("relative_to", &self.relative_to)
            .field("pre_register", &self.pre_register)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_relative_to_is_rejected() {
        let options = ComposeOptions::<()>::new().relative_to("");
        let errors = options.validate().unwrap_err();
        assert_eq!(errors, vec!["relative_to: must not be empty".to_string()]);

        assert!(ComposeOptions::<()>::new().validate().is_ok());
        assert!(ComposeOptions::<()>::new().relative_to("/app").validate().is_ok());
    }

    #[test]
    fn test_disabled_is_distinct_from_absent() {
        let absent = PreRegister::<()>::default();
        let disabled = PreRegister::<()>::Disabled;
        assert!(matches!(absent, PreRegister::Absent));
        assert!(matches!(disabled, PreRegister::Disabled));
        assert!(!absent.is_enabled());
        assert!(!disabled.is_enabled());
    }

    #[tokio::test]
    async fn test_sync_and_async_hooks_run() {
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let sync = PreRegister::<u16>::sync(move |port| {
            counter.fetch_add(usize::from(*port), Ordering::SeqCst);
            Ok(())
        });

        let counter = calls.clone();
        let hook = PreRegister::<u16>::hook(move |port| {
            let counter = counter.clone();
            let port = *port;
            async move {
                tokio::task::yield_now().await;
                counter.fetch_add(usize::from(port), Ordering::SeqCst);
                Ok::<(), BoxError>(())
            }
        });

        sync.run(&1).await.unwrap();
        hook.run(&10).await.unwrap();
        PreRegister::<u16>::Disabled.run(&100).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_hook_error_is_returned() {
        let hook = PreRegister::<()>::sync(|_| Err("failed".into()));
        let err = hook.run(&()).await.unwrap_err();
        assert_eq!(err.to_string(), "failed");
    }
}
