use std::fmt::{Debug, Formatter};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

type LogFn = dyn Fn(&[&dyn Debug]) + Send + Sync;

/// An optional, println-like diagnostic sink. Endpoints call it on every read and write
/// with `(name, error, direction, length)`.
///
/// A panicking sink is caught and logged; it never reaches the caller of the I/O operation.
/// An empty `DebugLog` costs a single `Option` check per call.
#[derive(Clone, Default)]
pub struct DebugLog {
    inner: Option<Arc<LogFn>>,
}

impl DebugLog {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[&dyn Debug]) + Send + Sync + 'static,
    {
        Self {
            inner: Some(Arc::new(f)),
        }
    }

    /// A sink that discards everything
    pub fn none() -> Self {
        Self::default()
    }

    /// A sink forwarding each call as a single `trace` event
    pub fn tracing() -> Self {
        Self::new(|args| {
            citadel_logging::trace!(target: "citadel", "{}", join_args(args));
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Logs `args` if a sink is set
    pub fn println(&self, args: &[&dyn Debug]) {
        if let Some(log) = self.inner.as_ref() {
            if std::panic::catch_unwind(AssertUnwindSafe(|| log(args))).is_err() {
                citadel_logging::warn!(target: "citadel", "Debug log sink panicked; ignoring");
            }
        }
    }
}

impl Debug for DebugLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugLog")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Renders positional arguments separated by spaces, the way `println` would
pub fn join_args(args: &[&dyn Debug]) -> String {
    args.iter()
        .map(|arg| format!("{arg:?}"))
        .collect::<Vec<_>>()
        .join(" ")
}
