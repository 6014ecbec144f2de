//! Conditional tracing macros (zero-cost when the feature is disabled).
//!
//! With the `tracing` feature these forward to `tracing` at debug level, since
//! prior generation, decode and suppression run once per frame. Without the
//! feature they compile to nothing and the crate carries no logging dependency.

/// Create a debug-level span around a pipeline stage.
///
/// When the `tracing` feature is enabled, this creates a `tracing::debug_span!`.
/// When disabled, it compiles to a no-op that returns a dummy guard.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::debug_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Emit a debug-level event with per-stage counts.
///
/// When the `tracing` feature is enabled, this calls `tracing::debug!`.
/// When disabled, the values are evaluated and discarded so callers see no
/// unused warnings.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::debug!(name: $name, $($key = $value),+)
    };
    ($name:expr) => {
        tracing::debug!(name: $name, "{}", $name)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
    ($name:expr) => {};
}

pub(crate) use trace_event;
pub(crate) use trace_span;

/// A no-op span guard used when tracing is disabled.
///
/// Lets call sites write `let _span = trace_span!(...).entered();` without
/// conditional compilation.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Returns self, mimicking `Span::entered()`.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn macros_expand_in_every_form() {
        let _span = trace_span!("stage", count = 3usize).entered();
        let _bare = trace_span!("bare").entered();
        trace_event!("stage_done", count = 3usize, kept = 1usize);
        trace_event!("marker");
    }
}
