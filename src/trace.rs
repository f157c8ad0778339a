//! Conditional tracing macros.
//!
//! With the `tracing` feature enabled these forward to the `tracing` crate;
//! without it they compile away and only evaluate their field expressions.

/// Opens an info-level span around a pipeline stage.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Emits a debug-level event carrying stage measurements.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::debug!(name: $name, $($key = $value),+)
    };
    ($name:expr) => {
        tracing::debug!(name: $name)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($(&$value,)+);
    };
    ($name:expr) => {};
}

/// Emits a warn-level event for a skipped item.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::warn!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($(&$value,)+);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_span;
pub(crate) use trace_warn;

/// Guard returned by `trace_span!` when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Mirrors `Span::entered()`.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
