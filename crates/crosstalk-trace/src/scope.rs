//! Scoped activation of extracted contexts.
//!
//! Both entry points follow the same discipline: extract once per
//! invocation, attach before the unit of work runs, release on every exit
//! path. The unit's calling convention is untouched; values and errors
//! pass through unchanged.

use opentelemetry::trace::{FutureExt, WithContext};

use crosstalk_types::Meta;

use crate::propagation::extract_context;

/// Runs a synchronous unit of work with the context extracted from `meta`
/// attached as the ambient current context.
///
/// The previous context is restored when the closure returns, unwinds, or
/// exits early. Returns whatever the closure returns.
pub fn in_extracted_scope<T>(meta: Option<&Meta>, work: impl FnOnce() -> T) -> T {
    let cx = extract_context(meta);
    let _guard = cx.attach();
    work()
}

/// Attaches a `_meta`-extracted context to a future.
pub trait MetaContextExt: Sized {
    /// Extracts the context carried by `meta` now and attaches it around
    /// every poll of `self`.
    ///
    /// Attaching per poll keeps overlapping invocations on the same thread
    /// isolated from one another, and guarantees the ambient slot is
    /// restored whether the future completes, fails, or is dropped
    /// mid-flight.
    fn with_meta_context(self, meta: Option<&Meta>) -> WithContext<Self>;
}

impl<T: Sized> MetaContextExt for T {
    fn with_meta_context(self, meta: Option<&Meta>) -> WithContext<Self> {
        self.with_context(extract_context(meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::{install_propagator, TRACEPARENT_KEY};
    use opentelemetry::trace::TraceContextExt;
    use opentelemetry::Context;
    use serde_json::json;

    fn meta_with_traceparent(traceparent: &str) -> Meta {
        let mut meta = Meta::new();
        meta.insert(TRACEPARENT_KEY.to_string(), json!(traceparent));
        meta
    }

    #[test]
    fn sync_scope_attaches_and_restores() {
        install_propagator();
        let meta =
            meta_with_traceparent("00-11111111111111111111111111111111-2222222222222222-01");

        let before = Context::current().span().span_context().trace_id();
        let seen = in_extracted_scope(Some(&meta), || {
            Context::current().span().span_context().trace_id().to_string()
        });
        assert_eq!(seen, "11111111111111111111111111111111");
        assert_eq!(Context::current().span().span_context().trace_id(), before);
    }

    #[test]
    fn sync_scope_passes_results_through() {
        install_propagator();
        let meta =
            meta_with_traceparent("00-11111111111111111111111111111111-2222222222222222-01");

        let ok: Result<u32, String> = in_extracted_scope(Some(&meta), || Ok(7));
        assert_eq!(ok, Ok(7));

        let err: Result<u32, String> =
            in_extracted_scope(Some(&meta), || Err("boom".to_string()));
        assert_eq!(err, Err("boom".to_string()));
    }
}
