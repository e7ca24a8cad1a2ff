//! Trace-context propagation for tool calls.
//!
//! Tool servers and tool clients in Crosstalk exchange W3C trace headers
//! through the reserved `_meta` entry of a tool call's arguments object, so
//! that work done inside a tool shows up under the caller's trace. This
//! crate owns both directions of that exchange:
//!
//! - inbound: [`extract_context`] turns a received `_meta` object into an
//!   [`opentelemetry::Context`], falling back to the ambient context when
//!   nothing usable is present, and [`in_extracted_scope`] /
//!   [`MetaContextExt::with_meta_context`] run a unit of work with that
//!   context attached;
//! - outbound: [`Traced`] wraps any [`crosstalk_types::ToolClient`] and
//!   injects the current context into `_meta` on every call.
//!
//! Propagation is best effort by construction. Nothing here returns an
//! error: absent, empty, or malformed metadata degrades to the ambient
//! context, and errors from wrapped work pass through untouched.

pub mod propagation;
pub mod scope;

mod client;

pub use client::Traced;
pub use propagation::{
    extract_context, init_tracing, inject_context, inject_into_meta, install_propagator,
    BAGGAGE_KEY, CARRIER_KEYS, TRACEPARENT_KEY, TRACESTATE_KEY,
};
pub use scope::{in_extracted_scope, MetaContextExt};
