//! Carrier encoding between `_meta` objects and OpenTelemetry contexts.
//!
//! The carrier format is the W3C one: `traceparent`, `tracestate`, and
//! `baggage` string entries. Inside a `_meta` object only those three keys
//! belong to this module; everything else in the object is caller data and
//! is left alone.

use std::collections::HashMap;

use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{global, Context};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use serde_json::Value;

use crosstalk_types::Meta;

/// W3C trace parent header key.
pub const TRACEPARENT_KEY: &str = "traceparent";
/// W3C trace state header key.
pub const TRACESTATE_KEY: &str = "tracestate";
/// W3C baggage header key.
pub const BAGGAGE_KEY: &str = "baggage";

/// The `_meta` keys reserved for trace propagation, in carrier order.
pub const CARRIER_KEYS: [&str; 3] = [TRACEPARENT_KEY, TRACESTATE_KEY, BAGGAGE_KEY];

/// Installs the process-wide text-map propagator used by both directions of
/// the `_meta` exchange: W3C trace context composed with W3C baggage.
///
/// Binaries call this once at startup. Libraries never install globals.
pub fn install_propagator() {
    let composite = TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]);
    global::set_text_map_propagator(composite);
}

/// Builds a tracer provider tagged with `service_name`, installs it as the
/// global provider, and returns it so the caller can shut it down on exit.
pub fn init_tracing(service_name: &str) -> SdkTracerProvider {
    let resource = Resource::builder()
        .with_service_name(service_name.to_owned())
        .build();
    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .build();
    global::set_tracer_provider(provider.clone());
    provider
}

/// Recovers the trace context carried by a tool call's `_meta` object.
///
/// Only the reserved carrier keys with string values are considered. When
/// `meta` is absent, empty, or carries no usable entry, the ambient current
/// context is returned unchanged. This function never fails; malformed
/// header values are the propagator's concern and degrade to the ambient
/// context as well.
pub fn extract_context(meta: Option<&Meta>) -> Context {
    let Some(meta) = meta else {
        return Context::current();
    };
    if meta.is_empty() {
        return Context::current();
    }

    let mut carrier: HashMap<String, String> = HashMap::new();
    for key in CARRIER_KEYS {
        if let Some(Value::String(value)) = meta.get(key) {
            carrier.insert(key.to_string(), value.clone());
        }
    }
    if carrier.is_empty() {
        return Context::current();
    }

    global::get_text_map_propagator(|propagator| propagator.extract(&carrier))
}

/// Serializes the ambient current context into a fresh `_meta` object.
///
/// The result holds between zero and three entries depending on what the
/// current context carries. A pure read: the ambient slot is not touched.
pub fn inject_context() -> Meta {
    let mut meta = Meta::new();
    inject_into_meta(&mut meta);
    meta
}

/// Writes the ambient current context into an existing `_meta` object.
///
/// The reserved carrier keys are replaced wholesale so stale headers never
/// outlive the context that produced them. All other entries in `meta` are
/// preserved.
pub fn inject_into_meta(meta: &mut Meta) {
    for key in CARRIER_KEYS {
        meta.remove(key);
    }

    let mut carrier: HashMap<String, String> = HashMap::new();
    global::get_text_map_propagator(|propagator| propagator.inject(&mut carrier));
    for (key, value) in carrier {
        meta.insert(key, Value::String(value));
    }
}
