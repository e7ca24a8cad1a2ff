//! Outbound `_meta` injection for tool clients.

use async_trait::async_trait;
use serde_json::Value;

use crosstalk_types::{Meta, ToolClient, ToolDescriptor, ToolError, ToolResult, META_KEY};

use crate::propagation::inject_into_meta;

/// A [`ToolClient`] decorator that stamps the current trace context into
/// every outbound call.
///
/// `call_tool` always hands the inner client an arguments object: callers
/// passing `None` get an empty one materialized for them. Inside it, the
/// `_meta` entry's reserved carrier keys are rewritten from the ambient
/// context at call time; any other `_meta` entries the caller supplied are
/// kept. Results and errors from the inner client pass through unchanged.
///
/// The decoration is per instance. Dropping the wrapper leaves nothing
/// behind.
pub struct Traced<C> {
    inner: C,
}

impl<C> Traced<C> {
    /// Wraps `inner` so its outbound calls carry the current trace context.
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// A reference to the wrapped client, for lifecycle calls that are not
    /// part of the [`ToolClient`] contract.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Returns the wrapped client.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait]
impl<C: ToolClient> ToolClient for Traced<C> {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        self.inner.list_tools().await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Meta>,
    ) -> Result<ToolResult, ToolError> {
        let mut arguments = arguments.unwrap_or_default();
        let mut meta = match arguments.remove(META_KEY) {
            Some(Value::Object(existing)) => existing,
            // A non-object `_meta` is malformed; start fresh.
            _ => Meta::new(),
        };
        inject_into_meta(&mut meta);
        arguments.insert(META_KEY.to_string(), Value::Object(meta));
        self.inner.call_tool(name, Some(arguments)).await
    }
}
