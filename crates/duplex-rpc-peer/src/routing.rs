//! The routing tree: what an engine serves to its peer.
//!
//! A tree is built once, handed to the engine through
//! [`EngineConfig`](crate::config::EngineConfig), and never mutated
//! afterwards. Nodes are cheap to clone; handlers and namespaces sit behind
//! `Arc`s so one tree can serve many concurrent dispatches.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::InvokeContext;
use crate::error::RpcResult;

/// A terminal method implementation.
///
/// Implemented for any `Fn(InvokeContext) -> impl Future<Output =
/// RpcResult<Value>>`, so plain async closures routed with
/// [`NamespaceBuilder::handler`] are the common case.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn call(&self, cx: InvokeContext) -> RpcResult<Value>;
}

#[async_trait]
impl<F, Fut> MethodHandler for F
where
    F: Fn(InvokeContext) -> Fut + Send + Sync,
    Fut: Future<Output = RpcResult<Value>> + Send + 'static,
{
    async fn call(&self, cx: InvokeContext) -> RpcResult<Value> {
        (self)(cx).await
    }
}

/// One node of the routing tree.
#[derive(Clone)]
pub enum Router {
    /// Terminal callable.
    Handler(Arc<dyn MethodHandler>),
    /// Middleware pipeline run in order over one shared context; only the
    /// last element may return a value.
    Chain(Arc<[Router]>),
    /// Table from name segment to subtree. Keys may themselves contain dots
    /// ("user.special"), and the longest matching prefix wins.
    Namespace(Arc<HashMap<String, Router>>),
    /// Constant resolved as a handler returning the stored value.
    Literal(Value),
}

impl Router {
    /// A namespace with no routes; every inbound call answers `-32601`.
    pub fn empty() -> Self {
        Router::Namespace(Arc::new(HashMap::new()))
    }

    pub fn handler<H: MethodHandler + 'static>(handler: H) -> Self {
        Router::Handler(Arc::new(handler))
    }

    pub fn chain<I: IntoIterator<Item = Router>>(elements: I) -> Self {
        Router::Chain(elements.into_iter().collect())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Router::Literal(value.into())
    }

    pub fn namespace() -> NamespaceBuilder {
        NamespaceBuilder::new()
    }
}

impl Default for Router {
    fn default() -> Self {
        Router::empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Router::Handler(_) => f.write_str("Handler"),
            Router::Chain(elements) => f.debug_tuple("Chain").field(&elements.len()).finish(),
            Router::Namespace(table) => {
                let mut keys: Vec<&str> = table.keys().map(String::as_str).collect();
                keys.sort_unstable();
                f.debug_tuple("Namespace").field(&keys).finish()
            }
            Router::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
        }
    }
}

/// Builder for [`Router::Namespace`] nodes.
#[derive(Default)]
pub struct NamespaceBuilder {
    entries: HashMap<String, Router>,
}

impl NamespaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount any node under `name`.
    pub fn route(mut self, name: impl Into<String>, node: Router) -> Self {
        self.entries.insert(name.into(), node);
        self
    }

    pub fn handler<H: MethodHandler + 'static>(self, name: impl Into<String>, handler: H) -> Self {
        self.route(name, Router::handler(handler))
    }

    pub fn chain<I: IntoIterator<Item = Router>>(self, name: impl Into<String>, elements: I) -> Self {
        self.route(name, Router::chain(elements))
    }

    pub fn literal(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.route(name, Router::literal(value))
    }

    pub fn namespace(self, name: impl Into<String>, builder: NamespaceBuilder) -> Self {
        self.route(name, builder.finish())
    }

    pub fn finish(self) -> Router {
        Router::Namespace(Arc::new(self.entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_shapes() {
        let router = Router::namespace()
            .handler("echo", |cx: InvokeContext| async move { Ok(json!(cx.params())) })
            .literal("version", "1.0")
            .chain("wrapped", [Router::literal(json!(null)), Router::literal(42)])
            .namespace("nested", Router::namespace().literal("leaf", true))
            .finish();

        let Router::Namespace(table) = &router else {
            panic!("expected namespace");
        };
        assert_eq!(table.len(), 4);
        assert!(matches!(table["echo"], Router::Handler(_)));
        assert!(matches!(table["version"], Router::Literal(_)));
        assert!(matches!(&table["wrapped"], Router::Chain(c) if c.len() == 2));
        assert!(matches!(table["nested"], Router::Namespace(_)));
    }

    #[test]
    fn test_empty_router_debug() {
        assert_eq!(format!("{:?}", Router::empty()), "Namespace([])");
    }

    #[test]
    fn test_clone_shares_structure() {
        let router = Router::namespace().literal("a", 1).finish();
        let clone = router.clone();
        let (Router::Namespace(left), Router::Namespace(right)) = (&router, &clone) else {
            panic!("expected namespaces");
        };
        assert!(Arc::ptr_eq(left, right));
    }
}
