//! Method resolution and chain execution over a routing tree.

use std::collections::HashMap;
use std::sync::RwLock;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::trace;

use crate::context::InvokeContext;
use crate::error::{RpcError, RpcResult};
use crate::routing::Router;

/// Dispatcher over one immutable routing tree.
///
/// Carries the per-tree resolution cache: fully-qualified dotted name →
/// (terminal node, unconsumed suffix). Entries are written once and read
/// concurrently.
pub(crate) struct Resolver {
    root: Router,
    cache: RwLock<HashMap<String, (Router, String)>>,
}

impl Resolver {
    pub fn new(root: Router) -> Self {
        Self {
            root,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Run one inbound call to completion.
    pub async fn dispatch(&self, mut cx: InvokeContext) -> RpcResult<Value> {
        let (node, remaining) = self.resolve(cx.method())?;
        cx.set_method(remaining);
        execute(node, cx).await
    }

    fn resolve(&self, method: &str) -> RpcResult<(Router, String)> {
        if let Some(hit) = self.cache.read().unwrap().get(method) {
            trace!(method, "route cache hit");
            return Ok(hit.clone());
        }

        let resolved = resolve_path(&self.root, method)?;
        self.cache
            .write()
            .unwrap()
            .entry(method.to_string())
            .or_insert_with(|| resolved.clone());
        Ok(resolved)
    }
}

/// Walk namespaces from `node`, consuming the longest matching dotted prefix
/// at each level, until a terminal node is reached.
fn resolve_path(node: &Router, method: &str) -> RpcResult<(Router, String)> {
    let mut node = node.clone();
    let mut method = method.to_string();
    while let Router::Namespace(table) = node {
        let (child, remaining) =
            match_prefix(&table, &method).ok_or_else(RpcError::method_not_found)?;
        node = child;
        method = remaining;
    }
    Ok((node, method))
}

/// The longest prefix of `method` (in segments) that literally appears as a
/// key of `table`. Longer prefixes win, so an exact full-name key always
/// beats a nested route to the same node.
fn match_prefix(
    table: &HashMap<String, Router>,
    method: &str,
) -> Option<(Router, String)> {
    let segments: Vec<&str> = method.split('.').collect();
    for take in (1..=segments.len()).rev() {
        let key = segments[..take].join(".");
        if let Some(child) = table.get(&key) {
            return Some((child.clone(), segments[take..].join(".")));
        }
    }
    None
}

/// Execute a terminal node (boxed for chain/namespace recursion).
fn execute(node: Router, cx: InvokeContext) -> BoxFuture<'static, RpcResult<Value>> {
    Box::pin(async move {
        match node {
            Router::Handler(handler) => handler.call(cx).await,
            Router::Literal(value) => Ok(value),
            ns @ Router::Namespace(_) => {
                // A namespace reached mid-chain resolves against the
                // context's current (possibly shortened) method.
                let (child, remaining) = resolve_path(&ns, cx.method())?;
                let mut cx = cx;
                cx.set_method(remaining);
                execute(child, cx).await
            }
            Router::Chain(elements) => {
                let last = elements.len().checked_sub(1);
                let mut out = Value::Null;
                for (index, element) in elements.iter().enumerate() {
                    let value = execute(element.clone(), cx.clone()).await?;
                    if Some(index) == last {
                        out = value;
                    } else if !value.is_null() {
                        return Err(RpcError::chain_contract());
                    }
                }
                Ok(out)
            }
        }
    })
}
