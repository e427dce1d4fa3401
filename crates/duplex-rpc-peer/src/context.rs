//! Per-call invocation context.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;

use duplex_rpc_wire::RequestId;

use crate::error::{RpcError, RpcResult};
use crate::proxy::CallProxy;

/// The per-call bundle passed to every handler in a dispatch.
///
/// Clones share the parameter sequence and the outbound proxy; the `method`
/// field is per-clone, so a namespace consumed inside one chain element does
/// not alter its siblings' view.
#[derive(Clone)]
pub struct InvokeContext {
    id: RequestId,
    method: String,
    full_method: String,
    params: Arc<Mutex<Vec<Value>>>,
    invoke: CallProxy,
}

impl InvokeContext {
    pub(crate) fn new(
        id: RequestId,
        method: impl Into<String>,
        params: Vec<Value>,
        invoke: CallProxy,
    ) -> Self {
        let method = method.into();
        Self {
            id,
            full_method: method.clone(),
            method,
            params: Arc::new(Mutex::new(params)),
            invoke,
        }
    }

    /// The JSON-RPC id of the inbound request.
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// The dotted name still unconsumed after prefix matching. Empty when
    /// the route consumed the whole name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The inbound name as the peer sent it, before any prefix consumption.
    pub fn full_method(&self) -> &str {
        &self.full_method
    }

    pub(crate) fn set_method(&mut self, remaining: String) {
        self.method = remaining;
    }

    /// Snapshot of the current parameter sequence.
    pub fn params(&self) -> Vec<Value> {
        self.params.lock().unwrap().clone()
    }

    pub fn param(&self, index: usize) -> Option<Value> {
        self.params.lock().unwrap().get(index).cloned()
    }

    /// Deserialize one positional parameter; a missing or mismatched
    /// parameter is an invalid-params error.
    pub fn param_as<T: DeserializeOwned>(&self, index: usize) -> RpcResult<T> {
        let value = self.param(index).unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|_| RpcError::invalid_params())
    }

    /// Overwrite one parameter in place; later chain elements observe the
    /// new value. Grows the sequence with `null`s when `index` is past the
    /// end.
    pub fn set_param(&self, index: usize, value: Value) {
        let mut params = self.params.lock().unwrap();
        if params.len() <= index {
            params.resize(index + 1, Value::Null);
        }
        params[index] = value;
    }

    pub fn set_params(&self, values: Vec<Value>) {
        *self.params.lock().unwrap() = values;
    }

    /// The engine's outbound proxy: handlers call back into the peer with
    /// it while their own request is still being served.
    pub fn invoke(&self) -> &CallProxy {
        &self.invoke
    }
}

impl std::fmt::Debug for InvokeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeContext")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("full_method", &self.full_method)
            .field("params", &*self.params.lock().unwrap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(method: &str, params: Vec<Value>) -> InvokeContext {
        InvokeContext::new(RequestId::Number(1), method, params, CallProxy::detached())
    }

    #[test]
    fn test_clones_share_params() {
        let cx = context("a.b", vec![json!("hello")]);
        let sibling = cx.clone();

        sibling.set_param(0, json!("HELLO"));
        assert_eq!(cx.param(0), Some(json!("HELLO")));
    }

    #[test]
    fn test_method_is_per_clone() {
        let cx = context("a.b", Vec::new());
        let mut descended = cx.clone();
        descended.set_method("b".to_string());

        assert_eq!(cx.method(), "a.b");
        assert_eq!(descended.method(), "b");
        assert_eq!(descended.full_method(), "a.b");
    }

    #[test]
    fn test_set_param_grows() {
        let cx = context("m", Vec::new());
        cx.set_param(2, json!(true));
        assert_eq!(cx.params(), vec![json!(null), json!(null), json!(true)]);
    }

    #[test]
    fn test_param_as() {
        let cx = context("m", vec![json!(5)]);
        assert_eq!(cx.param_as::<i64>(0).unwrap(), 5);
        let err = cx.param_as::<String>(0).unwrap_err();
        assert_eq!(err.code, -32602);
        // Missing parameters read as null.
        assert_eq!(cx.param_as::<Option<bool>>(1).unwrap(), None);
    }
}
