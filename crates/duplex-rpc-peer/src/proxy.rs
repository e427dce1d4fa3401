//! The user-facing call surface.
//!
//! A [`CallProxy`] is a path chain: `proxy.path("user").path("get")` names
//! `user.get` without any pre-registration, and `call(params)` issues the
//! outbound request. Children are materialized lazily and cached, so
//! repeated traversal of the same path hands back the same proxy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};

use duplex_rpc_wire::Request;

use crate::error::{RpcError, RpcResult};
use crate::state::ConnectionState;

/// One outbound call handed to the engine task.
pub(crate) struct OutboundCall {
    pub request: Request,
    pub completion: oneshot::Sender<RpcResult<Value>>,
}

/// Caller-to-engine commands.
pub(crate) enum Command {
    Call(OutboundCall),
    Close,
}

/// Shared handle to one engine task.
///
/// Two handles exist per engine: one behind every caller-facing proxy, one
/// behind the loopback proxy handlers see as `invoke`. They share the id
/// counter (ids stay unique per engine) but use separate command pipes, so
/// the engine can tell when the last caller-facing proxy is gone.
pub(crate) struct EngineHandle {
    pub commands: mpsc::UnboundedSender<Command>,
    pub state: watch::Receiver<ConnectionState>,
    next_id: Arc<AtomicI64>,
}

impl EngineHandle {
    pub fn new(
        commands: mpsc::UnboundedSender<Command>,
        state: watch::Receiver<ConnectionState>,
        next_id: Arc<AtomicI64>,
    ) -> Self {
        Self {
            commands,
            state,
            next_id,
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Callable-and-traversable handle onto the engine's outbound side.
#[derive(Clone)]
pub struct CallProxy {
    inner: Arc<ProxyInner>,
}

struct ProxyInner {
    path: String,
    engine: Arc<EngineHandle>,
    children: Mutex<HashMap<String, CallProxy>>,
}

impl CallProxy {
    pub(crate) fn root(engine: Arc<EngineHandle>) -> Self {
        Self::at(String::new(), engine)
    }

    fn at(path: String, engine: Arc<EngineHandle>) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                path,
                engine,
                children: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The child proxy one segment deeper, materialized on first access and
    /// cached thereafter.
    pub fn path(&self, segment: &str) -> CallProxy {
        let mut children = self.inner.children.lock().unwrap();
        children
            .entry(segment.to_string())
            .or_insert_with(|| {
                Self::at(
                    join(&self.inner.path, segment),
                    self.inner.engine.clone(),
                )
            })
            .clone()
    }

    /// The dotted method name this proxy calls. Empty for the root.
    pub fn method(&self) -> &str {
        &self.inner.path
    }

    /// Current connection state of the engine behind this proxy.
    pub fn state(&self) -> ConnectionState {
        *self.inner.engine.state.borrow()
    }

    /// Issue the call this proxy points at.
    ///
    /// Calling the root proxy sends the empty method name; peers answer
    /// `-32601` unless they expose an empty-name route.
    pub async fn call(&self, params: Vec<Value>) -> RpcResult<Value> {
        self.call_path(self.inner.path.clone(), params).await
    }

    /// `call` with the result deserialized into `R`.
    pub async fn call_as<R: DeserializeOwned>(&self, params: Vec<Value>) -> RpcResult<R> {
        let value = self.call(params).await?;
        serde_json::from_value(value)
            .map_err(|e| RpcError::internal(format!("result deserialization failed: {}", e)))
    }

    /// Join a dotted `method` onto this proxy's path and call it, without
    /// materializing intermediate children.
    pub async fn invoke(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        self.call_path(join(&self.inner.path, method), params).await
    }

    /// Ask the engine to shut down. In-flight calls fail with `-32000`;
    /// queued calls run out their timeouts.
    pub fn close(&self) {
        let _ = self.inner.engine.commands.send(Command::Close);
    }

    async fn call_path(&self, method: String, params: Vec<Value>) -> RpcResult<Value> {
        let engine = &self.inner.engine;
        let request = Request::new(engine.next_id(), method, params);

        let (completion, completed) = oneshot::channel();
        engine
            .commands
            .send(Command::Call(OutboundCall {
                request,
                completion,
            }))
            .map_err(|_| RpcError::disconnected())?;

        // The engine resolves every registered call exactly once; a dropped
        // sender means the engine task itself is gone.
        completed.await.map_err(|_| RpcError::disconnected())?
    }

    /// A proxy with no engine behind it; calls fail as disconnected.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (commands, _) = mpsc::unbounded_channel();
        let (_state_tx, state) = watch::channel(ConnectionState::Init);
        Self::root(Arc::new(EngineHandle::new(
            commands,
            state,
            Arc::new(AtomicI64::new(0)),
        )))
    }
}

impl std::fmt::Debug for CallProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallProxy")
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .finish()
    }
}

fn join(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else if segment.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, segment)
    }
}
