//! # duplex-rpc-peer
//!
//! A lightweight, transport-agnostic, bi-directional JSON-RPC 2.0 engine.
//! One engine instance, bound to one message-oriented channel, acts as
//! client and server at the same time: outbound calls go through a
//! [`CallProxy`], inbound calls route through a [`Router`] of handlers, and
//! handlers can call back into the peer mid-request through their
//! [`InvokeContext`].
//!
//! ```no_run
//! use duplex_rpc_peer::{open, params, serve, EngineConfig, InvokeContext, Router};
//! use duplex_rpc_peer::testing::MemoryChannel;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (near, far) = MemoryChannel::pair();
//!
//!     // Server side: a routing tree of async handlers.
//!     let router = Router::namespace()
//!         .handler("math.add", |cx: InvokeContext| async move {
//!             let a = cx.param_as::<i64>(0)?;
//!             let b = cx.param_as::<i64>(1)?;
//!             Ok(json!(a + b))
//!         })
//!         .finish();
//!     let _server = serve(router, EngineConfig::default()).accept(far);
//!
//!     // Client side: call any dotted path, no pre-registration.
//!     let client = open(near, EngineConfig::default());
//!     let sum = client.path("math").path("add").call(params![1, 2]).await?;
//!     assert_eq!(sum, json!(3));
//!     Ok(())
//! }
//! ```
//!
//! Transports are out of scope: anything implementing
//! [`MessageChannel`](channel::MessageChannel) can back an engine, and a
//! [`ChannelFactory`](channel::ChannelFactory) source makes the engine
//! re-connect with capped retries after a disconnect.

pub mod channel;
pub mod config;
pub mod context;
pub mod error;
mod peer;
pub mod proxy;
mod resolve;
pub mod routing;
pub mod state;
pub mod testing;

pub use channel::{
    BoxedChannel, ChannelError, ChannelEvent, ChannelFactory, ChannelSource, MessageChannel,
};
pub use config::EngineConfig;
pub use context::InvokeContext;
pub use error::{RpcError, RpcResult};
pub use proxy::CallProxy;
pub use routing::{MethodHandler, NamespaceBuilder, Router};
pub use state::ConnectionState;

// The wire layer, re-exported for adapters and tests that speak raw frames.
pub use duplex_rpc_wire as wire;
pub use duplex_rpc_wire::{ErrorKind, ErrorObject};

#[doc(hidden)]
pub use serde_json;

/// Construct an engine bound to a channel (or channel factory) and return
/// its outbound proxy.
///
/// Must be called within a tokio runtime; the engine runs as a spawned
/// task. It keeps serving while its channel lives and winds down once the
/// connection is closed, every pending call has resolved, and every
/// caller-facing proxy is gone.
pub fn open(source: impl Into<ChannelSource>, config: EngineConfig) -> CallProxy {
    peer::Engine::spawn(source.into(), config)
}

/// The serving side of [`serve`]: builds one engine per accepted channel.
#[derive(Debug)]
pub struct Acceptor {
    router: Router,
    config: EngineConfig,
}

impl Acceptor {
    pub fn new(router: Router, config: EngineConfig) -> Self {
        Self { router, config }
    }

    /// Bind an engine to an already-open inbound channel.
    ///
    /// The returned proxy is the server's own outbound side toward that
    /// peer; it can be dropped if the server never originates calls, the
    /// engine keeps serving until the channel closes.
    pub fn accept(&self, channel: impl MessageChannel) -> CallProxy {
        let config = self
            .config
            .clone()
            .with_router(self.router.clone())
            .opened(true);
        open(channel, config)
    }
}

/// Convenience for the server role: fix a routing tree once, then
/// [`Acceptor::accept`] each connection a transport hands over.
pub fn serve(router: Router, config: EngineConfig) -> Acceptor {
    Acceptor::new(router, config)
}

/// Build a `Vec<serde_json::Value>` parameter list from serializable
/// expressions.
///
/// ```
/// use duplex_rpc_peer::params;
/// let p = params!["hello", 7, true];
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::serde_json::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::serde_json::json!($value)),+]
    };
}
