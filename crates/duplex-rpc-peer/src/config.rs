//! Engine configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::routing::Router;
use crate::state::ConnectionState;

/// Observer invoked on every connection-state transition.
pub type StateObserver = Arc<dyn Fn(ConnectionState, ConnectionState) + Send + Sync>;

/// Configuration for one peer engine, immutable once the engine is running.
#[derive(Clone)]
pub struct EngineConfig {
    /// Per-call deadline.
    pub timeout: Duration,
    /// Reconnection attempts before the engine goes `Closed`.
    pub max_retries: u32,
    /// Delay between a disconnect and the next connection attempt.
    pub retry_delay: Duration,
    /// Whether the supplied channel is already open (no `Open` event will
    /// arrive).
    pub opened: bool,
    /// Routing tree for inbound dispatch. An empty tree answers every
    /// inbound call with `-32601`.
    pub router: Router,
    /// Optional state-transition observer.
    pub on_state_change: Option<StateObserver>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            max_retries: 3,
            retry_delay: Duration::from_millis(1_000),
            opened: false,
            router: Router::empty(),
            on_state_change: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn opened(mut self, opened: bool) -> Self {
        self.opened = opened;
        self
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    pub fn on_state_change<F>(mut self, observer: F) -> Self
    where
        F: Fn(ConnectionState, ConnectionState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(observer));
        self
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("opened", &self.opened)
            .field("router", &self.router)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}
