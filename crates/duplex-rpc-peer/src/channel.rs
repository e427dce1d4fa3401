//! The message-channel contract the engine consumes.
//!
//! Transports (WebSocket, IPC, worker pipes, …) live outside this crate;
//! anything that can carry whole UTF-8 frames and report open/close can back
//! an engine by implementing [`MessageChannel`].

use async_trait::async_trait;
use thiserror::Error;

/// Events surfaced by a message channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One complete UTF-8 JSON-encoded frame.
    Message(String),
    /// The channel became transmittable.
    Open,
    /// Orderly shutdown by the peer.
    Close,
    /// Transport failure; treated like `Close` after logging.
    Error(String),
    /// The process or worker behind the channel went away.
    Exit,
}

/// Channel-level failures.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The write could not be performed right now; the engine responds by
    /// queuing the frame.
    #[error("channel not transmittable: {0}")]
    NotTransmittable(String),
    #[error("channel closed")]
    Closed,
    #[error("connect failed: {0}")]
    ConnectFailed(String),
}

/// A message-oriented connection carrying whole frames in both directions.
#[async_trait]
pub trait MessageChannel: Send + 'static {
    /// Write one frame. An error means "not currently transmittable"; the
    /// engine queues the request rather than failing it.
    async fn send(&mut self, frame: String) -> Result<(), ChannelError>;

    /// The next channel event. `None` means the event source is exhausted
    /// and is treated as [`ChannelEvent::Close`].
    ///
    /// Must be cancel-safe: the engine polls this concurrently with its
    /// command queues and drops the future whenever another source wins.
    async fn recv(&mut self) -> Option<ChannelEvent>;

    /// Orderly shutdown. Optional; the default does nothing.
    async fn close(&mut self) {}
}

pub type BoxedChannel = Box<dyn MessageChannel>;

/// Produces a fresh channel for each (re)connection attempt.
///
/// Only engines constructed with a factory ever re-connect; a plain channel
/// goes `Closed` on its first disconnect.
pub trait ChannelFactory: Send + 'static {
    fn connect(&mut self) -> Result<BoxedChannel, ChannelError>;
}

impl<F> ChannelFactory for F
where
    F: FnMut() -> BoxedChannel + Send + 'static,
{
    fn connect(&mut self) -> Result<BoxedChannel, ChannelError> {
        Ok((self)())
    }
}

/// What an engine is bound to: a concrete channel or a factory.
pub enum ChannelSource {
    Channel(BoxedChannel),
    Factory(Box<dyn ChannelFactory>),
}

impl ChannelSource {
    pub fn factory<F: ChannelFactory + 'static>(factory: F) -> Self {
        ChannelSource::Factory(Box::new(factory))
    }
}

impl<C: MessageChannel> From<C> for ChannelSource {
    fn from(channel: C) -> Self {
        ChannelSource::Channel(Box::new(channel))
    }
}

impl std::fmt::Debug for ChannelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelSource::Channel(_) => f.write_str("ChannelSource::Channel"),
            ChannelSource::Factory(_) => f.write_str("ChannelSource::Factory"),
        }
    }
}
