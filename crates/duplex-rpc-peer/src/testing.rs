//! In-memory channels for tests, examples, and same-process wiring.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::channel::{ChannelError, ChannelEvent, MessageChannel};

/// One side of an in-memory duplex pipe.
///
/// Delivers `Open` as its first event, then every frame the far side wrote,
/// then `Close` once the far side is dropped.
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
    opened: bool,
}

impl MemoryChannel {
    /// Two connected channels; frames written on one arrive on the other.
    pub fn pair() -> (MemoryChannel, MemoryChannel) {
        let (left_tx, left_rx) = mpsc::unbounded_channel();
        let (right_tx, right_rx) = mpsc::unbounded_channel();
        (
            MemoryChannel {
                tx: left_tx,
                rx: right_rx,
                opened: false,
            },
            MemoryChannel {
                tx: right_tx,
                rx: left_rx,
                opened: false,
            },
        )
    }
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    async fn send(&mut self, frame: String) -> Result<(), ChannelError> {
        self.tx.send(frame).map_err(|_| ChannelError::Closed)
    }

    async fn recv(&mut self) -> Option<ChannelEvent> {
        if !self.opened {
            self.opened = true;
            return Some(ChannelEvent::Open);
        }
        match self.rx.recv().await {
            Some(frame) => Some(ChannelEvent::Message(frame)),
            None => Some(ChannelEvent::Close),
        }
    }
}

/// Scripted far end of a connection: the test plays the peer by hand.
///
/// [`ChannelHarness::channel`] yields the channel to hand to an engine and
/// the harness driving it: `emit` injects channel events, `next_frame`
/// observes what the engine wrote.
pub struct ChannelHarness {
    events: mpsc::UnboundedSender<ChannelEvent>,
    frames: mpsc::UnboundedReceiver<String>,
}

/// The engine-facing side created by [`ChannelHarness::channel`].
pub struct HarnessChannel {
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    frames: mpsc::UnboundedSender<String>,
}

impl ChannelHarness {
    pub fn channel() -> (HarnessChannel, ChannelHarness) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        (
            HarnessChannel {
                events: event_rx,
                frames: frame_tx,
            },
            ChannelHarness {
                events: event_tx,
                frames: frame_rx,
            },
        )
    }

    /// Inject one channel event into the engine.
    pub fn emit(&self, event: ChannelEvent) {
        let _ = self.events.send(event);
    }

    pub fn open(&self) {
        self.emit(ChannelEvent::Open);
    }

    pub fn send(&self, frame: impl Into<String>) {
        self.emit(ChannelEvent::Message(frame.into()));
    }

    pub fn close(&self) {
        self.emit(ChannelEvent::Close);
    }

    /// The next raw frame the engine wrote, if the engine is still alive.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.frames.recv().await
    }

    /// [`Self::next_frame`] parsed as JSON. Panics on malformed output:
    /// the engine never writes anything but JSON frames.
    pub async fn next_json(&mut self) -> Option<Value> {
        let frame = self.next_frame().await?;
        Some(serde_json::from_str(&frame).expect("engine wrote a non-JSON frame"))
    }
}

#[async_trait]
impl MessageChannel for HarnessChannel {
    async fn send(&mut self, frame: String) -> Result<(), ChannelError> {
        self.frames.send(frame).map_err(|_| ChannelError::Closed)
    }

    async fn recv(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }
}
