//! The peer engine.
//!
//! One tokio task per connection owns the channel, the pending-request
//! tables, and the connection state machine. Callers reach it through the
//! command channel held by every [`CallProxy`]; inbound handlers run on
//! their own tasks and funnel responses back through the engine so frame
//! writes stay serialized.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::AtomicI64;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use duplex_rpc_wire::{ErrorObject, Frame, Request, Response};

use crate::channel::{BoxedChannel, ChannelError, ChannelEvent, ChannelFactory, ChannelSource};
use crate::config::EngineConfig;
use crate::context::InvokeContext;
use crate::error::{RpcError, RpcResult};
use crate::proxy::{CallProxy, Command, EngineHandle, OutboundCall};
use crate::resolve::Resolver;
use crate::state::ConnectionState;

/// Local bookkeeping for one outbound call awaiting its response.
///
/// Until completion a pending request lives in exactly one of the send
/// queue (not yet transmitted) or the in-flight table (transmitted);
/// completing it removes it from both worlds and disarms its timer.
struct Pending {
    frame: String,
    completion: oneshot::Sender<RpcResult<Value>>,
    timeout: JoinHandle<()>,
}

impl Pending {
    fn complete(self, result: RpcResult<Value>) {
        self.timeout.abort();
        let _ = self.completion.send(result);
    }
}

/// Engine-internal wakeups.
enum Internal {
    /// A pending request's deadline elapsed.
    TimedOut(i64),
    /// The reconnect timer fired.
    Retry,
    /// A dispatched handler produced its response.
    Respond(Response),
}

/// One resolved turn of the select loop.
enum Tick {
    Event(Option<ChannelEvent>),
    Command(Option<Command>),
    Internal(Internal),
}

pub(crate) struct Engine {
    config: EngineConfig,
    resolver: Arc<Resolver>,
    /// Loopback proxy woven into every invocation context.
    proxy: CallProxy,
    channel: Option<BoxedChannel>,
    factory: Option<Box<dyn ChannelFactory>>,
    state: watch::Sender<ConnectionState>,
    /// Commands from caller-facing proxies; closes when they are all gone.
    commands: mpsc::UnboundedReceiver<Command>,
    /// Commands from handler contexts (the loopback proxy); never closes.
    loopback: mpsc::UnboundedReceiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    /// Requests awaiting transmission, in issue order.
    queue: VecDeque<(i64, Pending)>,
    /// Transmitted requests awaiting their response.
    in_flight: HashMap<i64, Pending>,
    retries: u32,
    callers_gone: bool,
}

impl Engine {
    /// Start an engine task for `source` and hand back its root proxy.
    ///
    /// Must be called within a tokio runtime.
    pub(crate) fn spawn(source: ChannelSource, config: EngineConfig) -> CallProxy {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (loopback_tx, loopback_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Init);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let next_id = Arc::new(AtomicI64::new(0));

        let proxy = CallProxy::root(Arc::new(EngineHandle::new(
            command_tx,
            state_rx.clone(),
            next_id.clone(),
        )));
        let loopback_proxy =
            CallProxy::root(Arc::new(EngineHandle::new(loopback_tx, state_rx, next_id)));

        let (channel, factory) = match source {
            ChannelSource::Channel(channel) => (Some(channel), None),
            ChannelSource::Factory(factory) => (None, Some(factory)),
        };

        let engine = Engine {
            resolver: Arc::new(Resolver::new(config.router.clone())),
            proxy: loopback_proxy,
            channel,
            factory,
            state: state_tx,
            commands: command_rx,
            loopback: loopback_rx,
            internal_tx,
            internal_rx,
            queue: VecDeque::new(),
            in_flight: HashMap::new(),
            retries: 0,
            callers_gone: false,
            config,
        };
        tokio::spawn(engine.run());
        proxy
    }

    async fn run(mut self) {
        self.transition(ConnectionState::Connecting);
        if self.channel.is_none() {
            self.obtain_channel().await;
        }
        if self.config.opened && self.channel.is_some() {
            self.on_open().await;
        }

        loop {
            let tick = tokio::select! {
                event = Self::next_event(&mut self.channel) => Tick::Event(event),
                command = self.commands.recv(), if !self.callers_gone => Tick::Command(command),
                Some(command) = self.loopback.recv() => Tick::Command(Some(command)),
                Some(internal) = self.internal_rx.recv() => Tick::Internal(internal),
            };

            match tick {
                Tick::Event(Some(ChannelEvent::Message(text))) => self.handle_frame(text).await,
                Tick::Event(Some(ChannelEvent::Open)) => self.on_open().await,
                Tick::Event(Some(ChannelEvent::Error(reason))) => {
                    warn!(reason, "channel error");
                    self.on_disconnect().await;
                }
                Tick::Event(Some(ChannelEvent::Close | ChannelEvent::Exit) | None) => {
                    self.on_disconnect().await;
                }
                Tick::Command(Some(Command::Call(call))) => self.issue(call).await,
                Tick::Command(Some(Command::Close)) => self.shut_down().await,
                Tick::Command(None) => self.callers_gone = true,
                Tick::Internal(Internal::TimedOut(id)) => self.expire(id),
                Tick::Internal(Internal::Retry) => self.reconnect().await,
                Tick::Internal(Internal::Respond(response)) => {
                    self.write_response(response).await
                }
            }

            // With the callers gone the engine only has to outlive its
            // remaining obligations: a live (or reconnectable) channel keeps
            // serving the peer, pending requests keep their timers.
            if self.callers_gone
                && self.state_now().is_terminal()
                && self.queue.is_empty()
                && self.in_flight.is_empty()
            {
                break;
            }
        }
    }

    async fn next_event(channel: &mut Option<BoxedChannel>) -> Option<ChannelEvent> {
        match channel.as_mut() {
            Some(channel) => channel.recv().await,
            None => std::future::pending().await,
        }
    }

    // ---- outbound side -------------------------------------------------

    async fn issue(&mut self, call: OutboundCall) {
        let OutboundCall {
            request,
            completion,
        } = call;
        // Proxy-issued requests always carry numeric ids.
        let Some(id) = request.id.as_i64() else {
            let _ = completion.send(Err(RpcError::internal("non-numeric request id")));
            return;
        };

        let frame = match Frame::Request(request).encode() {
            Ok(frame) => frame,
            Err(e) => {
                let _ = completion.send(Err(RpcError::internal(format!(
                    "request encoding failed: {}",
                    e
                ))));
                return;
            }
        };

        let pending = Pending {
            frame: frame.clone(),
            completion,
            timeout: self.arm_timeout(id),
        };

        if self.state_now().is_open() {
            match self.transmit(&frame).await {
                Ok(()) => {
                    self.in_flight.insert(id, pending);
                }
                Err(e) => {
                    debug!(id, error = %e, "write rejected, queuing request");
                    self.queue.push_back((id, pending));
                }
            }
        } else {
            debug!(id, state = %self.state_now(), "connection not open, queuing request");
            self.queue.push_back((id, pending));
        }
    }

    fn arm_timeout(&self, id: i64) -> JoinHandle<()> {
        let deadline = self.config.timeout;
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            let _ = internal.send(Internal::TimedOut(id));
        })
    }

    fn expire(&mut self, id: i64) {
        if let Some(pending) = self.in_flight.remove(&id) {
            debug!(id, "request timed out in flight");
            pending.complete(Err(RpcError::timeout()));
        } else if let Some(index) = self.queue.iter().position(|(queued, _)| *queued == id) {
            debug!(id, "request timed out while queued");
            if let Some((_, pending)) = self.queue.remove(index) {
                pending.complete(Err(RpcError::timeout()));
            }
        }
        // Otherwise the call already completed and this timer lost the race.
    }

    fn complete(&mut self, response: Response) {
        let pending = response
            .id
            .as_i64()
            .and_then(|id| self.in_flight.remove(&id));
        match pending {
            Some(pending) => pending.complete(response.into_result().map_err(RpcError::from)),
            // Slow or misbehaving peers answer ids we no longer track.
            None => warn!(id = %response.id, "dropping response for unknown request id"),
        }
    }

    // ---- inbound side --------------------------------------------------

    async fn handle_frame(&mut self, text: String) {
        match Frame::decode(&text) {
            Ok(Frame::Request(request)) => self.dispatch(request).await,
            Ok(Frame::Response(response)) => self.complete(response),
            Err(e) => {
                debug!(error = %e, "undecodable frame");
                self.write_response(e.to_response()).await;
            }
        }
    }

    async fn dispatch(&mut self, request: Request) {
        let id = request.id.clone();
        let params = match request.params_list() {
            Ok(params) => params,
            Err(error) => {
                self.write_response(Response::error(id, error)).await;
                return;
            }
        };

        debug!(%id, method = %request.method, "dispatching inbound request");
        let cx = InvokeContext::new(id.clone(), request.method, params, self.proxy.clone());
        let resolver = self.resolver.clone();
        let internal = self.internal_tx.clone();
        // Handlers get their own task so a slow handler never starves the
        // read loop; responses funnel back through the engine to keep frame
        // writes serialized. The inner spawn fences off handler panics: the
        // peer gets an internal error instead of silence.
        tokio::spawn(async move {
            let outcome = tokio::spawn(async move { resolver.dispatch(cx).await }).await;
            let response = match outcome {
                Ok(Ok(value)) => Response::success(id, value),
                Ok(Err(error)) => Response::error(id, error.to_error_object()),
                Err(join_error) => {
                    warn!(error = %join_error, "handler task failed");
                    Response::error(
                        id,
                        ErrorObject::internal_error(Some("handler failed".to_string())),
                    )
                }
            };
            let _ = internal.send(Internal::Respond(response));
        });
    }

    async fn write_response(&mut self, response: Response) {
        let frame = match Frame::Response(response).encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "response encoding failed");
                return;
            }
        };
        if let Err(e) = self.transmit(&frame).await {
            // The peer's own timeout covers the lost response.
            warn!(error = %e, "response write failed");
        }
    }

    // ---- connection lifecycle ------------------------------------------

    async fn transmit(&mut self, frame: &str) -> Result<(), ChannelError> {
        match self.channel.as_mut() {
            Some(channel) => channel.send(frame.to_string()).await,
            None => Err(ChannelError::Closed),
        }
    }

    async fn on_open(&mut self) {
        self.transition(ConnectionState::Connected);
        self.retries = 0;
        self.flush_queue().await;
    }

    /// Transmit queued requests in issue order, promoting each to the
    /// in-flight table.
    async fn flush_queue(&mut self) {
        while let Some((id, pending)) = self.queue.pop_front() {
            match self.transmit(&pending.frame).await {
                Ok(()) => {
                    self.in_flight.insert(id, pending);
                }
                Err(e) => {
                    debug!(id, error = %e, "flush interrupted, request stays queued");
                    self.queue.push_front((id, pending));
                    break;
                }
            }
        }
    }

    async fn on_disconnect(&mut self) {
        if self.state_now().is_terminal() {
            return;
        }
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.fail_in_flight();

        if self.factory.is_some() && self.retries < self.config.max_retries {
            self.retries += 1;
            self.transition(ConnectionState::Reconnecting);
            let delay = self.config.retry_delay;
            let internal = self.internal_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = internal.send(Internal::Retry);
            });
        } else {
            self.transition(ConnectionState::Closed);
        }
    }

    /// Connection loss fails every in-flight call atomically. Queued calls
    /// keep their timers and either flush after a reconnect or time out.
    fn fail_in_flight(&mut self) {
        for (_, pending) in self.in_flight.drain() {
            pending.complete(Err(RpcError::disconnected()));
        }
    }

    async fn reconnect(&mut self) {
        if self.state_now() != ConnectionState::Reconnecting {
            // A stale timer; the engine moved on.
            return;
        }
        self.transition(ConnectionState::Connecting);
        self.obtain_channel().await;
    }

    async fn obtain_channel(&mut self) {
        let Some(factory) = self.factory.as_mut() else {
            return;
        };
        match factory.connect() {
            Ok(channel) => {
                debug!("channel established, awaiting open");
                self.channel = Some(channel);
            }
            Err(e) => {
                warn!(error = %e, "connect attempt failed");
                self.on_disconnect().await;
            }
        }
    }

    async fn shut_down(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.fail_in_flight();
        self.transition(ConnectionState::Closed);
    }

    fn transition(&mut self, to: ConnectionState) {
        let from = *self.state.borrow();
        if from == to {
            return;
        }
        let _ = self.state.send(to);
        info!(%from, %to, "connection state");
        if let Some(observer) = &self.config.on_state_change {
            observer(from, to);
        }
    }

    fn state_now(&self) -> ConnectionState {
        *self.state.borrow()
    }
}
