//! WebSocket connection and event loop.
//!
//! This module handles the WebSocket connection to a CDP endpoint,
//! including command/response correlation and event routing.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming messages from the target (responses, events)
//! - Outgoing commands from the models
//! - Command/response correlation by numeric id
//! - Event handler callbacks

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, from_str, to_string};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::panel::PanelOptions;
use crate::protocol::{Command, Event, Request, Response};

use super::CommandBridge;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Map of command ids to response channels.
type CorrelationMap = FxHashMap<CommandId, oneshot::Sender<Result<Response>>>;

/// Event handler callback type.
///
/// Called for each event received from the target.
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

// ============================================================================
// PendingSlot
// ============================================================================

/// One reserved in-flight command. Released on drop.
struct PendingSlot(Arc<AtomicUsize>);

impl PendingSlot {
    /// Takes a slot if fewer than `max` are held.
    fn reserve(in_flight: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| {
                (held < max).then_some(held + 1)
            })
            .ok()
            .map(|_| Self(Arc::clone(in_flight)))
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request and wait for response.
    Send {
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(CommandId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to an inspected target.
///
/// Implements [`CommandBridge`]. Cloning yields another handle to the same
/// event loop.
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Event handler (shared with event loop).
    event_handler: Arc<Mutex<Option<EventHandler>>>,
    /// Commands sent and not yet answered, failed or timed out.
    in_flight: Arc<AtomicUsize>,
    /// Per-command timeout.
    command_timeout: Duration,
    /// Cap on in-flight commands.
    max_pending: usize,
}

impl Connection {
    /// Connects to a CDP WebSocket endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::ConnectionTimeout`] if the handshake does not finish in 30s
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn connect(url: &str, options: &PanelOptions) -> Result<Self> {
        options.validate()?;

        let (ws_stream, _) = timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| Error::connection_timeout(CONNECT_TIMEOUT.as_millis() as u64))??;

        debug!(url, "Connected to inspected target");
        Ok(Self::new(ws_stream, options))
    }

    /// Creates a new connection from an established WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub fn new<S>(ws_stream: WebSocketStream<S>, options: &PanelOptions) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let event_handler: Arc<Mutex<Option<EventHandler>>> = Arc::new(Mutex::new(None));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            correlation,
            Arc::clone(&event_handler),
        ));

        Self {
            command_tx,
            event_handler,
            in_flight: Arc::new(AtomicUsize::new(0)),
            command_timeout: options.command_timeout,
            max_pending: options.max_pending_commands,
        }
    }

    /// Sets the event handler callback.
    pub fn set_event_handler(&self, handler: EventHandler) {
        let mut guard = self.event_handler.lock();
        *guard = Some(handler);
    }

    /// Clears the event handler.
    pub fn clear_event_handler(&self) {
        let mut guard = self.event_handler.lock();
        *guard = None;
    }

    /// Sends a request and waits for response with the configured timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    /// - [`Error::Protocol`] if too many pending requests
    pub async fn send_request(&self, request: Request) -> Result<Response> {
        self.send_with_timeout(request, self.command_timeout).await
    }

    /// Sends a request and waits for response with custom timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    /// - [`Error::Protocol`] if too many pending requests
    pub async fn send_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        let command_id = request.id;

        let Some(_slot) = PendingSlot::reserve(&self.in_flight, self.max_pending) else {
            let pending = self.pending_count();
            warn!(pending, max = self.max_pending, "Too many pending commands");
            return Err(Error::protocol(format!(
                "Too many pending commands: {pending}/{}",
                self.max_pending
            )));
        };

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(command_id));

                Err(Error::request_timeout(
                    command_id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Shuts down the connection gracefully.
    ///
    /// Pending commands resolve with [`Error::ConnectionClosed`]. Clones
    /// share the event loop, so this closes them too.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        event_handler: Arc<Mutex<Option<EventHandler>>>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &correlation, &event_handler);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { request, response_tx }) => {
                            Self::handle_send_command(
                                request,
                                response_tx,
                                &mut ws_write,
                                &correlation,
                            ).await;
                        }

                        Some(ConnectionCommand::RemoveCorrelation(command_id)) => {
                            correlation.lock().remove(&command_id);
                            debug!(%command_id, "Removed timed-out correlation");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        command_rx.close();
        Self::fail_pending_requests(&correlation);

        debug!("Event loop terminated");
    }

    /// Handles an incoming text message from the target.
    fn handle_incoming_message(
        text: &str,
        correlation: &Arc<Mutex<CorrelationMap>>,
        event_handler: &Arc<Mutex<Option<EventHandler>>>,
    ) {
        if let Ok(response) = from_str::<Response>(text) {
            let tx = correlation.lock().remove(&response.id);

            if let Some(tx) = tx {
                let _ = tx.send(Ok(response));
            } else {
                warn!(id = %response.id, "Response for unknown command");
            }
            return;
        }

        if let Ok(event) = from_str::<Event>(text) {
            trace!(method = %event.method, "Event received");
            let handler = event_handler.lock();
            if let Some(ref handler) = *handler {
                handler(event);
            }
            return;
        }

        warn!(text = %text, "Failed to parse incoming message");
    }

    /// Handles a send command from the models.
    async fn handle_send_command<S>(
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
        ws_write: &mut SplitSink<WebSocketStream<S>, Message>,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let command_id = request.id;

        let json = match to_string(&request) {
            Ok(j) => j,
            Err(e) => {
                let _ = response_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        // Store correlation before sending
        correlation.lock().insert(command_id, response_tx);

        if let Err(e) = ws_write.send(Message::Text(json.into())).await
            && let Some(tx) = correlation.lock().remove(&command_id)
        {
            let _ = tx.send(Err(Error::connection(e.to_string())));
        }

        trace!(%command_id, method = request.method(), "Command sent");
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(correlation: &Arc<Mutex<CorrelationMap>>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending commands on shutdown");
        }
    }
}

// ============================================================================
// CommandBridge Implementation
// ============================================================================

#[async_trait]
impl CommandBridge for Connection {
    async fn send(&self, command: Command) -> Result<Value> {
        let request = Request::new(command);
        let method = request.method();
        let response = self.send_request(request).await?;
        response.into_result(method)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::net::{TcpListener, TcpStream};

    use crate::protocol::{DebuggerCommand, NetworkCommand, PageCommand};

    /// Accepts one WebSocket client and hands back the server side.
    async fn listen() -> (String, tokio::task::JoinHandle<WebSocketStream<TcpStream>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("addr"));
        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            tokio_tungstenite::accept_async(stream).await.expect("upgrade")
        });
        (url, accept)
    }

    /// Reads the next text frame as JSON.
    async fn next_json(server: &mut WebSocketStream<TcpStream>) -> Value {
        loop {
            match server.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text).expect("json");
                }
                Some(Ok(_)) => continue,
                other => panic!("server stream ended: {other:?}"),
            }
        }
    }

    async fn reply(server: &mut WebSocketStream<TcpStream>, value: Value) {
        server
            .send(Message::Text(value.to_string().into()))
            .await
            .expect("server send");
    }

    #[tokio::test]
    async fn test_command_round_trip() {
        let (url, accept) = listen().await;
        let connection = Connection::connect(&url, &PanelOptions::new())
            .await
            .expect("connect");
        let mut server = accept.await.expect("join");

        let client = connection.clone();
        let call = tokio::spawn(async move {
            client
                .send(DebuggerCommand::GetScriptSource { script_id: "7".into() }.into())
                .await
        });

        let request = next_json(&mut server).await;
        assert_eq!(request["method"], "Debugger.getScriptSource");
        assert_eq!(request["params"]["scriptId"], "7");

        reply(
            &mut server,
            json!({ "id": request["id"], "result": { "scriptSource": "1+1" } }),
        )
        .await;

        let result = call.await.expect("join").expect("result");
        assert_eq!(result["scriptSource"], "1+1");
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_responses_out_of_order() {
        let (url, accept) = listen().await;
        let connection = Connection::connect(&url, &PanelOptions::new())
            .await
            .expect("connect");
        let mut server = accept.await.expect("join");

        let first = {
            let client = connection.clone();
            tokio::spawn(async move { client.send(NetworkCommand::Enable.into()).await })
        };
        let first_request = next_json(&mut server).await;

        let second = {
            let client = connection.clone();
            tokio::spawn(async move { client.send(PageCommand::Enable.into()).await })
        };
        let second_request = next_json(&mut server).await;

        reply(&mut server, json!({ "id": second_request["id"], "result": { "n": 2 } })).await;
        let second_result = second.await.expect("join").expect("second");
        assert_eq!(second_result["n"], 2);

        reply(&mut server, json!({ "id": first_request["id"], "result": { "n": 1 } })).await;
        let first_result = first.await.expect("join").expect("first");
        assert_eq!(first_result["n"], 1);
    }

    #[tokio::test]
    async fn test_remote_error_surfaces() {
        let (url, accept) = listen().await;
        let connection = Connection::connect(&url, &PanelOptions::new())
            .await
            .expect("connect");
        let mut server = accept.await.expect("join");

        let client = connection.clone();
        let call = tokio::spawn(async move { client.send(PageCommand::GetResourceTree.into()).await });

        let request = next_json(&mut server).await;
        reply(
            &mut server,
            json!({ "id": request["id"], "error": { "code": -32601, "message": "not found" } }),
        )
        .await;

        let err = call.await.expect("join").expect_err("should fail");
        assert!(matches!(err, Error::Command { code: -32601, .. }));
    }

    #[tokio::test]
    async fn test_events_reach_handler() {
        let (url, accept) = listen().await;
        let connection = Connection::connect(&url, &PanelOptions::new())
            .await
            .expect("connect");
        let mut server = accept.await.expect("join");

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        connection.set_event_handler(Box::new(move |event| {
            let _ = event_tx.send(event);
        }));

        reply(
            &mut server,
            json!({ "method": "Debugger.scriptParsed", "params": { "scriptId": "3", "url": "https://x/a.js" } }),
        )
        .await;

        let event = event_rx.recv().await.expect("event");
        assert_eq!(event.method, "Debugger.scriptParsed");
        assert_eq!(event.params["scriptId"], "3");
    }

    #[tokio::test]
    async fn test_pending_commands_fail_when_target_goes_away() {
        let (url, accept) = listen().await;
        let connection = Connection::connect(&url, &PanelOptions::new())
            .await
            .expect("connect");
        let mut server = accept.await.expect("join");

        let client = connection.clone();
        let call = tokio::spawn(async move { client.send(NetworkCommand::Enable.into()).await });

        let _ = next_json(&mut server).await;
        drop(server);

        let err = call.await.expect("join").expect_err("should fail");
        assert!(err.is_connection_error());

        let later = connection.send(PageCommand::Enable.into()).await;
        assert!(later.is_err());
    }

    #[tokio::test]
    async fn test_request_timeout_cleans_correlation() {
        let (url, accept) = listen().await;
        let options = PanelOptions::new().with_command_timeout(Duration::from_millis(50));
        let connection = Connection::connect(&url, &options).await.expect("connect");
        let _server = accept.await.expect("join");

        let err = connection
            .send(NetworkCommand::Enable.into())
            .await
            .expect_err("should time out");
        assert!(err.is_timeout());

        for _ in 0..100 {
            if connection.pending_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_limit() {
        let (url, accept) = listen().await;
        let options = PanelOptions::new().with_max_pending_commands(1);
        let connection = Connection::connect(&url, &options).await.expect("connect");
        let mut server = accept.await.expect("join");

        let client = connection.clone();
        let _first = tokio::spawn(async move { client.send(NetworkCommand::Enable.into()).await });
        let _ = next_json(&mut server).await;

        let err = connection
            .send(PageCommand::Enable.into())
            .await
            .expect_err("should be rejected");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_pending_limit_holds_for_concurrent_sends() {
        let (url, accept) = listen().await;
        let options = PanelOptions::new()
            .with_max_pending_commands(2)
            .with_command_timeout(Duration::from_millis(100));
        let connection = Connection::connect(&url, &options).await.expect("connect");
        let _server = accept.await.expect("join");

        let sends = (0..5).map(|_| connection.send(NetworkCommand::Enable.into()));
        let results = futures_util::future::join_all(sends).await;

        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(Error::Protocol { .. })))
            .count();
        let timed_out = results
            .iter()
            .filter(|r| r.as_ref().is_err_and(Error::is_timeout))
            .count();
        assert_eq!(rejected, 3);
        assert_eq!(timed_out, 2);
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_all_clones() {
        let (url, accept) = listen().await;
        let connection = Connection::connect(&url, &PanelOptions::new())
            .await
            .expect("connect");
        let _server = accept.await.expect("join");

        let clone = connection.clone();
        connection.shutdown();

        for _ in 0..100 {
            if clone.is_closed() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(clone.is_closed());
        assert!(matches!(
            clone.send(NetworkCommand::Enable.into()).await,
            Err(Error::ConnectionClosed)
        ));
    }
}
