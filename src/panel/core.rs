//! The panel session.
//!
//! A [`Panel`] owns one [`NetworkModel`] and one [`SourcesModel`] bound to
//! the same command bridge, and routes inbound protocol events to them.
//!
//! # Example
//!
//! ```ignore
//! use devtools_panel::{Panel, PanelOptions};
//!
//! let panel = Panel::connect("ws://127.0.0.1:9222/devtools/page/1", PanelOptions::new()).await?;
//! panel.attach().await?;
//!
//! for request in panel.network().list() {
//!     println!("{} {}", request.method, request.url);
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::{debug, info, trace};

use crate::error::Result;
use crate::model::{NetworkModel, SourcesModel};
use crate::protocol::{Command, DebuggerCommand, Event, NetworkCommand, PageCommand, ParsedEvent};
use crate::transport::{CommandBridge, Connection};

use super::builder::PanelBuilder;
use super::options::PanelOptions;

// ============================================================================
// Types
// ============================================================================

/// Shared state of a panel.
struct PanelInner {
    bridge: Arc<dyn CommandBridge>,
    options: PanelOptions,
    network: NetworkModel,
    sources: SourcesModel,
    /// Set when the panel owns its WebSocket connection.
    connection: Option<Connection>,
}

// ============================================================================
// Panel
// ============================================================================

/// A devtools panel session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct Panel {
    inner: Arc<PanelInner>,
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("options", &self.inner.options)
            .field("network", &self.inner.network)
            .field("sources", &self.inner.sources)
            .field("connected", &self.inner.connection.is_some())
            .finish()
    }
}

// ============================================================================
// Panel - Construction
// ============================================================================

impl Panel {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> PanelBuilder {
        PanelBuilder::new()
    }

    /// Creates a panel over an existing bridge.
    ///
    /// No command is sent; call [`attach`](Self::attach) to enable the
    /// protocol domains. Events must be fed through
    /// [`dispatch`](Self::dispatch).
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::Error::Config) for invalid options.
    pub fn new(bridge: Arc<dyn CommandBridge>, options: PanelOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::assemble(bridge, options, None))
    }

    /// Connects to a CDP WebSocket endpoint.
    ///
    /// Inbound events of the connection are dispatched to this panel.
    ///
    /// # Errors
    ///
    /// Invalid options, or any failure establishing the connection.
    pub async fn connect(url: &str, options: PanelOptions) -> Result<Self> {
        let connection = Connection::connect(url, &options).await?;
        Ok(Self::with_connection(connection, options))
    }

    /// Wraps an established connection and routes its events here.
    pub(crate) fn with_connection(connection: Connection, options: PanelOptions) -> Self {
        let bridge: Arc<dyn CommandBridge> = Arc::new(connection.clone());
        let panel = Self::assemble(bridge, options, Some(connection.clone()));

        let weak: Weak<PanelInner> = Arc::downgrade(&panel.inner);
        connection.set_event_handler(Box::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                Panel { inner }.dispatch(event);
            }
        }));

        info!("Panel connected");
        panel
    }

    fn assemble(
        bridge: Arc<dyn CommandBridge>,
        options: PanelOptions,
        connection: Option<Connection>,
    ) -> Self {
        let network = NetworkModel::new(Arc::clone(&bridge), options.preserve_log);
        let sources = SourcesModel::new(Arc::clone(&bridge));

        Self {
            inner: Arc::new(PanelInner {
                bridge,
                options,
                network,
                sources,
                connection,
            }),
        }
    }
}

// ============================================================================
// Panel - Lifecycle
// ============================================================================

impl Panel {
    /// Enables the Network, Page and Debugger domains, then loads the page
    /// resource tree unless disabled in the options.
    ///
    /// # Errors
    ///
    /// The first failing bridge call.
    pub async fn attach(&self) -> Result<()> {
        let domains: [Command; 3] = [
            NetworkCommand::Enable.into(),
            PageCommand::Enable.into(),
            DebuggerCommand::Enable.into(),
        ];

        for command in domains {
            let method = command.method();
            self.inner.bridge.send(command).await?;
            debug!(method, "Domain enabled");
        }

        if self.inner.options.load_resources_on_attach {
            self.inner.sources.load_resources().await?;
        }

        info!("Panel attached");
        Ok(())
    }

    /// Stops the owned connection, if any.
    ///
    /// In-flight fetches resolve with a connection error.
    pub fn close(&self) {
        if let Some(connection) = &self.inner.connection {
            connection.clear_event_handler();
            connection.shutdown();
            info!("Panel closed");
        }
    }
}

// ============================================================================
// Panel - Events
// ============================================================================

impl Panel {
    /// Routes one inbound protocol event.
    ///
    /// | Event | Target |
    /// |-------|--------|
    /// | `Network.*` | [`NetworkModel`] |
    /// | `Debugger.scriptParsed` | [`SourcesModel`] |
    /// | `Page.frameNavigated` (top frame) | [`NetworkModel::handle_navigation`] |
    ///
    /// Everything else is ignored.
    pub fn dispatch(&self, event: Event) {
        match event.parse() {
            parsed @ (ParsedEvent::RequestWillBeSent(_)
            | ParsedEvent::ResponseReceived(_)
            | ParsedEvent::LoadingFinished(_)
            | ParsedEvent::LoadingFailed(_)) => {
                self.inner.network.apply(parsed);
            }
            ParsedEvent::ScriptParsed(payload) => {
                self.inner.sources.handle_script_parsed(&payload);
            }
            ParsedEvent::FrameNavigated(payload) if payload.frame.is_top() => {
                debug!(url = %payload.frame.url, "Top frame navigated");
                self.inner.network.handle_navigation();
            }
            ParsedEvent::FrameNavigated(_) => {}
            ParsedEvent::Unknown { method, .. } => {
                trace!(method = %method, "Event ignored");
            }
        }
    }
}

// ============================================================================
// Panel - Accessors
// ============================================================================

impl Panel {
    /// The network model.
    #[inline]
    #[must_use]
    pub fn network(&self) -> &NetworkModel {
        &self.inner.network
    }

    /// The sources model.
    #[inline]
    #[must_use]
    pub fn sources(&self) -> &SourcesModel {
        &self.inner.sources
    }

    /// The options this panel was built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &PanelOptions {
        &self.inner.options
    }

    /// The owned connection, for panels created from an endpoint.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> Option<&Connection> {
        self.inner.connection.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    use crate::error::Error;
    use crate::identifiers::RequestId;
    use crate::transport::scripted::ScriptedBridge;

    fn empty_tree() -> serde_json::Value {
        json!({ "frameTree": { "frame": { "id": "F1", "url": "https://x/" }, "resources": [] } })
    }

    fn panel(bridge: &ScriptedBridge, options: PanelOptions) -> Panel {
        Panel::new(Arc::new(bridge.clone()), options).expect("panel")
    }

    #[test]
    fn test_new_rejects_invalid_options() {
        let bridge = ScriptedBridge::manual();
        let result = Panel::new(
            Arc::new(bridge),
            PanelOptions::new().with_command_timeout(Duration::ZERO),
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_attach_enables_domains_then_loads_resources() {
        let bridge = ScriptedBridge::auto(|command| match command {
            Command::Page(PageCommand::GetResourceTree) => Ok(empty_tree()),
            _ => Ok(json!({})),
        });
        let panel = panel(&bridge, PanelOptions::new());

        assert_ok!(panel.attach().await);
        let methods: Vec<_> = bridge.calls().iter().map(Command::method).collect();
        assert_eq!(
            methods,
            vec!["Network.enable", "Page.enable", "Debugger.enable", "Page.getResourceTree"]
        );
    }

    #[tokio::test]
    async fn test_attach_without_initial_resources() {
        let bridge = ScriptedBridge::auto(|_| Ok(json!({})));
        let panel = panel(&bridge, PanelOptions::new().without_initial_resources());

        assert_ok!(panel.attach().await);
        assert_eq!(bridge.call_count(), 3);
    }

    #[tokio::test]
    async fn test_attach_stops_at_first_failure() {
        let bridge = ScriptedBridge::auto(|command| match command {
            Command::Page(PageCommand::Enable) => {
                Err(Error::command("Page.enable", -32601, "not supported"))
            }
            _ => Ok(json!({})),
        });
        let panel = panel(&bridge, PanelOptions::new());

        assert_err!(panel.attach().await);
        assert_eq!(bridge.call_count(), 2);
    }

    #[test]
    fn test_dispatch_routes_events() {
        let bridge = ScriptedBridge::manual();
        let panel = panel(&bridge, PanelOptions::new());

        panel.dispatch(Event::new(
            "Network.requestWillBeSent",
            json!({ "requestId": "1", "request": { "url": "https://x/", "method": "GET" } }),
        ));
        panel.dispatch(Event::new(
            "Debugger.scriptParsed",
            json!({ "scriptId": "9", "url": "https://x/js/app.js" }),
        ));
        panel.dispatch(Event::new("Runtime.consoleAPICalled", json!({})));

        assert_eq!(panel.network().len(), 1);
        assert!(panel.sources().find_by_url("https://x/js/app.js").is_some());
    }

    #[test]
    fn test_top_frame_navigation_clears_network() {
        let bridge = ScriptedBridge::manual();
        let panel = panel(&bridge, PanelOptions::new());
        panel.dispatch(Event::new(
            "Network.requestWillBeSent",
            json!({ "requestId": "1", "request": { "url": "https://x/" } }),
        ));

        panel.dispatch(Event::new(
            "Page.frameNavigated",
            json!({ "frame": { "id": "F2", "parentId": "F1", "url": "https://ads/" } }),
        ));
        assert_eq!(panel.network().len(), 1);

        panel.dispatch(Event::new(
            "Page.frameNavigated",
            json!({ "frame": { "id": "F1", "url": "https://x/next" } }),
        ));
        assert!(panel.network().is_empty());
    }

    #[test]
    fn test_preserve_log_survives_navigation() {
        let bridge = ScriptedBridge::manual();
        let panel = panel(&bridge, PanelOptions::new().with_preserve_log());
        panel.dispatch(Event::new(
            "Network.requestWillBeSent",
            json!({ "requestId": "1", "request": { "url": "https://x/" } }),
        ));
        panel.dispatch(Event::new(
            "Page.frameNavigated",
            json!({ "frame": { "id": "F1", "url": "https://x/next" } }),
        ));

        assert_eq!(panel.network().len(), 1);
    }

    #[tokio::test]
    async fn test_connected_panel_receives_events() {
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message;

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("handshake");

            let event = json!({
                "method": "Network.requestWillBeSent",
                "params": { "requestId": "7", "request": { "url": "https://x/live" } }
            });
            ws.send(Message::Text(event.to_string().into()))
                .await
                .expect("send event");

            // Answer the body request.
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Text(text) = message {
                    let request: serde_json::Value =
                        serde_json::from_str(&text).expect("request");
                    let reply = json!({
                        "id": request["id"],
                        "result": { "body": "live body", "base64Encoded": false }
                    });
                    ws.send(Message::Text(reply.to_string().into()))
                        .await
                        .expect("reply");
                }
            }
        });

        let panel = Panel::connect(&format!("ws://{addr}"), PanelOptions::new())
            .await
            .expect("connect");

        let id = RequestId::from("7");
        for _ in 0..200 {
            if panel.network().get(&id).is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(panel.network().len(), 1);

        let body = assert_ok!(panel.network().get_body(&id).await);
        assert_eq!(body.text(), Some("live body"));

        panel.close();
        let connection = panel.connection().expect("owned connection");
        for _ in 0..200 {
            if connection.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(connection.is_closed());
        server.abort();
    }
}
