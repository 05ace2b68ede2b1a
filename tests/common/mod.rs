//! Shared test utilities.
//!
//! [`ScriptedServer`] is a local `graphql-ws` server that records every
//! frame in the order it was read or written, per connection, and can be
//! driven by the test (send frames, drop connections).

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Polling
// ============================================================================

/// Polls `condition` every 10ms for up to 3s.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Returns a local port nothing listens on.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}

// ============================================================================
// Recorded Frames
// ============================================================================

/// One frame seen by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    /// Client to server.
    Received { connection: usize, frame: Value },
    /// Server to client.
    Sent { connection: usize, frame: Value },
}

impl Recorded {
    pub fn connection(&self) -> usize {
        match self {
            Self::Received { connection, .. } | Self::Sent { connection, .. } => *connection,
        }
    }

    pub fn frame(&self) -> &Value {
        match self {
            Self::Received { frame, .. } | Self::Sent { frame, .. } => frame,
        }
    }

    pub fn frame_type(&self) -> &str {
        self.frame()["type"].as_str().unwrap_or_default()
    }

    pub fn is_received(&self) -> bool {
        matches!(self, Self::Received { .. })
    }
}

// ============================================================================
// Behaviour
// ============================================================================

/// How the server answers `connection_init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    Immediate,
    Delayed(Duration),
    Never,
}

/// Server behaviour shared by every connection.
#[derive(Debug, Clone, Copy)]
pub struct Behavior {
    pub ack: AckMode,
    /// Ack mode for every connection after the first, `ack` if unset.
    pub reconnect_ack: Option<AckMode>,
    /// Answer `stop` with `complete`.
    pub complete_on_stop: bool,
}

impl Behavior {
    fn ack_for(&self, connection: usize) -> AckMode {
        match self.reconnect_ack {
            Some(mode) if connection > 0 => mode,
            _ => self.ack,
        }
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            ack: AckMode::Immediate,
            reconnect_ack: None,
            complete_on_stop: true,
        }
    }
}

enum Control {
    Send(Value),
    Close,
}

// ============================================================================
// ScriptedServer
// ============================================================================

/// Local `graphql-ws` server bound to `127.0.0.1:0`.
pub struct ScriptedServer {
    addr: SocketAddr,
    log: Arc<Mutex<Vec<Recorded>>>,
    controls: Arc<Mutex<Vec<mpsc::UnboundedSender<Control>>>>,
}

impl ScriptedServer {
    /// Starts a server that acks immediately.
    pub async fn start() -> Self {
        Self::with_behavior(Behavior::default()).await
    }

    /// Starts a server with custom behaviour.
    pub async fn with_behavior(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let log = Arc::new(Mutex::new(Vec::new()));
        let controls = Arc::new(Mutex::new(Vec::new()));

        tokio::spawn(accept_loop(
            listener,
            behavior,
            Arc::clone(&log),
            Arc::clone(&controls),
        ));

        Self {
            addr,
            log,
            controls,
        }
    }

    /// HTTP-style endpoint whose derived WebSocket URL reaches this server.
    pub fn endpoint(&self) -> String {
        format!("http://{}/v1/graphql", self.addr)
    }

    /// Every recorded frame, in order.
    pub fn log(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }

    /// Frames received on `connection`.
    pub fn received(&self, connection: usize) -> Vec<Value> {
        self.log
            .lock()
            .iter()
            .filter(|r| r.is_received() && r.connection() == connection)
            .map(|r| r.frame().clone())
            .collect()
    }

    /// Frames of type `frame_type` received on `connection`.
    pub fn received_of_type(&self, connection: usize, frame_type: &str) -> Vec<Value> {
        self.received(connection)
            .into_iter()
            .filter(|frame| frame["type"] == frame_type)
            .collect()
    }

    /// Number of accepted connections.
    pub fn connection_count(&self) -> usize {
        self.controls.lock().len()
    }

    /// Sends `frame` on `connection`.
    pub fn send(&self, connection: usize, frame: Value) {
        if let Some(tx) = self.controls.lock().get(connection) {
            let _ = tx.send(Control::Send(frame));
        }
    }

    /// Sends a `data` frame.
    pub fn send_data(&self, connection: usize, id: &str, data: Value) {
        self.send(
            connection,
            json!({ "type": "data", "id": id, "payload": { "data": data } }),
        );
    }

    /// Closes `connection` from the server side.
    pub fn close_connection(&self, connection: usize) {
        if let Some(tx) = self.controls.lock().get(connection) {
            let _ = tx.send(Control::Close);
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    behavior: Behavior,
    log: Arc<Mutex<Vec<Recorded>>>,
    controls: Arc<Mutex<Vec<mpsc::UnboundedSender<Control>>>>,
) {
    while let Ok((stream, _)) = listener.accept().await {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = {
            let mut controls = controls.lock();
            controls.push(tx.clone());
            controls.len() - 1
        };

        tokio::spawn(serve(
            stream,
            connection,
            behavior,
            Arc::clone(&log),
            tx,
            rx,
        ));
    }
}

async fn serve(
    stream: TcpStream,
    connection: usize,
    behavior: Behavior,
    log: Arc<Mutex<Vec<Recorded>>>,
    control_tx: mpsc::UnboundedSender<Control>,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
) {
    let negotiate = |_request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
        response
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("graphql-ws"));
        Ok(response)
    };

    let Ok(socket) = accept_hdr_async(stream, negotiate).await else {
        return;
    };
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let frame: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                        log.lock().push(Recorded::Received { connection, frame: frame.clone() });

                        match frame["type"].as_str() {
                            Some("connection_init") => match behavior.ack_for(connection) {
                                AckMode::Immediate => {
                                    let _ = control_tx.send(Control::Send(json!({ "type": "connection_ack" })));
                                }
                                AckMode::Delayed(delay) => {
                                    let tx = control_tx.clone();
                                    tokio::spawn(async move {
                                        tokio::time::sleep(delay).await;
                                        let _ = tx.send(Control::Send(json!({ "type": "connection_ack" })));
                                    });
                                }
                                AckMode::Never => {}
                            },
                            Some("stop") if behavior.complete_on_stop => {
                                let _ = control_tx.send(Control::Send(
                                    json!({ "type": "complete", "id": frame["id"] }),
                                ));
                            }
                            Some("connection_terminate") => {
                                let _ = write.close().await;
                                break;
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }

            control = control_rx.recv() => {
                match control {
                    Some(Control::Send(frame)) => {
                        log.lock().push(Recorded::Sent { connection, frame: frame.clone() });
                        if write.send(Message::Text(frame.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Control::Close) | None => {
                        let _ = write.close().await;
                        break;
                    }
                }
            }
        }
    }
}
