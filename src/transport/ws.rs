//! STOMP-over-WebSocket transport.
//!
//! [`StompTransport::activate`] spawns a driver task that owns the socket.
//! The session handle talks to the driver over a command channel, so
//! subscribe/detach/deactivate never block the caller. On socket loss the
//! driver fires `on_disconnect`, sleeps the configured fixed delay, and
//! retries; every successful handshake fires `on_connect` again, which is
//! how the session owner re-arms its subscriptions.

use super::frame::{self, Command as FrameCommand, Frame, HEARTBEAT};
use super::{
    LiveSubscription, MessageHandler, SessionCallbacks, Transport, TransportConfig,
    TransportSession,
};
use crate::error::{Result, SyncError};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::future;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Commands from the session handle to the driver task.
enum SessionCommand {
    Subscribe {
        destination: String,
        id: String,
        handler: MessageHandler,
    },
    Unsubscribe {
        id: String,
    },
    Deactivate,
}

/// How one established connection ended.
enum SessionEnd {
    Deactivated,
    SocketLost,
}

/// The production [`Transport`]: STOMP 1.2 frames over a WebSocket.
pub struct StompTransport;

impl StompTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StompTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StompTransport {
    fn activate(
        &self,
        config: TransportConfig,
        callbacks: SessionCallbacks,
    ) -> Result<Box<dyn TransportSession>> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            SyncError::Transport("activate requires a running tokio runtime".to_string())
        })?;
        debug!(broker = %config.broker_url, "activating transport");
        runtime.spawn(drive(config, callbacks, commands.clone(), command_rx));
        Ok(Box::new(WsSession { commands }))
    }
}

struct WsSession {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl TransportSession for WsSession {
    fn subscribe(
        &self,
        destination: &str,
        id: &str,
        handler: MessageHandler,
    ) -> Box<dyn LiveSubscription> {
        let _ = self.commands.send(SessionCommand::Subscribe {
            destination: destination.to_string(),
            id: id.to_string(),
            handler,
        });
        Box::new(WsLiveSubscription {
            id: id.to_string(),
            commands: self.commands.clone(),
        })
    }

    fn deactivate(&self) {
        let _ = self.commands.send(SessionCommand::Deactivate);
    }
}

struct WsLiveSubscription {
    id: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl LiveSubscription for WsLiveSubscription {
    fn detach(&self) {
        let _ = self.commands.send(SessionCommand::Unsubscribe {
            id: self.id.clone(),
        });
    }
}

/// Outer connection loop: connect, run, reconnect after the fixed delay.
async fn drive(
    config: TransportConfig,
    callbacks: SessionCallbacks,
    commands: mpsc::UnboundedSender<SessionCommand>,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
) {
    loop {
        match run_session(&config, &callbacks, &commands, &mut command_rx).await {
            Ok(SessionEnd::Deactivated) => {
                debug!("transport deactivated");
                return;
            }
            Ok(SessionEnd::SocketLost) => {
                warn!(broker = %config.broker_url, "connection lost");
            }
            Err(e) => {
                warn!(broker = %config.broker_url, error = %e, "connection attempt failed");
            }
        }

        warn!(
            delay_ms = config.reconnect_delay.as_millis() as u64,
            "reconnecting after delay"
        );
        tokio::select! {
            _ = sleep(config.reconnect_delay) => {}
            _ = deactivated_while_offline(&mut command_rx) => {
                debug!("transport deactivated during reconnect delay");
                return;
            }
        }
    }
}

/// Resolves when a deactivation arrives while no connection is up. Other
/// commands received here are stale: the next `on_connect` replay re-arms
/// every subscription anyway.
async fn deactivated_while_offline(command_rx: &mut mpsc::UnboundedReceiver<SessionCommand>) {
    loop {
        match command_rx.recv().await {
            Some(SessionCommand::Deactivate) | None => return,
            Some(_) => debug!("dropping subscription command while offline"),
        }
    }
}

/// One connection: WebSocket connect, STOMP handshake, message loop.
/// `on_connect` fires only after the handshake; `on_disconnect` fires on any
/// exit other than deactivation, but never for a connection that was never
/// established.
async fn run_session(
    config: &TransportConfig,
    callbacks: &SessionCallbacks,
    commands: &mpsc::UnboundedSender<SessionCommand>,
    command_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
) -> Result<SessionEnd> {
    let (socket, _) = connect_async(config.broker_url.as_str())
        .await
        .map_err(|e| SyncError::Transport(e.to_string()))?;
    let (mut sink, mut stream) = socket.split();

    let offer = (
        config.heartbeat_outgoing.as_millis() as u64,
        config.heartbeat_incoming.as_millis() as u64,
    );
    send_frame(&mut sink, Frame::connect(&config.connect_headers, offer)).await?;
    let server_beat = await_connected(&mut stream).await?;
    let (send_every, _recv_every) = frame::negotiate_heartbeat(offer, server_beat);

    info!(broker = %config.broker_url, "connected");
    let session = WsSession {
        commands: commands.clone(),
    };
    (callbacks.on_connect)(&session);

    let end = session_loop(&mut sink, &mut stream, command_rx, send_every).await;
    if !matches!(end, Ok(SessionEnd::Deactivated)) {
        (callbacks.on_disconnect)();
    }
    end
}

/// Read frames until the broker acknowledges the handshake. Returns the
/// server's heartbeat offer.
async fn await_connected(stream: &mut WsStream) -> Result<(u64, u64)> {
    loop {
        let message = stream
            .next()
            .await
            .ok_or_else(|| SyncError::Transport("socket closed during handshake".to_string()))?
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => {
                return Err(SyncError::Transport(
                    "socket closed during handshake".to_string(),
                ))
            }
            _ => continue,
        };
        match Frame::parse(&text)? {
            None => continue,
            Some(f) if f.command == FrameCommand::Connected => {
                return Ok(frame::parse_heartbeat(f.header("heart-beat")));
            }
            Some(f) if f.command == FrameCommand::Error => {
                return Err(SyncError::Protocol(format!(
                    "broker rejected connect: {}",
                    f.header("message").unwrap_or(&f.body)
                )));
            }
            Some(f) => {
                return Err(SyncError::Protocol(format!(
                    "unexpected {:?} frame during handshake",
                    f.command
                )));
            }
        }
    }
}

async fn session_loop(
    sink: &mut WsSink,
    stream: &mut WsStream,
    command_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
    send_every: Option<std::time::Duration>,
) -> Result<SessionEnd> {
    let mut handlers: HashMap<String, MessageHandler> = HashMap::new();
    let mut heartbeat = send_every.map(|period| {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        tokio::select! {
            message = stream.next() => match message {
                None | Some(Ok(Message::Close(_))) => return Ok(SessionEnd::SocketLost),
                Some(Err(e)) => {
                    warn!(error = %e, "socket error");
                    return Ok(SessionEnd::SocketLost);
                }
                Some(Ok(Message::Text(text))) => handle_text(&text, &handlers)?,
                Some(Ok(_)) => {}
            },
            command = command_rx.recv() => match command {
                Some(SessionCommand::Subscribe { destination, id, handler }) => {
                    if handlers.contains_key(&id) {
                        debug!(id = %id, "subscription already live");
                    } else {
                        send_frame(sink, Frame::subscribe(&id, &destination)).await?;
                        debug!(id = %id, destination = %destination, "subscription armed");
                        handlers.insert(id, handler);
                    }
                }
                Some(SessionCommand::Unsubscribe { id }) => {
                    if handlers.remove(&id).is_some() {
                        send_frame(sink, Frame::unsubscribe(&id)).await?;
                        debug!(id = %id, "subscription detached");
                    }
                }
                Some(SessionCommand::Deactivate) | None => {
                    let _ = send_frame(sink, Frame::disconnect()).await;
                    let _ = sink.close().await;
                    return Ok(SessionEnd::Deactivated);
                }
            },
            _ = maybe_tick(heartbeat.as_mut()) => {
                sink.send(Message::Text(HEARTBEAT.to_string()))
                    .await
                    .map_err(|e| SyncError::Transport(e.to_string()))?;
            }
        }
    }
}

/// Route one incoming WebSocket text message. Handler errors are logged and
/// the connection stays up; a malformed STOMP frame tears the session down.
fn handle_text(text: &str, handlers: &HashMap<String, MessageHandler>) -> Result<()> {
    let received = match Frame::parse(text)? {
        Some(f) => f,
        None => return Ok(()),
    };
    match received.command {
        FrameCommand::Message => {
            let id = received.header("subscription").ok_or_else(|| {
                SyncError::Protocol("MESSAGE frame without subscription header".to_string())
            })?;
            match handlers.get(id) {
                Some(handler) => {
                    if let Err(e) = handler(&received.body) {
                        error!(subscription = %id, error = %e, "message handler failed");
                    }
                }
                None => debug!(subscription = %id, "message for detached subscription"),
            }
        }
        FrameCommand::Error => {
            return Err(SyncError::Protocol(format!(
                "broker error: {}",
                received.header("message").unwrap_or(&received.body)
            )));
        }
        other => debug!(command = ?other, "ignoring frame"),
    }
    Ok(())
}

async fn send_frame(sink: &mut WsSink, outgoing: Frame) -> Result<()> {
    sink.send(Message::Text(outgoing.encode()))
        .await
        .map_err(|e| SyncError::Transport(e.to_string()))
}

/// Tick the heartbeat interval, or never resolve when heartbeats are off.
async fn maybe_tick(heartbeat: Option<&mut Interval>) {
    match heartbeat {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn never_called_callbacks() -> SessionCallbacks {
        SessionCallbacks {
            on_connect: Arc::new(|_: &dyn TransportSession| panic!("unexpected on_connect")),
            on_disconnect: Arc::new(|| panic!("unexpected on_disconnect")),
        }
    }

    #[test]
    fn test_activate_outside_runtime_fails() {
        let transport = StompTransport::new();
        let result = transport.activate(TransportConfig::default(), never_called_callbacks());
        assert!(matches!(result, Err(SyncError::Transport(_))));
    }

    #[tokio::test]
    async fn test_handler_error_does_not_tear_down_session() {
        let mut handlers: HashMap<String, MessageHandler> = HashMap::new();
        handlers.insert(
            "sub-1".to_string(),
            Arc::new(|_: &str| Err(SyncError::MalformedEnvelope("bad".to_string()))),
        );

        let wire = "MESSAGE\nsubscription:sub-1\n\nnot json\0";
        assert!(handle_text(wire, &handlers).is_ok());
    }

    #[tokio::test]
    async fn test_message_routed_by_subscription_header() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut handlers: HashMap<String, MessageHandler> = HashMap::new();
        handlers.insert(
            "sub-1".to_string(),
            Arc::new(move |body: &str| {
                sink.lock().push(body.to_string());
                Ok(())
            }),
        );

        handle_text("MESSAGE\nsubscription:sub-1\n\n{\"x\":1}\0", &handlers).unwrap();
        handle_text("MESSAGE\nsubscription:other\n\n{\"x\":2}\0", &handlers).unwrap();
        handle_text("\n", &handlers).unwrap();

        assert_eq!(seen.lock().as_slice(), ["{\"x\":1}"]);
    }

    #[tokio::test]
    async fn test_broker_error_frame_is_fatal() {
        let handlers = HashMap::new();
        let result = handle_text("ERROR\nmessage:bad credentials\n\n\0", &handlers);
        assert!(matches!(result, Err(SyncError::Protocol(_))));
    }
}
