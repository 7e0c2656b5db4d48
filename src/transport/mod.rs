//! Transport abstraction for the subscription client.
//!
//! The client core never talks to a socket directly. It is handed a
//! [`Transport`] and a [`ConfigSource`] at construction time, activates a
//! [`TransportSession`] on connect, and arms [`LiveSubscription`]s on it.
//! Production code injects [`StompTransport`](crate::transport::ws::StompTransport);
//! tests inject [`MemoryTransport`](crate::transport::memory::MemoryTransport).

pub mod frame;
pub mod memory;
pub mod ws;

use crate::error::Result;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked with the raw body of every message delivered to one
/// subscription. A returned error signals a protocol violation (malformed
/// envelope); the transport logs it and keeps the connection alive.
pub type MessageHandler = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// Connection parameters handed to [`Transport::activate`].
///
/// The reconnect delay and heartbeat intervals are passed through to the
/// transport verbatim; retry policy lives there, not in the client.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Broker WebSocket URL.
    pub broker_url: String,

    /// Headers sent with the connect handshake, e.g. a bearer credential
    /// under `Authorization`.
    pub connect_headers: HashMap<String, String>,

    /// Fixed delay between reconnection attempts.
    pub reconnect_delay: Duration,

    /// Heartbeat interval expected from the broker (0 disables).
    pub heartbeat_incoming: Duration,

    /// Heartbeat interval sent to the broker (0 disables).
    pub heartbeat_outgoing: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            broker_url: "ws://localhost:8080/websocket".to_string(),
            connect_headers: HashMap::new(),
            reconnect_delay: Duration::from_millis(3000),
            heartbeat_incoming: Duration::from_millis(4000),
            heartbeat_outgoing: Duration::from_millis(4000),
        }
    }
}

/// Asynchronous source of [`TransportConfig`].
///
/// The production implementation fetches a token from the auth provider and
/// folds it into `connect_headers`; that collaborator stays outside this
/// crate. [`StaticConfig`] covers tests and fixed-credential setups.
pub trait ConfigSource: Send + Sync {
    fn transport_config(&self) -> BoxFuture<'_, Result<TransportConfig>>;
}

/// A [`ConfigSource`] returning a fixed configuration.
pub struct StaticConfig {
    config: TransportConfig,
}

impl StaticConfig {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl ConfigSource for StaticConfig {
    fn transport_config(&self) -> BoxFuture<'_, Result<TransportConfig>> {
        let config = self.config.clone();
        Box::pin(async move { Ok(config) })
    }
}

/// Lifecycle callbacks a session owner registers at activation.
///
/// Both are invoked from the transport's driver task: `on_connect` once per
/// established connection (including reconnects, with the live session so the
/// owner can re-arm its subscriptions), `on_disconnect` once per lost socket.
/// Neither fires after [`TransportSession::deactivate`].
#[derive(Clone)]
pub struct SessionCallbacks {
    pub on_connect: Arc<dyn Fn(&dyn TransportSession) + Send + Sync>,
    pub on_disconnect: Arc<dyn Fn() + Send + Sync>,
}

/// Factory for transport sessions.
pub trait Transport: Send + Sync {
    /// Start a session. Returns synchronously; connection establishment and
    /// retries happen on the transport's own driver task, reporting through
    /// `callbacks`.
    fn activate(
        &self,
        config: TransportConfig,
        callbacks: SessionCallbacks,
    ) -> Result<Box<dyn TransportSession>>;
}

/// One activation of a transport. Subscribe/deactivate must not block.
pub trait TransportSession: Send + Sync {
    /// Attach a subscription to the live connection. `id` is echoed back in
    /// delivered messages so the transport can route them to `handler`.
    fn subscribe(
        &self,
        destination: &str,
        id: &str,
        handler: MessageHandler,
    ) -> Box<dyn LiveSubscription>;

    /// Tear the session down. No callbacks fire afterwards.
    fn deactivate(&self);
}

/// Handle to one armed subscription.
pub trait LiveSubscription: Send + Sync {
    /// Detach from the live connection. Messages already queued for delivery
    /// may still arrive; that is inherited from the underlying transport.
    fn detach(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_broker_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(config.heartbeat_incoming, Duration::from_millis(4000));
        assert_eq!(config.heartbeat_outgoing, Duration::from_millis(4000));
        assert!(config.connect_headers.is_empty());
    }

    #[tokio::test]
    async fn test_static_config_returns_its_value() {
        let mut config = TransportConfig::default();
        config.broker_url = "ws://broker:61613/ws".to_string();
        let source = StaticConfig::new(config);

        let fetched = source.transport_config().await.unwrap();
        assert_eq!(fetched.broker_url, "ws://broker:61613/ws");
    }
}
