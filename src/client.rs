//! Subscription registry and connection manager.
//!
//! One [`SyncClient`] multiplexes a single shared transport connection
//! across every screen of the application. Screens record their desired
//! subscriptions in the registry; the client arms them on the live
//! connection when there is one, and replays the whole registry in
//! insertion order on every (re)connect. Duplicate subscribe calls for the
//! same id are suppressed, which is how multiple screens share one wire
//! subscription.

use crate::error::Result;
use crate::transport::{
    ConfigSource, MessageHandler, SessionCallbacks, Transport, TransportSession,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Connection lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    /// Transport activated, handshake not yet acknowledged. Also the phase
    /// after a transport-side socket loss, while its driver retries.
    Connecting,
    Connected,
}

/// One registry entry: a desired subscription, plus the live transport
/// handle when the connection is up.
struct Entry {
    destination: String,
    id: String,
    handler: MessageHandler,
    live: Option<Box<dyn crate::transport::LiveSubscription>>,
}

struct Inner {
    phase: Phase,
    registry: Vec<Entry>,
    session: Option<Box<dyn TransportSession>>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            phase: Phase::Disconnected,
            registry: Vec::new(),
            session: None,
        }
    }
}

/// The shared subscription client.
///
/// Cheaply cloneable; all clones share the same registry and connection.
/// `subscribe`, `unsubscribe`, and `disconnect` are synchronous; `connect`
/// only awaits the configuration fetch.
#[derive(Clone)]
pub struct SyncClient {
    transport: Arc<dyn Transport>,
    config: Arc<dyn ConfigSource>,
    inner: Arc<Mutex<Inner>>,
}

impl SyncClient {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<dyn ConfigSource>) -> Self {
        Self {
            transport,
            config,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Establish the shared connection. No-op when already connecting or
    /// connected.
    ///
    /// Awaits only the configuration fetch; the transport connects on its
    /// own driver task and arms the registry via `on_connect`. Callers that
    /// fire-and-forget this future still get failures logged.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if inner.phase != Phase::Disconnected {
                debug!(phase = ?inner.phase, "connect ignored");
                return Ok(());
            }
            inner.phase = Phase::Connecting;
        }

        let config = match self.config.transport_config().await {
            Ok(config) => config,
            Err(e) => {
                self.inner.lock().phase = Phase::Disconnected;
                error!(error = %e, "connect failed");
                return Err(e);
            }
        };

        let callbacks = SessionCallbacks {
            on_connect: {
                let inner = Arc::clone(&self.inner);
                Arc::new(move |session: &dyn TransportSession| {
                    Self::on_transport_connect(&inner, session);
                })
            },
            on_disconnect: {
                let inner = Arc::clone(&self.inner);
                Arc::new(move || Self::on_transport_disconnect(&inner))
            },
        };

        let session = match self.transport.activate(config, callbacks) {
            Ok(session) => session,
            Err(e) => {
                self.inner.lock().phase = Phase::Disconnected;
                error!(error = %e, "connect failed");
                return Err(e);
            }
        };
        self.inner.lock().session = Some(session);
        Ok(())
    }

    /// Tear down the shared connection. The registry is untouched, so a
    /// later `connect` replays the same desired set. Idempotent.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.session.take() {
            session.deactivate();
            debug!("disconnected");
        }
        for entry in inner.registry.iter_mut() {
            entry.live = None;
        }
        inner.phase = Phase::Disconnected;
    }

    /// Record a desired subscription under `id`, arming it immediately when
    /// connected.
    ///
    /// A second call with an id already in the registry is a no-op, even
    /// with a different destination or handler: the first writer wins, and
    /// every later screen shares its subscription.
    pub fn subscribe(&self, destination: &str, id: &str, handler: MessageHandler) {
        let mut inner = self.inner.lock();
        if inner.registry.iter().any(|e| e.id == id) {
            debug!(id = %id, "subscribe ignored, id already registered");
            return;
        }

        let live = match (inner.phase, inner.session.as_ref()) {
            (Phase::Connected, Some(session)) => {
                debug!(id = %id, destination = %destination, "subscription armed");
                Some(session.subscribe(destination, id, Arc::clone(&handler)))
            }
            _ => {
                debug!(id = %id, destination = %destination, "subscription deferred");
                None
            }
        };
        inner.registry.push(Entry {
            destination: destination.to_string(),
            id: id.to_string(),
            handler,
            live,
        });
    }

    /// Drop the registry entry for `id`, detaching its live subscription if
    /// one is armed. Unknown ids are a no-op: duplicate unsubscribes are a
    /// normal consequence of screens sharing ids.
    ///
    /// There is no reference counting. The first screen to unsubscribe a
    /// shared id detaches the wire subscription for every screen using it.
    pub fn unsubscribe(&self, id: &str) {
        let mut inner = self.inner.lock();
        if let Some(position) = inner.registry.iter().position(|e| e.id == id) {
            let entry = inner.registry.remove(position);
            if let Some(live) = entry.live {
                live.detach();
                debug!(id = %id, "subscription detached");
            }
        }
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase() == Phase::Connected
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.lock().registry.len()
    }

    /// Registry replay: arm every entry, in insertion order, on the
    /// connection that just came up. Runs on the transport driver task for
    /// the initial connect and every transport-driven reconnect alike.
    fn on_transport_connect(inner: &Mutex<Inner>, session: &dyn TransportSession) {
        let mut inner = inner.lock();
        inner.phase = Phase::Connected;
        for entry in inner.registry.iter_mut() {
            entry.live = Some(session.subscribe(
                &entry.destination,
                &entry.id,
                Arc::clone(&entry.handler),
            ));
        }
        info!(subscriptions = inner.registry.len(), "connected, registry armed");
    }

    /// The transport lost its socket and is retrying. Live handles are
    /// stale; the next `on_connect` re-arms everything.
    fn on_transport_disconnect(inner: &Mutex<Inner>) {
        let mut inner = inner.lock();
        if inner.phase == Phase::Disconnected {
            return;
        }
        inner.phase = Phase::Connecting;
        for entry in inner.registry.iter_mut() {
            entry.live = None;
        }
        debug!("connection lost, awaiting transport retry");
    }
}
