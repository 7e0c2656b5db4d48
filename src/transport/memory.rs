//! In-memory transport for tests.
//!
//! Records every activation, subscribe, detach, and deactivate call, and
//! lets a test drive the connection lifecycle by hand:
//! [`complete_connect`](MemoryTransport::complete_connect) plays the role of
//! a successful handshake, [`drop_connection`](MemoryTransport::drop_connection)
//! a lost socket, and [`push`](MemoryTransport::push) a broker-delivered
//! message.

use super::{
    LiveSubscription, MessageHandler, SessionCallbacks, Transport, TransportConfig,
    TransportSession,
};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    activations: Vec<TransportConfig>,
    callbacks: Option<SessionCallbacks>,
    /// All subscribe calls ever made, as `(destination, id)`, in call order.
    subscribe_calls: Vec<(String, String)>,
    /// Handlers currently armed, in arm order.
    live: Vec<(String, MessageHandler)>,
    detached: Vec<String>,
    deactivations: usize,
}

/// Transport double shared between the client under test and the test body.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `on_connect`, as the driver task would after a handshake.
    ///
    /// Panics when the transport was never activated; that is a broken test,
    /// not a runtime condition.
    pub fn complete_connect(&self) {
        let callbacks = match self.state.lock().callbacks.clone() {
            Some(callbacks) => callbacks,
            None => panic!("complete_connect called before activate"),
        };
        // Invoked outside the state lock: on_connect re-enters via subscribe.
        let session = MemorySession {
            state: Arc::clone(&self.state),
        };
        (callbacks.on_connect)(&session);
    }

    /// Fire `on_disconnect`, as the driver task would on socket loss. The
    /// armed handlers are gone with the socket.
    pub fn drop_connection(&self) {
        let callbacks = {
            let mut state = self.state.lock();
            state.live.clear();
            state.callbacks.clone()
        };
        match callbacks {
            Some(callbacks) => (callbacks.on_disconnect)(),
            None => panic!("drop_connection called before activate"),
        }
    }

    /// Deliver a message body to the handler armed under `id`, returning the
    /// handler's result. `Ok(())` when nothing is armed under `id`, matching
    /// a broker whose message raced a detach.
    pub fn push(&self, id: &str, body: &str) -> Result<()> {
        let handler = {
            let state = self.state.lock();
            state
                .live
                .iter()
                .find(|(armed_id, _)| armed_id == id)
                .map(|(_, handler)| Arc::clone(handler))
        };
        match handler {
            Some(handler) => handler(body),
            None => {
                debug!(id = %id, "push to unarmed subscription");
                Ok(())
            }
        }
    }

    pub fn activation_count(&self) -> usize {
        self.state.lock().activations.len()
    }

    /// Config captured by the most recent activation.
    pub fn last_config(&self) -> Option<TransportConfig> {
        self.state.lock().activations.last().cloned()
    }

    /// Every subscribe call ever made, as `(destination, id)`, in call order.
    pub fn subscribe_calls(&self) -> Vec<(String, String)> {
        self.state.lock().subscribe_calls.clone()
    }

    /// Ids currently armed, in arm order.
    pub fn live_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .live
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids detached so far, in detach order.
    pub fn detached_ids(&self) -> Vec<String> {
        self.state.lock().detached.clone()
    }

    pub fn deactivation_count(&self) -> usize {
        self.state.lock().deactivations
    }
}

impl Transport for MemoryTransport {
    fn activate(
        &self,
        config: TransportConfig,
        callbacks: SessionCallbacks,
    ) -> Result<Box<dyn TransportSession>> {
        let mut state = self.state.lock();
        state.activations.push(config);
        state.callbacks = Some(callbacks);
        state.live.clear();
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
}

impl TransportSession for MemorySession {
    fn subscribe(
        &self,
        destination: &str,
        id: &str,
        handler: MessageHandler,
    ) -> Box<dyn LiveSubscription> {
        let mut state = self.state.lock();
        state
            .subscribe_calls
            .push((destination.to_string(), id.to_string()));
        state.live.push((id.to_string(), handler));
        Box::new(MemoryLiveSubscription {
            id: id.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    fn deactivate(&self) {
        let mut state = self.state.lock();
        state.deactivations += 1;
        state.live.clear();
        // No callbacks fire after deactivation.
        state.callbacks = None;
    }
}

struct MemoryLiveSubscription {
    id: String,
    state: Arc<Mutex<MemoryState>>,
}

impl LiveSubscription for MemoryLiveSubscription {
    fn detach(&self) {
        let mut state = self.state.lock();
        state.live.retain(|(id, _)| id != &self.id);
        state.detached.push(self.id.clone());
    }
}
