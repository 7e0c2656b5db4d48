//! # retrosync
//!
//! Realtime subscription client for retrospective boards: a pub/sub façade
//! over one shared STOMP-over-WebSocket connection, multiplexed across
//! independently mounting and unmounting screens.
//!
//! ## Core Concepts
//!
//! - **Registry**: the ordered set of desired subscriptions, independent of
//!   connection state, deduplicated by subscription id
//! - **Replay**: every (re)connect re-arms the whole registry in insertion
//!   order, which is all the resume logic there is
//! - **Envelope**: the `{actionType, payload}` wrapper around every pushed
//!   domain event, decoded and filtered before any screen code runs
//! - **Reducers**: per-screen entity lists that consume decoded events via
//!   `create`/`update`/`delete` keyed by entity id
//!
//! ## Example
//!
//! ```ignore
//! use retrosync::{
//!     handlers, thoughts_topic, StaticConfig, StompTransport, SyncClient,
//!     ThoughtList, TransportConfig, CREATE_THOUGHT_ID,
//! };
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//!
//! let client = SyncClient::new(
//!     Arc::new(StompTransport::new()),
//!     Arc::new(StaticConfig::new(TransportConfig::default())),
//! );
//!
//! let thoughts = Arc::new(Mutex::new(ThoughtList::new()));
//! let sink = Arc::clone(&thoughts);
//! client.subscribe(
//!     &thoughts_topic("retro-123"),
//!     CREATE_THOUGHT_ID,
//!     handlers::thought_created(move |t| sink.lock().create(t)),
//! );
//!
//! client.connect().await?;
//! // ... screen unmounts:
//! client.unsubscribe(CREATE_THOUGHT_ID);
//! client.disconnect();
//! ```

pub mod client;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod state;
pub mod topics;
pub mod transport;
pub mod types;

// Re-exports
pub use client::{Phase, SyncClient};
pub use envelope::ActionType;
pub use error::{Result, SyncError};
pub use state::{ActionItemList, EntityList, ThoughtList};
pub use topics::{
    action_items_topic, thoughts_topic, CREATE_ACTION_ITEM_ID, CREATE_THOUGHT_ID,
    DELETE_ACTION_ITEM_ID, DELETE_THOUGHT_ID, UPDATE_ACTION_ITEM_ID, UPDATE_THOUGHT_ID,
};
pub use transport::memory::MemoryTransport;
pub use transport::ws::StompTransport;
pub use transport::{
    ConfigSource, LiveSubscription, MessageHandler, SessionCallbacks, StaticConfig, Transport,
    TransportConfig, TransportSession,
};
pub use types::{ActionItem, Identified, Thought};
