//! Handler factories, one per entity family and operation.
//!
//! Each factory closes over a state-mutation callback and binds the envelope
//! codec to the matching action type, producing a handler ready for
//! [`SyncClient::subscribe`](crate::client::SyncClient::subscribe). This is
//! the seam that keeps the connection manager blind to domain types: a
//! screen plugs in its own reducer without the client knowing about
//! thoughts or action items.

use crate::envelope::{self, ActionType};
use crate::transport::MessageHandler;
use crate::types::{ActionItem, Thought};

pub fn thought_created<F>(on_create: F) -> MessageHandler
where
    F: Fn(Thought) + Send + Sync + 'static,
{
    envelope::handler(ActionType::Create, on_create)
}

pub fn thought_updated<F>(on_update: F) -> MessageHandler
where
    F: Fn(Thought) + Send + Sync + 'static,
{
    envelope::handler(ActionType::Update, on_update)
}

pub fn thought_deleted<F>(on_delete: F) -> MessageHandler
where
    F: Fn(Thought) + Send + Sync + 'static,
{
    envelope::handler(ActionType::Delete, on_delete)
}

pub fn action_item_created<F>(on_create: F) -> MessageHandler
where
    F: Fn(ActionItem) + Send + Sync + 'static,
{
    envelope::handler(ActionType::Create, on_create)
}

pub fn action_item_updated<F>(on_update: F) -> MessageHandler
where
    F: Fn(ActionItem) + Send + Sync + 'static,
{
    envelope::handler(ActionType::Update, on_update)
}

pub fn action_item_deleted<F>(on_delete: F) -> MessageHandler
where
    F: Fn(ActionItem) + Send + Sync + 'static,
{
    envelope::handler(ActionType::Delete, on_delete)
}
