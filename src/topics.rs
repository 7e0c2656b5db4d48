//! Topic naming and subscription identity keys.
//!
//! Topic functions are pure formatters; ids are passed through verbatim
//! with no escaping or validation. The identity keys are the deduplication
//! constants shared by every screen that wants "the same" subscription:
//! one per {entity, operation} pair, not per subscriber.

/// Broker topic carrying thought events for one retro.
pub fn thoughts_topic(retro_id: &str) -> String {
    format!("/topic/{}.thoughts", retro_id)
}

/// Broker topic carrying action-item events for one team.
pub fn action_items_topic(team_id: &str) -> String {
    format!("/topic/{}.action-items", team_id)
}

/// Identity key for the thought-created subscription.
pub const CREATE_THOUGHT_ID: &str = "create-thought";

/// Identity key for the thought-updated subscription.
pub const UPDATE_THOUGHT_ID: &str = "update-thought";

/// Identity key for the thought-deleted subscription.
pub const DELETE_THOUGHT_ID: &str = "delete-thought";

/// Identity key for the action-item-created subscription.
pub const CREATE_ACTION_ITEM_ID: &str = "create-action-item";

/// Identity key for the action-item-updated subscription.
pub const UPDATE_ACTION_ITEM_ID: &str = "update-action-item";

/// Identity key for the action-item-deleted subscription.
pub const DELETE_ACTION_ITEM_ID: &str = "delete-action-item";
