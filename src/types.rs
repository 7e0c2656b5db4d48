//! Domain entity types pushed over the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entity addressable by its server-assigned id.
///
/// The reconciliation layer keys every list operation on this id.
pub trait Identified {
    fn entity_id(&self) -> &str;
}

/// A single retro-board thought.
///
/// Timestamps arrive as ISO-8601 strings and deserialize directly into
/// [`DateTime<Utc>`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thought {
    pub id: String,
    pub message: String,
    pub votes: u32,
    pub completed: bool,
    /// Board column, e.g. "Start" / "Stop" / "Continue". Opaque to this layer.
    pub category: String,
    pub retro_id: String,
    pub created_at: DateTime<Utc>,
}

impl Identified for Thought {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// A team-scoped action item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: String,
    pub task: String,
    #[serde(default)]
    pub assignee: Option<String>,
    pub completed: bool,
    pub team_id: String,
    pub created_at: DateTime<Utc>,
}

impl Identified for ActionItem {
    fn entity_id(&self) -> &str {
        &self.id
    }
}
