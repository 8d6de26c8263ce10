//! JSON envelope carried in POST/PUT/DELETE/PATCH bodies.
//!
//! ```text
//! { "resource_type": "host", "zdnsuser": "alice", "attrs": [ ... ] }
//! ```
//!
//! One `attrs` entry per command. POST/PUT entries are the resource's own
//! serialised form, DELETE entries are `{"id"}` and PATCH entries are
//! `{"id", "new_attrs"}`.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// Wire form of a task body.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// Resource type shared by every entry.
    #[serde(default)]
    pub resource_type: String,
    /// Acting user.
    #[serde(rename = "zdnsuser", default)]
    pub user: String,
    /// Raw per-command payloads, decoded according to the HTTP method.
    #[serde(default)]
    pub attrs: Vec<Box<RawValue>>,
}

/// `attrs` entry of a DELETE body.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct DeleteEntry {
    #[serde(default)]
    pub id: String,
}

/// `attrs` entry of a PATCH body.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct PatchEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub new_attrs: Option<Map<String, Value>>,
}
