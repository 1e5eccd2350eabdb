use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for a file shared inside a deal. File contents are never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Users allowed to see this document.
    pub access_control: Vec<Uuid>,
}

impl Document {
    pub fn visible_to(&self, user_id: Uuid) -> bool {
        self.access_control.contains(&user_id)
    }
}
