use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::new_id;

/// A free-form note attached to a daily plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(content: String, created_at: DateTime<Utc>) -> Self {
        Note {
            id: new_id(),
            content,
            created_at,
        }
    }
}
