//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity, referenced by articles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
