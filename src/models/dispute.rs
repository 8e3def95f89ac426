use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A generated dispute letter, persisted verbatim for later printing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeDocument {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub document_type: String,
    pub content: String,
    pub created_at: NaiveDateTime,
}
