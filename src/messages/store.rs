use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::AppResult;

/// One persisted message. Append-only: rows are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    /// unix milliseconds
    pub created_at: i64,
}

impl Message {
    pub fn new(sender_id: Uuid, receiver_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            sender_id,
            receiver_id,
            content,
            created_at: (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64,
        }
    }
}

pub async fn append(db_pool: &SqlitePool, message: &Message) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO messages (id,sender_id,receiver_id,content,created_at) VALUES (?,?,?,?,?)")
        .bind(message.id.to_string())
        .bind(message.sender_id.to_string())
        .bind(message.receiver_id.to_string())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(db_pool)
        .await?;

    Ok(())
}

/// Both directions of the conversation between two users, oldest first.
/// Equal timestamps keep insertion order (rowid).
pub async fn conversation(db_pool: &SqlitePool, a: Uuid, b: Uuid) -> AppResult<Vec<Message>> {
    let rows: Vec<(String, String, String, String, i64)> = sqlx::query_as(
        "SELECT id,sender_id,receiver_id,content,created_at FROM messages
         WHERE (sender_id=? AND receiver_id=?) OR (sender_id=? AND receiver_id=?)
         ORDER BY created_at, rowid",
    )
    .bind(a.to_string())
    .bind(b.to_string())
    .bind(b.to_string())
    .bind(a.to_string())
    .fetch_all(db_pool)
    .await?;

    let mut messages = Vec::with_capacity(rows.len());
    for (id, sender_id, receiver_id, content, created_at) in rows {
        messages.push(Message {
            id: Uuid::parse_str(&id)?,
            sender_id: Uuid::parse_str(&sender_id)?,
            receiver_id: Uuid::parse_str(&receiver_id)?,
            content,
            created_at,
        });
    }

    Ok(messages)
}
