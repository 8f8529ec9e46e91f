use sqlx::SqlitePool;
use uuid::Uuid;

use crate::messages::{store, Message};

use super::{event::ServerEvent, registry::Registry};

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("message content cannot be empty")]
    EmptyContent,
    #[error("failed to store message: {0}")]
    Store(#[from] sqlx::Error),
}

/// Validate, persist, then deliver. The append must succeed before any push
/// happens: a message a recipient sees is always already durable. An offline
/// receiver, or a push landing on a handle whose pump just died, only skips
/// the realtime leg; the message stays retrievable by history query.
pub async fn send(
    db_pool: &SqlitePool,
    registry: &Registry,

    sender_id: Uuid,
    receiver_id: Uuid,
    content: &str,
) -> Result<Message, SendError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(SendError::EmptyContent);
    }

    let message = Message::new(sender_id, receiver_id, content.to_owned());
    store::append(db_pool, &message).await?;

    if let Some(receiver) = registry.lookup(receiver_id).await {
        let delivery = ServerEvent::MessageDelivered { message: message.clone() };
        if receiver.push(delivery).is_err() {
            tracing::debug!(%receiver_id, "receiver closed before delivery, message kept for history");
        }
    }

    Ok(message)
}
