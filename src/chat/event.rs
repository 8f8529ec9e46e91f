use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messages::Message;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage { receiver_id: Uuid, content: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    MessageDelivered {
        message: Message,
    },
    PresenceChanged {
        user_id: Uuid,
        username: String,
        online: bool,
    },
    SendFailed {
        reason: String,
    },
}
