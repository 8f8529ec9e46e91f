use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{
    mpsc::{error::SendError, unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

use super::event::ServerEvent;

/// Write side of one live connection's outbound pump. Valid only while that
/// connection's lifetime task is running.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    conn_id: Uuid,
    sender: UnboundedSender<ServerEvent>,
}

impl ClientHandle {
    pub fn new() -> (Self, UnboundedReceiver<ServerEvent>) {
        let (sender, receiver) = unbounded_channel();
        let handle = Self {
            conn_id: Uuid::now_v7(),
            sender,
        };

        (handle, receiver)
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    pub fn push(&self, event: ServerEvent) -> Result<(), SendError<ServerEvent>> {
        self.sender.send(event)
    }
}

/// Live mapping from user id to connection handle. One entry per user: a
/// second connection for the same user replaces the first. All mutation goes
/// through the single lock; no operation touches I/O.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<Uuid, ClientHandle>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user_id: Uuid, handle: ClientHandle) {
        let mut guard = self.inner.write().await;
        if guard.insert(user_id, handle).is_some() {
            tracing::debug!(%user_id, "replaced an existing connection");
        }
    }

    /// Removes the entry only if `conn_id` still owns it. A close racing a
    /// newer connection of the same user must not evict that newer session.
    pub async fn deregister_if_owned(&self, user_id: Uuid, conn_id: Uuid) -> bool {
        let mut guard = self.inner.write().await;
        if guard.get(&user_id).is_some_and(|handle| handle.conn_id == conn_id) {
            guard.remove(&user_id);
            true
        } else {
            false
        }
    }

    pub async fn lookup(&self, user_id: Uuid) -> Option<ClientHandle> {
        self.inner.read().await.get(&user_id).cloned()
    }

    /// Snapshot of every registered connection except `except`'s own.
    pub async fn peers(&self, except: Uuid) -> Vec<ClientHandle> {
        self.inner
            .read()
            .await
            .iter()
            .filter(|(user_id, _)| **user_id != except)
            .map(|(_, handle)| handle.clone())
            .collect()
    }
}
