use uuid::Uuid;

use super::{event::ServerEvent, registry::Registry};

/// Tells every other registered connection that `user_id` went on- or
/// offline. Best-effort: a peer whose pump already died is skipped, never
/// retried, and never aborts the rest of the fan-out.
pub async fn announce(registry: &Registry, user_id: Uuid, username: &str, online: bool) {
    let event = ServerEvent::PresenceChanged {
        user_id,
        username: username.to_owned(),
        online,
    };

    for peer in registry.peers(user_id).await {
        if peer.push(event.clone()).is_err() {
            tracing::debug!(%user_id, online, "skipped a closed peer during presence fan-out");
        }
    }
}
