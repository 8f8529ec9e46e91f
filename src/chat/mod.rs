mod event;
mod pipeline;
mod presence;
mod registry;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use event::{ClientEvent, ServerEvent};
pub use pipeline::SendError;
pub use registry::{ClientHandle, Registry};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws::chat_ws))
}
