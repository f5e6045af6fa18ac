use std::sync::Arc;

pub mod backend;
pub mod channels;
pub mod chat;
pub mod config;
pub mod error;
mod generation;
pub mod login;
pub mod presence;
pub mod realtime;
pub mod rest;
pub mod selection;
pub mod session;
pub mod slug;
pub mod view;

pub use backend::{Backend, Subscription};
pub use channels::ChannelListController;
pub use chat::{ChatController, ChatPhase, ChatSession, RealtimeEvent, SendOutcome};
pub use error::{BackendError, BackendResult};
pub use login::{LoginController, LoginOutcome};
pub use presence::PresenceController;
pub use rest::RestBackend;
pub use selection::{FileSelectionStore, MemorySelectionStore, Selection, SelectionStore};
pub use session::SessionGuard;
pub use view::{ElementId, Node, Page, View};

/// Handles every controller works through: the backend, the rendering
/// surface and the persisted channel selection.
#[derive(Clone)]
pub struct ClientContext {
    pub backend: Arc<dyn Backend>,
    pub view: Arc<dyn View>,
    pub selection: Arc<dyn SelectionStore>,
}

impl ClientContext {
    pub fn new(
        backend: Arc<dyn Backend>,
        view: Arc<dyn View>,
        selection: Arc<dyn SelectionStore>,
    ) -> Self {
        Self {
            backend,
            view,
            selection,
        }
    }
}

#[cfg(test)]
#[path = "tests/fakes.rs"]
pub(crate) mod fakes;
