use std::sync::Arc;

use shared::{domain::UserStatus, protocol::ChangeFilter};
use tracing::{debug, error};

use crate::{
    backend::{Subscription, USERS_TABLE},
    error::BackendResult,
    generation::FetchGeneration,
    view::{Avatar, ElementId, Node},
    ClientContext,
};

pub const PRESENCE_TOPIC: &str = "users-status";

/// Online-user bubbles, refreshed on every change to the users table.
#[derive(Clone)]
pub struct PresenceController {
    ctx: ClientContext,
    generation: Arc<FetchGeneration>,
}

impl PresenceController {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            generation: Arc::new(FetchGeneration::default()),
        }
    }

    /// Returns the number of avatars rendered, or `None` if nothing was
    /// rendered.
    pub async fn load_online_users(&self) -> Option<usize> {
        if !self.ctx.view.has_element(ElementId::OnlineUsers) {
            return None;
        }

        let token = self.generation.begin();
        let users = match self
            .ctx
            .backend
            .list_users_with_status(UserStatus::Online)
            .await
        {
            Ok(users) => users,
            Err(err) => {
                error!("presence: error loading online users: {err}");
                return None;
            }
        };
        if !self.generation.is_current(token) {
            debug!(token, "presence: dropping superseded fetch");
            return None;
        }

        let nodes: Vec<Node> = users
            .iter()
            .map(|user| Node::Avatar(Avatar::for_user(user)))
            .collect();
        let count = nodes.len();
        self.ctx.view.replace_children(ElementId::OnlineUsers, nodes);
        Some(count)
    }

    /// Any update anywhere in the users table, unfiltered.
    pub async fn subscribe(&self) -> BackendResult<Subscription> {
        self.ctx
            .backend
            .subscribe(PRESENCE_TOPIC, ChangeFilter::updates(USERS_TABLE))
            .await
    }
}
