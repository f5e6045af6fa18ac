use std::sync::{Arc, Mutex};

use shared::domain::{AuthUser, Channel, NewChannel};
use tracing::{debug, error, info};

use crate::{
    generation::FetchGeneration,
    selection::Selection,
    session::SessionGuard,
    slug::derive_slug,
    view::{ChannelRow, ElementId, Node, Page},
    ClientContext,
};

pub const EMPTY_CHANNEL_NAME_ALERT: &str = "Please enter channel name";

/// Sidebar channel list plus channel creation.
#[derive(Clone)]
pub struct ChannelListController {
    ctx: ClientContext,
    rows: Arc<Mutex<Vec<Channel>>>,
    generation: Arc<FetchGeneration>,
}

impl ChannelListController {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            rows: Arc::new(Mutex::new(Vec::new())),
            generation: Arc::new(FetchGeneration::default()),
        }
    }

    /// Session check followed by the channel list. `None` means the page
    /// was redirected to login.
    pub async fn init_sidebar(&self) -> Option<AuthUser> {
        let user = SessionGuard::new(self.ctx.clone()).require_user().await?;
        self.load_channels().await;
        Some(user)
    }

    /// Fetches every channel, oldest first, and re-renders the list. On
    /// failure the list is left untouched.
    pub async fn load_channels(&self) -> Vec<Channel> {
        if !self.ctx.view.has_element(ElementId::ChannelList) {
            return Vec::new();
        }

        let token = self.generation.begin();
        let channels = match self.ctx.backend.list_channels().await {
            Ok(channels) => channels,
            Err(err) => {
                error!("channels: error loading channels: {err}");
                return self.rows();
            }
        };
        if !self.generation.is_current(token) {
            debug!(token, "channels: dropping superseded channel fetch");
            return self.rows();
        }

        if let Ok(mut rows) = self.rows.lock() {
            rows.clone_from(&channels);
        }
        let nodes = channels
            .iter()
            .cloned()
            .map(|channel| Node::ChannelRow(ChannelRow::new(channel)))
            .collect();
        self.ctx.view.replace_children(ElementId::ChannelList, nodes);
        channels
    }

    /// Channels currently rendered, in display order.
    pub fn rows(&self) -> Vec<Channel> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    /// Row click: remember the channel and open it.
    pub fn select_channel(&self, channel: &Channel) -> bool {
        if let Err(err) = Selection::save(self.ctx.selection.as_ref(), channel.id, &channel.slug) {
            error!(channel_id = %channel.id, "channels: failed to store selection: {err}");
            self.ctx.view.alert(&err.user_message());
            return false;
        }
        info!(channel_id = %channel.id, slug = %channel.slug, "channels: selected channel");
        self.ctx.view.navigate(Page::Chat);
        true
    }

    pub fn select_row(&self, index: usize) -> bool {
        let Some(channel) = self.rows().get(index).cloned() else {
            return false;
        };
        self.select_channel(&channel)
    }

    pub async fn create_channel(&self, raw_name: &str) -> Option<Channel> {
        let slug = derive_slug(raw_name);
        if slug.is_empty() {
            self.ctx.view.alert(EMPTY_CHANNEL_NAME_ALERT);
            return None;
        }

        let user = match self.ctx.backend.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) | Err(_) => {
                self.ctx.view.navigate(Page::Login);
                return None;
            }
        };

        let created = match self
            .ctx
            .backend
            .create_channel(NewChannel {
                slug,
                created_by: user.id,
            })
            .await
        {
            Ok(channel) => channel,
            Err(err) => {
                error!("channels: failed to create channel: {err}");
                self.ctx.view.alert(&err.user_message());
                return None;
            }
        };
        info!(channel_id = %created.id, slug = %created.slug, "channels: created channel");

        self.ctx.view.clear_input(ElementId::ChannelName);
        if !self.select_channel(&created) {
            return None;
        }
        Some(created)
    }
}

#[cfg(test)]
#[path = "tests/channels_tests.rs"]
mod tests;
