use std::sync::{Arc, Mutex};

use shared::{
    domain::{AuthUser, ChannelId, NewMessage},
    protocol::{ChangeEvent, ChangeFilter},
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{
    backend::{Subscription, MESSAGES_TABLE},
    error::BackendResult,
    generation::FetchGeneration,
    presence::PresenceController,
    selection::Selection,
    view::{ElementId, MessageLine, Node, Page},
    ClientContext,
};

pub const DEFAULT_CHANNEL_TITLE: &str = "Channel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Init,
    LoadingHistory,
    Live,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    MessageInserted(ChangeEvent),
    UserUpdated(ChangeEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing but whitespace; no write was made.
    Empty,
    Sent,
    Failed,
}

/// One visit to the chat page: who is chatting where, plus the live feeds.
pub struct ChatSession {
    pub channel_id: ChannelId,
    pub slug: Option<String>,
    pub user: AuthUser,
    messages: Option<Subscription>,
    presence: Option<Subscription>,
}

impl ChatSession {
    pub fn is_subscribed(&self) -> bool {
        self.messages.is_some() || self.presence.is_some()
    }

    /// Next notification from either feed. `None` once both have ended.
    pub async fn next_event(&mut self) -> Option<RealtimeEvent> {
        loop {
            if !self.is_subscribed() {
                return None;
            }
            tokio::select! {
                event = next_change(&mut self.messages) => match event {
                    Some(change) => return Some(RealtimeEvent::MessageInserted(change)),
                    None => self.messages = None,
                },
                event = next_change(&mut self.presence) => match event {
                    Some(change) => return Some(RealtimeEvent::UserUpdated(change)),
                    None => self.presence = None,
                },
            }
        }
    }
}

async fn next_change(subscription: &mut Option<Subscription>) -> Option<ChangeEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

#[derive(Clone)]
pub struct ChatController {
    ctx: ClientContext,
    presence: PresenceController,
    phase: Arc<Mutex<ChatPhase>>,
    generation: Arc<FetchGeneration>,
}

impl ChatController {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            presence: PresenceController::new(ctx.clone()),
            ctx,
            phase: Arc::new(Mutex::new(ChatPhase::Init)),
            generation: Arc::new(FetchGeneration::default()),
        }
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase.lock().map(|phase| *phase).unwrap_or(ChatPhase::Init)
    }

    fn set_phase(&self, next: ChatPhase) {
        if let Ok(mut phase) = self.phase.lock() {
            let current = *phase;
            debug!(from = ?current, to = ?next, "chat: phase change");
            *phase = next;
        }
    }

    pub fn presence(&self) -> &PresenceController {
        &self.presence
    }

    /// Page entry. Redirects and returns `None` without a session or a
    /// selected channel.
    pub async fn enter(&self) -> Option<ChatSession> {
        self.set_phase(ChatPhase::Init);

        let session = match self.ctx.backend.session().await {
            Ok(Some(session)) => session,
            Ok(None) | Err(_) => {
                self.ctx.view.navigate(Page::Login);
                return None;
            }
        };

        let Some(selection) = Selection::load(self.ctx.selection.as_ref()) else {
            info!("chat: no channel selected, redirecting to channel list");
            self.ctx.view.navigate(Page::Channels);
            return None;
        };

        if self.ctx.view.has_element(ElementId::ChannelTitle) {
            let title = selection
                .slug
                .as_deref()
                .filter(|slug| !slug.is_empty())
                .unwrap_or(DEFAULT_CHANNEL_TITLE);
            self.ctx.view.set_text(ElementId::ChannelTitle, title);
        }

        self.set_phase(ChatPhase::LoadingHistory);
        self.load_messages(selection.channel_id).await;

        let messages = match self.subscribe_messages(selection.channel_id).await {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                error!(channel_id = %selection.channel_id, "chat: message subscription failed: {err}");
                None
            }
        };
        self.set_phase(ChatPhase::Live);

        self.presence.load_online_users().await;
        let presence = match self.presence.subscribe().await {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                error!("chat: presence subscription failed: {err}");
                None
            }
        };

        Some(ChatSession {
            channel_id: selection.channel_id,
            slug: selection.slug,
            user: session.user,
            messages,
            presence,
        })
    }

    /// Replaces the whole message list with the channel's history, oldest
    /// first, and scrolls to the newest. Returns the rendered count.
    pub async fn load_messages(&self, channel_id: ChannelId) -> Option<usize> {
        if !self.ctx.view.has_element(ElementId::MessagesContainer) {
            return None;
        }

        let token = self.generation.begin();
        let messages = match self.ctx.backend.list_messages(channel_id).await {
            Ok(messages) => messages,
            Err(err) => {
                error!(channel_id = %channel_id, "chat: error loading messages: {err}");
                return None;
            }
        };
        if !self.generation.is_current(token) {
            debug!(channel_id = %channel_id, token, "chat: dropping superseded history fetch");
            return None;
        }

        let nodes: Vec<Node> = messages
            .iter()
            .map(|message| Node::Message(MessageLine::new(message)))
            .collect();
        let count = nodes.len();
        self.ctx
            .view
            .replace_children(ElementId::MessagesContainer, nodes);
        self.ctx.view.scroll_to_bottom(ElementId::MessagesContainer);
        Some(count)
    }

    async fn subscribe_messages(&self, channel_id: ChannelId) -> BackendResult<Subscription> {
        self.ctx
            .backend
            .subscribe(
                &format!("messages:{channel_id}"),
                ChangeFilter::inserts(MESSAGES_TABLE).eq("channel_id", channel_id),
            )
            .await
    }

    /// Posts the trimmed text. The message shows up through the realtime
    /// reload, not by local echo.
    pub async fn send(&self, session: &ChatSession, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Empty;
        }

        let result = self
            .ctx
            .backend
            .insert_message(NewMessage {
                message: text.to_string(),
                channel_id: session.channel_id,
                user_id: session.user.id,
            })
            .await;
        if let Err(err) = result {
            error!(channel_id = %session.channel_id, "chat: failed to send message: {err}");
            self.ctx.view.alert(&err.user_message());
            return SendOutcome::Failed;
        }

        self.ctx.view.clear_input(ElementId::MessageInput);
        SendOutcome::Sent
    }

    /// Key handler of the message input. Enter sends; Shift+Enter and every
    /// other key are left to the input and return `None`.
    pub async fn handle_key(
        &self,
        session: &ChatSession,
        key: &str,
        shift: bool,
        text: &str,
    ) -> Option<SendOutcome> {
        if key != "Enter" || shift {
            return None;
        }
        Some(self.send(session, text).await)
    }

    /// Reacts to a notification with a full re-fetch of the affected list.
    pub async fn handle_event(&self, channel_id: ChannelId, event: &RealtimeEvent) {
        match event {
            RealtimeEvent::MessageInserted(_) => {
                self.load_messages(channel_id).await;
            }
            RealtimeEvent::UserUpdated(_) => {
                self.presence.load_online_users().await;
            }
        }
    }

    /// Runs `handle_event` in the background so a slow fetch does not hold
    /// up the next notification.
    pub fn dispatch(&self, channel_id: ChannelId, event: RealtimeEvent) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            controller.handle_event(channel_id, &event).await;
        })
    }
}

#[cfg(test)]
#[path = "tests/chat_tests.rs"]
mod tests;
