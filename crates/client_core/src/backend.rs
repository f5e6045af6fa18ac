//! Seam between the screen controllers and the hosted backend.

use std::time::Duration;

use async_trait::async_trait;
use shared::{
    domain::{
        AuthSession, AuthUser, Channel, ChannelId, Message, NewChannel, NewMessage, User, UserId,
        UserStatus,
    },
    protocol::{ChangeEvent, ChangeFilter},
};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::BackendResult;

pub const USERS_TABLE: &str = "users";
pub const CHANNELS_TABLE: &str = "channels";
pub const MESSAGES_TABLE: &str = "messages";

const LEAVE_GRACE: Duration = Duration::from_secs(2);

#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> BackendResult<AuthSession>;
    /// Locally held session, if any. Never touches the network.
    async fn session(&self) -> BackendResult<Option<AuthSession>>;
    /// Identity behind the current session as confirmed by the auth service.
    async fn current_user(&self) -> BackendResult<Option<AuthUser>>;
    async fn sign_out(&self) -> BackendResult<()>;

    async fn user_profile(&self, user_id: UserId) -> BackendResult<Option<User>>;
    async fn set_user_status(&self, user_id: UserId, status: UserStatus) -> BackendResult<()>;
    async fn list_users_with_status(&self, status: UserStatus) -> BackendResult<Vec<User>>;

    /// All channels, oldest first.
    async fn list_channels(&self) -> BackendResult<Vec<Channel>>;
    /// Inserts the channel and returns the stored row.
    async fn create_channel(&self, channel: NewChannel) -> BackendResult<Channel>;

    /// Messages of one channel with author usernames, oldest first.
    async fn list_messages(&self, channel_id: ChannelId) -> BackendResult<Vec<Message>>;
    async fn insert_message(&self, message: NewMessage) -> BackendResult<()>;

    async fn subscribe(&self, name: &str, filter: ChangeFilter) -> BackendResult<Subscription>;
}

/// Live feed of row changes for one realtime topic. Dropping it stops the
/// feed.
pub struct Subscription {
    topic: String,
    filter: ChangeFilter,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(
        topic: impl Into<String>,
        filter: ChangeFilter,
        events: mpsc::UnboundedReceiver<ChangeEvent>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            filter,
            events,
            task,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    /// Next notification, or `None` once the feed has ended.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    /// Closes the feed so the task can leave the channel, then aborts it if
    /// it has not finished within `LEAVE_GRACE`.
    fn drop(&mut self) {
        self.events.close();
        let Some(mut task) = self.task.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if tokio::time::timeout(LEAVE_GRACE, &mut task).await.is_err() {
                        task.abort();
                    }
                });
            }
            Err(_) => task.abort(),
        }
    }
}

pub fn topic_name(name: &str) -> String {
    format!("realtime:{name}")
}
