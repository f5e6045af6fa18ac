//! Rendering surface the controllers write to, keyed by the element ids the
//! pages expose.

use std::fmt;

use chrono::{Local, TimeZone};
use shared::domain::{Channel, Message, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Login,
    Channels,
    Chat,
}

impl Page {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Channels => "channels",
            Self::Chat => "chat",
        }
    }

    /// Elements present on each page. The sidebar (channel list and
    /// username) is shared by the channel list and the chat page.
    pub fn elements(self) -> &'static [ElementId] {
        match self {
            Self::Login => &[ElementId::Email, ElementId::Password, ElementId::LoginButton],
            Self::Channels => &[
                ElementId::ChannelList,
                ElementId::ChannelName,
                ElementId::UsernameDisplay,
            ],
            Self::Chat => &[
                ElementId::ChannelList,
                ElementId::UsernameDisplay,
                ElementId::ChannelTitle,
                ElementId::MessagesContainer,
                ElementId::MessageInput,
                ElementId::SendBtn,
                ElementId::OnlineUsers,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    LoginButton,
    Email,
    Password,
    ChannelList,
    ChannelName,
    ChannelTitle,
    MessagesContainer,
    MessageInput,
    SendBtn,
    OnlineUsers,
    UsernameDisplay,
}

impl ElementId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoginButton => "loginButton",
            Self::Email => "email",
            Self::Password => "password",
            Self::ChannelList => "channelList",
            Self::ChannelName => "channelName",
            Self::ChannelTitle => "channelTitle",
            Self::MessagesContainer => "messagesContainer",
            Self::MessageInput => "messageInput",
            Self::SendBtn => "sendBtn",
            Self::OnlineUsers => "onlineUsers",
            Self::UsernameDisplay => "usernameDisplay",
        }
    }
}

/// Clickable sidebar row for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRow {
    pub channel: Channel,
    pub label: String,
}

impl ChannelRow {
    pub fn new(channel: Channel) -> Self {
        let label = format!("# {}", channel.slug);
        Self { channel, label }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLine {
    pub author: String,
    pub time: String,
    pub body: String,
}

impl MessageLine {
    pub fn new(message: &Message) -> Self {
        Self::in_timezone(message, &Local)
    }

    pub fn in_timezone<Tz: TimeZone>(message: &Message, tz: &Tz) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self {
            author: message.author_username().unwrap_or("Unknown").to_string(),
            time: message
                .inserted_at
                .map(|at| at.with_timezone(tz).format("%H:%M").to_string())
                .unwrap_or_default(),
            body: message.message.clone(),
        }
    }
}

impl fmt::Display for MessageLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.time.is_empty() {
            write!(f, "{}: {}", self.author, self.body)
        } else {
            write!(f, "[{}] {}: {}", self.time, self.author, self.body)
        }
    }
}

/// Presence bubble: first letter of the username, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub initial: String,
}

impl Avatar {
    pub fn for_user(user: &User) -> Self {
        let initial = user
            .username
            .as_deref()
            .and_then(|name| name.chars().next())
            .map(|first| first.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string());
        Self { initial }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    ChannelRow(ChannelRow),
    Message(MessageLine),
    Avatar(Avatar),
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelRow(row) => f.write_str(&row.label),
            Self::Message(line) => line.fmt(f),
            Self::Avatar(avatar) => write!(f, "({})", avatar.initial),
        }
    }
}

pub trait View: Send + Sync {
    fn has_element(&self, element: ElementId) -> bool;
    fn set_text(&self, element: ElementId, text: &str);
    /// Drops the container's current children and appends `nodes` in order.
    fn replace_children(&self, container: ElementId, nodes: Vec<Node>);
    fn scroll_to_bottom(&self, container: ElementId);
    fn clear_input(&self, element: ElementId);
    /// Blocking notice the user has to acknowledge.
    fn alert(&self, message: &str);
    fn navigate(&self, page: Page);
}
