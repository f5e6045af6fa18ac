//! HTTP side of the backend: auth endpoints and the table API.

use std::fmt;

use async_trait::async_trait;
use reqwest::{header::HeaderValue, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use shared::{
    domain::{
        AuthSession, AuthUser, Channel, ChannelId, Message, NewChannel, NewMessage, User, UserId,
        UserStatus,
    },
    error::ErrorCode,
    protocol::ChangeFilter,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    backend::{topic_name, Backend, Subscription, CHANNELS_TABLE, MESSAGES_TABLE, USERS_TABLE},
    error::{BackendError, BackendResult},
    realtime,
};

const MESSAGE_HISTORY_COLUMNS: &str = "id, message, inserted_at, users ( username )";

/// Table read/write described as a table API query string
/// (`select=..&column=eq.value&order=column.asc`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: String,
    params: Vec<(String, String)>,
}

impl TableQuery {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            params: Vec::new(),
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), columns.replace(' ', "")));
        self
    }

    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.params.push((column.into(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".into(), format!("{column}.{direction}")));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn path(&self) -> String {
        format!("/rest/v1/{}", self.table)
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

pub struct RestBackend {
    http: Client,
    base_url: String,
    api_key: String,
    session: RwLock<Option<AuthSession>>,
}

impl RestBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session: RwLock::new(None),
        }
    }

    /// Reuses a session obtained elsewhere, e.g. restored from disk.
    pub async fn restore_session(&self, session: AuthSession) {
        *self.session.write().await = Some(session);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn bearer(&self) -> String {
        let guard = self.session.read().await;
        let token = guard
            .as_ref()
            .map(|session| session.access_token.as_str())
            .unwrap_or(&self.api_key);
        format!("Bearer {token}")
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header(reqwest::header::AUTHORIZATION, self.bearer().await)
    }

    async fn send(builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::from_response(status.as_u16(), &body))
    }

    async fn read_rows<T: DeserializeOwned>(&self, query: &TableQuery) -> BackendResult<Vec<T>> {
        let request = self
            .authorized(self.http.get(self.url(&query.path())).query(query.params()))
            .await;
        let response = Self::send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn insert_rows<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> BackendResult<Vec<T>> {
        let query = TableQuery::from(table).select("*");
        let request = self
            .authorized(
                self.http
                    .post(self.url(&query.path()))
                    .query(query.params())
                    .header("Prefer", HeaderValue::from_static("return=representation"))
                    .json(body),
            )
            .await;
        let response = Self::send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn insert_minimal<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> BackendResult<()> {
        let query = TableQuery::from(table);
        let request = self
            .authorized(
                self.http
                    .post(self.url(&query.path()))
                    .header("Prefer", HeaderValue::from_static("return=minimal"))
                    .json(body),
            )
            .await;
        Self::send(request).await?;
        Ok(())
    }

    async fn update_rows<B: Serialize + ?Sized>(
        &self,
        query: &TableQuery,
        body: &B,
    ) -> BackendResult<()> {
        let request = self
            .authorized(
                self.http
                    .patch(self.url(&query.path()))
                    .query(query.params())
                    .header("Prefer", HeaderValue::from_static("return=minimal"))
                    .json(body),
            )
            .await;
        Self::send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let request = self
            .http
            .post(self.url("/auth/v1/token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&PasswordGrant { email, password });
        let response = Self::send(request).await?;
        let session: AuthSession = serde_json::from_str(&response.text().await?)?;
        info!(user_id = %session.user.id, "auth: signed in");
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn session(&self) -> BackendResult<Option<AuthSession>> {
        Ok(self.session.read().await.clone())
    }

    async fn current_user(&self) -> BackendResult<Option<AuthUser>> {
        if self.session.read().await.is_none() {
            return Ok(None);
        }
        let request = self.authorized(self.http.get(self.url("/auth/v1/user"))).await;
        match Self::send(request).await {
            Ok(response) => Ok(Some(serde_json::from_str(&response.text().await?)?)),
            Err(BackendError::Api {
                code: ErrorCode::Unauthorized | ErrorCode::Forbidden,
                ..
            }) => {
                // Expired or revoked token: the held session is no longer usable.
                warn!("auth: session rejected by the auth service, dropping it");
                *self.session.write().await = None;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let bearer = self.bearer().await;
        let Some(_) = self.session.write().await.take() else {
            return Ok(());
        };
        let request = self
            .http
            .post(self.url("/auth/v1/logout"))
            .header("apikey", &self.api_key)
            .header(reqwest::header::AUTHORIZATION, bearer);
        Self::send(request).await?;
        info!("auth: signed out");
        Ok(())
    }

    async fn user_profile(&self, user_id: UserId) -> BackendResult<Option<User>> {
        let query = TableQuery::from(USERS_TABLE)
            .select("username, email")
            .eq("id", user_id);
        let rows: Vec<User> = self.read_rows(&query).await?;
        Ok(rows.into_iter().next())
    }

    async fn set_user_status(&self, user_id: UserId, status: UserStatus) -> BackendResult<()> {
        let query = TableQuery::from(USERS_TABLE).eq("id", user_id);
        self.update_rows(&query, &json!({ "status": status })).await
    }

    async fn list_users_with_status(&self, status: UserStatus) -> BackendResult<Vec<User>> {
        let query = TableQuery::from(USERS_TABLE)
            .select("username, status")
            .eq("status", status.as_str());
        self.read_rows(&query).await
    }

    async fn list_channels(&self) -> BackendResult<Vec<Channel>> {
        let query = TableQuery::from(CHANNELS_TABLE)
            .select("*")
            .order("inserted_at", true);
        self.read_rows(&query).await
    }

    async fn create_channel(&self, channel: NewChannel) -> BackendResult<Channel> {
        let rows: Vec<Channel> = self.insert_rows(CHANNELS_TABLE, &channel).await?;
        rows.into_iter().next().ok_or_else(|| BackendError::Api {
            status: 200,
            code: ErrorCode::Internal,
            message: "channel insert returned no row".to_string(),
        })
    }

    async fn list_messages(&self, channel_id: ChannelId) -> BackendResult<Vec<Message>> {
        let query = TableQuery::from(MESSAGES_TABLE)
            .select(MESSAGE_HISTORY_COLUMNS)
            .eq("channel_id", channel_id)
            .order("inserted_at", true);
        self.read_rows(&query).await
    }

    async fn insert_message(&self, message: NewMessage) -> BackendResult<()> {
        self.insert_minimal(MESSAGES_TABLE, &message).await
    }

    async fn subscribe(&self, name: &str, filter: ChangeFilter) -> BackendResult<Subscription> {
        let ws_url = realtime::websocket_url(&self.base_url, &self.api_key)?;
        let access_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone());
        if access_token.is_none() {
            warn!(name, "realtime: subscribing without a session");
        }
        realtime::subscribe(&ws_url, topic_name(name), filter, access_token).await
    }
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
