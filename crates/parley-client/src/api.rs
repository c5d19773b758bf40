// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed client for the Parley HTTP API.

use std::time::Duration;

use parley_core::types::{Role, Tier};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::ClientError;

/// Response envelope shared by every route.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Signup {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub mobile: String,
    pub tier: Tier,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    pub tier: Tier,
    pub status: String,
    pub daily_limit: Option<u32>,
    pub used_today: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatroomInfo {
    pub id: i64,
    pub title: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageInfo {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatroomDetail {
    pub id: i64,
    pub title: String,
    pub created_at: String,
    pub messages: Vec<MessageInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Queued {
    pub message_id: i64,
    pub job_id: String,
}

/// A chatroom listing and whether the server served it from cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub chatrooms: Vec<ChatroomInfo>,
    pub cached: bool,
}

#[derive(Deserialize)]
struct CheckoutData {
    checkout_url: String,
}

#[derive(Deserialize)]
struct UserData {
    user: Profile,
}

#[derive(Deserialize)]
struct ChatroomData<T> {
    chatroom: T,
}

#[derive(Deserialize)]
struct ListingData {
    chatrooms: Vec<ChatroomInfo>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{path}", self.base_url))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NoToken)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    /// Send and unwrap the envelope, returning `(message, data)`.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<(String, T), ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, bytes = body.len(), "api response");

        let envelope: Result<Envelope<T>, _> = serde_json::from_str(&body);
        if !status.is_success() {
            let message = match serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
                Ok(env) if !env.message.is_empty() => env.message,
                _ => body.trim().to_string(),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope.map_err(|e| ClientError::Decode(e.to_string()))?;
        if !envelope.ok {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: envelope.message,
            });
        }
        let data = envelope
            .data
            .ok_or_else(|| ClientError::Decode("response has no data".to_string()))?;
        Ok((envelope.message, data))
    }

    /// GET / and return the banner message.
    pub async fn ping(&self) -> Result<String, ClientError> {
        let (message, _): (String, serde_json::Value) =
            self.send(self.request(Method::GET, "/")).await?;
        Ok(message)
    }

    /// Register `mobile` and remember the issued token.
    pub async fn signup(&mut self, mobile: &str) -> Result<Signup, ClientError> {
        let request = self
            .request(Method::POST, "/auth/signup")
            .json(&json!({ "mobile": mobile }));
        let (_, signup): (String, Signup) = self.send(request).await?;
        self.token = Some(signup.token.clone());
        Ok(signup)
    }

    pub async fn me(&self) -> Result<Profile, ClientError> {
        let (_, data): (String, UserData) = self.send(self.authed(Method::GET, "/user/me")?).await?;
        Ok(data.user)
    }

    pub async fn subscription(&self) -> Result<Subscription, ClientError> {
        let (_, data) = self
            .send(self.authed(Method::GET, "/subscription/status")?)
            .await?;
        Ok(data)
    }

    /// Start a pro upgrade and return the checkout page to open.
    pub async fn subscribe_pro(&self) -> Result<String, ClientError> {
        let (_, data): (String, CheckoutData) =
            self.send(self.authed(Method::POST, "/subscribe/pro")?).await?;
        Ok(data.checkout_url)
    }

    pub async fn create_chatroom(&self, title: &str) -> Result<ChatroomInfo, ClientError> {
        let request = self
            .authed(Method::POST, "/chatroom")?
            .json(&json!({ "title": title }));
        let (_, data): (String, ChatroomData<ChatroomInfo>) = self.send(request).await?;
        Ok(data.chatroom)
    }

    pub async fn list_chatrooms(&self) -> Result<Listing, ClientError> {
        let (message, data): (String, ListingData) =
            self.send(self.authed(Method::GET, "/chatroom")?).await?;
        Ok(Listing {
            chatrooms: data.chatrooms,
            cached: message.contains("cache"),
        })
    }

    pub async fn chatroom(&self, id: i64) -> Result<ChatroomDetail, ClientError> {
        let (_, data): (String, ChatroomData<ChatroomDetail>) = self
            .send(self.authed(Method::GET, &format!("/chatroom/{id}"))?)
            .await?;
        Ok(data.chatroom)
    }

    pub async fn send_message(&self, chatroom_id: i64, content: &str) -> Result<Queued, ClientError> {
        let request = self
            .authed(Method::POST, &format!("/chatroom/{chatroom_id}/message"))?
            .json(&json!({ "content": content }));
        let (_, queued) = self.send(request).await?;
        Ok(queued)
    }
}
