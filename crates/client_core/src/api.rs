use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Channel, ChannelId, Message, MessageId, Reactions, TeamId, UserId},
    protocol::{LinkPreviewResponse, UploadedFile},
};
use url::Url;

use crate::{config::ClientSettings, context::SessionContext};

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// REST endpoints the chat core consumes but does not own.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_channels(&self, team_id: TeamId) -> Result<Vec<Channel>>;
    async fn create_or_get_dm_channel(&self, team_id: TeamId, user_id: UserId) -> Result<Channel>;
    async fn list_messages(&self, channel_id: ChannelId) -> Result<Vec<Message>>;
    /// Stores the reaction and returns the message's full reactions map.
    async fn add_reaction(&self, message_id: MessageId, emoji: &str) -> Result<Reactions>;
    async fn upload_file(&self, upload: FileUpload) -> Result<UploadedFile>;
    async fn fetch_link_preview(&self, url: &Url) -> Result<LinkPreviewResponse>;
}

pub struct MissingChatApi;

#[async_trait]
impl ChatApi for MissingChatApi {
    async fn list_channels(&self, team_id: TeamId) -> Result<Vec<Channel>> {
        Err(anyhow!("chat api unavailable; cannot list channels for team {team_id}"))
    }

    async fn create_or_get_dm_channel(&self, _team_id: TeamId, user_id: UserId) -> Result<Channel> {
        Err(anyhow!("chat api unavailable; cannot open direct channel with user {user_id}"))
    }

    async fn list_messages(&self, channel_id: ChannelId) -> Result<Vec<Message>> {
        Err(anyhow!("chat api unavailable; cannot list messages for channel {channel_id}"))
    }

    async fn add_reaction(&self, message_id: MessageId, _emoji: &str) -> Result<Reactions> {
        Err(anyhow!("chat api unavailable; cannot react to message {message_id}"))
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<UploadedFile> {
        Err(anyhow!("chat api unavailable; cannot upload {}", upload.filename))
    }

    async fn fetch_link_preview(&self, url: &Url) -> Result<LinkPreviewResponse> {
        Err(anyhow!("chat api unavailable; cannot preview {url}"))
    }
}

#[derive(Debug, Serialize)]
struct TeamChannelsRequest {
    team_id: TeamId,
}

#[derive(Debug, Serialize)]
struct DirectChannelRequest {
    team_id: TeamId,
    user_id: UserId,
}

#[derive(Debug, Serialize)]
struct ReactionRequest<'a> {
    reaction: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReactionResponse {
    #[serde(default)]
    reactions: Reactions,
}

/// [`ChatApi`] over HTTP with the session's bearer token.
pub struct HttpChatApi {
    http: Client,
    settings: ClientSettings,
    token: String,
}

impl HttpChatApi {
    pub fn new(settings: &ClientSettings, context: &SessionContext) -> Self {
        Self {
            http: Client::new(),
            settings: settings.clone(),
            token: context.token().to_string(),
        }
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_channels(&self, team_id: TeamId) -> Result<Vec<Channel>> {
        let channels = self
            .http
            .post(self.settings.api_url("channels/team_id/"))
            .bearer_auth(&self.token)
            .json(&TeamChannelsRequest { team_id })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(channels)
    }

    async fn create_or_get_dm_channel(&self, team_id: TeamId, user_id: UserId) -> Result<Channel> {
        let channel = self
            .http
            .post(self.settings.api_url("channels/create_or_get_dm_channel/"))
            .bearer_auth(&self.token)
            .json(&DirectChannelRequest { team_id, user_id })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(channel)
    }

    async fn list_messages(&self, channel_id: ChannelId) -> Result<Vec<Message>> {
        let messages = self
            .http
            .get(
                self.settings
                    .api_url(&format!("channels/{}/messages/", channel_id.0)),
            )
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(messages)
    }

    async fn add_reaction(&self, message_id: MessageId, emoji: &str) -> Result<Reactions> {
        let response: ReactionResponse = self
            .http
            .post(
                self.settings
                    .api_url(&format!("messages/{}/reactions/", message_id.0)),
            )
            .bearer_auth(&self.token)
            .json(&ReactionRequest { reaction: emoji })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.reactions)
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<UploadedFile> {
        let content_type = upload
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let uploaded = self
            .http
            .post(self.settings.api_url("files/upload/"))
            .bearer_auth(&self.token)
            .query(&[
                ("filename", upload.filename.as_str()),
                ("content_type", content_type.as_str()),
            ])
            .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
            .body(upload.bytes)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(uploaded)
    }

    async fn fetch_link_preview(&self, url: &Url) -> Result<LinkPreviewResponse> {
        let preview = self
            .http
            .get(self.settings.api_url("link-preview/"))
            .bearer_auth(&self.token)
            .query(&[("url", url.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(preview)
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
