use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::{
        Attachment, Channel, ChannelId, FileId, InteractedUser, LinkPreview, Message, MessageId,
        PresenceStatus, Reactions, TeamId, TeamMember, UserId,
    },
    error::ApiError,
};

/// Which message table a delete targets on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageScope {
    Channel,
    Direct,
}

/// Frames the client writes to the chat socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ClientRequest {
    GetTeamMembers {
        team_id: TeamId,
    },
    GetInteractedUsers {
        team_id: TeamId,
    },
    GetChannelMessages {
        channel_id: ChannelId,
    },
    GetDirectMessages {
        channel_id: ChannelId,
    },
    ChannelMessage {
        #[serde(rename = "channel")]
        channel_id: ChannelId,
        content: String,
        reply_to: Option<MessageId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachment_ids: Vec<FileId>,
    },
    DirectMessage {
        recipient_id: UserId,
        content: String,
        team_id: TeamId,
        reply_to: Option<MessageId>,
        channel_id: ChannelId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachment_ids: Vec<FileId>,
    },
    EditMessage {
        message_id: MessageId,
        content: String,
    },
    DeleteMessage {
        message_id: MessageId,
        #[serde(rename = "type")]
        scope: MessageScope,
    },
    Reaction {
        message_id: MessageId,
        reaction: String,
    },
    /// Fan-out notice for a reaction already stored through the REST API.
    ReactionAnnounce {
        message_id: MessageId,
        reactions: Reactions,
        action_id: Uuid,
    },
    PinMessage {
        message_id: MessageId,
    },
    UnpinMessage {
        message_id: MessageId,
    },
    ForwardMessage {
        content: String,
        channel_ids: Vec<ChannelId>,
    },
    CreateChannel {
        team_id: TeamId,
        name: String,
    },
}

impl ClientRequest {
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::GetTeamMembers { .. } => "get_team_members",
            Self::GetInteractedUsers { .. } => "get_interacted_users",
            Self::GetChannelMessages { .. } => "get_channel_messages",
            Self::GetDirectMessages { .. } => "get_direct_messages",
            Self::ChannelMessage { .. } => "channel_message",
            Self::DirectMessage { .. } => "direct_message",
            Self::EditMessage { .. } => "edit_message",
            Self::DeleteMessage { .. } => "delete_message",
            Self::Reaction { .. } => "reaction",
            Self::ReactionAnnounce { .. } => "reaction_announce",
            Self::PinMessage { .. } => "pin_message",
            Self::UnpinMessage { .. } => "unpin_message",
            Self::ForwardMessage { .. } => "forward_message",
            Self::CreateChannel { .. } => "create_channel",
        }
    }
}

/// Frames the chat server pushes over the socket.
///
/// The server tags frames with either `type` or `message_type`; decoders are
/// expected to normalize the discriminant into `type` before deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ChannelMessages {
        channel_id: ChannelId,
        #[serde(default)]
        messages: Vec<Message>,
    },
    DirectMessages {
        channel_id: ChannelId,
        #[serde(default)]
        messages: Vec<Message>,
    },
    TeamMembers {
        #[serde(default)]
        members: Vec<TeamMember>,
    },
    InteractedUsers {
        #[serde(default)]
        users: Vec<InteractedUser>,
    },
    MessageDeleted {
        message_id: MessageId,
    },
    ReactionUpdate {
        message_id: MessageId,
        #[serde(default)]
        reactions: Reactions,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action_id: Option<Uuid>,
    },
    MessagePinned {
        message_id: MessageId,
    },
    MessageUnpinned {
        message_id: MessageId,
    },
    MessageEdited {
        message_id: MessageId,
        content: String,
    },
    PresenceUpdate {
        user_id: UserId,
        status: PresenceStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_seen: Option<DateTime<Utc>>,
    },
    ChannelCreated {
        channel: Channel,
    },
    /// Live message posted to a group channel.
    #[serde(rename = "channels", alias = "channel")]
    ChannelMessage(Message),
    /// Live message posted to a direct-message channel.
    #[serde(rename = "direct")]
    DirectMessage(Message),
    Error(ApiError),
}

/// Body returned by the file upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: FileId,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl From<UploadedFile> for Attachment {
    fn from(value: UploadedFile) -> Self {
        Self {
            id: value.id,
            filename: value.filename,
            size: value.size,
            content_type: value.content_type,
            url: Some(value.url),
        }
    }
}

/// Body returned by the link preview endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPreviewResponse {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
}

impl From<LinkPreviewResponse> for LinkPreview {
    fn from(value: LinkPreviewResponse) -> Self {
        Self {
            url: value.url,
            title: value.title,
            description: value.description,
            image: value.image,
            site_name: value.site_name,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
