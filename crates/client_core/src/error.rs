use shared::{
    domain::{ChannelId, MessageId},
    error::ApiError,
};
use thiserror::Error;

/// Failures that end a chat session before it can start.
///
/// Hosts are expected to send the user back to authentication on any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no auth token available")]
    MissingToken,
    #[error("auth token has expired or cannot be decoded")]
    TokenExpired,
    #[error("chat server rejected the session: {0}")]
    Rejected(ApiError),
    #[error("invalid chat endpoint url: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// An inbound frame that could not be turned into a [`shared::protocol::ServerEvent`].
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid json: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("frame is not a json object")]
    NotAnObject,
    #[error("frame has neither `type` nor `message_type`")]
    MissingDiscriminant,
    #[error("unsupported event type `{kind}`: {source}")]
    Unsupported {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a user action was dropped locally instead of reaching the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DroppedReason {
    #[error("chat connection is not open")]
    NotConnected,
    #[error("no direct-message recipient known for channel {0}")]
    RecipientUnresolved(ChannelId),
    #[error("channel {0} is not known to this session")]
    UnknownChannel(ChannelId),
    #[error("message {0} is not loaded in any open channel")]
    UnknownMessage(MessageId),
    #[error("message content is empty")]
    EmptyContent,
    #[error("no forward in progress")]
    NoPendingForward,
    #[error("no forward target selected")]
    NoForwardTargets,
    #[error("failed to encode outbound frame: {0}")]
    Encode(String),
}
