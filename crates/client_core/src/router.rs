//! Inbound event decoding and dispatch.
//!
//! Frames are handled one at a time in arrival order; [`dispatch`] is an
//! exhaustive match so a new [`ServerEvent`] variant has to be routed on purpose.

use serde_json::Value;
use shared::{
    domain::{ChannelId, MessageId},
    error::ApiError,
    protocol::ServerEvent,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    channel_store::MessagePatch, content, error::ProtocolError, state::ChatState,
};

const REPLY_SNIPPET_CHARS: usize = 120;

/// What a routed event did to the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    MessagesChanged(ChannelId),
    RosterChanged,
    ChannelsChanged,
    ServerError(ApiError),
    Unchanged,
    Dropped(DropCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropCause {
    /// Live message for a channel outside the active window set.
    InactiveChannel(ChannelId),
    /// Echo of a reaction this client already applied.
    OwnEcho(Uuid),
}

/// Decodes a text frame, accepting either `type` or `message_type` as the tag.
pub fn decode(text: &str) -> Result<ServerEvent, ProtocolError> {
    let mut value: Value = serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;
    let kind = {
        let object = value.as_object_mut().ok_or(ProtocolError::NotAnObject)?;
        if !object.contains_key("type") {
            let tag = object
                .remove("message_type")
                .ok_or(ProtocolError::MissingDiscriminant)?;
            object.insert("type".to_string(), tag);
        }
        object
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    serde_json::from_value(value).map_err(|source| ProtocolError::Unsupported { kind, source })
}

pub fn route_frame(state: &mut ChatState, text: &str) -> Result<Routed, ProtocolError> {
    let event = decode(text)?;
    Ok(dispatch(state, event))
}

pub fn dispatch(state: &mut ChatState, event: ServerEvent) -> Routed {
    match event {
        ServerEvent::ChannelMessages {
            channel_id,
            messages,
        }
        | ServerEvent::DirectMessages {
            channel_id,
            messages,
        } => changed_messages(state.store.replace(channel_id, messages), channel_id),
        ServerEvent::TeamMembers { members } => {
            if state.roster.team_members == members {
                return Routed::Unchanged;
            }
            state.roster.team_members = members;
            Routed::RosterChanged
        }
        ServerEvent::InteractedUsers { users } => {
            if state.roster.interacted_users == users {
                return Routed::Unchanged;
            }
            state.roster.interacted_users = users;
            Routed::RosterChanged
        }
        ServerEvent::PresenceUpdate {
            user_id,
            status,
            last_seen,
        } => {
            if state.roster.apply_presence(user_id, status, last_seen) {
                Routed::RosterChanged
            } else {
                Routed::Unchanged
            }
        }
        ServerEvent::MessageDeleted { message_id } => {
            patched(state.store.remove_by_id(message_id), message_id)
        }
        ServerEvent::ReactionUpdate {
            message_id,
            reactions,
            action_id,
        } => {
            if let Some(action_id) = action_id {
                if state.take_own_action(action_id) {
                    debug!(message_id = message_id.0, %action_id, "ignoring own reaction echo");
                    return Routed::Dropped(DropCause::OwnEcho(action_id));
                }
            }
            patched(
                state
                    .store
                    .patch_by_id(message_id, MessagePatch::Reactions(reactions)),
                message_id,
            )
        }
        ServerEvent::MessagePinned { message_id } => patched(
            state.store.patch_by_id(message_id, MessagePatch::Pinned(true)),
            message_id,
        ),
        ServerEvent::MessageUnpinned { message_id } => patched(
            state
                .store
                .patch_by_id(message_id, MessagePatch::Pinned(false)),
            message_id,
        ),
        ServerEvent::MessageEdited {
            message_id,
            content,
        } => patched(
            state
                .store
                .patch_by_id(message_id, MessagePatch::Content(content)),
            message_id,
        ),
        ServerEvent::ChannelCreated { channel } => {
            if state.upsert_channel(channel) {
                Routed::ChannelsChanged
            } else {
                Routed::Unchanged
            }
        }
        ServerEvent::ChannelMessage(mut message) | ServerEvent::DirectMessage(mut message) => {
            let channel_id = message.channel_id;
            if !state.windows.contains(channel_id) {
                debug!(
                    channel_id = channel_id.0,
                    message_id = message.id.0,
                    "dropping live message for inactive channel"
                );
                return Routed::Dropped(DropCause::InactiveChannel(channel_id));
            }
            if message.reply_to_content.is_none() {
                if let Some(parent) = message.reply_to.and_then(|id| state.store.find(id)) {
                    message.reply_to_content =
                        Some(content::snippet(&parent.content, REPLY_SNIPPET_CHARS));
                }
            }
            changed_messages(state.store.append(channel_id, message), channel_id)
        }
        ServerEvent::Error(err) => {
            warn!(code = ?err.code, "chat server reported an error: {}", err.message);
            Routed::ServerError(err)
        }
    }
}

fn changed_messages(changed: bool, channel_id: ChannelId) -> Routed {
    if changed {
        Routed::MessagesChanged(channel_id)
    } else {
        Routed::Unchanged
    }
}

fn patched(channel_id: Option<ChannelId>, message_id: MessageId) -> Routed {
    match channel_id {
        Some(channel_id) => Routed::MessagesChanged(channel_id),
        None => {
            debug!(message_id = message_id.0, "event had no effect on loaded messages");
            Routed::Unchanged
        }
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
