//! User intents turned into outbound frames.
//!
//! Nothing here touches the store: sends, edits, deletes, reactions and pins
//! show up once the server echoes them back through the router. The `plan_*`
//! functions check preconditions and build the frames; [`ActionDispatcher`]
//! puts them on the wire.

use shared::{
    domain::{Channel, ChannelId, ChannelKind, FileId, MessageId, Reactions},
    protocol::{ClientRequest, MessageScope},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    connection::ConnectionManager, content, context::SessionContext, error::DroppedReason,
    forward::PendingForwardSelection, state::ChatState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub channel_id: ChannelId,
    pub content: String,
    pub reply_to: Option<MessageId>,
    pub attachment_ids: Vec<FileId>,
}

impl OutgoingMessage {
    pub fn text(channel_id: ChannelId, content: impl Into<String>) -> Self {
        Self {
            channel_id,
            content: content.into(),
            reply_to: None,
            attachment_ids: Vec::new(),
        }
    }

    pub fn replying_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn with_attachments(mut self, attachment_ids: Vec<FileId>) -> Self {
        self.attachment_ids = attachment_ids;
        self
    }

    /// Embeds a GIF after the text as a `[GIF:url]` token.
    pub fn with_gif(mut self, gif_url: &str) -> Self {
        self.content = content::embed_gif(&self.content, gif_url);
        self
    }
}

pub fn plan_send(
    state: &ChatState,
    context: &SessionContext,
    message: OutgoingMessage,
) -> Result<ClientRequest, DroppedReason> {
    let OutgoingMessage {
        channel_id,
        content,
        reply_to,
        attachment_ids,
    } = message;
    if content.trim().is_empty() && attachment_ids.is_empty() {
        return Err(DroppedReason::EmptyContent);
    }
    let channel = state
        .channel(channel_id)
        .ok_or(DroppedReason::UnknownChannel(channel_id))?;

    match channel.kind() {
        ChannelKind::Group => Ok(ClientRequest::ChannelMessage {
            channel_id,
            content,
            reply_to,
            attachment_ids,
        }),
        ChannelKind::Direct => {
            let recipient_id = state
                .roster()
                .recipient_for(channel_id)
                .ok_or(DroppedReason::RecipientUnresolved(channel_id))?;
            Ok(ClientRequest::DirectMessage {
                recipient_id,
                content,
                team_id: context.team_id(),
                reply_to,
                channel_id,
                attachment_ids,
            })
        }
    }
}

pub fn plan_edit(
    state: &ChatState,
    message_id: MessageId,
    content: &str,
) -> Result<ClientRequest, DroppedReason> {
    if content.trim().is_empty() {
        return Err(DroppedReason::EmptyContent);
    }
    state
        .store()
        .find(message_id)
        .ok_or(DroppedReason::UnknownMessage(message_id))?;
    Ok(ClientRequest::EditMessage {
        message_id,
        content: content.to_string(),
    })
}

pub fn plan_delete(state: &ChatState, message_id: MessageId) -> Result<ClientRequest, DroppedReason> {
    let message = state
        .store()
        .find(message_id)
        .ok_or(DroppedReason::UnknownMessage(message_id))?;
    let channel = state
        .channel(message.channel_id)
        .ok_or(DroppedReason::UnknownChannel(message.channel_id))?;
    let scope = match channel.kind() {
        ChannelKind::Group => MessageScope::Channel,
        ChannelKind::Direct => MessageScope::Direct,
    };
    Ok(ClientRequest::DeleteMessage { message_id, scope })
}

pub fn plan_react(
    state: &ChatState,
    message_id: MessageId,
    emoji: &str,
) -> Result<ClientRequest, DroppedReason> {
    if emoji.trim().is_empty() {
        return Err(DroppedReason::EmptyContent);
    }
    state
        .store()
        .find(message_id)
        .ok_or(DroppedReason::UnknownMessage(message_id))?;
    Ok(ClientRequest::Reaction {
        message_id,
        reaction: emoji.to_string(),
    })
}

/// Unpins the channel's current pin, if it is another message, then pins.
pub fn plan_pin(
    state: &ChatState,
    message_id: MessageId,
) -> Result<Vec<ClientRequest>, DroppedReason> {
    let message = state
        .store()
        .find(message_id)
        .ok_or(DroppedReason::UnknownMessage(message_id))?;
    let mut requests = Vec::with_capacity(2);
    if let Some(previous) = state.store().pinned_of(message.channel_id) {
        if previous.id != message_id {
            requests.push(ClientRequest::UnpinMessage {
                message_id: previous.id,
            });
        }
    }
    requests.push(ClientRequest::PinMessage { message_id });
    Ok(requests)
}

pub fn plan_unpin(state: &ChatState, message_id: MessageId) -> Result<ClientRequest, DroppedReason> {
    state
        .store()
        .find(message_id)
        .ok_or(DroppedReason::UnknownMessage(message_id))?;
    Ok(ClientRequest::UnpinMessage { message_id })
}

/// Frame that asks the server for a channel's full history.
pub fn history_request(channel: &Channel) -> ClientRequest {
    match channel.kind() {
        ChannelKind::Group => ClientRequest::GetChannelMessages {
            channel_id: channel.id,
        },
        ChannelKind::Direct => ClientRequest::GetDirectMessages {
            channel_id: channel.id,
        },
    }
}

pub struct ActionDispatcher {
    connection: ConnectionManager,
    context: SessionContext,
}

impl ActionDispatcher {
    pub fn new(connection: ConnectionManager, context: SessionContext) -> Self {
        Self {
            connection,
            context,
        }
    }

    pub fn send_message(
        &self,
        state: &ChatState,
        message: OutgoingMessage,
    ) -> Result<(), DroppedReason> {
        let request = plan_send(state, &self.context, message).inspect_err(log_dropped)?;
        self.dispatch(&request)
    }

    pub fn edit_message(
        &self,
        state: &ChatState,
        message_id: MessageId,
        content: &str,
    ) -> Result<(), DroppedReason> {
        let request = plan_edit(state, message_id, content).inspect_err(log_dropped)?;
        self.dispatch(&request)
    }

    pub fn delete_message(&self, state: &ChatState, message_id: MessageId) -> Result<(), DroppedReason> {
        let request = plan_delete(state, message_id).inspect_err(log_dropped)?;
        self.dispatch(&request)
    }

    pub fn react(
        &self,
        state: &ChatState,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<(), DroppedReason> {
        let request = plan_react(state, message_id, emoji).inspect_err(log_dropped)?;
        self.dispatch(&request)
    }

    pub fn pin_message(&self, state: &ChatState, message_id: MessageId) -> Result<(), DroppedReason> {
        let requests = plan_pin(state, message_id).inspect_err(log_dropped)?;
        requests
            .iter()
            .try_for_each(|request| self.dispatch(request))
    }

    pub fn unpin_message(&self, state: &ChatState, message_id: MessageId) -> Result<(), DroppedReason> {
        let request = plan_unpin(state, message_id).inspect_err(log_dropped)?;
        self.dispatch(&request)
    }

    pub fn forward(&self, selection: PendingForwardSelection) -> Result<(), DroppedReason> {
        let request = selection.into_request().inspect_err(log_dropped)?;
        self.dispatch(&request)
    }

    pub fn create_channel(&self, name: &str) -> Result<(), DroppedReason> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DroppedReason::EmptyContent);
        }
        self.dispatch(&ClientRequest::CreateChannel {
            team_id: self.context.team_id(),
            name: name.to_string(),
        })
    }

    /// Tells other clients about a reaction already stored over REST.
    pub fn announce_reaction(
        &self,
        message_id: MessageId,
        reactions: Reactions,
        action_id: Uuid,
    ) -> Result<(), DroppedReason> {
        self.dispatch(&ClientRequest::ReactionAnnounce {
            message_id,
            reactions,
            action_id,
        })
    }

    pub fn request_history(&self, channel: &Channel) -> Result<(), DroppedReason> {
        self.dispatch(&history_request(channel))
    }

    pub fn request_rosters(&self) -> Result<(), DroppedReason> {
        let team_id = self.context.team_id();
        self.dispatch(&ClientRequest::GetTeamMembers { team_id })?;
        self.dispatch(&ClientRequest::GetInteractedUsers { team_id })
    }

    fn dispatch(&self, request: &ClientRequest) -> Result<(), DroppedReason> {
        self.connection.send(request)?;
        debug!(message_type = request.message_type(), "dispatched action");
        Ok(())
    }
}

fn log_dropped(reason: &DroppedReason) {
    warn!("dropping user action: {reason}");
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
