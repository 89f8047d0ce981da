use super::*;
use shared::domain::{InteractedUser, Message, PresenceStatus, TeamId, UserId};

use crate::config::ClientSettings;

fn channel(id: i64, direct: bool) -> Channel {
    Channel {
        id: ChannelId(id),
        name: format!("channel-{id}"),
        members: Vec::new(),
        is_direct_message: direct,
    }
}

fn message(id: i64, channel: i64) -> Message {
    Message {
        id: MessageId(id),
        channel_id: ChannelId(channel),
        sender_id: None,
        sender: "alice".into(),
        content: format!("message {id}"),
        timestamp: "2024-01-01T00:00:00Z".parse().expect("timestamp"),
        reply_to: None,
        reply_to_content: None,
        is_forwarded: false,
        is_pinned: false,
        is_edited: false,
        reactions: Reactions::new(),
        attachments: Vec::new(),
        link_preview: None,
    }
}

fn context() -> SessionContext {
    SessionContext::new("token", "alice", TeamId(11)).expect("context")
}

/// Group channel 1 with messages 1..=3 and direct channel 2 with message 4.
fn populated_state() -> ChatState {
    let mut state = ChatState::new();
    state.set_channels(vec![channel(1, false), channel(2, true)]);
    state.windows.toggle(ChannelId(1));
    state.windows.toggle(ChannelId(2));
    state
        .store
        .replace(ChannelId(1), vec![message(1, 1), message(2, 1), message(3, 1)]);
    state.store.replace(ChannelId(2), vec![message(4, 2)]);
    state
}

#[test]
fn group_send_targets_the_channel() {
    let state = populated_state();
    let request = plan_send(
        &state,
        &context(),
        OutgoingMessage::text(ChannelId(1), "hi").replying_to(MessageId(2)),
    )
    .expect("plan");

    assert_eq!(
        request,
        ClientRequest::ChannelMessage {
            channel_id: ChannelId(1),
            content: "hi".into(),
            reply_to: Some(MessageId(2)),
            attachment_ids: Vec::new(),
        }
    );
}

#[test]
fn gif_only_message_is_sent_as_a_gif_token() {
    let state = populated_state();
    let request = plan_send(
        &state,
        &context(),
        OutgoingMessage::text(ChannelId(1), "  ").with_gif("https://media.example/wave.gif"),
    )
    .expect("plan");

    assert!(matches!(
        request,
        ClientRequest::ChannelMessage { content, .. }
            if content == "[GIF:https://media.example/wave.gif]"
    ));
}

#[test]
fn direct_send_needs_a_known_recipient() {
    let mut state = populated_state();
    let err = plan_send(&state, &context(), OutgoingMessage::text(ChannelId(2), "psst"))
        .expect_err("recipient unknown");
    assert_eq!(err, DroppedReason::RecipientUnresolved(ChannelId(2)));

    state.roster.interacted_users.push(InteractedUser {
        id: UserId(9),
        username: "bob".into(),
        channel_id: Some(ChannelId(2)),
        status: PresenceStatus::Online,
        last_seen: None,
    });
    let request = plan_send(&state, &context(), OutgoingMessage::text(ChannelId(2), "psst"))
        .expect("plan");
    assert_eq!(
        request,
        ClientRequest::DirectMessage {
            recipient_id: UserId(9),
            content: "psst".into(),
            team_id: TeamId(11),
            reply_to: None,
            channel_id: ChannelId(2),
            attachment_ids: Vec::new(),
        }
    );
}

#[test]
fn empty_send_is_dropped_unless_it_carries_attachments() {
    let state = populated_state();
    assert_eq!(
        plan_send(&state, &context(), OutgoingMessage::text(ChannelId(1), "   ")),
        Err(DroppedReason::EmptyContent)
    );
    let with_file = OutgoingMessage::text(ChannelId(1), "").with_attachments(vec![FileId(5)]);
    assert!(plan_send(&state, &context(), with_file).is_ok());
    assert_eq!(
        plan_send(&state, &context(), OutgoingMessage::text(ChannelId(77), "hi")),
        Err(DroppedReason::UnknownChannel(ChannelId(77)))
    );
}

#[test]
fn delete_scope_follows_channel_kind() {
    let state = populated_state();
    assert_eq!(
        plan_delete(&state, MessageId(2)),
        Ok(ClientRequest::DeleteMessage {
            message_id: MessageId(2),
            scope: MessageScope::Channel,
        })
    );
    assert_eq!(
        plan_delete(&state, MessageId(4)),
        Ok(ClientRequest::DeleteMessage {
            message_id: MessageId(4),
            scope: MessageScope::Direct,
        })
    );
    assert_eq!(
        plan_delete(&state, MessageId(99)),
        Err(DroppedReason::UnknownMessage(MessageId(99)))
    );
}

#[test]
fn pin_unpins_the_current_pin_first() {
    let mut state = populated_state();
    assert_eq!(
        plan_pin(&state, MessageId(1)),
        Ok(vec![ClientRequest::PinMessage {
            message_id: MessageId(1)
        }])
    );

    state
        .store
        .patch_by_id(MessageId(1), crate::channel_store::MessagePatch::Pinned(true));
    assert_eq!(
        plan_pin(&state, MessageId(3)),
        Ok(vec![
            ClientRequest::UnpinMessage {
                message_id: MessageId(1)
            },
            ClientRequest::PinMessage {
                message_id: MessageId(3)
            },
        ])
    );
    assert_eq!(
        plan_pin(&state, MessageId(1)),
        Ok(vec![ClientRequest::PinMessage {
            message_id: MessageId(1)
        }])
    );
}

#[test]
fn edit_and_react_reject_empty_input() {
    let state = populated_state();
    assert_eq!(
        plan_edit(&state, MessageId(1), " "),
        Err(DroppedReason::EmptyContent)
    );
    assert_eq!(plan_react(&state, MessageId(1), ""), Err(DroppedReason::EmptyContent));
    assert_eq!(
        plan_react(&state, MessageId(1), "👍"),
        Ok(ClientRequest::Reaction {
            message_id: MessageId(1),
            reaction: "👍".into(),
        })
    );
    assert_eq!(
        plan_unpin(&state, MessageId(50)),
        Err(DroppedReason::UnknownMessage(MessageId(50)))
    );
}

#[test]
fn history_request_matches_channel_kind() {
    assert_eq!(
        history_request(&channel(1, false)),
        ClientRequest::GetChannelMessages {
            channel_id: ChannelId(1)
        }
    );
    assert_eq!(
        history_request(&channel(2, true)),
        ClientRequest::GetDirectMessages {
            channel_id: ChannelId(2)
        }
    );
}

#[test]
fn dispatcher_drops_actions_while_disconnected() {
    let state = populated_state();
    let (connection, _events) = ConnectionManager::new(&ClientSettings::default());
    let dispatcher = ActionDispatcher::new(connection, context());

    assert_eq!(
        dispatcher.send_message(&state, OutgoingMessage::text(ChannelId(1), "hi")),
        Err(DroppedReason::NotConnected)
    );
    assert_eq!(
        dispatcher.delete_message(&state, MessageId(99)),
        Err(DroppedReason::UnknownMessage(MessageId(99)))
    );
    assert_eq!(dispatcher.create_channel("  "), Err(DroppedReason::EmptyContent));
    assert_eq!(dispatcher.request_rosters(), Err(DroppedReason::NotConnected));
}
