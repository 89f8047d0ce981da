use super::*;
use shared::domain::InteractedUser;

#[test]
fn own_action_is_taken_exactly_once() {
    let mut state = ChatState::new();
    let action_id = Uuid::new_v4();

    state.record_own_action(action_id);

    assert!(state.take_own_action(action_id));
    assert!(!state.take_own_action(action_id));
    assert!(!state.take_own_action(Uuid::new_v4()));
}

#[test]
fn unechoed_actions_age_out_past_the_cap() {
    let mut state = ChatState::new();
    let actions: Vec<Uuid> = (0..=MAX_OWN_ACTIONS).map(|_| Uuid::new_v4()).collect();

    for action_id in &actions {
        state.record_own_action(*action_id);
    }

    assert_eq!(state.own_actions.len(), MAX_OWN_ACTIONS);
    assert!(!state.take_own_action(actions[0]));
    assert!(state.take_own_action(actions[1]));
    assert!(state.take_own_action(actions[MAX_OWN_ACTIONS]));
    assert_eq!(state.own_actions.len(), MAX_OWN_ACTIONS - 2);
}

#[test]
fn recipient_is_found_by_direct_channel() {
    let roster = Roster {
        team_members: Vec::new(),
        interacted_users: vec![InteractedUser {
            id: UserId(7),
            username: "bob".into(),
            channel_id: Some(ChannelId(20)),
            status: PresenceStatus::default(),
            last_seen: None,
        }],
    };

    assert_eq!(roster.recipient_for(ChannelId(20)), Some(UserId(7)));
    assert_eq!(roster.recipient_for(ChannelId(21)), None);
    assert_eq!(roster.display_name(UserId(7)), Some("bob"));
}
