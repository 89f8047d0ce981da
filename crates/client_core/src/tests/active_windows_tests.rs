use super::*;

fn channel(id: i64, direct: bool) -> Channel {
    Channel {
        id: ChannelId(id),
        name: format!("channel-{id}"),
        members: Vec::new(),
        is_direct_message: direct,
    }
}

#[test]
fn toggle_adds_then_removes() {
    let mut windows = ActiveWindowSet::new();
    assert_eq!(windows.toggle(ChannelId(1)), ToggleOutcome::Added);
    assert!(windows.contains(ChannelId(1)));
    assert_eq!(windows.toggle(ChannelId(1)), ToggleOutcome::Removed);
    assert!(windows.is_empty());
}

#[test]
fn fourth_channel_is_ignored_when_full() {
    let mut windows = ActiveWindowSet::new();
    for id in 1..=3 {
        assert_eq!(windows.toggle(ChannelId(id)), ToggleOutcome::Added);
    }
    assert!(windows.is_full());

    assert_eq!(windows.toggle(ChannelId(4)), ToggleOutcome::Ignored);
    assert_eq!(windows.channels(), &[ChannelId(1), ChannelId(2), ChannelId(3)]);

    assert_eq!(windows.toggle(ChannelId(2)), ToggleOutcome::Removed);
    assert_eq!(windows.toggle(ChannelId(4)), ToggleOutcome::Added);
    assert_eq!(windows.channels(), &[ChannelId(1), ChannelId(3), ChannelId(4)]);
    assert_eq!(windows.len(), MAX_ACTIVE_WINDOWS);
}

#[test]
fn default_prefers_first_group_channel() {
    let mut windows = ActiveWindowSet::new();
    let channels = vec![channel(9, true), channel(4, false), channel(5, false)];

    assert_eq!(windows.replace_default(&channels), Some(ChannelId(4)));
    assert_eq!(windows.channels(), &[ChannelId(4)]);
}

#[test]
fn default_falls_back_to_a_direct_channel() {
    let mut windows = ActiveWindowSet::new();
    assert_eq!(windows.replace_default(&[channel(9, true)]), Some(ChannelId(9)));
}

#[test]
fn default_leaves_an_open_set_alone() {
    let mut windows = ActiveWindowSet::new();
    windows.toggle(ChannelId(7));

    assert_eq!(windows.replace_default(&[channel(4, false)]), None);
    assert_eq!(windows.channels(), &[ChannelId(7)]);
    assert_eq!(ActiveWindowSet::new().replace_default(&[]), None);
}
