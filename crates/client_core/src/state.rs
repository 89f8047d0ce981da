use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use shared::domain::{
    Channel, ChannelId, InteractedUser, PresenceStatus, TeamMember, UserId,
};
use uuid::Uuid;

use crate::{active_windows::ActiveWindowSet, channel_store::ChannelStore};

/// Announced actions remembered while their echo is outstanding. Echoes that
/// never arrive age out once this many newer actions are recorded.
pub const MAX_OWN_ACTIONS: usize = 64;

/// Team members and previously-interacted users.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Roster {
    pub team_members: Vec<TeamMember>,
    pub interacted_users: Vec<InteractedUser>,
}

impl Roster {
    /// The other participant of a direct-message channel.
    pub fn recipient_for(&self, channel_id: ChannelId) -> Option<UserId> {
        self.interacted_users
            .iter()
            .find(|user| user.channel_id == Some(channel_id))
            .map(|user| user.id)
    }

    pub fn display_name(&self, user_id: UserId) -> Option<&str> {
        self.team_members
            .iter()
            .find(|member| member.id == user_id)
            .map(|member| member.username.as_str())
            .or_else(|| {
                self.interacted_users
                    .iter()
                    .find(|user| user.id == user_id)
                    .map(|user| user.username.as_str())
            })
    }

    pub fn apply_presence(
        &mut self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen: Option<DateTime<Utc>>,
    ) -> bool {
        let mut changed = false;
        for member in self.team_members.iter_mut().filter(|m| m.id == user_id) {
            if member.status != status || (last_seen.is_some() && member.last_seen != last_seen) {
                member.status = status;
                member.last_seen = last_seen.or(member.last_seen);
                changed = true;
            }
        }
        for user in self.interacted_users.iter_mut().filter(|u| u.id == user_id) {
            if user.status != status || (last_seen.is_some() && user.last_seen != last_seen) {
                user.status = status;
                user.last_seen = last_seen.or(user.last_seen);
                changed = true;
            }
        }
        changed
    }
}

/// Everything the session knows about the team's channels and messages.
///
/// Only the event router and the session's action paths write to it.
#[derive(Debug, Default)]
pub struct ChatState {
    pub(crate) store: ChannelStore,
    pub(crate) windows: ActiveWindowSet,
    pub(crate) channels: Vec<Channel>,
    pub(crate) roster: Roster,
    own_actions: VecDeque<Uuid>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &ChannelStore {
        &self.store
    }

    pub fn windows(&self) -> &ActiveWindowSet {
        &self.windows
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn channel(&self, channel_id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.id == channel_id)
    }

    pub(crate) fn set_channels(&mut self, channels: Vec<Channel>) {
        self.channels = channels;
    }

    /// Adds the channel if unknown, or refreshes its name and membership.
    pub(crate) fn upsert_channel(&mut self, channel: Channel) -> bool {
        match self.channels.iter_mut().find(|known| known.id == channel.id) {
            Some(known) if *known == channel => false,
            Some(known) => {
                *known = channel;
                true
            }
            None => {
                self.channels.push(channel);
                true
            }
        }
    }

    pub(crate) fn record_own_action(&mut self, action_id: Uuid) {
        if self.own_actions.len() == MAX_OWN_ACTIONS {
            self.own_actions.pop_front();
        }
        self.own_actions.push_back(action_id);
    }

    /// True exactly once for an action this client issued.
    pub(crate) fn take_own_action(&mut self, action_id: Uuid) -> bool {
        match self.own_actions.iter().position(|id| *id == action_id) {
            Some(index) => self.own_actions.remove(index).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
