//! Per-channel message lists.
//!
//! Every mutation is idempotent: applying the same operation twice leaves the
//! store exactly as applying it once, and operations on unknown ids are no-ops.

use std::collections::{HashMap, HashSet};

use shared::domain::{ChannelId, LinkPreview, Message, MessageId, Reactions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePatch {
    Reactions(Reactions),
    /// Pinning a message unpins every other message in its channel.
    Pinned(bool),
    /// New content; marks the message edited.
    Content(String),
    LinkPreview(LinkPreview),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChannelStore {
    lists: HashMap<ChannelId, Vec<Message>>,
}

impl ChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a channel's whole history. Duplicate ids in `messages` keep the
    /// position of the first occurrence and the contents of the last.
    ///
    /// Returns `true` when the stored list changed.
    pub fn replace(&mut self, channel_id: ChannelId, messages: Vec<Message>) -> bool {
        let mut deduped: Vec<Message> = Vec::with_capacity(messages.len());
        let mut positions: HashMap<MessageId, usize> = HashMap::new();
        for message in messages {
            match positions.get(&message.id) {
                Some(&index) => deduped[index] = message,
                None => {
                    positions.insert(message.id, deduped.len());
                    deduped.push(message);
                }
            }
        }

        if self.lists.get(&channel_id) == Some(&deduped) {
            return false;
        }
        self.lists.insert(channel_id, deduped);
        true
    }

    /// Appends at the tail. A message whose id is already present is updated
    /// in place instead of duplicated.
    pub fn append(&mut self, channel_id: ChannelId, message: Message) -> bool {
        let list = self.lists.entry(channel_id).or_default();
        match list.iter_mut().find(|existing| existing.id == message.id) {
            Some(existing) if *existing == message => false,
            Some(existing) => {
                *existing = message;
                true
            }
            None => {
                list.push(message);
                true
            }
        }
    }

    /// Removes the message from whichever channel holds it.
    pub fn remove_by_id(&mut self, message_id: MessageId) -> Option<ChannelId> {
        let mut affected = None;
        for (channel_id, list) in self.lists.iter_mut() {
            let before = list.len();
            list.retain(|message| message.id != message_id);
            if list.len() != before {
                affected = Some(*channel_id);
            }
        }
        affected
    }

    /// Applies `patch` to the message with `message_id`.
    ///
    /// Returns the owning channel when something actually changed.
    pub fn patch_by_id(&mut self, message_id: MessageId, patch: MessagePatch) -> Option<ChannelId> {
        let channel_id = self.channel_of(message_id)?;
        let list = self.lists.get_mut(&channel_id)?;
        let mut changed = false;

        match patch {
            MessagePatch::Pinned(pinned) => {
                for message in list.iter_mut() {
                    let want = if message.id == message_id {
                        pinned
                    } else if pinned {
                        false
                    } else {
                        message.is_pinned
                    };
                    if message.is_pinned != want {
                        message.is_pinned = want;
                        changed = true;
                    }
                }
            }
            patch => {
                let message = list.iter_mut().find(|message| message.id == message_id)?;
                changed = apply_field_patch(message, patch);
            }
        }

        changed.then_some(channel_id)
    }

    /// The single pinned message of a channel, if any.
    pub fn pinned_of(&self, channel_id: ChannelId) -> Option<&Message> {
        self.lists
            .get(&channel_id)?
            .iter()
            .find(|message| message.is_pinned)
    }

    pub fn messages(&self, channel_id: ChannelId) -> &[Message] {
        self.lists
            .get(&channel_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_channel(&self, channel_id: ChannelId) -> bool {
        self.lists.contains_key(&channel_id)
    }

    pub fn find(&self, message_id: MessageId) -> Option<&Message> {
        self.lists
            .values()
            .flat_map(|list| list.iter())
            .find(|message| message.id == message_id)
    }

    pub fn channel_of(&self, message_id: MessageId) -> Option<ChannelId> {
        self.lists
            .iter()
            .find(|(_, list)| list.iter().any(|message| message.id == message_id))
            .map(|(channel_id, _)| *channel_id)
    }

    /// Drops a channel's history so the next activation fetches it fresh.
    pub fn evict(&mut self, channel_id: ChannelId) -> bool {
        self.lists.remove(&channel_id).is_some()
    }

    /// Keeps only the channels in `keep`.
    pub fn retain_channels(&mut self, keep: &HashSet<ChannelId>) {
        self.lists.retain(|channel_id, _| keep.contains(channel_id));
    }

    /// Case-insensitive match on content or sender name, in channel order.
    pub fn search(&self, channel_id: ChannelId, query: &str) -> Vec<&Message> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.messages(channel_id)
            .iter()
            .filter(|message| {
                message.content.to_lowercase().contains(&needle)
                    || message.sender.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

fn apply_field_patch(message: &mut Message, patch: MessagePatch) -> bool {
    match patch {
        MessagePatch::Reactions(reactions) => {
            if message.reactions == reactions {
                return false;
            }
            message.reactions = reactions;
        }
        MessagePatch::Content(content) => {
            if message.content == content && message.is_edited {
                return false;
            }
            message.content = content;
            message.is_edited = true;
        }
        MessagePatch::LinkPreview(preview) => {
            if message.link_preview.as_ref() == Some(&preview) {
                return false;
            }
            message.link_preview = Some(preview);
        }
        MessagePatch::Pinned(pinned) => {
            if message.is_pinned == pinned {
                return false;
            }
            message.is_pinned = pinned;
        }
    }
    true
}

#[cfg(test)]
#[path = "tests/channel_store_tests.rs"]
mod tests;
