use std::collections::BTreeSet;

use shared::{
    domain::{ChannelId, MessageId},
    protocol::ClientRequest,
};

use crate::error::DroppedReason;

/// Targets chosen for one forward action while the forward dialog is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingForwardSelection {
    message_id: MessageId,
    content: String,
    targets: BTreeSet<ChannelId>,
}

impl PendingForwardSelection {
    pub fn new(message_id: MessageId, content: impl Into<String>) -> Self {
        Self {
            message_id,
            content: content.into(),
            targets: BTreeSet::new(),
        }
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns whether the channel is selected after the toggle.
    pub fn toggle_target(&mut self, channel_id: ChannelId) -> bool {
        if self.targets.remove(&channel_id) {
            false
        } else {
            self.targets.insert(channel_id);
            true
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.targets.iter().copied()
    }

    pub fn into_request(self) -> Result<ClientRequest, DroppedReason> {
        if self.targets.is_empty() {
            return Err(DroppedReason::NoForwardTargets);
        }
        Ok(ClientRequest::ForwardMessage {
            content: self.content,
            channel_ids: self.targets.into_iter().collect(),
        })
    }
}

#[cfg(test)]
#[path = "tests/forward_tests.rs"]
mod tests;
