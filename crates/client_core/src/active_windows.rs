use shared::domain::{Channel, ChannelId};

/// Most channels a user can watch side by side.
pub const MAX_ACTIVE_WINDOWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Already at capacity; nothing changed.
    Ignored,
}

/// Channels currently materialized to the user, in the order they were opened.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActiveWindowSet {
    windows: Vec<ChannelId>,
}

impl ActiveWindowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, channel_id: ChannelId) -> ToggleOutcome {
        if let Some(index) = self.windows.iter().position(|id| *id == channel_id) {
            self.windows.remove(index);
            return ToggleOutcome::Removed;
        }
        if self.windows.len() >= MAX_ACTIVE_WINDOWS {
            return ToggleOutcome::Ignored;
        }
        self.windows.push(channel_id);
        ToggleOutcome::Added
    }

    /// Seeds the first window at startup: the first group channel, else the
    /// first channel of any kind. Leaves a non-empty set untouched.
    pub fn replace_default(&mut self, channels: &[Channel]) -> Option<ChannelId> {
        if !self.windows.is_empty() {
            return None;
        }
        let chosen = channels
            .iter()
            .find(|channel| !channel.is_direct_message)
            .or_else(|| channels.first())?;
        self.windows.push(chosen.id);
        Some(chosen.id)
    }

    pub fn contains(&self, channel_id: ChannelId) -> bool {
        self.windows.contains(&channel_id)
    }

    /// Number of windows the UI lays out (0 until channels load).
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.windows.len() >= MAX_ACTIVE_WINDOWS
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.windows
    }
}

#[cfg(test)]
#[path = "tests/active_windows_tests.rs"]
mod tests;
