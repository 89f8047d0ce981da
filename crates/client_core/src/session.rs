//! One team's chat session: the single control path that owns the state.
//!
//! Socket events and REST completions arrive on two channels and are handled
//! one at a time by [`ChatSession::pump`]. REST calls run on spawned tasks so
//! they never hold up socket events.

use std::{collections::HashSet, future::Future, sync::Arc};

use anyhow::Result;
use shared::{
    domain::{Attachment, Channel, ChannelId, Message, MessageId, Reactions, UserId},
    error::ApiError,
    protocol::{LinkPreviewResponse, UploadedFile},
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    actions::{ActionDispatcher, OutgoingMessage},
    active_windows::ToggleOutcome,
    api::{ChatApi, FileUpload, HttpChatApi},
    channel_store::MessagePatch,
    config::ClientSettings,
    connection::{ConnectionEvent, ConnectionManager, ConnectionState},
    content,
    context::SessionContext,
    error::{DroppedReason, SessionError},
    forward::PendingForwardSelection,
    router::{self, Routed},
    state::ChatState,
};

/// What the host UI should re-render or report.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    ConnectionChanged(ConnectionState),
    ChannelsChanged,
    MessagesChanged(ChannelId),
    RosterChanged,
    WindowsChanged(Vec<ChannelId>),
    /// Ready to be referenced from [`OutgoingMessage::with_attachments`].
    AttachmentUploaded(Attachment),
    ServerError(ApiError),
    /// The session cannot continue; the host should send the user back to
    /// authentication.
    SessionEnded(SessionError),
    /// A REST collaborator failed; the socket is unaffected.
    CollaboratorFailed {
        operation: &'static str,
        message: String,
    },
}

enum Completion {
    Channels(Result<Vec<Channel>>),
    History {
        channel_id: ChannelId,
        result: Result<Vec<Message>>,
    },
    DirectChannel(Result<Channel>),
    ReactionStored {
        message_id: MessageId,
        action_id: Uuid,
        result: Result<Reactions>,
    },
    Upload(Result<UploadedFile>),
    LinkPreview {
        message_id: MessageId,
        result: Result<LinkPreviewResponse>,
    },
}

pub struct ChatSession {
    context: SessionContext,
    api: Arc<dyn ChatApi>,
    connection: ConnectionManager,
    connection_events: mpsc::UnboundedReceiver<ConnectionEvent>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    dispatcher: ActionDispatcher,
    state: ChatState,
    forward: Option<PendingForwardSelection>,
    events: broadcast::Sender<ClientEvent>,
}

impl ChatSession {
    pub fn new(context: SessionContext, settings: &ClientSettings, api: Arc<dyn ChatApi>) -> Self {
        let (connection, connection_events) = ConnectionManager::new(settings);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(settings.event_buffer.max(1));
        Self {
            dispatcher: ActionDispatcher::new(connection.clone(), context.clone()),
            context,
            api,
            connection,
            connection_events,
            completions_tx,
            completions_rx,
            state: ChatState::new(),
            forward: None,
            events,
        }
    }

    pub fn with_http_api(context: SessionContext, settings: &ClientSettings) -> Self {
        let api = Arc::new(HttpChatApi::new(settings, &context));
        Self::new(context, settings, api)
    }

    /// Opens the socket. An expired token ends the session before it starts.
    pub fn start(&self) -> Result<(), SessionError> {
        info!(
            username = self.context.username(),
            team_id = self.context.team_id().0,
            "starting chat session"
        );
        self.connection.connect(self.context.token())
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Handles exactly one pending input, waiting for one if none is queued.
    /// Returns `false` once no more input can arrive.
    pub async fn pump(&mut self) -> bool {
        tokio::select! {
            Some(event) = self.connection_events.recv() => {
                self.handle_connection_event(event);
                true
            }
            Some(completion) = self.completions_rx.recv() => {
                self.handle_completion(completion);
                true
            }
            else => false,
        }
    }

    pub async fn run(&mut self) {
        while self.pump().await {}
    }

    /// Closes the socket and cancels any pending reconnect.
    pub fn shutdown(&mut self) {
        self.connection.shutdown();
        self.forward = None;
        self.emit(ClientEvent::ConnectionChanged(self.connection.state()));
    }

    // ── windows ─────────────────────────────────────────────────────────

    pub fn toggle_window(&mut self, channel_id: ChannelId) -> Result<ToggleOutcome, DroppedReason> {
        if self.state.channel(channel_id).is_none() {
            return Err(DroppedReason::UnknownChannel(channel_id));
        }
        let outcome = self.state.windows.toggle(channel_id);
        match outcome {
            ToggleOutcome::Added => {
                if !self.state.store.has_channel(channel_id) {
                    self.fetch_history(channel_id);
                }
            }
            ToggleOutcome::Removed => {
                self.state.store.evict(channel_id);
            }
            ToggleOutcome::Ignored => {
                debug!(channel_id = channel_id.0, "window limit reached; toggle ignored");
                return Ok(outcome);
            }
        }
        self.emit_windows();
        Ok(outcome)
    }

    /// Finds or creates the direct channel with `user_id` and opens it.
    pub fn open_direct_channel(&self, user_id: UserId) {
        let team_id = self.context.team_id();
        self.spawn_completion(move |api| async move {
            Completion::DirectChannel(api.create_or_get_dm_channel(team_id, user_id).await)
        });
    }

    // ── actions ─────────────────────────────────────────────────────────

    pub fn send_message(&self, message: OutgoingMessage) -> Result<(), DroppedReason> {
        self.dispatcher.send_message(&self.state, message)
    }

    pub fn edit_message(&self, message_id: MessageId, content: &str) -> Result<(), DroppedReason> {
        self.dispatcher.edit_message(&self.state, message_id, content)
    }

    pub fn delete_message(&self, message_id: MessageId) -> Result<(), DroppedReason> {
        self.dispatcher.delete_message(&self.state, message_id)
    }

    pub fn react(&self, message_id: MessageId, emoji: &str) -> Result<(), DroppedReason> {
        self.dispatcher.react(&self.state, message_id, emoji)
    }

    /// Stores the reaction over REST, applies the response locally and then
    /// announces it on the socket for other clients.
    pub fn react_via_rest(&self, message_id: MessageId, emoji: &str) -> Result<Uuid, DroppedReason> {
        if emoji.trim().is_empty() {
            return Err(DroppedReason::EmptyContent);
        }
        if self.state.store.find(message_id).is_none() {
            return Err(DroppedReason::UnknownMessage(message_id));
        }
        let action_id = Uuid::new_v4();
        let emoji = emoji.to_string();
        self.spawn_completion(move |api| async move {
            Completion::ReactionStored {
                message_id,
                action_id,
                result: api.add_reaction(message_id, &emoji).await,
            }
        });
        Ok(action_id)
    }

    pub fn pin_message(&self, message_id: MessageId) -> Result<(), DroppedReason> {
        self.dispatcher.pin_message(&self.state, message_id)
    }

    pub fn unpin_message(&self, message_id: MessageId) -> Result<(), DroppedReason> {
        self.dispatcher.unpin_message(&self.state, message_id)
    }

    pub fn create_channel(&self, name: &str) -> Result<(), DroppedReason> {
        self.dispatcher.create_channel(name)
    }

    pub fn begin_forward(&mut self, message_id: MessageId) -> Result<(), DroppedReason> {
        let message = self
            .state
            .store
            .find(message_id)
            .ok_or(DroppedReason::UnknownMessage(message_id))?;
        self.forward = Some(PendingForwardSelection::new(message_id, message.content.clone()));
        Ok(())
    }

    pub fn toggle_forward_target(&mut self, channel_id: ChannelId) -> Result<bool, DroppedReason> {
        if self.state.channel(channel_id).is_none() {
            return Err(DroppedReason::UnknownChannel(channel_id));
        }
        let selection = self
            .forward
            .as_mut()
            .ok_or(DroppedReason::NoPendingForward)?;
        Ok(selection.toggle_target(channel_id))
    }

    pub fn forward_selection(&self) -> Option<&PendingForwardSelection> {
        self.forward.as_ref()
    }

    /// Sends the forward. The selection is cleared whether or not it was sent.
    pub fn confirm_forward(&mut self) -> Result<(), DroppedReason> {
        let selection = self.forward.take().ok_or(DroppedReason::NoPendingForward)?;
        info!(
            message_id = selection.message_id().0,
            targets = selection.targets().count(),
            "forwarding message"
        );
        self.dispatcher.forward(selection)
    }

    pub fn cancel_forward(&mut self) {
        self.forward = None;
    }

    pub fn upload_attachment(&self, upload: FileUpload) {
        self.spawn_completion(move |api| async move { Completion::Upload(api.upload_file(upload).await) });
    }

    /// Fetches a preview for the first link in a message. Returns `false` when
    /// the message has no link.
    pub fn request_link_preview(&self, message_id: MessageId) -> Result<bool, DroppedReason> {
        let message = self
            .state
            .store
            .find(message_id)
            .ok_or(DroppedReason::UnknownMessage(message_id))?;
        let Some(url) = content::first_link(&message.content) else {
            return Ok(false);
        };
        self.spawn_completion(move |api| async move {
            Completion::LinkPreview {
                message_id,
                result: api.fetch_link_preview(&url).await,
            }
        });
        Ok(true)
    }

    // ── inbound ─────────────────────────────────────────────────────────

    fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Ready => {
                self.emit(ClientEvent::ConnectionChanged(ConnectionState::Open));
                self.fetch_initial_data();
            }
            ConnectionEvent::Frame(text) => match router::route_frame(&mut self.state, &text) {
                Ok(Routed::ServerError(err)) if err.is_authorization() => {
                    self.end_session(SessionError::Rejected(err))
                }
                Ok(routed) => self.publish(routed),
                Err(err) => warn!("dropping malformed frame: {err}"),
            },
            ConnectionEvent::Closed { reason } => {
                debug!(?reason, "chat connection closed");
                self.emit(ClientEvent::ConnectionChanged(self.connection.state()));
            }
            ConnectionEvent::Error(err) => {
                debug!("chat connection error: {err}");
            }
            ConnectionEvent::AuthExpired => self.end_session(SessionError::TokenExpired),
        }
    }

    /// Closes the connection for good and tells the host why.
    fn end_session(&mut self, reason: SessionError) {
        warn!(username = self.context.username(), "chat session ended: {reason}");
        self.connection.shutdown();
        self.forward = None;
        self.emit(ClientEvent::ConnectionChanged(self.connection.state()));
        self.emit(ClientEvent::SessionEnded(reason));
    }

    /// Channel list, rosters, and fresh history for windows that may have
    /// missed events while the socket was down.
    fn fetch_initial_data(&mut self) {
        let team_id = self.context.team_id();
        self.spawn_completion(move |api| async move {
            Completion::Channels(api.list_channels(team_id).await)
        });
        if let Err(reason) = self.dispatcher.request_rosters() {
            warn!("could not request rosters: {reason}");
        }
        let active: Vec<ChannelId> = self.state.windows.channels().to_vec();
        for channel_id in active {
            self.fetch_history(channel_id);
        }
    }

    /// Over the socket when open, else from the REST listing.
    fn fetch_history(&self, channel_id: ChannelId) {
        let Some(channel) = self.state.channel(channel_id) else {
            warn!(channel_id = channel_id.0, "cannot fetch history for unknown channel");
            return;
        };
        if self.connection.is_open() {
            if let Err(reason) = self.dispatcher.request_history(channel) {
                warn!(channel_id = channel_id.0, "could not request history: {reason}");
            }
            return;
        }
        self.spawn_completion(move |api| async move {
            Completion::History {
                channel_id,
                result: api.list_messages(channel_id).await,
            }
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Channels(Ok(channels)) => {
                info!(count = channels.len(), "channels loaded");
                self.state.set_channels(channels);
                let open: HashSet<ChannelId> =
                    self.state.windows.channels().iter().copied().collect();
                self.state.store.retain_channels(&open);
                self.emit(ClientEvent::ChannelsChanged);
                if let Some(channel_id) = self.state.windows.replace_default(&self.state.channels)
                {
                    self.fetch_history(channel_id);
                    self.emit_windows();
                }
            }
            Completion::Channels(Err(err)) => self.collaborator_failed("list_channels", err),
            Completion::History { channel_id, result } => match result {
                // A window closed while the fetch was in flight keeps nothing.
                Ok(_) if !self.state.windows.contains(channel_id) => {
                    debug!(channel_id = channel_id.0, "discarding history for closed window");
                }
                Ok(messages) => {
                    if self.state.store.replace(channel_id, messages) {
                        self.emit(ClientEvent::MessagesChanged(channel_id));
                    }
                }
                Err(err) => self.collaborator_failed("list_messages", err),
            },
            Completion::DirectChannel(Ok(channel)) => {
                let channel_id = channel.id;
                if self.state.upsert_channel(channel) {
                    self.emit(ClientEvent::ChannelsChanged);
                }
                if !self.state.windows.contains(channel_id) {
                    if let Err(reason) = self.toggle_window(channel_id) {
                        warn!(channel_id = channel_id.0, "could not open direct channel: {reason}");
                    }
                }
            }
            Completion::DirectChannel(Err(err)) => {
                self.collaborator_failed("create_or_get_dm_channel", err)
            }
            Completion::ReactionStored {
                message_id,
                action_id,
                result,
            } => match result {
                Ok(reactions) => {
                    if let Some(channel_id) = self
                        .state
                        .store
                        .patch_by_id(message_id, MessagePatch::Reactions(reactions.clone()))
                    {
                        self.emit(ClientEvent::MessagesChanged(channel_id));
                    }
                    match self
                        .dispatcher
                        .announce_reaction(message_id, reactions, action_id)
                    {
                        Ok(()) => self.state.record_own_action(action_id),
                        Err(reason) => warn!(%action_id, "reaction stored but not announced: {reason}"),
                    }
                }
                Err(err) => self.collaborator_failed("add_reaction", err),
            },
            Completion::Upload(Ok(file)) => {
                info!(file_id = file.id.0, filename = %file.filename, "attachment uploaded");
                self.emit(ClientEvent::AttachmentUploaded(file.into()));
            }
            Completion::Upload(Err(err)) => self.collaborator_failed("upload_file", err),
            Completion::LinkPreview { message_id, result } => match result {
                Ok(preview) => {
                    if let Some(channel_id) = self
                        .state
                        .store
                        .patch_by_id(message_id, MessagePatch::LinkPreview(preview.into()))
                    {
                        self.emit(ClientEvent::MessagesChanged(channel_id));
                    }
                }
                Err(err) => self.collaborator_failed("fetch_link_preview", err),
            },
        }
    }

    fn publish(&self, routed: Routed) {
        match routed {
            Routed::MessagesChanged(channel_id) => {
                self.emit(ClientEvent::MessagesChanged(channel_id))
            }
            Routed::RosterChanged => self.emit(ClientEvent::RosterChanged),
            Routed::ChannelsChanged => self.emit(ClientEvent::ChannelsChanged),
            Routed::ServerError(err) => self.emit(ClientEvent::ServerError(err)),
            Routed::Unchanged | Routed::Dropped(_) => {}
        }
    }

    fn spawn_completion<F, Fut>(&self, work: F)
    where
        F: FnOnce(Arc<dyn ChatApi>) -> Fut,
        Fut: Future<Output = Completion> + Send + 'static,
    {
        let pending = work(Arc::clone(&self.api));
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            // The session may be gone by now; its result is discarded then.
            let _ = completions.send(pending.await);
        });
    }

    fn collaborator_failed(&self, operation: &'static str, err: anyhow::Error) {
        warn!(operation, "chat api call failed: {err:#}");
        self.emit(ClientEvent::CollaboratorFailed {
            operation,
            message: format!("{err:#}"),
        });
    }

    fn emit_windows(&self) {
        self.emit(ClientEvent::WindowsChanged(
            self.state.windows.channels().to_vec(),
        ));
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.connection.shutdown();
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
