//! Client core for team chat: one socket per session, per-channel message
//! lists, and the actions a user can take against them.

pub mod actions;
pub mod active_windows;
pub mod api;
pub mod channel_store;
pub mod config;
pub mod connection;
pub mod content;
pub mod context;
pub mod error;
pub mod forward;
pub mod router;
pub mod session;
pub mod state;

pub use actions::{ActionDispatcher, OutgoingMessage};
pub use active_windows::{ActiveWindowSet, ToggleOutcome, MAX_ACTIVE_WINDOWS};
pub use api::{ChatApi, FileUpload, HttpChatApi, MissingChatApi};
pub use channel_store::{ChannelStore, MessagePatch};
pub use config::{load_settings, ClientSettings};
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use context::SessionContext;
pub use error::{DroppedReason, ProtocolError, SessionError};
pub use forward::PendingForwardSelection;
pub use router::{DropCause, Routed};
pub use session::{ChatSession, ClientEvent};
pub use state::{ChatState, Roster};
