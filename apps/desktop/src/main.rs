use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use client_core::{
    config::apply_file, load_settings, ChatSession, ClientEvent, OutgoingMessage,
    SessionContext, ToggleOutcome,
};
use shared::domain::{ChannelId, TeamId};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    token: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    team_id: i64,
    /// Extra settings file applied after `client.toml`.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    ws_url: Option<String>,
    /// Channel to open and post `--message` into.
    #[arg(long)]
    channel_id: Option<i64>,
    #[arg(long, requires = "channel_id")]
    message: Option<String>,
    /// GIF link appended to `--message`.
    #[arg(long, requires = "message")]
    gif: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(path) = &args.config {
        apply_file(&mut settings, path)?;
    }
    if let Some(api_url) = args.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(ws_url) = args.ws_url {
        settings.ws_base_url = ws_url;
    }

    let context = SessionContext::new(args.token, args.username, TeamId(args.team_id))?;
    let mut session = ChatSession::with_http_api(context, &settings);
    let mut events = session.subscribe_events();
    session.start()?;

    let target = args.channel_id.map(ChannelId);
    let mut pending_message = target.zip(args.message).map(|(channel_id, text)| {
        let message = OutgoingMessage::text(channel_id, text);
        match &args.gif {
            Some(gif_url) => message.with_gif(gif_url),
            None => message,
        }
    });

    'session: loop {
        tokio::select! {
            alive = session.pump() => {
                if !alive {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; closing chat session");
                break;
            }
        }

        while let Ok(event) = events.try_recv() {
            match &event {
                ClientEvent::ChannelsChanged => {
                    let Some(channel_id) = target else { continue };
                    if session.state().windows().contains(channel_id) {
                        continue;
                    }
                    match session.toggle_window(channel_id) {
                        Ok(ToggleOutcome::Ignored) => warn!(%channel_id, "no free window"),
                        Ok(_) => {}
                        Err(reason) => warn!(%channel_id, "cannot open channel: {reason}"),
                    }
                }
                ClientEvent::MessagesChanged(channel_id) => {
                    let messages = session.state().store().messages(*channel_id);
                    if let Some(last) = messages.last() {
                        info!(
                            %channel_id,
                            count = messages.len(),
                            "{}: {}",
                            last.sender,
                            last.content
                        );
                    }
                    if Some(*channel_id) == target {
                        if let Some(message) = pending_message.take() {
                            if let Err(reason) = session.send_message(message) {
                                warn!(%channel_id, "message not sent: {reason}");
                            }
                        }
                    }
                }
                ClientEvent::SessionEnded(reason) => {
                    error!("chat session ended: {reason}");
                    break 'session;
                }
                other => info!(event = ?other, "chat event"),
            }
        }
    }

    session.shutdown();
    Ok(())
}
