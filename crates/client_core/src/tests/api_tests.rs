use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    auth_headers: Arc<Mutex<Vec<String>>>,
    reaction_bodies: Arc<Mutex<Vec<Value>>>,
    uploads: Arc<Mutex<Vec<(HashMap<String, String>, usize)>>>,
}

impl ServerState {
    async fn record_auth(&self, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.auth_headers.lock().await.push(auth);
    }
}

async fn team_channels(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.record_auth(&headers).await;
    assert_eq!(body, json!({"team_id": 11}));
    Json(json!([
        {"id": 1, "name": "general", "members": [1, 2], "is_direct_message": false},
        {"id": 2, "name": "bob", "is_direct_message": true},
    ]))
}

async fn direct_channel(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "id": 40,
        "name": format!("dm-{}", body["user_id"]),
        "members": [1, body["user_id"]],
        "is_direct_message": true,
    }))
}

async fn channel_messages(Path(channel_id): Path<i64>) -> Result<Json<Value>, StatusCode> {
    if channel_id != 1 {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!([
        {"id": 10, "channel_id": 1, "sender": "alice", "content": "hi", "timestamp": "2024-01-01T00:00:00Z"},
    ])))
}

async fn add_reaction(
    State(state): State<ServerState>,
    Path(message_id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.reaction_bodies.lock().await.push(body.clone());
    Json(json!({"message_id": message_id, "reactions": {"alice": body["reaction"]}}))
}

async fn upload(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Json<Value> {
    let filename = query.get("filename").cloned().unwrap_or_default();
    state.uploads.lock().await.push((query, body.len()));
    Json(json!({"id": 77, "filename": filename, "url": "/files/77", "size": body.len()}))
}

async fn link_preview(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "url": query.get("url").cloned().unwrap_or_default(),
        "title": "Example Domain",
    }))
}

async fn spawn_api_server() -> anyhow::Result<(ClientSettings, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/chat/channels/team_id/", post(team_channels))
        .route(
            "/api/chat/channels/create_or_get_dm_channel/",
            post(direct_channel),
        )
        .route("/api/chat/channels/:channel_id/messages/", get(channel_messages))
        .route("/api/chat/messages/:message_id/reactions/", post(add_reaction))
        .route("/api/chat/files/upload/", post(upload))
        .route("/api/chat/link-preview/", get(link_preview))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let settings = ClientSettings {
        api_base_url: format!("http://{addr}/api/chat"),
        ..ClientSettings::default()
    };
    Ok((settings, state))
}

fn api_for(settings: &ClientSettings) -> HttpChatApi {
    let context = SessionContext::new("test-token", "alice", TeamId(11)).expect("context");
    HttpChatApi::new(settings, &context)
}

#[tokio::test]
async fn list_channels_posts_team_id_with_bearer_token() {
    let (settings, server) = spawn_api_server().await.expect("spawn server");
    let api = api_for(&settings);

    let channels = api.list_channels(TeamId(11)).await.expect("channels");

    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0].members, vec![UserId(1), UserId(2)]);
    assert!(channels[1].is_direct_message);
    assert_eq!(
        server.auth_headers.lock().await.as_slice(),
        ["Bearer test-token".to_string()]
    );
}

#[tokio::test]
async fn create_or_get_dm_channel_returns_direct_channel() {
    let (settings, _server) = spawn_api_server().await.expect("spawn server");
    let channel = api_for(&settings)
        .create_or_get_dm_channel(TeamId(11), UserId(9))
        .await
        .expect("channel");

    assert_eq!(channel.id, ChannelId(40));
    assert!(channel.is_direct_message);
    assert_eq!(channel.members, vec![UserId(1), UserId(9)]);
}

#[tokio::test]
async fn list_messages_surfaces_http_errors() {
    let (settings, _server) = spawn_api_server().await.expect("spawn server");
    let api = api_for(&settings);

    let messages = api.list_messages(ChannelId(1)).await.expect("messages");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, MessageId(10));

    let err = api
        .list_messages(ChannelId(5))
        .await
        .expect_err("unknown channel must fail");
    assert!(err.to_string().contains("404"), "unexpected error: {err}");
}

#[tokio::test]
async fn add_reaction_returns_full_reactions_map() {
    let (settings, server) = spawn_api_server().await.expect("spawn server");
    let reactions = api_for(&settings)
        .add_reaction(MessageId(10), "🎉")
        .await
        .expect("reaction");

    assert_eq!(reactions.get("alice").map(String::as_str), Some("🎉"));
    assert_eq!(
        server.reaction_bodies.lock().await.as_slice(),
        [json!({"reaction": "🎉"})]
    );
}

#[tokio::test]
async fn upload_file_sends_raw_body_and_metadata() {
    let (settings, server) = spawn_api_server().await.expect("spawn server");
    let uploaded = api_for(&settings)
        .upload_file(FileUpload {
            filename: "notes.txt".into(),
            content_type: None,
            bytes: b"hello world".to_vec(),
        })
        .await
        .expect("upload");

    assert_eq!(uploaded.id, shared::domain::FileId(77));
    assert_eq!(uploaded.size, 11);
    let uploads = server.uploads.lock().await;
    let (query, len) = &uploads[0];
    assert_eq!(query.get("filename").map(String::as_str), Some("notes.txt"));
    assert_eq!(
        query.get("content_type").map(String::as_str),
        Some("application/octet-stream")
    );
    assert_eq!(*len, 11);
}

#[tokio::test]
async fn fetch_link_preview_passes_url() {
    let (settings, _server) = spawn_api_server().await.expect("spawn server");
    let url = Url::parse("https://example.com/page").expect("url");
    let preview = api_for(&settings)
        .fetch_link_preview(&url)
        .await
        .expect("preview");

    assert_eq!(preview.url, "https://example.com/page");
    assert_eq!(preview.title.as_deref(), Some("Example Domain"));
}

#[tokio::test]
async fn missing_api_fails_every_call() {
    let api = MissingChatApi;
    assert!(api.list_channels(TeamId(1)).await.is_err());
    let err = api
        .list_messages(ChannelId(3))
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("channel 3"));
}
