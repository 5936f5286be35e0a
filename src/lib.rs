pub mod error;
pub mod logo;
pub mod m3u;
pub mod metrics;
pub mod player;
pub mod playlist;
pub mod session;
pub mod settings;
pub mod thumbnail;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use player::Player;
use playlist::PlaylistEntry;
use serde::Serialize;
use session::{Session, ThumbnailLookup};
use tracing::{error, info, warn};

struct AppState {
    session: Mutex<Session>,
    player: tokio::sync::Mutex<Player>,
}

impl AppState {
    fn session(&self) -> std::sync::MutexGuard<'_, Session> {
        // Poisoning is ignored, the playlist is never left half-written.
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn create_app(session: Session, player: Player) -> Router {
    let state = Arc::new(AppState {
        session: Mutex::new(session),
        player: tokio::sync::Mutex::new(player),
    });

    Router::new()
        .route("/", get(index_handler))
        .route("/group/{g}", get(group_handler))
        .route("/logo/{g}/{c}", get(logo_handler))
        .route("/api/groups", get(groups_api_handler))
        .route("/api/groups/{g}/channels", get(channels_api_handler))
        .route("/play/{g}/{c}", post(play_handler))
        .route("/stop", post(stop_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler(method: Method, uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("<none>");
    info!(
        "HTTP 404: method={} uri={} UA=\"{}\"",
        method,
        uri,
        user_agent
    );
    (StatusCode::NOT_FOUND, "Not found")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE_STYLE: &str = r#"
        <style>
            :root {
                --bg-color: #0d0d0d;
                --card-bg: #1a1a1a;
                --text-main: #ffffff;
                --text-muted: #a0a0a0;
            }
            body {
                font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
                margin: 0; padding: 20px;
                background: var(--bg-color); color: var(--text-main);
            }
            header { padding: 10px 0 30px; text-align: center; }
            h1 { font-size: 2rem; margin: 0; font-weight: 700; }
            a { color: var(--text-main); }
            .grid {
                display: grid;
                grid-template-columns: repeat(auto-fill, minmax(160px, 1fr));
                gap: 16px;
                max-width: 1200px; margin: 0 auto;
            }
            .card {
                background: var(--card-bg);
                padding: 20px;
                border-radius: 12px;
                text-decoration: none;
                display: flex; flex-direction: column; align-items: center; justify-content: center;
                text-align: center;
                border: 1px solid rgba(255,255,255,0.05);
            }
            .card:hover { background: #252525; border-color: rgba(255,255,255,0.2); }
            .card button { background: none; border: none; color: inherit; font: inherit; cursor: pointer; }
            .card-name { font-weight: 600; font-size: 1.1rem; margin-top: 10px; }
            .card-count { color: var(--text-muted); font-size: 0.9rem; }
        </style>
"#;

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="UTF-8">
        <meta name="viewport" content="width=device-width, initial-scale=1.0">
        <title>{title}</title>
{PAGE_STYLE}
    </head>
    <body>
        <header><h1>{title}</h1></header>
{body}
    </body>
</html>
"#,
        title = escape_html(title),
    ))
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let mut body = String::from(r#"        <div class="grid">"#);
    {
        let session = state.session();
        for (i, group) in session.playlist().groups().iter().enumerate() {
            let name = if group.name().is_empty() { "Uncategorized" } else { group.name() };
            body.push_str(&format!(
                r#"
            <a href="/group/{}" class="card">
                <div class="card-name">{}</div>
                <div class="card-count">{} channels</div>
            </a>"#,
                i,
                escape_html(name),
                group.len()
            ));
        }
    }
    body.push_str("\n        </div>");
    page("Channels", &body)
}

async fn group_handler(Path(g): Path<usize>, State(state): State<Arc<AppState>>) -> Response {
    let session = state.session();
    let Some(group) = session.playlist().group(g) else {
        return (StatusCode::NOT_FOUND, "Group not found").into_response();
    };

    let mut body = String::from(
        r#"        <p><a href="/">&larr; Categories</a></p>
        <div class="grid">"#,
    );
    for (c, entry) in group.entries().iter().enumerate() {
        body.push_str(&format!(
            r#"
            <form method="post" action="/play/{g}/{c}" class="card">
                <button type="submit">
                    <img src="/logo/{g}/{c}" width="80" height="80" alt="">
                    <div class="card-name">{}</div>
                </button>
            </form>"#,
            escape_html(entry.name())
        ));
    }
    body.push_str(
        r#"
        </div>
        <form method="post" action="/stop"><button type="submit">Stop</button></form>"#,
    );
    page(group.name(), &body).into_response()
}

/// The session lock is only held to look up and to store the thumbnail.
/// The download and decode run on the blocking pool without it, so a slow
/// logo server never stalls the other routes.
async fn logo_handler(
    Path((g, c)): Path<(usize, usize)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let lookup = state.session().lookup_thumbnail(g, c);
    let image = match lookup {
        None => return (StatusCode::NOT_FOUND, "Channel not found").into_response(),
        Some(ThumbnailLookup::Ready(image)) => image,
        Some(ThumbnailLookup::Placeholder) => thumbnail::placeholder(),
        Some(ThumbnailLookup::Fetch(url)) => {
            let logos = state.session().logos();
            let result = tokio::task::spawn_blocking(move || thumbnail::load_thumbnail(&logos, &url)).await;
            let result = match result {
                Ok(result) => result,
                Err(e) => {
                    error!("Thumbnail task for {}/{} failed: {}", g, c, e);
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };
            let stored = state.session().store_thumbnail(g, c, result);
            stored.unwrap_or_else(thumbnail::placeholder)
        }
    };

    match thumbnail::encode_png(&image) {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e) => {
            error!("Failed to encode thumbnail for {}/{}: {}", g, c, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Serialize)]
struct GroupSummary {
    index: usize,
    name: String,
    channels: usize,
}

async fn groups_api_handler(State(state): State<Arc<AppState>>) -> Json<Vec<GroupSummary>> {
    let session = state.session();
    Json(
        session
            .playlist()
            .groups()
            .iter()
            .enumerate()
            .map(|(index, g)| GroupSummary {
                index,
                name: g.name().to_string(),
                channels: g.len(),
            })
            .collect(),
    )
}

#[derive(Serialize)]
struct ChannelSummary {
    index: usize,
    name: String,
    logo_url: String,
    url: String,
}

impl ChannelSummary {
    fn new(index: usize, entry: &PlaylistEntry) -> Self {
        Self {
            index,
            name: entry.name().to_string(),
            logo_url: entry.logo_url().to_string(),
            url: entry.url().to_string(),
        }
    }
}

async fn channels_api_handler(
    Path(g): Path<usize>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ChannelSummary>>, StatusCode> {
    let session = state.session();
    let group = session.playlist().group(g).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(
        group
            .entries()
            .iter()
            .enumerate()
            .map(|(i, e)| ChannelSummary::new(i, e))
            .collect(),
    ))
}

async fn play_handler(
    Path((g, c)): Path<(usize, usize)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let url = match state.session().select(g, c) {
        Ok(entry) => {
            info!("Selected channel {} ({}/{})", entry.name(), g, c);
            entry.url().to_string()
        }
        Err(e) => return (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    };

    let mut player = state.player.lock().await;
    match player.play(&url).await {
        Ok(play_state) => Json(play_state).into_response(),
        Err(e) => {
            warn!("Playback of {} failed: {}", url, e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

async fn stop_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.player.lock().await.stop().await;
    StatusCode::NO_CONTENT
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}
