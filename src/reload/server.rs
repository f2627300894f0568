// src/reload/server.rs

//! Dev server: static files from the output root plus the live-reload
//! endpoints. HTML pages get the reload client injected before `</body>`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::stream::Stream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use super::notifier::ReloadNotifier;

pub const EVENTS_PATH: &str = "/__assetdag/events";
pub const CLIENT_PATH: &str = "/__assetdag/livereload.js";

const CLIENT_JS: &str = r#"(function () {
  var source = new EventSource("/__assetdag/events");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
  source.addEventListener("css", function () {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    for (var i = 0; i < links.length; i++) {
      var url = new URL(links[i].href);
      url.searchParams.set("__assetdag", Date.now().toString());
      links[i].href = url.toString();
    }
  });
})();
"#;

#[derive(Debug, Clone)]
struct ServerState {
    notifier: ReloadNotifier,
}

/// Router serving `dest` with live reload.
pub fn router(dest: &Path, notifier: ReloadNotifier) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(events_handler))
        .route(CLIENT_PATH, get(client_handler))
        .fallback_service(ServeDir::new(dest).append_index_html_on_directories(true))
        .layer(middleware::from_fn(inject_client))
        .with_state(ServerState { notifier })
}

/// Bind `host:port` and serve in a background task.
///
/// Binding happens before returning so a taken port is reported right away.
pub fn spawn_server(
    host: &str,
    port: u16,
    dest: &Path,
    notifier: ReloadNotifier,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = std::net::TcpListener::bind((host, port))
        .with_context(|| format!("binding dev server to {host}:{port}"))?;
    listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(listener)?;
    let addr = listener.local_addr()?;

    let app = router(dest, notifier);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "dev server stopped");
        }
    });

    info!(url = %format!("http://{addr}"), dir = ?dest, "serving output directory");
    Ok((addr, handle))
}

async fn events_handler(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.notifier.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(signal) => {
                    yield Ok(Event::default().event(signal.event_name()).data("{}"));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "reload client lagged; forcing a full reload");
                    yield Ok(Event::default().event("reload").data("{}"));
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn client_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}

/// Insert the reload client into successful HTML responses.
async fn inject_client(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response.status() == StatusCode::OK
        && response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to buffer HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Add the client `<script>` before the last `</body>`, or at the end.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => format!("{}{}{}", &html[..at], tag, &html[at..]),
        None => format!("{html}{tag}"),
    }
}
