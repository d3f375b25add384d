//! Development server: static build output plus live reload.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeDir;

use crate::reload::{client_script, ReloadHub, ReloadMessage, CLIENT_PATH, WS_PATH};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory to serve, usually the build root
    pub root: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open a browser once listening
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("build"),
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

/// Errors that can occur with the server or watcher.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("File watch error: {0}")]
    Watch(String),
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    hub: ReloadHub,
}

impl DevServer {
    pub fn new(config: DevServerConfig, hub: ReloadHub) -> Self {
        Self { config, hub }
    }

    /// Serve until the process ends.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                message: e.to_string(),
            })?;

        let local: SocketAddr = listener.local_addr().map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            message: e.to_string(),
        })?;
        let url = format!("http://{}", local);
        tracing::info!("Serving {} at {}", self.config.root.display(), url);

        if self.config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, router(&self.config.root, self.hub))
            .await
            .map_err(|e| ServerError::Bind {
                addr,
                message: e.to_string(),
            })
    }
}

/// Routes: the reload socket, the client script, then files from `root`.
pub fn router(root: &Path, hub: ReloadHub) -> Router {
    Router::new()
        .route(WS_PATH, get(ws_handler))
        .route(CLIENT_PATH, get(client_handler))
        .fallback_service(ServeDir::new(root))
        .layer(middleware::from_fn(inject_client))
        .with_state(hub)
}

/// Insert the client script tag before the last `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..at]);
            out.push_str(&tag);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

async fn inject_client(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if response.status() != StatusCode::OK || !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

async fn client_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        client_script(),
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

async fn handle_ws(mut socket: WebSocket, hub: ReloadHub) {
    let mut rx = hub.subscribe();

    if send(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(msg) => {
                    if send(&mut socket, &msg).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Reload client lagged by {} message(s)", skipped);
                    if send(&mut socket, &ReloadMessage::Reload).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn send(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::StreamExt;
    use plinth_pipeline::{OutputChange, ReloadSink};
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::time::timeout;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    async fn spawn(root: &Path) -> SocketAddr {
        spawn_with(root, ReloadHub::new()).await
    }

    async fn spawn_with(root: &Path, hub: ReloadHub) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(root, hub);
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn next_json(ws: &mut Client) -> serde_json::Value {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a message")
            .unwrap()
            .unwrap();
        serde_json::from_str(msg.to_text().unwrap()).unwrap()
    }

    #[test]
    fn default_config_matches_dev_defaults() {
        let config = DevServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert!(!config.open);
    }

    #[test]
    fn injects_before_closing_body() {
        let html = inject_script("<html><BODY><p>x</p></BODY></html>");
        assert_eq!(
            html,
            r#"<html><BODY><p>x</p><script src="/__plinth/client.js"></script></BODY></html>"#
        );
    }

    #[test]
    fn appends_when_there_is_no_body() {
        assert_eq!(
            inject_script("<p>x</p>"),
            r#"<p>x</p><script src="/__plinth/client.js"></script>"#
        );
    }

    #[tokio::test]
    async fn serves_pages_with_the_client_injected() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("index.html"), "<body><h1>hi</h1></body>").unwrap();
        std::fs::create_dir_all(temp.path().join("css")).unwrap();
        std::fs::write(temp.path().join("css/main.css"), "a{color:red}</body>").unwrap();
        let addr = spawn(temp.path()).await;

        let page = get(addr, "/").await;
        assert!(page.starts_with("HTTP/1.1 200"));
        assert!(page.contains(r#"<h1>hi</h1><script src="/__plinth/client.js"></script></body>"#));

        let css = get(addr, "/css/main.css").await;
        assert!(!css.contains("client.js"));

        let script = get(addr, CLIENT_PATH).await;
        assert!(script.contains("application/javascript"));
        assert!(script.contains(WS_PATH));
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let temp = tempdir().unwrap();
        let addr = spawn(temp.path()).await;

        assert!(get(addr, "/nope.html").await.starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn socket_clients_receive_style_changes() {
        let temp = tempdir().unwrap();
        let hub = ReloadHub::new();
        let addr = spawn_with(temp.path(), hub.clone()).await;

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{WS_PATH}"))
            .await
            .unwrap();

        assert_eq!(next_json(&mut ws).await, serde_json::json!({ "type": "connected" }));

        hub.notify(OutputChange::Styles {
            paths: vec!["/css/main.css".to_string()],
        });

        assert_eq!(
            next_json(&mut ws).await,
            serde_json::json!({ "type": "css", "paths": ["/css/main.css"] })
        );
    }
}
