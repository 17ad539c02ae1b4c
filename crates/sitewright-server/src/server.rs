//! Static development server with live-reload injection.

use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeDir;

use crate::reload::{
    client_script, inject_script, ReloadHub, ReloadMessage, RELOAD_SCRIPT_PATH,
    RELOAD_SOCKET_PATH,
};

/// HTML responses declaring a larger body are served without the reload
/// script.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory to serve (the development output root)
    pub root: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dev"),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("Server error: {0}")]
    ServeError(String),

    #[error("File watch error: {0}")]
    WatchError(String),
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

    /// Build the router: reload endpoints plus the output directory.
    pub fn router(&self) -> Router {
        self.router_with_limit(MAX_INJECT_BYTES)
    }

    fn router_with_limit(&self, limit: usize) -> Router {
        Router::new()
            .route(RELOAD_SOCKET_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(script_handler))
            .fallback_service(ServeDir::new(&self.config.root))
            .layer(middleware::from_fn(move |req: Request, next: Next| {
                inject_reload_script(req, next, limit)
            }))
            .with_state(self.hub.clone())
    }

    /// Bind the configured host and port. The host may be a name such as
    /// `localhost`.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let bind_error = |e: std::io::Error| {
            ServerError::BindError(
                format!("{}:{}", self.config.host, self.config.port),
                e.to_string(),
            )
        };

        TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(bind_error)
    }

    /// Bind the configured address and serve until the process ends.
    pub async fn start(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        let addr = listener.local_addr().map_err(|e| {
            ServerError::BindError(self.config.host.clone(), e.to_string())
        })?;

        tracing::info!(
            "Serving {} at http://{}",
            self.config.root.display(),
            addr
        );

        if self.config.open {
            let url = format!("http://{}", addr);
            if let Err(e) = open::that(&url) {
                tracing::debug!("Could not open browser: {}", e);
            }
        }

        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))
    }
}

/// Add the reload script tag to every HTML response of at most `limit` bytes.
async fn inject_reload_script(req: Request, next: Next, limit: usize) -> Response {
    let response = next.run(req).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html || !within_limit(response.headers(), limit) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Whether a declared Content-Length fits in `limit`. Bodies without one
/// are checked while buffering.
fn within_limit(headers: &HeaderMap, limit: usize) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_none_or(|len| len <= limit)
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

/// Forward hub messages to one browser until it disconnects.
async fn handle_ws(mut socket: WebSocket, hub: ReloadHub) {
    let mut rx = hub.subscribe();

    if send(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    loop {
        match rx.recv().await {
            Ok(msg) => {
                if send(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
            // A slow client only needs the latest state; reload it.
            Err(RecvError::Lagged(_)) => {
                if send(&mut socket, &ReloadMessage::Reload).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn send(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

async fn script_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], client_script())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::net::SocketAddr;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn server(root: PathBuf) -> DevServer {
        DevServer::new(
            DevServerConfig {
                root,
                open: false,
                ..Default::default()
            },
            ReloadHub::new(),
        )
    }

    async fn spawn_server(root: PathBuf) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server(root).serve(listener));
        addr
    }

    #[test]
    fn creates_server_with_default_config() {
        let config = DevServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.root, PathBuf::from("dev"));
    }

    #[tokio::test]
    async fn injects_script_into_html() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("index.html"),
            "<html><body><h1>Home</h1></body></html>",
        )
        .unwrap();

        let addr = spawn_server(temp.path().to_path_buf()).await;
        let response = get(addr, "/").await;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#"<h1>Home</h1><script src="/__livereload.js"></script></body>"#));
    }

    #[tokio::test]
    async fn serves_other_files_untouched() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("css")).unwrap();
        fs::write(temp.path().join("css/main.css"), ".a{color:red}").unwrap();

        let addr = spawn_server(temp.path().to_path_buf()).await;
        let response = get(addr, "/css/main.css").await;

        assert!(response.contains(".a{color:red}"));
        assert!(!response.contains("__livereload"));
    }

    #[tokio::test]
    async fn oversized_html_is_served_without_script() {
        let temp = tempdir().unwrap();
        let page = "<html><body><h1>Home</h1></body></html>";
        fs::write(temp.path().join("index.html"), page).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = server(temp.path().to_path_buf()).router_with_limit(page.len() - 1);
        tokio::spawn(async move { axum::serve(listener, router).await });

        let response = get(addr, "/").await;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with(page));
        assert!(!response.contains("__livereload"));
    }

    #[test]
    fn declared_length_is_checked_against_limit() {
        let mut headers = HeaderMap::new();
        assert!(within_limit(&headers, 10));

        headers.insert(header::CONTENT_LENGTH, "10".parse().unwrap());
        assert!(within_limit(&headers, 10));
        assert!(!within_limit(&headers, 9));
    }

    #[tokio::test]
    async fn binds_host_names() {
        let temp = tempdir().unwrap();
        let server = DevServer::new(
            DevServerConfig {
                root: temp.path().to_path_buf(),
                port: 0,
                host: "localhost".to_string(),
                open: false,
            },
            ReloadHub::new(),
        );

        let listener = server.bind().await.unwrap();

        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn serves_client_script() {
        let temp = tempdir().unwrap();
        let addr = spawn_server(temp.path().to_path_buf()).await;

        let response = get(addr, RELOAD_SCRIPT_PATH).await;

        assert!(response.contains("application/javascript"));
        assert!(response.contains("new WebSocket"));
    }
}
