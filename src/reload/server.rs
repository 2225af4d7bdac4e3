// src/reload/server.rs

//! Static file server plus WebSocket reload channel.
//!
//! Both run on plain threads: `tiny_http` for HTTP, `tungstenite` over a
//! std `TcpListener` for the reload socket. Each WebSocket handshake runs on
//! its own short-lived thread, and broadcasts are written by a dedicated
//! sender thread so callers never block on a socket. HTML responses get the
//! client script injected before `</body>`.

use std::fs;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};
use tungstenite::{Message, WebSocket};

use super::{Notifier, ReloadMessage};

const CLIENT_JS: &str = include_str!("client.js");
const PORT_PLACEHOLDER: &str = "__ASSETFLOW_RELOAD_PORT__";

/// A connection that has not completed its handshake by then is dropped.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
/// A client that stops reading is dropped once a write stalls this long.
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Where and what to serve.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    /// HTTP port; `0` picks a free one.
    pub port: u16,
    /// WebSocket port; `0` picks a free one.
    pub reload_port: u16,
    pub project_root: PathBuf,
    /// Served directory, relative to `project_root`.
    pub serve_dir: PathBuf,
}

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

pub struct LiveReloadServer {
    http: Arc<Server>,
    http_addr: SocketAddr,
    ws_addr: SocketAddr,
    serve_dir: PathBuf,
    clients: Clients,
    /// Serialized messages for the sender thread; `None` once shut down.
    outbox: Mutex<Option<mpsc::Sender<String>>>,
    shutting_down: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for LiveReloadServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveReloadServer")
            .field("http_addr", &self.http_addr)
            .field("ws_addr", &self.ws_addr)
            .field("serve_dir", &self.serve_dir)
            .finish_non_exhaustive()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl LiveReloadServer {
    /// Bind both listeners and start serving.
    pub fn start(opts: ServerOptions) -> Result<Arc<Self>> {
        let http = Server::http(format!("{}:{}", opts.host, opts.port))
            .map_err(|e| anyhow!("binding HTTP server on {}:{}: {e}", opts.host, opts.port))?;
        let http_addr = http
            .server_addr()
            .to_ip()
            .ok_or_else(|| anyhow!("HTTP server is not bound to an IP address"))?;
        let http = Arc::new(http);

        let listener = TcpListener::bind((opts.host.as_str(), opts.reload_port))
            .with_context(|| format!("binding reload socket on {}:{}", opts.host, opts.reload_port))?;
        let ws_addr = listener.local_addr().context("reading reload socket address")?;

        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let shutting_down = Arc::new(AtomicBool::new(false));
        let serve_root = opts.project_root.join(&opts.serve_dir);

        let http_thread = {
            let http = Arc::clone(&http);
            let ws_port = ws_addr.port();
            thread::Builder::new()
                .name("assetflow-http".to_string())
                .spawn(move || {
                    for request in http.incoming_requests() {
                        if let Err(e) = handle_request(request, &serve_root, ws_port) {
                            debug!("request error: {e:#}");
                        }
                    }
                })
                .context("spawning HTTP thread")?
        };

        let ws_thread = {
            let clients = Arc::clone(&clients);
            let shutting_down = Arc::clone(&shutting_down);
            thread::Builder::new()
                .name("assetflow-reload".to_string())
                .spawn(move || accept_loop(listener, clients, shutting_down))
                .context("spawning reload socket thread")?
        };

        let (outbox, messages) = mpsc::channel::<String>();
        let send_thread = {
            let clients = Arc::clone(&clients);
            thread::Builder::new()
                .name("assetflow-reload-send".to_string())
                .spawn(move || send_loop(messages, clients))
                .context("spawning reload sender thread")?
        };

        info!(http = %http_addr, reload = %ws_addr, root = %opts.serve_dir.display(), "dev server listening");

        Ok(Arc::new(Self {
            http,
            http_addr,
            ws_addr,
            serve_dir: opts.serve_dir,
            clients,
            outbox: Mutex::new(Some(outbox)),
            shutting_down,
            threads: Mutex::new(vec![http_thread, ws_thread, send_thread]),
        }))
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    pub fn client_count(&self) -> usize {
        lock(&self.clients).len()
    }

    /// Queue `msg` for every connected browser. Returns immediately; the
    /// sender thread does the writes and drops dead connections.
    pub fn broadcast(&self, msg: &ReloadMessage) {
        let json = msg.to_json();
        match lock(&self.outbox).as_ref() {
            Some(outbox) => {
                if outbox.send(json).is_err() {
                    debug!("reload sender is gone; message dropped");
                }
            }
            None => debug!(message = %json, "server shut down; message dropped"),
        }
    }

    /// Stop both listeners and wait for their threads.
    pub fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.http.unblock();
        // Wake the blocking accept() so the loop sees the flag.
        let _ = TcpStream::connect(self.ws_addr);
        // Closing the channel ends the sender thread after it drains.
        drop(lock(&self.outbox).take());

        let threads: Vec<JoinHandle<()>> = lock(&self.threads).drain(..).collect();
        for handle in threads {
            let _ = handle.join();
        }

        for ws in lock(&self.clients).iter_mut() {
            let _ = ws.close(None);
            let _ = ws.flush();
        }
        lock(&self.clients).clear();
        info!("dev server stopped");
    }

    /// URL prefix (`/css`) for a project-relative output directory, if it
    /// lies under the served directory.
    fn url_prefix(&self, output: &Path) -> Option<String> {
        let rel = output.strip_prefix(&self.serve_dir).ok()?;
        let mut url = String::new();
        for component in rel.components() {
            if let Component::Normal(part) = component {
                url.push('/');
                url.push_str(&part.to_string_lossy());
            }
        }
        if url.is_empty() {
            url.push('/');
        }
        Some(url)
    }
}

impl Drop for LiveReloadServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Notifier for LiveReloadServer {
    fn notify_reload(&self) {
        self.broadcast(&ReloadMessage::Reload);
    }

    fn notify_style_update(&self, outputs: &[PathBuf]) {
        let paths: Option<Vec<String>> = outputs.iter().map(|o| self.url_prefix(o)).collect();
        match paths {
            Some(paths) => self.broadcast(&ReloadMessage::Css { paths }),
            None => {
                debug!("style output outside served directory; falling back to full reload");
                self.broadcast(&ReloadMessage::Reload);
            }
        }
    }
}

fn accept_loop(listener: TcpListener, clients: Clients, shutting_down: Arc<AtomicBool>) {
    for stream in listener.incoming() {
        if shutting_down.load(Ordering::SeqCst) {
            break;
        }
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!("reload socket accept failed: {e}");
                continue;
            }
        };
        let clients = Arc::clone(&clients);
        let spawned = thread::Builder::new()
            .name("assetflow-reload-handshake".to_string())
            .spawn(move || handshake(stream, &clients));
        if let Err(e) = spawned {
            warn!("could not spawn reload handshake thread: {e}");
        }
    }
}

/// Complete the WebSocket handshake and register the client. A peer that
/// never sends its request is dropped after [`HANDSHAKE_TIMEOUT`].
fn handshake(stream: TcpStream, clients: &Clients) {
    let configured = stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .and_then(|()| stream.set_write_timeout(Some(WRITE_TIMEOUT)));
    if let Err(e) = configured {
        debug!("configuring reload socket failed: {e}");
        return;
    }

    match tungstenite::accept(stream) {
        Ok(ws) => {
            // Clients are only written to after this.
            if let Err(e) = ws.get_ref().set_read_timeout(None) {
                debug!("clearing reload socket read timeout failed: {e}");
            }
            let mut clients = lock(clients);
            clients.push(ws);
            debug!(total = clients.len(), "reload client connected");
        }
        Err(e) => debug!("reload handshake failed: {e}"),
    }
}

fn send_loop(messages: mpsc::Receiver<String>, clients: Clients) {
    for json in messages {
        let mut clients = lock(&clients);
        let before = clients.len();
        clients.retain_mut(|ws| ws.send(Message::Text(json.clone().into())).is_ok());
        debug!(
            message = %json,
            delivered = clients.len(),
            dropped = before - clients.len(),
            "broadcast reload message"
        );
    }
    debug!("reload sender finished");
}

fn handle_request(request: Request, serve_root: &Path, ws_port: u16) -> Result<()> {
    if request.url() == "/__assetflow/reload.js" {
        let body = CLIENT_JS.replace(PORT_PLACEHOLDER, &ws_port.to_string());
        return send(request, 200, "text/javascript; charset=utf-8", body.into_bytes());
    }

    let Some(path) = resolve_path(request.url(), serve_root) else {
        return send(request, 404, "text/plain; charset=utf-8", b"404 Not Found".to_vec());
    };

    let content_type = mime_for(&path);
    if request.method() == &Method::Head {
        return send(request, 200, content_type, Vec::new());
    }

    let body = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let body = if content_type.starts_with("text/html") {
        inject_client(&body)
    } else {
        body
    };
    send(request, 200, content_type, body)
}

fn send(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let header = Header::from_bytes("Content-Type", content_type)
        .map_err(|_| anyhow!("invalid content type header"))?;
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header);
    request.respond(response)?;
    Ok(())
}

/// Map a request URL to a file under `serve_root`; directories map to
/// their `index.html`.
fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let clean = path.trim_matches('/');
    if clean.split('/').any(|seg| seg == "..") {
        return None;
    }

    let local = serve_root.join(clean);
    if local.is_file() {
        return Some(local);
    }
    let index = local.join("index.html");
    index.is_file().then_some(index)
}

/// Insert the reload client tag before the last `</body>`, or append it.
pub fn inject_client(html: &[u8]) -> Vec<u8> {
    const TAG: &[u8] = b"<script src=\"/__assetflow/reload.js\"></script>";
    const PATTERN: &[u8] = b"</body>";

    let pos = html
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(html.len());

    let mut out = Vec::with_capacity(html.len() + TAG.len());
    out.extend_from_slice(&html[..pos]);
    out.extend_from_slice(TAG);
    out.extend_from_slice(&html[pos..]);
    out
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        "ttf" => "font/ttf",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
