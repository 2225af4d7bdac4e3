// tests/reload_server.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use assetflow::reload::{LiveReloadServer, Notifier, ReloadMessage, ServerOptions};

type TestResult = Result<(), Box<dyn Error>>;

fn start(root: PathBuf) -> Result<Arc<LiveReloadServer>, Box<dyn Error>> {
    Ok(LiveReloadServer::start(ServerOptions {
        host: "127.0.0.1".to_string(),
        port: 0,
        reload_port: 0,
        project_root: root,
        serve_dir: PathBuf::from("dist"),
    })?)
}

/// Minimal HTTP/1.0 GET; returns the raw response.
fn get(addr: SocketAddr, path: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    write!(stream, "GET {path} HTTP/1.0\r\nHost: localhost\r\n\r\n")?;
    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    Ok(response)
}

fn wait_for_clients(server: &LiveReloadServer, n: usize) -> bool {
    for _ in 0..250 {
        if server.client_count() >= n {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn serves_output_tree_with_reload_client_injected() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("dist/css"))?;
    fs::write(
        dir.path().join("dist/index.html"),
        "<html><body><h1>hi</h1></body></html>",
    )?;
    fs::write(dir.path().join("dist/css/site.css"), "body{margin:0}")?;

    let server = start(dir.path().to_path_buf())?;

    let index = get(server.http_addr(), "/")?;
    assert!(index.starts_with("HTTP/1.1 200") || index.starts_with("HTTP/1.0 200"));
    assert!(index.contains("<h1>hi</h1><script src=\"/__assetflow/reload.js\"></script></body>"));

    let css = get(server.http_addr(), "/css/site.css?v=1")?;
    assert!(css.contains("text/css"));
    assert!(css.ends_with("body{margin:0}"));

    let client = get(server.http_addr(), "/__assetflow/reload.js")?;
    assert!(client.contains(&format!(":{}/", server.ws_addr().port())));

    let missing = get(server.http_addr(), "/nope.html")?;
    assert!(missing.contains(" 404 "));

    let escape = get(server.http_addr(), "/../Cargo.toml")?;
    assert!(escape.contains(" 404 "));

    server.shutdown();
    Ok(())
}

#[test]
fn broadcasts_reload_and_style_messages() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let server = start(dir.path().to_path_buf())?;

    let (mut socket, _response) =
        tungstenite::connect(format!("ws://{}/", server.ws_addr()))?;
    assert!(wait_for_clients(&server, 1));

    server.notify_style_update(&[PathBuf::from("dist/css")]);
    let msg = socket.read()?;
    let parsed: ReloadMessage = serde_json::from_str(msg.to_text()?)?;
    assert_eq!(
        parsed,
        ReloadMessage::Css {
            paths: vec!["/css".to_string()]
        }
    );

    // Outputs outside the served directory fall back to a full reload.
    server.notify_style_update(&[PathBuf::from("build/css")]);
    let msg = socket.read()?;
    assert_eq!(msg.to_text()?, r#"{"type":"reload"}"#);

    server.notify_reload();
    let msg = socket.read()?;
    assert_eq!(msg.to_text()?, r#"{"type":"reload"}"#);

    server.shutdown();
    Ok(())
}

#[test]
fn disconnected_clients_are_dropped_on_broadcast() -> TestResult {
    let dir = tempfile::tempdir()?;
    let server = start(dir.path().to_path_buf())?;

    let (socket, _) = tungstenite::connect(format!("ws://{}/", server.ws_addr()))?;
    assert!(wait_for_clients(&server, 1));
    drop(socket);

    // A write to a closed peer may succeed once before the reset is seen.
    for _ in 0..50 {
        server.broadcast(&ReloadMessage::Reload);
        if server.client_count() == 0 {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(server.client_count(), 0);

    server.shutdown();
    Ok(())
}

#[test]
fn idle_connection_does_not_block_clients_or_shutdown() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let server = start(dir.path().to_path_buf())?;

    // Opens a socket but never sends a handshake request.
    let _idle = TcpStream::connect(server.ws_addr())?;

    let stream = TcpStream::connect(server.ws_addr())?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let (mut socket, _) = tungstenite::client(format!("ws://{}/", server.ws_addr()), stream)?;
    assert!(wait_for_clients(&server, 1));

    server.notify_reload();
    assert_eq!(socket.read()?.to_text()?, r#"{"type":"reload"}"#);

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let stopping = Arc::clone(&server);
    thread::spawn(move || {
        stopping.shutdown();
        let _ = done_tx.send(());
    });
    assert!(
        done_rx.recv_timeout(Duration::from_secs(3)).is_ok(),
        "shutdown did not return"
    );
    Ok(())
}

#[test]
fn broadcast_after_shutdown_is_dropped() -> TestResult {
    let dir = tempfile::tempdir()?;
    let server = start(dir.path().to_path_buf())?;
    server.shutdown();

    server.notify_reload();
    assert_eq!(server.client_count(), 0);
    Ok(())
}
