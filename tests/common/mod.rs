//! Shared fixtures: a local PCM source and shell-based sinks

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use pcm_stream_client::config::{ClientConfig, NetworkConfig, SinkConfig};

/// Listener on an ephemeral loopback port
pub async fn pcm_source() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Client config pointing at `port` with the given sink
pub fn client_config(port: u16, sink: SinkConfig) -> ClientConfig {
    ClientConfig {
        network: NetworkConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..Default::default()
        },
        sink,
    }
}

/// `sh -c script sh args...` as the sink
pub fn shell_sink(script: &str, args: &[&Path]) -> SinkConfig {
    let mut all = vec!["-c".to_string(), script.to_string(), "sh".to_string()];
    all.extend(args.iter().map(|p| p.to_string_lossy().into_owned()));
    SinkConfig {
        terminate_grace_ms: 500,
        ..SinkConfig::custom("sh", all)
    }
}

/// Sink that copies stdin into `out`, touches `ready` once SIGTERM is
/// ignored, and exits only when its input is closed
pub fn capture_sink(out: &Path, ready: &Path) -> SinkConfig {
    shell_sink(r#"trap "" TERM; touch "$2"; exec cat > "$1""#, &[out, ready])
}

/// Sink that discards everything
pub fn null_sink() -> SinkConfig {
    shell_sink("exec cat > /dev/null", &[])
}

pub async fn wait_for_file(path: &Path) {
    for _ in 0..500 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never appeared", path.display());
}

/// Resolves once the client side of `socket` is gone
pub async fn wait_for_close(socket: &mut TcpStream) {
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => continue,
        }
    }
}

/// Deterministic test signal
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
