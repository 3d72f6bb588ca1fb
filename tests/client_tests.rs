//! End-to-end runs of the client against a local PCM source

#![cfg(unix)]

mod common;

use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use common::*;
use pcm_stream_client::config::SinkConfig;
use pcm_stream_client::{run, Error, Session, StreamError};

#[tokio::test]
async fn test_stream_relayed_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.raw");
    let ready = dir.path().join("ready");

    let data = pattern(10_000);
    let (listener, port) = pcm_source().await;
    let server = {
        let data = data.clone();
        let ready = ready.clone();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            wait_for_file(&ready).await;
            for chunk in [&data[..4096], &data[4096..8192], &data[8192..]] {
                socket.write_all(chunk).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let config = client_config(port, capture_sink(&out, &ready));
    let stats = run(&config, CancellationToken::new()).await.unwrap();
    server.await.unwrap();

    assert_eq!(stats.bytes, 10_000);
    assert_eq!(std::fs::read(&out).unwrap(), data);
}

#[tokio::test]
async fn test_connection_refused_spawns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("spawned");

    let (listener, port) = pcm_source().await;
    drop(listener);

    let config = client_config(port, shell_sink(r#"touch "$1""#, &[marker.as_path()]));
    let err = run(&config, CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, Error::Connection { .. }));
    assert_ne!(err.exit_code(), 0);
    assert!(err.to_string().starts_with("Connection to 127.0.0.1:"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_missing_sink_closes_connection() {
    let (listener, port) = pcm_source().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        tokio::time::timeout(Duration::from_secs(10), wait_for_close(&mut socket))
            .await
            .is_ok()
    });

    let config = client_config(port, SinkConfig::custom("no-such-audio-player", vec![]));
    let err = run(&config, CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, Error::Spawn { .. }));
    assert_ne!(err.exit_code(), 0);
    assert!(err.to_string().contains("Failed to start audio sink `no-such-audio-player`"));
    assert!(server.await.unwrap(), "connection was not closed");
}

#[tokio::test]
async fn test_interrupt_tears_down_and_exits_cleanly() {
    let (listener, port) = pcm_source().await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(&pattern(1000)).await.unwrap();
        // keep the stream open so the client blocks on read
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
        tokio::time::timeout(Duration::from_secs(10), wait_for_close(&mut socket))
            .await
            .is_ok()
    });

    let err = run(&client_config(port, null_sink()), cancel).await.unwrap_err();

    assert!(err.is_interrupt());
    assert_eq!(err.exit_code(), 0);
    assert!(server.await.unwrap(), "connection was not closed");
}

#[tokio::test]
async fn test_broken_sink_pipe_fails_run() {
    let (listener, port) = pcm_source().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = socket.write_all(&pattern(1 << 20)).await;
        tokio::time::timeout(Duration::from_secs(10), wait_for_close(&mut socket))
            .await
            .is_ok()
    });

    let config = client_config(port, SinkConfig::custom("true", vec![]));
    let mut session = Session::open(&config, &CancellationToken::new()).await.unwrap();
    let err = session.relay(&CancellationToken::new()).await.unwrap_err();
    session.shutdown().await;

    match &err {
        Error::Stream(StreamError::Write(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), 4);
    assert!(session.connection().is_closed());
    assert!(session.sink().is_terminated());
    assert!(server.await.unwrap(), "connection was not closed");
}

#[tokio::test]
async fn test_empty_stream_ends_normally() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.raw");
    let ready = dir.path().join("ready");

    let (listener, port) = pcm_source().await;
    let server = {
        let ready = ready.clone();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            wait_for_file(&ready).await;
            drop(socket);
        })
    };

    let stats = run(&client_config(port, capture_sink(&out, &ready)), CancellationToken::new())
        .await
        .unwrap();
    server.await.unwrap();

    assert_eq!(stats.bytes, 0);
    assert_eq!(stats.chunks, 0);
    assert!(std::fs::read(&out).unwrap().is_empty());
}
