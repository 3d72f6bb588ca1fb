//! PCM Client Application
//!
//! Connects to a raw PCM source over TCP and plays it through a local
//! command-line player until the stream ends or Ctrl-C is pressed.

use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pcm_stream_client::{
    config::{ClientConfig, Player},
    Error, StreamError,
};

#[derive(Parser, Debug)]
#[command(name = "pcm-client")]
#[command(about = "Play a raw s16le PCM stream received over TCP")]
#[command(long_about = "
Connects to a PCM source, pipes the byte stream into a command-line player
and exits when the source closes the connection or Ctrl-C is pressed.

EXAMPLES:
  # Default: localhost:5016 through paplay, 48 kHz / 16-bit / stereo
  pcm-client

  # Remote source through ALSA
  pcm-client --host 192.168.1.20 --player aplay

  # Any other program that reads raw samples on stdin
  pcm-client --sink-program ffplay --sink-arg=-f --sink-arg=s16le --sink-arg=-
")]
struct Args {
    /// TOML configuration file (never read unless given)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host of the PCM source
    #[arg(long)]
    host: Option<String>,

    /// TCP port of the PCM source
    #[arg(long)]
    port: Option<u16>,

    /// Player used to render the stream
    #[arg(long, value_enum)]
    player: Option<Player>,

    /// Run this program as the sink instead of a known player
    #[arg(long, value_name = "PROGRAM")]
    sink_program: Option<String>,

    /// Argument for the sink program (repeatable, replaces player arguments)
    #[arg(long = "sink-arg", value_name = "ARG", allow_hyphen_values = true)]
    sink_args: Vec<String>,

    /// Sample rate of the stream in Hz
    #[arg(long)]
    rate: Option<u32>,

    /// Channel count of the stream
    #[arg(long)]
    channels: Option<u16>,

    /// Enable TCP keepalive with this idle time in seconds
    #[arg(long, value_name = "SECS")]
    keepalive: Option<u64>,
}

impl Args {
    /// Defaults, then the config file, then command-line flags
    fn into_config(self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ClientConfig::default(),
        };

        if let Some(host) = self.host {
            config.network.host = host;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(secs) = self.keepalive {
            config.network.keepalive_secs = Some(secs);
        }
        if let Some(player) = self.player {
            config.sink.player = player;
        }
        if let Some(program) = self.sink_program {
            config.sink.program = Some(program);
        }
        if !self.sink_args.is_empty() {
            config.sink.args = Some(self.sink_args);
        }
        if let Some(rate) = self.rate {
            config.sink.format.sample_rate = rate;
        }
        if let Some(channels) = self.channels {
            config.sink.format.channels = channels;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Install the Ctrl-C and SIGTERM handlers now. The returned future
/// resolves on the first of them.
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[!] {:#}", e);
            return ExitCode::from(1);
        }
    };

    tracing::info!("Starting PCM client");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    match shutdown_signal() {
        Ok(signal) => {
            tokio::spawn(async move {
                signal.await;
                tracing::info!("Interrupt received");
                interrupt.cancel();
            });
        }
        Err(e) => tracing::warn!("Cannot install interrupt handler: {}", e),
    }

    println!(
        "[*] streaming {} from {} … Ctrl-C to stop",
        config.sink.format.describe(),
        config.network.address()
    );

    match pcm_stream_client::run(&config, cancel).await {
        Ok(stats) => {
            println!("[*] stream ended after {} bytes", stats.bytes);
            ExitCode::SUCCESS
        }
        Err(Error::Interrupted) => {
            println!("\n[*] shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("[!] {}", e);
            if let Error::Stream(ref stream) = e {
                let broken_pipe = stream.io().kind() == std::io::ErrorKind::BrokenPipe;
                if broken_pipe && matches!(stream, StreamError::Write(_)) {
                    eprintln!("[!] audio player `{}` exited early", config.sink.program());
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}
