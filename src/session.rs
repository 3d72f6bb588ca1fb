//! Session lifecycle: acquire both handles, relay, release both handles
//!
//! A [`Session`] only exists once the connection and the player are both
//! up. [`Session::shutdown`] releases them exactly once no matter how the
//! relay ended; [`run`] wires the whole sequence together.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ClientConfig, PcmFormat};
use crate::error::{Error, Result};
use crate::network::Connection;
use crate::relay::{self, RelayStats};
use crate::sink::SinkProcess;

/// Connection and player owned together for one streaming run
pub struct Session {
    connection: Connection,
    sink: SinkProcess,
    format: PcmFormat,
    shut_down: bool,
}

impl Session {
    /// Connect, then start the player. If the player cannot be started the
    /// connection is closed before the error is returned.
    ///
    /// `cancel` is watched while connecting; a cancelled open returns
    /// [`Error::Interrupted`] without starting the player.
    pub async fn open(config: &ClientConfig, cancel: &CancellationToken) -> Result<Self> {
        let mut connection = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Interrupted while connecting to {}", config.network.address());
                return Err(Error::Interrupted);
            }
            connection = Connection::connect(&config.network) => connection?,
        };

        if cancel.is_cancelled() {
            connection.close();
            return Err(Error::Interrupted);
        }

        let sink = match SinkProcess::spawn(&config.sink) {
            Ok(sink) => sink,
            Err(e) => {
                connection.close();
                return Err(e);
            }
        };

        Ok(Self {
            connection,
            sink,
            format: config.sink.format,
            shut_down: false,
        })
    }

    /// Relay until end-of-stream, failure or cancellation. Does not release
    /// anything; call [`Session::shutdown`] afterwards.
    pub async fn relay(&mut self, cancel: &CancellationToken) -> Result<RelayStats> {
        relay::run(&mut self.connection, &mut self.sink, cancel).await
    }

    /// Stop the player, then close the connection. Runs once; later calls
    /// return immediately.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.sink.terminate().await;
        self.connection.close();
        info!(
            "Session closed ({} bytes received, {} bytes played through {})",
            self.connection.bytes_read(),
            self.sink.bytes_written(),
            self.sink.program()
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn sink(&self) -> &SinkProcess {
        &self.sink
    }

    pub fn format(&self) -> &PcmFormat {
        &self.format
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.shut_down {
            // the child is killed by its own drop guard
            warn!("Session dropped without shutdown, releasing handles");
            self.connection.close();
        }
    }
}

/// Open a session, relay the stream, and always tear the session down.
///
/// Returns the relay totals on end-of-stream. A user interrupt comes back as
/// [`crate::Error::Interrupted`] after teardown has completed.
pub async fn run(config: &ClientConfig, cancel: CancellationToken) -> Result<RelayStats> {
    config.validate()?;

    let mut session = Session::open(config, &cancel).await?;
    info!(
        "Streaming {} from {}",
        session.format().describe(),
        session.connection().address()
    );

    let result = session.relay(&cancel).await;
    session.shutdown().await;

    if let Ok(stats) = &result {
        info!(
            "Played {:.1}s of audio",
            stats.playback_duration(&config.sink.format).as_secs_f64()
        );
    }
    result
}
