//! Client configuration
//!
//! Defaults reproduce the fixed setup: connect to `localhost:5016` and play
//! through `paplay` as raw s16le stereo at 48 kHz. A TOML file is only read
//! when a path is given explicitly.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level client configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    pub sink: SinkConfig,
}

/// Where the PCM stream comes from
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
    /// Disable Nagle on the socket
    pub nodelay: bool,
    /// TCP keepalive idle time; `None` leaves the OS default untouched
    pub keepalive_secs: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            nodelay: true,
            keepalive_secs: None,
        }
    }
}

impl NetworkConfig {
    /// `host:port` form used for connecting and in messages
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Known command-line players
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    /// PulseAudio / PipeWire `paplay`
    #[default]
    Paplay,
    /// ALSA `aplay`
    Aplay,
}

impl Player {
    pub fn program(&self) -> &'static str {
        match self {
            Player::Paplay => "paplay",
            Player::Aplay => "aplay",
        }
    }

    /// Arguments selecting raw s16le input on stdin in the given format
    pub fn args(&self, format: &PcmFormat) -> Vec<String> {
        match self {
            Player::Paplay => vec![
                "--raw".to_string(),
                "--format=s16le".to_string(),
                format!("--channels={}", format.channels),
                format!("--rate={}", format.sample_rate),
            ],
            Player::Aplay => vec![
                "-t".to_string(),
                "raw".to_string(),
                "-f".to_string(),
                "S16_LE".to_string(),
                "-c".to_string(),
                format.channels.to_string(),
                "-r".to_string(),
                format.sample_rate.to_string(),
            ],
        }
    }
}

/// Interleaved signed 16-bit little-endian PCM layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl PcmFormat {
    /// Bytes in one frame (one sample for every channel)
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    pub fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.frame_bytes() as u64
    }

    /// Playback time represented by `bytes` of stream
    pub fn duration_of(&self, bytes: u64) -> Duration {
        let rate = self.bytes_per_second();
        if rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(bytes.saturating_mul(1_000_000) / rate)
    }

    /// Short human-readable description, e.g. `48 kHz / 16-bit / stereo`
    pub fn describe(&self) -> String {
        let layout = match self.channels {
            1 => "mono".to_string(),
            2 => "stereo".to_string(),
            n => format!("{} ch", n),
        };
        let rate = if self.sample_rate % 1000 == 0 {
            format!("{} kHz", self.sample_rate / 1000)
        } else {
            format!("{:.1} kHz", self.sample_rate as f64 / 1000.0)
        };
        format!("{} / 16-bit / {}", rate, layout)
    }
}

/// The player process that receives the stream on stdin
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub player: Player,
    /// Replaces the player executable
    pub program: Option<String>,
    /// Replaces the generated player arguments
    pub args: Option<Vec<String>>,
    pub format: PcmFormat,
    pub terminate_grace_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            player: Player::default(),
            program: None,
            args: None,
            format: PcmFormat::default(),
            terminate_grace_ms: DEFAULT_TERMINATE_GRACE_MS,
        }
    }
}

impl SinkConfig {
    /// Sink that runs an arbitrary command instead of a known player
    pub fn custom(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: Some(program.into()),
            args: Some(args),
            ..Default::default()
        }
    }

    pub fn program(&self) -> &str {
        self.program.as_deref().unwrap_or_else(|| self.player.program())
    }

    pub fn args(&self) -> Vec<String> {
        match &self.args {
            Some(args) => args.clone(),
            None => self.player.args(&self.format),
        }
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file; missing keys take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that can never produce a working session
    pub fn validate(&self) -> Result<()> {
        if self.network.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if self.network.port == 0 {
            return Err(Error::Config("port must be non-zero".into()));
        }
        if self.sink.format.sample_rate == 0 {
            return Err(Error::Config("sample rate must be non-zero".into()));
        }
        if self.sink.format.channels == 0 {
            return Err(Error::Config("channel count must be non-zero".into()));
        }
        if self.sink.program().trim().is_empty() {
            return Err(Error::Config("sink program must not be empty".into()));
        }
        Ok(())
    }
}
