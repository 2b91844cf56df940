//! Error types for tonewave-core.

use thiserror::Error;

/// Error type for tonewave-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Audio write failed: {0}")]
    WriteFailed(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown waveform: {0}")]
    UnknownWaveform(String),

    #[error("Failed to spawn playback thread")]
    Spawn(#[source] std::io::Error),

    #[cfg(feature = "cpal")]
    #[error("Failed to enumerate devices")]
    Devices(#[from] cpal::DevicesError),

    #[cfg(feature = "cpal")]
    #[error("Failed to get device name")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[cfg(feature = "cpal")]
    #[error("Failed to query supported stream configs")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[cfg(feature = "cpal")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to pause audio stream")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Coarse failure classes reported to the diagnostic sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    DeviceUnavailable,
    WriteFailure,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            #[cfg(feature = "cpal")]
            Error::Devices(_)
            | Error::DeviceName(_)
            | Error::SupportedConfigs(_)
            | Error::BuildStream(_)
            | Error::PlayStream(_) => ErrorKind::DeviceUnavailable,
            Error::WriteFailed(_) => ErrorKind::WriteFailure,
            _ => ErrorKind::Other,
        }
    }
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
