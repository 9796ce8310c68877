use std::fmt;

/// Top-level crate error.
#[derive(Debug)]
pub enum SynthError {
    Load(LoadError),
    Playback(PlaybackError),
}

/// Errors raised while compiling a track into a playable schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Tempo must be a positive, finite BPM value.
    InvalidTempo { bpm: f64 },
    /// A track needs at least one bar to define its loop length.
    EmptyTrack,
}

/// Errors raised by the native output driver.
#[derive(Debug)]
pub enum PlaybackError {
    /// No default output device is available.
    NoOutputDevice,
    /// The device offers no stream format the engine can feed.
    UnsupportedFormat { format: String },
    /// Building or starting the output stream failed.
    Stream(String),
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::Load(e) => write!(f, "load error: {e}"),
            SynthError::Playback(e) => write!(f, "playback error: {e}"),
        }
    }
}

impl std::error::Error for SynthError {}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::InvalidTempo { bpm } => write!(f, "invalid tempo: {bpm} BPM"),
            LoadError::EmptyTrack => write!(f, "track has no bars"),
        }
    }
}

impl std::error::Error for LoadError {}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::NoOutputDevice => write!(f, "no default output device"),
            PlaybackError::UnsupportedFormat { format } => {
                write!(f, "unsupported output format: {format}")
            }
            PlaybackError::Stream(msg) => write!(f, "output stream error: {msg}"),
        }
    }
}

impl std::error::Error for PlaybackError {}

impl From<LoadError> for SynthError {
    fn from(e: LoadError) -> Self {
        SynthError::Load(e)
    }
}

impl From<PlaybackError> for SynthError {
    fn from(e: PlaybackError) -> Self {
        SynthError::Playback(e)
    }
}
