// Error type shared by the whole crate.
//
// The Markov variants map directly onto the ways a model can be asked for
// something it never learned: an empty corpus, a sparse context with no
// successors at either order, a single-pitch start with no order-1
// successors, a dense row with no observations, or a dense
// training pitch outside the model's range. The remaining variants wrap the
// I/O glue (file access, MIDI decoding, JSON config).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("corpus is empty: no files or no note events to train on")]
    EmptyCorpus,

    #[error("no successors recorded for context ({prev2}, {prev1}) or for {prev1} alone")]
    UntrainedContext { prev2: u8, prev1: u8 },

    #[error("no order-1 successors recorded for pitch {pitch}")]
    UntrainedPitch { pitch: u8 },

    #[error("model has no transitions to sample from")]
    UntrainedModel,

    #[error("transition row for pitch {pitch} has no observations")]
    UntrainedRow { pitch: u8 },

    #[error("pitch {pitch} is outside the model range [{low}, {high})")]
    OutOfRangePitch { pitch: u8, low: u8, high: u8 },

    #[error("invalid pitch range [{low}, {high}): need low < high <= 128")]
    InvalidRange { low: u8, high: u8 },

    #[error("invalid note event: {0}")]
    InvalidEvent(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("MIDI error in {path}: {source}")]
    Midi {
        path: PathBuf,
        #[source]
        source: midly::Error,
    },

    #[error("MIDI encoding failed: {0}")]
    Encode(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChainError>;

impl ChainError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChainError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the conditions a generator can recover from by reseeding.
    pub fn is_untrained(&self) -> bool {
        matches!(
            self,
            ChainError::UntrainedContext { .. }
                | ChainError::UntrainedPitch { .. }
                | ChainError::UntrainedRow { .. }
        )
    }
}
