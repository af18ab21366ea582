// Half-open MIDI pitch range `[low, high)`.
//
// The dense model sizes its matrix from this range and the generator seeds
// from it. Two presets cover the bounds seen in practice: 30..100 and the
// wider 30..120.

use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct PitchRange {
    low: u8,
    high: u8,
}

impl PitchRange {
    /// 30..100, the range used for seeding the two-note context.
    pub const NARROW: PitchRange = PitchRange { low: 30, high: 100 };
    /// 30..120, the range used for the dense transition matrix.
    pub const WIDE: PitchRange = PitchRange { low: 30, high: 120 };

    pub fn new(low: u8, high: u8) -> Result<Self> {
        if low >= high || high > 128 {
            return Err(ChainError::InvalidRange { low, high });
        }
        Ok(PitchRange { low, high })
    }

    pub fn low(self) -> u8 {
        self.low
    }

    /// Exclusive upper bound.
    pub fn high(self) -> u8 {
        self.high
    }

    /// Number of pitches in the range.
    pub fn width(self) -> usize {
        (self.high - self.low) as usize
    }

    pub fn contains(self, pitch: u8) -> bool {
        (self.low..self.high).contains(&pitch)
    }

    /// Offset of `pitch` from `low`, if inside the range.
    pub fn index_of(self, pitch: u8) -> Option<usize> {
        self.contains(pitch).then(|| (pitch - self.low) as usize)
    }

    /// Inverse of `index_of`. Panics if `index >= width()`.
    pub fn pitch_at(self, index: usize) -> u8 {
        assert!(index < self.width(), "pitch_at: index {index} out of range");
        self.low + index as u8
    }

    pub fn pitches(self) -> impl Iterator<Item = u8> {
        self.low..self.high
    }
}

impl Default for PitchRange {
    fn default() -> Self {
        PitchRange::NARROW
    }
}

/// Serialized shape: `{"low": 30, "high": 100}`, validated on load.
#[derive(Serialize, Deserialize)]
struct RawRange {
    low: u8,
    high: u8,
}

impl TryFrom<RawRange> for PitchRange {
    type Error = ChainError;

    fn try_from(raw: RawRange) -> Result<Self> {
        PitchRange::new(raw.low, raw.high)
    }
}

impl From<PitchRange> for RawRange {
    fn from(range: PitchRange) -> Self {
        RawRange {
            low: range.low,
            high: range.high,
        }
    }
}
