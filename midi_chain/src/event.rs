// Note events: what the extractor produces and what the generator emits.
//
// `NoteEvent` is one sounding note read from a MIDI file, with its time
// since the previous kept event. `GeneratedNote` is one note of generated
// output; its duration is in abstract units that the MIDI writer scales to
// ticks. The two are deliberately separate: only pitch is learned, so the
// generator never carries a performance's timing forward.

use crate::error::{ChainError, Result};

/// A note event extracted from a MIDI performance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    delta_time: f64,
    channel: u8,
    pitch: u8,
    velocity: u8,
}

impl NoteEvent {
    /// Build an event, checking the MIDI value ranges.
    pub fn new(delta_time: f64, channel: u8, pitch: u8, velocity: u8) -> Result<Self> {
        if !delta_time.is_finite() || delta_time < 0.0 {
            return Err(ChainError::InvalidEvent(format!(
                "delta time {delta_time} must be finite and >= 0"
            )));
        }
        if channel > 15 {
            return Err(ChainError::InvalidEvent(format!("channel {channel} > 15")));
        }
        if pitch > 127 {
            return Err(ChainError::InvalidEvent(format!("pitch {pitch} > 127")));
        }
        if velocity > 127 {
            return Err(ChainError::InvalidEvent(format!("velocity {velocity} > 127")));
        }
        Ok(NoteEvent {
            delta_time,
            channel,
            pitch,
            velocity,
        })
    }

    /// Seconds since the previous kept event in the same file.
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }
}

/// One note of generated output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratedNote {
    /// Abstract duration; the writer multiplies it by its scale factor.
    pub duration_units: f64,
    pub channel: u8,
    pub pitch: u8,
    pub velocity: u8,
}
