// Run configuration, loadable from JSON.
//
// `GeneratorConfig` gathers every knob of a run: which model to train, its
// pitch range, how many notes to generate, the PRNG seed, the fallback
// policy for untrained contexts, input discovery limits, and the constants
// used when extracting and writing MIDI. Every field has a default, so a
// config file only needs to name what it changes. The CLI (main.rs) layers
// its flags on top of whatever was loaded.
//
// `NotePolicy` is the fixed duration/channel/velocity stamped onto each
// generated note. `WriterConfig` turns duration units into MIDI ticks.
// `ExtractOptions` controls which note messages the extractor keeps.

use crate::error::{ChainError, Result};
use crate::generator::FallbackPolicy;
use crate::markov::ModelKind;
use crate::range::PitchRange;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Constant attributes of every generated note. Only pitch is learned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotePolicy {
    /// Abstract duration; multiplied by `WriterConfig::scale_factor`.
    pub duration_units: f64,
    /// MIDI channel (0–15).
    pub channel: u8,
    /// Note-on velocity (1–127). Zero is rejected: a zero-velocity note-on
    /// reads back as a release.
    pub velocity: u8,
}

impl Default for NotePolicy {
    fn default() -> Self {
        NotePolicy {
            duration_units: 0.15,
            channel: 0,
            velocity: 100,
        }
    }
}

/// How generated notes become MIDI messages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Ticks per duration unit. Each note-on and note-off is this many
    /// ticks times `duration_units` after the previous message.
    pub scale_factor: f64,
    /// Ticks per quarter note in the file header.
    pub ticks_per_beat: u16,
    /// Program change sent before the first note, if any.
    pub program: Option<u8>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            scale_factor: 500.0,
            ticks_per_beat: 480,
            program: Some(12),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Also keep note-off messages (and zero-velocity note-ons) as events.
    pub include_releases: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub model: ModelKind,
    pub range: PitchRange,
    /// Number of notes to generate.
    pub length: usize,
    /// PRNG seed; `None` seeds from the clock.
    pub seed: Option<u64>,
    pub fallback: FallbackPolicy,
    /// At most this many input files are read.
    pub max_files: usize,
    pub output: PathBuf,
    pub notes: NotePolicy,
    pub writer: WriterConfig,
    pub extract: ExtractOptions,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            model: ModelKind::SparseMarkov,
            range: PitchRange::NARROW,
            length: 1000,
            seed: None,
            fallback: FallbackPolicy::Reseed,
            max_files: 10,
            output: PathBuf::from("output.mid"),
            notes: NotePolicy::default(),
            writer: WriterConfig::default(),
            extract: ExtractOptions::default(),
        }
    }
}

impl GeneratorConfig {
    /// Dense model over the wide 30..120 range.
    pub fn dense_preset() -> Self {
        GeneratorConfig {
            model: ModelKind::DenseMarkov,
            range: PitchRange::WIDE,
            ..Default::default()
        }
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| ChainError::io(path, e))?;
        let config: GeneratorConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(ChainError::InvalidConfig(msg));
        if self.notes.channel > 15 {
            return bad(format!("note channel {} > 15", self.notes.channel));
        }
        if !(1..=127).contains(&self.notes.velocity) {
            return bad(format!(
                "note velocity {} must be in 1..=127",
                self.notes.velocity
            ));
        }
        if !self.notes.duration_units.is_finite() || self.notes.duration_units < 0.0 {
            return bad(format!(
                "note duration {} must be finite and >= 0",
                self.notes.duration_units
            ));
        }
        if !self.writer.scale_factor.is_finite() || self.writer.scale_factor < 0.0 {
            return bad(format!(
                "writer scale factor {} must be finite and >= 0",
                self.writer.scale_factor
            ));
        }
        if self.writer.ticks_per_beat == 0 || self.writer.ticks_per_beat > 0x7fff {
            return bad(format!(
                "ticks per beat {} must be in 1..=32767",
                self.writer.ticks_per_beat
            ));
        }
        if let Some(program) = self.writer.program {
            if program > 127 {
                return bad(format!("program {program} > 127"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = GeneratorConfig::default();
        assert_eq!(config.model, ModelKind::SparseMarkov);
        assert_eq!(config.range, PitchRange::NARROW);
        assert_eq!(config.length, 1000);
        assert_eq!(config.max_files, 10);
        assert_eq!(config.output, PathBuf::from("output.mid"));
        assert_eq!(config.notes.duration_units, 0.15);
        assert_eq!(config.notes.velocity, 100);
        assert_eq!(config.writer.scale_factor, 500.0);
        assert_eq!(config.writer.program, Some(12));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn dense_preset_uses_wide_range() {
        let config = GeneratorConfig::dense_preset();
        assert_eq!(config.model, ModelKind::DenseMarkov);
        assert_eq!(config.range, PitchRange::WIDE);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "model": "dense",
            "range": { "low": 40, "high": 90 },
            "seed": 7,
            "fallback": "fail",
            "notes": { "velocity": 64 }
        }"#;
        let config: GeneratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.model, ModelKind::DenseMarkov);
        assert_eq!(config.range, PitchRange::new(40, 90).unwrap());
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.fallback, FallbackPolicy::Fail);
        assert_eq!(config.notes.velocity, 64);
        assert_eq!(config.notes.duration_units, 0.15);
        assert_eq!(config.length, 1000);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut config = GeneratorConfig::dense_preset();
        config.seed = Some(99);
        config.writer.program = None;
        let json = serde_json::to_string(&config).unwrap();
        let restored: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn rejects_unknown_model() {
        assert!(serde_json::from_str::<GeneratorConfig>(r#"{"model": "rnn"}"#).is_err());
    }

    #[test]
    fn validate_catches_bad_note_policy() {
        let mut config = GeneratorConfig::default();
        config.notes.channel = 16;
        assert!(config.validate().is_err());
        config.notes.channel = 0;
        config.writer.ticks_per_beat = 0;
        assert!(matches!(config.validate(), Err(ChainError::InvalidConfig(_))));
    }

    #[test]
    fn zero_velocity_is_rejected() {
        // A velocity-0 note-on decodes as a release, so the output would be
        // silent and would read back with no events.
        let mut config = GeneratorConfig::default();
        config.notes.velocity = 0;
        assert!(matches!(config.validate(), Err(ChainError::InvalidConfig(_))));
        config.notes.velocity = 1;
        assert!(config.validate().is_ok());
        config.notes.velocity = 128;
        assert!(config.validate().is_err());

        let json = r#"{ "notes": { "velocity": 0 } }"#;
        let loaded: GeneratorConfig = serde_json::from_str(json).unwrap();
        assert!(loaded.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = GeneratorConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ChainError::Io { .. }));
    }
}
