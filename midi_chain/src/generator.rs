// Sequence generator: samples new pitch sequences from a trained model.
//
// The generator borrows the model and owns everything that changes during
// a run: the PRNG and the rolling context cursor. Each `predict` call seeds
// a fresh cursor (unless one was supplied with `start_from`), then steps
// exactly `length` times. Duration, channel and velocity are not learned;
// every note gets the constants from `NotePolicy`.
//
// Seeding:
// - sparse: two pitches drawn uniformly from the pitches that have order-1
//   successors, so the first step can always be answered.
// - dense: one pitch drawn uniformly from the model's `PitchRange`.
//
// When a step hits an untrained context or row, `FallbackPolicy` decides:
// `Fail` aborts the call, `Reseed` restarts from a fresh trained cursor,
// `Uniform` picks that one pitch uniformly from the trained domain. Reseeds
// are counted and logged so a heavily undertrained model stays visible.

use crate::config::NotePolicy;
use crate::error::{ChainError, Result};
use crate::event::GeneratedNote;
use crate::markov::TransitionModel;
use midi_chain_prng::ChainRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when the model has nothing to say about the current cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Restart from a random trained cursor and keep going.
    #[default]
    Reseed,
    /// Pick the next pitch uniformly from the trained domain.
    Uniform,
    /// Abort the `predict` call with the underlying error.
    Fail,
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FallbackPolicy::Reseed => "reseed",
            FallbackPolicy::Uniform => "uniform",
            FallbackPolicy::Fail => "fail",
        })
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reseed" => Ok(FallbackPolicy::Reseed),
            "uniform" => Ok(FallbackPolicy::Uniform),
            "fail" => Ok(FallbackPolicy::Fail),
            other => Err(format!(
                "unknown fallback '{other}' (expected reseed, uniform or fail)"
            )),
        }
    }
}

/// Rolling context: the most recent one or two pitches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Single(u8),
    Pair { prev2: u8, prev1: u8 },
}

impl Cursor {
    /// Most recent pitch.
    pub fn last(self) -> u8 {
        match self {
            Cursor::Single(p) => p,
            Cursor::Pair { prev1, .. } => prev1,
        }
    }
}

pub struct Generator<'m> {
    model: &'m TransitionModel,
    rng: ChainRng,
    notes: NotePolicy,
    policy: FallbackPolicy,
    start: Option<Cursor>,
    reseeds: usize,
}

impl<'m> Generator<'m> {
    pub fn new(model: &'m TransitionModel, rng: ChainRng) -> Self {
        Generator {
            model,
            rng,
            notes: NotePolicy::default(),
            policy: FallbackPolicy::default(),
            start: None,
            reseeds: 0,
        }
    }

    pub fn with_note_policy(mut self, notes: NotePolicy) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_fallback(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use `cursor` instead of a random seed for the next `predict` call.
    ///
    /// A `Single` cursor on a sparse model answers its first step from the
    /// order-1 table.
    pub fn start_from(&mut self, cursor: Cursor) -> &mut Self {
        self.start = Some(cursor);
        self
    }

    /// Number of fallback reseeds performed by the last `predict` call.
    pub fn reseeds(&self) -> usize {
        self.reseeds
    }

    /// Generate exactly `length` notes.
    ///
    /// On error nothing is returned; there is no partially filled result.
    pub fn predict(&mut self, length: usize) -> Result<Vec<GeneratedNote>> {
        self.reseeds = 0;
        let start = self.start.take();
        if length == 0 {
            return Ok(Vec::new());
        }

        let mut cursor = match start {
            Some(c) => c,
            None => self.seed_cursor()?,
        };
        let mut notes = Vec::with_capacity(length);
        while notes.len() < length {
            let pitch = self.step(&mut cursor)?;
            notes.push(self.note(pitch));
        }

        if self.reseeds > 0 {
            log::warn!(
                "model was undertrained for {} of {} steps; reseeded each time",
                self.reseeds,
                length
            );
        }
        Ok(notes)
    }

    fn note(&self, pitch: u8) -> GeneratedNote {
        GeneratedNote {
            duration_units: self.notes.duration_units,
            channel: self.notes.channel,
            pitch,
            velocity: self.notes.velocity,
        }
    }

    /// Random starting cursor drawn from the model's domain.
    fn seed_cursor(&mut self) -> Result<Cursor> {
        match self.model {
            TransitionModel::Sparse(m) => {
                let domain = m.observed_pitches();
                match (self.rng.choose(&domain), self.rng.choose(&domain)) {
                    (Some(&prev2), Some(&prev1)) => Ok(Cursor::Pair { prev2, prev1 }),
                    _ => Err(ChainError::UntrainedModel),
                }
            }
            TransitionModel::Dense(m) => {
                let range = m.range();
                Ok(Cursor::Single(self.rng.range_u8(range.low(), range.high())))
            }
        }
    }

    /// Random cursor guaranteed to have an answer, if the model has one.
    fn trained_cursor(&mut self) -> Option<Cursor> {
        let model = self.model;
        match model {
            TransitionModel::Sparse(m) => {
                let domain = m.observed_pitches();
                let prev2 = *self.rng.choose(&domain)?;
                let prev1 = *self.rng.choose(&domain)?;
                Some(Cursor::Pair { prev2, prev1 })
            }
            TransitionModel::Dense(m) => {
                let domain = m.trained_pitches();
                self.rng.choose(&domain).copied().map(Cursor::Single)
            }
        }
    }

    /// Sample the successor of `cursor` without any fallback.
    fn sample(&mut self, cursor: Cursor) -> Result<u8> {
        match (self.model, cursor) {
            (TransitionModel::Sparse(m), Cursor::Pair { prev2, prev1 }) => {
                m.next_pitch(prev2, prev1, &mut self.rng)
            }
            (TransitionModel::Sparse(m), Cursor::Single(p)) => m.next_after(p, &mut self.rng),
            (TransitionModel::Dense(m), c) => m.next_pitch(c.last(), &mut self.rng),
        }
    }

    fn step(&mut self, cursor: &mut Cursor) -> Result<u8> {
        let pitch = match self.sample(*cursor) {
            Ok(p) => p,
            Err(e) if e.is_untrained() => self.recover(cursor, e)?,
            Err(e) => return Err(e),
        };
        *cursor = self.advance(*cursor, pitch);
        Ok(pitch)
    }

    fn recover(&mut self, cursor: &mut Cursor, err: ChainError) -> Result<u8> {
        match self.policy {
            FallbackPolicy::Fail => Err(err),
            FallbackPolicy::Reseed => {
                let fresh = self.trained_cursor().ok_or(err)?;
                log::debug!("{cursor:?} untrained, reseeding at {fresh:?}");
                self.reseeds += 1;
                *cursor = fresh;
                self.sample(fresh)
            }
            FallbackPolicy::Uniform => {
                let model = self.model;
                let domain = match model {
                    TransitionModel::Sparse(m) => m.observed_pitches(),
                    TransitionModel::Dense(m) => m.range().pitches().collect(),
                };
                log::debug!("{cursor:?} untrained, drawing uniformly");
                self.rng.choose(&domain).copied().ok_or(err)
            }
        }
    }

    fn advance(&self, cursor: Cursor, next: u8) -> Cursor {
        match self.model {
            TransitionModel::Sparse(_) => Cursor::Pair {
                prev2: cursor.last(),
                prev1: next,
            },
            TransitionModel::Dense(_) => Cursor::Single(next),
        }
    }
}
