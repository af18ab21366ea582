// Dense order-1 Markov model over a bounded pitch range.
//
// A square count matrix indexed by `pitch - low`, plus a row-normalized
// copy used for sampling. Row `i` of the probability matrix is the
// categorical distribution of the pitch that follows `low + i`.
//
// Training rejects any pitch outside the range before touching the counts,
// so a failed `train` leaves the model exactly as it was. Rows that never
// received an observation stay flagged untrained: `row()` returns `None`
// for them and sampling from them yields `ChainError::UntrainedRow`. A
// trained row always sums to 1 within floating-point tolerance.

use crate::corpus::Corpus;
use crate::error::{ChainError, Result};
use crate::markov::TransitionStats;
use crate::range::PitchRange;
use midi_chain_prng::ChainRng;
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct DenseMarkov {
    range: PitchRange,
    /// Row-major `width * width` transition counts.
    counts: Vec<u64>,
    row_totals: Vec<u64>,
    /// Row-major probabilities; all zero for untrained rows.
    probs: Vec<f64>,
}

impl DenseMarkov {
    pub fn new(range: PitchRange) -> Self {
        let w = range.width();
        DenseMarkov {
            range,
            counts: vec![0; w * w],
            row_totals: vec![0; w],
            probs: vec![0.0; w * w],
        }
    }

    pub fn range(&self) -> PitchRange {
        self.range
    }

    fn width(&self) -> usize {
        self.range.width()
    }

    fn row_span(&self, index: usize) -> std::ops::Range<usize> {
        let w = self.width();
        index * w..(index + 1) * w
    }

    /// Count one file's transitions into a fresh matrix.
    fn count_sequence(range: PitchRange, pitches: &[u8]) -> Vec<u64> {
        let w = range.width();
        let mut counts = vec![0u64; w * w];
        for pair in pitches.windows(2) {
            // Both indices were validated by `check_range`.
            if let (Some(from), Some(to)) = (range.index_of(pair[0]), range.index_of(pair[1])) {
                counts[from * w + to] += 1;
            }
        }
        counts
    }

    fn check_range(&self, sequences: &[Vec<u8>]) -> Result<()> {
        let range = self.range;
        match sequences.iter().flatten().find(|&&p| !range.contains(p)) {
            Some(&pitch) => Err(ChainError::OutOfRangePitch {
                pitch,
                low: range.low(),
                high: range.high(),
            }),
            None => Ok(()),
        }
    }

    /// Recompute row totals and probabilities from the counts.
    fn normalize(&mut self) {
        let w = self.width();
        for i in 0..w {
            let span = self.row_span(i);
            let total: u64 = self.counts[span.clone()].iter().sum();
            self.row_totals[i] = total;
            for j in span {
                self.probs[j] = if total == 0 {
                    0.0
                } else {
                    self.counts[j] as f64 / total as f64
                };
            }
        }
    }

    /// Raw transition counts out of `pitch`.
    pub fn counts_row(&self, pitch: u8) -> Option<&[u64]> {
        let i = self.range.index_of(pitch)?;
        Some(&self.counts[self.row_span(i)])
    }

    /// Normalized distribution out of `pitch`, or `None` when the row has
    /// no observations or `pitch` is outside the range.
    pub fn row(&self, pitch: u8) -> Option<&[f64]> {
        let i = self.range.index_of(pitch)?;
        if self.row_totals[i] == 0 {
            return None;
        }
        Some(&self.probs[self.row_span(i)])
    }

    pub fn is_row_trained(&self, pitch: u8) -> bool {
        self.row(pitch).is_some()
    }

    /// Pitches whose rows have at least one observation, ascending.
    pub fn trained_pitches(&self) -> Vec<u8> {
        self.row_totals
            .iter()
            .enumerate()
            .filter(|&(_, &total)| total > 0)
            .map(|(i, _)| self.range.pitch_at(i))
            .collect()
    }

    /// Sample the pitch that follows `current`.
    pub fn next_pitch(&self, current: u8, rng: &mut ChainRng) -> Result<u8> {
        if !self.range.contains(current) {
            return Err(ChainError::OutOfRangePitch {
                pitch: current,
                low: self.range.low(),
                high: self.range.high(),
            });
        }
        let row = self
            .row(current)
            .ok_or(ChainError::UntrainedRow { pitch: current })?;
        rng.weighted_index(row)
            .map(|j| self.range.pitch_at(j))
            .ok_or(ChainError::UntrainedRow { pitch: current })
    }
}

impl TransitionStats for DenseMarkov {
    fn train(&mut self, corpus: &Corpus) -> Result<()> {
        if corpus.is_empty() {
            return Err(ChainError::EmptyCorpus);
        }
        let sequences = corpus.pitch_sequences();
        self.check_range(&sequences)?;

        let range = self.range;
        let size = self.counts.len();
        let learned = sequences
            .par_iter()
            .map(|pitches| DenseMarkov::count_sequence(range, pitches))
            .reduce(
                || vec![0u64; size],
                |mut acc, part| {
                    acc.iter_mut().zip(part).for_each(|(a, b)| *a += b);
                    acc
                },
            );
        self.counts
            .iter_mut()
            .zip(learned)
            .for_each(|(a, b)| *a += b);
        self.normalize();
        log::debug!(
            "dense model: {} of {} rows trained",
            self.trained_pitches().len(),
            self.width()
        );
        Ok(())
    }

    fn transition_count(&self) -> usize {
        self.row_totals.iter().sum::<u64>() as usize
    }
}
