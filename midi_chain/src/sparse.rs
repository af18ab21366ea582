// Sparse order-2 Markov model with order-1 backoff.
//
// Two tables of successor multisets:
// - order2: (pitch[i], pitch[i+1]) -> every pitch[i+2] observed after it
// - order1: pitch[i] -> every pitch[i+1] observed after it
//
// Successors are stored as plain lists with repetition, in corpus order.
// Picking uniformly from such a list reproduces the empirical transition
// frequencies without any separate normalization step.
//
// Sampling tries the order-2 context first and backs off to order-1 keyed
// by the most recent pitch. A miss at both levels is reported as
// `ChainError::UntrainedContext`; what to do about it is the generator's
// decision (see generator.rs).

use crate::corpus::Corpus;
use crate::error::{ChainError, Result};
use crate::markov::TransitionStats;
use midi_chain_prng::ChainRng;
use rayon::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseMarkov {
    order2: BTreeMap<(u8, u8), Vec<u8>>,
    order1: BTreeMap<u8, Vec<u8>>,
}

impl SparseMarkov {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the transitions of a single file.
    fn from_sequence(pitches: &[u8]) -> Self {
        let mut model = Self::default();
        for w in pitches.windows(3) {
            model.order2.entry((w[0], w[1])).or_default().push(w[2]);
        }
        for w in pitches.windows(2) {
            model.order1.entry(w[0]).or_default().push(w[1]);
        }
        model
    }

    /// Append another model's observations to this one.
    ///
    /// Associative, so partial models can be combined in any grouping; the
    /// successor lists end up in `self`-then-`other` order.
    pub fn merge(&mut self, other: SparseMarkov) {
        for (context, successors) in other.order2 {
            self.order2.entry(context).or_default().extend(successors);
        }
        for (pitch, successors) in other.order1 {
            self.order1.entry(pitch).or_default().extend(successors);
        }
    }

    /// Recorded successors of the pair context `(prev2, prev1)`.
    pub fn successors(&self, prev2: u8, prev1: u8) -> Option<&[u8]> {
        self.order2.get(&(prev2, prev1)).map(Vec::as_slice)
    }

    /// Recorded successors of `prev1` alone.
    pub fn fallback_successors(&self, prev1: u8) -> Option<&[u8]> {
        self.order1.get(&prev1).map(Vec::as_slice)
    }

    /// Sample the pitch that follows `(prev2, prev1)`.
    pub fn next_pitch(&self, prev2: u8, prev1: u8, rng: &mut ChainRng) -> Result<u8> {
        let pool = self
            .successors(prev2, prev1)
            .or_else(|| self.fallback_successors(prev1));
        pool.and_then(|p| rng.choose(p).copied())
            .ok_or(ChainError::UntrainedContext { prev2, prev1 })
    }

    /// Sample the pitch that follows `prev1` using only the order-1 table.
    pub fn next_after(&self, prev1: u8, rng: &mut ChainRng) -> Result<u8> {
        self.fallback_successors(prev1)
            .and_then(|p| rng.choose(p).copied())
            .ok_or(ChainError::UntrainedPitch { pitch: prev1 })
    }

    /// Pitches that have at least one order-1 successor, ascending.
    ///
    /// Any of these is a safe place to start or restart sampling.
    pub fn observed_pitches(&self) -> Vec<u8> {
        self.order1.keys().copied().collect()
    }

    /// Number of distinct order-2 contexts.
    pub fn context_count(&self) -> usize {
        self.order2.len()
    }
}

impl TransitionStats for SparseMarkov {
    fn train(&mut self, corpus: &Corpus) -> Result<()> {
        if corpus.is_empty() {
            return Err(ChainError::EmptyCorpus);
        }
        let sequences = corpus.pitch_sequences();
        let learned = sequences
            .par_iter()
            .map(|pitches| SparseMarkov::from_sequence(pitches))
            .reduce(SparseMarkov::default, |mut acc, part| {
                acc.merge(part);
                acc
            });
        self.merge(learned);
        log::debug!(
            "sparse model: {} pair contexts, {} single contexts",
            self.order2.len(),
            self.order1.len()
        );
        Ok(())
    }

    fn transition_count(&self) -> usize {
        self.order1.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trained(sequences: &[&[u8]]) -> SparseMarkov {
        let mut model = SparseMarkov::new();
        model
            .train(&Corpus::from_pitch_sequences(sequences).unwrap())
            .unwrap();
        model
    }

    #[test]
    fn records_both_orders() {
        let model = trained(&[&[60, 62, 64, 62, 64, 60]]);
        assert_eq!(model.successors(62, 64), Some(&[62, 60][..]));
        assert_eq!(model.successors(60, 62), Some(&[64][..]));
        assert_eq!(model.fallback_successors(62), Some(&[64, 64][..]));
        assert_eq!(model.fallback_successors(64), Some(&[62, 60][..]));
        assert_eq!(model.successors(64, 60), None);
        assert_eq!(model.transition_count(), 5);
    }

    #[test]
    fn short_files_contribute_partially() {
        let model = trained(&[&[60], &[61, 62]]);
        assert_eq!(model.context_count(), 0);
        assert_eq!(model.fallback_successors(61), Some(&[62][..]));
        assert_eq!(model.fallback_successors(60), None);
    }

    #[test]
    fn no_transition_across_files() {
        let model = trained(&[&[60, 62], &[64, 65]]);
        assert_eq!(model.fallback_successors(62), None);
        assert_eq!(model.successors(60, 62), None);
    }

    #[test]
    fn empty_corpus_leaves_model_untouched() {
        let mut model = trained(&[&[60, 62, 64]]);
        let before = model.clone();
        let err = model.train(&Corpus::new()).unwrap_err();
        assert!(matches!(err, ChainError::EmptyCorpus));
        assert_eq!(model, before);
    }

    #[test]
    fn repeated_training_accumulates() {
        let corpus = Corpus::from_pitch_sequences(&[&[60, 62, 64]]).unwrap();
        let mut model = SparseMarkov::new();
        model.train(&corpus).unwrap();
        model.train(&corpus).unwrap();
        assert_eq!(model.successors(60, 62), Some(&[64, 64][..]));
    }

    #[test]
    fn samples_stay_within_recorded_multiset() {
        let model = trained(&[&[60, 62, 64, 60, 62, 67, 60, 62, 64]]);
        let recorded = model.successors(60, 62).unwrap().to_vec();
        let mut rng = ChainRng::new(3);
        for _ in 0..500 {
            let next = model.next_pitch(60, 62, &mut rng).unwrap();
            assert!(recorded.contains(&next), "{next} not in {recorded:?}");
        }
    }

    #[test]
    fn falls_back_to_order_one() {
        let model = trained(&[&[60, 62, 64]]);
        let mut rng = ChainRng::new(11);
        // (50, 62) was never seen as a pair, but 62 -> 64 was.
        assert_eq!(model.next_pitch(50, 62, &mut rng).unwrap(), 64);
    }

    #[test]
    fn unseen_context_is_reported() {
        let model = trained(&[&[60, 62, 64]]);
        let mut rng = ChainRng::new(11);
        let err = model.next_pitch(70, 71, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ChainError::UntrainedContext {
                prev2: 70,
                prev1: 71
            }
        ));
    }

    #[test]
    fn order_one_miss_names_only_the_pitch() {
        let model = trained(&[&[60, 62, 64]]);
        let mut rng = ChainRng::new(11);
        assert_eq!(model.next_after(60, &mut rng).unwrap(), 62);
        assert!(matches!(
            model.next_after(64, &mut rng),
            Err(ChainError::UntrainedPitch { pitch: 64 })
        ));
    }

    #[test]
    fn parallel_training_matches_sequential_order() {
        let files: Vec<Vec<u8>> = (0..64u8)
            .map(|i| vec![60, 62, 60 + (i % 12), 62, 60])
            .collect();
        let refs: Vec<&[u8]> = files.iter().map(Vec::as_slice).collect();
        let model = trained(&refs);

        let mut sequential = SparseMarkov::new();
        for f in &files {
            sequential.merge(SparseMarkov::from_sequence(f));
        }
        assert_eq!(model, sequential);
    }
}
