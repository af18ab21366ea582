// Transition model: the learned pitch statistics.
//
// Two interchangeable strategies, picked at construction by `ModelKind`:
// - SparseMarkov (sparse.rs): order-2 successor multisets with order-1
//   backoff, unbounded pitch domain.
// - DenseMarkov (dense.rs): order-1 row-normalized matrix over a fixed
//   `PitchRange`.
//
// Both implement `TransitionStats`, the training side of the interface.
// Sampling lives with the generator (generator.rs), which borrows the
// model read-only and dispatches on the variant.

use crate::corpus::Corpus;
use crate::dense::DenseMarkov;
use crate::error::Result;
use crate::range::PitchRange;
use crate::sparse::SparseMarkov;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Training side shared by every model.
pub trait TransitionStats {
    /// Accumulate the transitions of `corpus`.
    ///
    /// Fails with `EmptyCorpus` on a corpus without events. On any error
    /// the model is left unchanged.
    fn train(&mut self, corpus: &Corpus) -> Result<()>;

    /// Total number of transitions observed so far.
    fn transition_count(&self) -> usize;

    fn is_trained(&self) -> bool {
        self.transition_count() > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelKind {
    #[default]
    #[serde(rename = "sparse")]
    SparseMarkov,
    #[serde(rename = "dense")]
    DenseMarkov,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::SparseMarkov => "sparse",
            ModelKind::DenseMarkov => "dense",
        })
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sparse" => Ok(ModelKind::SparseMarkov),
            "dense" => Ok(ModelKind::DenseMarkov),
            other => Err(format!("unknown model '{other}' (expected sparse or dense)")),
        }
    }
}

/// A trained (or trainable) transition model of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionModel {
    Sparse(SparseMarkov),
    Dense(DenseMarkov),
}

impl TransitionModel {
    /// Create an empty model. `range` sizes the dense matrix and is
    /// ignored by the sparse model.
    pub fn new(kind: ModelKind, range: PitchRange) -> Self {
        match kind {
            ModelKind::SparseMarkov => TransitionModel::Sparse(SparseMarkov::new()),
            ModelKind::DenseMarkov => TransitionModel::Dense(DenseMarkov::new(range)),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            TransitionModel::Sparse(_) => ModelKind::SparseMarkov,
            TransitionModel::Dense(_) => ModelKind::DenseMarkov,
        }
    }
}

impl TransitionStats for TransitionModel {
    fn train(&mut self, corpus: &Corpus) -> Result<()> {
        match self {
            TransitionModel::Sparse(m) => m.train(corpus),
            TransitionModel::Dense(m) => m.train(corpus),
        }
    }

    fn transition_count(&self) -> usize {
        match self {
            TransitionModel::Sparse(m) => m.transition_count(),
            TransitionModel::Dense(m) => m.transition_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [ModelKind::SparseMarkov, ModelKind::DenseMarkov] {
            assert_eq!(kind.to_string().parse::<ModelKind>().unwrap(), kind);
        }
        assert_eq!("DENSE".parse::<ModelKind>().unwrap(), ModelKind::DenseMarkov);
        assert!("rnn".parse::<ModelKind>().is_err());
    }

    #[test]
    fn kind_serializes_short_names() {
        assert_eq!(
            serde_json::to_string(&ModelKind::DenseMarkov).unwrap(),
            "\"dense\""
        );
        assert!(serde_json::from_str::<ModelKind>("\"lstm\"").is_err());
    }

    #[test]
    fn dispatches_training_to_variant() {
        let corpus = Corpus::from_pitch_sequences(&[&[60, 62, 64]]).unwrap();
        for kind in [ModelKind::SparseMarkov, ModelKind::DenseMarkov] {
            let mut model = TransitionModel::new(kind, PitchRange::NARROW);
            assert!(!model.is_trained());
            model.train(&corpus).unwrap();
            assert_eq!(model.kind(), kind);
            assert_eq!(model.transition_count(), 2);
        }
    }

    #[test]
    fn both_variants_refuse_empty_corpus() {
        for kind in [ModelKind::SparseMarkov, ModelKind::DenseMarkov] {
            let mut model = TransitionModel::new(kind, PitchRange::NARROW);
            let before = model.clone();
            assert!(matches!(
                model.train(&Corpus::new()),
                Err(ChainError::EmptyCorpus)
            ));
            assert_eq!(model, before);
        }
    }
}
