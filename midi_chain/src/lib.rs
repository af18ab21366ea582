// MIDI Markov-chain melody generator.
//
// Reads a handful of MIDI performances, learns which pitch tends to follow
// which, and samples a new melody from those statistics. Only pitch
// transitions are modeled; every generated note gets the same duration,
// channel and velocity.
//
// Architecture:
// - event.rs: NoteEvent (extracted input) and GeneratedNote (output)
// - range.rs: PitchRange, the bounded pitch domain with its presets
// - corpus.rs: per-file event sequences, boundaries preserved
// - markov.rs: ModelKind, TransitionStats and the TransitionModel enum
// - sparse.rs: order-2 successor multisets with order-1 backoff
// - dense.rs: order-1 row-normalized matrix over a PitchRange
// - generator.rs: seeded sampling of `length` notes with fallback policy
// - midi.rs: SMF decoding into events and encoding of generated notes
// - discover.rs: recursive input file discovery
// - config.rs: JSON run configuration and note/writer/extract constants
// - error.rs: ChainError
//
// Generation is deterministic given a seed (see `midi_chain_prng`).

pub mod config;
pub mod corpus;
pub mod dense;
pub mod discover;
pub mod error;
pub mod event;
pub mod generator;
pub mod markov;
pub mod midi;
pub mod range;
pub mod sparse;

pub use error::{ChainError, Result};
