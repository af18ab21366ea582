// Training corpus: one ordered event sequence per input file.
//
// Files are kept apart so that no transition is ever counted from the last
// note of one file to the first note of the next. The models only read the
// pitch column, via `pitch_sequences()`.

use crate::error::Result;
use crate::event::NoteEvent;

/// Events read from one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusFile {
    pub name: String,
    pub events: Vec<NoteEvent>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    files: Vec<CorpusFile>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the events of one file, keeping its boundary.
    pub fn push_file(&mut self, name: impl Into<String>, events: Vec<NoteEvent>) {
        self.files.push(CorpusFile {
            name: name.into(),
            events,
        });
    }

    /// Build a corpus straight from pitch lists, one list per file.
    ///
    /// Every event gets channel 0, velocity 100 and a zero delta.
    pub fn from_pitch_sequences(sequences: &[&[u8]]) -> Result<Self> {
        let mut corpus = Corpus::new();
        for (i, pitches) in sequences.iter().enumerate() {
            let events = pitches
                .iter()
                .map(|&p| NoteEvent::new(0.0, 0, p, 100))
                .collect::<Result<Vec<_>>>()?;
            corpus.push_file(format!("sequence-{i}"), events);
        }
        Ok(corpus)
    }

    pub fn files(&self) -> &[CorpusFile] {
        &self.files
    }

    /// Number of files, including files that produced no events.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when there is nothing to learn from: no files, or no events.
    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    pub fn event_count(&self) -> usize {
        self.files.iter().map(|f| f.events.len()).sum()
    }

    /// Pitch column of each file, boundaries preserved.
    pub fn pitch_sequences(&self) -> Vec<Vec<u8>> {
        self.files
            .iter()
            .map(|f| f.events.iter().map(NoteEvent::pitch).collect())
            .collect()
    }
}
