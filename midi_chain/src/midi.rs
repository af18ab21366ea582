// MIDI file input and output.
//
// Input: `read_events` decodes a Standard MIDI File with `midly` and
// flattens it into the ordered note events the models train on. Tracks are
// merged by absolute tick (format 0/1) or laid end to end (format 2), and
// each kept event records the seconds elapsed since the previous kept
// event. Meta events, program/control changes, pitch bends, aftertouch and
// sysex are dropped; tempo meta events still drive the tick-to-seconds
// conversion. By default only sounding note-ons are kept, see
// `ExtractOptions`.
//
// Output: `write_midi` turns generated notes into a single-track SMF. Each
// note becomes a note-on/note-off pair, both placed `duration_units *
// scale_factor` ticks after the previous message.

use crate::config::{ExtractOptions, WriterConfig};
use crate::corpus::Corpus;
use crate::error::{ChainError, Result};
use crate::event::{GeneratedNote, NoteEvent};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u28},
};
use std::path::{Path, PathBuf};

/// Tempo assumed until the file sets one: 120 BPM.
const DEFAULT_TEMPO_US_PER_BEAT: u32 = 500_000;

/// Largest delta a variable-length quantity can hold.
const MAX_DELTA_TICKS: u32 = 0x0fff_ffff;

/// Converts tick intervals to seconds, tracking tempo changes.
enum TickClock {
    Metrical {
        ticks_per_beat: f64,
        us_per_beat: f64,
    },
    Timecode {
        ticks_per_second: f64,
    },
}

impl TickClock {
    fn new(timing: Timing) -> Self {
        match timing {
            Timing::Metrical(tpb) => TickClock::Metrical {
                ticks_per_beat: tpb.as_int().max(1) as f64,
                us_per_beat: DEFAULT_TEMPO_US_PER_BEAT as f64,
            },
            Timing::Timecode(fps, subframe) => TickClock::Timecode {
                ticks_per_second: fps.as_f32() as f64 * subframe.max(1) as f64,
            },
        }
    }

    fn set_tempo(&mut self, us: u32) {
        // Tempo is meaningless for timecode files.
        if let TickClock::Metrical { us_per_beat, .. } = self {
            *us_per_beat = us as f64;
        }
    }

    fn seconds(&self, ticks: u64) -> f64 {
        match *self {
            TickClock::Metrical {
                ticks_per_beat,
                us_per_beat,
            } => ticks as f64 * us_per_beat / 1_000_000.0 / ticks_per_beat,
            TickClock::Timecode { ticks_per_second } => ticks as f64 / ticks_per_second,
        }
    }
}

/// Read one MIDI file into note events.
pub fn read_events(path: &Path, options: &ExtractOptions) -> Result<Vec<NoteEvent>> {
    let data = std::fs::read(path).map_err(|e| ChainError::io(path, e))?;
    let smf = Smf::parse(&data).map_err(|source| ChainError::Midi {
        path: path.to_path_buf(),
        source,
    })?;
    smf_events(&smf, options)
}

/// Read every file into a corpus, one entry per file.
///
/// Files that cannot be read or decoded are skipped with a warning; an
/// all-bad input shows up later as an empty corpus.
pub fn read_corpus(paths: &[PathBuf], options: &ExtractOptions) -> Corpus {
    let mut corpus = Corpus::new();
    for path in paths {
        match read_events(path, options) {
            Ok(events) => {
                log::info!("read {} ({} notes)", path.display(), events.len());
                corpus.push_file(path.display().to_string(), events);
            }
            Err(e) => log::warn!("skipping {}: {e}", path.display()),
        }
    }
    corpus
}

/// Flatten a parsed SMF into note events.
pub fn smf_events(smf: &Smf<'_>, options: &ExtractOptions) -> Result<Vec<NoteEvent>> {
    let mut clock = TickClock::new(smf.header.timing);
    let mut events = Vec::new();
    let mut last_tick = 0u64;
    let mut pending = 0.0;

    for (tick, kind) in merge_tracks(smf) {
        pending += clock.seconds(tick - last_tick);
        last_tick = tick;
        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(us)) => clock.set_tempo(us.as_int()),
            TrackEventKind::Midi { channel, message } => {
                if let Some((key, vel)) = note_of(message, options) {
                    events.push(NoteEvent::new(pending, channel.as_int(), key, vel)?);
                    pending = 0.0;
                }
            }
            _ => {}
        }
    }
    Ok(events)
}

/// All events with absolute ticks, in playback order. Ties keep track order.
fn merge_tracks<'a>(smf: &Smf<'a>) -> Vec<(u64, TrackEventKind<'a>)> {
    let sequential = smf.header.format == Format::Sequential;
    let mut merged = Vec::new();
    let mut offset = 0u64;
    for track in &smf.tracks {
        let mut tick = offset;
        for ev in track {
            tick += ev.delta.as_int() as u64;
            merged.push((tick, ev.kind));
        }
        if sequential {
            offset = tick;
        }
    }
    merged.sort_by_key(|&(tick, _)| tick);
    merged
}

/// Pitch and velocity of a message worth keeping.
fn note_of(message: MidiMessage, options: &ExtractOptions) -> Option<(u8, u8)> {
    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Some((key.as_int(), vel.as_int())),
        MidiMessage::NoteOn { key, vel } | MidiMessage::NoteOff { key, vel }
            if options.include_releases =>
        {
            Some((key.as_int(), vel.as_int()))
        }
        _ => None,
    }
}

/// Ticks between messages for one note.
fn note_ticks(note: &GeneratedNote, config: &WriterConfig) -> u32 {
    let ticks = (note.duration_units * config.scale_factor).round();
    if ticks.is_finite() {
        ticks.clamp(0.0, MAX_DELTA_TICKS as f64) as u32
    } else {
        0
    }
}

/// Build an in-memory single-track SMF from generated notes.
pub fn notes_to_smf(notes: &[GeneratedNote], config: &WriterConfig) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(config.ticks_per_beat.min(0x7fff))),
    ));

    let mut track: Track<'static> = Vec::with_capacity(notes.len() * 2 + 2);
    if let Some(program) = config.program {
        let channel = notes.first().map_or(0, |n| n.channel);
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel: u4::new(channel.min(15)),
                message: MidiMessage::ProgramChange {
                    program: u7::new(program.min(127)),
                },
            },
        });
    }

    for note in notes {
        let delta = u28::new(note_ticks(note, config));
        let channel = u4::new(note.channel.min(15));
        let key = u7::new(note.pitch.min(127));
        let vel = u7::new(note.velocity.min(127));
        track.push(TrackEvent {
            delta,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            },
        });
        track.push(TrackEvent {
            delta,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff { key, vel },
            },
        });
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    smf
}

/// Encode generated notes as SMF bytes.
pub fn encode(notes: &[GeneratedNote], config: &WriterConfig) -> Result<Vec<u8>> {
    let smf = notes_to_smf(notes, config);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Encode generated notes and write them to `path`.
pub fn write_midi(notes: &[GeneratedNote], path: &Path, config: &WriterConfig) -> Result<()> {
    let buf = encode(notes, config)?;
    std::fs::write(path, &buf).map_err(|e| ChainError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(pitch: u8) -> GeneratedNote {
        GeneratedNote {
            duration_units: 0.15,
            channel: 0,
            pitch,
            velocity: 100,
        }
    }

    fn midi(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(2),
                message,
            },
        }
    }

    fn on(key: u8, vel: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(vel),
        }
    }

    fn off(key: u8) -> MidiMessage {
        MidiMessage::NoteOff {
            key: u7::new(key),
            vel: u7::new(64),
        }
    }

    fn single_track(events: Vec<TrackEvent<'static>>) -> Smf<'static> {
        let mut smf = Smf::new(Header::new(
            Format::SingleTrack,
            Timing::Metrical(u15::new(480)),
        ));
        smf.tracks.push(events);
        smf
    }

    #[test]
    fn writes_note_pairs() {
        let smf = notes_to_smf(&[note(60), note(64)], &WriterConfig::default());
        assert_eq!(smf.tracks.len(), 1);
        // program change + 2 * (on, off) + end of track
        assert_eq!(smf.tracks[0].len(), 6);
        // 0.15 * 500 = 75 ticks
        assert_eq!(smf.tracks[0][1].delta.as_int(), 75);
        assert_eq!(smf.tracks[0][2].delta.as_int(), 75);
    }

    #[test]
    fn program_change_is_optional() {
        let config = WriterConfig {
            program: None,
            ..Default::default()
        };
        let smf = notes_to_smf(&[note(60)], &config);
        assert_eq!(smf.tracks[0].len(), 3);
    }

    #[test]
    fn round_trip_preserves_pitches() {
        let pitches = [60u8, 62, 64, 62, 64, 60, 31, 99];
        let notes: Vec<_> = pitches.iter().map(|&p| note(p)).collect();
        let bytes = encode(&notes, &WriterConfig::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let events = smf_events(&smf, &ExtractOptions::default()).unwrap();
        let decoded: Vec<u8> = events.iter().map(NoteEvent::pitch).collect();
        assert_eq!(decoded, pitches);
        assert!(events.iter().all(|e| e.velocity() == 100));
    }

    #[test]
    fn extract_skips_non_note_messages() {
        let smf = single_track(vec![
            midi(
                0,
                MidiMessage::ProgramChange {
                    program: u7::new(5),
                },
            ),
            midi(
                0,
                MidiMessage::Controller {
                    controller: u7::new(7),
                    value: u7::new(100),
                },
            ),
            midi(0, on(60, 90)),
            midi(
                10,
                MidiMessage::PitchBend {
                    bend: midly::PitchBend(midly::num::u14::new(0x2000)),
                },
            ),
            midi(10, off(60)),
            midi(0, on(62, 0)),
            midi(0, on(67, 80)),
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            },
        ]);
        let events = smf_events(&smf, &ExtractOptions::default()).unwrap();
        let kept: Vec<(u8, u8, u8)> = events
            .iter()
            .map(|e| (e.channel(), e.pitch(), e.velocity()))
            .collect();
        assert_eq!(kept, vec![(2, 60, 90), (2, 67, 80)]);
    }

    #[test]
    fn releases_kept_on_request() {
        let smf = single_track(vec![midi(0, on(60, 90)), midi(480, off(60)), midi(0, on(60, 0))]);
        let options = ExtractOptions {
            include_releases: true,
        };
        let events = smf_events(&smf, &options).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].velocity(), 64);
        assert_eq!(events[2].velocity(), 0);
    }

    #[test]
    fn delta_times_follow_tempo() {
        // 480 ticks per beat at the default 120 BPM: one beat is 0.5 s.
        // After the tempo meta (60 BPM) one beat is 1 s.
        let smf = single_track(vec![
            midi(0, on(60, 90)),
            midi(480, on(62, 90)),
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(midly::num::u24::new(1_000_000))),
            },
            midi(480, on(64, 90)),
        ]);
        let events = smf_events(&smf, &ExtractOptions::default()).unwrap();
        let deltas: Vec<f64> = events.iter().map(NoteEvent::delta_time).collect();
        assert_eq!(deltas.len(), 3);
        assert!((deltas[0] - 0.0).abs() < 1e-9);
        assert!((deltas[1] - 0.5).abs() < 1e-9);
        assert!((deltas[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn parallel_tracks_interleave_by_time() {
        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(480)),
        ));
        smf.tracks.push(vec![midi(0, on(60, 90)), midi(200, on(64, 90))]);
        smf.tracks.push(vec![midi(100, on(62, 90)), midi(200, on(65, 90))]);
        let events = smf_events(&smf, &ExtractOptions::default()).unwrap();
        let pitches: Vec<u8> = events.iter().map(NoteEvent::pitch).collect();
        assert_eq!(pitches, vec![60, 62, 64, 65]);
    }

    #[test]
    fn write_and_read_file() {
        let path = std::env::temp_dir().join(format!("midi_chain_{}_rw.mid", std::process::id()));
        write_midi(&[note(70), note(72)], &path, &WriterConfig::default()).unwrap();
        let events = read_events(&path, &ExtractOptions::default()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].pitch(), 72);
    }

    #[test]
    fn read_reports_bad_bytes() {
        let path = std::env::temp_dir().join(format!("midi_chain_{}_bad.mid", std::process::id()));
        std::fs::write(&path, b"not a midi file").unwrap();
        let err = read_events(&path, &ExtractOptions::default()).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ChainError::Midi { .. }));
    }

    #[test]
    fn read_corpus_skips_unreadable_files() {
        let corpus = read_corpus(
            &[PathBuf::from("/no/such/file.mid")],
            &ExtractOptions::default(),
        );
        assert!(corpus.is_empty());
        assert_eq!(corpus.len(), 0);
    }
}
