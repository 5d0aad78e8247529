// MIDI Export - Channel mapping, per-channel note collection and SMF writing
// Produces DAW-friendly MIDI files with proper timing and metadata

use midly::{Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::director::NoteSink;
use super::levels::InstrumentTag;
use crate::error::ArrangementError;
use crate::notes::{NoteEvent, DRUM_BASS};

/// Playback channels with their General MIDI voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Piano,
    ElectricPiano,
    EnsembleStrings1,
    EnsembleStrings2,
    AcousticGuitar,
    FingerstyleBass,
    ChurchOrgan,
    ElectricGuitarClean,
    DrumKit,
}

impl Channel {
    /// MIDI channel number (0-indexed; 9 is percussion)
    pub fn midi_channel(&self) -> u8 {
        match self {
            Channel::Piano => 0,
            Channel::ElectricPiano => 1,
            Channel::EnsembleStrings1 => 2,
            Channel::EnsembleStrings2 => 3,
            Channel::AcousticGuitar => 4,
            Channel::FingerstyleBass => 5,
            Channel::ChurchOrgan => 6,
            Channel::ElectricGuitarClean => 7,
            Channel::DrumKit => 9,
        }
    }

    /// GM program, `None` for the percussion channel
    pub fn program(&self) -> Option<u8> {
        match self {
            Channel::Piano => Some(0),
            Channel::ElectricPiano => Some(4),
            Channel::EnsembleStrings1 => Some(48),
            Channel::EnsembleStrings2 => Some(49),
            Channel::AcousticGuitar => Some(24),
            Channel::FingerstyleBass => Some(33),
            Channel::ChurchOrgan => Some(19),
            Channel::ElectricGuitarClean => Some(27),
            Channel::DrumKit => None,
        }
    }

    /// Track name
    pub fn to_string(&self) -> &'static str {
        match self {
            Channel::Piano => "PIANO",
            Channel::ElectricPiano => "ELECTRIC_PIANO",
            Channel::EnsembleStrings1 => "STRINGS_1",
            Channel::EnsembleStrings2 => "STRINGS_2",
            Channel::AcousticGuitar => "ACOUSTIC_GUITAR",
            Channel::FingerstyleBass => "BASS",
            Channel::ChurchOrgan => "ORGAN",
            Channel::ElectricGuitarClean => "ELECTRIC_GUITAR",
            Channel::DrumKit => "DRUMS",
        }
    }
}

/// Static binding of each instrument tag to its channel
pub fn channel_for(tag: InstrumentTag) -> Channel {
    match tag {
        InstrumentTag::Lead => Channel::Piano,
        InstrumentTag::PianoChord | InstrumentTag::PianoArpeggio => Channel::ElectricPiano,
        InstrumentTag::StringChord => Channel::EnsembleStrings1,
        InstrumentTag::StringArpeggio => Channel::EnsembleStrings2,
        InstrumentTag::GuitarChord => Channel::AcousticGuitar,
        InstrumentTag::Bass => Channel::FingerstyleBass,
        InstrumentTag::DrumLight | InstrumentTag::DrumHeavy => Channel::DrumKit,
        InstrumentTag::Organ => Channel::ChurchOrgan,
        InstrumentTag::GuitarPowerChord => Channel::ElectricGuitarClean,
    }
}

/// A note converted to absolute time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNote {
    /// MIDI pitch (0-127)
    pub pitch: u8,

    /// Timestamp in milliseconds
    pub timestamp_ms: f64,

    /// Duration in milliseconds
    pub duration_ms: f64,

    /// MIDI velocity (0-127)
    pub velocity: u8,

    /// Part that produced this note
    pub tag: InstrumentTag,
}

/// Note sink collecting every part onto its playback channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMap {
    /// Tempo used for beat to millisecond conversion
    bpm: f64,

    tracks: BTreeMap<Channel, Vec<ScheduledNote>>,
}

impl TrackMap {
    pub fn new(bpm: f64) -> Result<Self, ArrangementError> {
        if !(bpm > 0.0) || !bpm.is_finite() {
            return Err(ArrangementError::config(format!("tempo must be positive, got {}", bpm)));
        }
        Ok(TrackMap {
            bpm,
            tracks: BTreeMap::new(),
        })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Milliseconds per beat
    pub fn beat_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    /// Channels that received at least one note, in channel order
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.tracks.keys().copied()
    }

    pub fn notes(&self, channel: Channel) -> &[ScheduledNote] {
        self.tracks.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn note_count(&self) -> usize {
        self.tracks.values().map(Vec::len).sum()
    }

    /// Bass drum hit times in milliseconds, ascending
    pub fn bass_drum_onsets_ms(&self) -> Vec<f64> {
        let mut onsets: Vec<f64> = self
            .notes(Channel::DrumKit)
            .iter()
            .filter(|n| n.pitch == DRUM_BASS)
            .map(|n| n.timestamp_ms)
            .collect();
        onsets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        onsets.dedup();
        onsets
    }

    /// End of the last sounding note in milliseconds
    pub fn end_ms(&self) -> f64 {
        self.tracks
            .values()
            .flatten()
            .map(|n| n.timestamp_ms + n.duration_ms)
            .fold(0.0, f64::max)
    }
}

impl NoteSink for TrackMap {
    fn add_note(&mut self, tag: InstrumentTag, note: &NoteEvent) {
        let beat_ms = self.beat_ms();
        self.tracks
            .entry(channel_for(tag))
            .or_default()
            .push(ScheduledNote {
                pitch: note.pitch,
                timestamp_ms: note.time * beat_ms,
                duration_ms: note.duration * beat_ms,
                velocity: note.volume,
                tag,
            });
    }
}

/// MIDI export options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiExportOptions {
    /// Pulses per quarter note (PPQ) - typically 480 or 960
    pub ppq: u16,

    /// Include tempo metadata
    pub include_tempo: bool,

    /// Include time signature metadata
    pub include_time_signature: bool,

    /// Include track names
    pub track_names: bool,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        MidiExportOptions {
            ppq: 480,
            include_tempo: true,
            include_time_signature: true,
            track_names: true,
        }
    }
}

/// Export a track map to MIDI file bytes
///
/// Track 0 carries tempo and time signature; every channel with notes
/// gets its own track with a program change (except drums).
pub fn export_midi(track_map: &TrackMap, options: &MidiExportOptions) -> Result<Vec<u8>, String> {
    if options.ppq == 0 || options.ppq > 0x7FFF {
        return Err(format!("PPQ {} outside 1-32767", options.ppq));
    }

    let header = Header {
        format: midly::Format::Parallel,
        timing: Timing::Metrical(options.ppq.into()),
    };

    let ticks_per_ms = calculate_ticks_per_ms(track_map.bpm(), options.ppq);

    let mut tracks = Vec::new();

    let mut meta_track = Track::new();
    if options.track_names {
        add_track_name(&mut meta_track, 0, "META");
    }
    if options.include_tempo {
        add_tempo(&mut meta_track, 0, track_map.bpm());
    }
    if options.include_time_signature {
        add_time_signature(&mut meta_track, 0);
    }
    add_end_of_track(&mut meta_track, 0);
    tracks.push(meta_track);

    for channel in track_map.channels() {
        tracks.push(create_channel_track(channel, track_map.notes(channel), ticks_per_ms, options));
    }

    let smf = Smf { header, tracks };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| format!("Failed to write MIDI: {}", e))?;

    log::debug!(
        "Exported MIDI: {} channel tracks, {} notes, {} bytes",
        track_map.channels().count(),
        track_map.note_count(),
        bytes.len()
    );

    Ok(bytes)
}

/// Create the MIDI track for one channel
fn create_channel_track(
    channel: Channel,
    notes: &[ScheduledNote],
    ticks_per_ms: f64,
    options: &MidiExportOptions,
) -> Track<'static> {
    let mut track = Track::new();
    let midi_channel = channel.midi_channel().into();

    if options.track_names {
        add_track_name(&mut track, 0, channel.to_string());
    }
    if let Some(program) = channel.program() {
        track.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Midi {
                channel: midi_channel,
                message: MidiMessage::ProgramChange {
                    program: program.into(),
                },
            },
        });
    }

    // (tick, note-offs first at equal ticks, event)
    let mut events: Vec<(u32, u8, TrackEventKind<'static>)> = Vec::with_capacity(notes.len() * 2);

    for note in notes {
        let tick_on = (note.timestamp_ms * ticks_per_ms) as u32;
        let tick_off = ((note.timestamp_ms + note.duration_ms) * ticks_per_ms) as u32;

        events.push((
            tick_on,
            1,
            TrackEventKind::Midi {
                channel: midi_channel,
                message: MidiMessage::NoteOn {
                    key: note.pitch.min(127).into(),
                    vel: note.velocity.min(127).into(),
                },
            },
        ));
        events.push((
            tick_off,
            0,
            TrackEventKind::Midi {
                channel: midi_channel,
                message: MidiMessage::NoteOff {
                    key: note.pitch.min(127).into(),
                    vel: 0.into(),
                },
            },
        ));
    }

    events.sort_by_key(|(tick, order, _)| (*tick, *order));

    let mut last_tick = 0;
    for (tick, _, kind) in events {
        track.push(TrackEvent {
            delta: tick.saturating_sub(last_tick).into(),
            kind,
        });
        last_tick = tick;
    }

    add_end_of_track(&mut track, 0);
    track
}

/// Calculate ticks per millisecond
fn calculate_ticks_per_ms(bpm: f64, ppq: u16) -> f64 {
    let ms_per_quarter = 60_000.0 / bpm;
    ppq as f64 / ms_per_quarter
}

fn add_track_name<'a>(track: &mut Track<'a>, delta: u32, name: &'a str) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    });
}

/// Add tempo meta message (microseconds per quarter note, 24-bit)
fn add_tempo(track: &mut Track<'_>, delta: u32, bpm: f64) {
    let us_per_quarter = ((60_000_000.0 / bpm) as u32).min(0x00FF_FFFF);

    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter.into())),
    });
}

/// Add a 4/4 time signature meta message
fn add_time_signature(track: &mut Track<'_>, delta: u32) {
    let numerator = 4u8;
    let denominator = 2u8; // 2^2 = 4 (quarter note)
    let clocks_per_click = 24u8;
    let thirty_seconds_per_quarter = 8u8;

    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
            numerator,
            denominator,
            clocks_per_click,
            thirty_seconds_per_quarter,
        )),
    });
}

fn add_end_of_track(track: &mut Track<'_>, delta: u32) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
}
