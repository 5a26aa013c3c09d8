//! Standard MIDI File parsing
//!
//! Converts one track/channel of an SMF into timed melody notes using the
//! `midly` crate. Tempo changes are collected from every track (format 1 files
//! keep them in the conductor track) and applied when converting ticks to
//! seconds. SMPTE timecode files map ticks to seconds directly.

use crate::error::{Error, Result};
use crate::timeline::MelodyNote;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::debug;

/// Microseconds per quarter note when a file has no tempo event (120 BPM).
const DEFAULT_TEMPO_US: u32 = 500_000;

/// Tick-to-seconds conversion for one file.
#[derive(Debug, Clone)]
pub(crate) enum TempoMap {
    /// (tick, seconds at tick, seconds per tick from here on)
    Metrical { segments: Vec<(u64, f64, f64)> },
    Timecode {
        ticks_per_second: f64,
    },
}

impl TempoMap {
    pub(crate) fn from_smf(smf: &Smf) -> Self {
        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int().max(1) as f64,
            Timing::Timecode(fps, subframes) => {
                return TempoMap::Timecode {
                    ticks_per_second: (fps.as_f32() as f64 * subframes.max(1) as f64),
                };
            }
        };

        let mut changes: Vec<(u64, u32)> = Vec::new();
        for track in &smf.tracks {
            let mut tick = 0u64;
            for event in track {
                tick += event.delta.as_int() as u64;
                if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                    changes.push((tick, tempo.as_int().max(1)));
                }
            }
        }
        // Stable sort keeps the later event for equal ticks last.
        changes.sort_by_key(|&(tick, _)| tick);

        let seconds_per_tick = |us: u32| us as f64 / 1_000_000.0 / ticks_per_beat;
        let mut segments = vec![(0u64, 0.0f64, seconds_per_tick(DEFAULT_TEMPO_US))];
        for (tick, us) in changes {
            let &(last_tick, last_secs, last_rate) = segments.last().unwrap_or(&(0, 0.0, 0.0));
            let secs = last_secs + (tick - last_tick) as f64 * last_rate;
            if tick == last_tick {
                segments.pop();
            }
            segments.push((tick, secs, seconds_per_tick(us)));
        }

        TempoMap::Metrical { segments }
    }

    pub(crate) fn seconds(&self, tick: u64) -> f64 {
        match self {
            TempoMap::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
            TempoMap::Metrical { segments } => {
                let idx = segments.partition_point(|&(t, _, _)| t <= tick);
                let (start_tick, start_secs, rate) = segments[idx.saturating_sub(1)];
                start_secs + (tick - start_tick) as f64 * rate
            }
        }
    }
}

/// Every (track, channel) pair holding at least one sounding note-on, in
/// track then channel order.
fn audible_voices(smf: &Smf) -> Vec<(usize, u8)> {
    let mut voices = Vec::new();
    for (index, track) in smf.tracks.iter().enumerate() {
        let mut channels = [false; 16];
        for event in track {
            if let TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { vel, .. },
            } = event.kind
            {
                if vel.as_int() > 0 {
                    channels[channel.as_int() as usize] = true;
                }
            }
        }
        voices.extend(
            (0..16u8)
                .filter(|&ch| channels[ch as usize])
                .map(|ch| (index, ch)),
        );
    }
    voices
}

/// Extract the notes of `track`/`channel`, sorted by onset.
///
/// The requested track/channel must be the only one in the file with
/// sounding notes. A note ends at its matching note-off (or a velocity-zero
/// note-on), or at the end of the track if it is never released. Two
/// different keys starting on the same tick make the melody ambiguous.
pub(crate) fn extract_notes(data: &[u8], track: usize, channel: u8) -> Result<Vec<MelodyNote>> {
    if channel > 15 {
        return Err(Error::InvalidChannel(channel));
    }

    let smf = Smf::parse(data)?;
    let events = smf.tracks.get(track).ok_or(Error::TrackOutOfRange {
        track,
        tracks: smf.tracks.len(),
    })?;

    let voices = audible_voices(&smf);
    if !voices.contains(&(track, channel)) {
        return Err(Error::NoAudibleData { track, channel });
    }
    if let Some(&(other_track, other_channel)) =
        voices.iter().find(|&&voice| voice != (track, channel))
    {
        return Err(Error::MultipleAudibleTracks {
            track,
            channel,
            other_track,
            other_channel,
        });
    }

    let tempo = TempoMap::from_smf(&smf);

    debug!(
        "Parsing MIDI melody: {} tracks, track {} has {} events, timing {:?}",
        smf.tracks.len(),
        track,
        events.len(),
        smf.header.timing
    );

    // (onset tick, end tick, key)
    let mut notes: Vec<(u64, Option<u64>, u8)> = Vec::new();
    let mut tick = 0u64;

    for event in events {
        tick += event.delta.as_int() as u64;

        let TrackEventKind::Midi {
            channel: ch,
            message,
        } = event.kind
        else {
            continue;
        };
        if ch.as_int() != channel {
            continue;
        }

        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                let key = key.as_int();
                if let Some(&(onset, _, other)) = notes.last() {
                    if onset == tick && other != key {
                        return Err(Error::AmbiguousMelody {
                            track,
                            channel,
                            seconds: tempo.seconds(tick),
                        });
                    }
                    if onset == tick {
                        continue;
                    }
                }
                notes.push((tick, None, key));
            }
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                let key = key.as_int();
                if let Some(note) = notes
                    .iter_mut()
                    .find(|(_, end, k)| end.is_none() && *k == key)
                {
                    note.1 = Some(tick);
                }
            }
            _ => {}
        }
    }

    if notes.is_empty() {
        return Err(Error::NoAudibleData { track, channel });
    }

    let track_end = tick;
    let notes: Vec<MelodyNote> = notes
        .into_iter()
        .map(|(onset, end, key)| MelodyNote {
            start: tempo.seconds(onset),
            end: tempo.seconds(end.unwrap_or(track_end).max(onset)),
            key,
        })
        .collect();

    debug!(
        "Extracted {} melody notes, last onset at {:.3}s",
        notes.len(),
        notes.last().map(|n| n.start).unwrap_or(0.0)
    );

    Ok(notes)
}
