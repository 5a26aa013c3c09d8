//! Melody timeline: monophonic target notes over time.

use crate::error::{Error, Result};
use crate::smf::extract_notes;
use melodify_core::{FileSystem, SpecialLocation};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One note of a melody, in seconds from the start of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelodyNote {
    pub start: f64,
    pub end: f64,
    /// MIDI key number (60 = C4).
    pub key: u8,
}

/// What the target does once playback passes the last note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MelodyEndPolicy {
    /// Keep correcting toward the last note.
    #[default]
    Hold,
    /// Start the melody again from its first onset time.
    Loop,
    /// Stop correcting; the voice passes through.
    Release,
}

/// Ordered, monophonic melody.
///
/// Each onset sets the target until the next onset. Gaps between notes hold
/// the previous note so the voice is not released mid-phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelodyTimeline {
    notes: Vec<MelodyNote>,
    duration: f64,
}

impl MelodyTimeline {
    /// Build a timeline from notes in any order.
    pub fn from_notes(mut notes: Vec<MelodyNote>) -> Result<Self> {
        if notes.is_empty() {
            return Err(Error::NoAudibleData {
                track: 0,
                channel: 0,
            });
        }
        if let Some(bad) = notes
            .iter()
            .find(|n| !n.start.is_finite() || !n.end.is_finite() || n.start < 0.0 || n.key > 127)
        {
            return Err(Error::InvalidNote(format!("{:?}", bad)));
        }

        notes.sort_by(|a, b| a.start.total_cmp(&b.start));
        if let Some(pair) = notes
            .windows(2)
            .find(|w| w[0].start == w[1].start && w[0].key != w[1].key)
        {
            return Err(Error::AmbiguousMelody {
                track: 0,
                channel: 0,
                seconds: pair[0].start,
            });
        }
        notes.dedup_by(|b, a| a.start == b.start);

        let duration = notes
            .iter()
            .map(|n| n.end.max(n.start))
            .fold(0.0, f64::max);

        Ok(Self { notes, duration })
    }

    /// Parse one track/channel of a Standard MIDI File.
    pub fn from_smf(data: &[u8], track: usize, channel: u8) -> Result<Self> {
        let notes = extract_notes(data, track, channel)?;
        Self::from_notes(notes).map_err(|e| match e {
            Error::NoAudibleData { .. } => Error::NoAudibleData { track, channel },
            other => other,
        })
    }

    /// Load one track/channel of a MIDI file through the filesystem context.
    pub fn load(
        fs: &FileSystem,
        location: SpecialLocation,
        path: impl AsRef<Path>,
        track: usize,
        channel: u8,
    ) -> Result<Self> {
        let path = path.as_ref();
        let data = fs.read(location, path)?;
        let timeline = Self::from_smf(&data, track, channel)?;
        info!(
            "Loaded melody {} (track {}, channel {}): {} notes, {:.2}s",
            path.display(),
            track,
            channel,
            timeline.len(),
            timeline.duration()
        );
        Ok(timeline)
    }

    pub fn notes(&self) -> &[MelodyNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// End of the last note in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Target key at `seconds`, or `None` when the voice should pass through.
    ///
    /// Binary search only; safe to call from the audio thread.
    pub fn key_at(&self, seconds: f64, policy: MelodyEndPolicy) -> Option<u8> {
        let first = self.notes.first()?;

        let t = if seconds >= self.duration {
            match policy {
                MelodyEndPolicy::Hold => seconds,
                MelodyEndPolicy::Release => return None,
                MelodyEndPolicy::Loop if self.duration > 0.0 => {
                    let wrapped = seconds % self.duration;
                    if wrapped < first.start {
                        // Still sounding the last note of the previous pass.
                        return self.notes.last().map(|n| n.key);
                    }
                    wrapped
                }
                MelodyEndPolicy::Loop => seconds,
            }
        } else {
            seconds
        };

        let idx = self.notes.partition_point(|n| n.start <= t);
        idx.checked_sub(1).map(|i| self.notes[i].key)
    }
}
