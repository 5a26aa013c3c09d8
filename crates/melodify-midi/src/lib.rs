//! # Melodify MIDI
//!
//! Turns one track/channel of a Standard MIDI File into a [`MelodyTimeline`]
//! the melodifier can query from the audio thread.
//!
//! ```no_run
//! use melodify_core::{FileSystem, SpecialLocation};
//! use melodify_midi::{MelodyEndPolicy, MelodyTimeline};
//!
//! let fs = FileSystem::platform("karaoke");
//! let melody = MelodyTimeline::load(&fs, SpecialLocation::Documents, "song.mid", 0, 0)?;
//! let key = melody.key_at(1.25, MelodyEndPolicy::Hold);
//! # Ok::<(), melodify_midi::Error>(())
//! ```

pub mod error;
mod smf;
pub mod timeline;

pub use error::{Error, Result};
pub use timeline::{MelodyEndPolicy, MelodyNote, MelodyTimeline};
