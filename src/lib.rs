/// LIFESEQ - a cellular-automaton sound sequencer core
///
/// This library provides the pieces a driver needs to turn a life-like grid
/// into oscillator targets:
/// - Grid engine with toroidal neighborhoods and strict or soft step rules
/// - Audio mapping from cell position and state to frequency and gain
/// - Session object that ticks the grid and recomputes the matrices
/// - Playback engine for timing, pause and stop
/// Display and sound output stay with the caller.

pub mod config;
pub mod error;
pub mod grid;
pub mod mapping;
pub mod sequencer;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ConfigError, Error, GridError, Result};
pub use grid::{Grid, Pattern, Rule, RuleKind};
pub use mapping::{
    damp_curve, freq_multiplier, frequency_matrix, gain_matrix, note_to_freq, note_to_freq_a440,
    FrequencyCache, Matrix, NoteAnchor, VoiceChange, VoiceTracker, MAX_FREQUENCY_HZ,
};
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent, Transport, TransportState};
pub use sequencer::{Frame, FrameConsumer, Preset, Sequencer, SessionParams};
