/// Audio mapping - derives per-cell frequency and gain targets
/// Pure functions over grid coordinates and session parameters; no audio graph here
use serde::{Deserialize, Serialize};

use crate::grid::Grid;

pub mod voices;

pub use voices::{VoiceChange, VoiceTracker};

/// Upper bound of the standard digital audio range, in Hz.
pub const MAX_FREQUENCY_HZ: f64 = 22050.0;

/// Per-cell values, indexed `[x][y]` like the grid.
pub type Matrix = Vec<Vec<f64>>;

/// Row-major rank of a cell, in `[0, 1)`.
pub fn index(x: usize, y: usize, grid_size: usize) -> f64 {
    let n = grid_size as f64;
    (x as f64 * n + y as f64) / (n * n)
}

/// Equal-tempered, anchored so that note 0 is 110/32 Hz.
pub fn note_to_freq(note: f64) -> f64 {
    (110.0 / 32.0) * 2.0_f64.powf(note / 12.0)
}

/// Equal-tempered, anchored on 440/32 Hz at note 9.
pub fn note_to_freq_a440(note: f64) -> f64 {
    (440.0 / 32.0) * 2.0_f64.powf((note - 9.0) / 12.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum NoteAnchor {
    #[default]
    Low110,
    A440,
}

impl NoteAnchor {
    pub fn freq(self, note: f64) -> f64 {
        match self {
            NoteAnchor::Low110 => note_to_freq(note),
            NoteAnchor::A440 => note_to_freq_a440(note),
        }
    }
}

pub fn freq_multiplier(x: usize, y: usize, grid_size: usize, multiplier: f64) -> f64 {
    1.0 + 2.0_f64.powf(multiplier) * index(x, y, grid_size)
}

pub fn frequency_matrix(grid_size: usize, root_note: f64, multiplier: f64) -> Matrix {
    frequency_matrix_with(NoteAnchor::Low110, grid_size, root_note, multiplier)
}

/// Frequency for every cell, never above [`MAX_FREQUENCY_HZ`].
pub fn frequency_matrix_with(
    anchor: NoteAnchor,
    grid_size: usize,
    root_note: f64,
    multiplier: f64,
) -> Matrix {
    let root = anchor.freq(root_note);
    (0..grid_size)
        .map(|x| {
            (0..grid_size)
                .map(|y| {
                    (root * freq_multiplier(x, y, grid_size, multiplier)).min(MAX_FREQUENCY_HZ)
                })
                .collect()
        })
        .collect()
}

pub fn damp_curve(x: usize, y: usize, grid_size: usize, factor: f64) -> f64 {
    (1.0 - index(x, y, grid_size)).powf(factor)
}

/// Target gain per cell: the cell's vitality scaled by the damping curve.
pub fn gain_matrix(grid: &Grid, damping: f64) -> Matrix {
    let size = grid.size();
    grid.cells()
        .iter()
        .enumerate()
        .map(|(x, row)| {
            row.iter()
                .enumerate()
                .map(|(y, vitality)| damp_curve(x, y, size, damping) * vitality)
                .collect()
        })
        .collect()
}

/// Holds the last frequency matrix and rebuilds it only when its inputs change.
#[derive(Debug, Clone, Default)]
pub struct FrequencyCache {
    key: Option<(NoteAnchor, usize, f64, f64)>,
    freqs: Matrix,
}

impl FrequencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the matrix was recomputed.
    pub fn refresh(
        &mut self,
        anchor: NoteAnchor,
        grid_size: usize,
        root_note: f64,
        multiplier: f64,
    ) -> bool {
        let key = (anchor, grid_size, root_note, multiplier);
        if self.key == Some(key) {
            return false;
        }

        self.freqs = frequency_matrix_with(anchor, grid_size, root_note, multiplier);
        self.key = Some(key);
        true
    }

    pub fn matrix(&self) -> &Matrix {
        &self.freqs
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }
}
