/// Voice tracking - which cells are sounding, for renderers that start and
/// stop one oscillator per live cell
use std::collections::HashMap;

use crate::grid::Grid;

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceChange {
    Start { x: usize, y: usize, freq: f64 },
    Retune { x: usize, y: usize, freq: f64 },
    Stop { x: usize, y: usize },
}

#[derive(Debug, Clone, Default)]
pub struct VoiceTracker {
    active: HashMap<(usize, usize), f64>,
}

impl VoiceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, x: usize, y: usize) -> bool {
        self.active.contains_key(&(x, y))
    }

    /// Diff the grid against the sounding set. Changes come out in row-major
    /// order; `freqs` must have the grid's shape.
    pub fn update(&mut self, grid: &Grid, freqs: &[Vec<f64>]) -> Vec<VoiceChange> {
        let mut changes = Vec::new();

        for (x, row) in grid.cells().iter().enumerate() {
            for (y, vitality) in row.iter().enumerate() {
                let freq = freqs
                    .get(x)
                    .and_then(|r| r.get(y))
                    .copied()
                    .unwrap_or(0.0);

                if *vitality > 0.0 {
                    match self.active.insert((x, y), freq) {
                        None => changes.push(VoiceChange::Start { x, y, freq }),
                        Some(old) if old != freq => {
                            changes.push(VoiceChange::Retune { x, y, freq })
                        }
                        Some(_) => {}
                    }
                } else if self.active.remove(&(x, y)).is_some() {
                    changes.push(VoiceChange::Stop { x, y });
                }
            }
        }

        changes
    }

    /// Stop everything, e.g. when the transport stops.
    pub fn release_all(&mut self) -> Vec<VoiceChange> {
        let mut cells: Vec<_> = self.active.drain().map(|(cell, _)| cell).collect();
        cells.sort_unstable();
        cells
            .into_iter()
            .map(|(x, y)| VoiceChange::Stop { x, y })
            .collect()
    }
}
