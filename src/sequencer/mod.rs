/// Session state - owns the grid, the live parameters and the derived matrices
/// One `tick` steps the automaton and recomputes what the audio side needs
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::GridError;
use crate::grid::{Grid, Rule, RuleKind};
use crate::mapping::{gain_matrix, FrequencyCache, Matrix, NoteAnchor};

pub mod playback;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    #[serde(default = "SessionParams::default_root_note")]
    pub root_note: f64,
    #[serde(default = "SessionParams::default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "SessionParams::default_damping")]
    pub damping: f64,
    #[serde(default = "SessionParams::default_liveliness")]
    pub liveliness: f64,
    #[serde(default)]
    pub heat: f64,
    #[serde(default = "SessionParams::default_delay_ms")]
    pub delay_ms: f64,
}

impl SessionParams {
    fn default_root_note() -> f64 {
        44.0
    }
    fn default_multiplier() -> f64 {
        1.0
    }
    fn default_damping() -> f64 {
        1.0
    }
    fn default_liveliness() -> f64 {
        1.0
    }
    fn default_delay_ms() -> f64 {
        100.0
    }

    /// Wait between ticks. Negative or non-finite delays mean no wait.
    pub fn delay(&self) -> Duration {
        if self.delay_ms.is_finite() && self.delay_ms > 0.0 {
            Duration::from_nanos((self.delay_ms * 1e6).round() as u64)
        } else {
            Duration::ZERO
        }
    }

    /// Speed is the reciprocal of the delay.
    pub fn set_speed(&mut self, speed: f64) {
        self.delay_ms = speed.recip();
    }

    pub fn apply(&mut self, preset: &Preset) {
        if let Some(v) = preset.root_note {
            self.root_note = v;
        }
        if let Some(v) = preset.multiplier {
            self.multiplier = v;
        }
        if let Some(v) = preset.damping {
            self.damping = v;
        }
        if let Some(v) = preset.liveliness {
            self.liveliness = v;
        }
        if let Some(v) = preset.heat {
            self.heat = v;
        }
        if let Some(v) = preset.delay_ms {
            self.delay_ms = v;
        }
    }
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            root_note: Self::default_root_note(),
            multiplier: Self::default_multiplier(),
            damping: Self::default_damping(),
            liveliness: Self::default_liveliness(),
            heat: 0.0,
            delay_ms: Self::default_delay_ms(),
        }
    }
}

/// Named parameter bundle; absent fields leave the session untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub root_note: Option<f64>,
    pub multiplier: Option<f64>,
    pub damping: Option<f64>,
    pub liveliness: Option<f64>,
    pub heat: Option<f64>,
    pub delay_ms: Option<f64>,
}

/// Everything produced by one tick. Owned copies, so consumers can't reach
/// back into the live grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub generation: u64,
    pub cells: Grid,
    pub frequencies: Matrix,
    pub gains: Matrix,
    /// The frequency matrix changed since the previous frame.
    pub retuned: bool,
}

/// Render and sound callbacks, both optional.
pub trait FrameConsumer {
    fn render(&mut self, _grid: &Grid) {}

    fn sound(&mut self, _frame: &Frame) {}
}

pub struct Sequencer {
    grid: Grid,
    params: SessionParams,
    rule_kind: RuleKind,
    anchor: NoteAnchor,
    freqs: FrequencyCache,
    rng: SmallRng,
    generation: u64,
}

impl Sequencer {
    pub fn new(grid: Grid, params: SessionParams) -> Self {
        Self::with_rng(grid, params, SmallRng::from_entropy())
    }

    pub fn with_rng(grid: Grid, params: SessionParams, rng: SmallRng) -> Self {
        Self {
            grid,
            params,
            rule_kind: RuleKind::default(),
            anchor: NoteAnchor::default(),
            freqs: FrequencyCache::new(),
            rng,
            generation: 0,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, GridError> {
        let engine = &config.engine;
        let mut rng = match engine.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let grid = Grid::from_pattern(engine.pattern, engine.size, engine.fill, &mut rng)?;

        Ok(Self::with_rng(grid, config.session, rng)
            .with_rule(engine.rule)
            .with_anchor(engine.anchor))
    }

    pub fn with_rule(mut self, rule_kind: RuleKind) -> Self {
        self.rule_kind = rule_kind;
        self
    }

    pub fn with_anchor(mut self, anchor: NoteAnchor) -> Self {
        self.anchor = anchor;
        self.freqs.invalidate();
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut SessionParams {
        &mut self.params
    }

    pub fn set_params(&mut self, params: SessionParams) {
        self.params = params;
    }

    pub fn apply_preset(&mut self, preset: &Preset) {
        self.params.apply(preset);
    }

    pub fn rule_kind(&self) -> RuleKind {
        self.rule_kind
    }

    pub fn set_rule_kind(&mut self, rule_kind: RuleKind) {
        self.rule_kind = rule_kind;
    }

    /// The rule the next tick will use.
    pub fn rule(&self) -> Rule {
        self.rule_kind.build(self.params.liveliness, self.params.heat)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    pub fn randomize(&mut self, p: f64) {
        self.grid.randomize(p, &mut self.rng);
    }

    pub fn randomize_uniform(&mut self) {
        self.grid.randomize_uniform(&mut self.rng);
    }

    pub fn load_glider(&mut self) -> Result<(), GridError> {
        self.grid.load_glider()
    }

    pub fn load_cells(&mut self, cells: Vec<Vec<f64>>) -> Result<(), GridError> {
        self.grid.load_cells(cells)
    }

    /// Current state without stepping, e.g. for the first render.
    pub fn frame(&mut self) -> Frame {
        let params = self.params;
        let retuned = self.freqs.refresh(
            self.anchor,
            self.grid.size(),
            params.root_note,
            params.multiplier,
        );

        Frame {
            generation: self.generation,
            cells: self.grid.clone(),
            frequencies: self.freqs.matrix().clone(),
            gains: gain_matrix(&self.grid, params.damping),
            retuned,
        }
    }

    /// Step the automaton with a rule built from the current parameters, then
    /// recompute the matrices.
    pub fn tick(&mut self) -> Frame {
        let rule = self.rule();
        self.grid.step(&rule, &mut self.rng);
        self.generation += 1;
        self.frame()
    }

    pub fn tick_to<C: FrameConsumer + ?Sized>(&mut self, consumer: &mut C) -> Frame {
        let frame = self.tick();
        consumer.render(&frame.cells);
        consumer.sound(&frame);
        frame
    }
}
