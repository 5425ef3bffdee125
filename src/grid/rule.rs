/// Step rules - the per-cell update applied identically across a sweep
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A rule maps `(neighbor vitality sum, own vitality)` to the next vitality.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Rule {
    /// Conway's life rule over `{0, 1}` cells.
    #[default]
    Strict,
    /// Continuous relaxation of the life rule with additive noise.
    Soft { liveliness: f64, heat: f64 },
}

impl Rule {
    pub fn conway() -> Self {
        Rule::Strict
    }

    pub fn soft_conway(liveliness: f64, heat: f64) -> Self {
        Rule::Soft { liveliness, heat }
    }

    /// Evaluate the rule for one cell. The soft rule draws its noise from `rng`;
    /// the strict rule never touches it.
    pub fn apply<R: Rng + ?Sized>(&self, neighbors: f64, own: f64, rng: &mut R) -> f64 {
        match *self {
            Rule::Strict => conway(neighbors, own),
            Rule::Soft { liveliness, heat } => {
                let noise = if heat > 0.0 {
                    heat * rng.gen::<f64>()
                } else {
                    0.0
                };
                soft_base(liveliness, neighbors, own) + noise
            }
        }
    }
}

/// Which family of rule a sequencer builds each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    #[default]
    Strict,
    Soft,
}

impl RuleKind {
    pub fn build(self, liveliness: f64, heat: f64) -> Rule {
        match self {
            RuleKind::Strict => Rule::conway(),
            RuleKind::Soft => Rule::soft_conway(liveliness, heat),
        }
    }
}

/// Only meaningful for `{0, 1}`-valued cells.
pub fn conway(neighbors: f64, own: f64) -> f64 {
    let survives = own == 1.0 && (2.0..=3.0).contains(&neighbors);
    let born = own == 0.0 && neighbors == 3.0;
    if survives || born {
        1.0
    } else {
        0.0
    }
}

/// Noise-free part of the soft rule.
///
/// Interpolates the strict rule: a full crowd of 4 neighbors kills, exactly 3
/// gives full vitality, and below 3 the cell's own vitality helps it along.
/// `neighbors == 3` always takes the crowding branch.
pub fn soft_base(liveliness: f64, neighbors: f64, own: f64) -> f64 {
    if neighbors >= 3.0 {
        (4.0 - neighbors).max(0.0).powf(liveliness)
    } else {
        (neighbors + own - 2.0).clamp(0.0, 1.0).powf(liveliness)
    }
}
