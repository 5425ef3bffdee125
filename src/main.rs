#[cfg(feature = "cli")]
use std::sync::{Arc, Mutex};
#[cfg(feature = "cli")]
use std::thread;
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use tracing::{debug, info, warn};

#[cfg(feature = "cli")]
use lifeseq::{
    AppConfig, Frame, FrameConsumer, Grid, Pattern, PlaybackEngine, PlaybackEvent, RuleKind,
    Sequencer, VoiceChange, VoiceTracker,
};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the lifeseq automaton")]
struct Args {
    /// Path to config TOML
    #[arg(long, default_value = "lifeseq.toml")]
    config: String,

    /// Grid size (overrides config)
    #[arg(long)]
    size: Option<usize>,

    /// Fill probability for the random pattern (overrides config)
    #[arg(long)]
    fill: Option<f64>,

    /// RNG seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Starting pattern (overrides config)
    #[arg(long, value_enum)]
    pattern: Option<Pattern>,

    /// Step rule (overrides config)
    #[arg(long, value_enum)]
    rule: Option<RuleKind>,

    /// Named preset from the config file
    #[arg(long)]
    preset: Option<String>,

    /// Milliseconds between ticks (overrides config and preset)
    #[arg(long)]
    delay_ms: Option<f64>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 32)]
    ticks: u64,
}

/// Logs what an audio renderer would be told each tick.
#[cfg(feature = "cli")]
struct LogConsumer {
    voices: VoiceTracker,
}

#[cfg(feature = "cli")]
impl FrameConsumer for LogConsumer {
    fn render(&mut self, grid: &Grid) {
        debug!(
            live = grid.live_count(),
            vitality = grid.total_vitality(),
            "render"
        );
    }

    fn sound(&mut self, frame: &Frame) {
        let changes = self.voices.update(&frame.cells, &frame.frequencies);
        let started = changes
            .iter()
            .filter(|c| matches!(c, VoiceChange::Start { .. }))
            .count();
        let stopped = changes
            .iter()
            .filter(|c| matches!(c, VoiceChange::Stop { .. }))
            .count();
        let loudness: f64 = frame.gains.iter().flatten().sum();
        debug!(
            generation = frame.generation,
            started,
            stopped,
            sounding = self.voices.active_count(),
            loudness,
            retuned = frame.retuned,
            "sound"
        );
    }
}

#[cfg(feature = "cli")]
fn main() -> Result<(), lifeseq::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config);
    if let Some(size) = args.size {
        config.engine.size = size;
    }
    if let Some(fill) = args.fill {
        config.engine.fill = fill;
    }
    if let Some(seed) = args.seed {
        config.engine.seed = Some(seed);
    }
    if let Some(pattern) = args.pattern {
        config.engine.pattern = pattern;
    }
    if let Some(rule) = args.rule {
        config.engine.rule = rule;
    }
    if let Some(name) = &args.preset {
        let preset = config.preset(name)?.clone();
        config.session.apply(&preset);
        info!(preset = %name, "applied preset");
    }
    if let Some(delay_ms) = args.delay_ms {
        config.session.delay_ms = delay_ms;
    }

    let mut sequencer = Sequencer::from_config(&config)?;
    let first = sequencer.frame();
    info!(
        size = config.engine.size,
        rule = ?config.engine.rule,
        live = first.cells.live_count(),
        "starting"
    );

    let poll = sequencer.params().delay().max(Duration::from_millis(1));
    let sequencer = Arc::new(Mutex::new(sequencer));
    let consumer = LogConsumer {
        voices: VoiceTracker::new(),
    };

    let mut engine = PlaybackEngine::new();
    engine.start(Arc::clone(&sequencer), Some(Box::new(consumer)));

    let mut last = 0;
    while last < args.ticks {
        for event in engine.poll_events() {
            if let PlaybackEvent::Ticked { generation, live } = event {
                info!(generation, live, "tick");
                last = generation;
            }
        }
        if last < args.ticks && !engine.is_running() {
            warn!(generation = last, "playback ended early");
            break;
        }
        thread::sleep(poll);
    }
    engine.stop();

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature to be enabled");
    std::process::exit(1);
}
