//! Settings for the shell.
//!
//! Sources, lowest priority first: `config/agro.toml` (or `--config`), the
//! `AGRO_` environment (`AGRO_SIMULATOR__SEED=7` for nested keys), then the
//! command line flags.

use clap::Parser;
use engine::SimulatorConfig;
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/agro.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JSON file backing the key-value store.
    pub state_path: String,
    pub level: String,
    pub dismiss_after_secs: u64,
    pub simulator: SimulatorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_path: "agro_state.json".to_string(),
            level: "info".to_string(),
            dismiss_after_secs: 3,
            simulator: SimulatorConfig::default(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "agro", about = "Agro farmer app shell")]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the state file path.
    #[arg(long)]
    state: Option<String>,
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    level: Option<String>,
    /// Seed the simulator for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
    /// Probability in [0, 1] that a submitted transaction fails.
    #[arg(long)]
    failure_rate: Option<f64>,
    /// Multiplier applied to simulated latencies.
    #[arg(long)]
    latency_scale: Option<f64>,
}

impl Settings {
    fn apply(&mut self, args: Args) {
        if let Some(state) = args.state {
            self.state_path = state;
        }
        if let Some(level) = args.level {
            self.level = level;
        }
        if let Some(seed) = args.seed {
            self.simulator.seed = Some(seed);
        }
        if let Some(rate) = args.failure_rate {
            self.simulator.failure_rate = rate;
        }
        if let Some(scale) = args.latency_scale {
            self.simulator.latency_scale = scale;
        }
    }

    fn validate(self) -> Result<Self> {
        let rate = self.simulator.failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(AppError::Setting(format!(
                "failure_rate must be within [0, 1], got {rate}"
            )));
        }
        let scale = self.simulator.latency_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(AppError::Setting(format!(
                "latency_scale must be a non-negative number, got {scale}"
            )));
        }
        Ok(self)
    }
}

pub fn load() -> Result<Settings> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(
        config::Environment::with_prefix("AGRO")
            .prefix_separator("_")
            .separator("__"),
    );
    let mut settings: Settings = builder.build()?.try_deserialize()?;

    settings.apply(args);
    settings.validate()
}
