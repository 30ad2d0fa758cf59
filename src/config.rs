use crate::error::{SimError, SimResult};
use crate::replace::DEFAULT_REPLACEMENT_TYPES;
use crate::types::SenseMode;
use clap::Parser;
use std::path::PathBuf;

/// Command line configuration for a simulation run
#[derive(Debug, Clone, Parser)]
#[command(name = "semshift")]
#[command(about = "Change simulator: split a sense-annotated corpus into two time slices")]
pub struct Config {
    /// The names of the change types to be simulated
    #[arg(required_unless_present = "generate_fake_corpus", num_args = 1..)]
    pub change_types: Vec<String>,

    /// Paths to the corpus files (csv)
    #[arg(short, long, num_args = 1..)]
    pub corpora: Vec<PathBuf>,

    /// Paths to the lists of possible target words (csv), one per change type
    #[arg(short, long, num_args = 1..)]
    pub targets: Vec<PathBuf>,

    /// The number of changes to be simulated per change type (has to be divisible by 4)
    #[arg(short = 'n', default_value = "12")]
    pub no_changes: usize,

    /// Simulate sense loss as well as sense gain
    #[arg(long)]
    pub loss: bool,

    /// Sense selection mode (base_other, frequency)
    #[arg(short, long, default_value = "base_other")]
    pub mode: String,

    /// Seed for the random number generator (for reproducible simulations)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output directory for the simulated slices and the changes manifest
    #[arg(short, long, default_value = "simulations")]
    pub output: PathBuf,

    /// Change types realized by replacing the other-sense lemma
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_REPLACEMENT_TYPES.map(String::from))]
    pub replacement_types: Vec<String>,

    /// Prefix sentence ids with the corpus file name so they are unique across corpora
    #[arg(long)]
    pub namespace_sentences: bool,

    /// Generate a synthetic corpus with this many candidates per change type and simulate on it
    #[arg(long)]
    pub generate_fake_corpus: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log file path (default: semshift.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Engine settings, validated before any sampling happens
    pub fn simulation_config(&self) -> SimResult<SimulationConfig> {
        let config = SimulationConfig {
            targets_per_type: self.no_changes,
            loss: self.loss,
            mode: self.mode.parse()?,
            seed: self.seed,
            replacement_types: self.replacement_types.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Settings the simulator needs, independent of where inputs come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub targets_per_type: usize,
    pub loss: bool,
    pub mode: SenseMode,
    pub seed: Option<u64>,
    pub replacement_types: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            targets_per_type: 12,
            loss: false,
            mode: SenseMode::BaseOther,
            seed: None,
            replacement_types: DEFAULT_REPLACEMENT_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.targets_per_type == 0 || self.targets_per_type % 4 != 0 {
            return Err(SimError::InvalidConfig(format!(
                "the number of targets per change type should be a positive multiple of 4, got {}",
                self.targets_per_type
            )));
        }
        Ok(())
    }
}
