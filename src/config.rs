use crate::error::{TcResult, TreeClimbError};
use crate::optimizer::TrajectoryFormat;
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub search: SearchParams,
    #[command(flatten)]
    pub oracle: OracleParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Outer iterations without improvement before stopping
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    /// Treat trees as rooted when enumerating equivalent encodings
    #[arg(long, default_value_t = false)]
    pub rooted: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Upper bound for a randomly drawn seed
    #[arg(long, default_value_t = 1_000_000)]
    pub max_seed: u64,

    /// Oracle workers per sweep (default: available parallelism)
    #[arg(long)]
    pub threads: Option<usize>,

    #[arg(long, default_value_t = TrajectoryFormat::Csv)]
    pub trajectory_format: TrajectoryFormat,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            patience: 3,
            rooted: false,
            seed: None,
            max_seed: 1_000_000,
            threads: None,
            trajectory_format: TrajectoryFormat::Csv,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleParams {
    #[arg(long, default_value = "raxml-ng")]
    pub raxml_binary: String,

    #[arg(long, default_value = "GTR+G")]
    pub substitution_model: String,

    #[arg(long, default_value_t = 600)]
    pub oracle_timeout_secs: u64,

    /// Where tree files are written (default: a temporary directory)
    #[arg(long)]
    pub scratch_dir: Option<String>,

    #[arg(long, default_value_t = false)]
    pub keep_scratch: bool,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            raxml_binary: "raxml-ng".to_string(),
            substitution_model: "GTR+G".to_string(),
            oracle_timeout_secs: 600,
            scratch_dir: None,
            keep_scratch: false,
        }
    }
}

impl OracleParams {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    pub fn merge_from_cli(&mut self, cli: &OracleParams, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$field = cli.$field.clone();
                }
            };
        }

        update_if_present!(raxml_binary);
        update_if_present!(substitution_model);
        update_if_present!(oracle_timeout_secs);
        update_if_present!(scratch_dir);
        update_if_present!(keep_scratch);
    }
}

impl SearchParams {
    pub fn merge_from_cli(&mut self, cli: &SearchParams, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$field = cli.$field.clone();
                }
            };
        }

        update_if_present!(patience);
        update_if_present!(rooted);
        update_if_present!(seed);
        update_if_present!(max_seed);
        update_if_present!(threads);
        update_if_present!(trajectory_format);
    }

    /// The configured seed, or one drawn from `0..=max_seed`.
    pub fn resolve_seed(&self) -> u64 {
        match self.seed {
            Some(seed) => seed,
            None => {
                let seed = fastrand::u64(0..=self.max_seed);
                info!("🎲 No seed given, drew {} (pass --seed {} to reproduce)", seed, seed);
                seed
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> TcResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Options given explicitly on the command line win over the file.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        self.search.merge_from_cli(&cli.search, matches);
        self.oracle.merge_from_cli(&cli.oracle, matches);
    }

    pub fn validate(&self) -> TcResult<()> {
        if self.search.threads == Some(0) {
            return Err(TreeClimbError::Config("threads must be at least 1".into()));
        }
        if self.oracle.oracle_timeout_secs == 0 {
            return Err(TreeClimbError::Config(
                "oracle_timeout_secs must be at least 1".into(),
            ));
        }
        if self.oracle.raxml_binary.trim().is_empty() {
            return Err(TreeClimbError::Config("raxml_binary is empty".into()));
        }
        if self.oracle.substitution_model.trim().is_empty() {
            return Err(TreeClimbError::Config("substitution_model is empty".into()));
        }
        Ok(())
    }
}
