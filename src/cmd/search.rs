use crate::reports;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use treeclimb::alignment::Alignment;
use treeclimb::config::Config;
use treeclimb::error::{TcResult, TreeClimbError};
use treeclimb::optimizer::{
    ClimbOptions, ClimbResult, HillClimber, IterationReport, ProgressCallback, SearchError,
    TrajectoryFormat,
};
use treeclimb::oracle::RaxmlOracle;

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub config: Config,

    /// FASTA alignment to fit
    #[arg(short, long)]
    pub msa: PathBuf,

    /// Starting v-vector, comma-separated (random if omitted)
    #[arg(long, value_delimiter = ',')]
    pub start: Option<Vec<usize>>,

    /// Where to write the loss trajectory
    #[arg(long)]
    pub trajectory: Option<PathBuf>,

    /// Where to write the best tree, with taxon names
    #[arg(long)]
    pub tree_out: Option<PathBuf>,
}

struct CliLogger;
impl ProgressCallback for CliLogger {
    fn on_iteration(&self, report: &IterationReport) -> bool {
        debug!(
            "Iter {} | loss {:.3} | wait {}/{}",
            report.iteration, report.loss, report.wait, report.patience
        );
        true
    }
}

fn write_outputs(args: &SearchArgs, config: &Config, result: &ClimbResult) -> TcResult<String> {
    let newick = result.labeled_newick(config.search.rooted)?;
    if let Some(path) = &args.trajectory {
        // A recognised extension decides the format.
        let format =
            TrajectoryFormat::from_path(path).unwrap_or(config.search.trajectory_format);
        result.trajectory.write(path, format)?;
        info!("📈 Trajectory written to {}", path.display());
    }
    if let Some(path) = &args.tree_out {
        std::fs::write(path, format!("{}\n", newick))?;
        info!("🌳 Tree written to {}", path.display());
    }
    Ok(newick)
}

fn check_msa(path: &Path) -> TcResult<Alignment> {
    let alignment = Alignment::load_from_file(path)?;
    if alignment.taxon_count() < 2 {
        return Err(TreeClimbError::Alignment(format!(
            "{} holds {} taxon; a tree needs at least two",
            path.display(),
            alignment.taxon_count()
        )));
    }
    Ok(alignment)
}

pub fn run(args: SearchArgs, config: Config) -> TcResult<()> {
    info!("📂 Loading alignment: {}", args.msa.display());
    let alignment = check_msa(&args.msa)?;
    let taxa = alignment.taxa()?;
    let k = taxa.len() - 1;
    info!(
        "Data: {} sites; {} taxa.",
        alignment.site_count(),
        taxa.len()
    );

    let seed = config.search.resolve_seed();
    let oracle = RaxmlOracle::from_params(&config.oracle, &args.msa)?;
    debug!("Scratch directory: {}", oracle.scratch_dir().display());

    let options = ClimbOptions::from(&config);
    info!(
        "🔥 Hill climbing with {} oracle workers (patience {}, rooted: {})",
        options.num_threads, options.patience, options.rooted
    );
    let mut climber = HillClimber::new(oracle, options, seed)?;

    let start = match args.start.clone() {
        Some(v) => v,
        None => climber.sample_start(k),
    };
    info!("Start v: {:?}", start);

    match climber.run(start, taxa, CliLogger) {
        Ok(result) => {
            let newick = write_outputs(&args, &config, &result)?;
            reports::print_result("🏆 FINAL RESULT", &result, &newick);
            reports::print_taxa(&result.taxa);
            Ok(())
        }
        Err(SearchError::Interrupted { failure, partial }) => {
            warn!("Search interrupted; saving the best state reached so far");
            let newick = write_outputs(&args, &config, &partial)?;
            reports::print_result("PARTIAL RESULT", &partial, &newick);
            Err(SearchError::Interrupted { failure, partial }.into())
        }
        Err(e) => Err(e.into()),
    }
}
