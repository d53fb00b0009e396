use crate::reports;
use clap::Args;
use std::path::PathBuf;
use tracing::info;
use treeclimb::alignment::Alignment;
use treeclimb::config::Config;
use treeclimb::error::{TcResult, TreeClimbError};
use treeclimb::oracle::{Oracle, RaxmlOracle, ScoreRequest, ScratchId};
use treeclimb::tree::{self, Topology};

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub config: Config,

    /// FASTA alignment to fit
    #[arg(short, long)]
    pub msa: PathBuf,

    /// Tree as a comma-separated v-vector
    #[arg(long, value_delimiter = ',', conflicts_with = "tree", required_unless_present = "tree")]
    pub v: Option<Vec<usize>>,

    /// Tree as bracket notation with taxon names
    #[arg(long)]
    pub tree: Option<String>,
}

pub fn run(args: ScoreArgs, config: Config) -> TcResult<()> {
    let alignment = Alignment::load_from_file(&args.msa)?;
    let taxa = alignment.taxa()?;

    let v = match (&args.v, &args.tree) {
        (Some(v), _) => v.clone(),
        (None, Some(notation)) => {
            tree::encode_topology(&Topology::from_named_newick(notation, &taxa)?)
        }
        (None, None) => {
            return Err(TreeClimbError::Config("give either --v or --tree".into()));
        }
    };
    if v.len() + 1 != taxa.len() {
        return Err(TreeClimbError::Config(format!(
            "v has {} entries but the alignment holds {} taxa",
            v.len(),
            taxa.len()
        )));
    }

    let newick = tree::relabel(&tree::decode_newick(&v, config.search.rooted)?, &taxa)?;
    let oracle = RaxmlOracle::from_params(&config.oracle, &args.msa)?;
    let session = uuid::Uuid::new_v4().simple().to_string();

    info!("🔎 Scoring {}", newick);
    let loss = oracle.score(&ScoreRequest {
        newick: newick.clone(),
        scratch: ScratchId::baseline(&session),
    })?;

    reports::print_score(&v, &newick, loss);
    Ok(())
}
