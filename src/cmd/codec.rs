//! Codec utilities: sample, decode, encode and list equivalent encodings.

use crate::reports;
use clap::Args;
use tracing::info;
use treeclimb::error::{TcResult, TreeClimbError};
use treeclimb::tree::{self, vector};

fn join(v: &[usize]) -> String {
    v.iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Args, Debug, Clone)]
pub struct SampleArgs {
    /// Number of taxa (k + 1)
    #[arg(short = 'n', long)]
    pub taxa: usize,

    #[arg(short, long, default_value_t = 1)]
    pub count: usize,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub rooted: bool,
}

pub fn sample(args: SampleArgs) -> TcResult<()> {
    if args.taxa < 2 {
        return Err(TreeClimbError::Config(
            "a tree needs at least two taxa".into(),
        ));
    }
    let mut rng = match args.seed {
        Some(s) => fastrand::Rng::with_seed(s),
        None => fastrand::Rng::new(),
    };
    if let Some(count) = vector::tree_count(args.taxa - 1) {
        info!("{} rooted topologies on {} taxa", count, args.taxa);
    }
    for _ in 0..args.count {
        let v = tree::sample(args.taxa - 1, &mut rng);
        println!("{}\t{}", join(&v), tree::decode_newick(&v, args.rooted)?);
    }
    Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Comma-separated v-vector
    #[arg(value_delimiter = ',', required = true)]
    pub v: Vec<usize>,

    #[arg(long, default_value_t = false)]
    pub rooted: bool,
}

pub fn decode(args: DecodeArgs) -> TcResult<()> {
    println!("{}", tree::decode_newick(&args.v, args.rooted)?);
    Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct EncodeArgs {
    /// Bracket notation with integer leaves 0..=k
    pub newick: String,
}

pub fn encode(args: EncodeArgs) -> TcResult<()> {
    println!("{}", join(&tree::encode(&args.newick)?));
    Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct EquivalentsArgs {
    /// Comma-separated v-vector
    #[arg(value_delimiter = ',', required = true)]
    pub v: Vec<usize>,

    #[arg(long, default_value_t = false)]
    pub rooted: bool,
}

pub fn equivalents(args: EquivalentsArgs) -> TcResult<()> {
    let found = tree::equivalents(&args.v, args.rooted)?;
    reports::print_equivalents(&args.v, &found);
    Ok(())
}
