use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::process;
use tracing::{error, info, Level};
use treeclimb::config::Config;
use treeclimb::error::TcResult;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with search and oracle options; command-line flags override it
    #[arg(global = true, long)]
    config: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hill-climb to the best-scoring tree for an alignment
    Search(cmd::search::SearchArgs),
    /// Score a single tree with the oracle
    Score(cmd::score::ScoreArgs),
    /// Draw random v-vectors
    Sample(cmd::codec::SampleArgs),
    /// Print the tree of a v-vector
    Decode(cmd::codec::DecodeArgs),
    /// Print the v-vector of a tree
    Encode(cmd::codec::EncodeArgs),
    /// List alternative encodings of the same tree
    Equivalents(cmd::codec::EquivalentsArgs),
}

/// File options first, then anything given explicitly on the command line.
fn resolve_config(
    cli_config: &Config,
    path: Option<&str>,
    matches: &ArgMatches,
    subcommand: &str,
) -> TcResult<Config> {
    let config = match path {
        Some(path) => {
            info!("📂 Loading config: {}", path);
            let mut base = Config::load_from_file(path)?;
            if let Some(sub) = matches.subcommand_matches(subcommand) {
                base.merge_from_cli(cli_config, sub);
            }
            base
        }
        None => cli_config.clone(),
    };
    config.validate()?;
    Ok(config)
}

fn execute(cli: Cli, matches: &ArgMatches) -> TcResult<()> {
    let path = cli.config.as_deref();
    match cli.command {
        Commands::Search(args) => {
            let config = resolve_config(&args.config, path, matches, "search")?;
            cmd::search::run(args, config)
        }
        Commands::Score(args) => {
            let config = resolve_config(&args.config, path, matches, "score")?;
            cmd::score::run(args, config)
        }
        Commands::Sample(args) => cmd::codec::sample(args),
        Commands::Decode(args) => cmd::codec::decode(args),
        Commands::Encode(args) => cmd::codec::encode(args),
        Commands::Equivalents(args) => cmd::codec::equivalents(args),
    }
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = execute(cli, &matches) {
        error!("❌ {}", e);
        process::exit(1);
    }
}
