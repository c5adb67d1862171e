//! Point d'entrée CLI pour acquisitions

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::Commands;

/// Extraire les frontières d'acquisition territoriale depuis des snapshots GeoJSON
#[derive(Parser)]
#[command(name = "acquisitions")]
#[command(author, version)]
#[command(about = "Extraire les frontières d'acquisition territoriale depuis des snapshots GeoJSON")]
#[command(
    long_about = "Calcule, pour une séquence chronologique de snapshots territoriaux, la géométrie nouvellement acquise à chaque étape (différence ensembliste avec l'état précédent), puis écrit les acquisitions en une FeatureCollection prête pour le rendu."
)]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Build {
            config,
            output,
            min_area,
            winding,
            report,
            jobs,
        } => {
            info!(config = %config.display(), "Building acquisitions");
            cli::cmd_build(&config, output, min_area, winding, report, jobs)?;
        }
        Commands::Check { config } => {
            info!(config = %config.display(), "Checking configuration");
            cli::cmd_check(&config)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
