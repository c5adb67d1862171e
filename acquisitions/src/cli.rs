//! Définition et implémentation des commandes CLI
//!
//! CLI simplifiée:
//! - `build`: snapshots GeoJSON → FeatureCollection des acquisitions
//! - `check`: valide la configuration et les snapshots sans rien écrire

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::{info, warn};

use acquisitions::config::{RunConfig, WindingConvention};
use acquisitions::overrides;
use acquisitions::pipeline;
use acquisitions::store::Snapshot;
use acquisitions::writer;

#[derive(Subcommand)]
pub enum Commands {
    /// Build the acquisitions FeatureCollection from a run configuration
    Build {
        /// Path to the run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file (défaut : `output` de la configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum geodesic area kept after differencing, in m²
        #[arg(long)]
        min_area: Option<f64>,

        /// Ring winding convention of the emitted polygons
        #[arg(long, value_enum)]
        winding: Option<WindingConvention>,

        /// Write the run report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Maximum number of snapshots dissolved concurrently
        #[arg(long, alias = "threads")]
        jobs: Option<usize>,
    },

    /// Validate a run configuration and its snapshots without writing anything
    Check {
        /// Path to the run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Exécute la commande build
pub fn cmd_build(
    config_path: &Path,
    output: Option<PathBuf>,
    min_area: Option<f64>,
    winding: Option<WindingConvention>,
    report_path: Option<PathBuf>,
    jobs: Option<usize>,
) -> Result<()> {
    let mut config = RunConfig::load(config_path)?;
    apply_config_overrides(&mut config, output, min_area, winding);
    config.validate()?;

    let jobs = jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });

    // Dimensionner le pool rayon utilisé pour les dissolves ; un pool
    // déjà initialisé (tests) n'est pas une erreur
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
    {
        warn!("Could not size the worker pool: {}", e);
    }

    println!("=== Acquisitions build ===");
    println!("Config: {}", config_path.display());
    println!("Snapshots: {}", config.snapshots_dir.display());
    println!("Steps: {}", config.steps.len());
    println!("Categories: {}", config.categories.join(", "));
    println!("Winding: {}", config.winding);
    println!("Min area: {} m²", config.min_area_m2);
    if let Some(tolerance) = config.snap_tolerance_deg {
        println!("Snap tolerance: {}°", tolerance);
    }
    if let Some(baseline) = &config.baseline {
        println!("Baseline: {}", baseline);
    }
    println!("Jobs: {}", jobs);
    println!("Output: {}", config.output.display());

    let output_path = config.output.clone();
    let result = pipeline::run(&config)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
    }
    writer::write_collection(&result.features, &output_path)?;
    info!(
        features = result.features.len(),
        output = %output_path.display(),
        "Acquisitions written"
    );

    result.report.display();

    if let Some(path) = report_path {
        result.report.save_to_file(&path)?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}

/// Exécute la commande check
///
/// Charge la configuration, la table des overrides et le snapshot de
/// chaque étape, manuelle ou non, et compte les étapes qui feraient
/// échouer le build. Une étape manuelle doit à la fois avoir son
/// entrée dans la table et un snapshot lisible : sa fusion sert
/// d'état précédent à l'étape suivante.
pub fn cmd_check(config_path: &Path) -> Result<()> {
    let config = RunConfig::load(config_path)?;
    config.validate()?;

    println!("=== Acquisitions check ===");
    println!("Config: {}", config_path.display());
    println!("Snapshots: {}", config.snapshots_dir.display());
    println!("Steps: {}", config.steps.len());

    let overrides = overrides::load_optional(config.overrides.as_ref())?;
    if !overrides.is_empty() {
        println!("Overrides: {} entries", overrides.len());
    }

    let categories: HashSet<String> = config.categories.iter().cloned().collect();
    let mut problems = 0;

    if let Some(baseline) = &config.baseline {
        let path = config.snapshot_path(baseline);
        match Snapshot::load(&path) {
            Ok(snapshot) => {
                let matched = snapshot.select_categories(&categories).len();
                println!(
                    "  [bas] {:<24} {} features ({} matching)",
                    baseline,
                    snapshot.features.len(),
                    matched
                );
            }
            Err(e) => {
                println!("  [bas] {:<24} {}", baseline, e);
                problems += 1;
            }
        }
    }

    for (index, step) in config.steps.iter().enumerate() {
        // Le snapshot d'une étape manuelle est chargé lui aussi : le
        // build le dissout pour en faire l'état précédent de l'étape
        // suivante, même si la géométrie émise vient de la table
        let path = config.snapshot_path(&step.file);
        match Snapshot::load(&path) {
            Ok(snapshot) => {
                let matched = snapshot.select_categories(&categories).len();
                if step.manual {
                    let provenance = if overrides.lookup(&step.era).is_some() {
                        "manual override present"
                    } else {
                        problems += 1;
                        "MISSING manual override"
                    };
                    println!(
                        "  [{:>3}] {:<24} {} features ({} matching), {}",
                        index,
                        step.era,
                        snapshot.features.len(),
                        matched,
                        provenance
                    );
                } else if matched == 0 {
                    println!(
                        "  [{:>3}] {:<24} no feature matches the configured categories",
                        index, step.era
                    );
                    problems += 1;
                } else {
                    println!(
                        "  [{:>3}] {:<24} {} features ({} matching)",
                        index,
                        step.era,
                        snapshot.features.len(),
                        matched
                    );
                }
            }
            Err(e) => {
                println!("  [{:>3}] {:<24} {}", index, step.era, e);
                problems += 1;
                if step.manual && overrides.lookup(&step.era).is_none() {
                    println!("  [{:>3}] {:<24} MISSING manual override", index, step.era);
                    problems += 1;
                }
            }
        }
    }

    // Entrées d'override qu'aucune étape manuelle ne référence
    let manual_eras: HashSet<&str> = config
        .steps
        .iter()
        .filter(|s| s.manual)
        .map(|s| s.era.as_str())
        .collect();
    for era in overrides.eras() {
        if !manual_eras.contains(era) {
            println!("  note: override entry '{}' matches no manual step", era);
        }
    }

    if problems > 0 {
        anyhow::bail!("{} problem(s) found", problems);
    }

    println!("Configuration OK");
    Ok(())
}

/// Applique les surcharges passées en ligne de commande à la
/// configuration chargée
fn apply_config_overrides(
    config: &mut RunConfig,
    output: Option<PathBuf>,
    min_area: Option<f64>,
    winding: Option<WindingConvention>,
) {
    if let Some(output) = output {
        config.output = output;
    }
    if let Some(min_area) = min_area {
        config.min_area_m2 = min_area;
    }
    if let Some(winding) = winding {
        config.winding = winding;
    }
}
