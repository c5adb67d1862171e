//! Orchestration du pipeline d'extraction des acquisitions
//!
//! Chaque étape traverse la même machine : chargement du snapshot,
//! dissolve des entités retenues, décision (override manuel, cas de
//! base ou différence avec l'état précédent), filtre des résidus,
//! normalisation de l'enroulement, émission. Les dissolves sont
//! indépendants d'une étape à l'autre et sont préparés en parallèle ;
//! la chaîne de différences est strictement séquentielle : la fusion
//! de l'étape i sert de soustracteur à l'étape i+1 et ne doit jamais
//! être réordonnée.
//!
//! Une étape qui échoue (moteur booléen, résultat vide, résidu sous le
//! seuil) est écartée et consignée, l'exécution continue. Deux erreurs
//! restent fatales : un snapshot illisible, qui invaliderait toutes les
//! différences suivantes, et une étape manuelle sans entrée dans la
//! table des overrides, qui est un défaut de configuration.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use geo::MultiPolygon;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use geodiff::GeodiffError;

use crate::config::{RunConfig, StepConfig};
use crate::overrides::{self, OverrideTable};
use crate::report::{RunReport, StepStatus};
use crate::store::{LoadError, Snapshot};
use crate::writer;

/// Erreurs fatales du pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Baseline ou table des overrides illisible
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Snapshot d'une étape illisible, rattaché à son étape
    #[error("step {step} ({era}): {source}")]
    LoadStep {
        step: usize,
        era: String,
        #[source]
        source: LoadError,
    },

    /// Étape manuelle sans géométrie de remplacement
    #[error("step {step} ({era}) is flagged manual but has no override entry")]
    MissingOverride { step: usize, era: String },
}

/// Acquisition émise : une entité de la FeatureCollection de sortie
#[derive(Debug, Clone)]
pub struct AcquisitionFeature {
    /// Clé d'ère (identifiant de l'entité de sortie)
    pub era: String,
    /// Position de l'étape dans la séquence
    pub step: usize,
    pub label: String,
    pub year: Option<String>,
    /// Géométrie acquise, normalisée vers la convention configurée
    pub geometry: MultiPolygon<f64>,
}

/// Résultat complet d'une exécution
#[derive(Debug)]
pub struct PipelineOutput {
    /// Acquisitions émises, triées par étape croissante
    pub features: Vec<AcquisitionFeature>,
    pub report: RunReport,
}

/// Dissolve d'un snapshot, prêt pour la chaîne de différences
struct StepMerge {
    merged: Option<MultiPolygon<f64>>,
    skipped: Vec<geodiff::SkippedPart>,
    matched: usize,
}

/// Sort décidé pour une étape, avant normalisation
#[derive(Debug)]
enum StepOutcome {
    Emit {
        geometry: MultiPolygon<f64>,
        status: StepStatus,
    },
    Skip {
        status: StepStatus,
        detail: String,
    },
}

/// Exécute le pipeline complet sur une configuration
///
/// Ne touche pas au fichier de sortie : l'écriture appartient à
/// l'appelant, qui dispose du rapport pour décider quoi en faire.
///
/// # Errors
/// [`PipelineError::Load`] si la baseline ou la table des overrides ne
/// se charge pas ; [`PipelineError::LoadStep`] si le snapshot d'une
/// étape est illisible, avec l'étape et l'ère fautives dans le message ;
/// [`PipelineError::MissingOverride`] si une étape manuelle n'a pas
/// d'entrée dans la table.
pub fn run(config: &RunConfig) -> Result<PipelineOutput, PipelineError> {
    let started_at = Instant::now();
    let mut report = RunReport::new(config.steps.len());

    info!(
        steps = config.steps.len(),
        winding = %config.winding,
        min_area_m2 = config.min_area_m2,
        "Pipeline starting"
    );

    let overrides = overrides::load_optional(config.overrides.as_ref())?;
    if !overrides.is_empty() {
        info!(entries = overrides.len(), "Override table loaded");
    }

    let categories: HashSet<String> = config.categories.iter().cloned().collect();

    // Baseline éventuelle : état "précédent" de la première étape.
    // Sans elle, la première étape est le cas de base.
    let mut previous: Option<MultiPolygon<f64>> = match &config.baseline {
        Some(file) => {
            let merge = merge_snapshot(&config.snapshot_path(file), &categories)?;
            for part in &merge.skipped {
                warn!(baseline = %file, part = part.index, error = %part.error,
                    "Baseline feature skipped during dissolve");
            }
            info!(baseline = %file, matched = merge.matched, "Baseline merged");
            merge.merged
        }
        None => None,
    };

    // Les dissolves ne dépendent pas les uns des autres : préparation
    // en parallèle, la chaîne séquentielle consomme ensuite dans l'ordre
    let merges: Vec<StepMerge> = config
        .steps
        .par_iter()
        .enumerate()
        .map(|(index, step)| {
            merge_snapshot(&config.snapshot_path(&step.file), &categories).map_err(|source| {
                PipelineError::LoadStep {
                    step: index,
                    era: step.era.clone(),
                    source,
                }
            })
        })
        .collect::<Result<_, PipelineError>>()?;

    let mut features = Vec::with_capacity(config.steps.len());

    for (index, (step, merge)) in config.steps.iter().zip(merges).enumerate() {
        for part in &merge.skipped {
            warn!(step = index, era = %step.era, part = part.index, error = %part.error,
                "Input feature skipped during dissolve");
            report.record_warning(
                index,
                &step.era,
                format!("dissolve skipped input feature {}: {}", part.index, part.error),
            );
        }
        report.record_dissolve_skips(merge.skipped.len());

        if let Some(merged) = &merge.merged {
            debug!(step = index, era = %step.era, matched = merge.matched,
                polygons = merged.0.len(), "Snapshot merged");
        }

        match resolve_step(config, index, step, merge.merged.as_ref(), previous.as_ref(), &overrides)? {
            StepOutcome::Emit { mut geometry, status } => {
                geodiff::rewind_multi_polygon(&mut geometry, config.winding.exterior_clockwise());
                let area_m2 = geodiff::geodesic_area_m2(&geometry);

                info!(step = index, era = %step.era, status = ?status,
                    area_km2 = area_m2 / 1_000_000.0, "Acquisition emitted");
                dump_step_artifacts(
                    config,
                    index,
                    step,
                    merge.merged.as_ref(),
                    Some(&geometry),
                    &mut report,
                );

                features.push(AcquisitionFeature {
                    era: step.era.clone(),
                    step: index,
                    label: step.label.clone(),
                    year: step.year.clone(),
                    geometry,
                });
                report.record_emitted(index, &step.era, status, area_m2);
            }
            StepOutcome::Skip { status, detail } => {
                warn!(step = index, era = %step.era, status = ?status, detail = %detail,
                    "Step skipped");
                dump_step_artifacts(config, index, step, merge.merged.as_ref(), None, &mut report);
                report.record_skipped(index, &step.era, status, &detail);
            }
        }

        // La fusion de l'étape devient l'état précédent, même quand
        // l'émission a été écartée ; un dissolve vide conserve l'état
        // précédent au lieu de réinitialiser la chaîne
        if let Some(merged) = merge.merged {
            previous = Some(merged);
        }
    }

    features.sort_by_key(|feature| feature.step);

    report.set_duration(started_at.elapsed());
    report.finalize();
    info!("{}", report.summary());

    Ok(PipelineOutput { features, report })
}

/// Charge et dissout un snapshot en une fusion d'étape
fn merge_snapshot(path: &Path, categories: &HashSet<String>) -> Result<StepMerge, LoadError> {
    let snapshot = Snapshot::load(path)?;
    let parts: Vec<MultiPolygon<f64>> = snapshot
        .select_categories(categories)
        .into_iter()
        .map(|feature| feature.geometry.clone())
        .collect();
    let matched = parts.len();

    let outcome = geodiff::dissolve(&parts);
    Ok(StepMerge {
        merged: outcome.merged,
        skipped: outcome.skipped,
        matched,
    })
}

/// Décide du sort d'une étape
///
/// L'ordre des décisions suit la sémantique du pipeline : une étape
/// manuelle est résolue par la table quoi qu'ait donné le dissolve ;
/// sinon un dissolve vide écarte l'étape ; sinon la première étape sans
/// baseline est le cas de base ; sinon on calcule la différence avec
/// l'état précédent. Le filtre d'aire ne s'applique qu'au résultat
/// d'une différence : le cas de base et les overrides sont émis tels
/// quels (modulo normalisation).
fn resolve_step(
    config: &RunConfig,
    index: usize,
    step: &StepConfig,
    merged: Option<&MultiPolygon<f64>>,
    previous: Option<&MultiPolygon<f64>>,
    overrides: &OverrideTable,
) -> Result<StepOutcome, PipelineError> {
    if step.manual {
        let Some(geometry) = overrides.lookup(&step.era) else {
            return Err(PipelineError::MissingOverride {
                step: index,
                era: step.era.clone(),
            });
        };
        return Ok(StepOutcome::Emit {
            geometry: geometry.clone(),
            status: StepStatus::EmittedOverride,
        });
    }

    let Some(merged) = merged else {
        return Ok(StepOutcome::Skip {
            status: StepStatus::SkippedEmpty,
            detail: "no features matched the configured categories".to_string(),
        });
    };

    if index == 0 && config.baseline.is_none() {
        return Ok(StepOutcome::Emit {
            geometry: merged.clone(),
            status: StepStatus::EmittedBase,
        });
    }

    // Fenêtre géographique : la géométrie courante est découpée avant
    // la différence, le bruit hors zone ne devient jamais acquisition
    let current = match step.bounds_rect() {
        Some(bounds) => match geodiff::clip_bounds(merged, bounds) {
            Ok(clipped) => clipped,
            Err(error) => return Ok(skip_geometry_error("bounding filter", &error)),
        },
        None => Some(merged.clone()),
    };

    // Alignement optionnel des sommets du soustracteur sur la géométrie
    // courante, pour neutraliser les tracés numérisés séparément
    let subtrahend = match (previous, config.snap_tolerance_deg) {
        (Some(previous), Some(tolerance)) => {
            match geodiff::snap_to_vertices(previous, merged, tolerance) {
                Ok(snapped) if snapped.0.is_empty() => None,
                Ok(snapped) => Some(snapped),
                Err(error) => return Ok(skip_geometry_error("vertex snapping", &error)),
            }
        }
        (Some(previous), None) => Some(previous.clone()),
        (None, _) => None,
    };

    let acquired = match geodiff::difference(current.as_ref(), subtrahend.as_ref()) {
        Ok(result) => result,
        Err(error) => return Ok(skip_geometry_error("difference", &error)),
    };

    let Some(acquired) = acquired else {
        return Ok(StepOutcome::Skip {
            status: StepStatus::SkippedNoise,
            detail: "difference with the previous state is empty".to_string(),
        });
    };

    match geodiff::filter_slivers(acquired, config.min_area_m2) {
        Some(kept) => Ok(StepOutcome::Emit {
            geometry: kept,
            status: StepStatus::EmittedDifference,
        }),
        None => Ok(StepOutcome::Skip {
            status: StepStatus::SkippedNoise,
            detail: format!("below the {} m² area threshold", config.min_area_m2),
        }),
    }
}

fn skip_geometry_error(stage: &str, error: &GeodiffError) -> StepOutcome {
    StepOutcome::Skip {
        status: StepStatus::SkippedGeometryError,
        detail: format!("{stage}: {error}"),
    }
}

/// Dépose les géométries intermédiaires d'une étape si `dump_steps`
/// est configuré ; un échec d'écriture dégrade, il n'interrompt pas
fn dump_step_artifacts(
    config: &RunConfig,
    index: usize,
    step: &StepConfig,
    merged: Option<&MultiPolygon<f64>>,
    emitted: Option<&MultiPolygon<f64>>,
    report: &mut RunReport,
) {
    let Some(dir) = &config.dump_steps else {
        return;
    };

    if let Err(error) = std::fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %error, "Could not create dump directory");
        report.record_warning(index, &step.era, format!("dump directory: {error}"));
        return;
    }

    if let Some(merged) = merged {
        let path = dir.join(format!("{index:02}_{}_merged.geojson", step.era));
        if let Err(error) = writer::write_multi_polygon(merged, &path) {
            warn!(path = %path.display(), error = %error, "Could not dump merged geometry");
            report.record_warning(index, &step.era, format!("dump merged: {error}"));
        }
    }

    if let Some(emitted) = emitted {
        let path = dir.join(format!("{index:02}_{}_acquired.geojson", step.era));
        if let Err(error) = writer::write_multi_polygon(emitted, &path) {
            warn!(path = %path.display(), error = %error, "Could not dump emitted geometry");
            report.record_warning(index, &step.era, format!("dump acquired: {error}"));
        }
    }
}
