//! Rapport d'exécution avec graceful degradation
//!
//! Ce module collecte le sort de chaque étape du pipeline (émise,
//! écartée et pourquoi) et produit un résumé console ou JSON. Une
//! étape écartée n'interrompt pas l'exécution ; le rapport est le
//! seul endroit où l'on voit ce qui a été dégradé.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

/// Statut global de l'exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Toutes les étapes prévues ont été émises
    Success,
    /// Exécution terminée mais certaines étapes ont été écartées
    PartialSuccess,
    /// Aucune étape émise
    Failed,
}

/// Sort d'une étape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    /// Émise : différence avec l'état précédent
    EmittedDifference,
    /// Émise : cas de base, fusion complète du premier snapshot
    EmittedBase,
    /// Émise : géométrie de remplacement manuelle
    EmittedOverride,
    /// Écartée : aucune entité dans les catégories retenues
    SkippedEmpty,
    /// Écartée : différence vide ou sous le seuil d'aire
    SkippedNoise,
    /// Écartée : le moteur booléen a échoué sur cette étape
    SkippedGeometryError,
}

impl StepStatus {
    /// Vrai si l'étape a produit une entité de sortie
    pub fn is_emitted(self) -> bool {
        matches!(
            self,
            StepStatus::EmittedDifference | StepStatus::EmittedBase | StepStatus::EmittedOverride
        )
    }
}

/// Sort détaillé d'une étape
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Position de l'étape dans la séquence
    pub step: usize,
    /// Clé d'ère de l'étape
    pub era: String,
    pub status: StepStatus,
    /// Cause d'un écartement, absent pour une émission
    pub detail: Option<String>,
    /// Aire géodésique émise, en km²
    pub area_km2: Option<f64>,
}

/// Dégradation non bloquante rencontrée pendant une étape
#[derive(Debug, Clone, Serialize)]
pub struct RunWarning {
    pub step: usize,
    pub era: String,
    pub message: String,
}

/// Rapport complet d'une exécution du pipeline
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Nombre d'étapes configurées
    pub steps_total: usize,
    /// Durée de l'exécution
    pub duration_secs: f64,
    /// Statut global
    pub status: RunStatus,

    // Compteurs globaux
    /// Nombre d'étapes émises
    pub emitted: usize,
    /// Nombre d'étapes écartées
    pub skipped: usize,
    /// Nombre d'entités écartées pendant les dissolves
    pub dissolve_parts_skipped: usize,

    /// Sort de chaque étape traitée
    pub records: Vec<StepRecord>,
    /// Dégradations non bloquantes
    pub warnings: Vec<RunWarning>,
}

impl RunReport {
    /// Crée un rapport pour une séquence de `steps_total` étapes
    pub fn new(steps_total: usize) -> Self {
        Self {
            steps_total,
            duration_secs: 0.0,
            status: RunStatus::Success,
            emitted: 0,
            skipped: 0,
            dissolve_parts_skipped: 0,
            records: Vec::with_capacity(steps_total),
            warnings: Vec::new(),
        }
    }

    /// Enregistre une étape émise
    pub fn record_emitted(&mut self, step: usize, era: &str, status: StepStatus, area_m2: f64) {
        debug_assert!(status.is_emitted());
        self.emitted += 1;
        self.records.push(StepRecord {
            step,
            era: era.to_string(),
            status,
            detail: None,
            area_km2: Some(area_m2 / 1_000_000.0),
        });
    }

    /// Enregistre une étape écartée avec sa cause
    pub fn record_skipped(&mut self, step: usize, era: &str, status: StepStatus, detail: &str) {
        debug_assert!(!status.is_emitted());
        self.skipped += 1;
        self.records.push(StepRecord {
            step,
            era: era.to_string(),
            status,
            detail: Some(detail.to_string()),
            area_km2: None,
        });
    }

    /// Enregistre une dégradation non bloquante
    pub fn record_warning(&mut self, step: usize, era: &str, message: impl Into<String>) {
        self.warnings.push(RunWarning {
            step,
            era: era.to_string(),
            message: message.into(),
        });
    }

    /// Enregistre des entités écartées pendant un dissolve
    pub fn record_dissolve_skips(&mut self, count: usize) {
        self.dissolve_parts_skipped += count;
    }

    /// Définit la durée de l'exécution
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final à partir des compteurs
    pub fn finalize(&mut self) {
        self.status = if self.skipped == 0 {
            RunStatus::Success
        } else if self.emitted > 0 {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Failed
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("ACQUISITIONS REPORT");
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Steps: {} configured, {} emitted, {} skipped",
            self.steps_total, self.emitted, self.skipped
        );
        if self.dissolve_parts_skipped > 0 {
            println!(
                "Dissolve: {} input features skipped",
                self.dissolve_parts_skipped
            );
        }

        if !self.records.is_empty() {
            println!("\n--- STEPS ---");
            for record in &self.records {
                let outcome = match (&record.area_km2, &record.detail) {
                    (Some(area), _) => format!("{area:.1} km²"),
                    (None, Some(detail)) => detail.clone(),
                    (None, None) => String::new(),
                };
                println!(
                    "  [{:>3}] {:<24} {:<20?} {}",
                    record.step, record.era, record.status, outcome
                );
            }
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for warning in self.warnings.iter().take(10) {
                println!(
                    "  [step {}:{}] {}",
                    warning.step, warning.era, warning.message
                );
            }
            if self.warnings.len() > 10 {
                println!("  ... and {} more", self.warnings.len() - 10);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour les logs
    pub fn summary(&self) -> String {
        format!(
            "{} steps: {} emitted, {} skipped, {} warnings",
            self.steps_total,
            self.emitted,
            self.skipped,
            self.warnings.len()
        )
    }
}
