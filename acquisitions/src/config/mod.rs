//! Configuration d'une exécution du pipeline
//!
//! Toute l'exécution est décrite par un fichier JSON : répertoire des
//! snapshots, séquence des étapes, catégories retenues, convention
//! d'enroulement, seuils. Il n'y a aucun état global : la configuration
//! chargée est passée explicitement au pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use geo::{Coord, Rect};

/// Catégories retenues par défaut pour le dissolve
fn default_categories() -> Vec<String> {
    vec!["state".to_string(), "territory".to_string()]
}

fn default_min_area() -> f64 {
    geodiff::DEFAULT_MIN_AREA_M2
}

/// Configuration principale d'une exécution
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Répertoire contenant les snapshots GeoJSON
    pub snapshots_dir: PathBuf,

    /// Fichier GeoJSON de sortie (FeatureCollection des acquisitions)
    pub output: PathBuf,

    /// Catégories d'entités à retenir lors du dissolve
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Convention d'enroulement des géométries émises
    #[serde(default)]
    pub winding: WindingConvention,

    /// Aire minimale (m²) en dessous de laquelle une acquisition est
    /// considérée comme un résidu de découpe et écartée
    #[serde(default = "default_min_area")]
    pub min_area_m2: f64,

    /// Tolérance d'alignement des sommets (degrés), désactivé si absent
    #[serde(default)]
    pub snap_tolerance_deg: Option<f64>,

    /// Fichier GeoJSON des géométries de remplacement manuelles
    #[serde(default)]
    pub overrides: Option<PathBuf>,

    /// Snapshot servant d'état "précédent" à la première étape
    ///
    /// Sans baseline, la première étape est le cas de base : sa
    /// géométrie fusionnée est émise entière, sans différence.
    #[serde(default)]
    pub baseline: Option<String>,

    /// Répertoire où déposer les géométries intermédiaires de chaque
    /// étape (fusion et acquisition), pour inspection
    #[serde(default)]
    pub dump_steps: Option<PathBuf>,

    /// Séquence chronologique des étapes
    pub steps: Vec<StepConfig>,
}

/// Une étape de la séquence : un snapshot daté
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepConfig {
    /// Nom du fichier snapshot, relatif à `snapshots_dir`
    pub file: String,

    /// Clé d'ère, unique dans la séquence (identifiant de sortie)
    pub era: String,

    /// Libellé lisible de l'acquisition
    pub label: String,

    /// Année ou période, recopiée dans les propriétés de sortie
    #[serde(default)]
    pub year: Option<String>,

    /// Étape à géométrie manuelle : la table des overrides fait foi
    #[serde(default)]
    pub manual: bool,

    /// Fenêtre lon/lat `[ouest, sud, est, nord]` appliquée à la
    /// géométrie courante avant la différence
    #[serde(default)]
    pub bounds: Option<[f64; 4]>,
}

/// Convention d'enroulement des anneaux émis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WindingConvention {
    /// RFC 7946 : extérieurs anti-horaires, trous horaires
    Rfc7946,
    /// Rendus sphériques type d3 : extérieurs horaires, trous anti-horaires
    Spherical,
}

impl Default for WindingConvention {
    fn default() -> Self {
        WindingConvention::Spherical
    }
}

impl WindingConvention {
    /// Orientation cible des anneaux extérieurs, au sens planaire
    pub fn exterior_clockwise(self) -> bool {
        matches!(self, WindingConvention::Spherical)
    }
}

impl std::fmt::Display for WindingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindingConvention::Rfc7946 => write!(f, "rfc7946"),
            WindingConvention::Spherical => write!(f, "spherical"),
        }
    }
}

impl RunConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Vérifie la cohérence de la configuration
    ///
    /// # Errors
    /// Séquence vide, clés d'ère dupliquées, seuils non finis ou
    /// tolérance d'alignement invalide.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            bail!("Config contains no steps");
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.era.as_str()) {
                bail!("Duplicate era key in steps: {}", step.era);
            }
        }

        if !self.min_area_m2.is_finite() || self.min_area_m2 < 0.0 {
            bail!("min_area_m2 must be finite and >= 0, got {}", self.min_area_m2);
        }

        if let Some(tolerance) = self.snap_tolerance_deg {
            if !tolerance.is_finite() || tolerance <= 0.0 {
                bail!("snap_tolerance_deg must be finite and > 0, got {tolerance}");
            }
        }

        if self.steps.iter().any(|s| s.manual) && self.overrides.is_none() {
            bail!("Some steps are flagged manual but no overrides file is configured");
        }

        Ok(())
    }

    /// Chemin complet du snapshot d'une étape
    pub fn snapshot_path(&self, file: &str) -> PathBuf {
        self.snapshots_dir.join(file)
    }
}

impl StepConfig {
    /// Fenêtre de découpe de l'étape, si configurée
    pub fn bounds_rect(&self) -> Option<Rect<f64>> {
        self.bounds.map(|[west, south, east, north]| {
            Rect::new(
                Coord { x: west, y: south },
                Coord { x: east, y: north },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config(steps: Vec<StepConfig>) -> RunConfig {
        RunConfig {
            snapshots_dir: PathBuf::from("snapshots"),
            output: PathBuf::from("out.geojson"),
            categories: default_categories(),
            winding: WindingConvention::default(),
            min_area_m2: default_min_area(),
            snap_tolerance_deg: None,
            overrides: None,
            baseline: None,
            dump_steps: None,
            steps,
        }
    }

    fn step(era: &str) -> StepConfig {
        StepConfig {
            file: format!("{era}.geojson"),
            era: era.to_string(),
            label: format!("Acquisition {era}"),
            year: None,
            manual: false,
            bounds: None,
        }
    }

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{
            "snapshots_dir": "data/snapshots",
            "output": "out/acquisitions.geojson",
            "steps": [
                { "file": "1790.geojson", "era": "original", "label": "Original territory" },
                { "file": "1805.geojson", "era": "louisiana", "label": "Louisiana Purchase", "year": "1803" }
            ]
        }"#;

        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.steps.len(), 2);
        assert_eq!(config.winding, WindingConvention::Spherical);
        assert_eq!(config.min_area_m2, geodiff::DEFAULT_MIN_AREA_M2);
        assert_eq!(config.categories, vec!["state", "territory"]);
        assert_eq!(config.steps[1].year.as_deref(), Some("1803"));
        assert!(!config.steps[1].manual);
    }

    #[test]
    fn test_parse_winding_convention() {
        let json = r#"{
            "snapshots_dir": "s", "output": "o", "winding": "rfc7946",
            "steps": [{ "file": "a.geojson", "era": "a", "label": "A" }]
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.winding, WindingConvention::Rfc7946);
        assert!(!config.winding.exterior_clockwise());
        assert!(WindingConvention::Spherical.exterior_clockwise());
    }

    #[test]
    fn test_validate_rejects_empty_steps() {
        let config = minimal_config(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_era() {
        let config = minimal_config(vec![step("gadsden"), step("gadsden")]);
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("gadsden"));
    }

    #[test]
    fn test_validate_rejects_manual_without_overrides() {
        let mut manual = step("alaska");
        manual.manual = true;
        let config = minimal_config(vec![manual]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_tolerance() {
        let mut config = minimal_config(vec![step("a")]);
        config.snap_tolerance_deg = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bounds_rect_orientation() {
        let mut with_bounds = step("gadsden");
        with_bounds.bounds = Some([-115.0, 31.0, -108.0, 33.5]);
        let rect = with_bounds.bounds_rect().unwrap();
        assert_eq!(rect.min(), Coord { x: -115.0, y: 31.0 });
        assert_eq!(rect.max(), Coord { x: -108.0, y: 33.5 });
        assert!(step("plain").bounds_rect().is_none());
    }
}
