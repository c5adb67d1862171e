//! Chargement des snapshots territoriaux GeoJSON
//!
//! Un snapshot est une FeatureCollection représentant tout le territoire
//! connu à un instant historique, partitionnée par la propriété
//! `CATEGORY` de chaque entité. Les jeux de données historiques sont
//! hétérogènes : une entité sans catégorie reçoit la sentinelle `none`
//! plutôt que de faire échouer le chargement, et une entité non
//! surfacique (point, ligne) est écartée avec un avertissement.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use geo::MultiPolygon;
use geojson::GeoJson;
use thiserror::Error;
use tracing::warn;

/// Propriété portant la catégorie d'une entité
pub const CATEGORY_PROPERTY: &str = "CATEGORY";

/// Catégorie sentinelle des entités sans propriété `CATEGORY`
pub const CATEGORY_NONE: &str = "none";

/// Erreurs de chargement d'un fichier GeoJSON
#[derive(Debug, Error)]
pub enum LoadError {
    /// Fichier illisible
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Contenu qui n'est pas du GeoJSON valide
    #[error("Invalid GeoJSON in {}: {reason}", path.display())]
    InvalidGeoJson { path: PathBuf, reason: String },

    /// GeoJSON valide mais qui n'est pas une FeatureCollection
    #[error("{}: expected a FeatureCollection, found {found}", path.display())]
    NotACollection { path: PathBuf, found: &'static str },
}

/// Entité surfacique d'un snapshot
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    /// Catégorie déclarée, ou [`CATEGORY_NONE`]
    pub category: String,
    /// Géométrie normalisée en multi-polygone
    pub geometry: MultiPolygon<f64>,
}

/// Snapshot chargé : toutes les entités surfaciques d'un instant
#[derive(Debug)]
pub struct Snapshot {
    /// Identifiant dérivé du nom de fichier (sans extension)
    pub id: String,
    pub features: Vec<BoundaryFeature>,
    /// Entités écartées car non surfaciques ou sans géométrie
    pub skipped_non_areal: usize,
}

impl Snapshot {
    /// Charge un snapshot depuis un fichier GeoJSON
    ///
    /// # Errors
    /// [`LoadError`] si le fichier est illisible, n'est pas du GeoJSON
    /// ou n'est pas une FeatureCollection.
    pub fn load(path: &Path) -> Result<Snapshot, LoadError> {
        let collection = read_collection(path)?;

        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut features = Vec::with_capacity(collection.features.len());
        let mut skipped_non_areal = 0;

        for feature in collection.features {
            let category = feature
                .properties
                .as_ref()
                .and_then(|properties| properties.get(CATEGORY_PROPERTY))
                .and_then(|value| value.as_str())
                .unwrap_or(CATEGORY_NONE)
                .to_string();

            let geometry = feature.geometry.and_then(|g| as_multi_polygon(g.value));
            match geometry {
                Some(geometry) => features.push(BoundaryFeature { category, geometry }),
                None => skipped_non_areal += 1,
            }
        }

        if skipped_non_areal > 0 {
            warn!(
                snapshot = %id,
                skipped = skipped_non_areal,
                "Non-areal features ignored"
            );
        }

        Ok(Snapshot {
            id,
            features,
            skipped_non_areal,
        })
    }

    /// Filtre les entités appartenant aux catégories demandées
    ///
    /// Filtre pur : aucune correspondance renvoie une séquence vide,
    /// jamais une erreur.
    pub fn select_categories(&self, wanted: &HashSet<String>) -> Vec<&BoundaryFeature> {
        self.features
            .iter()
            .filter(|feature| wanted.contains(&feature.category))
            .collect()
    }

    /// Effectifs par catégorie, pour l'inspection
    pub fn category_counts(&self) -> HashMap<&str, usize> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for feature in &self.features {
            *counts.entry(feature.category.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Lit et vérifie une FeatureCollection GeoJSON
pub(crate) fn read_collection(path: &Path) -> Result<geojson::FeatureCollection, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let geojson: GeoJson = raw
        .parse()
        .map_err(|e: geojson::Error| LoadError::InvalidGeoJson {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) => Err(LoadError::NotACollection {
            path: path.to_path_buf(),
            found: "Feature",
        }),
        GeoJson::Geometry(_) => Err(LoadError::NotACollection {
            path: path.to_path_buf(),
            found: "Geometry",
        }),
    }
}

/// Convertit une géométrie GeoJSON en multi-polygone, `None` si non surfacique
pub(crate) fn as_multi_polygon(value: geojson::Value) -> Option<MultiPolygon<f64>> {
    match geo::Geometry::<f64>::try_from(value) {
        Ok(geo::Geometry::Polygon(polygon)) => Some(MultiPolygon::new(vec![polygon])),
        Ok(geo::Geometry::MultiPolygon(multi)) => Some(multi),
        _ => None,
    }
}
