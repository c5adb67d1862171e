//! Table des géométries de remplacement manuelles
//!
//! Certaines étapes historiques ne se laissent pas extraire par
//! différence (cartographie incohérente entre deux snapshots, cession
//! partielle mal tracée). Pour celles-ci, une FeatureCollection rédigée
//! à la main fournit la géométrie émise telle quelle. Chaque entité de
//! la table est indexée par sa propriété `era`, qui doit correspondre à
//! la clé d'ère de l'étape.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use geo::MultiPolygon;
use tracing::warn;

use crate::store::{self, LoadError};

/// Propriété reliant une entité de la table à son étape
pub const ERA_PROPERTY: &str = "era";

/// Table des overrides, indexée par clé d'ère
#[derive(Debug, Default)]
pub struct OverrideTable {
    entries: HashMap<String, MultiPolygon<f64>>,
}

impl OverrideTable {
    /// Charge la table depuis une FeatureCollection GeoJSON
    ///
    /// Les entités sans propriété `era` ou sans géométrie surfacique
    /// sont écartées avec un avertissement : la table reste utilisable,
    /// et une étape manuelle dont l'entrée manque échouera de toute
    /// façon au moment de la résolution.
    ///
    /// # Errors
    /// [`LoadError`] si le fichier est illisible ou n'est pas une
    /// FeatureCollection.
    pub fn load(path: &Path) -> Result<OverrideTable, LoadError> {
        let collection = store::read_collection(path)?;

        let mut entries: HashMap<String, MultiPolygon<f64>> = HashMap::new();

        for (index, feature) in collection.features.into_iter().enumerate() {
            let era = feature
                .properties
                .as_ref()
                .and_then(|properties| properties.get(ERA_PROPERTY))
                .and_then(|value| value.as_str())
                .map(str::to_string);

            let Some(era) = era else {
                warn!(file = %path.display(), index, "Override entry without era property, ignored");
                continue;
            };

            let geometry = feature.geometry.and_then(|g| store::as_multi_polygon(g.value));
            let Some(geometry) = geometry else {
                warn!(file = %path.display(), era = %era, "Override entry without areal geometry, ignored");
                continue;
            };

            if entries.insert(era.clone(), geometry).is_some() {
                warn!(file = %path.display(), era = %era, "Duplicate override entry, last one kept");
            }
        }

        Ok(OverrideTable { entries })
    }

    /// Géométrie de remplacement pour une ère, si présente
    pub fn lookup(&self, era: &str) -> Option<&MultiPolygon<f64>> {
        self.entries.get(era)
    }

    /// Clés d'ère couvertes par la table
    pub fn eras(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Résolution d'une table : fichier configuré ou table vide
pub fn load_optional(path: Option<&PathBuf>) -> Result<OverrideTable, LoadError> {
    match path {
        Some(path) => OverrideTable::load(path),
        None => Ok(OverrideTable::default()),
    }
}
