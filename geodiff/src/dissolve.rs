//! Fusion d'un lot de géométries en une seule par unions successives
//!
//! Le dissolve réduit les entités retenues d'un snapshot en un
//! multi-polygone unique. La réduction est séquentielle : chaque union
//! incorpore la géométrie suivante au cumul courant. Une union qui
//! échoue est ignorée et consignée dans le résultat, la réduction
//! continue avec les entrées restantes ; l'appelant décide quoi faire
//! de la liste des exclusions.
//!
//! Limitation connue : dès qu'une entrée est écartée, le résultat
//! dépend de l'ordre du lot. L'entrée écartée à l'étape k est perdue
//! pour le reste de la réduction, même si elle aurait fusionné
//! proprement avec un autre sous-ensemble des entrées.

use geo::MultiPolygon;
use tracing::debug;

use crate::error::GeodiffError;
use crate::ops;

/// Résultat d'un dissolve : cumul fusionné et entrées écartées
#[derive(Debug)]
pub struct DissolveOutcome {
    /// Géométrie fusionnée, `None` si aucune entrée n'a pu être retenue
    pub merged: Option<MultiPolygon<f64>>,
    /// Entrées écartées parce que leur union a échoué
    pub skipped: Vec<SkippedPart>,
}

/// Entrée écartée pendant la réduction, avec la cause
#[derive(Debug)]
pub struct SkippedPart {
    /// Position de l'entrée dans le lot d'origine
    pub index: usize,
    /// Abandon du moteur booléen qui a écarté l'entrée
    pub error: GeodiffError,
}

impl DissolveOutcome {
    /// Vrai si toutes les entrées ont été fusionnées
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Fusionne un lot de multi-polygones en un seul
///
/// Les entrées vides sont ignorées. Un lot vide produit `merged: None`.
/// Un lot d'une seule entrée est renvoyé tel quel, sans passage par le
/// moteur booléen.
pub fn dissolve(parts: &[MultiPolygon<f64>]) -> DissolveOutcome {
    let mut merged: Option<MultiPolygon<f64>> = None;
    let mut skipped = Vec::new();

    for (index, part) in parts.iter().enumerate() {
        if part.0.is_empty() {
            debug!(index, "Empty geometry ignored during dissolve");
            continue;
        }
        match ops::union(merged.as_ref(), Some(part)) {
            Ok(next) => merged = next,
            Err(error) => skipped.push(SkippedPart { index, error }),
        }
    }

    DissolveOutcome { merged, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Coord, LineString, Polygon};

    fn square(west: f64, south: f64, east: f64, north: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::new(vec![
                Coord { x: west, y: south },
                Coord { x: east, y: south },
                Coord { x: east, y: north },
                Coord { x: west, y: north },
                Coord { x: west, y: south },
            ]),
            vec![],
        )])
    }

    #[test]
    fn test_dissolve_empty_batch() {
        let outcome = dissolve(&[]);
        assert!(outcome.merged.is_none());
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_dissolve_single_part_unchanged() {
        let part = square(0.0, 0.0, 10.0, 10.0);
        let outcome = dissolve(std::slice::from_ref(&part));
        assert_eq!(outcome.merged, Some(part));
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_dissolve_merges_adjacent_parts() {
        let parts = vec![
            square(0.0, 0.0, 5.0, 10.0),
            square(5.0, 0.0, 10.0, 10.0),
            square(10.0, 0.0, 15.0, 10.0),
        ];
        let outcome = dissolve(&parts);
        let merged = outcome.merged.as_ref().expect("merged geometry");
        assert!(outcome.is_complete());
        assert_eq!(merged.0.len(), 1);
        assert!((merged.unsigned_area() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_dissolve_disjoint_parts_kept_separate() {
        let parts = vec![square(0.0, 0.0, 5.0, 5.0), square(20.0, 20.0, 25.0, 25.0)];
        let outcome = dissolve(&parts);
        let merged = outcome.merged.expect("merged geometry");
        assert_eq!(merged.0.len(), 2);
        assert!((merged.unsigned_area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_dissolve_ignores_empty_geometries() {
        let parts = vec![
            MultiPolygon::new(vec![]),
            square(0.0, 0.0, 5.0, 5.0),
            MultiPolygon::new(vec![]),
        ];
        let outcome = dissolve(&parts);
        assert_eq!(outcome.merged, Some(square(0.0, 0.0, 5.0, 5.0)));
        assert!(outcome.is_complete());
    }

    // Un sommet non fini fait abandonner le moteur booléen
    fn poisoned_triangle() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::new(vec![
                Coord { x: f64::NAN, y: 0.0 },
                Coord { x: 1.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
                Coord { x: f64::NAN, y: 0.0 },
            ]),
            vec![],
        )])
    }

    #[test]
    fn test_dissolve_skips_aborting_part_and_keeps_merging() {
        let parts = vec![
            square(0.0, 0.0, 10.0, 10.0),
            poisoned_triangle(),
            square(20.0, 0.0, 30.0, 10.0),
        ];
        let outcome = dissolve(&parts);

        assert!(!outcome.is_complete());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].index, 1);
        assert!(matches!(
            outcome.skipped[0].error,
            GeodiffError::OpAborted { op: "union", .. }
        ));

        // Les entrées valides autour de l'entrée fautive sont fusionnées
        let merged = outcome.merged.expect("valid parts must merge");
        assert_eq!(merged.0.len(), 2);
        assert!((merged.unsigned_area() - 200.0).abs() < 1e-9);
    }
}
