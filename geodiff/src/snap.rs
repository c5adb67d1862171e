//! Alignement de sommets sur une géométrie de référence
//!
//! Deux tracés censés coïncider mais numérisés séparément ne partagent
//! pas leurs sommets ; leur différence laisse alors des échardes tout le
//! long de la frontière commune. Avant la différence, les sommets du
//! soustracteur peuvent être alignés sur ceux de la géométrie courante :
//! chaque sommet de la cible est remplacé par le sommet de référence le
//! plus proche s'il se trouve à moins de la tolérance (distance
//! euclidienne en degrés).
//!
//! Les sommets de référence sont indexés dans une grille de pas égal à
//! la tolérance ; la recherche du plus proche ne visite que les neuf
//! cellules voisines.

use std::collections::HashMap;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use tracing::warn;

use crate::error::GeodiffError;

/// Tolérance d'alignement par défaut, en degrés (~1.1 km à l'équateur)
pub const DEFAULT_SNAP_TOLERANCE_DEG: f64 = 0.01;

/// Aligne les sommets de `target` sur ceux de `reference`
///
/// Les anneaux dont le tracé s'effondre après alignement (moins de
/// trois sommets distincts) sont écartés : un trou écarté laisse son
/// polygone plein, un extérieur écarté supprime le polygone entier. Le
/// résultat peut donc être vide.
///
/// # Errors
/// [`GeodiffError::InvalidParameter`] si la tolérance est négative,
/// nulle ou non finie.
pub fn snap_to_vertices(
    target: &MultiPolygon<f64>,
    reference: &MultiPolygon<f64>,
    tolerance_deg: f64,
) -> Result<MultiPolygon<f64>, GeodiffError> {
    if !tolerance_deg.is_finite() || tolerance_deg <= 0.0 {
        return Err(GeodiffError::invalid_parameter(
            "snap tolerance (degrees)",
            tolerance_deg,
        ));
    }

    let grid = VertexGrid::build(reference, tolerance_deg);
    let mut polygons = Vec::with_capacity(target.0.len());

    for (index, polygon) in target.0.iter().enumerate() {
        let Some(exterior) = snap_ring(polygon.exterior(), &grid) else {
            warn!(polygon = index, "Exterior ring collapsed after snapping, polygon dropped");
            continue;
        };
        let mut interiors = Vec::with_capacity(polygon.interiors().len());
        for (ring_index, interior) in polygon.interiors().iter().enumerate() {
            match snap_ring(interior, &grid) {
                Some(ring) => interiors.push(ring),
                None => {
                    warn!(
                        polygon = index,
                        ring = ring_index,
                        "Interior ring collapsed after snapping, hole dropped"
                    );
                }
            }
        }
        polygons.push(Polygon::new(exterior, interiors));
    }

    Ok(MultiPolygon::new(polygons))
}

/// Aligne un anneau et nettoie le tracé obtenu
///
/// `None` si l'anneau ne compte plus trois sommets distincts.
fn snap_ring(ring: &LineString<f64>, grid: &VertexGrid) -> Option<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = ring
        .0
        .iter()
        .map(|coord| grid.nearest_within(coord).unwrap_or(*coord))
        .collect();

    // L'alignement peut confondre des sommets voisins
    coords.dedup();

    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }

    if coords.len() < 4 {
        return None;
    }
    Some(LineString::new(coords))
}

/// Index spatial des sommets de référence, en cellules de pas `cell`
struct VertexGrid {
    cell: f64,
    buckets: HashMap<(i64, i64), Vec<Coord<f64>>>,
}

impl VertexGrid {
    fn build(reference: &MultiPolygon<f64>, cell: f64) -> Self {
        let mut buckets: HashMap<(i64, i64), Vec<Coord<f64>>> = HashMap::new();
        for polygon in &reference.0 {
            let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors().iter());
            for ring in rings {
                for coord in &ring.0 {
                    buckets.entry(Self::key(cell, coord)).or_default().push(*coord);
                }
            }
        }
        Self { cell, buckets }
    }

    fn key(cell: f64, coord: &Coord<f64>) -> (i64, i64) {
        ((coord.x / cell).floor() as i64, (coord.y / cell).floor() as i64)
    }

    /// Sommet de référence le plus proche à moins d'une cellule
    fn nearest_within(&self, coord: &Coord<f64>) -> Option<Coord<f64>> {
        let (cx, cy) = Self::key(self.cell, coord);
        let mut best: Option<(f64, Coord<f64>)> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(candidates) = self.buckets.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for candidate in candidates {
                    let distance = (candidate.x - coord.x).hypot(candidate.y - coord.y);
                    if distance <= self.cell
                        && best.map_or(true, |(current, _)| distance < current)
                    {
                        best = Some((distance, *candidate));
                    }
                }
            }
        }

        best.map(|(_, coord)| coord)
    }
}
