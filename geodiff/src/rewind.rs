//! Normalisation du sens d'enroulement des anneaux
//!
//! Les deux conventions d'enroulement utilisées par les rendus aval sont
//! opposées : la RFC 7946 impose des extérieurs anti-horaires (trous
//! horaires), tandis que les rendus sphériques de type d3 attendent des
//! extérieurs horaires (trous anti-horaires). Un polygone enroulé à
//! l'envers est interprété par ces rendus comme le complément de la
//! planète, d'où l'importance de normaliser chaque géométrie émise.
//!
//! L'orientation est évaluée au sens planaire (lon/lat traités comme x/y,
//! y vers le haut), ce qui correspond au signe de l'aire de lacet.

use geo::{LineString, MultiPolygon, Polygon, Winding};

/// Réenroule un anneau dans l'orientation demandée
///
/// Inverse l'ordre des points si l'orientation constatée diffère de
/// l'orientation cible, sinon l'anneau est laissé tel quel. Un anneau
/// dégénéré (aire nulle, moins de trois points distincts) n'a pas
/// d'orientation et est laissé inchangé.
pub fn rewind_ring(ring: &mut LineString<f64>, clockwise: bool) {
    if clockwise {
        ring.make_cw_winding();
    } else {
        ring.make_ccw_winding();
    }
}

/// Normalise un polygone : extérieur dans l'orientation cible, trous opposés
pub fn rewind_polygon(polygon: &mut Polygon<f64>, exterior_cw: bool) {
    polygon.exterior_mut(|ring| rewind_ring(ring, exterior_cw));
    polygon.interiors_mut(|rings| {
        for ring in rings {
            rewind_ring(ring, !exterior_cw);
        }
    });
}

/// Normalise chaque polygone d'un multi-polygone
///
/// Idempotent : réappliquer la même orientation ne modifie plus rien.
pub fn rewind_multi_polygon(multi: &mut MultiPolygon<f64>, exterior_cw: bool) {
    for polygon in &mut multi.0 {
        rewind_polygon(polygon, exterior_cw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::winding_order::WindingOrder;
    use geo::Coord;

    fn ccw_square() -> LineString<f64> {
        LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 0.0, y: 0.0 },
        ])
    }

    #[test]
    fn test_rewind_ring_reverses_when_needed() {
        let mut ring = ccw_square();
        assert_eq!(ring.winding_order(), Some(WindingOrder::CounterClockwise));

        rewind_ring(&mut ring, true);
        assert_eq!(ring.winding_order(), Some(WindingOrder::Clockwise));

        rewind_ring(&mut ring, false);
        assert_eq!(ring, ccw_square());
    }

    #[test]
    fn test_rewind_ring_noop_when_already_oriented() {
        let mut ring = ccw_square();
        let before = ring.clone();
        rewind_ring(&mut ring, false);
        assert_eq!(ring, before);
    }

    #[test]
    fn test_rewind_ring_degenerate_unchanged() {
        // Trois points colinéaires : pas d'orientation définissable
        let mut ring = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 2.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        let before = ring.clone();
        rewind_ring(&mut ring, true);
        assert_eq!(ring, before);
    }

    #[test]
    fn test_rewind_polygon_holes_opposed() {
        let exterior = ccw_square();
        let hole = LineString::new(vec![
            Coord { x: 2.0, y: 2.0 },
            Coord { x: 8.0, y: 2.0 },
            Coord { x: 8.0, y: 8.0 },
            Coord { x: 2.0, y: 8.0 },
            Coord { x: 2.0, y: 2.0 },
        ]);
        let mut polygon = Polygon::new(exterior, vec![hole]);

        rewind_polygon(&mut polygon, true);
        assert_eq!(
            polygon.exterior().winding_order(),
            Some(WindingOrder::Clockwise)
        );
        assert_eq!(
            polygon.interiors()[0].winding_order(),
            Some(WindingOrder::CounterClockwise)
        );

        rewind_polygon(&mut polygon, false);
        assert_eq!(
            polygon.exterior().winding_order(),
            Some(WindingOrder::CounterClockwise)
        );
        assert_eq!(
            polygon.interiors()[0].winding_order(),
            Some(WindingOrder::Clockwise)
        );
    }

    #[test]
    fn test_rewind_multi_polygon_round_trip() {
        let polygon = Polygon::new(ccw_square(), vec![]);
        let original = MultiPolygon::new(vec![polygon]);

        let mut multi = original.clone();
        rewind_multi_polygon(&mut multi, true);
        // Chaque anneau a changé d'orientation par rapport à l'original
        assert_ne!(multi, original);

        rewind_multi_polygon(&mut multi, false);
        assert_eq!(multi, original);
    }

    #[test]
    fn test_rewind_multi_polygon_idempotent() {
        let polygon = Polygon::new(ccw_square(), vec![]);
        let mut multi = MultiPolygon::new(vec![polygon]);

        rewind_multi_polygon(&mut multi, true);
        let once = multi.clone();
        rewind_multi_polygon(&mut multi, true);
        assert_eq!(multi, once);
    }
}
