//! Moteur d'opérations ensemblistes sur les multi-polygones
//!
//! Toutes les opérations passent par le moteur booléen de `geo`. Sur
//! certaines entrées dégénérées (anneaux auto-intersectants, sommets
//! quasi-confondus) ce moteur abandonne en déroulant la pile ; chaque
//! appel est donc confiné et un abandon est remonté comme
//! [`GeodiffError::OpAborted`]. Un échec n'est jamais confondu avec un
//! résultat vide : le vide est représenté par `None`, l'échec par `Err`.
//!
//! Le confinement ne désactive pas le hook de panique du processus :
//! un abandon récupéré laisse le message du moteur (et la backtrace si
//! `RUST_BACKTRACE` est activé) sur stderr avant que l'erreur ne soit
//! renvoyée. Cette trace ne signale pas un arrêt du programme.
//!
//! `union` et `difference` acceptent des opérandes optionnels et
//! appliquent les lois du vide sans invoquer le moteur :
//! `difference(None, _) = None`, `difference(a, None) = a`,
//! `union(a, None) = union(None, a) = a`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use geo::{BooleanOps, MultiPolygon, Rect};

use crate::error::GeodiffError;

/// Opération demandée au moteur booléen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Union,
    Difference,
    Intersection,
}

impl OpKind {
    fn name(self) -> &'static str {
        match self {
            OpKind::Union => "union",
            OpKind::Difference => "difference",
            OpKind::Intersection => "intersection",
        }
    }
}

/// Union de deux géométries optionnelles
///
/// # Returns
/// `None` si les deux opérandes sont absents ou si le résultat est vide,
/// sinon la géométrie fusionnée.
pub fn union(
    a: Option<&MultiPolygon<f64>>,
    b: Option<&MultiPolygon<f64>>,
) -> Result<Option<MultiPolygon<f64>>, GeodiffError> {
    match (a, b) {
        (None, None) => Ok(None),
        (Some(x), None) | (None, Some(x)) => Ok(Some(x.clone())),
        (Some(x), Some(y)) => checked_op(x, y, OpKind::Union).map(non_empty),
    }
}

/// Différence `a \ b` de deux géométries optionnelles
///
/// # Returns
/// `None` si `a` est absent ou si `b` recouvre entièrement `a`,
/// `a` inchangé si `b` est absent.
pub fn difference(
    a: Option<&MultiPolygon<f64>>,
    b: Option<&MultiPolygon<f64>>,
) -> Result<Option<MultiPolygon<f64>>, GeodiffError> {
    match (a, b) {
        (None, _) => Ok(None),
        (Some(x), None) => Ok(Some(x.clone())),
        (Some(x), Some(y)) => checked_op(x, y, OpKind::Difference).map(non_empty),
    }
}

/// Intersection de deux géométries, `None` si elles sont disjointes
pub fn intersection(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<Option<MultiPolygon<f64>>, GeodiffError> {
    checked_op(a, b, OpKind::Intersection).map(non_empty)
}

/// Découpe une géométrie par un rectangle lon/lat
///
/// Le rectangle est traité comme un polygone et intersecté avec `a`.
/// `None` si la géométrie est entièrement hors du rectangle.
pub fn clip_bounds(
    a: &MultiPolygon<f64>,
    bounds: Rect<f64>,
) -> Result<Option<MultiPolygon<f64>>, GeodiffError> {
    let window = MultiPolygon::new(vec![bounds.to_polygon()]);
    intersection(a, &window)
}

/// Exécute l'opération en confinant un éventuel abandon du moteur
///
/// Le hook de panique global s'exécute quand même au moment de
/// l'abandon : le message du moteur apparaît sur stderr pour chaque
/// entrée écartée. Un appelant qui veut une sortie silencieuse
/// installe son propre hook via `std::panic::set_hook` ; ce crate ne
/// touche pas au hook, qui appartient à l'application.
fn checked_op(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
    op: OpKind,
) -> Result<MultiPolygon<f64>, GeodiffError> {
    panic::catch_unwind(AssertUnwindSafe(|| match op {
        OpKind::Union => a.union(b),
        OpKind::Difference => a.difference(b),
        OpKind::Intersection => a.intersection(b),
    }))
    .map_err(|payload| GeodiffError::op_aborted(op.name(), panic_message(payload.as_ref())))
}

/// Reconstitue le message porté par une panique confinée
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unidentified geometry engine abort".to_string()
    }
}

/// Représente un résultat vide comme l'absence de géométrie
fn non_empty(multi: MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    if multi.0.is_empty() {
        None
    } else {
        Some(multi)
    }
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
    fn test_union_null_operands() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        assert!(union(None, None).unwrap().is_none());
        assert_eq!(union(Some(&a), None).unwrap(), Some(a.clone()));
        assert_eq!(union(None, Some(&a)).unwrap(), Some(a));
    }

    #[test]
    fn test_difference_null_operands() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        assert!(difference(None, Some(&a)).unwrap().is_none());
        assert!(difference(None, None).unwrap().is_none());
        assert_eq!(difference(Some(&a), None).unwrap(), Some(a));
    }

    #[test]
    fn test_union_merges_adjacent_squares() {
        let a = square(0.0, 0.0, 5.0, 10.0);
        let b = square(5.0, 0.0, 10.0, 10.0);
        let merged = union(Some(&a), Some(&b)).unwrap().unwrap();
        assert_eq!(merged.0.len(), 1);
        assert!((merged.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_difference_removes_overlap() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        let b = square(0.0, 0.0, 5.0, 10.0);
        let result = difference(Some(&a), Some(&b)).unwrap().unwrap();
        assert!((result.unsigned_area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_difference_self_is_none() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        assert!(difference(Some(&a), Some(&a)).unwrap().is_none());
    }

    #[test]
    fn test_difference_disjoint_keeps_area() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        let b = square(20.0, 20.0, 30.0, 30.0);
        let result = difference(Some(&a), Some(&b)).unwrap().unwrap();
        assert!((result.unsigned_area() - a.unsigned_area()).abs() < 1e-9);
    }

    #[test]
    fn test_intersection_disjoint_is_none() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        let b = square(20.0, 20.0, 30.0, 30.0);
        assert!(intersection(&a, &b).unwrap().is_none());
    }

    #[test]
    fn test_clip_bounds_window() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        let bounds = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 15.0, y: 15.0 });
        let clipped = clip_bounds(&a, bounds).unwrap().unwrap();
        assert!((clipped.unsigned_area() - 25.0).abs() < 1e-9);

        let far = Rect::new(Coord { x: 50.0, y: 50.0 }, Coord { x: 60.0, y: 60.0 });
        assert!(clip_bounds(&a, far).unwrap().is_none());
    }

    #[test]
    fn test_union_surfaces_engine_abort_as_error() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        // Un sommet non fini fait abandonner le moteur en déroulant la pile
        let poisoned = MultiPolygon::new(vec![Polygon::new(
            LineString::new(vec![
                Coord { x: f64::NAN, y: 0.0 },
                Coord { x: 1.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
                Coord { x: f64::NAN, y: 0.0 },
            ]),
            vec![],
        )]);

        let error = union(Some(&a), Some(&poisoned)).unwrap_err();
        assert!(matches!(error, GeodiffError::OpAborted { op: "union", .. }));
        assert!(error.to_string().contains("union failed to resolve operands"));
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("sweep line invariant violated");
        assert_eq!(
            panic_message(boxed.as_ref()),
            "sweep line invariant violated"
        );

        let owned: Box<dyn Any + Send> = Box::new(String::from("unordered event"));
        assert_eq!(panic_message(owned.as_ref()), "unordered event");

        let opaque: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(opaque.as_ref()), "unidentified geometry engine abort");
    }
}
