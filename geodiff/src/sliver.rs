//! Filtrage des résidus de découpe par aire géodésique
//!
//! La différence entre deux frontières dont les tracés coïncident
//! presque laisse des échardes le long des arêtes communes. Ces résidus
//! se distinguent des acquisitions réelles par leur aire : plusieurs
//! ordres de grandeur sous le km² pour les premiers, largement au-dessus
//! pour les secondes. Le filtre écarte la géométrie entière lorsque son
//! aire totale passe sous le seuil ; il ne retaille jamais polygone par
//! polygone.

use geo::{GeodesicArea, MultiPolygon};

/// Seuil par défaut : 1 km² en m²
pub const DEFAULT_MIN_AREA_M2: f64 = 1_000_000.0;

/// Aire géodésique totale d'un multi-polygone, en m²
///
/// Calculée sur l'ellipsoïde WGS84, trous déduits, indépendante du sens
/// d'enroulement des anneaux.
pub fn geodesic_area_m2(multi: &MultiPolygon<f64>) -> f64 {
    multi.geodesic_area_unsigned()
}

/// Écarte une géométrie dont l'aire totale est sous le seuil
///
/// La comparaison est stricte : avec un seuil nul, toute géométrie est
/// conservée.
///
/// # Returns
/// `None` si l'aire totale est strictement inférieure à `min_area_m2`,
/// sinon la géométrie inchangée.
pub fn filter_slivers(multi: MultiPolygon<f64>, min_area_m2: f64) -> Option<MultiPolygon<f64>> {
    if geodesic_area_m2(&multi) < min_area_m2 {
        None
    } else {
        Some(multi)
    }
}
