//! # geodiff
//!
//! Opérations géométriques pour l'extraction de frontières d'acquisition :
//! dissolve, différence ensembliste, filtrage des résidus et normalisation
//! du sens d'enroulement, sur des multi-polygones lon/lat WGS84.
//!
//! ## Features
//!
//! - Opérations booléennes confinées : un abandon du moteur de `geo`
//!   devient une erreur typée, jamais un résultat vide
//! - Opérandes optionnels avec lois du vide (`union`, `difference`)
//! - Dissolve par unions successives avec liste des entrées écartées
//! - Filtrage des échardes par aire géodésique WGS84
//! - Alignement de sommets sur une géométrie de référence avant différence
//! - Réenroulement des anneaux vers une convention cible (RFC 7946 ou
//!   rendu sphérique)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geodiff::{difference, dissolve, filter_slivers, rewind_multi_polygon};
//!
//! let outcome = dissolve(&parts);
//! let current = outcome.merged;
//!
//! if let Some(acquired) = difference(current.as_ref(), previous.as_ref())? {
//!     if let Some(mut kept) = filter_slivers(acquired, geodiff::DEFAULT_MIN_AREA_M2) {
//!         rewind_multi_polygon(&mut kept, true);
//!     }
//! }
//! ```

pub mod dissolve;
pub mod error;
pub mod ops;
pub mod rewind;
pub mod sliver;
pub mod snap;

pub use dissolve::{dissolve, DissolveOutcome, SkippedPart};
pub use error::GeodiffError;
pub use ops::{clip_bounds, difference, intersection, union};
pub use rewind::{rewind_multi_polygon, rewind_polygon, rewind_ring};
pub use sliver::{filter_slivers, geodesic_area_m2, DEFAULT_MIN_AREA_M2};
pub use snap::{snap_to_vertices, DEFAULT_SNAP_TOLERANCE_DEG};
