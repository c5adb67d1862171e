//! # acquisitions
//!
//! Extraction des frontières d'acquisition territoriale depuis des snapshots GeoJSON.
//!
//! ## Features
//!
//! - Dissolve par catégorie des entités de chaque snapshot
//! - Différence ensembliste avec l'état précédent (gain net de chaque étape)
//! - Overrides manuels pour les étapes sans snapshot exploitable
//! - Filtre des résidus de découpe et normalisation de l'enroulement
//! - CLI simple
//!
//! ## Usage CLI
//!
//! ```bash
//! # Construire la FeatureCollection des acquisitions
//! acquisitions build --config run.json
//! acquisitions build --config run.json --winding rfc7946 --report report.json
//!
//! # Valider la configuration et les snapshots (sans rien écrire)
//! acquisitions check --config run.json
//! ```

pub mod config;
pub mod overrides;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod writer;

pub use config::{RunConfig, StepConfig, WindingConvention};
pub use pipeline::{AcquisitionFeature, PipelineError, PipelineOutput};
pub use report::{RunReport, RunStatus};
