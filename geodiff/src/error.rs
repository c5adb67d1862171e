//! Types d'erreurs pour le crate geodiff

use thiserror::Error;

/// Erreurs pouvant survenir lors des opérations géométriques
#[derive(Debug, Error)]
pub enum GeodiffError {
    /// L'opération booléenne n'a pas pu résoudre ses opérandes
    ///
    /// Les entrées dégénérées (anneaux auto-intersectants, sommets
    /// dupliqués...) font échouer le moteur booléen. L'erreur est
    /// remontée telle quelle : un échec n'est jamais confondu avec
    /// un résultat vide.
    #[error("{op} failed to resolve operands: {reason}")]
    OpAborted { op: &'static str, reason: String },

    /// Tolérance ou seuil invalide (négatif ou non fini)
    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

impl GeodiffError {
    /// Crée une erreur d'opération booléenne avec contexte
    pub fn op_aborted(op: &'static str, reason: impl Into<String>) -> Self {
        Self::OpAborted {
            op,
            reason: reason.into(),
        }
    }

    /// Crée une erreur de paramètre invalide
    pub fn invalid_parameter(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter { name, value }
    }
}
