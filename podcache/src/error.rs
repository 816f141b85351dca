//! Gestion des erreurs pour le cache disque

use thiserror::Error;

/// Type Result personnalisé pour podcache
pub type Result<T> = std::result::Result<T, CacheError>;

/// Erreurs possibles lors de l'utilisation du cache disque
#[derive(Error, Debug)]
pub enum CacheError {
    /// L'entrée n'existe pas sur disque
    #[error("cache entry not found")]
    NotFound,

    /// Rafraîchissement forcé demandé (l'entrée est ignorée sans être lue)
    #[error("cache refresh forced")]
    ForceRefresh,

    /// Erreur d'entrée/sortie sur le répertoire de cache
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de sérialisation JSON du payload
    #[error("cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CacheError {
    /// Vérifie si l'erreur est un miss de cache (entrée absente ou forcée)
    ///
    /// Un miss déclenche un fetch distant synchrone chez l'appelant ;
    /// les autres erreurs remontent telles quelles.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound | CacheError::ForceRefresh)
    }
}
