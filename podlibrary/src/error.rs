//! Gestion des erreurs pour la bibliothèque de podcasts

use thiserror::Error;

/// Type Result personnalisé pour podlibrary
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Erreurs possibles lors de l'utilisation de la bibliothèque
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Erreur du cache disque
    #[error("cache error: {0}")]
    Cache(#[from] podcache::CacheError),

    /// Erreur du service distant
    #[error("remote service error: {0}")]
    Remote(#[from] podpocket::PocketError),

    /// Erreur du lecteur externe
    #[error("player error: {0}")]
    Player(#[from] podplayer::PlayerError),

    /// Erreur HTTP (téléchargement d'artwork)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de sérialisation JSON
    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur d'entrée/sortie
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL d'épisode non analysable
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Identité requise absente avant un appel distant
    #[error("episode info missing: {0}")]
    MissingField(String),

    /// Podcast introuvable (nom inconnu sans UUID ni URL)
    #[error("podcast not found: {0}")]
    PodcastNotFound(String),

    /// Échecs accumulés pendant la synchronisation de playlist
    #[error("playlist sync errors: {0}")]
    Sync(String),
}

impl LibraryError {
    /// Vérifie si l'erreur est un miss de cache à traiter par un fetch
    /// distant (entrée absente, rafraîchissement forcé, ou payload caché
    /// corrompu)
    pub(crate) fn is_cache_miss(err: &podcache::CacheError) -> bool {
        err.is_miss() || matches!(err, podcache::CacheError::Json(_))
    }
}
