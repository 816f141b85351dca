//! Gestion des erreurs pour le contrôle du lecteur externe

use thiserror::Error;

/// Type Result personnalisé pour podplayer
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Erreurs possibles lors du dialogue avec le lecteur externe
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Le socket IPC n'est pas joignable (lecteur fermé)
    #[error("Player socket unreachable: {0}")]
    Unreachable(std::io::Error),

    /// Le lecteur a répondu avec un statut autre que `success`
    #[error("Player command failed: {0}")]
    Command(String),

    /// Réponse inattendue sur le canal IPC
    #[error("Player protocol error: {0}")]
    Protocol(String),

    /// Erreur d'entrée/sortie sur le socket
    #[error("Player I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Réponse non décodable
    #[error("Player JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Délai de réponse dépassé
    #[error("Player timed out")]
    Timeout,
}

impl PlayerError {
    /// Vérifie si l'erreur signifie que le lecteur n'est pas lancé
    ///
    /// Dans ce cas l'appelant peut se rabattre sur l'ouverture de l'URL
    /// par le système.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, PlayerError::Unreachable(_))
    }
}
