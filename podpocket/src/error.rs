//! Gestion des erreurs pour le client Pocket Casts

use thiserror::Error;

/// Type Result personnalisé pour podpocket
pub type Result<T> = std::result::Result<T, PocketError>;

/// Erreurs possibles lors de l'utilisation du client Pocket Casts
#[derive(Error, Debug)]
pub enum PocketError {
    /// Erreur d'authentification (credentials invalides)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Credentials absents (ni token persisté, ni email/mot de passe)
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// Ressource non trouvée côté distant (podcast, épisode, etc.)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// URL de flux rejetée par le service d'agrégation
    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur d'accès au fichier de token
    #[error("Token file error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de l'API Pocket Casts
    #[error("Pocket Casts API error (code {code}): {message}")]
    ApiError { code: u16, message: String },
}

impl PocketError {
    /// Crée une erreur API depuis un code de statut HTTP et un message
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            _ => Self::ApiError {
                code,
                message: message.into(),
            },
        }
    }

    /// Vérifie si l'erreur est une erreur de credentials
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            PocketError::Unauthorized(_) | PocketError::NotAuthenticated(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_code() {
        assert!(matches!(
            PocketError::from_status_code(401, "nope"),
            PocketError::Unauthorized(_)
        ));
        assert!(matches!(
            PocketError::from_status_code(403, "nope"),
            PocketError::Unauthorized(_)
        ));
        assert!(matches!(
            PocketError::from_status_code(404, "gone"),
            PocketError::NotFound(_)
        ));
        assert!(matches!(
            PocketError::from_status_code(500, "boom"),
            PocketError::ApiError { code: 500, .. }
        ));
    }
}
