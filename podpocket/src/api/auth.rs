//! Authentification auprès de Pocket Casts
//!
//! Le bearer token est obtenu par un appel de login et persisté dans un
//! fichier local ; les invocations suivantes du programme le relisent
//! sans se reconnecter. Le chargement paresseux se fait sous mutex pour
//! que deux tâches concurrentes ne déclenchent pas deux logins.

use super::PocketApi;
use crate::error::{PocketError, Result};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use tracing::{debug, info};

/// Réponse de l'endpoint `/user/login`
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

impl PocketApi {
    /// Retourne le token courant, en le chargeant si nécessaire
    ///
    /// Ordre de résolution : token déjà en mémoire, fichier de token
    /// persisté, login avec les credentials configurés.
    pub(crate) async fn ensure_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref() {
            return Ok(token.clone());
        }

        let loaded = match fs::read_to_string(&self.token_path) {
            Ok(contents) if !contents.trim().is_empty() => {
                debug!(path = %self.token_path.display(), "Loaded token from file");
                contents.trim().to_string()
            }
            _ => self.login().await?,
        };
        *token = Some(loaded.clone());
        Ok(loaded)
    }

    /// Purge le token en mémoire et sur disque (après un 401)
    pub(crate) async fn clear_token(&self) {
        let mut token = self.token.lock().await;
        *token = None;
        let _ = fs::remove_file(&self.token_path);
    }

    /// S'authentifie avec les credentials configurés et persiste le token
    ///
    /// # Errors
    ///
    /// * [`PocketError::NotAuthenticated`] - credentials absents
    /// * [`PocketError::Unauthorized`] - credentials refusés par le service
    async fn login(&self) -> Result<String> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(PocketError::NotAuthenticated(
                "no stored token and no credentials configured".to_string(),
            ));
        }
        info!("Logging in to Pocket Casts as {}", self.email);

        let body = json!({
            "email": self.email,
            "password": self.password,
        });
        let response = self
            .client
            .post(self.api_url("/user/login"))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PocketError::from_status_code(status.as_u16(), message));
        }
        let login: LoginResponse = response.json().await?;

        self.store_token(&login.token)?;
        Ok(login.token)
    }

    /// Persiste le token dans le fichier de token, lisible par le seul
    /// utilisateur
    fn store_token(&self, token: &str) -> Result<()> {
        fs::write(&self.token_path, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.token_path, fs::Permissions::from_mode(0o600))?;
        }
        debug!(path = %self.token_path.display(), "Stored token");
        Ok(())
    }
}
