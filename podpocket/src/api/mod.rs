//! Couche d'accès à l'API REST Pocket Casts
//!
//! Ce module fournit la plomberie bas-niveau : construction des requêtes,
//! auth par bearer token, retry unique sur 401, décodage typé des
//! réponses. Les endpoints eux-mêmes sont répartis dans les sous-modules.

pub mod auth;
pub mod discover;
pub mod podcast;
pub mod queue;
pub mod user;

use crate::error::{PocketError, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// URL de base de l'API principale
const API_BASE_URL: &str = "https://api.pocketcasts.com";
/// URL de base de l'API catalogue (métadonnées et show notes)
const PODCAST_BASE_URL: &str = "https://podcast-api.pocketcasts.com";
/// URL de base du service d'agrégation de flux
const REFRESH_BASE_URL: &str = "https://refresh.pocketcasts.com";

/// Timeout des appels à l'API
const API_TIMEOUT: Duration = Duration::from_secs(15);

/// Client API bas-niveau pour communiquer avec Pocket Casts
///
/// Le token d'authentification persiste entre invocations via le fichier
/// de token ; en mémoire il est protégé par un mutex pour que des tâches
/// concurrentes ne se connectent pas deux fois.
pub struct PocketApi {
    /// Client HTTP
    client: Client,
    api_base: String,
    podcast_base: String,
    refresh_base: String,
    /// Fichier où le bearer token est persisté entre invocations
    token_path: PathBuf,
    email: String,
    password: String,
    /// Token chargé paresseusement (fichier, sinon login)
    token: Mutex<Option<String>>,
}

impl PocketApi {
    /// Crée une nouvelle instance de l'API
    ///
    /// # Arguments
    ///
    /// * `token_path` - Fichier du token persisté
    /// * `email` / `password` - Credentials utilisés si aucun token valide
    pub fn new<P: AsRef<Path>>(
        token_path: P,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(API_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: API_BASE_URL.to_string(),
            podcast_base: PODCAST_BASE_URL.to_string(),
            refresh_base: REFRESH_BASE_URL.to_string(),
            token_path: token_path.as_ref().to_path_buf(),
            email: email.into(),
            password: password.into(),
            token: Mutex::new(None),
        })
    }

    /// Crée une instance pointant tous les hosts vers une même base
    ///
    /// Utilisé par les tests pour rediriger les appels vers un serveur local.
    pub fn with_base_url<P: AsRef<Path>>(
        base_url: impl Into<String>,
        token_path: P,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let mut api = Self::new(token_path, email, password)?;
        api.api_base = base_url.clone();
        api.podcast_base = base_url.clone();
        api.refresh_base = base_url;
        Ok(api)
    }

    /// URL complète d'un endpoint de l'API principale
    pub(crate) fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_base, endpoint)
    }

    /// URL complète d'un endpoint de l'API catalogue
    pub(crate) fn podcast_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.podcast_base, endpoint)
    }

    /// URL complète d'un endpoint du service d'agrégation
    pub(crate) fn refresh_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.refresh_base, endpoint)
    }

    /// Effectue une requête authentifiée et décode la réponse
    ///
    /// GET si `body` est None, POST JSON sinon. Un 401 purge le token
    /// persisté et la requête est rejouée exactement une fois (le login
    /// se refait au passage via [`Self::ensure_token`]).
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let text = self.send(url, body).await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response from {}: {}", url, e);
            PocketError::JsonParse(e)
        })
    }

    /// Effectue une requête authentifiée dont la réponse est ignorée
    pub(crate) async fn execute(&self, url: &str, body: Option<&Value>) -> Result<()> {
        self.send(url, body).await.map(|_| ())
    }

    async fn send(&self, url: &str, body: Option<&Value>) -> Result<String> {
        let mut retried = false;
        loop {
            let token = self.ensure_token().await?;
            let request = match body {
                Some(body) => self.client.post(url).json(body),
                None => self.client.get(url),
            };
            let response = request.bearer_auth(&token).send().await?;
            let status = response.status();
            debug!("{} -> {}", url, status);

            if status == StatusCode::UNAUTHORIZED && !retried {
                // Token expiré : purge puis exactement un retry
                warn!("Got 401 from {}, clearing token and retrying once", url);
                self.clear_token().await;
                retried = true;
                continue;
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                warn!("API error ({}): {}", status.as_u16(), message);
                return Err(PocketError::from_status_code(status.as_u16(), message));
            }
            return Ok(response.text().await?);
        }
    }
}
