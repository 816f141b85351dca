//! Vocabulaire de commandes du lecteur
//!
//! Accesseurs typés au-dessus du canal IPC brut : propriétés, playlist,
//! insertion d'entrées, transport. Quand le socket n'est pas joignable,
//! les opérations de lecture directe se rabattent sur l'ouverture de
//! l'URL par le système, qui lance le lecteur.

use crate::error::{PlayerError, Result};
use crate::ipc::PlayerClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Entrée de la playlist chargée dans le lecteur
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub filename: String,
    /// L'entrée en cours de lecture
    #[serde(default)]
    pub current: bool,
    /// Fichier de playlist d'origine de l'entrée
    #[serde(rename = "playlist-path", default)]
    pub playlist_path: Option<String>,
}

/// Position d'insertion d'un épisode dans la playlist du lecteur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPosition {
    /// Insérer à l'index courant et jouer immédiatement
    Now,
    /// Insérer juste après l'entrée courante
    Next,
    /// Ajouter en fin de playlist
    Last,
}

/// Mode de chargement d'un fichier de playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadListMode {
    /// Remplacer la playlist courante
    Replace,
    /// Ajouter à la suite de la playlist courante
    Append,
}

impl PlayerClient {
    /// Lit une propriété du lecteur
    pub async fn get_property(&self, name: &str) -> Result<Value> {
        self.command(&[json!("get_property"), json!(name)]).await
    }

    /// Playlist actuellement chargée dans le lecteur
    pub async fn playlist(&self) -> Result<Vec<PlaylistItem>> {
        let value = self.get_property("playlist").await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Index de l'entrée courante dans la playlist
    pub async fn playlist_current_pos(&self) -> Result<i64> {
        let value = self.get_property("playlist-current-pos").await?;
        value.as_i64().ok_or_else(|| {
            PlayerError::Protocol(format!("playlist-current-pos is not an index: {value}"))
        })
    }

    /// Position de lecture de l'entrée courante, en secondes
    pub async fn time_pos(&self) -> Result<f64> {
        let value = self.get_property("time-pos").await?;
        value
            .as_f64()
            .ok_or_else(|| PlayerError::Protocol(format!("time-pos is not a number: {value}")))
    }

    /// Insère un épisode dans la playlist du lecteur
    ///
    /// Si le lecteur ne répond pas, l'URL est ouverte par le système
    /// (ce qui lance le lecteur avec l'épisode).
    ///
    /// Les flags `insert-*` de `loadfile` requièrent mpv >= 0.38.0.
    pub async fn play_episode(&self, url: &str, position: PlayPosition) -> Result<()> {
        if url.is_empty() {
            return Err(PlayerError::Protocol("no episode URL provided".to_string()));
        }
        let current = match self.playlist_current_pos().await {
            Ok(current) => current,
            Err(err) => {
                debug!("Player unavailable ({}), opening URL via system handler", err);
                return open_in_player(url);
            }
        };
        match position {
            PlayPosition::Next => {
                self.command(&[json!("loadfile"), json!(url), json!("insert-next")])
                    .await?;
            }
            PlayPosition::Last => {
                self.command(&[json!("loadfile"), json!(url), json!("append")])
                    .await?;
            }
            PlayPosition::Now => {
                self.command(&[
                    json!("loadfile"),
                    json!(url),
                    json!("insert-at"),
                    json!(current),
                ])
                .await?;
                self.command(&[json!("playlist-play-index"), json!(current)])
                    .await?;
            }
        }
        Ok(())
    }

    /// Charge un fichier de playlist
    ///
    /// Se rabat sur l'ouverture du fichier par le système si le lecteur
    /// ne répond pas.
    pub async fn load_playlist(&self, file: &Path, mode: LoadListMode) -> Result<()> {
        let flag = match mode {
            LoadListMode::Replace => "replace",
            LoadListMode::Append => "append",
        };
        match self
            .command(&[json!("loadlist"), json!(file.to_string_lossy()), json!(flag)])
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!("Player unavailable ({}), opening playlist via system handler", err);
                open_file(file)
            }
        }
    }

    /// Bascule lecture/pause
    pub async fn toggle_pause(&self) -> Result<()> {
        self.command(&[json!("cycle"), json!("pause")]).await.map(|_| ())
    }

    /// Force l'état de pause
    pub async fn set_pause(&self, paused: bool) -> Result<()> {
        let value = if paused { "yes" } else { "no" };
        self.command(&[json!("set"), json!("pause"), json!(value)])
            .await
            .map(|_| ())
    }

    /// Saute en avant ou en arrière, en secondes
    pub async fn seek(&self, seconds: i64) -> Result<()> {
        self.command(&[json!("seek"), json!(seconds.to_string())])
            .await
            .map(|_| ())
    }

    /// Passe à l'entrée suivante de la playlist
    pub async fn playlist_next(&self) -> Result<()> {
        self.command(&[json!("playlist-next")]).await.map(|_| ())
    }
}

/// Ouvre une URL d'épisode via le handler `iina://` du système
fn open_in_player(url: &str) -> Result<()> {
    let escaped: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    run_open(&[&format!("iina://weblink?url={escaped}")])
}

/// Ouvre un fichier de playlist dans le lecteur via le système
fn open_file(file: &Path) -> Result<()> {
    run_open(&["-a", "IINA", &file.to_string_lossy()])
}

fn run_open(args: &[&str]) -> Result<()> {
    let status = Command::new("/usr/bin/open").args(args).status()?;
    if !status.success() {
        warn!("open {:?} exited with {}", args, status);
        return Err(PlayerError::Command(format!("open exited with {status}")));
    }
    Ok(())
}
