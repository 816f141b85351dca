//! Entités locales : podcasts et épisodes
//!
//! L'UUID est l'identité durable d'un podcast ; nom et description sont
//! des métadonnées rafraîchies depuis le service. Un épisode est identifié
//! par son UUID plus celui de son podcast pour les opérations distantes,
//! et par sa seule URL vis-à-vis du lecteur externe (qui ignore les UUIDs).
//!
//! Les formes sérialisées servent d'entrées de cache disque ; les noms de
//! champs JSON sont donc stables.

use crate::error::{LibraryError, Result};
use chrono::{DateTime, Utc};
use podpocket::models::{EpisodeRef, QueueEpisode, RemotePodcast, SearchPodcast};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// URL de l'artwork d'un podcast dans le CDN du service
pub fn artwork_url(podcast_uuid: &str) -> String {
    format!("https://static.pocketcasts.com/discover/images/webp/200/{podcast_uuid}.webp")
}

/// Un podcast connu localement
///
/// Créé à l'abonnement ou à la première référence (apparition dans la
/// file) avec le seul UUID renseigné, puis enrichi par les fetchs de
/// métadonnées et d'épisodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Podcast {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub link: String,
    /// Épisodes connus localement, indexés par UUID
    #[serde(rename = "episodes", default, skip_serializing_if = "HashMap::is_empty")]
    pub episode_map: HashMap<String, Episode>,
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: Option<DateTime<Utc>>,
    pub uuid: String,
    /// URL de flux RSS, utilisée seulement pour l'abonnement par URL
    #[serde(skip)]
    pub feed_url: String,
}

impl Podcast {
    /// Squelette avec le seul UUID renseigné
    pub fn with_uuid(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Default::default()
        }
    }

    /// Construit un podcast depuis l'entrée de la liste d'abonnements
    pub fn from_remote(remote: RemotePodcast) -> Self {
        let image = artwork_url(&remote.uuid);
        Self {
            name: remote.name,
            author: remote.author,
            desc: remote.desc,
            link: remote.link,
            last_updated: remote.last_updated,
            image,
            uuid: remote.uuid,
            ..Default::default()
        }
    }

    /// Construit un podcast depuis un résultat de recherche du catalogue
    pub fn from_search(remote: SearchPodcast) -> Self {
        let image = artwork_url(&remote.uuid);
        Self {
            name: remote.name,
            author: remote.author,
            desc: remote.desc,
            link: remote.link,
            image,
            uuid: remote.uuid,
            ..Default::default()
        }
    }
}

/// Un épisode connu localement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Episode {
    #[serde(default)]
    pub title: String,
    /// Emplacement du flux audio, seule identité comprise par le lecteur
    #[serde(default)]
    pub url: String,
    #[serde(rename = "show_notes", default)]
    pub show_notes: String,
    /// Nom du podcast propriétaire
    #[serde(default)]
    pub podcast: String,
    #[serde(rename = "podcast_uuid", default)]
    pub podcast_uuid: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Durée en secondes
    #[serde(default)]
    pub duration: i64,
    /// Position de reprise en secondes
    #[serde(rename = "playedUpTo", default)]
    pub played_up_to: i64,
    /// Marqué lu pendant la réconciliation de playlist, jamais caché
    #[serde(skip)]
    pub played: bool,
    #[serde(default)]
    pub image: String,
    pub uuid: String,
}

impl Episode {
    /// Vérifie si les champs livrés incomplets par les listes distantes
    /// doivent être complétés depuis la liste d'épisodes du podcast
    pub fn needs_backfill(&self) -> bool {
        self.duration == 0 || self.show_notes.is_empty()
    }

    /// URL de lecture, annotée de la position de reprise
    ///
    /// Quand une position est connue, elle est ajoutée en paramètre `t`
    /// (exploité par la config mpv qui gère la reprise).
    pub fn resume_url(&self) -> Result<String> {
        if self.played_up_to <= 0 {
            return Ok(self.url.clone());
        }
        let mut url = Url::parse(&self.url)?;
        url.query_pairs_mut()
            .append_pair("t", &self.played_up_to.to_string());
        Ok(url.to_string())
    }

    /// Identité complète attendue par les mutations de file
    ///
    /// # Errors
    ///
    /// [`LibraryError::MissingField`] avant tout appel réseau si un champ
    /// requis est vide.
    pub fn queue_episode(&self) -> Result<QueueEpisode> {
        for (field, value) in [
            ("uuid", &self.uuid),
            ("podcast_uuid", &self.podcast_uuid),
            ("title", &self.title),
            ("url", &self.url),
        ] {
            if value.is_empty() {
                return Err(LibraryError::MissingField(field.to_string()));
            }
        }
        Ok(QueueEpisode {
            uuid: self.uuid.clone(),
            podcast: self.podcast_uuid.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
        })
    }

    /// Identité minimale pour l'archive et les mises à jour d'état
    pub fn episode_ref(&self) -> Result<EpisodeRef> {
        if self.uuid.is_empty() || self.podcast_uuid.is_empty() {
            return Err(LibraryError::MissingField("uuid".to_string()));
        }
        Ok(EpisodeRef {
            uuid: self.uuid.clone(),
            podcast: self.podcast_uuid.clone(),
        })
    }
}

/// Résumé de la file : nombre d'épisodes et secondes restantes
pub fn queue_summary(episodes: &[Episode]) -> (usize, i64) {
    let remaining = episodes
        .iter()
        .map(|e| (e.duration - e.played_up_to).max(0))
        .sum();
    (episodes.len(), remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_url_appends_position() -> Result<()> {
        let episode = Episode {
            url: "https://cdn.example/ep.mp3?feed=abc".to_string(),
            played_up_to: 123,
            ..Default::default()
        };
        let url = episode.resume_url()?;
        assert!(url.contains("t=123"));
        assert!(url.contains("feed=abc"));
        Ok(())
    }

    #[test]
    fn test_resume_url_untouched_without_position() -> Result<()> {
        let episode = Episode {
            url: "https://cdn.example/ep.mp3".to_string(),
            played_up_to: 0,
            ..Default::default()
        };
        assert_eq!(episode.resume_url()?, "https://cdn.example/ep.mp3");
        Ok(())
    }

    #[test]
    fn test_queue_episode_requires_identity() {
        let episode = Episode {
            uuid: "e1".to_string(),
            podcast_uuid: "p1".to_string(),
            title: "Ep".to_string(),
            url: String::new(),
            ..Default::default()
        };
        let err = episode.queue_episode().unwrap_err();
        assert!(matches!(err, LibraryError::MissingField(field) if field == "url"));
    }

    #[test]
    fn test_queue_summary_subtracts_progress() {
        let episodes = vec![
            Episode {
                duration: 3600,
                played_up_to: 600,
                ..Default::default()
            },
            Episode {
                duration: 1800,
                ..Default::default()
            },
        ];
        assert_eq!(queue_summary(&episodes), (2, 4800));
    }

    #[test]
    fn test_cache_round_trip_preserves_fields() {
        let episode = Episode {
            title: "Ep".to_string(),
            url: "https://x/1.mp3".to_string(),
            podcast: "A Show".to_string(),
            podcast_uuid: "p1".to_string(),
            duration: 1800,
            played_up_to: 60,
            played: true,
            uuid: "e1".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&episode).unwrap();
        let back: Episode = serde_json::from_str(&json).unwrap();
        assert_eq!(back.played_up_to, 60);
        assert_eq!(back.podcast_uuid, "p1");
        // L'état de réconciliation ne traverse pas le cache
        assert!(!back.played);
    }
}
