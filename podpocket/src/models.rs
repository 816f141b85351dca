//! Schémas de réponse typés des endpoints Pocket Casts
//!
//! L'API renvoie des structures faiblement typées ; chaque endpoint a ici
//! son schéma explicite, décodé strictement. Les champs optionnels côté
//! service portent `#[serde(default)]` ; un payload dont la forme ne
//! correspond pas remonte en erreur de décodage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Réponse des endpoints `/up_next/*` : la file complète résultante
///
/// Les mutations de file renvoient la même forme que `/up_next/list` ;
/// l'état local est reconstruit depuis cette réponse, jamais par delta.
#[derive(Debug, Deserialize)]
pub struct UpNextResponse {
    #[serde(default)]
    pub episodes: Vec<UpNextEpisode>,
    /// Positions de lecture et durées, livrées à part des épisodes
    #[serde(rename = "episodeSync", default)]
    pub episode_sync: Vec<EpisodeSync>,
}

/// Épisode tel que présent dans la file distante (champs incomplets :
/// ni durée ni show notes, complétés depuis le cache du podcast)
#[derive(Debug, Deserialize)]
pub struct UpNextEpisode {
    pub uuid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "podcast", default)]
    pub podcast_uuid: String,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
}

/// Position de lecture connue du service pour un épisode de la file
#[derive(Debug, Deserialize)]
pub struct EpisodeSync {
    pub uuid: String,
    #[serde(rename = "playedUpTo", default)]
    pub played_up_to: i64,
    #[serde(default)]
    pub duration: i64,
}

/// Réponse de `/user/podcast/list`
#[derive(Debug, Deserialize)]
pub struct PodcastListResponse {
    #[serde(default)]
    pub podcasts: Vec<RemotePodcast>,
}

/// Podcast abonné tel que listé par le service
#[derive(Debug, Deserialize)]
pub struct RemotePodcast {
    pub uuid: String,
    #[serde(rename = "title", default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "url", default)]
    pub link: String,
    #[serde(rename = "description", default)]
    pub desc: String,
    #[serde(rename = "lastEpisodePublished", default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Réponse de `/podcast/full/{uuid}` et `/mobile/show_notes/full/{uuid}`
#[derive(Debug, Deserialize)]
pub struct PodcastFullResponse {
    pub podcast: RemotePodcastDetail,
}

/// Métadonnées complètes d'un podcast avec sa liste d'épisodes
#[derive(Debug, Deserialize)]
pub struct RemotePodcastDetail {
    #[serde(default)]
    pub uuid: String,
    #[serde(rename = "title", default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "url", default)]
    pub link: String,
    #[serde(rename = "description", default)]
    pub desc: String,
    #[serde(default)]
    pub episodes: Vec<RemoteEpisode>,
}

/// Épisode dans la liste complète d'un podcast
#[derive(Debug, Deserialize)]
pub struct RemoteEpisode {
    pub uuid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "show_notes", default)]
    pub show_notes: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: i64,
}

/// Réponse de `/user/new_releases` et `/user/history`
#[derive(Debug, Deserialize)]
pub struct EpisodeListResponse {
    #[serde(default)]
    pub episodes: Vec<ListEpisode>,
}

/// Épisode dans une liste transversale (dernières sorties, historique)
#[derive(Debug, Deserialize)]
pub struct ListEpisode {
    pub uuid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "podcastTitle", default)]
    pub podcast: String,
    #[serde(rename = "podcastUuid", default)]
    pub podcast_uuid: String,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: i64,
    #[serde(rename = "playedUpTo", default)]
    pub played_up_to: i64,
}

/// Réponse de `/discover/search`
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub podcasts: Vec<SearchPodcast>,
}

/// Podcast tel que renvoyé par la recherche du catalogue
#[derive(Debug, Deserialize)]
pub struct SearchPodcast {
    pub uuid: String,
    #[serde(rename = "title", default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "description", default)]
    pub desc: String,
    #[serde(rename = "url", default)]
    pub link: String,
}

/// Réponse de l'endpoint d'ajout de flux par URL
///
/// Le parsing du flux est asynchrone côté service : tant que `status`
/// vaut `poll`, l'appel doit être répété avec le `poll_uuid` renvoyé.
#[derive(Debug, Deserialize)]
pub struct AddFeedResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub poll_uuid: String,
    #[serde(default)]
    pub result: Option<AddFeedResult>,
}

#[derive(Debug, Deserialize)]
pub struct AddFeedResult {
    pub podcast: AddedPodcast,
}

/// Podcast résolu depuis une URL de flux
#[derive(Debug, Deserialize)]
pub struct AddedPodcast {
    #[serde(default)]
    pub uuid: String,
    #[serde(rename = "title", default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "description", default)]
    pub desc: String,
    #[serde(rename = "thumbnail_url", default)]
    pub image: String,
    #[serde(rename = "url", default)]
    pub link: String,
}

/// Identité d'un épisode pour les opérations d'archive et de mise à jour
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeRef {
    pub uuid: String,
    /// UUID du podcast propriétaire, clé `podcast` sur le fil
    pub podcast: String,
}

/// Épisode complet tel qu'attendu par les mutations de file
#[derive(Debug, Clone, Serialize)]
pub struct QueueEpisode {
    pub uuid: String,
    pub podcast: String,
    pub title: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_next_response_decodes_episode_sync() {
        let json = r#"{
            "episodes": [
                {"uuid": "e1", "title": "Ep 1", "url": "https://x/1.mp3",
                 "podcast": "p1", "published": "2025-06-01T10:00:00Z"}
            ],
            "episodeSync": [
                {"uuid": "e1", "playedUpTo": 120, "duration": 3600}
            ]
        }"#;
        let response: UpNextResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.episodes.len(), 1);
        assert_eq!(response.episodes[0].podcast_uuid, "p1");
        assert_eq!(response.episode_sync[0].played_up_to, 120);
        assert_eq!(response.episode_sync[0].duration, 3600);
    }

    #[test]
    fn test_up_next_response_tolerates_missing_sync() {
        let json = r#"{"episodes": []}"#;
        let response: UpNextResponse = serde_json::from_str(json).unwrap();
        assert!(response.episodes.is_empty());
        assert!(response.episode_sync.is_empty());
    }

    #[test]
    fn test_podcast_list_field_mapping() {
        let json = r#"{"podcasts": [
            {"uuid": "p1", "title": "A Show", "author": "Someone",
             "url": "https://show.example", "description": "About things",
             "lastEpisodePublished": "2025-05-30T08:00:00Z"}
        ]}"#;
        let response: PodcastListResponse = serde_json::from_str(json).unwrap();
        let p = &response.podcasts[0];
        assert_eq!(p.name, "A Show");
        assert_eq!(p.link, "https://show.example");
        assert_eq!(p.desc, "About things");
        assert!(p.last_updated.is_some());
    }

    #[test]
    fn test_list_episode_field_mapping() {
        let json = r#"{"episodes": [
            {"uuid": "e1", "title": "Ep", "url": "https://x/1.mp3",
             "podcastTitle": "A Show", "podcastUuid": "p1",
             "published": "2025-06-01T10:00:00Z", "duration": 1800,
             "playedUpTo": 60}
        ]}"#;
        let response: EpisodeListResponse = serde_json::from_str(json).unwrap();
        let e = &response.episodes[0];
        assert_eq!(e.podcast, "A Show");
        assert_eq!(e.podcast_uuid, "p1");
        assert_eq!(e.played_up_to, 60);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let json = r#"{"podcasts": "not-a-list"}"#;
        assert!(serde_json::from_str::<PodcastListResponse>(json).is_err());
    }
}
