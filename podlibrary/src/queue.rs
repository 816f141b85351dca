//! Mutations de la file et opérations distantes sur les épisodes
//!
//! Chaque mutation de file appelle l'endpoint distant puis reconstruit
//! l'état local complet depuis la réponse (la file résultante entière,
//! jamais un delta). L'identité requise est vérifiée avant tout appel
//! réseau.

use crate::entities::{Episode, Podcast};
use crate::error::{LibraryError, Result};
use crate::library::Library;
use podpocket::models::EpisodeRef;
use podpocket::QueueAction;
use tracing::{info, warn};

impl Library {
    /// Insère un épisode dans la file distante
    ///
    /// `play_last` est idempotent : si l'épisode figure déjà quelque part
    /// dans la file distante courante, la mutation est un no-op plutôt
    /// qu'un doublon.
    pub async fn add_to_queue(
        &mut self,
        episode: &Episode,
        action: QueueAction,
    ) -> Result<Vec<Episode>> {
        let queue_episode = episode.queue_episode()?;

        if action == QueueAction::PlayLast {
            match self.get_up_next(true).await {
                Ok(queue) => {
                    if queue.iter().any(|e| e.uuid == episode.uuid) {
                        info!("Episode {} already queued, skipping play_last", episode.uuid);
                        return Ok(queue);
                    }
                }
                Err(err) => warn!("Could not check queue before play_last: {}", err),
            }
        }

        let response = self.api().up_next_play(action, &queue_episode).await?;
        self.apply_up_next(response).await
    }

    /// Retire un lot d'épisodes de la file distante
    pub async fn remove_from_queue(&mut self, episodes: &[Episode]) -> Result<Vec<Episode>> {
        if episodes.is_empty() {
            return Err(LibraryError::MissingField("episodes".to_string()));
        }
        let uuids = episodes
            .iter()
            .map(|e| {
                if e.uuid.is_empty() {
                    Err(LibraryError::MissingField("uuid".to_string()))
                } else {
                    Ok(e.uuid.clone())
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let response = self.api().up_next_remove(&uuids).await?;
        self.apply_up_next(response).await
    }

    /// Archive un lot d'épisodes et les retire de la file
    ///
    /// L'appel d'archive et le retrait de file partent en parallèle puis
    /// sont joints ; avec `mark_played`, une mise à jour de statut "lu"
    /// est envoyée au préalable pour chaque épisode.
    pub async fn archive_episodes(&mut self, episodes: &[Episode], mark_played: bool) -> Result<()> {
        if episodes.is_empty() {
            return Err(LibraryError::MissingField("episodes".to_string()));
        }
        let refs = episodes
            .iter()
            .map(|e| e.episode_ref())
            .collect::<Result<Vec<EpisodeRef>>>()?;

        if mark_played {
            for episode in &refs {
                // Meilleur effort : l'archive vaut même sans le statut
                if let Err(err) = self.api().update_episode(episode, None, Some(3)).await {
                    warn!("Failed to mark {} as played: {}", episode.uuid, err);
                }
            }
        }

        let uuids: Vec<String> = refs.iter().map(|r| r.uuid.clone()).collect();
        let (archived, removed) = tokio::join!(
            self.api().archive_episodes(&refs, true),
            self.api().up_next_remove(&uuids)
        );
        archived?;
        self.apply_up_next(removed?).await?;
        Ok(())
    }

    /// Archive un épisode individuel
    pub async fn archive_episode(&mut self, episode: &Episode, mark_played: bool) -> Result<()> {
        self.archive_episodes(std::slice::from_ref(episode), mark_played)
            .await
    }

    /// Pousse la position de reprise d'un épisode vers le service
    pub async fn update_position(&mut self, episode: &Episode, seconds: i64) -> Result<()> {
        let episode_ref = episode.episode_ref()?;
        self.api()
            .update_episode(&episode_ref, Some(seconds), Some(2))
            .await?;
        Ok(())
    }

    /// S'abonne à un podcast, par UUID ou par URL de flux
    ///
    /// Un podcast sans UUID mais avec une URL de flux passe d'abord par
    /// l'endpoint d'ajout de flux, qui résout le flux en podcast du
    /// catalogue (avec polling du parsing asynchrone).
    pub async fn subscribe(&mut self, podcast: &mut Podcast) -> Result<()> {
        if podcast.uuid.is_empty() && !podcast.feed_url.is_empty() {
            let added = self.api().add_feed(&podcast.feed_url).await?;
            podcast.uuid = added.uuid;
            podcast.name = added.name;
            podcast.author = added.author;
            podcast.desc = added.desc;
            podcast.image = added.image;
            podcast.link = added.link;
        }
        if podcast.uuid.is_empty() {
            return Err(LibraryError::MissingField("podcast uuid".to_string()));
        }
        self.api().subscribe(&podcast.uuid).await?;
        info!("Subscribed to {}", podcast.name);
        Ok(())
    }

    /// Se désabonne d'un podcast et purge tous ses fichiers de cache
    pub async fn unsubscribe(&mut self, podcast: &Podcast) -> Result<()> {
        if podcast.uuid.is_empty() {
            return Err(LibraryError::MissingField("podcast uuid".to_string()));
        }
        self.api().unsubscribe(&podcast.uuid).await?;
        self.remove_podcast(&podcast.uuid);
        self.store().clear_podcast(&podcast.uuid)?;
        info!("Unsubscribed from {}", podcast.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::tests::test_library;
    use serde_json::json;
    use tempfile::tempdir;

    fn queued_episode() -> Episode {
        Episode {
            uuid: "e1".to_string(),
            podcast_uuid: "p1".to_string(),
            title: "Ep 1".to_string(),
            url: "https://x/1.mp3".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_play_last_is_idempotent() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        server
            .mock("POST", "/user/podcast/list")
            .with_body(json!({"podcasts": [{"uuid": "p1", "title": "A Show"}]}).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/up_next/list")
            .with_body(
                json!({"episodes": [
                    {"uuid": "e1", "title": "Ep 1", "url": "https://x/1.mp3", "podcast": "p1"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;
        let play_last = server
            .mock("POST", "/up_next/play_last")
            .expect(0)
            .create_async()
            .await;

        let mut library = test_library(&server, &dir);
        let queue = library
            .add_to_queue(&queued_episode(), QueueAction::PlayLast)
            .await?;

        // Une seule occurrence de l'épisode, aucune mutation émise
        assert_eq!(queue.iter().filter(|e| e.uuid == "e1").count(), 1);
        play_last.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_queue_requires_url_before_any_call() {
        let server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        let mut library = test_library(&server, &dir);
        let mut episode = queued_episode();
        episode.url = String::new();

        let err = library
            .add_to_queue(&episode, QueueAction::PlayNext)
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::MissingField(field) if field == "url"));
    }

    #[tokio::test]
    async fn test_play_next_rebuilds_queue_from_response() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        server
            .mock("POST", "/user/podcast/list")
            .with_body(json!({"podcasts": [{"uuid": "p1", "title": "A Show"}]}).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/up_next/play_next")
            .with_body(
                json!({"episodes": [
                    {"uuid": "e1", "title": "Ep 1", "url": "https://x/1.mp3", "podcast": "p1"},
                    {"uuid": "e2", "title": "Ep 2", "url": "https://x/2.mp3", "podcast": "p1"}
                ]})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let mut library = test_library(&server, &dir);
        let queue = library
            .add_to_queue(&queued_episode(), QueueAction::PlayNext)
            .await?;

        assert_eq!(queue.len(), 2);
        // Le cache de file reflète la réponse complète
        let cached: Vec<Episode> = library.store().load(
            &["up_next"],
            podcache::MaxAge::Unbounded,
            None,
        )?;
        assert_eq!(cached.len(), 2);
        assert_eq!(library.up_next().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_requires_episodes() {
        let server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        let mut library = test_library(&server, &dir);
        let err = library.remove_from_queue(&[]).await.unwrap_err();
        assert!(matches!(err, LibraryError::MissingField(_)));
    }

    #[tokio::test]
    async fn test_archive_joins_archive_and_removal() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        server
            .mock("POST", "/user/podcast/list")
            .with_body(json!({"podcasts": [{"uuid": "p1", "title": "A Show"}]}).to_string())
            .create_async()
            .await;
        let played = server
            .mock("POST", "/sync/update_episode")
            .match_body(mockito::Matcher::PartialJson(
                json!({"uuid": "e1", "podcast": "p1", "status": 3}),
            ))
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let archive = server
            .mock("POST", "/sync/update_episodes_archive")
            .match_body(mockito::Matcher::PartialJson(
                json!({"episodes": [{"uuid": "e1", "podcast": "p1"}], "archive": true}),
            ))
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let remove = server
            .mock("POST", "/up_next/remove")
            .match_body(mockito::Matcher::PartialJson(json!({"uuids": ["e1"]})))
            .with_body(json!({"episodes": []}).to_string())
            .expect(1)
            .create_async()
            .await;

        let mut library = test_library(&server, &dir);
        library.archive_episode(&queued_episode(), true).await?;

        played.assert_async().await;
        archive.assert_async().await;
        remove.assert_async().await;
        // La file locale a été reconstruite, vide
        assert!(library.up_next().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_archive_requires_identity() {
        let server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        let mut library = test_library(&server, &dir);
        let mut episode = queued_episode();
        episode.podcast_uuid = String::new();

        let err = library.archive_episode(&episode, false).await.unwrap_err();
        assert!(matches!(err, LibraryError::MissingField(_)));
    }
}
