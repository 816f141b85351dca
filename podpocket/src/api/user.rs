//! Endpoints utilisateur : abonnements, listes transversales, mises à jour
//! d'épisodes

use super::PocketApi;
use crate::error::{PocketError, Result};
use crate::models::{EpisodeListResponse, EpisodeRef, PodcastListResponse};
use serde_json::json;

impl PocketApi {
    /// Liste des podcasts abonnés
    pub async fn podcast_list(&self) -> Result<PodcastListResponse> {
        self.request(&self.api_url("/user/podcast/list"), Some(&json!({"v": 1})))
            .await
    }

    /// Liste transversale d'épisodes : `new_releases` ou `history`
    pub async fn episode_list(&self, list: &str) -> Result<EpisodeListResponse> {
        if list != "new_releases" && list != "history" {
            return Err(PocketError::NotFound(format!("invalid list: {list}")));
        }
        self.request(&self.api_url(&format!("/user/{list}")), Some(&json!({})))
            .await
    }

    /// Met à jour l'état de lecture d'un épisode
    ///
    /// `position` est la position de reprise en secondes (envoyée en
    /// chaîne, contrat du service) ; `status` vaut 2 pour "en cours"
    /// et 3 pour "lu".
    pub async fn update_episode(
        &self,
        episode: &EpisodeRef,
        position: Option<i64>,
        status: Option<i64>,
    ) -> Result<()> {
        let mut body = json!({
            "uuid": episode.uuid,
            "podcast": episode.podcast,
        });
        if let Some(position) = position {
            body["position"] = json!(position.to_string());
        }
        if let Some(status) = status {
            body["status"] = json!(status);
        }
        self.execute(&self.api_url("/sync/update_episode"), Some(&body))
            .await
    }

    /// Archive (ou désarchive) un lot d'épisodes
    pub async fn archive_episodes(&self, episodes: &[EpisodeRef], archive: bool) -> Result<()> {
        let body = json!({
            "episodes": episodes,
            "archive": archive,
        });
        self.execute(&self.api_url("/sync/update_episodes_archive"), Some(&body))
            .await
    }

    /// S'abonne à un podcast par UUID
    pub async fn subscribe(&self, uuid: &str) -> Result<()> {
        self.execute(
            &self.api_url("/user/podcast/subscribe"),
            Some(&json!({"uuid": uuid})),
        )
        .await
    }

    /// Se désabonne d'un podcast par UUID
    pub async fn unsubscribe(&self, uuid: &str) -> Result<()> {
        self.execute(
            &self.api_url("/user/podcast/unsubscribe"),
            Some(&json!({"uuid": uuid})),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_api(server: &mockito::Server, dir: &tempfile::TempDir) -> PocketApi {
        let token_path = dir.path().join(".token");
        std::fs::write(&token_path, "tok").unwrap();
        PocketApi::with_base_url(server.url(), &token_path, "u@e.com", "pw").unwrap()
    }

    #[tokio::test]
    async fn test_episode_list_rejects_unknown_list() {
        let server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();
        let api = test_api(&server, &dir);

        let err = api.episode_list("up_next").await.unwrap_err();
        assert!(matches!(err, PocketError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_episode_sends_position_as_string() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        let update = server
            .mock("POST", "/sync/update_episode")
            .match_body(mockito::Matcher::PartialJson(json!({
                "uuid": "e1",
                "podcast": "p1",
                "position": "120",
                "status": 2,
            })))
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let api = test_api(&server, &dir);
        api.update_episode(
            &EpisodeRef {
                uuid: "e1".to_string(),
                podcast: "p1".to_string(),
            },
            Some(120),
            Some(2),
        )
        .await?;
        update.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_archive_episodes_body() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        let archive = server
            .mock("POST", "/sync/update_episodes_archive")
            .match_body(mockito::Matcher::PartialJson(json!({
                "episodes": [{"uuid": "e1", "podcast": "p1"}],
                "archive": true,
            })))
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let api = test_api(&server, &dir);
        api.archive_episodes(
            &[EpisodeRef {
                uuid: "e1".to_string(),
                podcast: "p1".to_string(),
            }],
            true,
        )
        .await?;
        archive.assert_async().await;
        Ok(())
    }
}
