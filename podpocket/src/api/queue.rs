//! Endpoints de la file "up next"
//!
//! Toutes les mutations renvoient la file complète résultante ; l'appelant
//! reconstruit son état local depuis cette réponse plutôt que d'appliquer
//! un delta.

use super::PocketApi;
use crate::error::Result;
use crate::models::{QueueEpisode, UpNextResponse};
use serde_json::json;

/// Position d'insertion d'un épisode dans la file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAction {
    /// Insérer juste après l'épisode courant
    PlayNext,
    /// Ajouter en fin de file
    PlayLast,
    /// Insérer en tête et lancer la lecture
    PlayNow,
}

impl QueueAction {
    /// Segment d'endpoint correspondant à l'action
    pub fn endpoint(&self) -> &'static str {
        match self {
            QueueAction::PlayNext => "play_next",
            QueueAction::PlayLast => "play_last",
            QueueAction::PlayNow => "play_now",
        }
    }
}

impl PocketApi {
    /// File "up next" courante
    pub async fn up_next_list(&self) -> Result<UpNextResponse> {
        let body = json!({
            "version": 2,
            "model": "webplayer",
            "showPlayStatus": true,
        });
        self.request(&self.api_url("/up_next/list"), Some(&body))
            .await
    }

    /// Insère un épisode dans la file
    pub async fn up_next_play(
        &self,
        action: QueueAction,
        episode: &QueueEpisode,
    ) -> Result<UpNextResponse> {
        let body = json!({
            "version": 2,
            "episode": episode,
        });
        self.request(
            &self.api_url(&format!("/up_next/{}", action.endpoint())),
            Some(&body),
        )
        .await
    }

    /// Retire un lot d'épisodes de la file
    pub async fn up_next_remove(&self, uuids: &[String]) -> Result<UpNextResponse> {
        let body = json!({
            "version": 2,
            "uuids": uuids,
        });
        self.request(&self.api_url("/up_next/remove"), Some(&body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_up_next_play_posts_episode_identity() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();
        let token_path = dir.path().join(".token");
        std::fs::write(&token_path, "tok").unwrap();

        let play = server
            .mock("POST", "/up_next/play_next")
            .match_body(mockito::Matcher::PartialJson(json!({
                "version": 2,
                "episode": {
                    "uuid": "e1",
                    "podcast": "p1",
                    "title": "Ep 1",
                    "url": "https://x/1.mp3",
                },
            })))
            .with_body(r#"{"episodes": [{"uuid": "e1", "title": "Ep 1",
                "url": "https://x/1.mp3", "podcast": "p1"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let api = PocketApi::with_base_url(server.url(), &token_path, "u@e.com", "pw")?;
        let response = api
            .up_next_play(
                QueueAction::PlayNext,
                &QueueEpisode {
                    uuid: "e1".to_string(),
                    podcast: "p1".to_string(),
                    title: "Ep 1".to_string(),
                    url: "https://x/1.mp3".to_string(),
                },
            )
            .await?;
        assert_eq!(response.episodes.len(), 1);
        play.assert_async().await;
        Ok(())
    }
}
