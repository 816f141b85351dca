//! Endpoints catalogue : métadonnées complètes et show notes d'un podcast

use super::PocketApi;
use crate::error::Result;
use crate::models::PodcastFullResponse;

impl PocketApi {
    /// Métadonnées complètes d'un podcast avec sa liste d'épisodes
    pub async fn podcast_full(&self, uuid: &str) -> Result<PodcastFullResponse> {
        self.request(&self.podcast_url(&format!("/podcast/full/{uuid}")), None)
            .await
    }

    /// Show notes de tous les épisodes d'un podcast
    ///
    /// Même forme de réponse que [`Self::podcast_full`], mais seuls les
    /// champs `show_notes` et `image` des épisodes sont renseignés.
    pub async fn podcast_show_notes(&self, uuid: &str) -> Result<PodcastFullResponse> {
        self.request(
            &self.podcast_url(&format!("/mobile/show_notes/full/{uuid}")),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_podcast_full_decodes_episodes() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();
        let token_path = dir.path().join(".token");
        std::fs::write(&token_path, "tok").unwrap();

        server
            .mock("GET", "/podcast/full/p1")
            .with_body(
                r#"{"podcast": {
                    "uuid": "p1", "title": "A Show", "author": "Someone",
                    "url": "https://show.example", "description": "Desc",
                    "episodes": [
                        {"uuid": "e1", "title": "Ep 1", "url": "https://x/1.mp3",
                         "published": "2025-06-01T10:00:00Z", "duration": 1800}
                    ]
                }}"#,
            )
            .create_async()
            .await;

        let api = PocketApi::with_base_url(server.url(), &token_path, "u@e.com", "pw")?;
        let response = api.podcast_full("p1").await?;
        assert_eq!(response.podcast.name, "A Show");
        assert_eq!(response.podcast.episodes.len(), 1);
        assert_eq!(response.podcast.episodes[0].duration, 1800);
        Ok(())
    }
}
