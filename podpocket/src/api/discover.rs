//! Endpoints de découverte : recherche du catalogue et ajout de flux

use super::PocketApi;
use crate::error::{PocketError, Result};
use crate::models::{AddedPodcast, SearchResponse};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Nombre maximum de tours de polling lors d'un ajout de flux
const ADD_FEED_MAX_POLLS: usize = 30;
/// Délai entre deux tours de polling
const ADD_FEED_POLL_DELAY: Duration = Duration::from_secs(1);

impl PocketApi {
    /// Recherche de podcasts dans le catalogue
    pub async fn search(&self, term: &str) -> Result<SearchResponse> {
        self.request(
            &self.api_url("/discover/search"),
            Some(&json!({"term": term})),
        )
        .await
    }

    /// Résout une URL de flux RSS en podcast du catalogue
    ///
    /// Le parsing du flux est asynchrone côté service : tant que la
    /// réponse a le statut `poll`, l'appel est répété avec le `poll_uuid`
    /// renvoyé, jusqu'à obtenir `ok` ou épuiser le budget de polling.
    ///
    /// # Errors
    ///
    /// * [`PocketError::FeedNotFound`] - URL rejetée ou parsing jamais
    ///   terminé dans le budget
    pub async fn add_feed(&self, url: &str) -> Result<AddedPodcast> {
        let mut poll_uuid: Option<String> = None;
        for _ in 0..ADD_FEED_MAX_POLLS {
            let body = json!({
                "url": url,
                "poll_uuid": poll_uuid,
                "public_option": "no",
            });
            let response: crate::models::AddFeedResponse = self
                .request(&self.refresh_url("/author/add_feed_url"), Some(&body))
                .await?;

            match response.status.as_str() {
                "poll" => {
                    debug!(url, poll_uuid = %response.poll_uuid, "Feed still parsing, polling");
                    poll_uuid = Some(response.poll_uuid);
                    tokio::time::sleep(ADD_FEED_POLL_DELAY).await;
                }
                "ok" => {
                    return response
                        .result
                        .map(|r| r.podcast)
                        .ok_or_else(|| PocketError::FeedNotFound(url.to_string()));
                }
                _ => return Err(PocketError::FeedNotFound(url.to_string())),
            }
        }
        Err(PocketError::FeedNotFound(format!(
            "{url} (feed parsing did not finish)"
        )))
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
    async fn test_add_feed_polls_until_ok() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        let poll = server
            .mock("POST", "/author/add_feed_url")
            .match_body(mockito::Matcher::PartialJson(json!({"poll_uuid": null})))
            .with_body(r#"{"status": "poll", "poll_uuid": "poll-1"}"#)
            .expect(1)
            .create_async()
            .await;
        let done = server
            .mock("POST", "/author/add_feed_url")
            .match_body(mockito::Matcher::PartialJson(json!({"poll_uuid": "poll-1"})))
            .with_body(
                r#"{"status": "ok", "result": {"podcast": {
                    "uuid": "p1", "title": "A Show", "author": "Someone",
                    "description": "Desc", "thumbnail_url": "https://img",
                    "url": "https://show.example"
                }}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let api = test_api(&server, &dir);
        let podcast = api.add_feed("https://feed.example/rss.xml").await?;
        assert_eq!(podcast.uuid, "p1");
        assert_eq!(podcast.name, "A Show");
        poll.assert_async().await;
        done.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_add_feed_invalid_url() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        server
            .mock("POST", "/author/add_feed_url")
            .with_body(r#"{"status": "error"}"#)
            .create_async()
            .await;

        let api = test_api(&server, &dir);
        let err = api.add_feed("https://bogus.example/feed").await.unwrap_err();
        assert!(matches!(err, PocketError::FeedNotFound(_)));
        Ok(())
    }
}
