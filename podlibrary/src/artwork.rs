//! Cache disque des artworks de podcasts
//!
//! L'artwork d'un podcast est téléchargé une seule fois, avec un budget
//! court et une vérification de type de contenu, puis servi depuis
//! `artworks/<uuid>` par le launcher.

use crate::entities::Podcast;
use crate::error::Result;
use podcache::CacheStore;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// Budget de téléchargement d'un artwork
pub(crate) const ARTWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Télécharge et cache l'artwork d'un podcast s'il n'est pas déjà présent
///
/// Une réponse qui n'est pas une image est ignorée sans rien écrire.
pub async fn cache_artwork(
    http: &reqwest::Client,
    store: &CacheStore,
    podcast: &Podcast,
) -> Result<()> {
    if podcast.uuid.is_empty() || podcast.image.is_empty() {
        return Ok(());
    }
    let path = store.path(&["artworks", &podcast.uuid]);
    if path.exists() {
        return Ok(());
    }

    let response = http.get(&podcast.image).send().await?.error_for_status()?;
    let is_image = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("image/"));
    if !is_image {
        debug!("Artwork for {} is not an image, skipping", podcast.uuid);
        return Ok(());
    }

    let bytes = response.bytes().await?;
    store.write(&["artworks", &podcast.uuid], &bytes)?;
    debug!("Cached artwork for {}", podcast.uuid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use podcache::NoSpawner;
    use tempfile::tempdir;

    fn podcast_with_image(image: String) -> Podcast {
        Podcast {
            uuid: "p1".to_string(),
            image,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_artwork_is_downloaded_once() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();
        let store = CacheStore::with_spawner(dir.path(), Box::new(NoSpawner)).unwrap();

        let image = server
            .mock("GET", "/art.webp")
            .with_header("content-type", "image/webp")
            .with_body(b"binary image")
            .expect(1)
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let podcast = podcast_with_image(format!("{}/art.webp", server.url()));
        cache_artwork(&http, &store, &podcast).await?;
        // Déjà présent : pas de second téléchargement
        cache_artwork(&http, &store, &podcast).await?;

        image.assert_async().await;
        assert_eq!(
            store.read(&["artworks", "p1"], podcache::MaxAge::Unbounded, None)?,
            b"binary image"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_non_image_response_is_not_cached() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();
        let store = CacheStore::with_spawner(dir.path(), Box::new(NoSpawner)).unwrap();

        server
            .mock("GET", "/art.webp")
            .with_header("content-type", "text/html")
            .with_body("<html>not found</html>")
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let podcast = podcast_with_image(format!("{}/art.webp", server.url()));
        cache_artwork(&http, &store, &podcast).await?;

        assert!(matches!(
            store.read(&["artworks", "p1"], podcache::MaxAge::Unbounded, None),
            Err(podcache::CacheError::NotFound)
        ));
        Ok(())
    }
}
