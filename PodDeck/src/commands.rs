//! Dispatch des invocations du launcher
//!
//! Le launcher livre une action (effet de bord) ou un trigger (liste de
//! résultats) en variables d'environnement, avec leurs paramètres
//! (`uuid`, `podcastUuid`, `podcast`, `url`, `query`, ...). Les listes
//! sont sérialisées en JSON sur stdout ; un échec de résolveur produit un
//! unique objet d'erreur à la place.

use anyhow::{anyhow, Result};
use podcache::{CacheStore, RefreshTarget};
use podlibrary::{
    cache_show_notes, queue_summary, Episode, EpisodeQuery, Library, ListKind, Podcast,
    SHOWNOTES_MAX_AGE,
};
use podplayer::{LoadListMode, PlayPosition, PlayerClient};
use podpocket::QueueAction;
use serde::Serialize;
use std::env;
use tracing::{info, warn};

/// Nombre maximum d'épisodes listés pour un podcast
const EPISODE_LIST_LIMIT: usize = 30;

/// Vue de la file rendue au launcher
#[derive(Serialize)]
struct QueueView {
    episodes: Vec<Episode>,
    count: usize,
    /// Somme des durées restantes, en secondes
    remaining_seconds: i64,
}

/// Objet d'erreur rendu à la place d'une liste
#[derive(Serialize)]
struct ErrorView {
    error: String,
}

fn env_or_default(name: &str) -> String {
    env::var(name).unwrap_or_default()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Corps d'un worker de rafraîchissement
///
/// Invoqué quand le processus a été spawné avec la variable `refresh` ;
/// recharge la collection cible avec `force` puis sort. Le lock de la
/// cible est tenu par l'appelant via un garde.
pub async fn run_refresh(
    library: &mut Library,
    store: &CacheStore,
    target: &RefreshTarget,
) -> Result<()> {
    info!(target = target.name(), "Refresh worker started");
    match target {
        RefreshTarget::Podcast(uuid) => {
            library
                .get_podcast_episodes(Podcast::with_uuid(uuid.clone()), true)
                .await?;
        }
        RefreshTarget::AllPodcasts => {
            // Balayage périodique des vieilles show notes au passage
            if let Err(err) = store.sweep_shownotes(SHOWNOTES_MAX_AGE) {
                warn!("Show note sweep failed: {}", err);
            }
            library.get_all_podcasts(true).await?;
        }
        RefreshTarget::UpNext => {
            library.get_up_next(true).await?;
        }
        RefreshTarget::NewReleases => {
            library.get_list(ListKind::NewReleases, true).await?;
        }
        RefreshTarget::History => {
            library.get_list(ListKind::History, true).await?;
        }
    }
    info!(target = target.name(), "Refresh worker finished");
    Ok(())
}

/// Exécute une action à effet de bord
pub async fn run_action(library: &mut Library, player: &PlayerClient, action: &str) -> Result<()> {
    let uuid = env_or_default("uuid");
    let podcast_uuid = env_or_default("podcastUuid");
    let url = env_or_default("url");

    match action {
        "play_next" | "play_last" | "play_now" => {
            let episode = resolve_episode(library, &uuid, &podcast_uuid)
                .await
                .ok_or_else(|| anyhow!("episode {uuid} not found"))?;
            let queue_action = match action {
                "play_next" => QueueAction::PlayNext,
                "play_last" => QueueAction::PlayLast,
                _ => QueueAction::PlayNow,
            };
            library.add_to_queue(&episode, queue_action).await?;
            if queue_action == QueueAction::PlayNow {
                // Meilleur effort : la file distante est déjà à jour
                if let Err(err) = player.play_episode(&episode.url, PlayPosition::Now).await {
                    warn!("Player not driven: {}", err);
                }
            }
        }
        "markAsPlayed" => {
            let episode = episode_identity(&uuid, &podcast_uuid)?;
            library.archive_episode(&episode, true).await?;
        }
        "archive" => {
            let episode = episode_identity(&uuid, &podcast_uuid)?;
            library.archive_episode(&episode, false).await?;
        }
        "remove" => {
            let episode = episode_identity(&uuid, &podcast_uuid)?;
            library.remove_from_queue(std::slice::from_ref(&episode)).await?;
        }
        "sync" => library.sync_playlist(player).await?,
        "replace" => {
            let file = library.export_playlist().await?;
            player.load_playlist(&file, LoadListMode::Replace).await?;
        }
        "insert-next-play" => {
            let file = library.export_playlist().await?;
            player.load_playlist(&file, LoadListMode::Append).await?;
        }
        "play" => player.play_episode(&url, PlayPosition::Now).await?,
        "playPause" => player.toggle_pause().await?,
        "30Back" => player.seek(-30).await?,
        "next" => player.playlist_next().await?,
        "subscribe" => {
            let mut podcast = Podcast::with_uuid(podcast_uuid.clone());
            podcast.feed_url = url;
            library.subscribe(&mut podcast).await?;
        }
        "unsubscribe" => {
            let podcast = Podcast::with_uuid(podcast_uuid.clone());
            library.unsubscribe(&podcast).await?;
        }
        other => warn!("Unknown action: {}", other),
    }
    Ok(())
}

/// Exécute un trigger et rend la liste de résultats sur stdout
pub async fn run_trigger(library: &mut Library, trigger: &str) -> Result<()> {
    match trigger {
        "podcasts" => match library.get_all_podcasts(false).await {
            Ok(()) => {
                let mut podcasts: Vec<Podcast> = library
                    .podcasts()
                    .values()
                    .map(|p| {
                        // Les maps d'épisodes n'ont rien à faire dans la liste
                        let mut p = p.clone();
                        p.episode_map.clear();
                        p
                    })
                    .collect();
                podcasts.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
                print_json(&podcasts)
            }
            Err(err) => print_json(&ErrorView {
                error: err.to_string(),
            }),
        },
        "episodes" => {
            let mut podcast = Podcast::with_uuid(env_or_default("podcastUuid"));
            podcast.name = env_or_default("podcast");
            match library.get_podcast_episodes(podcast, false).await {
                Ok(podcast) => {
                    let mut episodes: Vec<Episode> =
                        podcast.episode_map.values().cloned().collect();
                    episodes.sort_by(|a, b| b.date.cmp(&a.date));
                    episodes.truncate(EPISODE_LIST_LIMIT);
                    cache_notes(library, &episodes);
                    print_json(&episodes)
                }
                Err(err) => print_json(&ErrorView {
                    error: err.to_string(),
                }),
            }
        }
        "queue" => match library.get_up_next(false).await {
            Ok(mut episodes) => {
                enrich_all(library, &mut episodes).await;
                let (count, remaining_seconds) = queue_summary(&episodes);
                print_json(&QueueView {
                    episodes,
                    count,
                    remaining_seconds,
                })
            }
            Err(err) => print_json(&ErrorView {
                error: err.to_string(),
            }),
        },
        "latest" | "history" => {
            let kind = if trigger == "latest" {
                ListKind::NewReleases
            } else {
                ListKind::History
            };
            match library.get_list(kind, false).await {
                Ok(mut episodes) => {
                    enrich_all(library, &mut episodes).await;
                    print_json(&episodes)
                }
                Err(err) => print_json(&ErrorView {
                    error: err.to_string(),
                }),
            }
        }
        "search" => match library.search(&env_or_default("query")).await {
            Ok(podcasts) => print_json(&podcasts),
            Err(err) => print_json(&ErrorView {
                error: err.to_string(),
            }),
        },
        "playing" => {
            let query = EpisodeQuery {
                title: Some(env_or_default("title")).filter(|s| !s.is_empty()),
                podcast: Some(env_or_default("podcast")).filter(|s| !s.is_empty()),
                author: Some(env_or_default("author")).filter(|s| !s.is_empty()),
                url: None,
            };
            match library.find_episode(&query).await {
                Some(episode) => print_json(&episode),
                None => print_json(&ErrorView {
                    error: "no episode playing".to_string(),
                }),
            }
        }
        other => {
            warn!("Unknown trigger: {}", other);
            Ok(())
        }
    }
}

/// Identité minimale d'un épisode depuis les variables d'environnement
fn episode_identity(uuid: &str, podcast_uuid: &str) -> Result<Episode> {
    if uuid.is_empty() || podcast_uuid.is_empty() {
        return Err(anyhow!("episode identity missing (uuid/podcastUuid)"));
    }
    Ok(Episode {
        uuid: uuid.to_string(),
        podcast_uuid: podcast_uuid.to_string(),
        ..Default::default()
    })
}

/// Retrouve un épisode complet dans les collections cachées
///
/// La file est la source la plus probable ; sinon la liste d'épisodes du
/// podcast, puis les listes transversales.
async fn resolve_episode(
    library: &mut Library,
    uuid: &str,
    podcast_uuid: &str,
) -> Option<Episode> {
    if uuid.is_empty() {
        return None;
    }
    if let Ok(queue) = library.get_up_next(false).await {
        if let Some(episode) = queue.into_iter().find(|e| e.uuid == uuid) {
            return Some(episode);
        }
    }
    if !podcast_uuid.is_empty() {
        if let Ok(podcast) = library
            .get_podcast_episodes(Podcast::with_uuid(podcast_uuid), false)
            .await
        {
            if let Some(episode) = podcast.episode_map.get(uuid) {
                return Some(episode.clone());
            }
        }
    }
    for kind in [ListKind::NewReleases, ListKind::History] {
        if let Ok(list) = library.get_list(kind, false).await {
            if let Some(episode) = list.into_iter().find(|e| e.uuid == uuid) {
                return Some(episode);
            }
        }
    }
    None
}

/// Complète les champs manquants des épisodes listés et cache leurs
/// show notes pour l'aperçu
async fn enrich_all(library: &mut Library, episodes: &mut [Episode]) {
    for episode in episodes.iter_mut() {
        if let Err(err) = library.enrich_episode(episode).await {
            warn!("Could not backfill {}: {}", episode.uuid, err);
        }
    }
    cache_notes(library, episodes);
}

fn cache_notes(library: &Library, episodes: &[Episode]) {
    for episode in episodes {
        if let Err(err) = cache_show_notes(library.store(), episode) {
            warn!("Could not cache show notes for {}: {}", episode.uuid, err);
        }
    }
}
