//! Export de playlist et réconciliation avec le lecteur externe
//!
//! Trois sources de vérité coexistent : la file "up next" distante, la
//! playlist réellement chargée dans le lecteur (vérité terrain sur ce qui
//! va jouer), et les épisodes locaux enrichis. L'export sérialise la file
//! en fichier m3u consommable par le lecteur ; la synchronisation relit
//! l'état du lecteur et le répercute côté distant : tout ce qui précède
//! strictement l'entrée courante est archivé lu, la position de l'entrée
//! courante est poussée sauf si elle est nulle.

use crate::entities::Episode;
use crate::error::{LibraryError, Result};
use crate::library::{EpisodeQuery, Library};
use podcache::MaxAge;
use podplayer::{PlayerClient, PlaylistItem};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Nom du fichier de playlist exporté, sous le répertoire de cache
pub const PLAYLIST_FILE: &str = "podcast_playlist.m3u";

/// Opération distante décidée par la synchronisation
#[derive(Debug, Clone)]
pub enum SyncOp {
    /// Épisode entièrement écouté : archive avec statut "lu"
    Archive(Episode),
    /// Épisode en cours : pousser la position de reprise
    UpdatePosition(Episode),
}

/// Décide les opérations distantes depuis l'état réconcilié du lecteur
///
/// Une position nulle est traitée comme "aucun progrès significatif" :
/// elle ne produit pas de mise à jour.
pub fn plan_sync(episodes: &[Episode]) -> Vec<SyncOp> {
    episodes
        .iter()
        .filter_map(|episode| {
            if episode.played {
                Some(SyncOp::Archive(episode.clone()))
            } else if episode.played_up_to > 0 {
                Some(SyncOp::UpdatePosition(episode.clone()))
            } else {
                None
            }
        })
        .collect()
}

/// Parcourt la playlist du lecteur et projette les épisodes connus
///
/// Tout ce qui précède strictement l'entrée courante est marqué lu ; le
/// parcours s'arrête à l'entrée courante incluse. Les entrées inconnues
/// de l'export sont ignorées.
///
/// # Returns
///
/// Les épisodes projetés et un booléen indiquant qu'une entrée courante
/// connue a été atteinte (son dernier élément).
pub(crate) fn reconcile_playlist(
    items: Vec<PlaylistItem>,
    known: &HashMap<String, Episode>,
) -> (Vec<Episode>, bool) {
    let mut episodes = Vec::new();
    for item in items {
        let Some(episode) = known.get(&item.filename) else {
            continue;
        };
        let mut episode = episode.clone();
        if item.current {
            episodes.push(episode);
            return (episodes, true);
        }
        episode.played = true;
        episodes.push(episode);
    }
    (episodes, false)
}

impl Library {
    /// Sérialise la file "up next" en fichier m3u pour le lecteur
    ///
    /// Chaque entrée est précédée d'un commentaire `# podcast\ttitre` et
    /// son URL porte la position de reprise en paramètre `t` quand une
    /// position est connue.
    pub async fn export_playlist(&mut self) -> Result<PathBuf> {
        let episodes = self.get_up_next(false).await?;
        let mut lines = Vec::with_capacity(episodes.len() * 2);
        for episode in &episodes {
            lines.push(format!("# {}\t{}", episode.podcast, episode.title));
            lines.push(episode.resume_url()?);
        }
        self.store()
            .write(&[PLAYLIST_FILE], lines.join("\n").as_bytes())?;
        let path = self.store().path(&[PLAYLIST_FILE]);
        info!(episodes = episodes.len(), "Exported playlist to {}", path.display());
        Ok(path)
    }

    /// Relit le fichier de playlist exporté et résout chaque URL en
    /// épisode connu (par titre et podcast)
    pub(crate) async fn read_playlist(&mut self) -> Result<HashMap<String, Episode>> {
        let data = self.store().read(&[PLAYLIST_FILE], MaxAge::Unbounded, None)?;
        let contents = String::from_utf8_lossy(&data).to_string();

        let mut known = HashMap::new();
        let mut pending: Option<(String, String)> = None;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix("# ") {
                pending = comment
                    .split_once('\t')
                    .map(|(podcast, title)| (podcast.to_string(), title.to_string()));
            } else if let Some((podcast, title)) = pending.take() {
                let query = EpisodeQuery {
                    title: Some(title),
                    podcast: Some(podcast),
                    ..Default::default()
                };
                if let Some(episode) = self.find_episode(&query).await {
                    known.insert(line.to_string(), episode);
                } else {
                    debug!("Playlist entry not resolved: {}", line);
                }
            }
        }
        Ok(known)
    }

    /// Lit l'état de lecture réel du lecteur
    ///
    /// La playlist chargée fait foi : les épisodes sont projetés dessus,
    /// tout ce qui précède l'entrée courante est marqué lu, et la position
    /// rapportée par le lecteur est reportée sur l'entrée courante.
    pub async fn playback_state(&mut self, player: &PlayerClient) -> Result<Vec<Episode>> {
        let items = player.playlist().await?;
        let known = self.read_playlist().await?;
        let (mut episodes, has_current) = reconcile_playlist(items, &known);

        if has_current {
            if let Some(current) = episodes.last_mut() {
                if let Ok(position) = player.time_pos().await {
                    current.played_up_to = position as i64;
                }
            }
        }
        Ok(episodes)
    }

    /// Répercute l'état du lecteur sur le service distant
    ///
    /// Les échecs individuels sont accumulés ; les opérations restantes
    /// sont quand même tentées.
    pub async fn sync_playlist(&mut self, player: &PlayerClient) -> Result<()> {
        let episodes = self.playback_state(player).await?;
        let mut failures = Vec::new();
        for op in plan_sync(&episodes) {
            let result = match &op {
                SyncOp::Archive(episode) => self.archive_episode(episode, true).await,
                SyncOp::UpdatePosition(episode) => {
                    self.update_position(episode, episode.played_up_to).await
                }
            };
            if let Err(err) = result {
                let episode = match &op {
                    SyncOp::Archive(e) | SyncOp::UpdatePosition(e) => e,
                };
                failures.push(format!("{}: {}", episode.title, err));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(LibraryError::Sync(failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::tests::test_library;
    use serde_json::json;
    use tempfile::tempdir;

    fn episode(uuid: &str, title: &str, played_up_to: i64) -> Episode {
        Episode {
            uuid: uuid.to_string(),
            title: title.to_string(),
            url: format!("https://x/{uuid}.mp3"),
            podcast: "A Show".to_string(),
            podcast_uuid: "p1".to_string(),
            duration: 3600,
            played_up_to,
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_sync_archives_played_and_updates_current() {
        let mut finished = episode("e1", "Done", 3600);
        finished.played = true;
        let current = episode("e2", "Current", 500);
        let untouched = episode("e3", "Fresh", 0);

        let ops = plan_sync(&[finished, current, untouched]);
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], SyncOp::Archive(e) if e.uuid == "e1"));
        assert!(matches!(&ops[1], SyncOp::UpdatePosition(e) if e.uuid == "e2"));
    }

    #[test]
    fn test_plan_sync_skips_zero_position_current() {
        // Position nulle : aucun progrès significatif, pas d'appel
        let current = episode("e1", "Current", 0);
        assert!(plan_sync(&[current]).is_empty());
    }

    #[test]
    fn test_reconcile_marks_everything_before_current() {
        let known: HashMap<String, Episode> = [
            ("https://x/e1.mp3".to_string(), episode("e1", "One", 0)),
            ("https://x/e2.mp3".to_string(), episode("e2", "Two", 0)),
            ("https://x/e3.mp3".to_string(), episode("e3", "Three", 0)),
        ]
        .into();
        let items: Vec<PlaylistItem> = serde_json::from_value(json!([
            {"filename": "https://x/e1.mp3"},
            {"filename": "https://unknown/skip.mp3"},
            {"filename": "https://x/e2.mp3", "current": true},
            {"filename": "https://x/e3.mp3"}
        ]))
        .unwrap();

        let (episodes, has_current) = reconcile_playlist(items, &known);
        assert!(has_current);
        // Le parcours s'arrête à l'entrée courante incluse
        assert_eq!(episodes.len(), 2);
        assert!(episodes[0].played);
        assert_eq!(episodes[1].uuid, "e2");
        assert!(!episodes[1].played);
    }

    #[test]
    fn test_reconcile_without_current_marks_all_played() {
        let known: HashMap<String, Episode> =
            [("https://x/e1.mp3".to_string(), episode("e1", "One", 0))].into();
        let items: Vec<PlaylistItem> =
            serde_json::from_value(json!([{"filename": "https://x/e1.mp3"}])).unwrap();

        let (episodes, has_current) = reconcile_playlist(items, &known);
        assert!(!has_current);
        assert!(episodes[0].played);
    }

    #[tokio::test]
    async fn test_export_playlist_annotates_resume_position() -> Result<()> {
        let server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        let mut library = test_library(&server, &dir);
        let queue = vec![episode("e1", "Ep 1", 123), episode("e2", "Ep 2", 0)];
        library.store().save(&["up_next"], &queue)?;

        let path = library.export_playlist().await?;
        let contents = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines[0], "# A Show\tEp 1");
        assert!(lines[1].contains("t=123"));
        assert_eq!(lines[2], "# A Show\tEp 2");
        // Pas de position connue : URL inchangée
        assert_eq!(lines[3], "https://x/e2.mp3");
        Ok(())
    }

    #[tokio::test]
    async fn test_read_playlist_resolves_episodes_from_queue() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();

        // La résolution par nom de podcast échoue (liste vide) et retombe
        // sur la file "up next"
        server
            .mock("POST", "/user/podcast/list")
            .with_body(json!({"podcasts": []}).to_string())
            .create_async()
            .await;

        let mut library = test_library(&server, &dir);
        let queue = vec![episode("e1", "Ep 1", 123)];
        library.store().save(&["up_next"], &queue)?;
        library.export_playlist().await?;

        let known = library.read_playlist().await?;
        assert_eq!(known.len(), 1);
        let (url, resolved) = known.iter().next().unwrap();
        assert!(url.contains("t=123"));
        assert_eq!(resolved.uuid, "e1");
        Ok(())
    }
}
