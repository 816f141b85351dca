//! Cache disque des show notes, avec nettoyage minimal du HTML
//!
//! Les show notes arrivent avec des styles inline qui rendent mal dans le
//! panneau d'aperçu du launcher : les couleurs forcées sont retirées, les
//! balises `<audio>` supprimées, les sauts de ligne convertis, et
//! l'image de l'épisode est annexée. Le résultat est caché sous
//! `shownotes/<podcast>.<épisode>.md` et balayé après 60 jours.

use crate::entities::Episode;
use crate::error::Result;
use lazy_static::lazy_static;
use podcache::CacheStore;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;

/// Âge au-delà duquel les show notes cachées sont balayées
pub const SHOWNOTES_MAX_AGE: Duration = Duration::from_secs(60 * 24 * 3600);

lazy_static! {
    static ref BACKGROUND_COLOR: Regex =
        Regex::new(r#"(<(p|span) [^>]*style="[^"]*)background-color:.+?; ?"#)
            .expect("valid regex");
    static ref TEXT_COLOR: Regex =
        Regex::new(r#"(<(p|span) [^>]*style=("[^"]+[^-]|"))color:.+?; ?"#).expect("valid regex");
    static ref AUDIO_TAG: Regex =
        Regex::new(r"<audio[^>]*(>[\s\S]*?</audio|/)>").expect("valid regex");
}

/// Nettoie le HTML des show notes pour l'aperçu
pub fn clean_show_notes(notes: &str, image: &str) -> String {
    let cleaned = BACKGROUND_COLOR.replace_all(notes, "${1}");
    let cleaned = TEXT_COLOR.replace_all(&cleaned, "${1}");
    let cleaned = AUDIO_TAG.replace_all(&cleaned, "");
    let mut cleaned = cleaned.replace('\n', "<br/>");
    if !image.is_empty() {
        cleaned.push_str(&format!("\n\n<img width=\"20%\" src=\"{image}\"/>"));
    }
    cleaned
}

/// Cache les show notes nettoyées d'un épisode et retourne le chemin
///
/// Une entrée déjà présente est réutilisée telle quelle ; un épisode sans
/// show notes ne produit rien.
pub fn cache_show_notes(store: &CacheStore, episode: &Episode) -> Result<Option<PathBuf>> {
    if episode.podcast_uuid.is_empty() || episode.uuid.is_empty() {
        return Ok(None);
    }
    let name = format!("{}.{}.md", episode.podcast_uuid, episode.uuid);
    let path = store.path(&["shownotes", &name]);
    if path.exists() {
        return Ok(Some(path));
    }
    if episode.show_notes.is_empty() {
        return Ok(None);
    }
    let cleaned = clean_show_notes(&episode.show_notes, &episode.image);
    store.write(&["shownotes", &name], cleaned.as_bytes())?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use podcache::NoSpawner;
    use tempfile::tempdir;

    #[test]
    fn test_background_color_is_stripped() {
        let notes = r#"<p style="background-color:#fff; font-size:12px">Hi</p>"#;
        let cleaned = clean_show_notes(notes, "");
        assert_eq!(cleaned, r#"<p style="font-size:12px">Hi</p>"#);
    }

    #[test]
    fn test_text_color_is_stripped() {
        let notes = r#"<span style="color:#000; ">Hi</span>"#;
        let cleaned = clean_show_notes(notes, "");
        assert_eq!(cleaned, r#"<span style="">Hi</span>"#);
    }

    #[test]
    fn test_audio_tags_are_removed() {
        let notes = "<p>Before</p><audio controls src=\"x.mp3\">fallback</audio><p>After</p>";
        let cleaned = clean_show_notes(notes, "");
        assert_eq!(cleaned, "<p>Before</p><p>After</p>");

        let self_closing = "<p>A</p><audio src=\"x.mp3\"/><p>B</p>";
        assert_eq!(clean_show_notes(self_closing, ""), "<p>A</p><p>B</p>");
    }

    #[test]
    fn test_newlines_become_breaks_and_image_is_appended() {
        let cleaned = clean_show_notes("line one\nline two", "https://img.example/e.webp");
        assert!(cleaned.starts_with("line one<br/>line two"));
        assert!(cleaned.ends_with("<img width=\"20%\" src=\"https://img.example/e.webp\"/>"));
    }

    #[test]
    fn test_cache_show_notes_writes_once() -> Result<()> {
        let dir = tempdir().unwrap();
        let store = CacheStore::with_spawner(dir.path(), Box::new(NoSpawner)).unwrap();

        let episode = Episode {
            uuid: "e1".to_string(),
            podcast_uuid: "p1".to_string(),
            show_notes: "<p>Notes</p>".to_string(),
            ..Default::default()
        };
        let path = cache_show_notes(&store, &episode)?.unwrap();
        assert!(path.exists());
        let first = std::fs::read_to_string(&path)?;

        // Une entrée présente est réutilisée, pas réécrite
        let mut changed = episode.clone();
        changed.show_notes = "<p>Other</p>".to_string();
        let again = cache_show_notes(&store, &changed)?.unwrap();
        assert_eq!(again, path);
        assert_eq!(std::fs::read_to_string(&path)?, first);
        Ok(())
    }

    #[test]
    fn test_no_show_notes_no_file() -> Result<()> {
        let dir = tempdir().unwrap();
        let store = CacheStore::with_spawner(dir.path(), Box::new(NoSpawner)).unwrap();

        let episode = Episode {
            uuid: "e1".to_string(),
            podcast_uuid: "p1".to_string(),
            ..Default::default()
        };
        assert!(cache_show_notes(&store, &episode)?.is_none());
        Ok(())
    }
}
