//! Contexte applicatif et résolveurs de collections
//!
//! La [`Library`] est construite explicitement une fois par invocation du
//! processus et jetée à sa sortie ; rien n'est global. Chaque collection
//! nommée (liste des podcasts, épisodes par podcast, file "up next",
//! dernières sorties, historique, résultats de recherche) a son résolveur
//! "get-or-refresh" : lecture du cache avec le budget de fraîcheur de la
//! collection, sinon fetch distant synchrone, transformation en entités
//! locales et écriture du cache.

use crate::entities::{artwork_url, Episode, Podcast};
use crate::error::{LibraryError, Result};
use crate::{artwork, fanout};
use podcache::{CacheStore, MaxAge, RefreshTarget};
use podpocket::models::UpNextResponse;
use podpocket::PocketApi;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Liste transversale d'épisodes cachée sous son propre fichier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    NewReleases,
    History,
}

impl ListKind {
    /// Nom de la collection, aussi segment d'endpoint et clé de cache
    pub fn name(&self) -> &'static str {
        match self {
            ListKind::NewReleases => "new_releases",
            ListKind::History => "history",
        }
    }

    fn target(&self) -> RefreshTarget {
        match self {
            ListKind::NewReleases => RefreshTarget::NewReleases,
            ListKind::History => RefreshTarget::History,
        }
    }
}

/// Critères de recherche d'un épisode connu localement
#[derive(Debug, Default, Clone)]
pub struct EpisodeQuery {
    pub url: Option<String>,
    pub title: Option<String>,
    /// Nom du podcast propriétaire
    pub podcast: Option<String>,
    pub author: Option<String>,
}

/// Contexte applicatif : caches en mémoire, store disque et client distant
pub struct Library {
    store: Arc<CacheStore>,
    api: Arc<PocketApi>,
    /// Client HTTP du téléchargement d'artworks
    http: reqwest::Client,
    podcasts: HashMap<String, Podcast>,
    up_next: Vec<Episode>,
}

impl Library {
    /// Construit le contexte d'une invocation
    pub fn new(store: Arc<CacheStore>, api: Arc<PocketApi>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(artwork::ARTWORK_TIMEOUT)
            .build()?;
        Ok(Self {
            store,
            api,
            http,
            podcasts: HashMap::new(),
            up_next: Vec::new(),
        })
    }

    /// Podcasts abonnés connus, indexés par UUID
    pub fn podcasts(&self) -> &HashMap<String, Podcast> {
        &self.podcasts
    }

    /// Dernière file "up next" résolue
    pub fn up_next(&self) -> &[Episode] {
        &self.up_next
    }

    /// Vérifie si un podcast fait partie des abonnements chargés
    pub fn is_subscribed(&self, uuid: &str) -> bool {
        self.podcasts.contains_key(uuid)
    }

    /// Store disque partagé du contexte
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub(crate) fn api(&self) -> &PocketApi {
        &self.api
    }

    /// Retire un podcast du cache mémoire (après désabonnement)
    pub(crate) fn remove_podcast(&mut self, uuid: &str) {
        self.podcasts.remove(uuid);
    }

    /// Résout la liste des podcasts abonnés (budget 24 h)
    pub async fn get_podcast_list(&mut self, force: bool) -> Result<()> {
        if !force && !self.podcasts.is_empty() {
            return Ok(());
        }
        self.podcasts = load_podcast_list(&self.api, &self.store, force).await?;
        Ok(())
    }

    /// Résout la liste des podcasts puis rafraîchit les épisodes de
    /// chacun, en parallèle borné, avec mise en cache des artworks
    ///
    /// Les podcasts injoignables sont loggés individuellement sans faire
    /// échouer le lot.
    pub async fn get_all_podcasts(&mut self, force: bool) -> Result<()> {
        self.get_podcast_list(force).await?;

        let podcasts: Vec<Podcast> = self.podcasts.values().cloned().collect();
        let api = self.api.clone();
        let store = self.store.clone();
        let http = self.http.clone();
        let results = fanout::for_each_bounded(podcasts, fanout::FETCH_CONCURRENCY, move |podcast| {
            let api = api.clone();
            let store = store.clone();
            let http = http.clone();
            async move {
                let label = if podcast.name.is_empty() {
                    podcast.uuid.clone()
                } else {
                    podcast.name.clone()
                };
                let refreshed = fetch_podcast(&api, &store, podcast, force)
                    .await
                    .inspect_err(|err| warn!("[{}]: {}", label, err))?;
                // Artwork : meilleur effort, jamais bloquant pour le lot
                if let Err(err) = artwork::cache_artwork(&http, &store, &refreshed).await {
                    debug!("[{}]: artwork not cached: {}", label, err);
                }
                Ok(refreshed)
            }
        })
        .await;

        for podcast in results.into_iter().flatten() {
            self.podcasts.insert(podcast.uuid.clone(), podcast);
        }
        Ok(())
    }

    /// Résout la liste d'épisodes d'un podcast (budget 12 h)
    ///
    /// Le podcast peut arriver avec un simple nom : l'UUID est alors
    /// résolu via la liste des abonnements. Le résultat est aussi inséré
    /// dans le cache mémoire des podcasts.
    pub async fn get_podcast_episodes(&mut self, mut podcast: Podcast, force: bool) -> Result<Podcast> {
        self.resolve_podcast(&mut podcast).await?;
        let refreshed = fetch_podcast(&self.api, &self.store, podcast, force).await?;
        self.podcasts
            .insert(refreshed.uuid.clone(), refreshed.clone());
        Ok(refreshed)
    }

    /// Résout l'UUID d'un podcast identifié par son seul nom
    ///
    /// # Errors
    ///
    /// [`LibraryError::PodcastNotFound`] si le nom n'apparaît pas dans la
    /// liste des abonnements.
    pub async fn resolve_podcast(&mut self, podcast: &mut Podcast) -> Result<()> {
        if !podcast.uuid.is_empty() {
            return Ok(());
        }
        if podcast.name.is_empty() {
            return Err(LibraryError::MissingField("podcast uuid".to_string()));
        }
        self.get_podcast_list(false).await?;
        match self.podcasts.values().find(|p| p.name == podcast.name) {
            Some(known) => {
                podcast.uuid = known.uuid.clone();
                Ok(())
            }
            None => Err(LibraryError::PodcastNotFound(podcast.name.clone())),
        }
    }

    /// Résout la file "up next" (budget 30 min)
    pub async fn get_up_next(&mut self, force: bool) -> Result<Vec<Episode>> {
        let max_age = if force { MaxAge::Force } else { MaxAge::minutes(30) };
        match self
            .store
            .load::<Vec<Episode>>(&["up_next"], max_age, Some(&RefreshTarget::UpNext))
        {
            Ok(episodes) => {
                self.up_next = episodes.clone();
                return Ok(episodes);
            }
            Err(err) if LibraryError::is_cache_miss(&err) => {}
            Err(err) => return Err(err.into()),
        }

        self.get_podcast_list(force).await?;
        let response = self.api.up_next_list().await?;
        self.apply_up_next(response).await
    }

    /// Reconstruit l'état "up next" local depuis une réponse distante
    ///
    /// Les endpoints de file renvoient la file complète résultante ; la
    /// liste locale et le cache sont reconstruits de zéro à chaque fois
    /// pour éviter toute dérive. Les podcasts encore inconnus localement
    /// sont créés squelettiques puis enrichis de leurs métadonnées.
    pub(crate) async fn apply_up_next(&mut self, response: UpNextResponse) -> Result<Vec<Episode>> {
        if self.podcasts.is_empty() {
            // Meilleur effort : les noms de podcasts viennent de la liste
            if let Err(err) = self.get_podcast_list(false).await {
                debug!("Podcast list unavailable while rebuilding queue: {}", err);
            }
        }

        let mut episodes = Vec::with_capacity(response.episodes.len());
        for remote in &response.episodes {
            let podcast_name = self.ensure_podcast(&remote.podcast_uuid, "").await;
            episodes.push(Episode {
                uuid: remote.uuid.clone(),
                title: remote.title.clone(),
                url: remote.url.clone(),
                podcast: podcast_name,
                podcast_uuid: remote.podcast_uuid.clone(),
                date: remote.published,
                image: artwork_url(&remote.podcast_uuid),
                ..Default::default()
            });
        }

        // Les positions de lecture arrivent à part des épisodes
        for sync in &response.episode_sync {
            if let Some(episode) = episodes.iter_mut().find(|e| e.uuid == sync.uuid) {
                episode.played_up_to = sync.played_up_to;
                episode.duration = sync.duration;
            }
        }

        for episode in &episodes {
            if let Some(podcast) = self.podcasts.get_mut(&episode.podcast_uuid) {
                podcast
                    .episode_map
                    .insert(episode.uuid.clone(), episode.clone());
            }
        }

        self.store.save(&["up_next"], &episodes)?;
        self.up_next = episodes.clone();
        Ok(episodes)
    }

    /// Résout une liste transversale d'épisodes (budget 12 h)
    pub async fn get_list(&mut self, kind: ListKind, force: bool) -> Result<Vec<Episode>> {
        let max_age = if force { MaxAge::Force } else { MaxAge::hours(12) };
        match self
            .store
            .load::<Vec<Episode>>(&[kind.name()], max_age, Some(&kind.target()))
        {
            Ok(episodes) => return Ok(episodes),
            Err(err) if LibraryError::is_cache_miss(&err) => {}
            Err(err) => return Err(err.into()),
        }

        self.get_podcast_list(force).await?;
        let response = self.api.episode_list(kind.name()).await?;

        let mut episodes = Vec::with_capacity(response.episodes.len());
        for remote in response.episodes {
            let podcast_name = self.ensure_podcast(&remote.podcast_uuid, &remote.podcast).await;
            let episode = Episode {
                uuid: remote.uuid,
                title: remote.title,
                url: remote.url,
                podcast: podcast_name,
                podcast_uuid: remote.podcast_uuid.clone(),
                date: remote.published,
                duration: remote.duration,
                played_up_to: remote.played_up_to,
                image: artwork_url(&remote.podcast_uuid),
                ..Default::default()
            };
            if let Some(podcast) = self.podcasts.get_mut(&remote.podcast_uuid) {
                podcast
                    .episode_map
                    .insert(episode.uuid.clone(), episode.clone());
            }
            episodes.push(episode);
        }

        self.store.save(&[kind.name()], &episodes)?;
        Ok(episodes)
    }

    /// Complète les champs livrés vides par les listes distantes
    ///
    /// Les entrées de la file et des dernières sorties arrivent sans durée
    /// ni show notes ; elles sont complétées depuis la liste complète
    /// d'épisodes du podcast, sans invalider le cache de la liste externe.
    pub async fn enrich_episode(&mut self, episode: &mut Episode) -> Result<()> {
        if !episode.needs_backfill() || episode.podcast_uuid.is_empty() {
            return Ok(());
        }
        let podcast = self
            .get_podcast_episodes(Podcast::with_uuid(episode.podcast_uuid.clone()), false)
            .await?;
        if let Some(full) = podcast.episode_map.get(&episode.uuid) {
            if episode.duration == 0 {
                episode.duration = full.duration;
            }
            if episode.show_notes.is_empty() {
                episode.show_notes = full.show_notes.clone();
            }
            if episode.date.is_none() {
                episode.date = full.date;
            }
            if !full.image.is_empty() {
                episode.image = full.image.clone();
            }
        }
        Ok(())
    }

    /// Cherche un épisode connu localement par URL ou titre
    ///
    /// Les indices `podcast` puis `author` restreignent la recherche ;
    /// la file "up next" sert de dernier recours. Chercheur best-effort :
    /// les erreurs de résolution sont avalées.
    pub async fn find_episode(&mut self, query: &EpisodeQuery) -> Option<Episode> {
        let url = query.url.as_deref().unwrap_or("");
        let title = query.title.as_deref().unwrap_or("");
        if url.is_empty() && title.is_empty() {
            return None;
        }
        let matches = |e: &Episode| {
            (!url.is_empty() && e.url == url) || (!title.is_empty() && e.title == title)
        };

        if let Some(name) = query.podcast.as_deref().filter(|n| !n.is_empty()) {
            let podcast = Podcast {
                name: name.to_string(),
                ..Default::default()
            };
            if let Ok(podcast) = self.get_podcast_episodes(podcast, false).await {
                if let Some(episode) = podcast.episode_map.values().find(|e| matches(e)) {
                    return Some(episode.clone());
                }
            }
        }

        if let Some(author) = query.author.as_deref().filter(|a| !a.is_empty()) {
            if self.get_all_podcasts(false).await.is_ok() {
                for podcast in self.podcasts.values() {
                    if podcast.author != author {
                        continue;
                    }
                    if let Some(episode) = podcast.episode_map.values().find(|e| matches(e)) {
                        return Some(episode.clone());
                    }
                }
            }
        }

        match self.get_up_next(false).await {
            Ok(episodes) => episodes.into_iter().find(|e| matches(e)),
            Err(err) => {
                debug!("Queue unavailable while locating episode: {}", err);
                None
            }
        }
    }

    /// Recherche de podcasts dans le catalogue distant
    ///
    /// La liste des abonnements (pour marquer les podcasts déjà suivis) et
    /// la recherche elle-même partent en parallèle et sont jointes. Une
    /// requête vide re-sert les derniers résultats, quel que soit leur âge.
    pub async fn search(&mut self, query: &str) -> Result<Vec<Podcast>> {
        let api = self.api.clone();
        let store = self.store.clone();
        let need_list = self.podcasts.is_empty();

        let list_fut = async {
            if need_list {
                load_podcast_list(&api, &store, false).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let search_fut = async {
            if query.is_empty() {
                let cached: Vec<Podcast> =
                    store.load(&["search_results"], MaxAge::Unbounded, None)?;
                Ok(cached)
            } else {
                let response = api.search(query).await?;
                let podcasts: Vec<Podcast> = response
                    .podcasts
                    .into_iter()
                    .map(Podcast::from_search)
                    .collect();
                store.save(&["search_results"], &podcasts)?;
                Ok(podcasts)
            }
        };

        let (list, results) = tokio::join!(list_fut, search_fut);
        if let Some(map) = list? {
            self.podcasts = map;
        }
        results
    }

    /// Garantit qu'un podcast existe dans le cache mémoire et retourne
    /// son nom, en récupérant ses métadonnées s'il est encore squelettique
    async fn ensure_podcast(&mut self, uuid: &str, name_hint: &str) -> String {
        if !self.podcasts.contains_key(uuid) {
            let mut skeleton = Podcast::with_uuid(uuid);
            skeleton.name = name_hint.to_string();
            self.podcasts.insert(uuid.to_string(), skeleton);
        }
        let needs_info = self
            .podcasts
            .get(uuid)
            .is_some_and(|p| p.name.is_empty());
        if needs_info {
            let mut podcast = Podcast::with_uuid(uuid);
            match ensure_podcast_info(&self.api, &self.store, &mut podcast).await {
                Ok(()) => {
                    self.podcasts.insert(uuid.to_string(), podcast);
                }
                // Meilleur effort : un nom vide n'empêche pas la file
                Err(err) => warn!("Failed to resolve podcast {}: {}", uuid, err),
            }
        }
        self.podcasts
            .get(uuid)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }
}

/// Charge la liste des podcasts abonnés, depuis le cache ou le distant
pub(crate) async fn load_podcast_list(
    api: &PocketApi,
    store: &CacheStore,
    force: bool,
) -> Result<HashMap<String, Podcast>> {
    let max_age = if force { MaxAge::Force } else { MaxAge::hours(24) };
    match store.load::<HashMap<String, Podcast>>(
        &["podcast_list"],
        max_age,
        Some(&RefreshTarget::AllPodcasts),
    ) {
        Ok(podcasts) => return Ok(podcasts),
        Err(err) if LibraryError::is_cache_miss(&err) => {}
        Err(err) => return Err(err.into()),
    }

    let response = api.podcast_list().await?;
    let podcasts: HashMap<String, Podcast> = response
        .podcasts
        .into_iter()
        .map(|remote| (remote.uuid.clone(), Podcast::from_remote(remote)))
        .collect();
    store.save(&["podcast_list"], &podcasts)?;
    Ok(podcasts)
}

/// Charge la liste d'épisodes d'un podcast, depuis le cache ou le distant
pub(crate) async fn fetch_podcast(
    api: &PocketApi,
    store: &CacheStore,
    podcast: Podcast,
    force: bool,
) -> Result<Podcast> {
    if podcast.uuid.is_empty() {
        return Err(LibraryError::MissingField("podcast uuid".to_string()));
    }
    let max_age = if force { MaxAge::Force } else { MaxAge::hours(12) };
    let target = RefreshTarget::Podcast(podcast.uuid.clone());
    match store.load::<Podcast>(&["podcasts", &podcast.uuid], max_age, Some(&target)) {
        Ok(cached) => return Ok(cached),
        Err(err) if LibraryError::is_cache_miss(&err) => {}
        Err(err) => return Err(err.into()),
    }
    fetch_podcast_remote(api, store, podcast).await
}

/// Fetch distant d'un podcast : métadonnées+épisodes et show notes en
/// deux appels parallèles joints, puis fusion et écriture du cache
async fn fetch_podcast_remote(
    api: &PocketApi,
    store: &CacheStore,
    mut podcast: Podcast,
) -> Result<Podcast> {
    let uuid = podcast.uuid.clone();
    let (full, notes) = tokio::join!(api.podcast_full(&uuid), api.podcast_show_notes(&uuid));
    let full = full?.podcast;
    let notes = notes?.podcast;

    podcast.name = full.name;
    podcast.author = full.author;
    podcast.desc = full.desc;
    podcast.link = full.link;
    podcast.image = artwork_url(&uuid);
    podcast.episode_map = HashMap::new();

    for remote in full.episodes {
        if let Some(date) = remote.published {
            if podcast.last_updated.is_none_or(|last| date > last) {
                podcast.last_updated = Some(date);
            }
        }
        let episode = Episode {
            uuid: remote.uuid,
            title: remote.title,
            url: remote.url,
            podcast: podcast.name.clone(),
            podcast_uuid: uuid.clone(),
            date: remote.published,
            duration: remote.duration,
            image: podcast.image.clone(),
            ..Default::default()
        };
        podcast.episode_map.insert(episode.uuid.clone(), episode);
    }

    for remote in notes.episodes {
        if let Some(episode) = podcast.episode_map.get_mut(&remote.uuid) {
            episode.show_notes = remote.show_notes;
            if !remote.image.is_empty() {
                episode.image = remote.image;
            }
        }
    }

    store.save(&["podcasts", &uuid], &podcast)?;
    Ok(podcast)
}

/// Garantit les métadonnées d'un podcast référencé par la file
///
/// Les métadonnées sont assez immuables pour que toute entrée cachée
/// convienne ; sans entrée, seules les métadonnées sont récupérées et
/// écrites (la liste d'épisodes viendra d'un vrai fetch d'épisodes).
pub(crate) async fn ensure_podcast_info(
    api: &PocketApi,
    store: &CacheStore,
    podcast: &mut Podcast,
) -> Result<()> {
    if podcast.uuid.is_empty() {
        return Err(LibraryError::MissingField("podcast uuid".to_string()));
    }
    if let Ok(cached) =
        store.load::<Podcast>(&["podcasts", &podcast.uuid], MaxAge::Unbounded, None)
    {
        *podcast = cached;
        return Ok(());
    }

    let full = api.podcast_full(&podcast.uuid).await?.podcast;
    podcast.name = full.name;
    podcast.author = full.author;
    podcast.desc = full.desc;
    podcast.link = full.link;
    podcast.image = artwork_url(&podcast.uuid);
    store.save(&["podcasts", &podcast.uuid], podcast)?;
    Ok(())
}
