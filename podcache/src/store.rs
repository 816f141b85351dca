//! Store disque clé→octets avec péremption par âge
//!
//! Une clé est une séquence de segments de chemin ; chaque segment est
//! échappé indépendamment pour être sûr sur le système de fichiers. La
//! fraîcheur d'une entrée est relative : elle est calculée à la lecture
//! depuis le mtime du fichier, jamais stockée explicitement.
//!
//! Une lecture périmée réussit quand même : la péremption déclenche un
//! rafraîchissement en arrière-plan puis les octets périmés sont retournés
//! à l'appelant. Seule l'absence du fichier (ou la sentinelle `Force`)
//! constitue un miss.

use crate::error::{CacheError, Result};
use crate::lock::{self, LockGuard, LOCK_EXPIRY};
use crate::refresh::{RefreshTarget, SelfSpawner, WorkerSpawner};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Sous-répertoires du cache, créés à l'ouverture
const CACHE_SUBDIRS: &[&str] = &["podcasts", "artworks", "shownotes"];

/// Budget de fraîcheur d'une lecture de cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAge {
    /// Sentinelle "toujours périmé" : la lecture échoue sans consulter
    /// le disque, l'appelant refetch synchrone
    Force,
    /// Sentinelle "tout âge accepté" : la lecture réussit dès que le
    /// fichier existe
    Unbounded,
    /// Budget explicite : au-delà, l'entrée est servie périmée et un
    /// rafraîchissement est déclenché
    Limit(Duration),
}

impl MaxAge {
    /// Budget exprimé en heures
    pub fn hours(h: u64) -> Self {
        MaxAge::Limit(Duration::from_secs(h * 3600))
    }

    /// Budget exprimé en minutes
    pub fn minutes(m: u64) -> Self {
        MaxAge::Limit(Duration::from_secs(m * 60))
    }
}

/// Store disque partagé par tous les composants de PodDeck
///
/// Le répertoire de cache est partagé entre processus concurrents ; la
/// seule exclusion mutuelle est le lock consultatif par cible de
/// rafraîchissement.
pub struct CacheStore {
    cache_dir: PathBuf,
    spawner: Box<dyn WorkerSpawner>,
    lock_expiry: Duration,
}

impl CacheStore {
    /// Ouvre le store et crée l'arborescence de cache si nécessaire
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        Self::with_spawner(cache_dir, Box::new(SelfSpawner))
    }

    /// Ouvre le store avec un spawner de workers spécifique
    pub fn with_spawner<P: AsRef<Path>>(
        cache_dir: P,
        spawner: Box<dyn WorkerSpawner>,
    ) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        for subdir in CACHE_SUBDIRS {
            let dir = cache_dir.join(subdir);
            if !dir.exists() {
                fs::create_dir_all(&dir)?;
                info!("Created cache directory: {}", dir.display());
            }
        }
        Ok(Self {
            cache_dir,
            spawner,
            lock_expiry: LOCK_EXPIRY,
        })
    }

    /// Répertoire racine du cache
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Construit le chemin d'une entrée de cache
    ///
    /// Chaque segment est échappé : `/` devient `%2F` et `:` devient `%3A`,
    /// si bien qu'une URL ou un titre peut servir de segment.
    pub fn path(&self, parts: &[&str]) -> PathBuf {
        let mut path = self.cache_dir.clone();
        for part in parts {
            path.push(escape_part(part));
        }
        path
    }

    /// Lit une entrée de cache
    ///
    /// # Arguments
    ///
    /// * `parts` - Segments de la clé (ex: `&["podcasts", uuid]`)
    /// * `max_age` - Budget de fraîcheur de la collection
    /// * `refresh` - Cible à rafraîchir en arrière-plan si l'entrée est
    ///   périmée ; None pour une lecture sans réparation
    ///
    /// # Errors
    ///
    /// * [`CacheError::ForceRefresh`] - `max_age` est la sentinelle `Force`
    /// * [`CacheError::NotFound`] - le fichier n'existe pas
    /// * [`CacheError::Io`] - faute du système de fichiers, y compris à la
    ///   création du lock de rafraîchissement
    pub fn read(
        &self,
        parts: &[&str],
        max_age: MaxAge,
        refresh: Option<&RefreshTarget>,
    ) -> Result<Vec<u8>> {
        let limit = match max_age {
            MaxAge::Force => return Err(CacheError::ForceRefresh),
            MaxAge::Unbounded => None,
            MaxAge::Limit(limit) => Some(limit),
        };

        let path = self.path(parts);
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound);
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(limit) = limit {
            let age = metadata
                .modified()
                .ok()
                .and_then(|m| SystemTime::now().duration_since(m).ok())
                .unwrap_or(Duration::MAX);
            if age > limit {
                debug!(
                    "Cache stale (age: {}s > budget: {}s): {}",
                    age.as_secs(),
                    limit.as_secs(),
                    path.display()
                );
                // Servi périmé : la réparation part en arrière-plan,
                // la lecture elle-même n'échoue pas
                if let Some(target) = refresh {
                    self.trigger_refresh(target)?;
                }
            }
        }

        Ok(fs::read(&path)?)
    }

    /// Écrit une entrée de cache (remplacement du fichier entier)
    pub fn write(&self, parts: &[&str], data: &[u8]) -> Result<()> {
        let path = self.path(parts);
        fs::write(&path, data)?;
        debug!("Saved cache to {}", path.display());
        Ok(())
    }

    /// Lit et désérialise une entrée de cache JSON
    pub fn load<T: DeserializeOwned>(
        &self,
        parts: &[&str],
        max_age: MaxAge,
        refresh: Option<&RefreshTarget>,
    ) -> Result<T> {
        let data = self.read(parts, max_age, refresh)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Sérialise et écrit une entrée de cache JSON
    pub fn save<T: Serialize>(&self, parts: &[&str], data: &T) -> Result<()> {
        let json = serde_json::to_vec(data)?;
        self.write(parts, &json)
    }

    /// Déclenche un rafraîchissement en arrière-plan de la cible
    ///
    /// Single-flight : si le lock de la cible est déjà tenu, un autre
    /// rafraîchissement est en cours et l'appel ne fait rien. Sinon le
    /// lock est créé puis un worker détaché est spawné ; le worker
    /// supprime le lock en terminant.
    ///
    /// # Errors
    ///
    /// Une faute du système de fichiers à la création du lock (autre que
    /// "existe déjà") remonte à l'appelant.
    pub fn trigger_refresh(&self, target: &RefreshTarget) -> Result<()> {
        let lock_path = self.lock_path(target);
        if !lock::try_acquire(&lock_path, self.lock_expiry)? {
            return Ok(());
        }
        info!(target = target.name(), "Spawning background refresh worker");
        if let Err(err) = self.spawner.spawn_worker(target) {
            // Le worker n'existera jamais : libérer le lock tout de suite
            let _ = fs::remove_file(&lock_path);
            return Err(err.into());
        }
        Ok(())
    }

    /// Chemin du fichier de lock d'une cible
    pub fn lock_path(&self, target: &RefreshTarget) -> PathBuf {
        let parts = target.lock_parts();
        let parts: Vec<&str> = parts.iter().map(|p| p.as_str()).collect();
        self.path(&parts)
    }

    /// Adopte le lock d'une cible côté worker
    ///
    /// Le garde supprime le fichier de lock quand il est droppé, sur tous
    /// les chemins de sortie du worker.
    pub fn adopt_lock(&self, target: &RefreshTarget) -> LockGuard {
        LockGuard::adopt(self.lock_path(target))
    }

    /// Supprime tous les fichiers de cache appartenant à un podcast
    ///
    /// Utilisé au désabonnement : l'entrée épisodes, l'artwork et les
    /// show notes portent tous l'UUID du podcast en préfixe de nom.
    pub fn clear_podcast(&self, uuid: &str) -> Result<usize> {
        if uuid.is_empty() {
            return Ok(0);
        }
        let mut removed = 0;
        let mut dirs = vec![self.cache_dir.clone()];
        for subdir in CACHE_SUBDIRS {
            dirs.push(self.cache_dir.join(subdir));
        }
        for dir in dirs {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let name = entry.file_name();
                if name.to_string_lossy().starts_with(uuid) {
                    fs::remove_file(entry.path())?;
                    removed += 1;
                }
            }
        }
        info!(uuid, removed, "Cleared podcast cache files");
        Ok(removed)
    }

    /// Supprime les show notes plus vieilles que `max_age`
    ///
    /// Balayage périodique lancé par le worker `allPodcasts`.
    pub fn sweep_shownotes(&self, max_age: Duration) -> Result<usize> {
        let dir = self.cache_dir.join("shownotes");
        let mut removed = 0;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let age = entry
                .metadata()?
                .modified()
                .ok()
                .and_then(|m| SystemTime::now().duration_since(m).ok())
                .unwrap_or(Duration::ZERO);
            if age > max_age {
                if let Err(err) = fs::remove_file(entry.path()) {
                    warn!("Failed to sweep {}: {}", entry.path().display(), err);
                } else {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            info!(removed, "Swept old show note files");
        }
        Ok(removed)
    }
}

/// Échappe un segment de clé pour le système de fichiers
fn escape_part(part: &str) -> String {
    part.replace('/', "%2F").replace(':', "%3A")
}
