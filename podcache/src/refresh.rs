//! Cibles de rafraîchissement et spawn de workers détachés
//!
//! Chaque collection cachée correspond à une [`RefreshTarget`]. Quand une
//! lecture constate qu'une entrée est périmée, le store tente d'acquérir le
//! lock de la cible puis re-invoque le programme en processus détaché, avec
//! la cible passée en variables d'environnement. Le worker recharge la
//! collection et supprime le lock en sortant.

use std::env;
use std::process::{Command, Stdio};

/// Variable d'environnement identifiant la cible du worker
pub const ENV_REFRESH: &str = "refresh";
/// Variable d'environnement portant l'UUID du podcast à rafraîchir
pub const ENV_PODCAST_UUID: &str = "podcastUuid";

/// Cible d'un rafraîchissement en arrière-plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTarget {
    /// La liste d'épisodes d'un podcast, identifié par son UUID
    Podcast(String),
    /// La liste des podcasts abonnés et les épisodes de chacun
    AllPodcasts,
    /// La file de lecture "up next"
    UpNext,
    /// Les dernières sorties
    NewReleases,
    /// L'historique de lecture
    History,
}

impl RefreshTarget {
    /// Nom de la cible, tel que passé dans la variable `refresh`
    pub fn name(&self) -> &'static str {
        match self {
            RefreshTarget::Podcast(_) => "podcast",
            RefreshTarget::AllPodcasts => "allPodcasts",
            RefreshTarget::UpNext => "up_next",
            RefreshTarget::NewReleases => "new_releases",
            RefreshTarget::History => "history",
        }
    }

    /// UUID du podcast pour une cible `Podcast`, None sinon
    pub fn podcast_uuid(&self) -> Option<&str> {
        match self {
            RefreshTarget::Podcast(uuid) => Some(uuid),
            _ => None,
        }
    }

    /// Segments du chemin du fichier de lock de cette cible
    ///
    /// Les podcasts sont lockés individuellement (`podcasts/<uuid>.lock`),
    /// les collections globales à la racine du cache (`<nom>.lock`).
    pub(crate) fn lock_parts(&self) -> Vec<String> {
        match self {
            RefreshTarget::Podcast(uuid) => {
                vec!["podcasts".to_string(), format!("{uuid}.lock")]
            }
            other => vec![format!("{}.lock", other.name())],
        }
    }

    /// Reconstruit une cible depuis une paire nom / UUID
    pub fn from_name(name: &str, podcast_uuid: Option<String>) -> Option<Self> {
        match name {
            "podcast" => podcast_uuid
                .filter(|uuid| !uuid.is_empty())
                .map(RefreshTarget::Podcast),
            "allPodcasts" => Some(RefreshTarget::AllPodcasts),
            "up_next" => Some(RefreshTarget::UpNext),
            "new_releases" => Some(RefreshTarget::NewReleases),
            "history" => Some(RefreshTarget::History),
            _ => None,
        }
    }

    /// Lit la cible depuis l'environnement du processus
    ///
    /// Retourne None si le processus n'a pas été invoqué comme worker.
    pub fn from_env() -> Option<Self> {
        let name = env::var(ENV_REFRESH).ok().filter(|s| !s.is_empty())?;
        Self::from_name(&name, env::var(ENV_PODCAST_UUID).ok())
    }
}

/// Capacité de spawn d'un worker de rafraîchissement détaché
///
/// Abstraite pour que les tests puissent observer les déclenchements sans
/// lancer de processus réel.
pub trait WorkerSpawner: Send + Sync {
    /// Lance le worker chargé de re-peupler la cible
    fn spawn_worker(&self, target: &RefreshTarget) -> std::io::Result<()>;
}

/// Spawner de production : re-invoque le binaire courant, détaché
///
/// Le worker reçoit la cible via `refresh` (et `podcastUuid` pour un
/// podcast individuel). Il est placé dans sa propre session pour survivre
/// à la sortie du parent.
pub struct SelfSpawner;

impl WorkerSpawner for SelfSpawner {
    fn spawn_worker(&self, target: &RefreshTarget) -> std::io::Result<()> {
        let exe = env::current_exe()?;
        let mut cmd = Command::new(exe);
        cmd.env(ENV_REFRESH, target.name())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(uuid) = target.podcast_uuid() {
            cmd.env(ENV_PODCAST_UUID, uuid);
        }
        detach(&mut cmd);
        cmd.spawn().map(|_| ())
    }
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn detach(_cmd: &mut Command) {}

/// Spawner inerte : le lock est posé mais aucun worker n'est lancé
pub struct NoSpawner;

impl WorkerSpawner for NoSpawner {
    fn spawn_worker(&self, _target: &RefreshTarget) -> std::io::Result<()> {
        Ok(())
    }
}
