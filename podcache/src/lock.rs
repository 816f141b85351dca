//! Locks consultatifs single-flight
//!
//! Un lock est un fichier marqueur vide créé avec la sémantique
//! création-exclusive : parmi plusieurs processus en course sur la même
//! cible, exactement un gagne. Le worker qui finit (succès ou échec)
//! supprime le fichier via un [`LockGuard`].
//!
//! Un lock laissé par un worker tué avant son nettoyage bloquerait la
//! cible indéfiniment ; un lock plus vieux que [`LOCK_EXPIRY`] est donc
//! considéré abandonné, supprimé, et la création est retentée une fois.

use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Âge au-delà duquel un lock est considéré abandonné
pub const LOCK_EXPIRY: Duration = Duration::from_secs(600);

/// Tente la création exclusive du fichier de lock
///
/// # Returns
///
/// * `Ok(true)` - le lock a été acquis par cet appel
/// * `Ok(false)` - un autre rafraîchissement est en cours
/// * `Err(_)` - faute d'entrée/sortie (autre que "existe déjà"),
///   signe d'un problème de système de fichiers
pub(crate) fn try_acquire(path: &Path, expiry: Duration) -> Result<bool> {
    match create_exclusive(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            if lock_age(path).is_some_and(|age| age > expiry) {
                warn!(lock = %path.display(), "Removing expired refresh lock");
                let _ = fs::remove_file(path);
                match create_exclusive(path) {
                    Ok(()) => Ok(true),
                    Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
                    Err(err) => Err(err.into()),
                }
            } else {
                debug!(lock = %path.display(), "Refresh already in flight");
                Ok(false)
            }
        }
        Err(err) => Err(err.into()),
    }
}

fn create_exclusive(path: &Path) -> std::io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(|_| ())
}

fn lock_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

/// Garde de lock côté worker
///
/// Le processus déclencheur crée le fichier de lock puis spawne le worker ;
/// le worker adopte le lock et le supprime à sa sortie, quel que soit le
/// chemin de sortie.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Adopte un lock existant créé par le processus déclencheur
    pub fn adopt(path: PathBuf) -> Self {
        Self { path }
    }

    /// Chemin du fichier de lock
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                warn!(lock = %self.path.display(), "Failed to remove refresh lock: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_then_held() -> Result<()> {
        let dir = tempdir().unwrap();
        let lock = dir.path().join("up_next.lock");

        assert!(try_acquire(&lock, LOCK_EXPIRY)?);
        // Deuxième tentative : le lock est déjà tenu
        assert!(!try_acquire(&lock, LOCK_EXPIRY)?);
        Ok(())
    }

    #[test]
    fn test_expired_lock_is_reclaimed() -> Result<()> {
        let dir = tempdir().unwrap();
        let lock = dir.path().join("history.lock");

        assert!(try_acquire(&lock, LOCK_EXPIRY)?);
        std::thread::sleep(Duration::from_millis(20));

        // Avec une expiration nulle, le lock existant est considéré
        // abandonné et la création est retentée
        assert!(try_acquire(&lock, Duration::ZERO)?);
        assert!(lock.exists());
        Ok(())
    }

    #[test]
    fn test_guard_removes_lock_on_drop() -> Result<()> {
        let dir = tempdir().unwrap();
        let lock = dir.path().join("new_releases.lock");

        assert!(try_acquire(&lock, LOCK_EXPIRY)?);
        {
            let _guard = LockGuard::adopt(lock.clone());
        }
        assert!(!lock.exists());

        // Le lock libéré peut être réacquis
        assert!(try_acquire(&lock, LOCK_EXPIRY)?);
        Ok(())
    }
}
