//! PodDeck : gestionnaire de podcasts intégré au launcher
//!
//! Le programme entier vit le temps d'une action utilisateur : il est
//! invoqué par le launcher (ou re-invoqué par lui-même comme worker de
//! rafraîchissement), répond sur stdout et sort. L'état durable vit dans
//! le répertoire de cache et le fichier de token ; rien ne survit en
//! mémoire entre deux invocations.

mod commands;

use anyhow::Result;
use podcache::{CacheStore, RefreshTarget};
use podlibrary::Library;
use podplayer::PlayerClient;
use podpocket::PocketApi;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // ========== PHASE 1 : Infrastructure ==========

    let config = podconfig::get_config();

    // stdout reste le canal de résultat du launcher : les logs vont sur stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.get_log_min_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = Arc::new(CacheStore::new(config.get_cache_dir()?)?);
    let (email, password) = config.get_credentials().unwrap_or_default();
    let api = Arc::new(PocketApi::new(config.get_token_path(), email, password)?);
    let mut library = Library::new(store.clone(), api)?;

    // ========== PHASE 2 : Worker de rafraîchissement ==========

    if let Some(target) = RefreshTarget::from_env() {
        // Le lock a été créé par le processus déclencheur ; le garde le
        // supprime sur tous les chemins de sortie du worker
        let _lock = store.adopt_lock(&target);
        return commands::run_refresh(&mut library, &store, &target).await;
    }

    // ========== PHASE 3 : Dispatch launcher ==========

    let player = PlayerClient::new(config.get_player_socket());

    let action = env::var("action")
        .or_else(|_| env::var("actionKeep"))
        .unwrap_or_default();
    if !action.is_empty() {
        info!(action, "Dispatching action");
        return commands::run_action(&mut library, &player, &action).await;
    }

    let trigger = env::var("trigger").unwrap_or_default();
    info!(trigger, "Dispatching trigger");
    commands::run_trigger(&mut library, &trigger).await
}
