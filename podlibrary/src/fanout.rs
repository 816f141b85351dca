//! Fan-out concurrent borné
//!
//! Exécute un travail par entité, en parallèle, plafonné à un nombre fixe
//! de workers simultanés pour ne pas saturer le service distant. Les
//! échecs individuels sont collectés sans annuler le travail des autres
//! entités ; le succès partiel est l'issue normale quand certains flux
//! sont injoignables. Le retour est une barrière : chaque entité a été
//! tentée exactement une fois quand la fonction rend la main.

use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Plafond de workers simultanés du fan-out de rafraîchissement
pub const FETCH_CONCURRENCY: usize = 50;

/// Applique `work` à chaque entité, au plus `limit` en parallèle
///
/// # Returns
///
/// Un résultat par entité (ordre d'achèvement, pas ordre d'entrée) ;
/// les erreurs individuelles y figurent au lieu d'interrompre le lot.
pub async fn for_each_bounded<T, R, F, Fut>(
    items: Vec<T>,
    limit: usize,
    work: F,
) -> Vec<Result<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut tasks = JoinSet::new();
    for item in items {
        let semaphore = semaphore.clone();
        let fut = work(item);
        tasks.spawn(async move {
            // Le futur n'avance pas avant d'avoir son permit
            let _permit = semaphore.acquire_owned().await.ok();
            fut.await
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => warn!("Fan-out worker panicked: {}", err),
        }
    }
    results
}
