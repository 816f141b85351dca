//! # podlibrary - Bibliothèque de podcasts de PodDeck
//!
//! Cette crate est le cœur applicatif : les entités locales, le contexte
//! [`Library`] construit une fois par invocation, les résolveurs
//! "get-or-refresh" des collections cachées, le fan-out concurrent borné
//! qui rafraîchit tous les podcasts abonnés, les mutations de la file
//! distante et la réconciliation avec le lecteur externe.
//!
//! ## Vue d'ensemble
//!
//! Chaque collection (liste des podcasts, épisodes par podcast, file
//! "up next", dernières sorties, historique, résultats de recherche) a
//! son budget de fraîcheur et compose le store disque, le déclencheur de
//! rafraîchissement en arrière-plan et le client distant en une seule
//! opération de résolution. Les entrées livrées incomplètes par les
//! listes distantes (durée, show notes) sont complétées paresseusement
//! depuis la liste d'épisodes du podcast.
//!
//! ## Structure des modules
//!
//! ```text
//! podlibrary/
//! ├── src/
//! │   ├── lib.rs        # Module principal (ce fichier)
//! │   ├── entities.rs   # Podcast, Episode, résumé de file
//! │   ├── library.rs    # Contexte et résolveurs de collections
//! │   ├── fanout.rs     # Fan-out concurrent borné
//! │   ├── queue.rs      # Mutations de file, archive, abonnements
//! │   ├── playlist.rs   # Export m3u et synchronisation du lecteur
//! │   ├── shownotes.rs  # Cache et nettoyage des show notes
//! │   ├── artwork.rs    # Cache des artworks
//! │   └── error.rs      # Gestion des erreurs
//! ```

pub mod artwork;
pub mod entities;
pub mod error;
pub mod fanout;
pub mod library;
pub mod playlist;
pub mod queue;
pub mod shownotes;

pub use entities::{artwork_url, queue_summary, Episode, Podcast};
pub use error::{LibraryError, Result};
pub use library::{EpisodeQuery, Library, ListKind};
pub use playlist::{plan_sync, SyncOp, PLAYLIST_FILE};
pub use shownotes::{cache_show_notes, clean_show_notes, SHOWNOTES_MAX_AGE};
