//! # podpocket - Client Pocket Casts pour PodDeck
//!
//! Cette crate fournit un client Rust pour l'API Pocket Casts : auth par
//! bearer token persisté sur disque, schémas de réponse typés par
//! endpoint, et retry unique après purge du token sur un 401.
//!
//! ## Vue d'ensemble
//!
//! `podpocket` couvre les endpoints consommés par PodDeck :
//! - Login et persistance du token
//! - Liste des podcasts abonnés, métadonnées complètes, show notes
//! - File "up next" : liste, insertions (`play_next`/`play_last`/
//!   `play_now`), retraits
//! - Dernières sorties et historique
//! - Archive et mise à jour d'état des épisodes
//! - Abonnement/désabonnement, recherche, ajout de flux par URL (avec
//!   polling du parsing asynchrone)
//!
//! ## Structure des modules
//!
//! ```text
//! podpocket/
//! ├── src/
//! │   ├── lib.rs           # Module principal (ce fichier)
//! │   ├── models.rs        # Schémas de réponse typés
//! │   ├── api/
//! │   │   ├── mod.rs       # Plomberie HTTP et auth
//! │   │   ├── auth.rs      # Login et fichier de token
//! │   │   ├── user.rs      # Abonnements, listes, mises à jour
//! │   │   ├── podcast.rs   # Catalogue : métadonnées et show notes
//! │   │   ├── queue.rs     # File "up next"
//! │   │   └── discover.rs  # Recherche et ajout de flux
//! │   └── error.rs         # Gestion des erreurs
//! ```

pub mod api;
pub mod error;
pub mod models;

pub use api::queue::QueueAction;
pub use api::PocketApi;
pub use error::{PocketError, Result};
