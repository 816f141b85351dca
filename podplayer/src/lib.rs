//! # podplayer - Contrôle du lecteur externe pour PodDeck
//!
//! Cette crate pilote le lecteur média externe (mpv ou IINA) via son
//! socket IPC local : protocole JSON délimité par lignes, réponses
//! `data`/`error`, vocabulaire de commandes figé. La lecture audio
//! elle-même est entièrement déléguée au lecteur ; PodDeck ne fait que
//! charger des entrées de playlist et lire l'état de lecture.
//!
//! ## Structure des modules
//!
//! ```text
//! podplayer/
//! ├── src/
//! │   ├── lib.rs       # Module principal (ce fichier)
//! │   ├── ipc.rs       # Transport : socket local, commandes brutes
//! │   ├── control.rs   # Vocabulaire typé : propriétés, playlist, transport
//! │   └── error.rs     # Gestion des erreurs
//! ```

pub mod control;
pub mod error;
pub mod ipc;

pub use control::{LoadListMode, PlayPosition, PlaylistItem};
pub use error::{PlayerError, Result};
pub use ipc::PlayerClient;
