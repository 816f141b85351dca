//! # PodDeck Configuration Module
//!
//! Ce module gère la configuration de PodDeck :
//! - Chargement depuis un fichier YAML
//! - Merge avec la configuration par défaut intégrée
//! - Surcharge par variables d'environnement
//! - Getters typés pour les valeurs utilisées par les autres crates
//! - Singleton thread-safe
//!
//! ## Usage
//!
//! ```no_run
//! use podconfig::get_config;
//!
//! let config = get_config();
//! let cache_dir = config.get_cache_dir()?;
//! let socket = config.get_player_socket();
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("poddeck.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PodDeck configuration"));
}

const ENV_CONFIG_DIR: &str = "PODDECK_CONFIG";
const ENV_PREFIX: &str = "PODDECK_CONFIG__";

const DEFAULT_PLAYER_SOCKET: &str = "/tmp/iina.sock";
const DEFAULT_TOKEN_FILE: &str = ".token";
const DEFAULT_LOG_MIN_LEVEL: &str = "info";

/// Gestionnaire de configuration de PodDeck
///
/// La configuration est chargée une fois par invocation du processus :
/// le fichier `config.yaml` du répertoire de configuration est mergé
/// avec la configuration par défaut intégrée, puis les variables
/// d'environnement `PODDECK_CONFIG__*` sont appliquées par-dessus.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Config {
    /// Cherche le répertoire de configuration en essayant plusieurs emplacements
    fn find_config_dir(directory: &str) -> String {
        // 1. Répertoire fourni explicitement
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Variable d'environnement
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Répertoire courant
        if Path::new(".poddeck").exists() {
            return ".poddeck".to_string();
        }

        // 4. Répertoire home
        if let Some(home) = home_dir() {
            let home_config = home.join(".poddeck");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        ".poddeck".to_string()
    }

    /// Valide et prépare un répertoire de configuration
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(anyhow!("Le chemin spécifié n'est pas un répertoire"));
        }

        // Test d'écriture
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Détermine et valide le répertoire de configuration
    ///
    /// L'ordre de recherche est :
    /// 1. Le paramètre `directory` s'il n'est pas vide
    /// 2. La variable d'environnement `PODDECK_CONFIG`
    /// 3. `.poddeck` dans le répertoire courant
    /// 4. `.poddeck` dans le répertoire home de l'utilisateur
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Charge la configuration depuis le répertoire spécifié
    ///
    /// # Arguments
    ///
    /// * `directory` - Le répertoire contenant le fichier config.yaml,
    ///   ou vide pour utiliser la cascade de recherche par défaut
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        // Charger la configuration par défaut
        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        // Merger avec le fichier externe s'il existe
        if let Ok(data) = fs::read(&path) {
            info!(config_file = %path, "Loaded config file");
            let external_value: Value = serde_yaml::from_slice(&data)?;
            merge_yaml(&mut config_value, &external_value);
        } else {
            info!(config_file = %path, "Config file not found, using default embedded config");
        }

        // Appliquer les overrides depuis les variables d'environnement
        Self::apply_env_overrides(&mut config_value);

        Ok(Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        })
    }

    /// Sauvegarde la configuration courante dans le fichier config.yaml
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().unwrap();
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Lit une valeur de configuration au chemin donné
    ///
    /// # Arguments
    ///
    /// * `path` - Chemin dans l'arbre YAML (ex: `&["player", "socket"]`)
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        let mut current = &*data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                if let Some(next) = map.get(&Value::String(key.to_string())) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    /// Écrit une valeur de configuration au chemin donné et la sauvegarde
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.data.lock().unwrap();
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_string());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                let key_path = key
                    .trim_start_matches(ENV_PREFIX)
                    .split("__")
                    .map(|k| k.to_lowercase())
                    .collect::<Vec<_>>();
                let key_path: Vec<&str> = key_path.iter().map(|k| k.as_str()).collect();
                let yaml_value = serde_yaml::from_str::<Value>(&value)
                    .unwrap_or(Value::String(value.clone()));
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    /// Résout un chemin relatif ou absolu et crée le répertoire si nécessaire
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<PathBuf> {
        let path = Path::new(dir_path);
        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            // Chemin relatif : le résoudre par rapport à config_dir
            Path::new(&self.config_dir).join(path)
        };

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory = %absolute_path.display(), "Created cache directory");
        }

        Ok(absolute_path)
    }

    /// Récupère le répertoire du cache disque, créé s'il n'existait pas
    ///
    /// # Returns
    ///
    /// Le chemin absolu du répertoire de cache
    pub fn get_cache_dir(&self) -> Result<PathBuf> {
        let dir = match self.get_value(&["cache", "directory"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => "cache".to_string(),
        };
        self.resolve_and_create_dir(&dir)
    }

    /// Récupère les credentials du service distant
    ///
    /// Les variables d'environnement `email` et `password` ont priorité
    /// sur le fichier de configuration.
    pub fn get_credentials(&self) -> Result<(String, String)> {
        let email = env::var("email").ok().filter(|s| !s.is_empty()).or_else(|| {
            match self.get_value(&["remote", "email"]) {
                Ok(Value::String(s)) if !s.is_empty() => Some(s),
                _ => None,
            }
        });
        let password = env::var("password")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| match self.get_value(&["remote", "password"]) {
                Ok(Value::String(s)) if !s.is_empty() => Some(s),
                _ => None,
            });

        match (email, password) {
            (Some(e), Some(p)) => Ok((e, p)),
            _ => Err(anyhow!("Remote credentials not configured")),
        }
    }

    /// Récupère le chemin du fichier où le token d'authentification est persisté
    ///
    /// Un chemin relatif est résolu par rapport au répertoire de configuration.
    pub fn get_token_path(&self) -> PathBuf {
        let file = match self.get_value(&["remote", "token_file"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_TOKEN_FILE.to_string(),
        };
        let path = Path::new(&file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(path)
        }
    }

    /// Récupère le chemin du socket IPC du lecteur externe
    pub fn get_player_socket(&self) -> PathBuf {
        match self.get_value(&["player", "socket"]) {
            Ok(Value::String(s)) if !s.is_empty() => PathBuf::from(s),
            _ => PathBuf::from(DEFAULT_PLAYER_SOCKET),
        }
    }

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> String {
        match self.get_value(&["logger", "min_level"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }
}

/// Retourne l'instance globale de configuration
///
/// La configuration est chargée paresseusement au premier accès,
/// une fois par invocation du processus.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merge la configuration externe dans la configuration par défaut
///
/// Les mappings sont mergés récursivement ; pour les scalaires et les
/// séquences, la valeur externe remplace la valeur par défaut.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
