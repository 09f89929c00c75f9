use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::models::{RoleMap, RoomId};
use crate::{Error, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub homeserver: HomeserverConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeserverConfig {
    /// Base URL of the client-server API, e.g. `https://matrix.example.org`
    pub url: String,
    pub access_token: String,
    pub request_timeout_seconds: u64,
}

impl Default for HomeserverConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            access_token: String::new(),
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Domain of the Discord bridge's puppet users
    pub server_name: String,
    pub allow_manual_resync: bool,
    pub command_prefix: String,
    /// Long-poll timeout passed to `/sync`
    pub timeout_ms: u64,
    pub retry_delay_seconds: u64,
    pub rooms: Vec<RoomRolesConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_name: String::new(),
            allow_manual_resync: false,
            command_prefix: "!".to_string(),
            timeout_ms: 30_000,
            retry_delay_seconds: 5,
            rooms: Vec::new(),
        }
    }
}

/// Role mapping for one tracked room.
///
/// Stored as a list rather than a map so room IDs and role names keep their
/// exact spelling through the config loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRolesConfig {
    pub room_id: RoomId,
    #[serde(default)]
    pub roles: Vec<RoleLevelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleLevelConfig {
    pub name: String,
    pub level: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // PLSYNC_HOMESERVER__ACCESS_TOKEN, PLSYNC_SYNC__SERVER_NAME, ...
        builder = builder.add_source(
            Environment::with_prefix("PLSYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::load(None)
    }

    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Parse an inline YAML document (no environment overrides)
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, ConfigError> {
        ConfigBuilder::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }

    /// Collect every configuration problem instead of stopping at the first one
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.homeserver.url.trim().is_empty() {
            errors.push("homeserver.url must be set".to_string());
        } else if !self.homeserver.url.starts_with("http://")
            && !self.homeserver.url.starts_with("https://")
        {
            errors.push(format!(
                "homeserver.url must be an http(s) URL, got {}",
                self.homeserver.url
            ));
        }
        if self.homeserver.access_token.trim().is_empty() {
            errors.push("homeserver.access_token must be set".to_string());
        }
        if self.sync.server_name.trim().is_empty() {
            errors.push("sync.server_name must be set".to_string());
        }
        if self.sync.command_prefix.is_empty() {
            errors.push("sync.command_prefix must not be empty".to_string());
        }

        let mut seen_rooms = HashSet::new();
        for room in &self.sync.rooms {
            if !room.room_id.as_str().starts_with('!') {
                errors.push(format!("sync.rooms: {} is not a room ID", room.room_id));
            }
            if !seen_rooms.insert(&room.room_id) {
                errors.push(format!("sync.rooms: {} is listed twice", room.room_id));
            }
            let mut seen_roles = HashSet::new();
            for role in &room.roles {
                if !seen_roles.insert(role.name.as_str()) {
                    errors.push(format!(
                        "sync.rooms: role {} is mapped twice in {}",
                        role.name, room.room_id
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Runtime form of [`SyncConfig`] consumed by the sync engine
#[derive(Debug, Clone, Default)]
pub struct SyncSettings {
    pub rooms: HashMap<RoomId, RoleMap>,
    pub server_name: String,
    pub allow_manual_resync: bool,
    pub command_prefix: String,
}

impl SyncSettings {
    /// Build the per-room role maps. Duplicate rooms or roles are rejected.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let mut rooms = HashMap::with_capacity(config.rooms.len());

        for room in &config.rooms {
            let mut role_map = RoleMap::with_capacity(room.roles.len());
            for role in &room.roles {
                if role_map.insert(role.name.clone(), role.level).is_some() {
                    return Err(Error::Config(format!(
                        "role {} is mapped twice in {}",
                        role.name, room.room_id
                    )));
                }
            }
            if rooms.insert(room.room_id.clone(), role_map).is_some() {
                return Err(Error::Config(format!(
                    "room {} is configured twice",
                    room.room_id
                )));
            }
        }

        Ok(Self {
            rooms,
            server_name: config.server_name.clone(),
            allow_manual_resync: config.allow_manual_resync,
            command_prefix: config.command_prefix.clone(),
        })
    }

    #[must_use]
    pub fn is_tracked(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }
}
