use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::UserId;
use crate::{Error, Result};

/// `m.room.power_levels` content.
///
/// Only the per-user levels are interpreted. Every other field is carried
/// through untouched so that writing the state back never drops content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerLevels {
    #[serde(default)]
    pub users: BTreeMap<UserId, i64>,
    #[serde(default)]
    pub users_default: i64,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl PowerLevels {
    pub fn from_value(content: Value) -> Result<Self> {
        serde_json::from_value(content).map_err(|e| Error::Deserialization {
            context: format!("invalid power levels content: {e}"),
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Effective level of a user, falling back to `users_default`
    #[must_use]
    pub fn user_level(&self, user_id: &UserId) -> i64 {
        self.users
            .get(user_id)
            .copied()
            .unwrap_or(self.users_default)
    }

    /// Set a user's level. A level equal to the default is stored as the absence of an entry.
    pub fn set_user_level(&mut self, user_id: &UserId, level: i64) {
        if level == self.users_default {
            self.users.remove(user_id);
        } else {
            self.users.insert(user_id.clone(), level);
        }
    }
}
