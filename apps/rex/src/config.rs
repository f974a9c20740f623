//! Server configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object is a
//! valid configuration. Roles are a convenience only: each resolves to a list
//! of capability names before anything reaches the engine.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DB_PATH: &str = "rex.db";
pub const DEFAULT_BACKEND: &str = "file";
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listen address of `rex serve`.
    pub bind: String,
    /// `file` or `redb`.
    pub backend: String,
    pub db_path: PathBuf,
    /// Allowed CORS origins; `"*"` allows any.
    pub cors_origins: Vec<String>,
    /// Requests per second across the API; `0` disables limiting.
    pub rate_limit_per_second: u32,
    /// Role name -> capability names.
    pub roles: BTreeMap<String, Vec<String>>,
    pub users: Vec<UserConfig>,
}

/// One configured user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub app_password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Extra capabilities on top of the roles.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            backend: DEFAULT_BACKEND.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            cors_origins: Vec::new(),
            rate_limit_per_second: DEFAULT_RATE_LIMIT,
            roles: default_roles(),
            users: Vec::new(),
        }
    }
}

impl Config {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        serde_json::from_str(text).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load `path` when given, else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AppError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

/// WordPress-like stock roles, used when the file defines none.
fn default_roles() -> BTreeMap<String, Vec<String>> {
    const ALL_ACTIONS: [&str; 7] = [
        "edit",
        "edit_others",
        "edit_published",
        "edit_private",
        "publish",
        "read_private",
        "delete",
    ];
    let every = |scopes: &[&str]| -> Vec<String> {
        scopes
            .iter()
            .flat_map(|scope| ALL_ACTIONS.iter().map(move |a| format!("{}_{}", a, scope)))
            .collect()
    };

    let mut roles = BTreeMap::new();
    roles.insert("administrator".to_string(), every(&["posts", "pages"]));
    roles.insert("editor".to_string(), every(&["posts", "pages"]));
    roles.insert(
        "author".to_string(),
        ["edit_posts", "edit_published_posts", "publish_posts", "delete_posts"]
            .map(String::from)
            .to_vec(),
    );
    roles.insert(
        "contributor".to_string(),
        ["edit_posts", "delete_posts"].map(String::from).to_vec(),
    );
    roles
}
