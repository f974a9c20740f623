//! # User Directory
//!
//! The identity provider behind the server: configured users, their
//! credentials and their current capability sets.
//!
//! The directory lives behind a lock shared with every request. Capabilities
//! are looked up per request, never cached in a session, so replacing the
//! directory (on `SIGHUP`) takes effect with the next request.

use crate::config::Config;
use crate::error::AppError;
use rex_core::{Authorizer, CapabilitySet, UserId};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use subtle::ConstantTimeEq;

/// Directory shared between the server and the reload task.
pub type SharedDirectory = Arc<RwLock<UserDirectory>>;

/// Credentials presented by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Login plus application password (HTTP Basic).
    AppPassword { login: String, password: String },
    /// API key (HTTP Bearer).
    ApiKey(String),
}

#[derive(Debug, Clone)]
struct UserRecord {
    login: String,
    app_password: Option<String>,
    api_key: Option<String>,
    capabilities: CapabilitySet,
}

/// Configured users, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: BTreeMap<UserId, UserRecord>,
}

impl UserDirectory {
    /// Build the directory from a configuration, resolving roles.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let mut users = BTreeMap::new();

        for user in &config.users {
            if user.id == 0 {
                return Err(AppError::Config(format!(
                    "user '{}': id 0 is reserved",
                    user.login
                )));
            }
            if user.login.is_empty() || user.login.contains(':') {
                return Err(AppError::Config(format!(
                    "user {}: invalid login '{}'",
                    user.id, user.login
                )));
            }

            let mut names: Vec<&str> = Vec::new();
            for role in &user.roles {
                let caps = config.roles.get(role).ok_or_else(|| {
                    AppError::Config(format!("user '{}': unknown role '{}'", user.login, role))
                })?;
                names.extend(caps.iter().map(String::as_str));
            }
            names.extend(user.capabilities.iter().map(String::as_str));
            let capabilities = CapabilitySet::parse(names)
                .map_err(|e| AppError::Config(format!("user '{}': {}", user.login, e)))?;

            let record = UserRecord {
                login: user.login.clone(),
                app_password: user
                    .app_password
                    .as_deref()
                    .map(|pw| pw.split_whitespace().collect::<String>())
                    .filter(|pw| !pw.is_empty()),
                api_key: user.api_key.clone().filter(|s| !s.is_empty()),
                capabilities,
            };
            if users.insert(UserId(user.id), record).is_some() {
                return Err(AppError::Config(format!("duplicate user id {}", user.id)));
            }
        }

        let directory = Self { users };
        let mut logins: Vec<&str> = directory.users.values().map(|u| u.login.as_str()).collect();
        logins.sort_unstable();
        if let Some(pair) = logins.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(AppError::Config(format!("duplicate login '{}'", pair[0])));
        }
        Ok(directory)
    }

    /// Share the directory behind a lock.
    pub fn shared(self) -> SharedDirectory {
        Arc::new(RwLock::new(self))
    }

    /// Resolve credentials to a user id.
    ///
    /// Secrets are compared in constant time and every user is checked, so
    /// timing does not reveal which login exists.
    pub fn authenticate(&self, credentials: &Credentials) -> Option<UserId> {
        let mut found = None;
        for (id, user) in &self.users {
            let matched = match credentials {
                Credentials::AppPassword { login, password } => {
                    user.login == *login && secret_matches(user.app_password.as_deref(), password)
                }
                Credentials::ApiKey(key) => secret_matches(user.api_key.as_deref(), key),
            };
            if matched && found.is_none() {
                found = Some(*id);
            }
        }
        found
    }

    /// Look a user up by login (used by the CLI's `--user`).
    pub fn find_login(&self, login: &str) -> Option<UserId> {
        self.users
            .iter()
            .find(|(_, user)| user.login == login)
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Authorizer for UserDirectory {
    fn capabilities(&self, user: UserId) -> Option<CapabilitySet> {
        self.users.get(&user).map(|record| record.capabilities.clone())
    }
}

fn secret_matches(expected: Option<&str>, presented: &str) -> bool {
    expected.is_some_and(|expected| bool::from(expected.as_bytes().ct_eq(presented.as_bytes())))
}

/// Reload the directory from `path` on every `SIGHUP`.
///
/// A configuration that fails to load is logged and the current directory
/// stays in place.
#[cfg(unix)]
pub fn spawn_reload_on_sighup(path: std::path::PathBuf, directory: SharedDirectory) {
    use tokio::signal::unix::{SignalKind, signal};
    use tracing::{error, info};

    tokio::spawn(async move {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "cannot install SIGHUP handler");
                return;
            }
        };
        while hangups.recv().await.is_some() {
            let reloaded = Config::load(&path).and_then(|config| UserDirectory::from_config(&config));
            match reloaded {
                Ok(fresh) => match directory.write() {
                    Ok(mut guard) => {
                        info!(users = fresh.len(), "user directory reloaded");
                        *guard = fresh;
                    }
                    Err(_) => error!("user directory lock poisoned; reload skipped"),
                },
                Err(e) => error!(error = %e, "user directory reload failed; keeping current"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rex_core::{Action, CapabilityScope};

    fn config(json: &str) -> Config {
        Config::from_json(json).unwrap_or_default()
    }

    fn sample() -> Result<UserDirectory, AppError> {
        UserDirectory::from_config(&config(
            r#"{"users": [
                {"id": 1, "login": "ed", "app_password": "pw1", "roles": ["editor"]},
                {"id": 2, "login": "cora", "api_key": "key2", "roles": ["contributor"],
                 "capabilities": ["read_private_posts"]}
            ]}"#,
        ))
    }

    #[test]
    fn roles_and_extra_capabilities_merge() -> Result<(), AppError> {
        let directory = sample()?;
        let cora = directory
            .capabilities(UserId(2))
            .ok_or(AppError::Unauthorized)?;
        assert!(cora.has(Action::Edit, CapabilityScope::Posts));
        assert!(cora.has(Action::ReadPrivate, CapabilityScope::Posts));
        assert!(!cora.has(Action::Publish, CapabilityScope::Posts));
        assert!(directory.capabilities(UserId(3)).is_none());
        Ok(())
    }

    #[test]
    fn authenticates_both_credential_kinds() -> Result<(), AppError> {
        let directory = sample()?;
        let basic = Credentials::AppPassword {
            login: "ed".into(),
            password: "pw1".into(),
        };
        assert_eq!(directory.authenticate(&basic), Some(UserId(1)));
        assert_eq!(
            directory.authenticate(&Credentials::ApiKey("key2".into())),
            Some(UserId(2))
        );

        let wrong = Credentials::AppPassword {
            login: "ed".into(),
            password: "pw2".into(),
        };
        assert_eq!(directory.authenticate(&wrong), None);
        // Users without a password cannot log in with an empty one
        let empty = Credentials::AppPassword {
            login: "cora".into(),
            password: String::new(),
        };
        assert_eq!(directory.authenticate(&empty), None);
        Ok(())
    }

    #[test]
    fn invalid_configs_rejected() {
        for json in [
            r#"{"users": [{"id": 1, "login": "a", "roles": ["wizard"]}]}"#,
            r#"{"users": [{"id": 1, "login": "a", "capabilities": ["fly_posts"]}]}"#,
            r#"{"users": [{"id": 1, "login": "a"}, {"id": 1, "login": "b"}]}"#,
            r#"{"users": [{"id": 1, "login": "a"}, {"id": 2, "login": "a"}]}"#,
            r#"{"users": [{"id": 0, "login": "a"}]}"#,
        ] {
            assert!(UserDirectory::from_config(&config(json)).is_err(), "{}", json);
        }
    }

    #[test]
    fn find_login() -> Result<(), AppError> {
        let directory = sample()?;
        assert_eq!(directory.find_login("cora"), Some(UserId(2)));
        assert_eq!(directory.find_login("nobody"), None);
        Ok(())
    }
}
