//! Per-user notification settings.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Session types a user can be notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    TestDay,
    Practice,
    Qual,
    Warmup,
    Race,
}

impl SessionKind {
    pub const ALL: [SessionKind; 5] = [
        SessionKind::TestDay,
        SessionKind::Practice,
        SessionKind::Qual,
        SessionKind::Warmup,
        SessionKind::Race,
    ];

    /// Session type as the game server reports it.
    pub fn session_type(self) -> &'static str {
        match self {
            SessionKind::TestDay => "testday",
            SessionKind::Practice => "practice1",
            SessionKind::Qual => "qual1",
            SessionKind::Warmup => "warmup",
            SessionKind::Race => "race1",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionKind::TestDay => "TestDay",
            SessionKind::Practice => "Practice",
            SessionKind::Qual => "Qual",
            SessionKind::Warmup => "Warmup",
            SessionKind::Race => "Race",
        }
    }

    /// Only the first session of each kind is notified.
    pub fn from_session_type(session_type: &str) -> Option<Self> {
        let session_type = session_type.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.session_type() == session_type)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notifications {
    enabled: BTreeSet<SessionKind>,
}

impl Notifications {
    pub fn is_enabled(&self, kind: SessionKind) -> bool {
        self.enabled.contains(&kind)
    }

    pub fn symbol(&self, kind: SessionKind) -> &'static str {
        if self.is_enabled(kind) { "🔔" } else { "🔕" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: i64,
    pub chat_id: i64,
}

pub trait SettingsStore: Send + Sync {
    fn list_notifications(&self, user_id: i64) -> Result<Notifications>;

    /// Flips `kind` for the user; returns the new state.
    fn toggle_notification(&self, user_id: i64, chat_id: i64, kind: SessionKind) -> Result<bool>;

    fn users_for_session(&self, kind: SessionKind) -> Result<Vec<Recipient>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    chat_id: i64,
    notifications: BTreeSet<SessionKind>,
}

/// On-disk layout: one table per user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    users: BTreeMap<String, UserSettings>,
}

impl SettingsFile {
    fn list(&self, user_id: i64) -> Notifications {
        Notifications {
            enabled: self
                .users
                .get(&user_id.to_string())
                .map(|user| user.notifications.clone())
                .unwrap_or_default(),
        }
    }

    fn toggle(&mut self, user_id: i64, chat_id: i64, kind: SessionKind) -> bool {
        let user = self.users.entry(user_id.to_string()).or_default();
        user.chat_id = chat_id;
        if user.notifications.remove(&kind) {
            false
        } else {
            user.notifications.insert(kind);
            true
        }
    }

    fn recipients(&self, kind: SessionKind) -> Vec<Recipient> {
        self.users
            .iter()
            .filter(|(_, user)| user.notifications.contains(&kind))
            .filter_map(|(user_id, user)| {
                Some(Recipient {
                    user_id: user_id.parse().ok()?,
                    chat_id: user.chat_id,
                })
            })
            .collect()
    }
}

/// Settings kept in a TOML file, rewritten on every change.
pub struct TomlSettingsStore {
    path: PathBuf,
    state: Mutex<SettingsFile>,
}

impl TomlSettingsStore {
    /// Opens the store; a missing file starts empty.
    pub fn open(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse settings from {}", path.display()))?
        } else {
            SettingsFile::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &SettingsFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(state).context("Failed to serialize settings")?;
        let tmp_path = self.path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write settings to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })
    }
}

impl SettingsStore for TomlSettingsStore {
    fn list_notifications(&self, user_id: i64) -> Result<Notifications> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.list(user_id))
    }

    fn toggle_notification(&self, user_id: i64, chat_id: i64, kind: SessionKind) -> Result<bool> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = state.clone();
        let enabled = next.toggle(user_id, chat_id, kind);
        self.persist(&next)?;
        *state = next;
        debug!(user_id, kind = kind.label(), enabled, "notification toggled");
        Ok(enabled)
    }

    fn users_for_session(&self, kind: SessionKind) -> Result<Vec<Recipient>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.recipients(kind))
    }
}

/// Volatile store for tests and for running without a settings file.
#[derive(Default)]
pub struct MemorySettingsStore {
    state: Mutex<SettingsFile>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn list_notifications(&self, user_id: i64) -> Result<Notifications> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.list(user_id))
    }

    fn toggle_notification(&self, user_id: i64, chat_id: i64, kind: SessionKind) -> Result<bool> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.toggle(user_id, chat_id, kind))
    }

    fn users_for_session(&self, kind: SessionKind) -> Result<Vec<Recipient>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.recipients(kind))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn session_types_map_to_kinds() {
        assert_eq!(SessionKind::from_session_type("RACE1"), Some(SessionKind::Race));
        assert_eq!(SessionKind::from_session_type("practice1"), Some(SessionKind::Practice));
        assert_eq!(SessionKind::from_session_type("practice2"), None);
        assert_eq!(SessionKind::from_label("Qual"), Some(SessionKind::Qual));
    }

    #[test]
    fn toggle_flips_and_lists_recipients() {
        let store = MemorySettingsStore::new();
        assert!(store.toggle_notification(7, 70, SessionKind::Race).unwrap());
        assert!(store.list_notifications(7).unwrap().is_enabled(SessionKind::Race));
        assert_eq!(
            store.users_for_session(SessionKind::Race).unwrap(),
            vec![Recipient {
                user_id: 7,
                chat_id: 70
            }]
        );

        assert!(!store.toggle_notification(7, 70, SessionKind::Race).unwrap());
        assert!(store.users_for_session(SessionKind::Race).unwrap().is_empty());
        assert_eq!(store.list_notifications(8).unwrap(), Notifications::default());
    }

    #[test]
    fn toml_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let store = TomlSettingsStore::open(&path).unwrap();
        store.toggle_notification(7, 70, SessionKind::Qual).unwrap();
        store.toggle_notification(9, 90, SessionKind::Race).unwrap();
        drop(store);

        let reopened = TomlSettingsStore::open(&path).unwrap();
        let notifications = reopened.list_notifications(7).unwrap();
        assert!(notifications.is_enabled(SessionKind::Qual));
        assert_eq!(notifications.symbol(SessionKind::Race), "🔕");
        assert_eq!(reopened.users_for_session(SessionKind::Race).unwrap().len(), 1);
    }

    #[test]
    fn toml_store_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "users = 3").unwrap();
        assert!(TomlSettingsStore::open(&path).is_err());
    }
}
