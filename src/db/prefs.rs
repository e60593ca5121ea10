//! Typed views over the key-value store. Unreadable stored values are
//! logged, removed and replaced by their defaults; they never fail a command.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use super::Database;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "user";
pub const THEME_KEY: &str = "theme";
pub const FAVORITES_KEY: &str = "favorites";
pub const SETTINGS_KEY: &str = "appSettings";

/// Decode a stored JSON value, dropping the key when it is corrupt.
fn load_or_drop<T: serde::de::DeserializeOwned>(db: &Database, key: &str) -> Result<Option<T>> {
    match db.get_json::<T>(key) {
        Ok(v) => Ok(v),
        Err(e) => {
            warn!("Discarding stored '{}': {:#}", key, e);
            db.remove(key)?;
            Ok(None)
        }
    }
}

// ── Auth session ─────────────────────────────────────────────────────────────

/// Cached login. Only valid when both the token and the user are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user: Value,
}

impl AuthSession {
    pub fn load(db: &Database) -> Result<Option<Self>> {
        let token = db.get(AUTH_TOKEN_KEY)?.filter(|t| !t.is_empty());
        let raw_user = db.get(USER_KEY)?;
        let (Some(token), Some(raw_user)) = (token, raw_user) else {
            return Ok(None);
        };
        match serde_json::from_str::<Value>(&raw_user) {
            Ok(user) if user.is_object() => Ok(Some(AuthSession { token, user })),
            _ => {
                warn!("Cached user is unreadable, signing out");
                Self::clear(db)?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, db: &Database) -> Result<()> {
        db.set(AUTH_TOKEN_KEY, &self.token)?;
        db.set_json(USER_KEY, &self.user)?;
        Ok(())
    }

    /// Replace the cached user after a `/auth/me` refresh.
    pub fn update_user(&mut self, db: &Database, user: Value) -> Result<()> {
        self.user = user;
        db.set_json(USER_KEY, &self.user)
    }

    /// Shallow-merge locally edited profile fields into the cached user.
    pub fn edit_profile(&mut self, db: &Database, edits: &ProfileEdit) -> Result<()> {
        let mut user = match self.user.take() {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        for (key, value) in edits.fields() {
            user.insert(key.to_string(), Value::String(value.to_string()));
        }
        self.update_user(db, Value::Object(user))
    }

    /// When the cached token was last written.
    pub fn signed_in_at(db: &Database) -> Result<Option<DateTime<Utc>>> {
        db.updated_at(AUTH_TOKEN_KEY)
    }

    pub fn clear(db: &Database) -> Result<()> {
        db.remove(AUTH_TOKEN_KEY)?;
        db.remove(USER_KEY)?;
        Ok(())
    }

    pub fn display_name(&self) -> &str {
        ["username", "name", "email", "phone", "phoneNumber"]
            .iter()
            .find_map(|k| self.user.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .unwrap_or("user")
    }
}

/// Profile fields the user may edit. Only the fields that are set change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileEdit {
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
}

impl ProfileEdit {
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("phoneNumber", &self.phone_number),
            ("email", &self.email),
            ("dateOfBirth", &self.date_of_birth),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (k, v.trim())))
    }
}

// ── Theme ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn load(db: &Database) -> Result<Self> {
        Ok(match db.get(THEME_KEY)?.as_deref() {
            Some("light") => ThemeMode::Light,
            Some("dark") => ThemeMode::Dark,
            Some(other) => {
                debug!("Unknown theme '{}', using default", other);
                ThemeMode::default()
            }
            None => ThemeMode::default(),
        })
    }

    pub fn save(self, db: &Database) -> Result<()> {
        db.set(THEME_KEY, self.as_str())
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Favorites ────────────────────────────────────────────────────────────────

/// Favourite match ids in the order they were added. Every change is
/// written through.
pub struct Favorites {
    db: Database,
    ids: Vec<String>,
}

impl Favorites {
    pub fn load(db: &Database) -> Result<Self> {
        let ids: Vec<String> = load_or_drop(db, FAVORITES_KEY)?.unwrap_or_default();
        Ok(Favorites {
            db: db.clone(),
            ids,
        })
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, match_id: &str) -> bool {
        self.ids.iter().any(|id| id == match_id)
    }

    pub fn add(&mut self, match_id: &str) -> Result<bool> {
        if match_id.is_empty() || self.contains(match_id) {
            return Ok(false);
        }
        self.ids.push(match_id.to_string());
        self.persist()?;
        Ok(true)
    }

    pub fn remove(&mut self, match_id: &str) -> Result<bool> {
        let before = self.ids.len();
        self.ids.retain(|id| id != match_id);
        let removed = self.ids.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.ids.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        self.db.set_json(FAVORITES_KEY, &self.ids)
    }
}

// ── App settings ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub notifications_enabled: bool,
    pub match_start_notifications: bool,
    pub bet_result_notifications: bool,
    pub promotions_notifications: bool,
    pub default_stake: String,
    pub odds_format: String,
    pub quick_bet_enabled: bool,
    pub confirm_bet_placement: bool,
    pub language: String,
    pub biometric_login: bool,
    pub share_analytics: bool,
    pub personalized_ads: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            notifications_enabled: true,
            match_start_notifications: true,
            bet_result_notifications: true,
            promotions_notifications: false,
            default_stake: "10".into(),
            odds_format: "decimal".into(),
            quick_bet_enabled: false,
            confirm_bet_placement: true,
            language: "english".into(),
            biometric_login: false,
            share_analytics: false,
            personalized_ads: false,
        }
    }
}

impl AppSettings {
    /// Stored values merged over the defaults.
    pub fn load(db: &Database) -> Result<Self> {
        Ok(load_or_drop(db, SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, db: &Database) -> Result<()> {
        db.set_json(SETTINGS_KEY, self)
    }

    pub fn reset(db: &Database) -> Result<Self> {
        db.remove(SETTINGS_KEY)?;
        Ok(Self::default())
    }

    /// Set one field by its stored (camelCase) name from command-line text.
    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut value = serde_json::to_value(&*self)?;
        let Some(slot) = value.get_mut(key) else {
            bail!("unknown setting '{}'", key);
        };
        *slot = if slot.is_boolean() {
            match bool::from_str(raw.trim()) {
                Ok(b) => Value::Bool(b),
                Err(_) => bail!("setting '{}' expects true or false", key),
            }
        } else {
            Value::String(raw.to_string())
        };
        *self = serde_json::from_value(value)?;
        Ok(())
    }

    /// `(key, value)` pairs sorted by key, for display.
    pub fn entries(&self) -> Vec<(String, String)> {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        let Value::Object(map) = value else {
            return vec![];
        };
        map.into_iter()
            .map(|(k, v)| {
                let shown = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, shown)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_session_needs_token_and_user() {
        let db = Database::open_in_memory().unwrap();
        db.set(AUTH_TOKEN_KEY, "tok").unwrap();
        assert_eq!(AuthSession::load(&db).unwrap(), None);

        let session = AuthSession {
            token: "tok".into(),
            user: json!({"username": "kofi"}),
        };
        session.save(&db).unwrap();
        let loaded = AuthSession::load(&db).unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.display_name(), "kofi");
    }

    #[test]
    fn test_profile_edit_persists_and_keeps_other_fields() {
        let db = Database::open_in_memory().unwrap();
        let mut session = AuthSession {
            token: "tok".into(),
            user: json!({"username": "kofi", "email": "old@example.com"}),
        };
        session.save(&db).unwrap();
        assert!(AuthSession::signed_in_at(&db).unwrap().is_some());

        let edits = ProfileEdit {
            email: Some(" kofi@example.com ".into()),
            date_of_birth: Some("1990-04-01".into()),
            ..Default::default()
        };
        assert!(!edits.is_empty());
        assert!(ProfileEdit::default().is_empty());
        session.edit_profile(&db, &edits).unwrap();

        let loaded = AuthSession::load(&db).unwrap().unwrap();
        assert_eq!(loaded.user["username"], "kofi");
        assert_eq!(loaded.user["email"], "kofi@example.com");
        assert_eq!(loaded.user["dateOfBirth"], "1990-04-01");
        assert!(loaded.user.get("phoneNumber").is_none());
    }

    #[test]
    fn test_corrupt_user_drops_both_keys() {
        let db = Database::open_in_memory().unwrap();
        db.set(AUTH_TOKEN_KEY, "tok").unwrap();
        db.set(USER_KEY, "{broken").unwrap();
        assert_eq!(AuthSession::load(&db).unwrap(), None);
        assert_eq!(db.get(AUTH_TOKEN_KEY).unwrap(), None);
        assert_eq!(db.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_theme_defaults_to_dark_and_toggles() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(ThemeMode::load(&db).unwrap(), ThemeMode::Dark);
        db.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(ThemeMode::load(&db).unwrap(), ThemeMode::Dark);

        ThemeMode::Dark.toggle().save(&db).unwrap();
        assert_eq!(ThemeMode::load(&db).unwrap(), ThemeMode::Light);
        assert_eq!(ThemeMode::Light.toggle(), ThemeMode::Dark);
    }

    #[test]
    fn test_favorites_unique_and_persisted() {
        let db = Database::open_in_memory().unwrap();
        let mut favs = Favorites::load(&db).unwrap();
        assert!(favs.add("m1").unwrap());
        assert!(!favs.add("m1").unwrap());
        assert!(!favs.add("").unwrap());
        assert!(favs.add("m2").unwrap());

        let reloaded = Favorites::load(&db).unwrap();
        assert_eq!(reloaded.ids(), ["m1", "m2"]);
        assert!(reloaded.contains("m2"));

        assert!(favs.remove("m1").unwrap());
        assert!(!favs.remove("m1").unwrap());
        favs.clear().unwrap();
        assert!(Favorites::load(&db).unwrap().ids().is_empty());
    }

    #[test]
    fn test_corrupt_favorites_removed() {
        let db = Database::open_in_memory().unwrap();
        db.set(FAVORITES_KEY, "nope").unwrap();
        let favs = Favorites::load(&db).unwrap();
        assert!(favs.ids().is_empty());
        assert_eq!(db.get(FAVORITES_KEY).unwrap(), None);
    }

    #[test]
    fn test_settings_merge_over_defaults() {
        let db = Database::open_in_memory().unwrap();
        db.set(SETTINGS_KEY, r#"{"defaultStake":"25","quickBetEnabled":true}"#)
            .unwrap();
        let s = AppSettings::load(&db).unwrap();
        assert_eq!(s.default_stake, "25");
        assert!(s.quick_bet_enabled);
        assert!(s.confirm_bet_placement);
        assert_eq!(s.language, "english");

        db.set(SETTINGS_KEY, "[[[").unwrap();
        assert_eq!(AppSettings::load(&db).unwrap(), AppSettings::default());
        assert_eq!(db.get(SETTINGS_KEY).unwrap(), None);
    }

    #[test]
    fn test_settings_set_field() {
        let mut s = AppSettings::default();
        s.set_field("oddsFormat", "fractional").unwrap();
        s.set_field("shareAnalytics", "true").unwrap();
        assert_eq!(s.odds_format, "fractional");
        assert!(s.share_analytics);
        assert!(s.set_field("shareAnalytics", "yes").is_err());
        assert!(s.set_field("volume", "11").is_err());
        assert!(s
            .entries()
            .contains(&("defaultStake".to_string(), "10".to_string())));
    }
}
