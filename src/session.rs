//! Sessions.
//!
//! A [`Session`] is a dirty-tracked map of JSON values attached to the
//! request. The [`SessionFactory`] seam loads it before resolution and
//! saves it right before finalization; [`FileSessionStore`] is the
//! bundled file-per-session implementation keyed by a ULID in the
//! `ssid` cookie.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::config::SessionSettings;
use crate::request::Request;
use crate::response::Response;

/// Name of the cookie carrying the session id.
pub const SSID_COOKIE: &str = "ssid";

/// Dirty-tracked session data.
///
/// Every mutating operation marks the session dirty; the store only
/// writes dirty sessions, so an untouched session costs no I/O.
#[derive(Debug, Default)]
pub struct Session {
    data: HashMap<String, Value>,
    dirty: bool,
    invalid: bool,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session from already-persisted data. Not dirty.
    #[must_use]
    pub fn from_data(data: HashMap<String, Value>) -> Self {
        Self {
            data,
            dirty: false,
            invalid: false,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.dirty = true;
        self.data.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.dirty = true;
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.dirty = true;
        self.data.clear();
    }

    /// Mark the session dirty after mutating a nested value in place.
    /// Interior mutation through `get` is invisible to dirty tracking.
    pub fn mark_modified(&mut self) {
        self.dirty = true;
    }

    /// Discard the session: clears the data and schedules deletion of
    /// the persisted copy on save.
    pub fn invalidate(&mut self) {
        self.data.clear();
        self.dirty = true;
        self.invalid = true;
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.invalid
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }
}

/// Loads the session onto the request and persists it back.
///
/// `load` runs before resolution, `save` right before finalization so
/// it can still set cookies on the response. Failures are
/// infrastructure errors; the dispatcher logs and continues.
pub trait SessionFactory: Send + Sync {
    fn load(&self, req: &mut Request) -> anyhow::Result<()>;
    fn save(&self, req: &mut Request, resp: &mut Response) -> anyhow::Result<()>;
}

/// File-per-session store: one JSON file named by the session's ULID.
pub struct FileSessionStore {
    directory: PathBuf,
    max_age: u64,
}

impl FileSessionStore {
    /// Create the store, making the session directory if needed.
    pub fn new(settings: &SessionSettings) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&settings.directory).with_context(|| {
            format!(
                "failed to create session directory {}",
                settings.directory.display()
            )
        })?;
        Ok(Self {
            directory: settings.directory.clone(),
            max_age: settings.max_age,
        })
    }

    fn store_path(&self, ssid: &Ulid) -> PathBuf {
        self.directory.join(ssid.to_string())
    }

    /// The cookie value must be a ULID this store minted; anything else
    /// (including path fragments) never reaches the filesystem.
    fn parse_ssid(value: &str) -> Option<Ulid> {
        Ulid::from_string(value).ok()
    }
}

impl SessionFactory for FileSessionStore {
    fn load(&self, req: &mut Request) -> anyhow::Result<()> {
        let Some(raw) = req.cookie(SSID_COOKIE) else {
            return Ok(());
        };
        let Some(ssid) = Self::parse_ssid(&raw) else {
            warn!(ssid = %raw, "Malformed session cookie, dropping");
            req.remove_cookie(SSID_COOKIE);
            return Ok(());
        };
        let path = self.store_path(&ssid);
        if !path.is_file() {
            // Stale cookie for a session that no longer exists.
            warn!(ssid = %ssid, "Session file missing, dropping cookie");
            req.remove_cookie(SSID_COOKIE);
            return Ok(());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read session file {}", path.display()))?;
        let data: HashMap<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse session file {}", path.display()))?;
        debug!(ssid = %ssid, keys = data.len(), "Session loaded");
        req.session = Session::from_data(data);
        Ok(())
    }

    fn save(&self, req: &mut Request, resp: &mut Response) -> anyhow::Result<()> {
        if !req.session.is_dirty() {
            return Ok(());
        }

        if req.session.is_invalidated() {
            if let Some(ssid) = req.cookie(SSID_COOKIE).as_deref().and_then(Self::parse_ssid) {
                let path = self.store_path(&ssid);
                if path.is_file() {
                    std::fs::remove_file(&path).with_context(|| {
                        format!("failed to delete session file {}", path.display())
                    })?;
                }
                debug!(ssid = %ssid, "Session invalidated");
            }
            resp.set_cookie(SSID_COOKIE, "", Some(0));
            return Ok(());
        }

        let ssid = match req.cookie(SSID_COOKIE).as_deref().and_then(Self::parse_ssid) {
            Some(ssid) => ssid,
            None => {
                let ssid = Ulid::new();
                resp.set_cookie(SSID_COOKIE, &ssid.to_string(), Some(self.max_age));
                ssid
            }
        };

        let data: HashMap<&String, &Value> = req.session.items().collect();
        let path = self.store_path(&ssid);
        let raw = serde_json::to_string(&data).context("failed to serialize session")?;
        std::fs::write(&path, raw)
            .with_context(|| format!("failed to write session file {}", path.display()))?;
        debug!(ssid = %ssid, keys = req.session.len(), "Session saved");
        Ok(())
    }
}
