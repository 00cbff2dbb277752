// ⚙️ Configuration
// Property store abstraction + immutable per-call configuration snapshot

use crate::error::{FeedError, FeedResult};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// PROPERTY KEYS
// ============================================================================

pub const ICS_URL: &str = "ICS_URL";
pub const DEBUG: &str = "DEBUG";
pub const CLEAR_CACHE: &str = "CLEAR_CACHE";
pub const CACHE_TIMEOUT: &str = "CACHE_TIMEOUT";
pub const ADDITIONAL_DATA_CONFIG: &str = "ADDITIONAL_DATA_CONFIG";
pub const KEY_RENAMES: &str = "KEY_RENAMES";
pub const PLACEHOLDER_VALUES: &str = "PLACEHOLDER_VALUES";
pub const EMAIL_LOG: &str = "EMAIL_LOG";

/// Every key the feed understands (for listings)
pub const KNOWN_KEYS: [&str; 8] = [
    ICS_URL,
    DEBUG,
    CLEAR_CACHE,
    CACHE_TIMEOUT,
    ADDITIONAL_DATA_CONFIG,
    KEY_RENAMES,
    PLACEHOLDER_VALUES,
    EMAIL_LOG,
];

/// Six hours
pub const DEFAULT_CACHE_TIMEOUT_SECS: u64 = 21600;

/// Longer timeouts are clamped to one year
pub const MAX_CACHE_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

// ============================================================================
// KEY MAP
// ============================================================================

/// KeyMap - ordered `left → right` pairs parsed from `"A:b,C:d"`
///
/// Used for enrichment (field → class marker), renames (old → new) and
/// placeholders (new → source).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    pairs: Vec<(String, String)>,
}

impl KeyMap {
    /// Split on `,` then `:`
    ///
    /// Pairs that do not have exactly two non-empty parts are dropped.
    /// A repeated left side keeps its first position and takes the last value.
    pub fn parse(raw: &str) -> Self {
        let mut map = KeyMap::default();

        for pair in raw.split(',') {
            let parts: Vec<&str> = pair.split(':').map(str::trim).collect();
            if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
                continue;
            }
            map.insert(parts[0], parts[1]);
        }

        map
    }

    pub fn insert(&mut self, left: impl Into<String>, right: impl Into<String>) {
        let left = left.into();
        let right = right.into();

        match self.pairs.iter_mut().find(|(l, _)| *l == left) {
            Some(slot) => slot.1 = right,
            None => self.pairs.push((left, right)),
        }
    }

    pub fn get(&self, left: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(l, _)| l == left)
            .map(|(_, r)| r.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(l, r)| (l.as_str(), r.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Parse a boolean property (`true`, `1`, `yes`, `on`; case-insensitive)
pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

// ============================================================================
// PROPERTY STORE
// ============================================================================

/// PropertyStore - injected key-value configuration source
pub trait PropertyStore: Send + Sync {
    fn get(&self, key: &str) -> FeedResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> FeedResult<()>;

    fn remove(&self, key: &str) -> FeedResult<()>;

    /// Consume a one-shot boolean flag
    ///
    /// Returns true at most once per raise: the flag is reset to `false` in
    /// the same step it is read.
    fn take_flag(&self, key: &str) -> FeedResult<bool>;
}

/// MemoryPropertyStore - Mutex-guarded map (tests, embedding)
#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed a property
    pub fn with(self, key: &str, value: &str) -> Self {
        self.lock().insert(key.to_string(), value.to_string());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn get(&self, key: &str) -> FeedResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> FeedResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> FeedResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn take_flag(&self, key: &str) -> FeedResult<bool> {
        let mut values = self.lock();
        let raised = values.get(key).map(|v| parse_bool(v)).unwrap_or(false);
        if raised {
            values.insert(key.to_string(), "false".to_string());
        }
        Ok(raised)
    }
}

// ============================================================================
// FEED CONFIG (immutable snapshot)
// ============================================================================

/// FeedConfig - everything one pipeline call needs, read once up front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub ics_url: Option<String>,
    pub debug: bool,
    pub cache_timeout: Duration,
    pub enrichment: KeyMap,
    pub renames: KeyMap,
    pub placeholders: KeyMap,
    pub email_log: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            ics_url: None,
            debug: false,
            cache_timeout: Duration::from_secs(DEFAULT_CACHE_TIMEOUT_SECS),
            enrichment: KeyMap::default(),
            renames: KeyMap::default(),
            placeholders: KeyMap::default(),
            email_log: None,
        }
    }
}

impl FeedConfig {
    /// Snapshot the store
    ///
    /// Does not touch `CLEAR_CACHE`; the orchestrator consumes that flag.
    pub fn load(store: &dyn PropertyStore) -> FeedResult<Self> {
        let non_empty = |key: &str| -> FeedResult<Option<String>> {
            Ok(store
                .get(key)?
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()))
        };

        let cache_timeout = non_empty(CACHE_TIMEOUT)?
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(|secs| secs.min(MAX_CACHE_TIMEOUT_SECS))
            .unwrap_or(DEFAULT_CACHE_TIMEOUT_SECS);

        Ok(FeedConfig {
            ics_url: non_empty(ICS_URL)?,
            debug: non_empty(DEBUG)?.map(|v| parse_bool(&v)).unwrap_or(false),
            cache_timeout: Duration::from_secs(cache_timeout),
            enrichment: KeyMap::parse(&non_empty(ADDITIONAL_DATA_CONFIG)?.unwrap_or_default()),
            renames: KeyMap::parse(&non_empty(KEY_RENAMES)?.unwrap_or_default()),
            placeholders: KeyMap::parse(&non_empty(PLACEHOLDER_VALUES)?.unwrap_or_default()),
            email_log: non_empty(EMAIL_LOG)?,
        })
    }

    /// The source URL, or `ConfigurationMissing`
    pub fn require_url(&self) -> FeedResult<&str> {
        self.ics_url
            .as_deref()
            .ok_or_else(|| FeedError::ConfigurationMissing(ICS_URL.to_string()))
    }
}
