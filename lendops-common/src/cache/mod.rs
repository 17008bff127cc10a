pub mod local;
pub mod remote;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Negative-cache sentinel for identifiers known to be missing. A bare `*`
/// is not valid JSON, so it can never collide with a legitimate payload.
pub const PLACEHOLDER: &str = "*";

pub const DEFAULT_VALUE_TTL: Duration = Duration::from_secs(300);
pub const PLACEHOLDER_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub enum CacheError {
    CommandFailed(Option<String>),
    BadPayload,
}

impl std::error::Error for CacheError {}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::CommandFailed(Some(msg)) => {
                write!(f, "CacheError: Command failed: {msg}")
            }
            CacheError::CommandFailed(None) => write!(f, "CacheError: Command failed"),
            CacheError::BadPayload => write!(f, "CacheError: Cached payload failed to decode"),
        }
    }
}

/// Raw lookup outcome. A placeholder hit means the key is known to be
/// missing from the store; a miss means the cache has no opinion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Cached {
    Value(String),
    Placeholder,
    Miss,
}

/// Typed lookup outcome produced by [`Cache::get_json`].
#[derive(Clone, Debug)]
pub enum CachedEntity<T> {
    Value(T),
    Placeholder,
    Miss,
}

/// One key/value backend. Single-key operations are linearizable against
/// themselves; no ordering is guaranteed across keys.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Cached, CacheError>;
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    fn del(&self, keys: &[String]) -> Result<(), CacheError>;
    fn mget(&self, keys: &[String]) -> Result<Vec<Cached>, CacheError>;
    fn mset(&self, entries: &[(String, String)], ttl: Duration) -> Result<(), CacheError>;
}

/// Shared handle over a backend, JSON-encoding entity values under
/// `"<entity>:<id>"` keys.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    value_ttl: Duration,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>, value_ttl: Duration) -> Self {
        Self { store, value_ttl }
    }

    pub fn entity_key(entity: &str, id: i64) -> String {
        format!("{entity}:{id}")
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<CachedEntity<T>, CacheError> {
        match self.store.get(key)? {
            Cached::Value(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => Ok(CachedEntity::Value(value)),
                Err(_) => Err(CacheError::BadPayload),
            },
            Cached::Placeholder => Ok(CachedEntity::Placeholder),
            Cached::Miss => Ok(CachedEntity::Miss),
        }
    }

    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value).map_err(|_| CacheError::BadPayload)?;
        self.store.set(key, &raw, self.value_ttl)
    }

    pub fn put_placeholder(&self, key: &str) -> Result<(), CacheError> {
        self.store.set(key, PLACEHOLDER, PLACEHOLDER_TTL)
    }

    pub fn invalidate(&self, keys: &[String]) -> Result<(), CacheError> {
        self.store.del(keys)
    }

    pub fn mget_json<T: DeserializeOwned>(
        &self,
        keys: &[String],
    ) -> Result<Vec<CachedEntity<T>>, CacheError> {
        let raw = self.store.mget(keys)?;

        let mut out = Vec::with_capacity(raw.len());
        for item in raw {
            out.push(match item {
                Cached::Value(raw) => match serde_json::from_str::<T>(&raw) {
                    Ok(value) => CachedEntity::Value(value),
                    Err(_) => return Err(CacheError::BadPayload),
                },
                Cached::Placeholder => CachedEntity::Placeholder,
                Cached::Miss => CachedEntity::Miss,
            });
        }

        Ok(out)
    }

    pub fn mput_json<T: Serialize>(&self, entries: &[(String, &T)]) -> Result<(), CacheError> {
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let raw = serde_json::to_string(value).map_err(|_| CacheError::BadPayload)?;
            encoded.push((key.clone(), raw));
        }

        self.store.mset(&encoded, self.value_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::local::LocalStore;
    use super::*;

    #[derive(Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Widget {
        id: i64,
        name: String,
    }

    fn test_cache() -> Cache {
        Cache::new(Arc::new(LocalStore::new()), Duration::from_secs(60))
    }

    #[test]
    fn test_entity_key_format() {
        assert_eq!(Cache::entity_key("payment_channel", 42), "payment_channel:42");
    }

    #[test]
    fn test_json_round_trip() {
        let cache = test_cache();
        let widget = Widget {
            id: 7,
            name: String::from("wire"),
        };

        cache.put_json("widget:7", &widget).unwrap();

        match cache.get_json::<Widget>("widget:7").unwrap() {
            CachedEntity::Value(v) => assert_eq!(v, widget),
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn test_placeholder_is_distinguishable() {
        let cache = test_cache();
        cache.put_placeholder("widget:8").unwrap();

        assert!(matches!(
            cache.get_json::<Widget>("widget:8").unwrap(),
            CachedEntity::Placeholder
        ));
        assert!(matches!(
            cache.get_json::<Widget>("widget:9").unwrap(),
            CachedEntity::Miss
        ));
    }

    #[test]
    fn test_invalidate() {
        let cache = test_cache();
        let widget = Widget {
            id: 1,
            name: String::from("a"),
        };

        cache.put_json("widget:1", &widget).unwrap();
        cache.invalidate(&[String::from("widget:1")]).unwrap();

        assert!(matches!(
            cache.get_json::<Widget>("widget:1").unwrap(),
            CachedEntity::Miss
        ));
    }

    #[test]
    fn test_mget_mixed() {
        let cache = test_cache();
        let widget = Widget {
            id: 1,
            name: String::from("a"),
        };

        cache.put_json("widget:1", &widget).unwrap();
        cache.put_placeholder("widget:2").unwrap();

        let results = cache
            .mget_json::<Widget>(&[
                String::from("widget:1"),
                String::from("widget:2"),
                String::from("widget:3"),
            ])
            .unwrap();

        assert!(matches!(results[0], CachedEntity::Value(_)));
        assert!(matches!(results[1], CachedEntity::Placeholder));
        assert!(matches!(results[2], CachedEntity::Miss));
    }
}
