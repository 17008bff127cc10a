use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{Cached, CacheError, CacheStore, PLACEHOLDER};

const SWEEP_THRESHOLD: usize = 16_384;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local backend. Expired entries are dropped lazily on read and
/// swept when the map grows past a threshold.
pub struct LocalStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn classify(value: &str) -> Cached {
        if value == PLACEHOLDER {
            Cached::Placeholder
        } else {
            Cached::Value(String::from(value))
        }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for LocalStore {
    fn get(&self, key: &str) -> Result<Cached, CacheError> {
        let mut entries = self.entries.lock().expect("Cache lock was poisoned");

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Self::classify(&entry.value)),
            Some(_) => {
                entries.remove(key);
                Ok(Cached::Miss)
            }
            None => Ok(Cached::Miss),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("Cache lock was poisoned");

        if entries.len() >= SWEEP_THRESHOLD {
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires_at > now);
        }

        entries.insert(
            String::from(key),
            Entry {
                value: String::from(value),
                expires_at: Instant::now() + ttl,
            },
        );

        Ok(())
    }

    fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("Cache lock was poisoned");

        for key in keys {
            entries.remove(key);
        }

        Ok(())
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Cached>, CacheError> {
        let mut entries = self.entries.lock().expect("Cache lock was poisoned");
        let now = Instant::now();

        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(match entries.get(key) {
                Some(entry) if entry.expires_at > now => Self::classify(&entry.value),
                Some(_) => {
                    entries.remove(key);
                    Cached::Miss
                }
                None => Cached::Miss,
            });
        }

        Ok(out)
    }

    fn mset(&self, pairs: &[(String, String)], ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("Cache lock was poisoned");
        let expires_at = Instant::now() + ttl;

        for (key, value) in pairs {
            entries.insert(
                key.clone(),
                Entry {
                    value: value.clone(),
                    expires_at,
                },
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_del() {
        let store = LocalStore::new();

        store
            .set("user:1", "{\"id\":1}", Duration::from_secs(60))
            .unwrap();
        assert_eq!(
            store.get("user:1").unwrap(),
            Cached::Value(String::from("{\"id\":1}"))
        );

        store.del(&[String::from("user:1")]).unwrap();
        assert_eq!(store.get("user:1").unwrap(), Cached::Miss);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let store = LocalStore::new();

        store.set("user:2", "{}", Duration::from_secs(0)).unwrap();
        assert_eq!(store.get("user:2").unwrap(), Cached::Miss);
    }

    #[test]
    fn test_placeholder_classification() {
        let store = LocalStore::new();

        store
            .set("user:3", PLACEHOLDER, Duration::from_secs(60))
            .unwrap();
        assert_eq!(store.get("user:3").unwrap(), Cached::Placeholder);
    }

    #[test]
    fn test_mset_mget() {
        let store = LocalStore::new();

        store
            .mset(
                &[
                    (String::from("a:1"), String::from("1")),
                    (String::from("a:2"), String::from("2")),
                ],
                Duration::from_secs(60),
            )
            .unwrap();

        let values = store
            .mget(&[
                String::from("a:1"),
                String::from("a:2"),
                String::from("a:3"),
            ])
            .unwrap();

        assert_eq!(values[0], Cached::Value(String::from("1")));
        assert_eq!(values[1], Cached::Value(String::from("2")));
        assert_eq!(values[2], Cached::Miss);
    }
}
