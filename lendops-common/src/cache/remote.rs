use std::time::Duration;

use super::{Cached, CacheError, CacheStore, PLACEHOLDER};

/// Backend over an external key/value store. A fresh connection is checked
/// out of the client per call; the client itself is shareable.
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn connect(uri: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(uri)
            .map_err(|e| CacheError::CommandFailed(Some(e.to_string())))?;

        Ok(Self { client })
    }

    fn connection(&self) -> Result<redis::Connection, CacheError> {
        self.client
            .get_connection()
            .map_err(|e| CacheError::CommandFailed(Some(e.to_string())))
    }

    fn classify(value: Option<String>) -> Cached {
        match value {
            Some(v) if v == PLACEHOLDER => Cached::Placeholder,
            Some(v) => Cached::Value(v),
            None => Cached::Miss,
        }
    }
}

impl CacheStore for RedisStore {
    fn get(&self, key: &str) -> Result<Cached, CacheError> {
        let mut conn = self.connection()?;

        let value = redis::cmd("GET")
            .arg(key)
            .query::<Option<String>>(&mut conn)
            .map_err(|e| CacheError::CommandFailed(Some(e.to_string())))?;

        Ok(Self::classify(value))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection()?;

        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query::<()>(&mut conn)
            .map_err(|e| CacheError::CommandFailed(Some(e.to_string())))
    }

    fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection()?;

        redis::cmd("DEL")
            .arg(keys)
            .query::<()>(&mut conn)
            .map_err(|e| CacheError::CommandFailed(Some(e.to_string())))
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Cached>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection()?;

        let values = redis::cmd("MGET")
            .arg(keys)
            .query::<Vec<Option<String>>>(&mut conn)
            .map_err(|e| CacheError::CommandFailed(Some(e.to_string())))?;

        Ok(values.into_iter().map(Self::classify).collect())
    }

    fn mset(&self, entries: &[(String, String)], ttl: Duration) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection()?;
        let mut pipe = redis::pipe();

        for (key, value) in entries {
            pipe.cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .ignore();
        }

        pipe.query::<()>(&mut conn)
            .map_err(|e| CacheError::CommandFailed(Some(e.to_string())))
    }
}
