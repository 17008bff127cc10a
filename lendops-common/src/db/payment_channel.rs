use bigdecimal::BigDecimal;
use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use std::time::SystemTime;

use crate::cache::{Cache, CachedEntity};
use crate::db::{DaoError, DbThreadPool};
use crate::models::payment_channel::{NewPaymentChannel, PaymentChannel, PaymentChannelChanges};
use crate::schema::payment_channels as payment_channel_fields;
use crate::schema::payment_channels::dsl::payment_channels;

pub const ENTITY: &str = "payment_channel";

const MAX_PAGE_SIZE: i64 = 200;

// Columns single-condition lookups may filter on
const FILTER_COLUMNS: [&str; 5] = [
    "code",
    "merchant_no",
    "is_enabled",
    "supports_payout",
    "supports_collection",
];

#[derive(Clone, Copy, Debug)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug)]
pub struct ListParams {
    pub offset: i64,
    pub limit: i64,
    pub order: SortOrder,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
            order: SortOrder::Descending,
        }
    }
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
    cache: Cache,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool, cache: &Cache) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
            cache: cache.clone(),
        }
    }

    pub fn create(&self, new_channel: &NewPaymentChannel) -> Result<PaymentChannel, DaoError> {
        Ok(dsl::insert_into(payment_channels)
            .values(new_channel)
            .get_result::<PaymentChannel>(&mut self.db_thread_pool.get()?)?)
    }

    /// Cache-aside read. A placeholder hit answers "no such row" without
    /// touching the database; a cache failure falls through to the database.
    pub fn get_by_id(&self, channel_id: i64) -> Result<PaymentChannel, DaoError> {
        let key = Cache::entity_key(ENTITY, channel_id);

        match self.cache.get_json::<PaymentChannel>(&key) {
            Ok(CachedEntity::Value(channel)) => return Ok(channel),
            Ok(CachedEntity::Placeholder) => {
                return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
            }
            Ok(CachedEntity::Miss) => (),
            Err(e) => log::error!("Cache read for key '{key}' failed: {e}"),
        }

        let channel = payment_channels
            .find(channel_id)
            .filter(payment_channel_fields::deleted_at.is_null())
            .first::<PaymentChannel>(&mut self.db_thread_pool.get()?)
            .optional()?;

        match channel {
            Some(channel) => {
                if let Err(e) = self.cache.put_json(&key, &channel) {
                    log::error!("Cache write for key '{key}' failed: {e}");
                }

                Ok(channel)
            }
            None => {
                if let Err(e) = self.cache.put_placeholder(&key) {
                    log::error!("Cache write for key '{key}' failed: {e}");
                }

                Err(DaoError::QueryFailure(diesel::result::Error::NotFound))
            }
        }
    }

    /// Batched read preserving input order. Identifiers that resolve to
    /// nothing are dropped from the result rather than reported as errors.
    pub fn multi_get(&self, channel_ids: &[i64]) -> Result<Vec<PaymentChannel>, DaoError> {
        if channel_ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = channel_ids
            .iter()
            .map(|id| Cache::entity_key(ENTITY, *id))
            .collect();

        let cached = match self.cache.mget_json::<PaymentChannel>(&keys) {
            Ok(cached) => cached,
            Err(e) => {
                log::error!("Cache multi-read failed: {e}");
                vec![CachedEntity::Miss; channel_ids.len()]
            }
        };

        let mut missing_ids = Vec::new();
        for (id, entry) in channel_ids.iter().zip(cached.iter()) {
            if matches!(entry, CachedEntity::Miss) {
                missing_ids.push(*id);
            }
        }

        let mut fetched: Vec<PaymentChannel> = if missing_ids.is_empty() {
            Vec::new()
        } else {
            payment_channels
                .filter(payment_channel_fields::id.eq_any(&missing_ids))
                .filter(payment_channel_fields::deleted_at.is_null())
                .load::<PaymentChannel>(&mut self.db_thread_pool.get()?)?
        };

        if !missing_ids.is_empty() {
            let entries: Vec<(String, &PaymentChannel)> = fetched
                .iter()
                .map(|c| (Cache::entity_key(ENTITY, c.id), c))
                .collect();

            if let Err(e) = self.cache.mput_json(&entries) {
                log::error!("Cache multi-write failed: {e}");
            }

            for id in &missing_ids {
                if !fetched.iter().any(|c| c.id == *id) {
                    let key = Cache::entity_key(ENTITY, *id);

                    if let Err(e) = self.cache.put_placeholder(&key) {
                        log::error!("Cache write for key '{key}' failed: {e}");
                    }
                }
            }
        }

        let mut out = Vec::with_capacity(channel_ids.len());
        for (id, entry) in channel_ids.iter().zip(cached.into_iter()) {
            match entry {
                CachedEntity::Value(channel) => out.push(channel),
                CachedEntity::Placeholder => (),
                CachedEntity::Miss => {
                    if let Some(pos) = fetched.iter().position(|c| c.id == *id) {
                        out.push(fetched.swap_remove(pos));
                    }
                }
            }
        }

        Ok(out)
    }

    pub fn update_by_id(
        &self,
        channel_id: i64,
        changes: &PaymentChannelChanges,
    ) -> Result<(), DaoError> {
        let affected = dsl::update(
            payment_channels
                .find(channel_id)
                .filter(payment_channel_fields::deleted_at.is_null()),
        )
        .set(changes)
        .execute(&mut self.db_thread_pool.get()?)?;

        if affected == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        self.invalidate(&[channel_id]);

        Ok(())
    }

    /// Soft delete. Rows keep their identifiers; reads filter them out.
    pub fn delete_by_ids(&self, channel_ids: &[i64]) -> Result<usize, DaoError> {
        if channel_ids.is_empty() {
            return Ok(0);
        }

        let now = SystemTime::now();

        let affected = dsl::update(
            payment_channels
                .filter(payment_channel_fields::id.eq_any(channel_ids))
                .filter(payment_channel_fields::deleted_at.is_null()),
        )
        .set((
            payment_channel_fields::deleted_at.eq(now),
            payment_channel_fields::updated_at.eq(now),
        ))
        .execute(&mut self.db_thread_pool.get()?)?;

        self.invalidate(channel_ids);

        Ok(affected)
    }

    /// Single-condition, single-row lookup restricted to an allow-list of
    /// columns. The column name arrives from a request, so anything off the
    /// list is refused before a query is built. When more than one row
    /// satisfies the condition the lowest id wins.
    pub fn get_by_condition(
        &self,
        column: &str,
        value: &str,
    ) -> Result<PaymentChannel, DaoError> {
        if !FILTER_COLUMNS.contains(&column) {
            return Err(DaoError::CannotRunQuery("Column is not filterable"));
        }

        let mut query = payment_channels
            .filter(payment_channel_fields::deleted_at.is_null())
            .into_boxed();

        query = match column {
            "code" => query.filter(payment_channel_fields::code.eq(value.to_owned())),
            "merchant_no" => {
                query.filter(payment_channel_fields::merchant_no.eq(value.to_owned()))
            }
            "is_enabled" => {
                query.filter(payment_channel_fields::is_enabled.eq(parse_bool(value)?))
            }
            "supports_payout" => {
                query.filter(payment_channel_fields::supports_payout.eq(parse_bool(value)?))
            }
            "supports_collection" => {
                query.filter(payment_channel_fields::supports_collection.eq(parse_bool(value)?))
            }
            _ => unreachable!("column was checked against FILTER_COLUMNS"),
        };

        Ok(query
            .order(payment_channel_fields::id.asc())
            .first::<PaymentChannel>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn list(&self, params: ListParams) -> Result<Vec<PaymentChannel>, DaoError> {
        let limit = params.limit.clamp(1, MAX_PAGE_SIZE);
        let offset = params.offset.max(0);

        let mut query = payment_channels
            .filter(payment_channel_fields::deleted_at.is_null())
            .into_boxed();

        query = match params.order {
            SortOrder::Ascending => query.order(payment_channel_fields::id.asc()),
            SortOrder::Descending => query.order(payment_channel_fields::id.desc()),
        };

        Ok(query
            .offset(offset)
            .limit(limit)
            .load::<PaymentChannel>(&mut self.db_thread_pool.get()?)?)
    }

    /// Keyset pagination for deep scans. Pass the smallest id from the
    /// previous page; the first page passes `i64::MAX`.
    pub fn list_by_last_id(
        &self,
        last_id: i64,
        limit: i64,
    ) -> Result<Vec<PaymentChannel>, DaoError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);

        Ok(payment_channels
            .filter(payment_channel_fields::id.lt(last_id))
            .filter(payment_channel_fields::deleted_at.is_null())
            .order(payment_channel_fields::id.desc())
            .limit(limit)
            .load::<PaymentChannel>(&mut self.db_thread_pool.get()?)?)
    }

    fn invalidate(&self, channel_ids: &[i64]) {
        let keys: Vec<String> = channel_ids
            .iter()
            .map(|id| Cache::entity_key(ENTITY, *id))
            .collect();

        if let Err(e) = self.cache.invalidate(&keys) {
            log::error!("Cache invalidation failed: {e}");
        }
    }
}

pub fn fee_rate_from_basis_points(basis_points: i64) -> BigDecimal {
    BigDecimal::new(basis_points.into(), 4)
}

fn parse_bool(value: &str) -> Result<bool, DaoError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(DaoError::CannotRunQuery("Value is not a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_fee_rate_from_basis_points() {
        assert_eq!(
            fee_rate_from_basis_points(150),
            BigDecimal::from_str("0.0150").unwrap(),
        );
        assert_eq!(fee_rate_from_basis_points(0), BigDecimal::from_str("0").unwrap());
        assert_eq!(
            fee_rate_from_basis_points(10_000),
            BigDecimal::from_str("1").unwrap(),
        );
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("yes").is_err());
        assert!(parse_bool("").is_err());
    }

    #[test]
    fn test_filter_columns_reject_unknown() {
        assert!(!FILTER_COLUMNS.contains(&"password_hash"));
        assert!(!FILTER_COLUMNS.contains(&"id; DROP TABLE payment_channels"));
        assert!(FILTER_COLUMNS.contains(&"code"));
    }
}
