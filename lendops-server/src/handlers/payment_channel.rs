use actix_web::{web, HttpResponse};
use lendops_common::cache::Cache;
use lendops_common::db::payment_channel::{ListParams, SortOrder};
use lendops_common::db::{self, DaoError, DbThreadPool};
use lendops_common::models::payment_channel::{NewPaymentChannel, PaymentChannelChanges};
use std::time::SystemTime;

use crate::codes;
use crate::handlers::error::HttpErrorResponse;
use crate::handlers::request_io::{
    ConditionQuery, IdsQuery, InputPaymentChannel, InputPaymentChannelUpdate, KeysetQuery,
    OutputAffected, PageQuery,
};
use crate::handlers::response;
use crate::middleware::auth::AuthorizedUser;

const MAX_IDS_PER_REQUEST: usize = 100;

pub async fn create(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    channel_data: web::Json<InputPaymentChannel>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let create_code = codes::PAYMENT_CHANNELS_BASE + codes::OP_CREATE;

    let input = channel_data.0;

    if input.code.is_empty() || input.code.len() > 64 {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            create_code,
            String::from("Channel code is missing or too long"),
        ));
    }

    if input.name.is_empty() || input.name.len() > 128 {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            create_code,
            String::from("Channel name is missing or too long"),
        ));
    }

    let channel_dao = db::payment_channel::Dao::new(&db_thread_pool, &cache);

    let channel = match web::block(move || {
        let now = SystemTime::now();

        let new_channel = NewPaymentChannel {
            code: &input.code,
            name: &input.name,
            merchant_no: &input.merchant_no,
            is_enabled: input.is_enabled,
            supports_payout: input.supports_payout,
            supports_collection: input.supports_collection,
            payout_fee_rate: &input.payout_fee_rate,
            payout_fee_fixed: &input.payout_fee_fixed,
            collection_fee_rate: &input.collection_fee_rate,
            collection_fee_fixed: &input.collection_fee_fixed,
            payout_min: &input.payout_min,
            payout_max: &input.payout_max,
            collection_min: &input.collection_min,
            collection_max: &input.collection_max,
            settlement_cycle: &input.settlement_cycle,
            created_at: now,
            updated_at: now,
        };

        channel_dao.create(&new_channel)
    })
    .await?
    {
        Ok(c) => c,
        Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))) => {
            return Err(HttpErrorResponse::ConflictWithExisting(
                create_code,
                String::from("A channel with this code already exists"),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                create_code,
                String::from("Failed to create channel"),
            ));
        }
    };

    Ok(response::ok(channel))
}

pub async fn get(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    channel_id: web::Path<i64>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let get_code = codes::PAYMENT_CHANNELS_BASE + codes::OP_GET;

    let channel_dao = db::payment_channel::Dao::new(&db_thread_pool, &cache);
    let channel_id = channel_id.into_inner();

    let channel = match web::block(move || channel_dao.get_by_id(channel_id)).await? {
        Ok(c) => c,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                get_code,
                String::from("Channel not found"),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                get_code,
                String::from("Failed to look up channel"),
            ));
        }
    };

    Ok(response::ok(channel))
}

pub async fn multi_get(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    query: web::Query<IdsQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let multi_get_code = codes::PAYMENT_CHANNELS_BASE + codes::OP_MULTI_GET;

    let ids = parse_ids(&query.ids, multi_get_code)?;

    let channel_dao = db::payment_channel::Dao::new(&db_thread_pool, &cache);

    let channels = match web::block(move || channel_dao.multi_get(&ids)).await? {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                multi_get_code,
                String::from("Failed to look up channels"),
            ));
        }
    };

    Ok(response::ok(channels))
}

pub async fn update(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    channel_id: web::Path<i64>,
    changes: web::Json<InputPaymentChannelUpdate>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let update_code = codes::PAYMENT_CHANNELS_BASE + codes::OP_UPDATE;

    let channel_dao = db::payment_channel::Dao::new(&db_thread_pool, &cache);
    let channel_id = channel_id.into_inner();
    let input = changes.0;

    match web::block(move || {
        let field_changes = PaymentChannelChanges {
            name: input.name.as_deref(),
            merchant_no: input.merchant_no.as_deref(),
            is_enabled: input.is_enabled,
            supports_payout: input.supports_payout,
            supports_collection: input.supports_collection,
            payout_fee_rate: input.payout_fee_rate.as_ref(),
            payout_fee_fixed: input.payout_fee_fixed.as_ref(),
            collection_fee_rate: input.collection_fee_rate.as_ref(),
            collection_fee_fixed: input.collection_fee_fixed.as_ref(),
            payout_min: input.payout_min.as_ref(),
            payout_max: input.payout_max.as_ref(),
            collection_min: input.collection_min.as_ref(),
            collection_max: input.collection_max.as_ref(),
            settlement_cycle: input.settlement_cycle.as_deref(),
            updated_at: Some(SystemTime::now()),
        };

        channel_dao.update_by_id(channel_id, &field_changes)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                update_code,
                String::from("Channel not found"),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                update_code,
                String::from("Failed to update channel"),
            ));
        }
    }

    Ok(response::ok_empty())
}

pub async fn delete(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    query: web::Query<IdsQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let delete_code = codes::PAYMENT_CHANNELS_BASE + codes::OP_BATCH_DELETE;

    let ids = parse_ids(&query.ids, delete_code)?;

    let channel_dao = db::payment_channel::Dao::new(&db_thread_pool, &cache);

    let affected = match web::block(move || channel_dao.delete_by_ids(&ids)).await? {
        Ok(n) => n,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                delete_code,
                String::from("Failed to delete channels"),
            ));
        }
    };

    Ok(response::ok(OutputAffected { affected }))
}

pub async fn query(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    condition: web::Query<ConditionQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let query_code = codes::PAYMENT_CHANNELS_BASE + codes::OP_QUERY;

    let channel_dao = db::payment_channel::Dao::new(&db_thread_pool, &cache);
    let condition = condition.0;

    let channel = match web::block(move || {
        channel_dao.get_by_condition(&condition.column, &condition.value)
    })
    .await?
    {
        Ok(c) => c,
        Err(DaoError::CannotRunQuery(msg)) => {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                query_code,
                String::from(msg),
            ));
        }
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                query_code,
                String::from("No channel matches the condition"),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                query_code,
                String::from("Failed to query channels"),
            ));
        }
    };

    Ok(response::ok(channel))
}

pub async fn list(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let list_code = codes::PAYMENT_CHANNELS_BASE + codes::OP_LIST;

    let order = match page.order.as_deref() {
        None | Some("desc") => SortOrder::Descending,
        Some("asc") => SortOrder::Ascending,
        Some(_) => {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                list_code,
                String::from("Order must be 'asc' or 'desc'"),
            ));
        }
    };

    let params = ListParams {
        offset: page.offset.unwrap_or(0),
        limit: page.limit.unwrap_or(20),
        order,
    };

    let channel_dao = db::payment_channel::Dao::new(&db_thread_pool, &cache);

    let channels = match web::block(move || channel_dao.list(params)).await? {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                list_code,
                String::from("Failed to list channels"),
            ));
        }
    };

    Ok(response::ok(channels))
}

pub async fn list_by_last_id(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    query: web::Query<KeysetQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let list_code = codes::PAYMENT_CHANNELS_BASE + codes::OP_LIST_BY_LAST_ID;

    let last_id = query.last_id.unwrap_or(i64::MAX);
    let limit = query.limit.unwrap_or(20);

    let channel_dao = db::payment_channel::Dao::new(&db_thread_pool, &cache);

    let channels = match web::block(move || channel_dao.list_by_last_id(last_id, limit)).await? {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                list_code,
                String::from("Failed to list channels"),
            ));
        }
    };

    Ok(response::ok(channels))
}

fn parse_ids(raw: &str, op_code: i32) -> Result<Vec<i64>, HttpErrorResponse> {
    let ids = raw
        .split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<Result<Vec<i64>, _>>()
        .map_err(|_| {
            HttpErrorResponse::IncorrectlyFormed(
                op_code,
                String::from("Identifiers must be a comma-separated list of integers"),
            )
        })?;

    if ids.is_empty() || ids.len() > MAX_IDS_PER_REQUEST {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            op_code,
            String::from("Between 1 and 100 identifiers are allowed"),
        ));
    }

    Ok(ids)
}
