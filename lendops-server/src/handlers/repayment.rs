use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use lendops_common::cache::Cache;
use lendops_common::db::repayment::{PostError, PostRepayment};
use lendops_common::db::{self, DaoError, DbThreadPool};
use lendops_common::mfa;
use lendops_common::threadrand::SecureRng;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::codes;
use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::handlers::request_io::{
    HistoryQuery, InputPostRepayment, OutputVoucher, OutputVoucherUpload,
};
use crate::handlers::response;
use crate::middleware::auth::AuthorizedUser;

const MAX_VOUCHER_BYTES: usize = 5 * 1024 * 1024;

/// Applies a repayment to a schedule. The poster must pass a fresh one-time
/// code; the write itself is idempotent on the external order number.
pub async fn post(
    authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    payment_data: web::Json<InputPostRepayment>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let post_code = codes::REPAYMENT_TRANSACTIONS_BASE + codes::OP_CREATE;

    let input = payment_data.0;

    let payment = PostRepayment {
        schedule_id: input.schedule_id,
        channel_id: input.channel_id,
        external_order_no: input.external_order_no,
        external_ref: input.external_ref,
        pay_amount: input.pay_amount,
        pay_method: input.pay_method,
        paid_at: UNIX_EPOCH + Duration::from_secs(input.paid_at),
        alloc_principal: input.alloc_principal,
        alloc_interest: input.alloc_interest,
        alloc_fee: input.alloc_fee,
        alloc_penalty: input.alloc_penalty,
        voucher_file: input.voucher_file,
        remark: input.remark,
    };

    // Cheap input checks fail before the one-time code is consumed
    if let Err(PostError::Validation(msg)) = db::repayment::validate_amounts(&payment) {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            post_code,
            String::from(msg),
        ));
    }

    if payment.paid_at > SystemTime::now() + Duration::from_secs(60) {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            post_code,
            String::from("Payment time is in the future"),
        ));
    }

    if let Some(voucher_file) = &payment.voucher_file {
        let file_name = sanitize_voucher_name(voucher_file, post_code)?;

        let voucher_path = Path::new(&env::CONF.voucher_dir).join(file_name);
        if !voucher_path.is_file() {
            return Err(HttpErrorResponse::DoesNotExist(
                codes::APPLICATION_FILES_BASE + codes::OP_GET,
                String::from("Referenced voucher has not been uploaded"),
            ));
        }
    }

    // The schedule is checked before the one-time code so a post against a
    // missing or settled schedule does not consume the code. The posting
    // transaction re-checks under its row lock.
    let repayment_dao = db::repayment::Dao::new(&db_thread_pool, &cache);
    let schedule_id = payment.schedule_id;
    let schedule_status =
        match web::block(move || repayment_dao.schedule_status(schedule_id)).await? {
            Ok(status) => status,
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(
                    post_code,
                    String::from("Failed to look up schedule"),
                ));
            }
        };

    match db::repayment::check_postable(schedule_status) {
        Ok(()) => (),
        Err(PostError::AlreadySettled) => {
            return Err(HttpErrorResponse::InvalidState(
                post_code,
                String::from("Schedule is already settled"),
            ));
        }
        Err(_) => {
            return Err(HttpErrorResponse::DoesNotExist(
                codes::REPAYMENT_SCHEDULES_BASE + codes::OP_GET,
                String::from("Schedule not found"),
            ));
        }
    }

    let verifier = mfa::Verifier::new(&db_thread_pool);
    let user_id = authorized_user.user_id;
    let otp = input.otp;

    let device_id =
        web::block(move || verifier.verify(&env::CONF.mfa_seed_box, user_id, &otp)).await??;

    let repayment_dao = db::repayment::Dao::new(&db_thread_pool, &cache);
    let payment_copy = payment.clone();

    let receipt = match web::block(move || repayment_dao.post(user_id, &payment_copy)).await? {
        Ok(r) => r,
        Err(PostError::Validation(msg)) => {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                post_code,
                String::from(msg),
            ));
        }
        Err(PostError::ScheduleNotFound) => {
            return Err(HttpErrorResponse::DoesNotExist(
                codes::REPAYMENT_SCHEDULES_BASE + codes::OP_GET,
                String::from("Schedule not found"),
            ));
        }
        Err(PostError::AlreadySettled) => {
            return Err(HttpErrorResponse::InvalidState(
                post_code,
                String::from("Schedule is already settled"),
            ));
        }
        Err(PostError::Dao(e)) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                post_code,
                String::from("Failed to post repayment"),
            ));
        }
    };

    // Best-effort; the repayment is already committed
    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    rayon::spawn(move || {
        if let Err(e) = auth_dao.touch_device_last_used(device_id) {
            log::error!("Failed to stamp authenticator use: {e}");
        }
    });

    Ok(response::ok(receipt))
}

pub async fn loan_info(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    schedule_id: web::Path<i64>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let get_code = codes::REPAYMENT_SCHEDULES_BASE + codes::OP_GET;

    let repayment_dao = db::repayment::Dao::new(&db_thread_pool, &cache);
    let schedule_id = schedule_id.into_inner();

    let detail = match web::block(move || repayment_dao.detail_by_schedule(schedule_id)).await? {
        Ok(d) => d,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                get_code,
                String::from("Schedule not found"),
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                get_code,
                String::from("Failed to look up schedule"),
            ));
        }
    };

    Ok(response::ok(detail))
}

pub async fn history(
    _authorized_user: AuthorizedUser,
    db_thread_pool: web::Data<DbThreadPool>,
    cache: web::Data<Cache>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let list_code = codes::REPAYMENT_TRANSACTIONS_BASE + codes::OP_LIST;

    let repayment_dao = db::repayment::Dao::new(&db_thread_pool, &cache);
    let query = query.0;

    let entries = match web::block(move || {
        repayment_dao.history(
            query.schedule_id,
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(20),
        )
    })
    .await?
    {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                list_code,
                String::from("Failed to load repayment history"),
            ));
        }
    };

    Ok(response::ok(entries))
}

/// Stores a voucher image under a server-generated name. The body is the raw
/// file; the original name is only consulted for its extension.
pub async fn upload_voucher(
    _authorized_user: AuthorizedUser,
    query: web::Query<VoucherNameQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, HttpErrorResponse> {
    let upload_code = codes::APPLICATION_FILES_BASE + codes::OP_CREATE;

    if body.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            upload_code,
            String::from("Voucher body is empty"),
        ));
    }

    if body.len() > MAX_VOUCHER_BYTES {
        return Err(HttpErrorResponse::InputTooLarge(
            upload_code,
            String::from("Voucher exceeds the size limit"),
        ));
    }

    let extension = query
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.bytes().all(|b| b.is_ascii_alphanumeric())
        })
        .unwrap_or("bin")
        .to_ascii_lowercase();

    let file_name = format!("{:032x}.{extension}", SecureRng::next_u128());
    let path = Path::new(&env::CONF.voucher_dir).join(&file_name);
    let byte_size = body.len();

    match web::block(move || std::fs::write(path, &body)).await? {
        Ok(()) => (),
        Err(e) => {
            log::error!("Failed to write voucher: {e}");
            return Err(HttpErrorResponse::InternalError(
                upload_code,
                String::from("Failed to store voucher"),
            ));
        }
    }

    Ok(response::ok(OutputVoucherUpload {
        file_name,
        byte_size,
    }))
}

pub async fn get_voucher(
    _authorized_user: AuthorizedUser,
    file_name: web::Path<String>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let get_code = codes::APPLICATION_FILES_BASE + codes::OP_GET;

    let file_name = sanitize_voucher_name(&file_name, get_code)?;
    let path = Path::new(&env::CONF.voucher_dir).join(&file_name);

    let content = match web::block(move || std::fs::read(path)).await? {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HttpErrorResponse::DoesNotExist(
                get_code,
                String::from("Voucher not found"),
            ));
        }
        Err(e) => {
            log::error!("Failed to read voucher: {e}");
            return Err(HttpErrorResponse::InternalError(
                get_code,
                String::from("Failed to read voucher"),
            ));
        }
    };

    Ok(response::ok(OutputVoucher {
        file_name,
        content_b64: b64.encode(content),
    }))
}

#[derive(Debug, serde::Deserialize)]
pub struct VoucherNameQuery {
    pub file_name: String,
}

/// Voucher names are flat. Anything that could walk out of the voucher
/// directory is refused.
fn sanitize_voucher_name(raw: &str, op_code: i32) -> Result<String, HttpErrorResponse> {
    let valid = !raw.is_empty()
        && raw.len() <= 128
        && !raw.contains("..")
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_');

    if !valid {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            op_code,
            String::from("File name is malformed"),
        ));
    }

    Ok(String::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_voucher_name() {
        assert!(sanitize_voucher_name("abc123.png", 0).is_ok());
        assert!(sanitize_voucher_name("a-b_c.jpeg", 0).is_ok());

        assert!(sanitize_voucher_name("", 0).is_err());
        assert!(sanitize_voucher_name("../etc/passwd", 0).is_err());
        assert!(sanitize_voucher_name("a/b.png", 0).is_err());
        assert!(sanitize_voucher_name("a\\b.png", 0).is_err());
        assert!(sanitize_voucher_name(&"x".repeat(129), 0).is_err());
    }
}
