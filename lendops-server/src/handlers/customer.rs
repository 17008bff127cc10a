use actix_web::{web, HttpRequest, HttpResponse};
use bigdecimal::{BigDecimal, Zero};
use lendops_common::db::loan::FileAttachment;
use lendops_common::db::{self, DbThreadPool};
use lendops_common::models::loan_application::{AuditStatus, NewLoanApplication};
use std::time::SystemTime;

use crate::codes;
use crate::handlers::error::HttpErrorResponse;
use crate::handlers::request_io::{InputLoanApplication, OutputApplicationId};
use crate::handlers::response;

const MAX_FILES_PER_APPLICATION: usize = 10;
const MAX_TERM_DAYS: i32 = 1_095;

/// Unauthenticated intake endpoint for loan applications submitted from the
/// public site.
pub async fn apply(
    req: HttpRequest,
    db_thread_pool: web::Data<DbThreadPool>,
    application_data: web::Json<InputLoanApplication>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let create_code = codes::LOAN_APPLICATIONS_BASE + codes::OP_CREATE;

    let input = application_data.0;

    if input.applicant_name.is_empty() || input.applicant_name.len() > 128 {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            create_code,
            String::from("Applicant name is missing or too long"),
        ));
    }

    if input.applicant_phone.is_empty() || input.applicant_phone.len() > 32 {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            create_code,
            String::from("Applicant phone is missing or too long"),
        ));
    }

    if input.id_number.is_empty() || input.id_number.len() > 64 {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            create_code,
            String::from("Identity number is missing or too long"),
        ));
    }

    if input.requested_amount <= BigDecimal::zero() {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            create_code,
            String::from("Requested amount must be positive"),
        ));
    }

    if input.term_days <= 0 || input.term_days > MAX_TERM_DAYS {
        return Err(HttpErrorResponse::IncorrectlyFormed(
            create_code,
            String::from("Term is out of range"),
        ));
    }

    if input.files.len() > MAX_FILES_PER_APPLICATION {
        return Err(HttpErrorResponse::InputTooLarge(
            codes::APPLICATION_FILES_BASE + codes::OP_CREATE,
            String::from("Too many files attached"),
        ));
    }

    for file in &input.files {
        if file.file_role.is_empty() || file.file_name.is_empty() || file.storage_url.is_empty() {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                codes::APPLICATION_FILES_BASE + codes::OP_CREATE,
                String::from("File metadata is incomplete"),
            ));
        }

        if file.byte_size < 0 {
            return Err(HttpErrorResponse::IncorrectlyFormed(
                codes::APPLICATION_FILES_BASE + codes::OP_CREATE,
                String::from("File size cannot be negative"),
            ));
        }

        if let Some(hash) = &file.content_hash {
            if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(HttpErrorResponse::IncorrectlyFormed(
                    codes::APPLICATION_FILES_BASE + codes::OP_CREATE,
                    String::from("Content hash must be a 64-character hex digest"),
                ));
            }
        }
    }

    let client_addr = req
        .connection_info()
        .realip_remote_addr()
        .map(String::from);

    let loan_dao = db::loan::Dao::new(&db_thread_pool);

    let application_id = match web::block(move || {
        let now = SystemTime::now();

        let new_application = NewLoanApplication {
            applicant_name: &input.applicant_name,
            applicant_phone: &input.applicant_phone,
            id_number: &input.id_number,
            requested_amount: &input.requested_amount,
            term_days: input.term_days,
            audit_status: AuditStatus::Pending.into(),
            share_code: input.share_code.as_deref(),
            client_addr: client_addr.as_deref(),
            risk_state: 0,
            created_at: now,
            updated_at: now,
        };

        let attachments: Vec<FileAttachment> = input
            .files
            .iter()
            .map(|f| FileAttachment {
                file_role: &f.file_role,
                storage_url: &f.storage_url,
                storage_key: f.storage_key.as_deref(),
                file_name: &f.file_name,
                mime_type: &f.mime_type,
                byte_size: f.byte_size,
                content_hash: f.content_hash.as_deref(),
            })
            .collect();

        loan_dao.create_application(&new_application, &attachments)
    })
    .await?
    {
        Ok(id) => id,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(
                create_code,
                String::from("Failed to save application"),
            ));
        }
    };

    Ok(response::ok(OutputApplicationId { application_id }))
}
