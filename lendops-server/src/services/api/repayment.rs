use actix_web::web;

use crate::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/repayment")
            .route("/post", web::post().to(handlers::repayment::post))
            .route(
                "/loan_info/{schedule_id}",
                web::get().to(handlers::repayment::loan_info),
            )
            .route("/history", web::get().to(handlers::repayment::history))
            .route(
                "/voucher/upload",
                web::post().to(handlers::repayment::upload_voucher),
            )
            .route(
                "/voucher/{file_name}",
                web::get().to(handlers::repayment::get_voucher),
            ),
    );
}
