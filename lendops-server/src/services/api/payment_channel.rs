use actix_web::web;

use crate::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payment_channel")
            .route("/create", web::post().to(handlers::payment_channel::create))
            .route("/get/{id}", web::get().to(handlers::payment_channel::get))
            .route(
                "/multi_get",
                web::get().to(handlers::payment_channel::multi_get),
            )
            .route(
                "/update/{id}",
                web::put().to(handlers::payment_channel::update),
            )
            .route(
                "/delete",
                web::delete().to(handlers::payment_channel::delete),
            )
            .route("/query", web::get().to(handlers::payment_channel::query))
            .route("/list", web::get().to(handlers::payment_channel::list))
            .route(
                "/list_by_last_id",
                web::get().to(handlers::payment_channel::list_by_last_id),
            ),
    );
}
