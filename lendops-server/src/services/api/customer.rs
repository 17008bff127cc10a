use actix_web::web;

use crate::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/customer").route("/apply", web::post().to(handlers::customer::apply)),
    );
}
